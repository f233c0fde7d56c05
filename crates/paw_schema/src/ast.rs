/// Abstract syntax tree types for the paw schema IDL.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub package: PackageDecl,
    pub types: Vec<TypeDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDecl {
    pub namespace: String,
    pub name: String,
    pub version: Option<String>,
}

// ---------------------------------------------------------------------------
// Type expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TypeExpr {
    /// A scalar: bool, u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, string, bytes
    Scalar(String),
    /// A named type (record or primitive)
    Named(String),
    /// list<T>
    List(Box<TypeExpr>),
    /// option<T>
    Option(Box<TypeExpr>),
    /// `any`, an untyped reference
    Any,
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if is_scalar(&name) {
            Self::Scalar(name)
        } else {
            Self::Named(name)
        }
    }

    pub fn list(inner: TypeExpr) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn option(inner: TypeExpr) -> Self {
        Self::Option(Box::new(inner))
    }

    /// The type a single element holds, with every `option<>` and `list<>`
    /// wrapper stripped.
    pub fn element(&self) -> &TypeExpr {
        match self {
            TypeExpr::List(inner) | TypeExpr::Option(inner) => inner.element(),
            other => other,
        }
    }

    /// Whether an `option<>` wrapper appears anywhere in the expression.
    pub fn has_option(&self) -> bool {
        match self {
            TypeExpr::Option(_) => true,
            TypeExpr::List(inner) => inner.has_option(),
            _ => false,
        }
    }

    /// Number of `list<>` wrappers anywhere in the expression.
    pub fn list_depth(&self) -> usize {
        match self {
            TypeExpr::List(inner) => 1 + inner.list_depth(),
            TypeExpr::Option(inner) => inner.list_depth(),
            _ => 0,
        }
    }
}

impl std::fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeExpr::Scalar(name) | TypeExpr::Named(name) => write!(f, "{name}"),
            TypeExpr::List(inner) => write!(f, "list<{inner}>"),
            TypeExpr::Option(inner) => write!(f, "option<{inner}>"),
            TypeExpr::Any => write!(f, "any"),
        }
    }
}

// ---------------------------------------------------------------------------
// Type declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    /// Base record for polymorphic subtypes.
    pub base: Option<String>,
    /// Declared with `primitive`: values are opaque leaves.
    pub primitive: bool,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: TypeExpr,
    /// Marked `@streaming`: the referenced object roots its own unit.
    pub streaming: bool,
}

pub fn is_scalar(name: &str) -> bool {
    matches!(
        name,
        "bool"
            | "u8"
            | "u16"
            | "u32"
            | "u64"
            | "i8"
            | "i16"
            | "i32"
            | "i64"
            | "f32"
            | "f64"
            | "string"
            | "bytes"
    )
}
