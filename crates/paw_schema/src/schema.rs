/// Schema collection: gathers type declarations from parsed files or from
/// programmatic registration before they are resolved into a
/// [`TypeRegistry`](crate::TypeRegistry).
use crate::ast::*;
use crate::parser::Parser;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// File extension of schema sources.
pub const SCHEMA_EXTENSION: &str = "paw";

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("parse error: {0}")]
    Parse(#[from] crate::parser::ParseError),
    #[error("io error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("duplicate type: {0}")]
    DuplicateType(String),
    #[error("type '{ty}' derives from unknown type '{base}'")]
    UnknownBase { ty: String, base: String },
    #[error("type '{ty}' cannot derive from primitive type '{base}'")]
    PrimitiveBase { ty: String, base: String },
    #[error("inheritance cycle through type '{0}'")]
    InheritanceCycle(String),
    #[error("member '{ty}.{member}' references unknown type '{referenced}'")]
    UnknownType {
        ty: String,
        member: String,
        referenced: String,
    },
    #[error("member '{ty}.{member}' declared more than once in the type hierarchy")]
    DuplicateMember { ty: String, member: String },
    #[error("member '{ty}.{member}' cannot be classified: {reason}")]
    Unclassifiable {
        ty: String,
        member: String,
        reason: String,
    },
    #[error("type names '{0}' and '{1}' hash to the same key")]
    KeyCollision(String, String),
}

/// Unresolved type declarations, in the order they were loaded.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: Vec<TypeDecl>,
    index: HashMap<String, usize>,
    /// Loaded packages (namespace:name -> version).
    pub packages: HashMap<String, Option<String>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `.paw` file under `dir`, recursing into subdirectories.
    ///
    /// Entries are visited in sorted order so declaration order does not
    /// depend on the file system.
    pub fn load_dir(&mut self, dir: &Path) -> Result<(), SchemaError> {
        let io_err = |source| SchemaError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut entries = std::fs::read_dir(dir)
            .map_err(io_err)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(io_err)?;
        entries.sort();

        for path in entries {
            if path.is_dir() {
                self.load_dir(&path)?;
            } else if path.extension().is_some_and(|e| e == SCHEMA_EXTENSION) {
                self.load_file(&path)?;
            }
        }
        Ok(())
    }

    /// Load a `.paw` file and merge its declarations into this schema.
    pub fn load_file(&mut self, path: &Path) -> Result<(), SchemaError> {
        debug!(file = %path.display(), "loading schema file");
        let source = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_source(&source)
    }

    /// Parse a source string and merge its declarations.
    pub fn load_source(&mut self, source: &str) -> Result<(), SchemaError> {
        let file = Parser::parse(source)?;
        let pkg_key = format!("{}:{}", file.package.namespace, file.package.name);
        self.packages.insert(pkg_key, file.package.version);
        for decl in file.types {
            self.declare(decl)?;
        }
        Ok(())
    }

    /// Add a single declaration. Type names are global across packages.
    pub fn declare(&mut self, decl: TypeDecl) -> Result<(), SchemaError> {
        if self.index.contains_key(&decl.name) {
            return Err(SchemaError::DuplicateType(decl.name));
        }
        self.index.insert(decl.name.clone(), self.types.len());
        self.types.push(decl);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TypeDecl> {
        self.index.get(name).map(|&i| &self.types[i])
    }

    /// Declarations in load order.
    pub fn types(&self) -> &[TypeDecl] {
        &self.types
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Programmatic registration
// ---------------------------------------------------------------------------

/// Declarative registration of types from code, the in-process equivalent of
/// a `.paw` file.
///
/// ```
/// use paw_schema::{SchemaBuilder, TypeExpr};
///
/// let schema = SchemaBuilder::new()
///     .primitive("float3", |t| t.field("x", TypeExpr::named("f32")))
///     .record("game", |t| t.streaming("main_map", TypeExpr::named("map")))
///     .record("map", |t| t)
///     .build()
///     .unwrap();
/// assert_eq!(schema.types().len(), 3);
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    decls: Vec<TypeDecl>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a composite record type.
    #[must_use]
    pub fn record(self, name: &str, fields: impl FnOnce(TypeDeclBuilder) -> TypeDeclBuilder) -> Self {
        self.push(name, None, false, fields)
    }

    /// Declare a record type deriving from `base`.
    #[must_use]
    pub fn derived(
        self,
        name: &str,
        base: &str,
        fields: impl FnOnce(TypeDeclBuilder) -> TypeDeclBuilder,
    ) -> Self {
        self.push(name, Some(base.to_string()), false, fields)
    }

    /// Declare a primitive-leaf type.
    #[must_use]
    pub fn primitive(
        self,
        name: &str,
        fields: impl FnOnce(TypeDeclBuilder) -> TypeDeclBuilder,
    ) -> Self {
        self.push(name, None, true, fields)
    }

    fn push(
        mut self,
        name: &str,
        base: Option<String>,
        primitive: bool,
        fields: impl FnOnce(TypeDeclBuilder) -> TypeDeclBuilder,
    ) -> Self {
        let decl = fields(TypeDeclBuilder(TypeDecl {
            name: name.to_string(),
            base,
            primitive,
            fields: Vec::new(),
        }))
        .0;
        self.decls.push(decl);
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut schema = Schema::new();
        for decl in self.decls {
            schema.declare(decl)?;
        }
        Ok(schema)
    }
}

/// Field list of a type being registered through [`SchemaBuilder`].
#[derive(Debug)]
pub struct TypeDeclBuilder(TypeDecl);

impl TypeDeclBuilder {
    #[must_use]
    pub fn field(mut self, name: &str, ty: TypeExpr) -> Self {
        self.0.fields.push(Field {
            name: name.to_string(),
            ty,
            streaming: false,
        });
        self
    }

    /// A field marked as a streaming-unit boundary.
    #[must_use]
    pub fn streaming(mut self, name: &str, ty: TypeExpr) -> Self {
        self.0.fields.push(Field {
            name: name.to_string(),
            ty,
            streaming: true,
        });
        self
    }
}
