//! Type metadata registry.
//!
//! Resolves a [`Schema`] into one immutable [`TypeDescriptor`] per type. Each
//! descriptor carries the complete, ordered member list of its type,
//! inherited members first, so a polymorphic subtype exposes everything its
//! bases declare. Every member is classified once, at build time, into a
//! [`MemberKind`]:
//!
//! - `Primitive` when the element type is a scalar or a `primitive` type,
//! - `StreamingRef` when the field is marked `@streaming`,
//! - `Owned` otherwise.
//!
//! A composite field without `@streaming` is therefore pulled into its
//! parent's streaming unit.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::ast::{TypeDecl, TypeExpr};
use crate::ident::TypeKey;
use crate::schema::{Schema, SchemaError};

/// How the walker treats a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MemberKind {
    /// Opaque leaf value, never traversed.
    Primitive,
    /// Composed sub-object flattened into the parent's streaming unit.
    Owned,
    /// Reference whose target roots its own streaming unit.
    StreamingRef,
}

/// One classified member of a type.
#[derive(Debug, Clone, Serialize)]
pub struct MemberDescriptor {
    /// Informational only; values are looked up by it.
    pub name: String,
    /// Declared type as written in the schema.
    pub ty: TypeExpr,
    /// Classification of each element.
    pub kind: MemberKind,
    /// Whether the member holds an ordered sequence of elements.
    pub collection: bool,
    /// Whether the member, or its elements, may hold no value.
    pub nullable: bool,
    /// Element type for `Owned` and `StreamingRef` members.
    pub target: Option<TypeKey>,
    /// The type that declared this member (differs from the owning
    /// descriptor for inherited members).
    pub declared_in: TypeKey,
}

/// Resolved metadata for one type.
#[derive(Debug, Clone, Serialize)]
pub struct TypeDescriptor {
    pub key: TypeKey,
    pub name: String,
    pub base: Option<TypeKey>,
    pub primitive: bool,
    /// All members, inherited ones first, each group in declaration order.
    pub members: Vec<MemberDescriptor>,
}

impl TypeDescriptor {
    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Process-wide, read-only registry of type descriptors.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: Vec<TypeDescriptor>,
    by_key: HashMap<TypeKey, usize>,
    by_name: HashMap<String, TypeKey>,
}

impl TypeRegistry {
    /// Resolve and classify every type in `schema`.
    ///
    /// Any unclassifiable member fails the whole build; the registry is never
    /// partially constructed.
    pub fn build(schema: &Schema) -> Result<Self, SchemaError> {
        let mut by_name = HashMap::new();
        let mut key_owner: HashMap<TypeKey, &str> = HashMap::new();
        for decl in schema.types() {
            let key = TypeKey::from_name(&decl.name);
            if let Some(other) = key_owner.insert(key, &decl.name) {
                return Err(SchemaError::KeyCollision(other.to_string(), decl.name.clone()));
            }
            by_name.insert(decl.name.clone(), key);
        }

        let mut types = Vec::with_capacity(schema.types().len());
        let mut by_key = HashMap::new();
        for decl in schema.types() {
            let chain = base_chain(schema, decl)?;
            let members = flatten_members(schema, &chain)?;
            let key = TypeKey::from_name(&decl.name);
            by_key.insert(key, types.len());
            types.push(TypeDescriptor {
                key,
                name: decl.name.clone(),
                base: decl.base.as_deref().map(TypeKey::from_name),
                primitive: decl.primitive,
                members,
            });
        }

        debug!(types = types.len(), "type registry built");
        Ok(Self {
            types,
            by_key,
            by_name,
        })
    }

    /// Convenience: parse and resolve a single schema source.
    pub fn from_source(source: &str) -> Result<Self, SchemaError> {
        let mut schema = Schema::new();
        schema.load_source(source)?;
        Self::build(&schema)
    }

    pub fn get(&self, key: TypeKey) -> Option<&TypeDescriptor> {
        self.by_key.get(&key).map(|&i| &self.types[i])
    }

    pub fn by_name(&self, name: &str) -> Option<&TypeDescriptor> {
        self.by_name.get(name).and_then(|&key| self.get(key))
    }

    pub fn key_of(&self, name: &str) -> Option<TypeKey> {
        self.by_name.get(name).copied()
    }

    /// Ordered members of `key`, empty for unknown types.
    pub fn members(&self, key: TypeKey) -> &[MemberDescriptor] {
        self.get(key)
            .map(|t| t.members.as_slice())
            .unwrap_or_default()
    }

    /// Display name of `key`, falling back to the raw key.
    pub fn name_of(&self, key: TypeKey) -> String {
        self.get(key)
            .map_or_else(|| key.to_string(), |t| t.name.clone())
    }

    /// Whether `ty` is `ancestor` or derives from it.
    pub fn is_derived_from(&self, ty: TypeKey, ancestor: TypeKey) -> bool {
        let mut current = Some(ty);
        while let Some(key) = current {
            if key == ancestor {
                return true;
            }
            current = self.get(key).and_then(|t| t.base);
        }
        false
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Describe the resolved registry as JSON for diagnostics.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "types": self.types.iter().map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "key": t.key.to_string(),
                    "base": t.base.map(|b| self.name_of(b)),
                    "primitive": t.primitive,
                    "members": t.members.iter().map(|m| {
                        serde_json::json!({
                            "name": m.name,
                            "type": m.ty.to_string(),
                            "kind": m.kind,
                            "collection": m.collection,
                            "declared_in": self.name_of(m.declared_in),
                        })
                    }).collect::<Vec<_>>(),
                })
            }).collect::<Vec<_>>(),
        })
    }
}

// ---------------------------------------------------------------------------
// Resolution helpers
// ---------------------------------------------------------------------------

/// The declaration followed by its bases, most-derived first.
fn base_chain<'a>(schema: &'a Schema, decl: &'a TypeDecl) -> Result<Vec<&'a TypeDecl>, SchemaError> {
    let mut chain = vec![decl];
    let mut seen = HashSet::from([decl.name.as_str()]);
    let mut current = decl;
    while let Some(base_name) = current.base.as_deref() {
        let base = schema.get(base_name).ok_or_else(|| SchemaError::UnknownBase {
            ty: current.name.clone(),
            base: base_name.to_string(),
        })?;
        if base.primitive {
            return Err(SchemaError::PrimitiveBase {
                ty: current.name.clone(),
                base: base.name.clone(),
            });
        }
        if !seen.insert(base.name.as_str()) {
            return Err(SchemaError::InheritanceCycle(decl.name.clone()));
        }
        chain.push(base);
        current = base;
    }
    Ok(chain)
}

fn flatten_members(
    schema: &Schema,
    chain: &[&TypeDecl],
) -> Result<Vec<MemberDescriptor>, SchemaError> {
    let mut members: Vec<MemberDescriptor> = Vec::new();
    for decl in chain.iter().rev() {
        for field in &decl.fields {
            if members.iter().any(|m| m.name == field.name) {
                return Err(SchemaError::DuplicateMember {
                    ty: decl.name.clone(),
                    member: field.name.clone(),
                });
            }
            members.push(classify(schema, decl, field)?);
        }
    }
    Ok(members)
}

fn classify(
    schema: &Schema,
    owner: &TypeDecl,
    field: &crate::ast::Field,
) -> Result<MemberDescriptor, SchemaError> {
    let unclassifiable = |reason: &str| SchemaError::Unclassifiable {
        ty: owner.name.clone(),
        member: field.name.clone(),
        reason: reason.to_string(),
    };

    let collection = match field.ty.list_depth() {
        0 => false,
        1 => true,
        _ => return Err(unclassifiable("nested collections are not supported")),
    };
    let nullable = field.ty.has_option();

    let (kind, target) = match field.ty.element() {
        TypeExpr::Any => return Err(unclassifiable("untyped reference `any`")),
        TypeExpr::Scalar(_) => (MemberKind::Primitive, None),
        TypeExpr::Named(name) => {
            let target = schema.get(name).ok_or_else(|| SchemaError::UnknownType {
                ty: owner.name.clone(),
                member: field.name.clone(),
                referenced: name.clone(),
            })?;
            if target.primitive {
                (MemberKind::Primitive, None)
            } else if owner.primitive {
                return Err(unclassifiable("primitive types cannot hold object references"));
            } else if field.streaming {
                (MemberKind::StreamingRef, Some(TypeKey::from_name(name)))
            } else {
                (MemberKind::Owned, Some(TypeKey::from_name(name)))
            }
        }
        other => return Err(unclassifiable(&format!("unsupported type shape `{other}`"))),
    };

    if field.streaming && kind == MemberKind::Primitive {
        return Err(unclassifiable("`@streaming` on a primitive member"));
    }

    Ok(MemberDescriptor {
        name: field.name.clone(),
        ty: field.ty.clone(),
        kind,
        collection,
        nullable,
        target,
        declared_in: TypeKey::from_name(&owner.name),
    })
}
