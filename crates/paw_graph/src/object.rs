//! Object arena.
//!
//! Every object that enters the graph receives an [`ObjectId`], an index into
//! the arena. Identity is the handle, never the object's value or address, so
//! two objects with identical contents are still distinct nodes and the same
//! object reached through several edges is one node.

use std::collections::HashMap;

use paw_schema::{MemberDescriptor, MemberKind, TypeKey, TypeRegistry};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable handle of an object in an [`ObjectGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

impl ObjectId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate object key: {0}")]
    DuplicateKey(String),
    #[error("object {0} is not part of the graph")]
    UnknownObject(ObjectId),
    #[error("object graph is full; '{0}' does not fit in a 32-bit handle")]
    TooManyObjects(String),
    #[error("reference to unknown object '{0}'")]
    UnknownObjectKey(String),
    #[error("root '{0}' does not name an object")]
    UnknownRoot(String),
    #[error("object '{object}' has unknown type '{ty}'")]
    UnknownType { object: String, ty: String },
    #[error("object '{object}' has primitive type '{ty}'; primitive values are stored inline")]
    PrimitiveObject { object: String, ty: String },
    #[error("object '{object}' sets '{member}', which its type does not declare")]
    UnknownMember { object: String, member: String },
    #[error("'{object}.{member}' expects {expected}, found {found}")]
    ShapeMismatch {
        object: String,
        member: String,
        expected: String,
        found: &'static str,
    },
    #[error("'{object}.{member}' expects a '{expected}', but '{target}' is a '{found}'")]
    TypeMismatch {
        object: String,
        member: String,
        expected: String,
        target: String,
        found: String,
    },
}

/// Value held by one member of an object.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    /// Opaque leaf data for primitive members.
    Scalar(serde_json::Value),
    /// Reference to another object in the same graph.
    Object(ObjectId),
    /// Ordered elements of a collection member.
    List(Vec<Value>),
}

impl Value {
    pub fn describe(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Scalar(_) => "a scalar",
            Value::Object(_) => "an object reference",
            Value::List(_) => "a list",
        }
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Object(id)
    }
}

impl From<Option<ObjectId>> for Value {
    fn from(id: Option<ObjectId>) -> Self {
        id.map_or(Value::Null, Value::Object)
    }
}

impl From<Vec<ObjectId>> for Value {
    fn from(ids: Vec<ObjectId>) -> Self {
        Value::List(ids.into_iter().map(Value::Object).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Scalar(value)
    }
}

/// A runtime instance of some registered type.
#[derive(Debug, Clone)]
pub struct ObjectNode {
    /// Unique, human-readable key; unit identifiers derive from it.
    pub key: String,
    /// Runtime (most-derived) type.
    pub ty: TypeKey,
    /// Member values in the order they were first set.
    fields: Vec<(String, Value)>,
}

impl ObjectNode {
    /// The value of `member`, or [`Value::Null`] when it was never set.
    pub fn field(&self, member: &str) -> &Value {
        const NULL: &Value = &Value::Null;
        self.value_of(member).unwrap_or(NULL)
    }

    fn value_of(&self, member: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == member)
            .map(|(_, value)| value)
    }
}

/// Arena of objects reachable during one compilation.
#[derive(Debug, Default)]
pub struct ObjectGraph {
    nodes: Vec<ObjectNode>,
    by_key: HashMap<String, ObjectId>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object of runtime type `ty` under a unique `key`.
    pub fn add(&mut self, key: impl Into<String>, ty: TypeKey) -> Result<ObjectId, GraphError> {
        let key = key.into();
        if self.by_key.contains_key(&key) {
            return Err(GraphError::DuplicateKey(key));
        }
        let id = next_id(self.nodes.len(), &key)?;
        self.by_key.insert(key.clone(), id);
        self.nodes.push(ObjectNode {
            key,
            ty,
            fields: Vec::new(),
        });
        Ok(id)
    }

    /// Set `member` on `id`, replacing any previous value.
    pub fn set(
        &mut self,
        id: ObjectId,
        member: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(id.index())
            .ok_or(GraphError::UnknownObject(id))?;
        let member = member.into();
        let value = value.into();
        match node.fields.iter_mut().find(|(name, _)| *name == member) {
            Some((_, slot)) => *slot = value,
            None => node.fields.push((member, value)),
        }
        Ok(())
    }

    pub fn get(&self, id: ObjectId) -> Option<&ObjectNode> {
        self.nodes.get(id.index())
    }

    pub fn node(&self, id: ObjectId) -> Result<&ObjectNode, GraphError> {
        self.get(id).ok_or(GraphError::UnknownObject(id))
    }

    pub fn find(&self, key: &str) -> Option<ObjectId> {
        self.by_key.get(key).copied()
    }

    /// Key of `id`, or its raw handle when it is not in the graph.
    pub fn key_of(&self, id: ObjectId) -> String {
        self.get(id).map_or_else(|| id.to_string(), |n| n.key.clone())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check every object and member value against the registry.
    ///
    /// Members are checked in declaration order, then any undeclared member
    /// is reported in the order it was set, so the first error is the same on
    /// every run. Members that were never set are treated as absent and pass.
    /// Null references are always accepted; they are skipped during traversal.
    pub fn validate(&self, registry: &TypeRegistry) -> Result<(), GraphError> {
        for node in &self.nodes {
            let descriptor = registry.get(node.ty).ok_or_else(|| GraphError::UnknownType {
                object: node.key.clone(),
                ty: node.ty.to_string(),
            })?;
            if descriptor.primitive {
                return Err(GraphError::PrimitiveObject {
                    object: node.key.clone(),
                    ty: descriptor.name.clone(),
                });
            }
            for member in &descriptor.members {
                if let Some(value) = node.value_of(&member.name) {
                    self.check_member(registry, node, member, value)?;
                }
            }
            if let Some((name, _)) = node
                .fields
                .iter()
                .find(|(name, _)| descriptor.member(name).is_none())
            {
                return Err(GraphError::UnknownMember {
                    object: node.key.clone(),
                    member: name.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_member(
        &self,
        registry: &TypeRegistry,
        node: &ObjectNode,
        member: &MemberDescriptor,
        value: &Value,
    ) -> Result<(), GraphError> {
        if !member.collection {
            return self.check_element(registry, node, member, value);
        }
        match value {
            Value::List(elements) => elements
                .iter()
                .try_for_each(|element| self.check_element(registry, node, member, element)),
            Value::Null if member.nullable => Ok(()),
            other => Err(shape_mismatch(node, member, "a list", other)),
        }
    }

    fn check_element(
        &self,
        registry: &TypeRegistry,
        node: &ObjectNode,
        member: &MemberDescriptor,
        value: &Value,
    ) -> Result<(), GraphError> {
        match (member.kind, value) {
            (MemberKind::Primitive, Value::Scalar(_)) => Ok(()),
            (MemberKind::Primitive, Value::Null) if member.nullable => Ok(()),
            (MemberKind::Primitive, other) => Err(shape_mismatch(node, member, "a scalar", other)),
            (_, Value::Null) => Ok(()),
            (_, Value::Object(id)) => {
                let target = self.node(*id)?;
                let expected = member.target.unwrap_or(target.ty);
                if registry.is_derived_from(target.ty, expected) {
                    Ok(())
                } else {
                    Err(GraphError::TypeMismatch {
                        object: node.key.clone(),
                        member: member.name.clone(),
                        expected: registry.name_of(expected),
                        target: target.key.clone(),
                        found: registry.name_of(target.ty),
                    })
                }
            }
            (_, other) => Err(shape_mismatch(node, member, "an object reference", other)),
        }
    }
}

/// Handle for the object stored at `index`.
fn next_id(index: usize, key: &str) -> Result<ObjectId, GraphError> {
    u32::try_from(index)
        .map(ObjectId)
        .map_err(|_| GraphError::TooManyObjects(key.to_string()))
}

fn shape_mismatch(
    node: &ObjectNode,
    member: &MemberDescriptor,
    expected: &str,
    found: &Value,
) -> GraphError {
    GraphError::ShapeMismatch {
        object: node.key.clone(),
        member: member.name.clone(),
        expected: expected.to_string(),
        found: found.describe(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
        package test:graph
        primitive float3 { x: f32, y: f32, z: f32 }
        record entity {
            position: float3,
            components: list<component>,
            @streaming neighbour: option<entity>,
        }
        record component {}
        record transform_component : component {}
        record unrelated {}
    "#;

    fn registry() -> TypeRegistry {
        TypeRegistry::from_source(SCHEMA).unwrap()
    }

    #[test]
    fn test_add_and_find() {
        let mut graph = ObjectGraph::new();
        let a = graph.add("a", TypeKey::from_name("entity")).unwrap();
        let b = graph.add("b", TypeKey::from_name("entity")).unwrap();
        assert_eq!(a, ObjectId(0));
        assert_eq!(b, ObjectId(1));
        assert_eq!(graph.find("b"), Some(b));
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.key_of(ObjectId(7)), "#7");
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut graph = ObjectGraph::new();
        graph.add("a", TypeKey::from_name("entity")).unwrap();
        let err = graph.add("a", TypeKey::from_name("entity")).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateKey(ref k) if k == "a"));
    }

    #[test]
    fn test_unset_field_reads_as_null() {
        let mut graph = ObjectGraph::new();
        let a = graph.add("a", TypeKey::from_name("entity")).unwrap();
        assert_eq!(graph.node(a).unwrap().field("components"), &Value::Null);
    }

    #[test]
    fn test_validate_accepts_subtypes_and_nulls() {
        let mut graph = ObjectGraph::new();
        let e = graph.add("e", TypeKey::from_name("entity")).unwrap();
        let t = graph
            .add("t", TypeKey::from_name("transform_component"))
            .unwrap();
        graph
            .set(e, "position", serde_json::json!([0.0, 1.0, 2.0]))
            .unwrap();
        graph
            .set(e, "components", Value::List(vec![Value::Object(t), Value::Null]))
            .unwrap();
        graph.set(e, "neighbour", None::<ObjectId>).unwrap();
        graph.validate(&registry()).unwrap();
    }

    #[test]
    fn test_validate_rejects_wrong_target_type() {
        let mut graph = ObjectGraph::new();
        let e = graph.add("e", TypeKey::from_name("entity")).unwrap();
        let u = graph.add("u", TypeKey::from_name("unrelated")).unwrap();
        graph.set(e, "components", vec![u]).unwrap();
        let err = graph.validate(&registry()).unwrap_err();
        assert!(matches!(err, GraphError::TypeMismatch { ref target, .. } if target == "u"));
    }

    #[test]
    fn test_validate_rejects_shape_mismatch() {
        let mut graph = ObjectGraph::new();
        let e = graph.add("e", TypeKey::from_name("entity")).unwrap();
        let c = graph.add("c", TypeKey::from_name("component")).unwrap();
        graph.set(e, "components", c).unwrap();
        let err = graph.validate(&registry()).unwrap_err();
        assert!(matches!(err, GraphError::ShapeMismatch { ref member, .. } if member == "components"));
    }

    #[test]
    fn test_validate_rejects_unknown_member_and_type() {
        let mut graph = ObjectGraph::new();
        let e = graph.add("e", TypeKey::from_name("entity")).unwrap();
        graph.set(e, "velocity", serde_json::json!(1.0)).unwrap();
        assert!(matches!(
            graph.validate(&registry()),
            Err(GraphError::UnknownMember { .. })
        ));

        let mut graph = ObjectGraph::new();
        graph.add("ghost", TypeKey::from_name("ghost")).unwrap();
        assert!(matches!(
            graph.validate(&registry()),
            Err(GraphError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_validate_reports_first_declared_member() {
        let registry = TypeRegistry::from_source(
            r#"
            package test:order
            record sample { a: f32, b: f32, c: f32, d: f32, x: f32 }
        "#,
        )
        .unwrap();
        for _ in 0..20 {
            let mut graph = ObjectGraph::new();
            let o = graph.add("o", TypeKey::from_name("sample")).unwrap();
            for member in ["x", "d", "c", "b", "a"] {
                graph.set(o, member, Value::List(vec![])).unwrap();
            }
            let err = graph.validate(&registry).unwrap_err();
            assert!(matches!(err, GraphError::ShapeMismatch { ref member, .. } if member == "a"));
        }
    }

    #[test]
    fn test_undeclared_members_reported_in_set_order() {
        let mut graph = ObjectGraph::new();
        let e = graph.add("e", TypeKey::from_name("entity")).unwrap();
        graph.set(e, "zeta", serde_json::json!(1)).unwrap();
        graph.set(e, "alpha", serde_json::json!(2)).unwrap();
        graph.set(e, "zeta", serde_json::json!(3)).unwrap();
        assert_eq!(
            graph.node(e).unwrap().field("zeta"),
            &Value::Scalar(serde_json::json!(3))
        );
        let err = graph.validate(&registry()).unwrap_err();
        assert!(matches!(err, GraphError::UnknownMember { ref member, .. } if member == "zeta"));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_handle_overflow_is_error() {
        assert_eq!(next_id(5, "a").unwrap(), ObjectId(5));
        let err = next_id(u32::MAX as usize + 1, "late").unwrap_err();
        assert!(matches!(err, GraphError::TooManyObjects(ref k) if k == "late"));
    }

    #[test]
    fn test_validate_rejects_primitive_objects() {
        let mut graph = ObjectGraph::new();
        graph.add("p", TypeKey::from_name("float3")).unwrap();
        assert!(matches!(
            graph.validate(&registry()),
            Err(GraphError::PrimitiveObject { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_dangling_reference() {
        let mut graph = ObjectGraph::new();
        let e = graph.add("e", TypeKey::from_name("entity")).unwrap();
        graph.set(e, "neighbour", ObjectId(42)).unwrap();
        assert!(matches!(
            graph.validate(&registry()),
            Err(GraphError::UnknownObject(ObjectId(42)))
        ));
    }
}
