//! JSON scene documents.
//!
//! A scene document is the already-materialized domain data handed to the
//! compiler: a flat list of keyed objects plus the keys of the root set.
//! Reference-typed members hold the key of the referenced object.
//!
//! ```json
//! {
//!   "roots": ["game"],
//!   "objects": [
//!     { "key": "game", "type": "game", "fields": { "main_map": "map" } },
//!     { "key": "map", "type": "map", "fields": { "tiles": [] } }
//!   ]
//! }
//! ```

use paw_schema::{MemberDescriptor, MemberKind, TypeRegistry};
use serde::{Deserialize, Serialize};

use crate::object::{GraphError, ObjectGraph, ObjectId, Value};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default)]
    pub roots: Vec<String>,
    pub objects: Vec<ObjectDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDocument {
    pub key: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl SceneDocument {
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// Materialize the document into an arena and resolve its root set.
    ///
    /// Objects are added in document order, so object handles and therefore
    /// traversal order are reproducible for the same document.
    pub fn to_graph(
        &self,
        registry: &TypeRegistry,
    ) -> Result<(ObjectGraph, Vec<ObjectId>), GraphError> {
        let mut graph = ObjectGraph::new();
        let mut ids = Vec::with_capacity(self.objects.len());
        for object in &self.objects {
            let ty = registry
                .key_of(&object.ty)
                .ok_or_else(|| GraphError::UnknownType {
                    object: object.key.clone(),
                    ty: object.ty.clone(),
                })?;
            ids.push(graph.add(object.key.clone(), ty)?);
        }

        for (&id, object) in ids.iter().zip(&self.objects) {
            let ty = graph.node(id)?.ty;
            for (name, raw) in &object.fields {
                let member = registry
                    .get(ty)
                    .and_then(|t| t.member(name))
                    .ok_or_else(|| GraphError::UnknownMember {
                        object: object.key.clone(),
                        member: name.clone(),
                    })?;
                let value = convert_member(&graph, &object.key, member, raw)?;
                graph.set(id, name.clone(), value)?;
            }
        }

        let roots = self
            .roots
            .iter()
            .map(|key| graph.find(key).ok_or_else(|| GraphError::UnknownRoot(key.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((graph, roots))
    }
}

fn convert_member(
    graph: &ObjectGraph,
    object: &str,
    member: &MemberDescriptor,
    raw: &serde_json::Value,
) -> Result<Value, GraphError> {
    if !member.collection {
        return convert_element(graph, object, member, raw);
    }
    match raw {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| convert_element(graph, object, member, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        other => Err(GraphError::ShapeMismatch {
            object: object.to_string(),
            member: member.name.clone(),
            expected: "a list".to_string(),
            found: json_kind(other),
        }),
    }
}

fn convert_element(
    graph: &ObjectGraph,
    object: &str,
    member: &MemberDescriptor,
    raw: &serde_json::Value,
) -> Result<Value, GraphError> {
    match (member.kind, raw) {
        (_, serde_json::Value::Null) => Ok(Value::Null),
        (MemberKind::Primitive, scalar) => Ok(Value::Scalar(scalar.clone())),
        (_, serde_json::Value::String(key)) => graph
            .find(key)
            .map(Value::Object)
            .ok_or_else(|| GraphError::UnknownObjectKey(key.clone())),
        (_, other) => Err(GraphError::ShapeMismatch {
            object: object.to_string(),
            member: member.name.clone(),
            expected: "an object key".to_string(),
            found: json_kind(other),
        }),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a bool",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
        package test:doc
        primitive float3 { x: f32, y: f32, z: f32 }
        record game { @streaming main_map: map }
        record map { @streaming tiles: list<tile> }
        record tile { position: float3 }
    "#;

    #[test]
    fn test_document_to_graph() {
        let registry = TypeRegistry::from_source(SCHEMA).unwrap();
        let doc = SceneDocument::from_json(
            r#"{
                "roots": ["game"],
                "objects": [
                    { "key": "game", "type": "game", "fields": { "main_map": "map" } },
                    { "key": "map", "type": "map", "fields": { "tiles": ["t0", "t1"] } },
                    { "key": "t0", "type": "tile", "fields": { "position": { "x": 1.0 } } },
                    { "key": "t1", "type": "tile" }
                ]
            }"#,
        )
        .unwrap();

        let (graph, roots) = doc.to_graph(&registry).unwrap();
        assert_eq!(roots, vec![ObjectId(0)]);
        assert_eq!(graph.len(), 4);
        assert_eq!(
            graph.node(ObjectId(1)).unwrap().field("tiles"),
            &Value::List(vec![Value::Object(ObjectId(2)), Value::Object(ObjectId(3))])
        );
        assert_eq!(
            graph.node(ObjectId(2)).unwrap().field("position"),
            &Value::Scalar(serde_json::json!({ "x": 1.0 }))
        );
        graph.validate(&registry).unwrap();
    }

    #[test]
    fn test_unknown_reference_key() {
        let registry = TypeRegistry::from_source(SCHEMA).unwrap();
        let doc = SceneDocument::from_json(
            r#"{ "objects": [ { "key": "game", "type": "game", "fields": { "main_map": "nowhere" } } ] }"#,
        )
        .unwrap();
        let err = doc.to_graph(&registry).unwrap_err();
        assert!(matches!(err, GraphError::UnknownObjectKey(ref k) if k == "nowhere"));
    }

    #[test]
    fn test_unknown_root_and_type() {
        let registry = TypeRegistry::from_source(SCHEMA).unwrap();
        let doc = SceneDocument::from_json(r#"{ "roots": ["missing"], "objects": [] }"#).unwrap();
        assert!(matches!(
            doc.to_graph(&registry),
            Err(GraphError::UnknownRoot(_))
        ));

        let doc = SceneDocument::from_json(r#"{ "objects": [ { "key": "x", "type": "nope" } ] }"#)
            .unwrap();
        assert!(matches!(
            doc.to_graph(&registry),
            Err(GraphError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_reference_must_be_key() {
        let registry = TypeRegistry::from_source(SCHEMA).unwrap();
        let doc = SceneDocument::from_json(
            r#"{ "objects": [ { "key": "map", "type": "map", "fields": { "tiles": "t0" } } ] }"#,
        )
        .unwrap();
        let err = doc.to_graph(&registry).unwrap_err();
        assert!(matches!(err, GraphError::ShapeMismatch { found: "a string", .. }));
    }
}
