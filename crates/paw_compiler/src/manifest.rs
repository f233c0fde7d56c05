//! Unit manifest and its codecs.
//!
//! The manifest is what the compiler hands to the per-unit serializer: one
//! entry per streaming unit with its ordered member keys and outgoing
//! dependencies, plus the load stages. It is written as pretty JSON or as
//! MessagePack.

use paw_graph::ObjectGraph;
use paw_schema::TypeRegistry;
use serde::{Deserialize, Serialize};

use crate::error::CompileError;
use crate::partition::{UnitId, UnitSet};

/// Bumped whenever the manifest layout changes.
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitManifest {
    pub version: u32,
    pub units: Vec<UnitEntry>,
    /// Unit ids grouped by streaming distance from the root set.
    pub stages: Vec<Vec<UnitId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitEntry {
    pub id: UnitId,
    pub root: String,
    pub root_type: String,
    /// Object keys, root first.
    pub members: Vec<String>,
    pub dependencies: Vec<UnitId>,
}

impl UnitManifest {
    pub fn new(graph: &ObjectGraph, registry: &TypeRegistry, units: &UnitSet) -> Self {
        let units_out = units
            .units()
            .iter()
            .map(|unit| UnitEntry {
                id: unit.id,
                root: graph.key_of(unit.root),
                root_type: graph
                    .get(unit.root)
                    .map(|node| registry.name_of(node.ty))
                    .unwrap_or_default(),
                members: unit.members.iter().map(|&m| graph.key_of(m)).collect(),
                dependencies: unit.dependencies.clone(),
            })
            .collect();

        Self {
            version: MANIFEST_VERSION,
            units: units_out,
            stages: units.load_stages(),
        }
    }

    /// The entry whose root has the given key.
    pub fn unit(&self, root: &str) -> Option<&UnitEntry> {
        self.units.iter().find(|u| u.root == root)
    }

    pub fn object_count(&self) -> usize {
        self.units.iter().map(|u| u.members.len()).sum()
    }

    pub fn dependency_count(&self) -> usize {
        self.units.iter().map(|u| u.dependencies.len()).sum()
    }
}

/// Encoding of the written manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    #[value(name = "msgpack")]
    MessagePack,
}

/// Encode a manifest in the given format.
///
/// # Errors
///
/// Returns [`CompileError::EncodeJson`] or [`CompileError::Encode`] if
/// serialisation fails.
pub fn encode(manifest: &UnitManifest, format: OutputFormat) -> Result<Vec<u8>, CompileError> {
    match format {
        OutputFormat::Json => {
            let mut bytes =
                serde_json::to_vec_pretty(manifest).map_err(CompileError::EncodeJson)?;
            bytes.push(b'\n');
            Ok(bytes)
        }
        OutputFormat::MessagePack => Ok(rmp_serde::to_vec_named(manifest)?),
    }
}

/// Decode a manifest previously written by [`encode`].
pub fn decode(bytes: &[u8], format: OutputFormat) -> Result<UnitManifest, CompileError> {
    match format {
        OutputFormat::Json => serde_json::from_slice(bytes).map_err(CompileError::DecodeJson),
        OutputFormat::MessagePack => Ok(rmp_serde::from_slice(bytes)?),
    }
}
