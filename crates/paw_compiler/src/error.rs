//! Compiler error types.

use std::path::PathBuf;

use paw_graph::GraphError;
use paw_schema::SchemaError;

use crate::partition::OwnershipConflictError;

/// Errors that abort a compilation. No output is written when one occurs.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The schema failed to load or could not be resolved into a registry.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The scene does not conform to the registry.
    #[error("scene error: {0}")]
    Graph(#[from] GraphError),

    /// Two routes disagree about which unit an object belongs to.
    #[error("ownership conflict: {0}")]
    Conflict(#[from] OwnershipConflictError),

    /// A scene document is not valid JSON or does not match the document shape.
    #[error("invalid scene document '{}': {source}", .path.display())]
    Scene {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Neither a schema path nor the demo schema was given.
    #[error("no schema given; pass --schema or --demo")]
    NoSchema,

    /// Neither a scene document nor the demo scene was given.
    #[error("no scene given; pass --scene or --demo")]
    NoScene,

    /// Failed to encode the manifest as JSON.
    #[error("failed to encode manifest as JSON: {0}")]
    EncodeJson(#[source] serde_json::Error),

    /// Failed to decode a JSON manifest.
    #[error("failed to decode JSON manifest: {0}")]
    DecodeJson(#[source] serde_json::Error),

    /// Failed to encode the manifest as MessagePack.
    #[error("failed to encode manifest: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a MessagePack manifest.
    #[error("failed to decode manifest: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
