//! Streaming unit compiler.
//!
//! Partitions a typed object graph into independently loadable streaming
//! units and writes a manifest describing them. The pipeline is
//! registry -> walk -> partition -> manifest:
//!
//! - [`paw_schema`] supplies the member classification,
//! - [`paw_graph`] holds the objects and walks them from the root set,
//! - [`partition`] groups the walked objects into units,
//! - [`manifest`] encodes the result for the per-unit serializer.

pub mod config;
pub mod demo;
pub mod driver;
pub mod error;
pub mod manifest;
pub mod partition;

pub use config::CompilerConfig;
pub use driver::{CompileSummary, Compiler, load_registry, run};
pub use error::CompileError;
pub use manifest::{OutputFormat, UnitEntry, UnitManifest};
pub use partition::{
    OwnershipConflictError, StreamingUnit, UnitDependency, UnitId, UnitSet, partition,
};
