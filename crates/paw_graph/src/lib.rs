//! # paw_graph
//!
//! The object side of the paw data compiler.
//!
//! - [`ObjectGraph`]: arena of [`ObjectNode`]s addressed by [`ObjectId`].
//! - [`SceneDocument`]: JSON form of a materialized scene and its root set.
//! - [`Walker`]: iterative, single-visit traversal that classifies every
//!   reference into an [`Edge`] of kind [`EdgeKind::Owned`] or
//!   [`EdgeKind::StreamingRef`].

pub mod document;
pub mod object;
pub mod walker;

pub use document::{ObjectDocument, SceneDocument};
pub use object::{GraphError, ObjectGraph, ObjectId, ObjectNode, Value};
pub use walker::{DiscoveryPath, Edge, EdgeKind, PathStep, Walk, Walker, walk};
