//! Graph walker.
//!
//! Traverses the object graph from the root set with an explicit FIFO work
//! list instead of recursion, so deep or cyclic graphs cannot exhaust the
//! stack. A node is marked visited when it is discovered and is expanded
//! exactly once, however many edges point at it.
//!
//! For each expanded node the walker goes through the members of its runtime
//! type in declaration order:
//!
//! - `Primitive` members are skipped.
//! - `Owned` members emit an [`EdgeKind::Owned`] edge per non-null element.
//! - `StreamingRef` members emit an [`EdgeKind::StreamingRef`] edge per
//!   non-null element; an undiscovered target is recorded as a unit-root
//!   candidate. Its own members are still walked.
//!
//! Null references emit nothing. Given the same registry, graph and root
//! set, the edge list and every order recorded in [`Walk`] are identical
//! between runs.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use paw_schema::{MemberDescriptor, MemberKind, TypeRegistry};
use serde::Serialize;
use tracing::{debug, trace};

use crate::object::{GraphError, ObjectGraph, ObjectId, Value};

/// Classification of a traversed reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EdgeKind {
    Owned,
    StreamingRef,
}

/// One classified reference from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub kind: EdgeKind,
    pub from: ObjectId,
    pub to: ObjectId,
    /// Member of `from` holding the reference.
    pub member: String,
    /// Position within the member when it is a collection.
    pub element: Option<usize>,
}

/// Result of one traversal.
#[derive(Debug, Default)]
pub struct Walk {
    /// Every classified edge, in emission order.
    pub edges: Vec<Edge>,
    /// Nodes in discovery order. With a FIFO work list this is also the
    /// order in which they were expanded.
    pub order: Vec<ObjectId>,
    /// Nodes first discovered through a `StreamingRef` edge.
    pub candidates: Vec<ObjectId>,
    roots: HashSet<ObjectId>,
    rank: HashMap<ObjectId, usize>,
    /// Index into `edges` of the edge that discovered each non-root node.
    discovered_by: HashMap<ObjectId, usize>,
}

impl Walk {
    /// Position of `id` in discovery order.
    pub fn rank(&self, id: ObjectId) -> Option<usize> {
        self.rank.get(&id).copied()
    }

    pub fn is_root(&self, id: ObjectId) -> bool {
        self.roots.contains(&id)
    }

    /// The edge through which `id` was first discovered; `None` for roots.
    pub fn discovered_by(&self, id: ObjectId) -> Option<&Edge> {
        self.discovered_by.get(&id).map(|&i| &self.edges[i])
    }

    /// The chain of edges from a root to `id`, following first discoveries.
    pub fn discovery_path(&self, graph: &ObjectGraph, id: ObjectId) -> DiscoveryPath {
        let mut steps = Vec::new();
        let mut current = id;
        while let Some(edge) = self.discovered_by(current) {
            steps.push(PathStep::new(graph, edge));
            current = edge.from;
        }
        steps.reverse();
        DiscoveryPath {
            root: graph.key_of(current),
            steps,
        }
    }

    /// The discovery path of `edge.from` extended by `edge` itself.
    pub fn path_through(&self, graph: &ObjectGraph, edge: &Edge) -> DiscoveryPath {
        let mut path = self.discovery_path(graph, edge.from);
        path.steps.push(PathStep::new(graph, edge));
        path
    }
}

/// Human-readable route from a root to an object, used in diagnostics.
///
/// Rendered as `game.main_map => map.tiles[0] => tile_0.entities[0] -> entity_0`
/// where `->` is an owned edge and `=>` a streaming reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryPath {
    pub root: String,
    pub steps: Vec<PathStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathStep {
    pub kind: EdgeKind,
    pub member: String,
    pub element: Option<usize>,
    pub target: String,
}

impl PathStep {
    fn new(graph: &ObjectGraph, edge: &Edge) -> Self {
        Self {
            kind: edge.kind,
            member: edge.member.clone(),
            element: edge.element,
            target: graph.key_of(edge.to),
        }
    }
}

impl fmt::Display for DiscoveryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for step in &self.steps {
            write!(f, ".{}", step.member)?;
            if let Some(i) = step.element {
                write!(f, "[{i}]")?;
            }
            let arrow = match step.kind {
                EdgeKind::Owned => "->",
                EdgeKind::StreamingRef => "=>",
            };
            write!(f, " {arrow} {}", step.target)?;
        }
        Ok(())
    }
}

/// Walks object graphs using the member classification of a registry.
#[derive(Debug, Clone, Copy)]
pub struct Walker<'r> {
    registry: &'r TypeRegistry,
}

impl<'r> Walker<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry }
    }

    /// Traverse everything reachable from `roots`.
    ///
    /// Roots are seeded in the given order; a root listed twice is walked
    /// once.
    pub fn walk(&self, graph: &ObjectGraph, roots: &[ObjectId]) -> Result<Walk, GraphError> {
        let mut walk = Walk::default();
        let mut work: VecDeque<ObjectId> = VecDeque::new();

        for &root in roots {
            graph.node(root)?;
            walk.roots.insert(root);
            if discover(&mut walk, root) {
                work.push_back(root);
            }
        }

        while let Some(id) = work.pop_front() {
            let node = graph.node(id)?;
            let descriptor =
                self.registry
                    .get(node.ty)
                    .ok_or_else(|| GraphError::UnknownType {
                        object: node.key.clone(),
                        ty: node.ty.to_string(),
                    })?;

            for member in &descriptor.members {
                let kind = match member.kind {
                    MemberKind::Primitive => continue,
                    MemberKind::Owned => EdgeKind::Owned,
                    MemberKind::StreamingRef => EdgeKind::StreamingRef,
                };

                for (element, value) in elements(member, node.field(&member.name)) {
                    let child = match value {
                        Value::Object(child) => *child,
                        Value::Null => {
                            trace!(object = %node.key, member = %member.name, "null reference skipped");
                            continue;
                        }
                        other => {
                            return Err(GraphError::ShapeMismatch {
                                object: node.key.clone(),
                                member: member.name.clone(),
                                expected: "an object reference".to_string(),
                                found: other.describe(),
                            });
                        }
                    };
                    graph.node(child)?;

                    walk.edges.push(Edge {
                        kind,
                        from: id,
                        to: child,
                        member: member.name.clone(),
                        element,
                    });

                    if discover(&mut walk, child) {
                        walk.discovered_by.insert(child, walk.edges.len() - 1);
                        if kind == EdgeKind::StreamingRef {
                            walk.candidates.push(child);
                        }
                        work.push_back(child);
                    }
                }
            }
        }

        debug!(
            roots = walk.roots.len(),
            visited = walk.order.len(),
            edges = walk.edges.len(),
            candidates = walk.candidates.len(),
            "graph walk complete"
        );
        Ok(walk)
    }
}

/// Mark `id` visited. Returns `false` if it was already discovered.
fn discover(walk: &mut Walk, id: ObjectId) -> bool {
    if walk.rank.contains_key(&id) {
        return false;
    }
    walk.rank.insert(id, walk.order.len());
    walk.order.push(id);
    true
}

/// Elements of a member value with their collection index.
///
/// A non-collection member yields its value once. A null collection yields
/// nothing.
fn elements<'v>(
    member: &MemberDescriptor,
    value: &'v Value,
) -> Box<dyn Iterator<Item = (Option<usize>, &'v Value)> + 'v> {
    match value {
        Value::List(items) if member.collection => {
            Box::new(items.iter().enumerate().map(|(i, v)| (Some(i), v)))
        }
        Value::Null if member.collection => Box::new(std::iter::empty()),
        other => Box::new(std::iter::once((None, other))),
    }
}

/// Convenience wrapper around [`Walker::walk`].
pub fn walk(
    registry: &TypeRegistry,
    graph: &ObjectGraph,
    roots: &[ObjectId],
) -> Result<Walk, GraphError> {
    Walker::new(registry).walk(graph, roots)
}
