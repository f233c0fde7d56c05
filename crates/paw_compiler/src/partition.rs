//! Streaming unit partitioner.
//!
//! Consumes a [`Walk`] and groups the visited objects into streaming units.
//! An object roots a unit iff it is in the root set or is the target of a
//! `StreamingRef` edge. Each unit holds its root plus every object reachable
//! from the root through `Owned` edges alone; traversal stops at every
//! streaming boundary.
//!
//! Ambiguous ownership is rejected rather than resolved:
//!
//! - an object that is both an `Owned` target and a unit root, and
//! - an object owned from two different units
//!
//! both fail with an [`OwnershipConflictError`] that names the object and
//! the two routes through which it was reached.

use std::collections::{HashMap, HashSet, VecDeque};

use paw_graph::{DiscoveryPath, Edge, EdgeKind, ObjectGraph, ObjectId, Walk};
use paw_schema::fnv1a_64;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Stable identifier of a streaming unit, the FNV-1a hash of its root's key.
///
/// Derived from the root's identity only, so editing the contents of a unit
/// does not change its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u64);

impl UnitId {
    #[must_use]
    pub const fn from_key(root_key: &str) -> Self {
        Self(fnv1a_64(root_key))
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum OwnershipConflictError {
    /// An object is composed into a unit and also roots a unit of its own.
    #[error(
        "object '{object}' is owned via `{owned_path}` but is also a streaming unit root via `{boundary_path}`"
    )]
    OwnedUnitRoot {
        object: String,
        owned_path: DiscoveryPath,
        boundary_path: DiscoveryPath,
    },
    /// An object is composed into two different units.
    #[error("object '{object}' is owned by two streaming units, via `{first_path}` and `{second_path}`")]
    SharedOwnership {
        object: String,
        first_path: DiscoveryPath,
        second_path: DiscoveryPath,
    },
    /// Two unit roots hash to the same unit identifier.
    #[error("unit roots '{first}' and '{object}' share the unit id {id}")]
    UnitIdCollision {
        object: String,
        first: String,
        id: UnitId,
    },
}

impl OwnershipConflictError {
    /// Key of the offending object.
    pub fn object(&self) -> &str {
        match self {
            Self::OwnedUnitRoot { object, .. }
            | Self::SharedOwnership { object, .. }
            | Self::UnitIdCollision { object, .. } => object,
        }
    }
}

/// An independently loadable cluster of objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingUnit {
    pub id: UnitId,
    pub root: ObjectId,
    /// Root first, then owned objects in discovery order.
    pub members: Vec<ObjectId>,
    /// Units this unit references through streaming boundaries, in the
    /// order the references were discovered.
    pub dependencies: Vec<UnitId>,
}

/// A `StreamingRef` edge lifted to the units on either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitDependency {
    pub from: UnitId,
    pub to: UnitId,
}

/// Ordered partition of a walked graph.
#[derive(Debug, Default)]
pub struct UnitSet {
    units: Vec<StreamingUnit>,
    dependencies: Vec<UnitDependency>,
    /// Indices of units rooted in the root set.
    entry_units: Vec<usize>,
    by_id: HashMap<UnitId, usize>,
    by_object: HashMap<ObjectId, usize>,
}

impl UnitSet {
    /// Units in the order their roots were discovered.
    pub fn units(&self) -> &[StreamingUnit] {
        &self.units
    }

    /// All unit dependency edges, in discovery order.
    pub fn dependencies(&self) -> &[UnitDependency] {
        &self.dependencies
    }

    pub fn unit(&self, id: UnitId) -> Option<&StreamingUnit> {
        self.by_id.get(&id).map(|&i| &self.units[i])
    }

    /// The unit `object` belongs to, as root or owned member.
    pub fn unit_of(&self, object: ObjectId) -> Option<&StreamingUnit> {
        self.by_object.get(&object).map(|&i| &self.units[i])
    }

    pub fn unit_rooted_at(&self, root: ObjectId) -> Option<&StreamingUnit> {
        self.unit_of(root).filter(|u| u.root == root)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Append `unit`, rejecting an id that is already taken.
    fn push_unit(
        &mut self,
        graph: &ObjectGraph,
        unit: StreamingUnit,
        entry: bool,
    ) -> Result<(), OwnershipConflictError> {
        let index = self.units.len();
        if let Some(&other) = self.by_id.get(&unit.id) {
            return Err(OwnershipConflictError::UnitIdCollision {
                object: graph.key_of(unit.root),
                first: graph.key_of(self.units[other].root),
                id: unit.id,
            });
        }
        self.by_id.insert(unit.id, index);
        if entry {
            self.entry_units.push(index);
        }
        self.units.push(unit);
        Ok(())
    }

    /// Units grouped by streaming distance from the root set.
    ///
    /// Stage 0 holds the root-set units, stage `n + 1` the units first
    /// referenced from stage `n`. Cyclic references between units are fine;
    /// each unit appears in exactly one stage.
    pub fn load_stages(&self) -> Vec<Vec<UnitId>> {
        let mut staged: HashSet<usize> = self.entry_units.iter().copied().collect();
        let mut current: Vec<usize> = self.entry_units.clone();
        let mut stages = Vec::new();

        while !current.is_empty() {
            let mut next = Vec::new();
            for &i in &current {
                for dep in &self.units[i].dependencies {
                    if let Some(&j) = self.by_id.get(dep) {
                        if staged.insert(j) {
                            next.push(j);
                        }
                    }
                }
            }
            stages.push(current.iter().map(|&i| self.units[i].id).collect());
            current = next;
        }
        stages
    }
}

/// Partition the objects visited by `walk` into streaming units.
pub fn partition(
    graph: &ObjectGraph,
    roots: &[ObjectId],
    walk: &Walk,
) -> Result<UnitSet, OwnershipConflictError> {
    // Unit roots, each with the streaming edge that first targeted it. Root
    // set members carry no edge.
    let mut boundary: HashMap<ObjectId, Option<&Edge>> = HashMap::new();
    for &root in roots {
        boundary.insert(root, None);
    }
    for edge in streaming_edges(walk) {
        boundary.entry(edge.to).or_insert(Some(edge));
    }

    let mut unit_roots: Vec<ObjectId> = boundary.keys().copied().collect();
    unit_roots.sort_by_key(|&id| (walk.rank(id).unwrap_or(usize::MAX), id));

    let mut owned: HashMap<ObjectId, Vec<&Edge>> = HashMap::new();
    for edge in walk.edges.iter().filter(|e| e.kind == EdgeKind::Owned) {
        if let Some(via) = boundary.get(&edge.to) {
            let boundary_path = match via {
                Some(streaming) => walk.path_through(graph, streaming),
                None => walk.discovery_path(graph, edge.to),
            };
            return Err(OwnershipConflictError::OwnedUnitRoot {
                object: graph.key_of(edge.to),
                owned_path: walk.path_through(graph, edge),
                boundary_path,
            });
        }
        owned.entry(edge.from).or_default().push(edge);
    }

    let mut set = UnitSet::default();
    let mut owned_via: HashMap<ObjectId, &Edge> = HashMap::new();
    let root_set: HashSet<ObjectId> = roots.iter().copied().collect();

    for root in unit_roots {
        let index = set.units.len();
        let mut members = vec![root];
        set.by_object.insert(root, index);

        let mut work = VecDeque::from([root]);
        while let Some(id) = work.pop_front() {
            for &edge in owned.get(&id).map(Vec::as_slice).unwrap_or_default() {
                match set.by_object.get(&edge.to).copied() {
                    Some(unit) if unit == index => {}
                    Some(_) => {
                        let first_path = match owned_via.get(&edge.to) {
                            Some(first) => walk.path_through(graph, first),
                            None => walk.discovery_path(graph, edge.to),
                        };
                        return Err(OwnershipConflictError::SharedOwnership {
                            object: graph.key_of(edge.to),
                            first_path,
                            second_path: walk.path_through(graph, edge),
                        });
                    }
                    None => {
                        set.by_object.insert(edge.to, index);
                        owned_via.insert(edge.to, edge);
                        members.push(edge.to);
                        work.push_back(edge.to);
                    }
                }
            }
        }
        members.sort_by_key(|&id| (walk.rank(id).unwrap_or(usize::MAX), id));

        let unit = StreamingUnit {
            id: UnitId::from_key(&graph.key_of(root)),
            root,
            members,
            dependencies: Vec::new(),
        };
        set.push_unit(graph, unit, root_set.contains(&root))?;
    }

    let mut seen = HashSet::new();
    for edge in streaming_edges(walk) {
        let (Some(&from), Some(&to)) = (set.by_object.get(&edge.from), set.by_object.get(&edge.to))
        else {
            continue;
        };
        if from == to {
            continue;
        }
        let dependency = UnitDependency {
            from: set.units[from].id,
            to: set.units[to].id,
        };
        if seen.insert(dependency) {
            set.units[from].dependencies.push(dependency.to);
            set.dependencies.push(dependency);
        }
    }

    debug!(
        units = set.units.len(),
        dependencies = set.dependencies.len(),
        "streaming units partitioned"
    );
    Ok(set)
}

fn streaming_edges(walk: &Walk) -> impl Iterator<Item = &Edge> {
    walk.edges
        .iter()
        .filter(|e| e.kind == EdgeKind::StreamingRef)
}
