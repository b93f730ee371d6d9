//! Dependency resolver.
//!
//! Turns the selected diff-tree elements plus both snapshots'
//! dependency graphs into an ordered collection of per-object actions.
//! Insertion order of the returned collection **is** the execution
//! order; downstream consumers must not re-sort it.
//!
//! Scheduling rules:
//! - an object present only in the old snapshot is dropped, after
//!   everything that transitively depends on it (reverse topological
//!   order); dependents that survive in the new snapshot are recreated
//!   afterwards;
//! - an object present only in the new snapshot is created, after its
//!   not-yet-existing dependencies (topological order);
//! - an object present in both sides is altered in place when the
//!   dialect can express the change, and demoted to drop-and-recreate
//!   when it cannot.
//!
//! Cycles are detected explicitly with Tarjan's strongly-connected
//! components over the scheduled subset. A component larger than one
//! on the create side demotes its members to drop-then-recreate,
//! relying on constraints being separate, later statements to
//! re-establish the cycle.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::{Hash, Hasher};

use indexmap::IndexSet;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use sqldelta_model::{ObjectId, ObjectKind, Snapshot};

use crate::cancel::CancellationToken;
use crate::dialect::{AlterDecision, Dialect};
use crate::difftree::{DiffSide, FlatElement};
use crate::error::{EngineError, Result};
use crate::graph::DepGraph;

/// What an action does to its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Create the new snapshot's statement.
    Create,
    /// Alter the old statement into the new one in place.
    Alter,
    /// Drop the old snapshot's statement.
    Drop,
}

/// One scheduled action.
///
/// Identity (for set membership) is the (kind, object) pair; the
/// starter records why the action exists and does not participate.
#[derive(Debug, Clone)]
pub struct Action {
    /// What to do.
    pub kind: ActionKind,
    /// The object acted on.
    pub id: ObjectId,
    /// The object whose processing pulled this action in, when it was
    /// not itself a diffed element.
    pub starter: Option<ObjectId>,
}

impl Action {
    /// Creates an action without a starter.
    #[must_use]
    pub fn new(kind: ActionKind, id: ObjectId) -> Self {
        Self {
            kind,
            id,
            starter: None,
        }
    }

    /// Whether this action was pulled in by another object.
    #[must_use]
    pub fn is_pulled_in(&self) -> bool {
        self.starter.as_ref().is_some_and(|s| s != &self.id)
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

impl Eq for Action {}

impl Hash for Action {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.id.hash(state);
    }
}

/// Resolves diff elements into ordered actions.
#[derive(Debug)]
pub struct Resolver {
    old_graph: DepGraph,
    new_graph: DepGraph,
}

impl Resolver {
    /// Creates a resolver over the two snapshots' graphs. The graphs
    /// carry their own snapshot copies.
    #[must_use]
    pub fn new(old_graph: DepGraph, new_graph: DepGraph) -> Self {
        Self {
            old_graph,
            new_graph,
        }
    }

    /// Injects externally supplied (dependent, dependency) pairs,
    /// forcing ordering beyond what the graphs encode.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownOrderingTarget`] when a pair
    /// references an object absent from both snapshots.
    pub fn add_ordering(&mut self, pairs: &[(ObjectId, ObjectId)]) -> Result<()> {
        for (dependent, dependency) in pairs {
            for id in [dependent, dependency] {
                if !self.old_graph.snapshot().contains(id)
                    && !self.new_graph.snapshot().contains(id)
                {
                    return Err(EngineError::UnknownOrderingTarget(id.clone()));
                }
            }
        }
        self.old_graph.add_custom_edges(pairs);
        self.new_graph.add_custom_edges(pairs);
        Ok(())
    }

    /// Resolves the flattened elements into the ordered action set.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Cancelled`] when the token trips.
    pub fn resolve(
        &self,
        elements: &[FlatElement],
        dialect: &dyn Dialect,
        token: &CancellationToken,
    ) -> Result<Vec<Action>> {
        // Deterministic processing order: (kind rank, qualified name).
        let mut sorted: Vec<&FlatElement> = elements.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));

        let mut pass = Pass {
            old: self.old_graph.snapshot(),
            new: self.new_graph.snapshot(),
            old_graph: &self.old_graph,
            new_graph: &self.new_graph,
            dialect,
            actions: IndexSet::new(),
            created: HashSet::new(),
            dropped: HashSet::new(),
        };

        for element in sorted {
            token.ensure_active()?;
            match element.side {
                DiffSide::OldOnly => pass.schedule_drop(&element.id, None),
                DiffSide::NewOnly => pass.schedule_create(&element.id, None),
                DiffSide::Both => pass.schedule_change(&element.id),
            }
        }

        Ok(pass.actions.into_iter().collect())
    }
}

struct Pass<'a> {
    old: &'a Snapshot,
    new: &'a Snapshot,
    old_graph: &'a DepGraph,
    new_graph: &'a DepGraph,
    dialect: &'a dyn Dialect,
    actions: IndexSet<Action>,
    created: HashSet<ObjectId>,
    dropped: HashSet<ObjectId>,
}

impl Pass<'_> {
    fn schedule_drop(&mut self, id: &ObjectId, starter: Option<&ObjectId>) {
        if self.dropped.contains(id) || !self.old.contains(id) {
            return;
        }
        let root = starter.cloned().unwrap_or_else(|| id.clone());

        // The object and everything that transitively depends on it,
        // dropped dependents-first.
        let mut batch: BTreeSet<ObjectId> = BTreeSet::new();
        batch.insert(id.clone());
        batch.extend(self.old_graph.transitive_dependents(id));
        let order = drop_order(&batch, self.old_graph);

        let mut recreate: Vec<ObjectId> = Vec::new();
        for target in order {
            if self.dropped.contains(&target) {
                continue;
            }
            let Some(stmt) = self.old.get(&target) else {
                continue;
            };
            if !stmt.can_drop() {
                debug!(object = %target, "object cannot be dropped, skipping");
                continue;
            }
            // Statements inside a dropped container are covered by the
            // container's own drop.
            let covered =
                self.ancestor_in_batch(&target, &batch) || self.ancestor_dropped(&target);
            self.dropped.insert(target.clone());
            if !covered {
                // A drop supersedes any in-place alter scheduled
                // earlier for the same object.
                self.actions
                    .shift_remove(&Action::new(ActionKind::Alter, target.clone()));
                let action_starter = if &target == id {
                    starter.cloned()
                } else {
                    Some(root.clone())
                };
                self.actions.insert(Action {
                    kind: ActionKind::Drop,
                    id: target.clone(),
                    starter: action_starter,
                });
            }
            if &target != id && self.new.contains(&target) {
                recreate.push(target.clone());
            }
        }

        // Dependents that survive in the new snapshot come back once
        // their dependencies (including the dropped object's
        // replacement, when there is one) exist again.
        recreate.sort();
        for target in recreate {
            self.schedule_create(&target, Some(&root));
        }
    }

    fn schedule_create(&mut self, id: &ObjectId, starter: Option<&ObjectId>) {
        if self.created.contains(id) || !self.new.contains(id) {
            return;
        }
        let root = starter.cloned().unwrap_or_else(|| id.clone());

        let mut batch: BTreeSet<ObjectId> = BTreeSet::new();
        batch.insert(id.clone());
        for dep in self.new_graph.transitive_dependencies(id) {
            if self.needs_creation(&dep) {
                batch.insert(dep);
            }
        }

        let (order, cycle_members) = create_order(&batch, self.new_graph);

        // A create-side cycle is broken by dropping the members that
        // still exist, then creating all of them; deferred constraint
        // statements re-establish the cyclic references.
        for member in &cycle_members {
            if self.old.contains(member) && !self.dropped.contains(member) {
                let Some(stmt) = self.old.get(member) else {
                    continue;
                };
                if !stmt.can_drop() {
                    continue;
                }
                self.dropped.insert(member.clone());
                self.actions
                    .shift_remove(&Action::new(ActionKind::Alter, member.clone()));
                self.actions.insert(Action {
                    kind: ActionKind::Drop,
                    id: member.clone(),
                    starter: Some(root.clone()),
                });
            }
        }

        for target in order {
            if self.created.contains(&target) {
                continue;
            }
            self.created.insert(target.clone());

            // A column of a table created in this run is rendered
            // inline by the table's CREATE.
            if target.kind == ObjectKind::Column {
                if let Some(parent) = self.new.parent_of(&target) {
                    if parent.id() != &target && self.created.contains(parent.id()) {
                        continue;
                    }
                }
            }

            let action_starter = if &target == id {
                starter.cloned()
            } else {
                Some(root.clone())
            };
            self.actions.insert(Action {
                kind: ActionKind::Create,
                id: target,
                starter: action_starter,
            });
        }
    }

    fn schedule_change(&mut self, id: &ObjectId) {
        // Already handled as part of a recreate.
        if self.created.contains(id) || self.dropped.contains(id) {
            return;
        }
        let (Some(old_stmt), Some(new_stmt)) = (self.old.get(id), self.new.get(id)) else {
            return;
        };
        match self.dialect.alter_decision(old_stmt, new_stmt) {
            AlterDecision::Unchanged => {}
            AlterDecision::InPlace(_) => {
                self.actions.insert(Action::new(ActionKind::Alter, id.clone()));
            }
            AlterDecision::Recreate => {
                self.schedule_drop(id, None);
                self.schedule_create(id, None);
            }
        }
    }

    fn needs_creation(&self, id: &ObjectId) -> bool {
        !self.created.contains(id)
            && self.new.contains(id)
            && (!self.old.contains(id) || self.dropped.contains(id))
    }

    fn ancestor_in_batch(&self, id: &ObjectId, batch: &BTreeSet<ObjectId>) -> bool {
        let mut current = self.old.parent_of(id);
        while let Some(parent) = current {
            if batch.contains(parent.id()) {
                return true;
            }
            current = self.old.parent_of(parent.id());
        }
        false
    }

    fn ancestor_dropped(&self, id: &ObjectId) -> bool {
        let mut current = self.old.parent_of(id);
        while let Some(parent) = current {
            if self.dropped.contains(parent.id()) {
                return true;
            }
            current = self.old.parent_of(parent.id());
        }
        false
    }
}

// Orders the batch so that dependencies come before dependents, and
// reports members of strongly-connected components larger than one.
// Tarjan emits components in reverse topological order of the
// condensation, which with dependent→dependency edges is exactly
// dependencies-first; members inside a component are ordered by the
// deterministic (kind, name) comparator.
fn create_order(ids: &BTreeSet<ObjectId>, graph: &DepGraph) -> (Vec<ObjectId>, Vec<ObjectId>) {
    let mut sub: DiGraph<ObjectId, ()> = DiGraph::new();
    let mut index: HashMap<&ObjectId, NodeIndex> = HashMap::new();
    for id in ids {
        index.insert(id, sub.add_node(id.clone()));
    }
    for id in ids {
        let from = index[id];
        for dep in graph.dependencies_of(id) {
            if let Some(&to) = index.get(&dep) {
                if from != to && sub.find_edge(from, to).is_none() {
                    sub.add_edge(from, to, ());
                }
            }
        }
    }

    let mut order = Vec::new();
    let mut cycles = Vec::new();
    for component in tarjan_scc(&sub) {
        let mut members: Vec<ObjectId> = component
            .iter()
            .filter_map(|n| sub.node_weight(*n).cloned())
            .collect();
        members.sort();
        if members.len() > 1 {
            cycles.extend(members.iter().cloned());
        }
        order.extend(members);
    }
    (order, cycles)
}

// Drop order is the reverse: dependents before dependencies.
fn drop_order(ids: &BTreeSet<ObjectId>, graph: &DepGraph) -> Vec<ObjectId> {
    let (mut order, _) = create_order(ids, graph);
    order.reverse();
    order
}
