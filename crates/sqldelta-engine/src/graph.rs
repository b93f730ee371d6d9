//! Dependency graph over one snapshot.
//!
//! Vertices are object identities; edges point dependent → dependency.
//! The graph owns a deep copy of the snapshot it was built from, so
//! its indices survive whatever the caller does with the original.
//!
//! Construction is two passes over the statement tree. The first adds
//! a vertex per statement plus the structural edge to its parent. The
//! second resolves declared references, matches foreign keys to the
//! unique key they target, and propagates column edges through
//! inheritance/partition chains; it has to run after the first so
//! that keys declared later in the tree are already present.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::warn;

use sqldelta_model::def::{ConstraintDef, ObjectDef, TableDef};
use sqldelta_model::{ObjectId, ObjectKind, QualifiedName, Snapshot, Statement};

/// Directed dependency graph of one schema snapshot.
#[derive(Debug, Clone)]
pub struct DepGraph {
    snapshot: Snapshot,
    graph: DiGraph<ObjectId, ()>,
    index: HashMap<ObjectId, NodeIndex>,
}

impl DepGraph {
    /// Builds the graph for a snapshot. The snapshot is deep-copied;
    /// callers may treat their own copy as frozen or rebuild.
    #[must_use]
    pub fn build(source: &Snapshot) -> Self {
        let snapshot = source.clone();
        let mut graph = DiGraph::new();
        let mut index: HashMap<ObjectId, NodeIndex> = HashMap::new();

        // Pass 1: vertices and structural parent edges.
        snapshot.walk(|parent, stmt| {
            let node = *index
                .entry(stmt.id().clone())
                .or_insert_with(|| graph.add_node(stmt.id().clone()));
            if let Some(parent_id) = parent {
                let parent_node = *index
                    .entry(parent_id.clone())
                    .or_insert_with(|| graph.add_node(parent_id.clone()));
                if graph.find_edge(node, parent_node).is_none() {
                    graph.add_edge(node, parent_node, ());
                }
            }
        });

        let mut built = Self {
            snapshot,
            graph,
            index,
        };

        // Pass 2: declared references, FK key matching, inheritance.
        built.add_declared_edges();
        built.add_foreign_key_edges();
        built.add_inherited_column_edges();
        built
    }

    /// The graph's private snapshot copy.
    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Whether the object is a vertex of this graph.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.index.contains_key(id)
    }

    /// A reversed (dependency → dependent) view sharing this graph's
    /// storage.
    #[must_use]
    pub fn reversed(&self) -> ReversedGraph<'_> {
        ReversedGraph { inner: self }
    }

    /// Injects caller-supplied (dependent, dependency) pairs to force
    /// ordering beyond what the snapshot encodes. Pairs whose
    /// endpoints are not vertices of this graph are skipped; validity
    /// across both snapshots is the resolver's check.
    pub fn add_custom_edges(&mut self, pairs: &[(ObjectId, ObjectId)]) {
        for (dependent, dependency) in pairs {
            self.link(dependent, dependency);
        }
    }

    /// Direct dependencies of an object, deterministically ordered.
    #[must_use]
    pub fn dependencies_of(&self, id: &ObjectId) -> Vec<ObjectId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Direct dependents of an object, deterministically ordered.
    #[must_use]
    pub fn dependents_of(&self, id: &ObjectId) -> Vec<ObjectId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Everything the object transitively depends on.
    #[must_use]
    pub fn transitive_dependencies(&self, id: &ObjectId) -> Vec<ObjectId> {
        self.closure(id, Direction::Outgoing)
    }

    /// Everything that transitively depends on the object.
    #[must_use]
    pub fn transitive_dependents(&self, id: &ObjectId) -> Vec<ObjectId> {
        self.closure(id, Direction::Incoming)
    }

    /// Whether `dependent` has a direct edge to `dependency`.
    #[must_use]
    pub fn has_edge(&self, dependent: &ObjectId, dependency: &ObjectId) -> bool {
        match (self.node(dependent), self.node(dependency)) {
            (Some(from), Some(to)) => self.graph.find_edge(from, to).is_some(),
            _ => false,
        }
    }

    fn node(&self, id: &ObjectId) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    // Adds an edge once; self-references are dropped silently, as an
    // object cannot depend on itself.
    fn link(&mut self, dependent: &ObjectId, dependency: &ObjectId) {
        if dependent == dependency {
            return;
        }
        let (Some(from), Some(to)) = (self.node(dependent), self.node(dependency)) else {
            return;
        };
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, ());
        }
    }

    fn neighbors(&self, id: &ObjectId, direction: Direction) -> Vec<ObjectId> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let mut out: Vec<ObjectId> = self
            .graph
            .neighbors_directed(node, direction)
            .filter_map(|n| self.graph.node_weight(n).cloned())
            .collect();
        out.sort();
        out
    }

    // Breadth-first closure, excluding the start object, with the
    // deterministic (kind, name) comparator applied per layer.
    fn closure(&self, id: &ObjectId, direction: Direction) -> Vec<ObjectId> {
        let Some(start) = self.node(id) else {
            return Vec::new();
        };
        let mut seen: HashSet<NodeIndex> = HashSet::new();
        seen.insert(start);
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        queue.push_back(start);
        let mut out = Vec::new();

        while let Some(current) = queue.pop_front() {
            let mut layer: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(current, direction)
                .filter(|n| !seen.contains(n))
                .collect();
            layer.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
            layer.dedup();
            for node in layer {
                if seen.insert(node) {
                    if let Some(weight) = self.graph.node_weight(node) {
                        out.push(weight.clone());
                    }
                    queue.push_back(node);
                }
            }
        }
        out
    }

    fn add_declared_edges(&mut self) {
        let mut edges: Vec<(ObjectId, ObjectId)> = Vec::new();
        for stmt in self.snapshot.descendants() {
            for dep in stmt.dependencies() {
                if self.snapshot.contains(dep) {
                    edges.push((stmt.id().clone(), dep.clone()));
                }
            }
        }
        for (from, to) in edges {
            self.link(&from, &to);
        }
    }

    // A foreign key depends on the referenced table and on the unique
    // constraint or unique index covering exactly the referenced
    // column set. Constraints are preferred over indexes.
    fn add_foreign_key_edges(&mut self) {
        let mut edges: Vec<(ObjectId, ObjectId)> = Vec::new();
        for stmt in self.snapshot.descendants() {
            let ObjectDef::Constraint(ConstraintDef::ForeignKey {
                ref_table,
                ref_columns,
                ..
            }) = stmt.def()
            else {
                continue;
            };
            let table_id = ObjectId::new(ObjectKind::Table, ref_table.clone());
            let Some(table) = self.snapshot.get(&table_id) else {
                continue;
            };
            edges.push((stmt.id().clone(), table_id));

            if let Some(key) = find_matching_key(table, ref_columns) {
                edges.push((stmt.id().clone(), key));
            }
        }
        for (from, to) in edges {
            self.link(&from, &to);
        }
    }

    // Columns of inheriting/partitioned tables depend on the
    // same-named column of every ancestor. A missing ancestor table or
    // column is logged and skipped; the edge is simply absent.
    fn add_inherited_column_edges(&mut self) {
        let mut edges: Vec<(ObjectId, ObjectId)> = Vec::new();
        for stmt in self.snapshot.descendants() {
            let ObjectDef::Table(table_def) = stmt.def() else {
                continue;
            };
            if table_def.inherits.is_empty() && table_def.partition_of.is_none() {
                continue;
            }
            for column in stmt.children() {
                if column.kind() != ObjectKind::Column {
                    continue;
                }
                let mut visited: HashSet<QualifiedName> = HashSet::new();
                self.collect_ancestor_column_edges(
                    column,
                    table_def,
                    &mut visited,
                    &mut edges,
                );
            }
        }
        for (from, to) in edges {
            self.link(&from, &to);
        }
    }

    fn collect_ancestor_column_edges(
        &self,
        column: &Statement,
        table_def: &TableDef,
        visited: &mut HashSet<QualifiedName>,
        edges: &mut Vec<(ObjectId, ObjectId)>,
    ) {
        let parents = table_def
            .inherits
            .iter()
            .chain(table_def.partition_of.iter());
        for parent_name in parents {
            if !visited.insert(parent_name.clone()) {
                continue;
            }
            let parent_id = ObjectId::new(ObjectKind::Table, parent_name.clone());
            let Some(parent) = self.snapshot.get(&parent_id) else {
                warn!(parent = %parent_name, column = %column.name(),
                    "inheritance parent table not found, omitting column edge");
                continue;
            };
            match parent.find_child(ObjectKind::Column, column.bare_name()) {
                Some(parent_column) => {
                    edges.push((column.id().clone(), parent_column.id().clone()));
                }
                None => {
                    warn!(parent = %parent_name, column = %column.name(),
                        "inherited column not found on parent table, omitting edge");
                }
            }
            if let ObjectDef::Table(parent_def) = parent.def() {
                self.collect_ancestor_column_edges(column, parent_def, visited, edges);
            }
        }
    }
}

/// Lazy reversed view of a [`DepGraph`]; no storage is duplicated.
#[derive(Debug, Clone, Copy)]
pub struct ReversedGraph<'a> {
    inner: &'a DepGraph,
}

impl ReversedGraph<'_> {
    /// Direct dependencies in the reversed orientation, i.e. the
    /// original graph's dependents.
    #[must_use]
    pub fn dependencies_of(&self, id: &ObjectId) -> Vec<ObjectId> {
        self.inner.dependents_of(id)
    }

    /// Direct dependents in the reversed orientation, i.e. the
    /// original graph's dependencies.
    #[must_use]
    pub fn dependents_of(&self, id: &ObjectId) -> Vec<ObjectId> {
        self.inner.dependencies_of(id)
    }
}

// Finds the primary key, unique constraint, or unique index of
// `table` whose column set equals `columns`.
fn find_matching_key(table: &Statement, columns: &[String]) -> Option<ObjectId> {
    let want = column_set(columns);

    for child in table.children() {
        if let ObjectDef::Constraint(constraint) = child.def() {
            if let Some(cols) = constraint.unique_columns() {
                if column_set(cols) == want {
                    return Some(child.id().clone());
                }
            }
        }
    }
    for child in table.children() {
        if let ObjectDef::Index(index) = child.def() {
            if index.unique && column_set(&index.columns) == want {
                return Some(child.id().clone());
            }
        }
    }
    None
}

fn column_set(columns: &[String]) -> BTreeSet<&str> {
    columns.iter().map(String::as_str).collect()
}
