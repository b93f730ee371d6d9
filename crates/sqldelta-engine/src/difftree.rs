//! The diff tree.
//!
//! Pairs two snapshots' statement trees into one tree of comparison
//! nodes. Children are matched by (kind, bare name): present only in
//! the old snapshot → [`DiffSide::OldOnly`], only in the new →
//! [`DiffSide::NewOnly`], in both → [`DiffSide::Both`]. A `Both` node
//! recurses into its children unconditionally; whether the content
//! actually changed is decided later by the resolver, not here.
//!
//! Columns are ordinary tree nodes like every other sub-object; there
//! is no synthesized-elements patch step.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use sqldelta_model::{ObjectId, ObjectKind, Snapshot, Statement};

use crate::ignore::IgnoreList;

/// Which snapshot(s) an object appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffSide {
    /// Present only in the old snapshot (candidate for DROP).
    OldOnly,
    /// Present only in the new snapshot (candidate for CREATE).
    NewOnly,
    /// Present in both (candidate for ALTER, possibly unchanged).
    Both,
}

/// One node of the diff tree.
#[derive(Debug, Clone)]
pub struct DiffNode {
    id: ObjectId,
    side: DiffSide,
    selected: bool,
    children: Vec<DiffNode>,
}

impl DiffNode {
    /// The object's identity.
    #[must_use]
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// The node's side.
    #[must_use]
    pub fn side(&self) -> DiffSide {
        self.side
    }

    /// Whether the node is selected.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Child nodes, in merge order (old snapshot order first, then
    /// new-only children).
    #[must_use]
    pub fn children(&self) -> &[DiffNode] {
        &self.children
    }

    fn from_subtree(stmt: &Statement, side: DiffSide) -> Self {
        Self {
            id: stmt.id().clone(),
            side,
            selected: false,
            children: stmt
                .children()
                .iter()
                .map(|c| Self::from_subtree(c, side))
                .collect(),
        }
    }
}

/// A flattened diff-tree element handed to the resolver.
#[derive(Debug, Clone)]
pub struct FlatElement {
    /// Identity of the compared object.
    pub id: ObjectId,
    /// Side classification.
    pub side: DiffSide,
    /// Whether the user selected this node.
    pub selected: bool,
}

/// Options for [`DiffTree::flatten`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FlattenOptions<'a> {
    /// Only include selected nodes.
    pub selected_only: bool,
    /// Name-based filtering; a hidden node hides its whole subtree.
    pub ignore: Option<&'a IgnoreList>,
    /// Restrict to these kinds; `None` allows everything.
    pub allowed_kinds: Option<&'a BTreeSet<ObjectKind>>,
    /// Database name used by db-scoped ignore rules.
    pub db_name: Option<&'a str>,
}

/// The paired comparison tree of two snapshots.
#[derive(Debug, Clone)]
pub struct DiffTree {
    roots: Vec<DiffNode>,
}

impl DiffTree {
    /// Builds the diff tree by walking both snapshots' roots in
    /// tandem.
    #[must_use]
    pub fn build(old: &Snapshot, new: &Snapshot) -> Self {
        Self {
            roots: merge_lists(old.roots(), new.roots()),
        }
    }

    /// Root nodes.
    #[must_use]
    pub fn roots(&self) -> &[DiffNode] {
        &self.roots
    }

    /// Marks every node selected. Used when there is no interactive
    /// selection.
    pub fn set_all_selected(&mut self) {
        fn mark(node: &mut DiffNode) {
            node.selected = true;
            for child in &mut node.children {
                mark(child);
            }
        }
        for root in &mut self.roots {
            mark(root);
        }
    }

    /// Selects a single node by identity. Returns false if the tree
    /// has no such node.
    pub fn select(&mut self, id: &ObjectId) -> bool {
        fn mark(node: &mut DiffNode, id: &ObjectId) -> bool {
            if &node.id == id {
                node.selected = true;
                return true;
            }
            node.children.iter_mut().any(|c| mark(c, id))
        }
        self.roots.iter_mut().any(|r| mark(r, id))
    }

    /// Produces the filtered, flat element list, depth-first with
    /// parents before children.
    #[must_use]
    pub fn flatten(&self, options: &FlattenOptions<'_>) -> Vec<FlatElement> {
        let mut out = Vec::new();
        for root in &self.roots {
            flatten_node(root, options, &mut out);
        }
        out
    }

    /// The identities of all selected nodes.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<ObjectId> {
        fn collect(node: &DiffNode, out: &mut Vec<ObjectId>) {
            if node.selected {
                out.push(node.id.clone());
            }
            for child in &node.children {
                collect(child, out);
            }
        }
        let mut out = Vec::new();
        for root in &self.roots {
            collect(root, &mut out);
        }
        out
    }
}

fn flatten_node(node: &DiffNode, options: &FlattenOptions<'_>, out: &mut Vec<FlatElement>) {
    if let Some(ignore) = options.ignore {
        if ignore.is_hidden(&node.id, options.db_name) {
            return; // prunes the whole subtree
        }
    }

    let kind_allowed = options
        .allowed_kinds
        .is_none_or(|kinds| kinds.contains(&node.id.kind));
    let selection_ok = !options.selected_only || node.selected;
    if kind_allowed && selection_ok {
        out.push(FlatElement {
            id: node.id.clone(),
            side: node.side,
            selected: node.selected,
        });
    }

    // Children are walked regardless of whether the parent itself was
    // emitted; selection and kind filtering are per node.
    for child in &node.children {
        flatten_node(child, options, out);
    }
}

fn merge_lists(old: &[Statement], new: &[Statement]) -> Vec<DiffNode> {
    let mut nodes = Vec::new();
    for old_stmt in old {
        match new
            .iter()
            .find(|n| n.kind() == old_stmt.kind() && n.bare_name() == old_stmt.bare_name())
        {
            Some(new_stmt) => nodes.push(DiffNode {
                id: new_stmt.id().clone(),
                side: DiffSide::Both,
                selected: false,
                children: merge_lists(old_stmt.children(), new_stmt.children()),
            }),
            None => nodes.push(DiffNode::from_subtree(old_stmt, DiffSide::OldOnly)),
        }
    }
    for new_stmt in new {
        let matched = old
            .iter()
            .any(|o| o.kind() == new_stmt.kind() && o.bare_name() == new_stmt.bare_name());
        if !matched {
            nodes.push(DiffNode::from_subtree(new_stmt, DiffSide::NewOnly));
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ignore::IgnoreRule;
    use sqldelta_model::def::{ColumnDef, TableDef, ViewDef};
    use sqldelta_model::QualifiedName;

    fn old_snapshot() -> Snapshot {
        Snapshot::new().with(
            Statement::schema("public")
                .child(
                    Statement::table("public", "t", TableDef::new())
                        .child(Statement::column("public", "t", "id", ColumnDef::new("int"))),
                )
                .child(Statement::view("public", "legacy", ViewDef::new("SELECT 1"))),
        )
    }

    fn new_snapshot() -> Snapshot {
        Snapshot::new().with(
            Statement::schema("public")
                .child(
                    Statement::table("public", "t", TableDef::new())
                        .child(Statement::column("public", "t", "id", ColumnDef::new("int")))
                        .child(Statement::column("public", "t", "name", ColumnDef::new("text"))),
                )
                .child(Statement::view("public", "fresh", ViewDef::new("SELECT 2"))),
        )
    }

    fn id(kind: ObjectKind, name: QualifiedName) -> ObjectId {
        ObjectId::new(kind, name)
    }

    #[test]
    fn sides_are_classified() {
        let tree = DiffTree::build(&old_snapshot(), &new_snapshot());
        let flat = tree.flatten(&FlattenOptions::default());

        let side_of = |target: &ObjectId| {
            flat.iter()
                .find(|e| &e.id == target)
                .map(|e| e.side)
                .unwrap()
        };

        assert_eq!(
            side_of(&id(ObjectKind::Table, QualifiedName::qualified("public", "t"))),
            DiffSide::Both
        );
        assert_eq!(
            side_of(&id(ObjectKind::Column, QualifiedName::sub("public", "t", "name"))),
            DiffSide::NewOnly
        );
        assert_eq!(
            side_of(&id(ObjectKind::View, QualifiedName::qualified("public", "legacy"))),
            DiffSide::OldOnly
        );
        assert_eq!(
            side_of(&id(ObjectKind::View, QualifiedName::qualified("public", "fresh"))),
            DiffSide::NewOnly
        );
    }

    #[test]
    fn flatten_is_depth_first_parents_first() {
        let tree = DiffTree::build(&old_snapshot(), &new_snapshot());
        let flat = tree.flatten(&FlattenOptions::default());
        let names: Vec<String> = flat.iter().map(|e| e.id.name.to_string()).collect();

        let schema_pos = names.iter().position(|n| n == "public").unwrap();
        let table_pos = names.iter().position(|n| n == "public.t").unwrap();
        let column_pos = names.iter().position(|n| n == "public.t.name").unwrap();
        assert!(schema_pos < table_pos);
        assert!(table_pos < column_pos);
    }

    #[test]
    fn identical_snapshots_are_all_both() {
        let snap = old_snapshot();
        let tree = DiffTree::build(&snap, &snap);
        let flat = tree.flatten(&FlattenOptions::default());
        assert!(flat.iter().all(|e| e.side == DiffSide::Both));
    }

    #[test]
    fn set_all_selected_marks_every_node() {
        let mut tree = DiffTree::build(&old_snapshot(), &new_snapshot());
        tree.set_all_selected();
        let flat = tree.flatten(&FlattenOptions::default());
        assert!(flat.iter().all(|e| e.selected));
        assert_eq!(tree.selected_ids().len(), flat.len());
    }

    #[test]
    fn selected_only_filters_unselected_nodes() {
        let mut tree = DiffTree::build(&old_snapshot(), &new_snapshot());
        let column = id(ObjectKind::Column, QualifiedName::sub("public", "t", "name"));
        assert!(tree.select(&column));

        let flat = tree.flatten(&FlattenOptions {
            selected_only: true,
            ..FlattenOptions::default()
        });
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].id, column);
    }

    #[test]
    fn ignore_prunes_whole_subtree() {
        let ignore = IgnoreList::new().rule(IgnoreRule::hide("t"));
        let tree = DiffTree::build(&old_snapshot(), &new_snapshot());
        let flat = tree.flatten(&FlattenOptions {
            ignore: Some(&ignore),
            ..FlattenOptions::default()
        });
        assert!(flat.iter().all(|e| e.id.kind != ObjectKind::Table));
        assert!(flat.iter().all(|e| e.id.kind != ObjectKind::Column));
    }

    #[test]
    fn allowed_kinds_filter_is_per_node() {
        let allowed: BTreeSet<ObjectKind> = [ObjectKind::Column].into_iter().collect();
        let tree = DiffTree::build(&old_snapshot(), &new_snapshot());
        let flat = tree.flatten(&FlattenOptions {
            allowed_kinds: Some(&allowed),
            ..FlattenOptions::default()
        });
        // Parents are filtered out but their children still appear.
        assert!(!flat.is_empty());
        assert!(flat.iter().all(|e| e.id.kind == ObjectKind::Column));
    }
}
