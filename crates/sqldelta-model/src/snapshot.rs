//! Schema snapshots.
//!
//! A [`Snapshot`] is one fully loaded version of a schema: a forest of
//! statements with a hash index over identities. Snapshots are built
//! once and then treated as frozen; the dependency graph takes its
//! own deep copy, so mutating a snapshot after graph construction
//! cannot corrupt the graph's indices.

use std::collections::HashMap;

use crate::kind::ObjectKind;
use crate::name::ObjectId;
use crate::statement::{Descendants, Statement};

/// One version of a schema.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    roots: Vec<Statement>,
    // Identity -> path of child indices from the root list.
    index: HashMap<ObjectId, Vec<usize>>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from root statements (schemas, roles).
    #[must_use]
    pub fn from_roots(roots: Vec<Statement>) -> Self {
        let mut snapshot = Self {
            roots,
            index: HashMap::new(),
        };
        snapshot.rebuild_index();
        snapshot
    }

    /// Adds a root statement, returning the snapshot builder-style.
    #[must_use]
    pub fn with(mut self, root: Statement) -> Self {
        self.roots.push(root);
        self.rebuild_index();
        self
    }

    fn rebuild_index(&mut self) {
        fn walk(
            index: &mut HashMap<ObjectId, Vec<usize>>,
            stmt: &Statement,
            path: &mut Vec<usize>,
        ) {
            index.insert(stmt.id().clone(), path.clone());
            for (i, child) in stmt.children().iter().enumerate() {
                path.push(i);
                walk(index, child, path);
                path.pop();
            }
        }

        self.index.clear();
        let roots = std::mem::take(&mut self.roots);
        for (i, root) in roots.iter().enumerate() {
            let mut path = vec![i];
            walk(&mut self.index, root, &mut path);
        }
        self.roots = roots;
    }

    /// Root statements.
    #[must_use]
    pub fn roots(&self) -> &[Statement] {
        &self.roots
    }

    /// Total number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the snapshot holds no statements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether an object with this identity exists.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.index.contains_key(id)
    }

    /// Looks up a statement by identity.
    #[must_use]
    pub fn get(&self, id: &ObjectId) -> Option<&Statement> {
        let path = self.index.get(id)?;
        self.at_path(path)
    }

    fn at_path(&self, path: &[usize]) -> Option<&Statement> {
        let (first, rest) = path.split_first()?;
        let mut current = self.roots.get(*first)?;
        for &i in rest {
            current = current.children().get(i)?;
        }
        Some(current)
    }

    /// The parent statement of an object, if it has one.
    #[must_use]
    pub fn parent_of(&self, id: &ObjectId) -> Option<&Statement> {
        let path = self.index.get(id)?;
        if path.len() < 2 {
            return None;
        }
        self.at_path(&path[..path.len() - 1])
    }

    /// Returns true if `id` lives inside the subtree rooted at
    /// `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, id: &ObjectId, ancestor: &ObjectId) -> bool {
        let (Some(path), Some(ancestor_path)) = (self.index.get(id), self.index.get(ancestor))
        else {
            return false;
        };
        path.len() > ancestor_path.len() && path[..ancestor_path.len()] == ancestor_path[..]
    }

    /// Depth-first traversal of every statement, parents before
    /// children, roots in declaration order.
    pub fn descendants(&self) -> impl Iterator<Item = &Statement> {
        self.roots.iter().flat_map(Statement::descendants)
    }

    /// Walks every statement together with its parent's identity.
    pub fn walk<F: FnMut(Option<&ObjectId>, &Statement)>(&self, mut f: F) {
        fn visit<F: FnMut(Option<&ObjectId>, &Statement)>(
            parent: Option<&ObjectId>,
            stmt: &Statement,
            f: &mut F,
        ) {
            f(parent, stmt);
            for child in stmt.children() {
                visit(Some(stmt.id()), child, f);
            }
        }

        for root in &self.roots {
            visit(None, root, &mut f);
        }
    }

    /// Iterates over every statement of the given kind.
    pub fn of_kind(&self, kind: ObjectKind) -> impl Iterator<Item = &Statement> {
        self.descendants().filter(move |s| s.kind() == kind)
    }

    /// Depth-first iterator over one root's subtree, for callers that
    /// already hold a root statement.
    #[must_use]
    pub fn subtree<'a>(&self, root: &'a Statement) -> Descendants<'a> {
        root.descendants()
    }
}
