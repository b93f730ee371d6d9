//! The statement tree.
//!
//! A [`Statement`] is one schema object: its identity, its definition,
//! the set of objects it declares a dependency on, and its owned
//! children. Ownership is exclusive and tree-shaped: a snapshot is a
//! forest of statements. Columns are ordinary children of their table,
//! so they take part in diffing and dependency tracking like any other
//! object.

use serde::{Deserialize, Serialize};

use crate::def::{
    ColumnDef, ConstraintDef, FunctionDef, IndexDef, ObjectDef, PolicyDef, RoleDef, SchemaDef,
    SequenceDef, TableDef, TriggerDef, ViewDef,
};
use crate::kind::ObjectKind;
use crate::name::{ObjectId, QualifiedName};

/// One schema object in the in-memory model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    id: ObjectId,
    def: ObjectDef,
    depends_on: Vec<ObjectId>,
    children: Vec<Statement>,
    can_drop: bool,
}

impl Statement {
    /// Creates a statement from a name and definition. The kind is
    /// implied by the definition, so the two can never disagree.
    #[must_use]
    pub fn new(name: QualifiedName, def: ObjectDef) -> Self {
        Self {
            id: ObjectId::new(def.kind(), name),
            def,
            depends_on: Vec::new(),
            children: Vec::new(),
            can_drop: true,
        }
    }

    // Convenience constructors for the common kinds.

    /// Creates a schema statement.
    #[must_use]
    pub fn schema(name: impl Into<String>) -> Self {
        Self::new(
            QualifiedName::bare(name),
            ObjectDef::Schema(SchemaDef::default()),
        )
    }

    /// Creates a role statement.
    #[must_use]
    pub fn role(name: impl Into<String>, def: RoleDef) -> Self {
        Self::new(QualifiedName::bare(name), ObjectDef::Role(def))
    }

    /// Creates a table statement.
    #[must_use]
    pub fn table(schema: impl Into<String>, name: impl Into<String>, def: TableDef) -> Self {
        Self::new(QualifiedName::qualified(schema, name), ObjectDef::Table(def))
    }

    /// Creates a column statement.
    #[must_use]
    pub fn column(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        def: ColumnDef,
    ) -> Self {
        Self::new(
            QualifiedName::sub(schema, table, name),
            ObjectDef::Column(def),
        )
    }

    /// Creates a constraint statement.
    #[must_use]
    pub fn constraint(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        def: ConstraintDef,
    ) -> Self {
        Self::new(
            QualifiedName::sub(schema, table, name),
            ObjectDef::Constraint(def),
        )
    }

    /// Creates an index statement.
    #[must_use]
    pub fn index(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        def: IndexDef,
    ) -> Self {
        Self::new(QualifiedName::sub(schema, table, name), ObjectDef::Index(def))
    }

    /// Creates a view statement.
    #[must_use]
    pub fn view(schema: impl Into<String>, name: impl Into<String>, def: ViewDef) -> Self {
        Self::new(QualifiedName::qualified(schema, name), ObjectDef::View(def))
    }

    /// Creates a function statement.
    #[must_use]
    pub fn function(schema: impl Into<String>, name: impl Into<String>, def: FunctionDef) -> Self {
        Self::new(
            QualifiedName::qualified(schema, name),
            ObjectDef::Function(def),
        )
    }

    /// Creates a sequence statement.
    #[must_use]
    pub fn sequence(schema: impl Into<String>, name: impl Into<String>, def: SequenceDef) -> Self {
        Self::new(
            QualifiedName::qualified(schema, name),
            ObjectDef::Sequence(def),
        )
    }

    /// Creates a trigger statement.
    #[must_use]
    pub fn trigger(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        def: TriggerDef,
    ) -> Self {
        Self::new(
            QualifiedName::sub(schema, table, name),
            ObjectDef::Trigger(def),
        )
    }

    /// Creates a policy statement.
    #[must_use]
    pub fn policy(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        def: PolicyDef,
    ) -> Self {
        Self::new(
            QualifiedName::sub(schema, table, name),
            ObjectDef::Policy(def),
        )
    }

    // Builder-style modifiers.

    /// Adds a child statement.
    #[must_use]
    pub fn child(mut self, child: Statement) -> Self {
        self.children.push(child);
        self
    }

    /// Adds a declared dependency reference.
    #[must_use]
    pub fn depends_on(mut self, target: ObjectId) -> Self {
        self.depends_on.push(target);
        self
    }

    /// Marks the statement as not droppable (system-owned objects).
    /// Undroppable objects are silently excluded from DROP scheduling.
    #[must_use]
    pub fn no_drop(mut self) -> Self {
        self.can_drop = false;
        self
    }

    // Accessors.

    /// The statement's identity.
    #[must_use]
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// The statement's kind.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.id.kind
    }

    /// The statement's qualified name.
    #[must_use]
    pub fn name(&self) -> &QualifiedName {
        &self.id.name
    }

    /// The statement's bare name.
    #[must_use]
    pub fn bare_name(&self) -> &str {
        &self.id.name.name
    }

    /// The statement's definition.
    #[must_use]
    pub fn def(&self) -> &ObjectDef {
        &self.def
    }

    /// Declared dependency references.
    #[must_use]
    pub fn dependencies(&self) -> &[ObjectId] {
        &self.depends_on
    }

    /// Owned children, in declaration order.
    #[must_use]
    pub fn children(&self) -> &[Statement] {
        &self.children
    }

    /// Whether the object may be dropped.
    #[must_use]
    pub fn can_drop(&self) -> bool {
        self.can_drop
    }

    /// Whether the object lives inside a container.
    #[must_use]
    pub fn is_sub_element(&self) -> bool {
        self.kind().is_sub_element()
    }

    /// Whether the two statements carry the same definition. Children
    /// are diffed separately and do not participate.
    #[must_use]
    pub fn same_def(&self, other: &Statement) -> bool {
        self.def == other.def
    }

    /// Finds a direct child by kind and bare name.
    #[must_use]
    pub fn find_child(&self, kind: ObjectKind, bare_name: &str) -> Option<&Statement> {
        self.children
            .iter()
            .find(|c| c.kind() == kind && c.bare_name() == bare_name)
    }

    /// Depth-first traversal of this statement and everything below
    /// it, parents before children.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Iterator over a statement subtree, depth-first, parents first.
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a Statement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Statement;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        for child in next.children.iter().rev() {
            self.stack.push(child);
        }
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Statement {
        Statement::table("public", "t", TableDef::new())
            .child(Statement::column("public", "t", "id", ColumnDef::new("bigint")))
            .child(Statement::column("public", "t", "name", ColumnDef::new("text")))
            .child(Statement::constraint(
                "public",
                "t",
                "t_pkey",
                ConstraintDef::primary_key(vec!["id".into()]),
            ))
    }

    #[test]
    fn kind_is_implied_by_def() {
        let t = sample_table();
        assert_eq!(t.kind(), ObjectKind::Table);
        assert_eq!(t.children()[0].kind(), ObjectKind::Column);
    }

    #[test]
    fn descendants_are_depth_first_parents_first() {
        let schema = Statement::schema("public").child(sample_table());
        let names: Vec<_> = schema.descendants().map(|s| s.bare_name().to_string()).collect();
        assert_eq!(names, vec!["public", "t", "id", "name", "t_pkey"]);
    }

    #[test]
    fn find_child_matches_kind_and_name() {
        let t = sample_table();
        assert!(t.find_child(ObjectKind::Column, "id").is_some());
        assert!(t.find_child(ObjectKind::Constraint, "id").is_none());
        assert!(t.find_child(ObjectKind::Column, "missing").is_none());
    }

    #[test]
    fn no_drop_flag() {
        let r = Statement::role("postgres", RoleDef::default()).no_drop();
        assert!(!r.can_drop());
    }
}
