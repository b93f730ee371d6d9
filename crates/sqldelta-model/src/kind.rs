//! Object kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a schema object.
///
/// Declaration order doubles as the deterministic sort rank used when
/// ordering work: cluster-level objects first, then containers, then
/// sub-objects, then dependent code objects.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ObjectKind {
    /// Database role.
    Role,
    /// Schema (database, for dialects without schemas).
    Schema,
    /// Sequence generator.
    Sequence,
    /// Plain or partitioned table.
    Table,
    /// Table column.
    Column,
    /// Table constraint (primary key, unique, foreign key, check).
    Constraint,
    /// Secondary index.
    Index,
    /// View or materialized view.
    View,
    /// Function or procedure.
    Function,
    /// Trigger.
    Trigger,
    /// Row-level security policy.
    Policy,
}

impl ObjectKind {
    /// Returns true for objects that live inside a table or view and
    /// are addressed through their container.
    #[must_use]
    pub fn is_sub_element(self) -> bool {
        matches!(
            self,
            Self::Column | Self::Constraint | Self::Index | Self::Trigger | Self::Policy
        )
    }

    /// The SQL keyword for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Role => "ROLE",
            Self::Schema => "SCHEMA",
            Self::Sequence => "SEQUENCE",
            Self::Table => "TABLE",
            Self::Column => "COLUMN",
            Self::Constraint => "CONSTRAINT",
            Self::Index => "INDEX",
            Self::View => "VIEW",
            Self::Function => "FUNCTION",
            Self::Trigger => "TRIGGER",
            Self::Policy => "POLICY",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_element_classification() {
        assert!(ObjectKind::Column.is_sub_element());
        assert!(ObjectKind::Constraint.is_sub_element());
        assert!(!ObjectKind::Table.is_sub_element());
        assert!(!ObjectKind::Schema.is_sub_element());
    }

    #[test]
    fn rank_orders_containers_before_sub_elements() {
        assert!(ObjectKind::Schema < ObjectKind::Table);
        assert!(ObjectKind::Table < ObjectKind::Column);
        assert!(ObjectKind::Column < ObjectKind::Constraint);
    }
}
