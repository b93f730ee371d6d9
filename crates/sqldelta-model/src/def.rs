//! Per-kind object definitions.
//!
//! These types describe the content of a schema object, everything a
//! dialect needs to render its DDL. Column types, expressions, and
//! function bodies are carried as opaque dialect text; parsing them is
//! the loaders' concern, not the engine's.

use serde::{Deserialize, Serialize};

use crate::kind::ObjectKind;
use crate::name::QualifiedName;

/// Referential action for foreign keys (ON DELETE / ON UPDATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FkAction {
    /// No action (checked at end of statement).
    #[default]
    NoAction,
    /// Restrict (checked immediately).
    Restrict,
    /// Cascade to referencing rows.
    Cascade,
    /// Set referencing columns to NULL.
    SetNull,
    /// Set referencing columns to their default.
    SetDefault,
}

impl FkAction {
    /// The SQL spelling of this action.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// Schema definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchemaDef {
    /// Owning role, if explicit.
    pub owner: Option<String>,
    /// Comment.
    pub comment: Option<String>,
}

/// Role definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleDef {
    /// Whether the role can log in.
    pub can_login: bool,
    /// Comment.
    pub comment: Option<String>,
}

/// Table definition. Columns, constraints, and indexes are child
/// statements, not fields here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableDef {
    /// Parent tables for inheritance.
    pub inherits: Vec<QualifiedName>,
    /// Parent table when this is a partition.
    pub partition_of: Option<QualifiedName>,
    /// Partition bound clause (`FOR VALUES ...`), opaque text.
    pub partition_bound: Option<String>,
    /// Storage options / engine clause, opaque text per option.
    pub options: Vec<String>,
    /// Comment.
    pub comment: Option<String>,
}

impl TableDef {
    /// Creates an empty table definition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an inheritance parent.
    #[must_use]
    pub fn inherits(mut self, parent: QualifiedName) -> Self {
        self.inherits.push(parent);
        self
    }

    /// Marks the table as a partition of `parent`.
    #[must_use]
    pub fn partition_of(mut self, parent: QualifiedName, bound: impl Into<String>) -> Self {
        self.partition_of = Some(parent);
        self.partition_bound = Some(bound.into());
        self
    }

    /// Adds a storage option.
    #[must_use]
    pub fn option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Data type, opaque dialect text.
    pub type_name: String,
    /// NOT NULL flag.
    pub not_null: bool,
    /// Default expression, opaque text.
    pub default: Option<String>,
    /// Generation expression (`GENERATED ALWAYS AS ...`), opaque text.
    /// Generated columns are excluded from data-movement copies.
    pub generated: Option<String>,
    /// Identity / auto-increment flag. Participating identity columns
    /// trigger reseeding after a data-movement copy.
    pub identity: bool,
    /// Collation.
    pub collation: Option<String>,
    /// Comment.
    pub comment: Option<String>,
}

impl ColumnDef {
    /// Creates a nullable column of the given type.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            not_null: false,
            default: None,
            generated: None,
            identity: false,
            collation: None,
            comment: None,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Sets the default expression.
    #[must_use]
    pub fn default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Sets the generation expression.
    #[must_use]
    pub fn generated(mut self, expr: impl Into<String>) -> Self {
        self.generated = Some(expr.into());
        self
    }

    /// Marks the column as an identity column.
    #[must_use]
    pub fn identity(mut self) -> Self {
        self.identity = true;
        self.not_null = true;
        self
    }

    /// Sets the collation.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Constraint definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintDef {
    /// Primary key over the given columns.
    PrimaryKey {
        /// Key columns.
        columns: Vec<String>,
    },
    /// Unique constraint over the given columns.
    Unique {
        /// Constrained columns.
        columns: Vec<String>,
    },
    /// Foreign key.
    ForeignKey {
        /// Referencing columns.
        columns: Vec<String>,
        /// Referenced table.
        ref_table: QualifiedName,
        /// Referenced columns.
        ref_columns: Vec<String>,
        /// ON DELETE action.
        on_delete: FkAction,
        /// ON UPDATE action.
        on_update: FkAction,
    },
    /// Check constraint.
    Check {
        /// Checked expression, opaque text.
        expression: String,
    },
}

impl ConstraintDef {
    /// Creates a primary key constraint.
    #[must_use]
    pub fn primary_key(columns: Vec<String>) -> Self {
        Self::PrimaryKey { columns }
    }

    /// Creates a unique constraint.
    #[must_use]
    pub fn unique(columns: Vec<String>) -> Self {
        Self::Unique { columns }
    }

    /// Creates a foreign key with default actions.
    #[must_use]
    pub fn foreign_key(
        columns: Vec<String>,
        ref_table: QualifiedName,
        ref_columns: Vec<String>,
    ) -> Self {
        Self::ForeignKey {
            columns,
            ref_table,
            ref_columns,
            on_delete: FkAction::NoAction,
            on_update: FkAction::NoAction,
        }
    }

    /// Creates a check constraint.
    #[must_use]
    pub fn check(expression: impl Into<String>) -> Self {
        Self::Check {
            expression: expression.into(),
        }
    }

    /// The column set this constraint makes unique, if any. Used to
    /// match foreign keys against the key they target.
    #[must_use]
    pub fn unique_columns(&self) -> Option<&[String]> {
        match self {
            Self::PrimaryKey { columns } | Self::Unique { columns } => Some(columns),
            Self::ForeignKey { .. } | Self::Check { .. } => None,
        }
    }
}

/// Index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Indexed columns (or expressions, opaque text).
    pub columns: Vec<String>,
    /// Uniqueness.
    pub unique: bool,
    /// Access method (`btree`, `gin`, ...).
    pub method: Option<String>,
    /// Partial index predicate, opaque text.
    pub predicate: Option<String>,
}

impl IndexDef {
    /// Creates a non-unique index over the given columns.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            unique: false,
            method: None,
            predicate: None,
        }
    }

    /// Makes the index unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the access method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Sets a partial index predicate.
    #[must_use]
    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }
}

/// View definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDef {
    /// The defining query, opaque text.
    pub query: String,
    /// Materialized flag.
    pub materialized: bool,
    /// Comment.
    pub comment: Option<String>,
}

impl ViewDef {
    /// Creates a plain view.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            materialized: false,
            comment: None,
        }
    }

    /// Makes the view materialized.
    #[must_use]
    pub fn materialized(mut self) -> Self {
        self.materialized = true;
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Function definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDef {
    /// Argument list without parentheses, opaque text.
    pub arguments: String,
    /// Return clause, opaque text.
    pub returns: Option<String>,
    /// Implementation language.
    pub language: Option<String>,
    /// Function body, opaque text.
    pub body: String,
    /// Comment.
    pub comment: Option<String>,
}

impl FunctionDef {
    /// Creates a function definition.
    #[must_use]
    pub fn new(arguments: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            arguments: arguments.into(),
            returns: None,
            language: None,
            body: body.into(),
            comment: None,
        }
    }

    /// Sets the return clause.
    #[must_use]
    pub fn returns(mut self, returns: impl Into<String>) -> Self {
        self.returns = Some(returns.into());
        self
    }

    /// Sets the language.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Sequence definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SequenceDef {
    /// START WITH value.
    pub start: Option<i64>,
    /// INCREMENT BY value.
    pub increment: Option<i64>,
    /// MINVALUE.
    pub min_value: Option<i64>,
    /// MAXVALUE.
    pub max_value: Option<i64>,
    /// CACHE size.
    pub cache: Option<i64>,
    /// CYCLE flag.
    pub cycle: bool,
    /// Owning column. Emission of the OWNED BY clause is deferred by
    /// the assembler until after all primary statements, because the
    /// owning column must already exist.
    pub owned_by: Option<QualifiedName>,
    /// Comment.
    pub comment: Option<String>,
}

impl SequenceDef {
    /// Creates an empty sequence definition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets START WITH.
    #[must_use]
    pub fn start(mut self, start: i64) -> Self {
        self.start = Some(start);
        self
    }

    /// Sets INCREMENT BY.
    #[must_use]
    pub fn increment(mut self, increment: i64) -> Self {
        self.increment = Some(increment);
        self
    }

    /// Sets the owning column.
    #[must_use]
    pub fn owned_by(mut self, column: QualifiedName) -> Self {
        self.owned_by = Some(column);
        self
    }
}

/// Trigger definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDef {
    /// Timing, events, and action (`BEFORE INSERT ... EXECUTE FUNCTION f()`),
    /// opaque text following the trigger name.
    pub definition: String,
}

impl TriggerDef {
    /// Creates a trigger definition.
    #[must_use]
    pub fn new(definition: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
        }
    }
}

/// Row-level security policy definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyDef {
    /// Command the policy applies to (`SELECT`, `ALL`, ...).
    pub command: Option<String>,
    /// Roles the policy applies to.
    pub roles: Vec<String>,
    /// USING expression, opaque text.
    pub using_expr: Option<String>,
    /// WITH CHECK expression, opaque text.
    pub check_expr: Option<String>,
}

/// The definition payload of a statement; the closed set of object
/// kinds the engine understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectDef {
    /// Schema.
    Schema(SchemaDef),
    /// Role.
    Role(RoleDef),
    /// Sequence.
    Sequence(SequenceDef),
    /// Table.
    Table(TableDef),
    /// Column.
    Column(ColumnDef),
    /// Constraint.
    Constraint(ConstraintDef),
    /// Index.
    Index(IndexDef),
    /// View.
    View(ViewDef),
    /// Function.
    Function(FunctionDef),
    /// Trigger.
    Trigger(TriggerDef),
    /// Policy.
    Policy(PolicyDef),
}

impl ObjectDef {
    /// The kind implied by this definition.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Schema(_) => ObjectKind::Schema,
            Self::Role(_) => ObjectKind::Role,
            Self::Sequence(_) => ObjectKind::Sequence,
            Self::Table(_) => ObjectKind::Table,
            Self::Column(_) => ObjectKind::Column,
            Self::Constraint(_) => ObjectKind::Constraint,
            Self::Index(_) => ObjectKind::Index,
            Self::View(_) => ObjectKind::View,
            Self::Function(_) => ObjectKind::Function,
            Self::Trigger(_) => ObjectKind::Trigger,
            Self::Policy(_) => ObjectKind::Policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_builder() {
        let col = ColumnDef::new("bigint").identity();
        assert_eq!(col.type_name, "bigint");
        assert!(col.identity);
        assert!(col.not_null); // identity implies NOT NULL
    }

    #[test]
    fn unique_columns_for_keys_only() {
        let pk = ConstraintDef::primary_key(vec!["id".into()]);
        assert_eq!(pk.unique_columns(), Some(&["id".to_string()][..]));

        let fk = ConstraintDef::foreign_key(
            vec!["owner_id".into()],
            QualifiedName::qualified("public", "users"),
            vec!["id".into()],
        );
        assert!(fk.unique_columns().is_none());
        assert!(ConstraintDef::check("a > 0").unique_columns().is_none());
    }

    #[test]
    fn def_kind_matches_variant() {
        assert_eq!(ObjectDef::Table(TableDef::new()).kind(), ObjectKind::Table);
        assert_eq!(
            ObjectDef::Column(ColumnDef::new("text")).kind(),
            ObjectKind::Column
        );
    }

    #[test]
    fn defs_round_trip_through_serde() {
        let def = ObjectDef::Constraint(ConstraintDef::foreign_key(
            vec!["owner_id".into()],
            QualifiedName::qualified("public", "users"),
            vec!["id".into()],
        ));
        let json = serde_json::to_string(&def).unwrap();
        let back: ObjectDef = serde_json::from_str(&json).unwrap();
        assert_eq!(def, back);
    }
}
