//! PostgreSQL dialect.

use sqldelta_model::def::{ObjectDef, SequenceDef};
use sqldelta_model::Statement;

use super::{comment_of, Dialect};

/// PostgreSQL DDL generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates the dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn escape_literal(text: &str) -> String {
    text.replace('\'', "''")
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn transaction_wrapper(&self) -> Option<(&'static str, &'static str)> {
        Some(("START TRANSACTION", "COMMIT TRANSACTION"))
    }

    fn comment_sql(&self, stmt: &Statement) -> Option<String> {
        let comment = comment_of(stmt.def())?;
        let target = match stmt.def() {
            ObjectDef::Schema(_) => format!("SCHEMA {}", self.quote(stmt.bare_name())),
            ObjectDef::Role(_) => format!("ROLE {}", self.quote(stmt.bare_name())),
            ObjectDef::Sequence(_) => format!("SEQUENCE {}", self.quote_name(stmt.name())),
            ObjectDef::Table(_) => format!("TABLE {}", self.quote_name(stmt.name())),
            ObjectDef::Column(_) => format!("COLUMN {}", self.quote_name(stmt.name())),
            ObjectDef::View(def) => {
                if def.materialized {
                    format!("MATERIALIZED VIEW {}", self.quote_name(stmt.name()))
                } else {
                    format!("VIEW {}", self.quote_name(stmt.name()))
                }
            }
            ObjectDef::Function(def) => format!(
                "FUNCTION {}({})",
                self.quote_name(stmt.name()),
                def.arguments,
            ),
            ObjectDef::Constraint(_)
            | ObjectDef::Index(_)
            | ObjectDef::Trigger(_)
            | ObjectDef::Policy(_) => return None,
        };
        Some(format!(
            "COMMENT ON {} IS '{}'",
            target,
            escape_literal(comment),
        ))
    }

    fn sequence_owned_by_sql(&self, stmt: &Statement, def: &SequenceDef) -> Option<String> {
        let owned_by = def.owned_by.as_ref()?;
        Some(format!(
            "ALTER SEQUENCE {} OWNED BY {}",
            self.quote_name(stmt.name()),
            self.quote_name(owned_by),
        ))
    }

    fn reseed_sql(&self, table: &Statement, column: &str) -> Option<String> {
        let mut literal = String::new();
        if let Some(ref schema) = table.name().schema {
            literal.push_str(schema);
            literal.push('.');
        }
        literal.push_str(table.bare_name());
        Some(format!(
            "SELECT setval(pg_get_serial_sequence('{}', '{}'), (SELECT COALESCE(MAX({}), 1) FROM {}))",
            literal,
            column,
            self.quote(column),
            self.quote_name(table.name()),
        ))
    }
}
