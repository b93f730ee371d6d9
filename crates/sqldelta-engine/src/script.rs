//! The output script.
//!
//! A [`Script`] is an append-only, ordered sequence of opaque text
//! blocks: DDL statements and comment/marker lines. Rendering joins
//! them with the dialect's statement terminator; the transaction
//! wrapper is applied by the pipeline facade, not here.

use crate::dialect::Dialect;

/// One entry in the output script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEntry {
    /// A DDL statement, without its terminator.
    Statement(String),
    /// A comment or marker line, emitted verbatim.
    Comment(String),
}

/// An ordered, append-only DDL script.
#[derive(Debug, Clone, Default)]
pub struct Script {
    entries: Vec<ScriptEntry>,
}

impl Script {
    /// Creates an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a statement.
    pub fn add_statement(&mut self, sql: impl Into<String>) {
        self.entries.push(ScriptEntry::Statement(sql.into()));
    }

    /// Appends a comment line.
    pub fn add_comment(&mut self, comment: impl Into<String>) {
        self.entries.push(ScriptEntry::Comment(comment.into()));
    }

    /// The entries, in emission order.
    #[must_use]
    pub fn entries(&self) -> &[ScriptEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the script is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of statement entries (comments excluded).
    #[must_use]
    pub fn statement_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, ScriptEntry::Statement(_)))
            .count()
    }

    /// Returns the statement texts, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                ScriptEntry::Statement(sql) => Some(sql.as_str()),
                ScriptEntry::Comment(_) => None,
            })
            .collect()
    }

    /// Wraps the script in the dialect's transaction syntax, when the
    /// dialect has one. A no-op for empty scripts.
    pub fn wrap_transaction(&mut self, dialect: &dyn Dialect) {
        if self.entries.is_empty() {
            return;
        }
        if let Some((begin, commit)) = dialect.transaction_wrapper() {
            self.entries
                .insert(0, ScriptEntry::Statement(begin.to_string()));
            self.entries.push(ScriptEntry::Statement(commit.to_string()));
        }
    }

    /// Renders the script to text using the dialect's terminator.
    #[must_use]
    pub fn to_sql(&self, dialect: &dyn Dialect) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            match entry {
                ScriptEntry::Statement(sql) => {
                    out.push_str(sql);
                    out.push_str(dialect.statement_terminator());
                    out.push_str("\n\n");
                }
                ScriptEntry::Comment(comment) => {
                    out.push_str(comment);
                    out.push('\n');
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DialectKind;

    #[test]
    fn renders_in_order_with_terminators() {
        let mut script = Script::new();
        script.add_comment("-- DEPCY: VIEW public.v depends on TABLE public.t");
        script.add_statement("DROP VIEW public.v");
        script.add_statement("DROP TABLE public.t");

        let sql = script.to_sql(DialectKind::Postgres.dialect());
        assert!(sql.contains("DROP VIEW public.v;"));
        let drop_view = sql.find("DROP VIEW").unwrap();
        let drop_table = sql.find("DROP TABLE").unwrap();
        assert!(drop_view < drop_table);
    }

    #[test]
    fn mssql_batches_use_go() {
        let mut script = Script::new();
        script.add_statement("DROP TABLE [dbo].[t]");
        let sql = script.to_sql(DialectKind::MsSql.dialect());
        assert!(sql.contains("GO"));
    }

    #[test]
    fn transaction_wrapper_is_dialect_aware() {
        let mut script = Script::new();
        script.add_statement("DROP TABLE public.t");
        script.wrap_transaction(DialectKind::Postgres.dialect());
        assert_eq!(script.statements().first().copied(), Some("START TRANSACTION"));
        assert_eq!(script.statements().last().copied(), Some("COMMIT TRANSACTION"));

        // ClickHouse has no transactions; the wrapper is a no-op.
        let mut script = Script::new();
        script.add_statement("DROP TABLE t");
        script.wrap_transaction(DialectKind::ClickHouse.dialect());
        assert_eq!(script.statement_count(), 1);
    }

    #[test]
    fn empty_script_is_not_wrapped() {
        let mut script = Script::new();
        script.wrap_transaction(DialectKind::Postgres.dialect());
        assert!(script.is_empty());
    }
}
