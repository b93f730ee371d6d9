//! ClickHouse dialect.
//!
//! Schemas map to databases, column changes go through MODIFY COLUMN,
//! data-skipping indexes are table-level ALTERs, and there are no
//! transactions, so the wrapper setting is ignored.

use sqldelta_model::def::{ColumnDef, IndexDef, TableDef};
use sqldelta_model::Statement;

use super::Dialect;

/// ClickHouse DDL generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClickHouseDialect;

impl ClickHouseDialect {
    /// Creates the dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for ClickHouseDialect {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    fn quote(&self, ident: &str) -> String {
        format!("`{}`", ident)
    }

    fn transaction_wrapper(&self) -> Option<(&'static str, &'static str)> {
        None
    }

    fn identity_clause(&self) -> &'static str {
        ""
    }

    fn create_schema_sql(&self, stmt: &Statement) -> String {
        format!("CREATE DATABASE {}", self.quote(stmt.bare_name()))
    }

    fn drop_schema_sql(&self, stmt: &Statement) -> String {
        format!("DROP DATABASE {}", self.quote(stmt.bare_name()))
    }

    fn table_options_clause(&self, def: &TableDef) -> String {
        let mut clause = String::new();
        for option in &def.options {
            clause.push('\n');
            clause.push_str(option);
        }
        clause
    }

    fn alter_column_statements(
        &self,
        new: &Statement,
        _old_def: &ColumnDef,
        new_def: &ColumnDef,
    ) -> Option<Vec<String>> {
        // MODIFY COLUMN restates the whole definition.
        Some(vec![format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.quote_container(new),
            self.column_definition(new.bare_name(), new_def),
        )])
    }

    fn create_index_sql(&self, stmt: &Statement, def: &IndexDef) -> String {
        let mut sql = format!(
            "ALTER TABLE {} ADD INDEX {} ({})",
            self.quote_container(stmt),
            self.quote(stmt.bare_name()),
            self.join_quoted(&def.columns),
        );
        if let Some(ref method) = def.method {
            sql.push_str(" TYPE ");
            sql.push_str(method);
        }
        sql
    }

    fn drop_index_sql(&self, stmt: &Statement) -> String {
        format!(
            "ALTER TABLE {} DROP INDEX {}",
            self.quote_container(stmt),
            self.quote(stmt.bare_name()),
        )
    }

    fn rename_table_sql(&self, stmt: &Statement, new_name: &str) -> String {
        let target = match stmt.name().schema {
            Some(ref schema) => format!("{}.{}", self.quote(schema), self.quote(new_name)),
            None => self.quote(new_name),
        };
        format!("RENAME TABLE {} TO {}", self.quote_name(stmt.name()), target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect() -> ClickHouseDialect {
        ClickHouseDialect::new()
    }

    #[test]
    fn schemas_are_databases() {
        let schema = Statement::schema("analytics");
        assert_eq!(dialect().create_sql(&schema), "CREATE DATABASE `analytics`");
        assert_eq!(dialect().drop_sql(&schema), "DROP DATABASE `analytics`");
    }

    #[test]
    fn engine_clause_follows_column_list() {
        let table = Statement::table(
            "analytics",
            "events",
            TableDef::new().option("ENGINE = MergeTree()").option("ORDER BY id"),
        )
        .child(Statement::column("analytics", "events", "id", ColumnDef::new("UInt64")));
        let sql = dialect().create_sql(&table);
        assert!(sql.contains("ENGINE = MergeTree()"));
        assert!(sql.contains("ORDER BY id"));
    }

    #[test]
    fn column_changes_use_modify_column() {
        let new = Statement::column("analytics", "events", "name", ColumnDef::new("String"));
        let stmts = dialect()
            .alter_column_statements(&new, &ColumnDef::new("FixedString(16)"), &ColumnDef::new("String"))
            .unwrap();
        assert_eq!(
            stmts,
            vec!["ALTER TABLE `analytics`.`events` MODIFY COLUMN `name` String"]
        );
    }

    #[test]
    fn indexes_are_table_alters() {
        let index = Statement::index(
            "analytics",
            "events",
            "idx_name",
            IndexDef::new(vec!["name".into()]).method("minmax"),
        );
        assert_eq!(
            dialect().create_sql(&index),
            "ALTER TABLE `analytics`.`events` ADD INDEX `idx_name` (`name`) TYPE minmax"
        );
        assert_eq!(
            dialect().drop_sql(&index),
            "ALTER TABLE `analytics`.`events` DROP INDEX `idx_name`"
        );
    }

    #[test]
    fn rename_keeps_the_database_prefix() {
        let table = Statement::table("analytics", "events", TableDef::new());
        assert_eq!(
            dialect().rename_table_sql(&table, "events_tmp"),
            "RENAME TABLE `analytics`.`events` TO `analytics`.`events_tmp`"
        );
    }

    #[test]
    fn no_transaction_wrapper() {
        assert!(dialect().transaction_wrapper().is_none());
    }
}
