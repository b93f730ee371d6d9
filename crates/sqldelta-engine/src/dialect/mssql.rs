//! Microsoft SQL Server dialect.
//!
//! Statements are separated into batches with `GO`. Column alters must
//! restate type and nullability together, defaults are named
//! constraints (a default change recreates the column), and view
//! modules support `sp_refreshview` instead of drop+create when the
//! definition did not change.

use sqldelta_model::def::{ColumnDef, FunctionDef, ObjectDef, TableDef};
use sqldelta_model::Statement;

use super::Dialect;

/// MS SQL Server DDL generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsSqlDialect;

impl MsSqlDialect {
    /// Creates the dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MsSqlDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn quote(&self, ident: &str) -> String {
        format!("[{}]", ident)
    }

    fn statement_terminator(&self) -> &'static str {
        "\nGO"
    }

    fn transaction_wrapper(&self) -> Option<(&'static str, &'static str)> {
        Some(("BEGIN TRANSACTION", "COMMIT"))
    }

    fn identity_clause(&self) -> &'static str {
        "IDENTITY(1,1)"
    }

    fn column_definition(&self, name: &str, col: &ColumnDef) -> String {
        // Computed columns carry no type of their own.
        if let Some(ref generated) = col.generated {
            let mut sql = format!("{} AS ({}) PERSISTED", self.quote(name), generated);
            if col.not_null {
                sql.push_str(" NOT NULL");
            }
            return sql;
        }
        let mut parts = vec![self.quote(name), col.type_name.clone()];
        if let Some(ref collation) = col.collation {
            parts.push(format!("COLLATE {}", collation));
        }
        if col.identity {
            parts.push(self.identity_clause().to_string());
        }
        parts.push(if col.not_null { "NOT NULL" } else { "NULL" }.to_string());
        if let Some(ref default) = col.default {
            parts.push(format!("DEFAULT {}", default));
        }
        parts.join(" ")
    }

    fn add_column_sql(&self, stmt: &Statement, def: &ColumnDef) -> String {
        format!(
            "ALTER TABLE {} ADD {}",
            self.quote_container(stmt),
            self.column_definition(stmt.bare_name(), def),
        )
    }

    fn alter_column_statements(
        &self,
        new: &Statement,
        old_def: &ColumnDef,
        new_def: &ColumnDef,
    ) -> Option<Vec<String>> {
        // Identity, computed expressions, and named default
        // constraints cannot be changed in place.
        if old_def.identity != new_def.identity
            || old_def.generated != new_def.generated
            || old_def.default != new_def.default
        {
            return None;
        }
        let mut stmts = Vec::new();
        if old_def.type_name != new_def.type_name
            || old_def.not_null != new_def.not_null
            || old_def.collation != new_def.collation
        {
            let mut sql = format!(
                "ALTER TABLE {} ALTER COLUMN {} {}",
                self.quote_container(new),
                self.quote(new.bare_name()),
                new_def.type_name,
            );
            if let Some(ref collation) = new_def.collation {
                sql.push_str(" COLLATE ");
                sql.push_str(collation);
            }
            sql.push_str(if new_def.not_null { " NOT NULL" } else { " NULL" });
            stmts.push(sql);
        }
        Some(stmts)
    }

    fn table_options_clause(&self, _def: &TableDef) -> String {
        String::new()
    }

    fn create_function_sql(&self, stmt: &Statement, def: &FunctionDef) -> String {
        let mut sql = format!(
            "CREATE FUNCTION {} ({})",
            self.quote_name(stmt.name()),
            def.arguments,
        );
        if let Some(ref returns) = def.returns {
            sql.push_str(" RETURNS ");
            sql.push_str(returns);
        }
        sql.push_str(&format!(" AS\nBEGIN\n{}\nEND", def.body));
        sql
    }

    fn replace_function_sql(&self, stmt: &Statement, def: &FunctionDef) -> Option<String> {
        self.create_function_sql(stmt, def)
            .strip_prefix("CREATE ")
            .map(|rest| format!("ALTER {}", rest))
    }

    fn drop_index_sql(&self, stmt: &Statement) -> String {
        format!(
            "DROP INDEX {} ON {}",
            self.quote(stmt.bare_name()),
            self.quote_container(stmt),
        )
    }

    fn rename_table_sql(&self, stmt: &Statement, new_name: &str) -> String {
        let mut current = String::new();
        if let Some(ref schema) = stmt.name().schema {
            current.push_str(&self.quote(schema));
            current.push('.');
        }
        current.push_str(&self.quote(stmt.bare_name()));
        format!("EXEC sp_rename N'{}', N'{}'", current, new_name)
    }

    fn refresh_sql(&self, stmt: &Statement) -> Option<String> {
        match stmt.def() {
            ObjectDef::View(_) => Some(format!(
                "EXEC sp_refreshview N'{}'",
                self.quote_name(stmt.name()),
            )),
            _ => None,
        }
    }

    fn reseed_sql(&self, table: &Statement, _column: &str) -> Option<String> {
        let mut name = String::new();
        if let Some(ref schema) = table.name().schema {
            name.push_str(&self.quote(schema));
            name.push('.');
        }
        name.push_str(&self.quote(table.bare_name()));
        Some(format!("DBCC CHECKIDENT ('{}', RESEED)", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqldelta_model::def::ViewDef;

    fn dialect() -> MsSqlDialect {
        MsSqlDialect::new()
    }

    #[test]
    fn identifiers_use_brackets() {
        let table = Statement::table("dbo", "t", TableDef::new())
            .child(Statement::column("dbo", "t", "id", ColumnDef::new("bigint").identity()));
        let sql = dialect().create_sql(&table);
        assert!(sql.contains("[dbo].[t]"));
        assert!(sql.contains("[id] bigint IDENTITY(1,1) NOT NULL"));
    }

    #[test]
    fn add_column_has_no_column_keyword() {
        let column = Statement::column("dbo", "t", "name", ColumnDef::new("nvarchar(50)"));
        assert_eq!(
            dialect().create_sql(&column),
            "ALTER TABLE [dbo].[t] ADD [name] nvarchar(50) NULL"
        );
    }

    #[test]
    fn computed_column_definition() {
        let def = ColumnDef::new("int").generated("[a] + [b]");
        assert_eq!(
            dialect().column_definition("total", &def),
            "[total] AS ([a] + [b]) PERSISTED"
        );
    }

    #[test]
    fn alter_column_restates_type_and_nullability() {
        let old = Statement::column("dbo", "t", "c", ColumnDef::new("int"));
        let new = Statement::column("dbo", "t", "c", ColumnDef::new("bigint").not_null());
        let stmts = dialect()
            .alter_column_statements(&new, column_def(&old), column_def(&new))
            .unwrap();
        assert_eq!(stmts, vec!["ALTER TABLE [dbo].[t] ALTER COLUMN [c] bigint NOT NULL"]);
    }

    #[test]
    fn default_change_demotes_to_recreate() {
        let old = ColumnDef::new("int");
        let new = ColumnDef::new("int").default("0");
        let stmt = Statement::column("dbo", "t", "c", new.clone());
        assert!(dialect().alter_column_statements(&stmt, &old, &new).is_none());
    }

    #[test]
    fn views_support_refresh() {
        let view = Statement::view("dbo", "v", ViewDef::new("SELECT 1"));
        assert_eq!(
            dialect().refresh_sql(&view).unwrap(),
            "EXEC sp_refreshview N'[dbo].[v]'"
        );
        let table = Statement::table("dbo", "t", TableDef::new());
        assert!(dialect().refresh_sql(&table).is_none());
    }

    #[test]
    fn rename_uses_sp_rename() {
        let table = Statement::table("dbo", "t", TableDef::new());
        assert_eq!(
            dialect().rename_table_sql(&table, "t_sqldelta_tmp"),
            "EXEC sp_rename N'[dbo].[t]', N't_sqldelta_tmp'"
        );
    }

    fn column_def(stmt: &Statement) -> &ColumnDef {
        match stmt.def() {
            ObjectDef::Column(def) => def,
            _ => panic!("not a column"),
        }
    }
}
