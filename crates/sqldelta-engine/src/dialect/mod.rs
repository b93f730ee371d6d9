//! Dialect implementations.
//!
//! A [`Dialect`] renders statements into concrete DDL text and decides
//! whether a change between two versions of an object can be expressed
//! in place or requires drop-and-recreate. The trait carries generic
//! renderings; dialects override the points where the databases
//! actually differ (quoting, terminators, identity, refresh, rename).

mod clickhouse;
mod mssql;
mod postgres;

pub use clickhouse::ClickHouseDialect;
pub use mssql::MsSqlDialect;
pub use postgres::PostgresDialect;

use sqldelta_model::def::{
    ColumnDef, ConstraintDef, FkAction, FunctionDef, IndexDef, ObjectDef, PolicyDef, SequenceDef,
    TableDef, ViewDef,
};
use sqldelta_model::{QualifiedName, Statement};

/// How a change between two versions of the same object is expressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterDecision {
    /// The definitions are identical; nothing to do.
    Unchanged,
    /// The change is expressible in place; the statements to run. The
    /// list may be empty when the whole change is carried by deferred
    /// statements (sequence ownership) or is not renderable in this
    /// dialect.
    InPlace(Vec<String>),
    /// The change is content-breaking; drop and recreate instead.
    Recreate,
}

/// Database-specific DDL generation.
pub trait Dialect: Sync {
    /// The dialect's name.
    fn name(&self) -> &'static str;

    /// Quotes a single identifier.
    fn quote(&self, ident: &str) -> String {
        format!("\"{}\"", ident)
    }

    /// Quotes a qualified name, dot-joined.
    fn quote_name(&self, name: &QualifiedName) -> String {
        let mut parts = Vec::new();
        if let Some(ref schema) = name.schema {
            parts.push(self.quote(schema));
        }
        if let Some(ref container) = name.container {
            parts.push(self.quote(container));
        }
        parts.push(self.quote(&name.name));
        parts.join(".")
    }

    /// Quotes the owning container of a sub-object.
    fn quote_container(&self, stmt: &Statement) -> String {
        stmt.name()
            .container_name()
            .map_or_else(|| self.quote_name(stmt.name()), |c| self.quote_name(&c))
    }

    /// The statement terminator appended by the script renderer.
    fn statement_terminator(&self) -> &'static str {
        ";"
    }

    /// Transaction begin/commit statements, if the dialect has them.
    fn transaction_wrapper(&self) -> Option<(&'static str, &'static str)>;

    /// The identity clause used in column definitions.
    fn identity_clause(&self) -> &'static str {
        "GENERATED BY DEFAULT AS IDENTITY"
    }

    /// Renders one column definition for CREATE TABLE / ADD COLUMN.
    fn column_definition(&self, name: &str, col: &ColumnDef) -> String {
        let mut parts = vec![self.quote(name), col.type_name.clone()];
        if let Some(ref collation) = col.collation {
            parts.push(format!("COLLATE {}", self.quote(collation)));
        }
        if col.identity && !self.identity_clause().is_empty() {
            parts.push(self.identity_clause().to_string());
        }
        if col.not_null {
            parts.push("NOT NULL".to_string());
        }
        if let Some(ref default) = col.default {
            parts.push(format!("DEFAULT {}", default));
        }
        if let Some(ref generated) = col.generated {
            parts.push(format!("GENERATED ALWAYS AS ({}) STORED", generated));
        }
        parts.join(" ")
    }

    /// Renders the body of a table constraint.
    fn constraint_clause(&self, def: &ConstraintDef) -> String {
        match def {
            ConstraintDef::PrimaryKey { columns } => {
                format!("PRIMARY KEY ({})", self.join_quoted(columns))
            }
            ConstraintDef::Unique { columns } => {
                format!("UNIQUE ({})", self.join_quoted(columns))
            }
            ConstraintDef::ForeignKey {
                columns,
                ref_table,
                ref_columns,
                on_delete,
                on_update,
            } => {
                let mut sql = format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    self.join_quoted(columns),
                    self.quote_name(ref_table),
                    self.join_quoted(ref_columns),
                );
                if *on_delete != FkAction::NoAction {
                    sql.push_str(" ON DELETE ");
                    sql.push_str(on_delete.as_sql());
                }
                if *on_update != FkAction::NoAction {
                    sql.push_str(" ON UPDATE ");
                    sql.push_str(on_update.as_sql());
                }
                sql
            }
            ConstraintDef::Check { expression } => format!("CHECK ({})", expression),
        }
    }

    /// Quotes and comma-joins a column list.
    fn join_quoted(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// CREATE SCHEMA rendering (CREATE DATABASE for dialects without
    /// schemas).
    fn create_schema_sql(&self, stmt: &Statement) -> String {
        format!("CREATE SCHEMA {}", self.quote(stmt.bare_name()))
    }

    /// DROP SCHEMA rendering.
    fn drop_schema_sql(&self, stmt: &Statement) -> String {
        format!("DROP SCHEMA {}", self.quote(stmt.bare_name()))
    }

    /// ADD COLUMN rendering for a column joining an existing table.
    fn add_column_sql(&self, stmt: &Statement, def: &ColumnDef) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_container(stmt),
            self.column_definition(stmt.bare_name(), def),
        )
    }

    /// Renders the creation DDL of a statement.
    fn create_sql(&self, stmt: &Statement) -> String {
        match stmt.def() {
            ObjectDef::Schema(_) => self.create_schema_sql(stmt),
            ObjectDef::Role(def) => {
                let mut sql = format!("CREATE ROLE {}", self.quote(stmt.bare_name()));
                if def.can_login {
                    sql.push_str(" LOGIN");
                }
                sql
            }
            ObjectDef::Sequence(def) => self.create_sequence_sql(stmt, def),
            ObjectDef::Table(def) => self.create_table_sql(stmt, def),
            ObjectDef::Column(def) => self.add_column_sql(stmt, def),
            ObjectDef::Constraint(def) => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} {}",
                self.quote_container(stmt),
                self.quote(stmt.bare_name()),
                self.constraint_clause(def),
            ),
            ObjectDef::Index(def) => self.create_index_sql(stmt, def),
            ObjectDef::View(def) => self.create_view_sql(stmt, def),
            ObjectDef::Function(def) => self.create_function_sql(stmt, def),
            ObjectDef::Trigger(def) => format!(
                "CREATE TRIGGER {} {}",
                self.quote(stmt.bare_name()),
                def.definition,
            ),
            ObjectDef::Policy(def) => self.create_policy_sql(stmt, def),
        }
    }

    /// Renders the drop DDL of a statement.
    fn drop_sql(&self, stmt: &Statement) -> String {
        match stmt.def() {
            ObjectDef::Schema(_) => self.drop_schema_sql(stmt),
            ObjectDef::Role(_) => format!("DROP ROLE {}", self.quote(stmt.bare_name())),
            ObjectDef::Sequence(_) => format!("DROP SEQUENCE {}", self.quote_name(stmt.name())),
            ObjectDef::Table(_) => format!("DROP TABLE {}", self.quote_name(stmt.name())),
            ObjectDef::Column(_) => format!(
                "ALTER TABLE {} DROP COLUMN {}",
                self.quote_container(stmt),
                self.quote(stmt.bare_name()),
            ),
            ObjectDef::Constraint(_) => format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.quote_container(stmt),
                self.quote(stmt.bare_name()),
            ),
            ObjectDef::Index(_) => self.drop_index_sql(stmt),
            ObjectDef::View(def) => {
                if def.materialized {
                    format!("DROP MATERIALIZED VIEW {}", self.quote_name(stmt.name()))
                } else {
                    format!("DROP VIEW {}", self.quote_name(stmt.name()))
                }
            }
            ObjectDef::Function(def) => format!(
                "DROP FUNCTION {}({})",
                self.quote_name(stmt.name()),
                def.arguments,
            ),
            ObjectDef::Trigger(_) => format!(
                "DROP TRIGGER {} ON {}",
                self.quote(stmt.bare_name()),
                self.quote_container(stmt),
            ),
            ObjectDef::Policy(_) => format!(
                "DROP POLICY {} ON {}",
                self.quote(stmt.bare_name()),
                self.quote_container(stmt),
            ),
        }
    }

    /// Decides how to express the change from `old` to `new`. Both
    /// must carry the same identity.
    fn alter_decision(&self, old: &Statement, new: &Statement) -> AlterDecision {
        if old.same_def(new) {
            return AlterDecision::Unchanged;
        }
        let mut stmts = match (old.def(), new.def()) {
            (ObjectDef::Schema(o), ObjectDef::Schema(n)) => {
                let mut stmts = Vec::new();
                if o.owner != n.owner {
                    if let Some(ref owner) = n.owner {
                        stmts.push(format!(
                            "ALTER SCHEMA {} OWNER TO {}",
                            self.quote(new.bare_name()),
                            self.quote(owner),
                        ));
                    }
                }
                stmts
            }
            (ObjectDef::Role(o), ObjectDef::Role(n)) => {
                let mut stmts = Vec::new();
                if o.can_login != n.can_login {
                    stmts.push(format!(
                        "ALTER ROLE {} {}",
                        self.quote(new.bare_name()),
                        if n.can_login { "LOGIN" } else { "NOLOGIN" },
                    ));
                }
                stmts
            }
            (ObjectDef::Sequence(o), ObjectDef::Sequence(n)) => {
                self.alter_sequence_statements(new, o, n)
            }
            (ObjectDef::Table(o), ObjectDef::Table(n)) => {
                match self.alter_table_statements(new, o, n) {
                    Some(stmts) => stmts,
                    None => return AlterDecision::Recreate,
                }
            }
            (ObjectDef::Column(o), ObjectDef::Column(n)) => {
                match self.alter_column_statements(new, o, n) {
                    Some(stmts) => stmts,
                    None => return AlterDecision::Recreate,
                }
            }
            (ObjectDef::View(o), ObjectDef::View(n)) => {
                if o.query != n.query || o.materialized != n.materialized {
                    return AlterDecision::Recreate;
                }
                Vec::new()
            }
            (ObjectDef::Function(o), ObjectDef::Function(n)) => {
                if o.arguments != n.arguments || o.returns != n.returns {
                    return AlterDecision::Recreate;
                }
                match self.replace_function_sql(new, n) {
                    Some(sql) => vec![sql],
                    None => return AlterDecision::Recreate,
                }
            }
            // Constraints, indexes, triggers, and policies have no
            // in-place alter form.
            _ => return AlterDecision::Recreate,
        };

        if comment_of(old.def()) != comment_of(new.def()) {
            if let Some(sql) = self.comment_sql(new) {
                stmts.push(sql);
            }
        }
        AlterDecision::InPlace(stmts)
    }

    /// In-place statements for a table-level change, or `None` when
    /// the table must be recreated.
    fn alter_table_statements(
        &self,
        new: &Statement,
        old_def: &TableDef,
        new_def: &TableDef,
    ) -> Option<Vec<String>> {
        if old_def.partition_of != new_def.partition_of
            || old_def.partition_bound != new_def.partition_bound
            || old_def.inherits != new_def.inherits
        {
            return None;
        }
        let mut stmts = Vec::new();
        if old_def.options != new_def.options {
            if new_def.options.is_empty() {
                return None;
            }
            stmts.push(format!(
                "ALTER TABLE {} SET ({})",
                self.quote_name(new.name()),
                new_def.options.join(", "),
            ));
        }
        Some(stmts)
    }

    /// In-place statements for a column-level change, or `None` when
    /// the column must be recreated.
    fn alter_column_statements(
        &self,
        new: &Statement,
        old_def: &ColumnDef,
        new_def: &ColumnDef,
    ) -> Option<Vec<String>> {
        if old_def.generated != new_def.generated {
            return None;
        }
        let table = self.quote_container(new);
        let column = self.quote(new.bare_name());
        let mut stmts = Vec::new();

        if old_def.type_name != new_def.type_name || old_def.collation != new_def.collation {
            let mut sql = format!(
                "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
                table, column, new_def.type_name,
            );
            if let Some(ref collation) = new_def.collation {
                sql.push_str(" COLLATE ");
                sql.push_str(&self.quote(collation));
            }
            stmts.push(sql);
        }
        if old_def.not_null != new_def.not_null {
            stmts.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} {} NOT NULL",
                table,
                column,
                if new_def.not_null { "SET" } else { "DROP" },
            ));
        }
        if old_def.default != new_def.default {
            match new_def.default {
                Some(ref default) => stmts.push(format!(
                    "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                    table, column, default,
                )),
                None => stmts.push(format!(
                    "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                    table, column,
                )),
            }
        }
        if old_def.identity != new_def.identity {
            if new_def.identity {
                stmts.push(format!(
                    "ALTER TABLE {} ALTER COLUMN {} ADD {}",
                    table,
                    column,
                    self.identity_clause(),
                ));
            } else {
                stmts.push(format!(
                    "ALTER TABLE {} ALTER COLUMN {} DROP IDENTITY",
                    table, column,
                ));
            }
        }
        Some(stmts)
    }

    /// In-place statements for a sequence change. The OWNED BY clause
    /// is never part of these: the assembler defers it.
    fn alter_sequence_statements(
        &self,
        new: &Statement,
        old_def: &SequenceDef,
        new_def: &SequenceDef,
    ) -> Vec<String> {
        let mut clauses = Vec::new();
        if old_def.increment != new_def.increment {
            if let Some(increment) = new_def.increment {
                clauses.push(format!("INCREMENT BY {}", increment));
            }
        }
        if old_def.min_value != new_def.min_value {
            clauses.push(new_def.min_value.map_or_else(
                || "NO MINVALUE".to_string(),
                |v| format!("MINVALUE {}", v),
            ));
        }
        if old_def.max_value != new_def.max_value {
            clauses.push(new_def.max_value.map_or_else(
                || "NO MAXVALUE".to_string(),
                |v| format!("MAXVALUE {}", v),
            ));
        }
        if old_def.start != new_def.start {
            if let Some(start) = new_def.start {
                clauses.push(format!("START WITH {}", start));
            }
        }
        if old_def.cache != new_def.cache {
            if let Some(cache) = new_def.cache {
                clauses.push(format!("CACHE {}", cache));
            }
        }
        if old_def.cycle != new_def.cycle {
            clauses.push(if new_def.cycle { "CYCLE" } else { "NO CYCLE" }.to_string());
        }
        if clauses.is_empty() {
            // Only the ownership changed; the deferred pass covers it.
            return Vec::new();
        }
        vec![format!(
            "ALTER SEQUENCE {} {}",
            self.quote_name(new.name()),
            clauses.join(" "),
        )]
    }

    /// CREATE TABLE rendering.
    fn create_table_sql(&self, stmt: &Statement, def: &TableDef) -> String {
        let name = self.quote_name(stmt.name());
        if let Some(ref parent) = def.partition_of {
            let mut sql = format!("CREATE TABLE {} PARTITION OF {}", name, self.quote_name(parent));
            if let Some(ref bound) = def.partition_bound {
                sql.push(' ');
                sql.push_str(bound);
            }
            return sql;
        }

        let columns: Vec<String> = stmt
            .children()
            .iter()
            .filter_map(|child| match child.def() {
                ObjectDef::Column(col) => {
                    Some(format!("  {}", self.column_definition(child.bare_name(), col)))
                }
                _ => None,
            })
            .collect();

        let mut sql = if columns.is_empty() {
            format!("CREATE TABLE {} ()", name)
        } else {
            format!("CREATE TABLE {} (\n{}\n)", name, columns.join(",\n"))
        };
        if !def.inherits.is_empty() {
            let parents: Vec<String> =
                def.inherits.iter().map(|p| self.quote_name(p)).collect();
            sql.push_str(&format!("\nINHERITS ({})", parents.join(", ")));
        }
        if !def.options.is_empty() {
            sql.push_str(&self.table_options_clause(def));
        }
        sql
    }

    /// The storage options clause appended to CREATE TABLE.
    fn table_options_clause(&self, def: &TableDef) -> String {
        format!("\nWITH ({})", def.options.join(", "))
    }

    /// CREATE SEQUENCE rendering; OWNED BY is deferred by the
    /// assembler and never appears here.
    fn create_sequence_sql(&self, stmt: &Statement, def: &SequenceDef) -> String {
        let mut sql = format!("CREATE SEQUENCE {}", self.quote_name(stmt.name()));
        if let Some(start) = def.start {
            sql.push_str(&format!(" START WITH {}", start));
        }
        if let Some(increment) = def.increment {
            sql.push_str(&format!(" INCREMENT BY {}", increment));
        }
        if let Some(min) = def.min_value {
            sql.push_str(&format!(" MINVALUE {}", min));
        }
        if let Some(max) = def.max_value {
            sql.push_str(&format!(" MAXVALUE {}", max));
        }
        if let Some(cache) = def.cache {
            sql.push_str(&format!(" CACHE {}", cache));
        }
        if def.cycle {
            sql.push_str(" CYCLE");
        }
        sql
    }

    /// CREATE INDEX rendering.
    fn create_index_sql(&self, stmt: &Statement, def: &IndexDef) -> String {
        let mut sql = String::from("CREATE ");
        if def.unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        sql.push_str(&self.quote(stmt.bare_name()));
        sql.push_str(" ON ");
        sql.push_str(&self.quote_container(stmt));
        if let Some(ref method) = def.method {
            sql.push_str(" USING ");
            sql.push_str(method);
        }
        sql.push_str(&format!(" ({})", self.join_quoted(&def.columns)));
        if let Some(ref predicate) = def.predicate {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        sql
    }

    /// DROP INDEX rendering.
    fn drop_index_sql(&self, stmt: &Statement) -> String {
        match stmt.name().schema {
            Some(ref schema) => format!(
                "DROP INDEX {}.{}",
                self.quote(schema),
                self.quote(stmt.bare_name()),
            ),
            None => format!("DROP INDEX {}", self.quote(stmt.bare_name())),
        }
    }

    /// CREATE VIEW rendering.
    fn create_view_sql(&self, stmt: &Statement, def: &ViewDef) -> String {
        let keyword = if def.materialized {
            "MATERIALIZED VIEW"
        } else {
            "VIEW"
        };
        format!(
            "CREATE {} {} AS\n{}",
            keyword,
            self.quote_name(stmt.name()),
            def.query,
        )
    }

    /// CREATE FUNCTION rendering.
    fn create_function_sql(&self, stmt: &Statement, def: &FunctionDef) -> String {
        let mut sql = format!(
            "CREATE FUNCTION {}({})",
            self.quote_name(stmt.name()),
            def.arguments,
        );
        if let Some(ref returns) = def.returns {
            sql.push_str(" RETURNS ");
            sql.push_str(returns);
        }
        if let Some(ref language) = def.language {
            sql.push_str(" LANGUAGE ");
            sql.push_str(language);
        }
        sql.push_str(&format!(" AS $$\n{}\n$$", def.body));
        sql
    }

    /// CREATE OR REPLACE (or ALTER) rendering for a body-only function
    /// change; `None` demotes to drop-and-recreate.
    fn replace_function_sql(&self, stmt: &Statement, def: &FunctionDef) -> Option<String> {
        let created = self.create_function_sql(stmt, def);
        created
            .strip_prefix("CREATE ")
            .map(|rest| format!("CREATE OR REPLACE {}", rest))
    }

    /// CREATE POLICY rendering.
    fn create_policy_sql(&self, stmt: &Statement, def: &PolicyDef) -> String {
        let mut sql = format!(
            "CREATE POLICY {} ON {}",
            self.quote(stmt.bare_name()),
            self.quote_container(stmt),
        );
        if let Some(ref command) = def.command {
            sql.push_str(" FOR ");
            sql.push_str(command);
        }
        if !def.roles.is_empty() {
            sql.push_str(&format!(" TO {}", self.join_quoted(&def.roles)));
        }
        if let Some(ref using_expr) = def.using_expr {
            sql.push_str(&format!(" USING ({})", using_expr));
        }
        if let Some(ref check_expr) = def.check_expr {
            sql.push_str(&format!(" WITH CHECK ({})", check_expr));
        }
        sql
    }

    /// COMMENT ON rendering, where supported.
    fn comment_sql(&self, _stmt: &Statement) -> Option<String> {
        None
    }

    /// Rename used by data-movement mode to move a table out of the
    /// way.
    fn rename_table_sql(&self, stmt: &Statement, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_name(stmt.name()),
            self.quote(new_name),
        )
    }

    /// Lightweight refresh directive replacing drop+create of an
    /// unmodified object, where the dialect has one.
    fn refresh_sql(&self, _stmt: &Statement) -> Option<String> {
        None
    }

    /// Deferred `ALTER SEQUENCE ... OWNED BY ...` rendering.
    fn sequence_owned_by_sql(&self, _stmt: &Statement, _def: &SequenceDef) -> Option<String> {
        None
    }

    /// INSERT-SELECT used by data-movement mode to copy rows back
    /// from the renamed table.
    fn insert_select_sql(&self, target: &Statement, temp_name: &str, columns: &[String]) -> String {
        let source = QualifiedName {
            schema: target.name().schema.clone(),
            container: None,
            name: temp_name.to_string(),
        };
        format!(
            "INSERT INTO {} ({})\nSELECT {}\nFROM {}",
            self.quote_name(target.name()),
            self.join_quoted(columns),
            self.join_quoted(columns),
            self.quote_name(&source),
        )
    }

    /// DROP of the temporary table left behind by data movement.
    fn drop_temp_table_sql(&self, schema: Option<&str>, temp_name: &str) -> String {
        match schema {
            Some(schema) => format!(
                "DROP TABLE {}.{}",
                self.quote(schema),
                self.quote(temp_name),
            ),
            None => format!("DROP TABLE {}", self.quote(temp_name)),
        }
    }

    /// Identity/auto-increment reseed after a data-movement copy.
    fn reseed_sql(&self, _table: &Statement, _column: &str) -> Option<String> {
        None
    }
}

/// The comment carried by a definition, if its kind has one.
#[must_use]
pub fn comment_of(def: &ObjectDef) -> Option<&str> {
    match def {
        ObjectDef::Schema(d) => d.comment.as_deref(),
        ObjectDef::Role(d) => d.comment.as_deref(),
        ObjectDef::Sequence(d) => d.comment.as_deref(),
        ObjectDef::Table(d) => d.comment.as_deref(),
        ObjectDef::Column(d) => d.comment.as_deref(),
        ObjectDef::View(d) => d.comment.as_deref(),
        ObjectDef::Function(d) => d.comment.as_deref(),
        ObjectDef::Constraint(_)
        | ObjectDef::Index(_)
        | ObjectDef::Trigger(_)
        | ObjectDef::Policy(_) => None,
    }
}
