//! Diff settings.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use sqldelta_model::ObjectKind;

use crate::dialect::{ClickHouseDialect, Dialect, MsSqlDialect, PostgresDialect};

/// Target dialect for script generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DialectKind {
    /// PostgreSQL.
    #[default]
    Postgres,
    /// Microsoft SQL Server.
    MsSql,
    /// ClickHouse.
    ClickHouse,
}

static POSTGRES: PostgresDialect = PostgresDialect;
static MSSQL: MsSqlDialect = MsSqlDialect;
static CLICKHOUSE: ClickHouseDialect = ClickHouseDialect;

impl DialectKind {
    /// Returns the dialect implementation.
    #[must_use]
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Self::Postgres => &POSTGRES,
            Self::MsSql => &MSSQL,
            Self::ClickHouse => &CLICKHOUSE,
        }
    }
}

/// Options recognized by the resolver and assembler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Only emit statements for objects the user actually selected;
    /// objects pulled in as dependencies become hidden markers.
    pub selected_only: bool,
    /// Treat a filtered-out object as a hard error instead of a
    /// hidden marker.
    pub stop_on_not_allowed: bool,
    /// Preserve table contents across drop+create by renaming,
    /// copying, and dropping.
    pub data_movement_mode: bool,
    /// Wrap the finished script in a transaction.
    pub add_transaction_wrapper: bool,
    /// Target dialect.
    pub dialect: DialectKind,
    /// Kinds allowed in the output; `None` allows everything.
    pub allowed_kinds: Option<BTreeSet<ObjectKind>>,
}

impl Settings {
    /// Creates default settings (PostgreSQL, everything allowed).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target dialect.
    #[must_use]
    pub fn dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    /// Enables selected-only mode.
    #[must_use]
    pub fn selected_only(mut self) -> Self {
        self.selected_only = true;
        self
    }

    /// Enables strict mode for disallowed objects.
    #[must_use]
    pub fn stop_on_not_allowed(mut self) -> Self {
        self.stop_on_not_allowed = true;
        self
    }

    /// Enables data-movement mode.
    #[must_use]
    pub fn data_movement(mut self) -> Self {
        self.data_movement_mode = true;
        self
    }

    /// Enables the transaction wrapper.
    #[must_use]
    pub fn with_transaction(mut self) -> Self {
        self.add_transaction_wrapper = true;
        self
    }

    /// Restricts output to the given kinds.
    #[must_use]
    pub fn allow_kinds(mut self, kinds: impl IntoIterator<Item = ObjectKind>) -> Self {
        self.allowed_kinds = Some(kinds.into_iter().collect());
        self
    }

    /// Whether the given kind passes the allowed-kind filter.
    #[must_use]
    pub fn kind_allowed(&self, kind: ObjectKind) -> bool {
        self.allowed_kinds.as_ref().is_none_or(|set| set.contains(&kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allows_everything() {
        let settings = Settings::new();
        assert!(settings.kind_allowed(ObjectKind::Table));
        assert!(settings.kind_allowed(ObjectKind::Policy));
    }

    #[test]
    fn allowed_kinds_filter() {
        let settings = Settings::new().allow_kinds([ObjectKind::Table, ObjectKind::Column]);
        assert!(settings.kind_allowed(ObjectKind::Table));
        assert!(!settings.kind_allowed(ObjectKind::View));
    }

    #[test]
    fn settings_round_trip_through_serde() {
        let settings = Settings::new()
            .dialect(DialectKind::MsSql)
            .selected_only()
            .data_movement();
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert!(back.selected_only);
        assert!(back.data_movement_mode);
        assert_eq!(back.dialect, DialectKind::MsSql);
    }
}
