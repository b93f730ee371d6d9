//! Ignore lists.
//!
//! An ignore list filters diff-tree nodes by name before resolution.
//! Rules match the bare or fully qualified name, exactly or by regex,
//! optionally constrained to one object kind or one database. Show
//! rules dominate hide rules; an object no rule matches is shown.

use regex::Regex;

use sqldelta_model::{ObjectId, ObjectKind};

use crate::error::{EngineError, Result};

/// How a rule matches names.
#[derive(Debug, Clone)]
enum IgnorePattern {
    Exact(String),
    Regex(Regex),
}

impl IgnorePattern {
    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(text) => text == name,
            Self::Regex(regex) => regex.is_match(name),
        }
    }
}

/// A single show or hide rule.
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    pattern: IgnorePattern,
    show: bool,
    kind: Option<ObjectKind>,
    db: Option<String>,
    qualified: bool,
}

impl IgnoreRule {
    /// A hide rule with an exact name pattern.
    #[must_use]
    pub fn hide(name: impl Into<String>) -> Self {
        Self {
            pattern: IgnorePattern::Exact(name.into()),
            show: false,
            kind: None,
            db: None,
            qualified: false,
        }
    }

    /// A show (whitelist) rule with an exact name pattern.
    #[must_use]
    pub fn show(name: impl Into<String>) -> Self {
        Self {
            show: true,
            ..Self::hide(name)
        }
    }

    /// A hide rule with a regex pattern.
    pub fn hide_regex(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| EngineError::InvalidIgnorePattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: IgnorePattern::Regex(regex),
            show: false,
            kind: None,
            db: None,
            qualified: false,
        })
    }

    /// A show rule with a regex pattern.
    pub fn show_regex(pattern: &str) -> Result<Self> {
        let mut rule = Self::hide_regex(pattern)?;
        rule.show = true;
        Ok(rule)
    }

    /// Constrains the rule to one object kind.
    #[must_use]
    pub fn for_kind(mut self, kind: ObjectKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Constrains the rule to one database.
    #[must_use]
    pub fn for_db(mut self, db: impl Into<String>) -> Self {
        self.db = Some(db.into());
        self
    }

    /// Matches the pattern against the fully qualified dotted name
    /// instead of the bare name.
    #[must_use]
    pub fn qualified(mut self) -> Self {
        self.qualified = true;
        self
    }

    fn matches(&self, id: &ObjectId, db: Option<&str>) -> bool {
        if let Some(kind) = self.kind {
            if kind != id.kind {
                return false;
            }
        }
        if let Some(ref rule_db) = self.db {
            if db != Some(rule_db.as_str()) {
                return false;
            }
        }
        if self.qualified {
            self.pattern.matches(&id.name.to_string())
        } else {
            self.pattern.matches(&id.name.name)
        }
    }
}

/// An ordered collection of ignore rules.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    rules: Vec<IgnoreRule>,
}

impl IgnoreList {
    /// Creates an empty list (everything shown).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule, builder-style.
    #[must_use]
    pub fn rule(mut self, rule: IgnoreRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds a rule in place.
    pub fn add(&mut self, rule: IgnoreRule) {
        self.rules.push(rule);
    }

    /// Whether the object is hidden. Show rules dominate hide rules;
    /// the default is shown.
    #[must_use]
    pub fn is_hidden(&self, id: &ObjectId, db: Option<&str>) -> bool {
        let mut hidden = false;
        for rule in &self.rules {
            if !rule.matches(id, db) {
                continue;
            }
            if rule.show {
                return false;
            }
            hidden = true;
        }
        hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqldelta_model::QualifiedName;

    fn table(name: &str) -> ObjectId {
        ObjectId::new(ObjectKind::Table, QualifiedName::qualified("public", name))
    }

    #[test]
    fn empty_list_shows_everything() {
        let list = IgnoreList::new();
        assert!(!list.is_hidden(&table("t"), None));
    }

    #[test]
    fn hide_by_exact_name() {
        let list = IgnoreList::new().rule(IgnoreRule::hide("t"));
        assert!(list.is_hidden(&table("t"), None));
        assert!(!list.is_hidden(&table("u"), None));
    }

    #[test]
    fn show_rule_dominates_hide_rule() {
        let list = IgnoreList::new()
            .rule(IgnoreRule::hide_regex("^tmp_.*").unwrap())
            .rule(IgnoreRule::show("tmp_keep"));
        assert!(list.is_hidden(&table("tmp_scratch"), None));
        assert!(!list.is_hidden(&table("tmp_keep"), None));
    }

    #[test]
    fn kind_constraint() {
        let list = IgnoreList::new().rule(IgnoreRule::hide("t").for_kind(ObjectKind::View));
        assert!(!list.is_hidden(&table("t"), None));
    }

    #[test]
    fn db_constraint() {
        let list = IgnoreList::new().rule(IgnoreRule::hide("t").for_db("staging"));
        assert!(list.is_hidden(&table("t"), Some("staging")));
        assert!(!list.is_hidden(&table("t"), Some("production")));
        assert!(!list.is_hidden(&table("t"), None));
    }

    #[test]
    fn qualified_matching() {
        let list = IgnoreList::new().rule(IgnoreRule::hide_regex(r"^audit\..*").unwrap().qualified());
        let audit = ObjectId::new(ObjectKind::Table, QualifiedName::qualified("audit", "log"));
        assert!(list.is_hidden(&audit, None));
        assert!(!list.is_hidden(&table("log"), None));
    }

    #[test]
    fn invalid_regex_is_a_typed_error() {
        let err = IgnoreRule::hide_regex("(").unwrap_err();
        assert!(matches!(err, EngineError::InvalidIgnorePattern { .. }));
    }
}
