//! Script assembly.
//!
//! Renders the resolver's ordered actions into the final script,
//! applying the selection and allowed-kind filters, dependency
//! comments, hidden-object markers, deferred sequence ownership,
//! refresh collapsing, and the optional data-preserving table
//! rewrite. Actions are consumed strictly in resolver order.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use sqldelta_model::def::ObjectDef;
use sqldelta_model::{ObjectId, ObjectKind, Snapshot, Statement};

use crate::cancel::CancellationToken;
use crate::dialect::{AlterDecision, Dialect};
use crate::error::{EngineError, Result};
use crate::resolver::{Action, ActionKind};
use crate::script::Script;
use crate::settings::Settings;

// Deterministic suffix for tables moved aside by data-movement mode.
const TMP_SUFFIX: &str = "_sqldelta_tmp";

/// Renders actions into a [`Script`].
pub struct Assembler<'a> {
    old: &'a Snapshot,
    new: &'a Snapshot,
    settings: &'a Settings,
    dialect: &'a dyn Dialect,
}

struct AssemblyState {
    script: Script,
    // ALTER SEQUENCE ... OWNED BY ..., emitted after all primary actions
    // because the owning column must already exist.
    deferred_ownership: Vec<String>,
    // Tables renamed out of the way, keyed by identity.
    renamed: HashMap<ObjectId, String>,
    // Drop+create pairs of unchanged objects collapsed into refresh
    // directives.
    refreshable: HashSet<ObjectId>,
    pending_refresh: Vec<ObjectId>,
}

impl<'a> Assembler<'a> {
    /// Creates an assembler over the two snapshots.
    #[must_use]
    pub fn new(
        old: &'a Snapshot,
        new: &'a Snapshot,
        settings: &'a Settings,
        dialect: &'a dyn Dialect,
    ) -> Self {
        Self {
            old,
            new,
            settings,
            dialect,
        }
    }

    /// Assembles the script. `selection` is the user's original
    /// selection: an object appearing in the action list only as a
    /// dependency byproduct is not in it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DisallowedObject`] in strict mode and
    /// [`EngineError::Cancelled`] when the token trips.
    pub fn assemble(
        &self,
        actions: &[Action],
        selection: &HashSet<ObjectId>,
        token: &CancellationToken,
    ) -> Result<Script> {
        let mut state = AssemblyState {
            script: Script::new(),
            deferred_ownership: Vec::new(),
            renamed: HashMap::new(),
            refreshable: self.find_refreshable(actions),
            pending_refresh: Vec::new(),
        };

        for action in actions {
            token.ensure_active()?;

            if !self.settings.kind_allowed(action.id.kind) {
                if self.settings.stop_on_not_allowed {
                    return Err(EngineError::DisallowedObject {
                        kind: action.id.kind,
                        name: action.id.name.clone(),
                    });
                }
                state.script.add_comment(hidden_marker(action));
                continue;
            }
            if self.settings.selected_only && !selection.contains(&action.id) {
                state.script.add_comment(hidden_marker(action));
                continue;
            }

            if let Some(comment) = depcy_comment(action) {
                state.script.add_comment(comment);
            }

            match action.kind {
                ActionKind::Create => self.emit_create(action, &mut state),
                ActionKind::Drop => self.emit_drop(action, &mut state),
                ActionKind::Alter => self.emit_alter(action, &mut state),
            }
        }

        for sql in state.deferred_ownership.drain(..) {
            state.script.add_statement(sql);
        }
        // Refresh entries not consumed by a matching create flush in
        // reverse order.
        while let Some(id) = state.pending_refresh.pop() {
            if let Some(stmt) = self.new.get(&id).or_else(|| self.old.get(&id)) {
                if let Some(sql) = self.dialect.refresh_sql(stmt) {
                    state.script.add_statement(sql);
                }
            }
        }

        Ok(state.script)
    }

    // A drop+create pair of an object whose definition did not change
    // collapses into a refresh directive when the dialect has one.
    fn find_refreshable(&self, actions: &[Action]) -> HashSet<ObjectId> {
        let dropped: HashSet<&ObjectId> = actions
            .iter()
            .filter(|a| a.kind == ActionKind::Drop)
            .map(|a| &a.id)
            .collect();
        actions
            .iter()
            .filter(|a| a.kind == ActionKind::Create && dropped.contains(&a.id))
            .filter_map(|a| {
                let old_stmt = self.old.get(&a.id)?;
                let new_stmt = self.new.get(&a.id)?;
                if old_stmt.same_def(new_stmt) && self.dialect.refresh_sql(new_stmt).is_some() {
                    Some(a.id.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    fn emit_create(&self, action: &Action, state: &mut AssemblyState) {
        let Some(stmt) = self.new.get(&action.id) else {
            warn!(object = %action.id, "create action without a new statement, skipping");
            return;
        };

        if state.refreshable.contains(&action.id) {
            state.pending_refresh.retain(|id| id != &action.id);
            if let Some(sql) = self.dialect.refresh_sql(stmt) {
                state.script.add_statement(sql);
            }
            return;
        }

        state.script.add_statement(self.dialect.create_sql(stmt));
        if let Some(sql) = self.dialect.comment_sql(stmt) {
            state.script.add_statement(sql);
        }
        if let ObjectDef::Sequence(def) = stmt.def() {
            if let Some(sql) = self.dialect.sequence_owned_by_sql(stmt, def) {
                state.deferred_ownership.push(sql);
            }
        }
        if let Some(temp) = state.renamed.remove(&action.id) {
            self.emit_data_copy(stmt, &temp, &mut state.script);
        }
    }

    fn emit_drop(&self, action: &Action, state: &mut AssemblyState) {
        let Some(stmt) = self.old.get(&action.id) else {
            warn!(object = %action.id, "drop action without an old statement, skipping");
            return;
        };

        if state.refreshable.contains(&action.id) {
            state.pending_refresh.push(action.id.clone());
            return;
        }

        if self.settings.data_movement_mode && is_plain_table(stmt) {
            let temp = format!("{}{}", stmt.bare_name(), TMP_SUFFIX);
            state
                .script
                .add_statement(self.dialect.rename_table_sql(stmt, &temp));
            state.renamed.insert(action.id.clone(), temp);
            return;
        }

        state.script.add_statement(self.dialect.drop_sql(stmt));
    }

    fn emit_alter(&self, action: &Action, state: &mut AssemblyState) {
        let (Some(old_stmt), Some(new_stmt)) = (self.old.get(&action.id), self.new.get(&action.id))
        else {
            warn!(object = %action.id, "alter action without both statements, skipping");
            return;
        };

        match self.dialect.alter_decision(old_stmt, new_stmt) {
            AlterDecision::InPlace(stmts) => {
                for sql in stmts {
                    state.script.add_statement(sql);
                }
            }
            AlterDecision::Unchanged | AlterDecision::Recreate => {
                debug!(object = %action.id, "alter action carries no in-place statements");
            }
        }

        if let (ObjectDef::Sequence(old_def), ObjectDef::Sequence(new_def)) =
            (old_stmt.def(), new_stmt.def())
        {
            if old_def.owned_by != new_def.owned_by {
                if let Some(sql) = self.dialect.sequence_owned_by_sql(new_stmt, new_def) {
                    state.deferred_ownership.push(sql);
                }
            }
        }
    }

    // After the replacement table exists: copy the overlapping,
    // non-generated columns back, drop the renamed original, and
    // reseed when an identity column participated.
    fn emit_data_copy(&self, new_stmt: &Statement, temp: &str, script: &mut Script) {
        let old_columns: HashSet<&str> = self
            .old
            .get(new_stmt.id())
            .map(|old_stmt| {
                column_defs(old_stmt)
                    .filter(|(_, def)| def.generated.is_none())
                    .map(|(name, _)| name)
                    .collect()
            })
            .unwrap_or_default();

        let copied: Vec<String> = column_defs(new_stmt)
            .filter(|(name, def)| def.generated.is_none() && old_columns.contains(name))
            .map(|(name, _)| name.to_string())
            .collect();

        if !copied.is_empty() {
            script.add_statement(self.dialect.insert_select_sql(new_stmt, temp, &copied));
        }
        script.add_statement(
            self.dialect
                .drop_temp_table_sql(new_stmt.name().schema.as_deref(), temp),
        );

        let identity = column_defs(new_stmt)
            .find(|(name, def)| def.identity && copied.iter().any(|c| c == name))
            .map(|(name, _)| name);
        if let Some(column) = identity {
            if let Some(sql) = self.dialect.reseed_sql(new_stmt, column) {
                script.add_statement(sql);
            }
        }
    }
}

fn column_defs(stmt: &Statement) -> impl Iterator<Item = (&str, &sqldelta_model::def::ColumnDef)> {
    stmt.children().iter().filter_map(|child| match child.def() {
        ObjectDef::Column(def) => Some((child.bare_name(), def)),
        _ => None,
    })
}

fn is_plain_table(stmt: &Statement) -> bool {
    matches!(stmt.def(), ObjectDef::Table(def) if def.partition_of.is_none())
}

fn action_word(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Create => "CREATE",
        ActionKind::Alter => "ALTER",
        ActionKind::Drop => "DROP",
    }
}

fn hidden_marker(action: &Action) -> String {
    format!(
        "-- HIDDEN: {} {} {}",
        action_word(action.kind),
        action.id.kind,
        action.id.name,
    )
}

// Annotates actions that exist only because another object pulled
// them in. Starters that are columns of the same object are noise and
// stay silent.
fn depcy_comment(action: &Action) -> Option<String> {
    let starter = action.starter.as_ref()?;
    if starter == &action.id {
        return None;
    }
    if starter.kind == ObjectKind::Column && starter.name.is_sub_object_of(&action.id.name) {
        return None;
    }
    if action.id.kind == ObjectKind::Column && action.id.name.is_sub_object_of(&starter.name) {
        return None;
    }
    match action.kind {
        ActionKind::Create | ActionKind::Alter => Some(format!(
            "-- DEPCY: {} {} is a dependency of {} {}",
            action.id.kind, action.id.name, starter.kind, starter.name,
        )),
        ActionKind::Drop => Some(format!(
            "-- DEPCY: {} {} depends on {} {}",
            action.id.kind, action.id.name, starter.kind, starter.name,
        )),
    }
}
