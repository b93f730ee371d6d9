//! Schema diff, dependency resolution, and DDL script generation.
//!
//! `sqldelta-engine` compares two fully loaded schema snapshots and
//! produces a syntactically ordered, dependency-safe DDL script that
//! transforms the old schema into the new one. The pipeline is a
//! one-way flow of pure, synchronous steps:
//!
//! - **[`graph::DepGraph`]**: directed dependency graph over one
//!   snapshot (structural, declared, and inferred edges);
//! - **[`difftree::DiffTree`]**: both snapshots paired into
//!   old-only / new-only / both comparison nodes;
//! - **[`resolver::Resolver`]**: ordered CREATE/ALTER/DROP actions
//!   with explicit cycle breaking;
//! - **[`assembler::Assembler`]**: final statement text with
//!   filters, dependency comments, deferred sequence ownership, and
//!   optional data-preserving table rewrites.
//!
//! Parsing, loading, and writing the result anywhere are the caller's
//! concern; snapshots must be complete before the pipeline starts,
//! and a snapshot is treated as frozen once a graph was built from
//! it.
//!
//! # Example
//!
//! ```
//! use sqldelta_engine::prelude::*;
//! use sqldelta_model::prelude::*;
//!
//! let old = Snapshot::new().with(Statement::schema("public").child(
//!     Statement::table("public", "t", TableDef::new())
//!         .child(Statement::column("public", "t", "id", ColumnDef::new("integer"))),
//! ));
//! let new = Snapshot::new().with(Statement::schema("public").child(
//!     Statement::table("public", "t", TableDef::new())
//!         .child(Statement::column("public", "t", "id", ColumnDef::new("integer")))
//!         .child(Statement::column("public", "t", "name", ColumnDef::new("text"))),
//! ));
//!
//! let script = diff_snapshots(&old, &new, &Settings::new(), &IgnoreList::new()).unwrap();
//! let sql = script.to_sql(DialectKind::Postgres.dialect());
//! assert!(sql.contains("ALTER TABLE \"public\".\"t\" ADD COLUMN \"name\" text;"));
//! ```

pub mod assembler;
pub mod cancel;
pub mod dialect;
pub mod difftree;
pub mod error;
pub mod graph;
pub mod ignore;
pub mod resolver;
pub mod script;
pub mod settings;

use std::collections::HashSet;

use sqldelta_model::{ObjectId, Snapshot};

use crate::assembler::Assembler;
use crate::cancel::CancellationToken;
use crate::difftree::{DiffTree, FlattenOptions};
use crate::error::Result;
use crate::graph::DepGraph;
use crate::ignore::IgnoreList;
use crate::resolver::Resolver;
use crate::script::Script;
use crate::settings::Settings;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::assembler::Assembler;
    pub use crate::cancel::CancellationToken;
    pub use crate::dialect::{AlterDecision, Dialect};
    pub use crate::difftree::{DiffSide, DiffTree, FlatElement, FlattenOptions};
    pub use crate::error::{EngineError, Result};
    pub use crate::graph::DepGraph;
    pub use crate::ignore::{IgnoreList, IgnoreRule};
    pub use crate::resolver::{Action, ActionKind, Resolver};
    pub use crate::script::{Script, ScriptEntry};
    pub use crate::settings::{DialectKind, Settings};
    pub use crate::{diff_snapshots, diff_snapshots_cancellable};
}

/// Runs the whole pipeline with every diff node selected.
///
/// # Errors
///
/// Propagates the fatal conditions of the resolver and assembler;
/// see [`error::EngineError`].
pub fn diff_snapshots(
    old: &Snapshot,
    new: &Snapshot,
    settings: &Settings,
    ignore: &IgnoreList,
) -> Result<Script> {
    diff_snapshots_cancellable(old, new, settings, ignore, &CancellationToken::new())
}

/// [`diff_snapshots`] with a caller-owned cancellation token. No
/// partial script is returned on cancellation.
///
/// # Errors
///
/// Propagates the fatal conditions of the resolver and assembler,
/// plus [`error::EngineError::Cancelled`].
pub fn diff_snapshots_cancellable(
    old: &Snapshot,
    new: &Snapshot,
    settings: &Settings,
    ignore: &IgnoreList,
    token: &CancellationToken,
) -> Result<Script> {
    let old_graph = DepGraph::build(old);
    let new_graph = DepGraph::build(new);

    let mut tree = DiffTree::build(old, new);
    tree.set_all_selected();
    let elements = tree.flatten(&FlattenOptions {
        ignore: Some(ignore),
        ..FlattenOptions::default()
    });
    let selection: HashSet<ObjectId> = elements.iter().map(|e| e.id.clone()).collect();

    let dialect = settings.dialect.dialect();
    let resolver = Resolver::new(old_graph, new_graph);
    let actions = resolver.resolve(&elements, dialect, token)?;

    let assembler = Assembler::new(old, new, settings, dialect);
    let mut script = assembler.assemble(&actions, &selection, token)?;
    if settings.add_transaction_wrapper {
        script.wrap_transaction(dialect);
    }
    Ok(script)
}
