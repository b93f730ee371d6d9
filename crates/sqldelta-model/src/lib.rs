//! Schema object model for the sqldelta diff engine.
//!
//! This crate holds the in-memory representation of one schema
//! version: qualified names and identities, per-kind definitions, the
//! statement tree, and [`Snapshot`]s. It is pure data: rendering DDL
//! and diffing live in `sqldelta-engine`, and parsing/loading are
//! upstream collaborators that produce these types.
//!
//! Snapshots arrive fully loaded and dependency-annotated: every
//! statement's declared reference set is final before the engine sees
//! it. Tests and embedders construct snapshots through the builder
//! API:
//!
//! ```
//! use sqldelta_model::prelude::*;
//!
//! let snapshot = Snapshot::new().with(
//!     Statement::schema("public").child(
//!         Statement::table("public", "users", TableDef::new())
//!             .child(Statement::column(
//!                 "public",
//!                 "users",
//!                 "id",
//!                 ColumnDef::new("bigint").identity(),
//!             )),
//!     ),
//! );
//! assert_eq!(snapshot.len(), 3);
//! ```

pub mod def;
pub mod kind;
pub mod name;
pub mod snapshot;
pub mod statement;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::def::{
        ColumnDef, ConstraintDef, FkAction, FunctionDef, IndexDef, ObjectDef, PolicyDef, RoleDef,
        SchemaDef, SequenceDef, TableDef, TriggerDef, ViewDef,
    };
    pub use crate::kind::ObjectKind;
    pub use crate::name::{ObjectId, QualifiedName};
    pub use crate::snapshot::Snapshot;
    pub use crate::statement::Statement;
}

pub use def::ObjectDef;
pub use kind::ObjectKind;
pub use name::{ObjectId, QualifiedName};
pub use snapshot::Snapshot;
pub use statement::Statement;
