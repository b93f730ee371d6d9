//! Qualified object names and identities.
//!
//! Every schema object is addressed by a [`QualifiedName`] (schema,
//! owning container, bare name) and classified by an [`ObjectKind`].
//! The pair of the two is an [`ObjectId`], the snapshot-independent
//! identity used to match objects across the old and new snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kind::ObjectKind;

/// A possibly schema- and container-qualified object name.
///
/// `container` is the owning table or view for sub-objects such as
/// columns, constraints, indexes, triggers, and policies; it is `None`
/// for top-level objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Schema (or database, for dialects without schemas).
    pub schema: Option<String>,
    /// Owning table/view for sub-objects.
    pub container: Option<String>,
    /// The object's own name.
    pub name: String,
}

impl QualifiedName {
    /// A bare, unqualified name (schemas, roles).
    #[must_use]
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            container: None,
            name: name.into(),
        }
    }

    /// A schema-qualified name (tables, views, functions, sequences).
    #[must_use]
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            container: None,
            name: name.into(),
        }
    }

    /// A sub-object name (columns, constraints, indexes, triggers).
    #[must_use]
    pub fn sub(
        schema: impl Into<String>,
        container: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            schema: Some(schema.into()),
            container: Some(container.into()),
            name: name.into(),
        }
    }

    /// The qualified name of the owning container, if this is a
    /// sub-object name.
    #[must_use]
    pub fn container_name(&self) -> Option<QualifiedName> {
        self.container.as_ref().map(|c| QualifiedName {
            schema: self.schema.clone(),
            container: None,
            name: c.clone(),
        })
    }

    /// Returns true if `self` names a sub-object of `other`.
    #[must_use]
    pub fn is_sub_object_of(&self, other: &QualifiedName) -> bool {
        self.container_name().as_ref() == Some(other)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref schema) = self.schema {
            write!(f, "{}.", schema)?;
        }
        if let Some(ref container) = self.container {
            write!(f, "{}.", container)?;
        }
        write!(f, "{}", self.name)
    }
}

/// Snapshot-independent identity of a schema object.
///
/// Two statements describe the same object iff their ids are equal.
/// The derived `Ord` (kind rank, then name) is the deterministic
/// comparator used throughout the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    /// Object kind.
    pub kind: ObjectKind,
    /// Qualified name.
    pub name: QualifiedName,
}

impl ObjectId {
    /// Creates a new identity.
    #[must_use]
    pub fn new(kind: ObjectKind, name: QualifiedName) -> Self {
        Self { kind, name }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}
