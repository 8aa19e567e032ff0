//! Domain models shared across the migration components.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// A row of the `avatars` table.
///
/// `path` is the object key of the avatar image, prefix included
/// (e.g. `legacy/avatars/42.png`). The leading prefix decides which
/// store the record points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarRecord {
    pub id: i64,
    pub path: String,
}

impl AvatarRecord {
    pub fn new(id: i64, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }
}

/// The two stores an avatar object can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Legacy,
    Production,
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Location::Legacy => write!(f, "legacy"),
            Location::Production => write!(f, "production"),
        }
    }
}

/// Terminal state of a single record migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The object lives in the production store and the record points at it.
    Moved,
    /// The record already pointed at the production store; nothing was done.
    AlreadyConsistent,
    /// The record was skipped; the reason is carried for the run summary.
    Failed(String),
}
