//! Project registry types.

use serde::{Deserialize, Serialize};

/// A registered project. Read-only to this subsystem; fetched per request by
/// id from the project registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Stable project identifier carried by telemetry submissions.
    pub id: String,
    /// Project slug, doubling as the authorized origin pattern: a literal
    /// hostname, `*.suffix`, or the wildcard `*`.
    pub slug: String,
    /// Human-readable display name.
    pub name: String,
}
