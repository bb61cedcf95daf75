//! Client domain model
//!
//! Represents a polling worker client (typically a browser) that executes runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered worker client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Unique identifier for the client
    pub id: String,

    /// Human readable name
    pub name: String,

    /// Platform (user-agent signature) this client executes runs for
    pub platform_id: String,

    /// When this client was first registered
    pub registered_at: DateTime<Utc>,

    /// Last time this client was seen polling or heartbeating
    pub last_seen_at: DateTime<Utc>,
}
