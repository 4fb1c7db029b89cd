//! Core type definitions used throughout the codebase

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identifier of a LAN client as reported by the router
pub type ClientId = String;

/// Identifier of a router access policy
pub type PolicyId = String;

/// Wall-clock instant (UTC)
pub type Timestamp = DateTime<Utc>;

/// Generate a fresh unique identifier for locally created records
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
