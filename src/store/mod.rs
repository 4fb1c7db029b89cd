//! Backing stores the view-model depends on
//!
//! The view-model only sees these traits. The in-memory router fake and the
//! credential stores here are the implementations shipped with the crate; a
//! real router client can replace [`FakeRouterStore`] without touching the
//! view-model.

pub mod credentials;
pub mod fake;

pub use credentials::{FileCredentialStore, InMemoryCredentialStore};
pub use fake::FakeRouterStore;

use crate::core::error::Result;
use crate::model::{Client, Credentials, NewClient, Policy};
use async_trait::async_trait;

/// Router operations used by the policy screen
#[async_trait]
pub trait RouterStore: Send + Sync {
    /// Check credentials; returns the normalized router URL
    async fn verify_connection(&self, credentials: &Credentials) -> Result<String>;

    async fn fetch_policies(&self) -> Result<Vec<Policy>>;

    async fn fetch_clients(&self) -> Result<Vec<Client>>;

    async fn apply_policy_to_client(&self, client_id: &str, policy_id: &str) -> Result<Client>;

    async fn clear_policy_for_client(&self, client_id: &str) -> Result<Client>;

    /// Returns the full client list after the change
    async fn apply_policy_to_all(&self, policy_id: &str) -> Result<Vec<Client>>;

    /// `None` clears every client; returns the full client list
    async fn clear_policy_from_all(&self, policy_id: Option<&str>) -> Result<Vec<Client>>;

    async fn register_client(&self, request: NewClient) -> Result<Client>;
}

/// Key-value persistence for router credentials
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<Credentials>>;

    async fn save(&self, credentials: &Credentials) -> Result<()>;

    async fn save_last_successful_url(&self, url: &str) -> Result<()>;

    async fn load_last_successful_url(&self) -> Result<Option<String>>;
}
