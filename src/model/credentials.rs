//! Router login credentials and the form fields they are edited through

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub domain_or_ip: String,
    pub username: String,
    pub password: String,
    pub default_policy_id: String,
}

impl Credentials {
    pub fn new(
        domain_or_ip: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            domain_or_ip: domain_or_ip.into(),
            username: username.into(),
            password: password.into(),
            default_policy_id: String::new(),
        }
    }

    pub fn with_default_policy(mut self, policy_id: impl Into<String>) -> Self {
        self.default_policy_id = policy_id.into();
        self
    }

    /// Address, login and password are all filled in
    pub fn is_complete(&self) -> bool {
        !self.domain_or_ip.trim().is_empty()
            && !self.username.trim().is_empty()
            && !self.password.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CredentialField {
    Domain,
    Username,
    Password,
    DefaultPolicy,
}
