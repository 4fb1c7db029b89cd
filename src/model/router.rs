//! Router-side records: access policies and LAN clients

use crate::core::types::{ClientId, PolicyId};
use serde::{Deserialize, Serialize};

/// A named network-access profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Policy {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A LAN device known to the router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    /// Upper-case, colon separated
    pub mac: String,
    pub ip: Option<String>,
    /// `None` means the router default applies
    pub policy_id: Option<PolicyId>,
    pub registered: bool,
    pub alias: Option<String>,
    pub notes: Option<String>,
    /// Device uses a randomized (private) MAC address
    pub has_private_mac_warning: bool,
}

impl Client {
    pub fn new(id: impl Into<String>, name: impl Into<String>, mac: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mac: mac.into(),
            ip: None,
            policy_id: None,
            registered: false,
            alias: None,
            notes: None,
            has_private_mac_warning: false,
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_policy(mut self, policy_id: impl Into<String>) -> Self {
        self.policy_id = Some(policy_id.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn registered(mut self) -> Self {
        self.registered = true;
        self
    }

    /// Copy of this client with `policy_id` assigned, which also registers it
    pub fn assigned_to(&self, policy_id: &str) -> Self {
        Self {
            policy_id: Some(policy_id.to_string()),
            registered: true,
            ..self.clone()
        }
    }

    /// Copy of this client with no policy
    pub fn unassigned(&self) -> Self {
        Self {
            policy_id: None,
            ..self.clone()
        }
    }

    /// Case-insensitive substring match over name, MAC, IP and alias
    pub fn matches_query(&self, query: &str) -> bool {
        let contains = |field: &str| field.to_lowercase().contains(query);
        contains(&self.name)
            || contains(&self.mac)
            || self.ip.as_deref().is_some_and(contains)
            || self.alias.as_deref().is_some_and(contains)
    }
}

/// Registration request for a device the router has not seen yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClient {
    pub name: String,
    pub mac: String,
    pub ip: Option<String>,
    pub notes: Option<String>,
}
