//! Root view state: one immutable snapshot drives the whole screen

use crate::core::types::{ClientId, PolicyId, Timestamp};
use crate::model::{Client, CredentialField, Credentials, CustomCommand, Policy};
use ahash::AHashSet;
use std::collections::BTreeMap;

/// Router connection lifecycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No credentials yet
    #[default]
    NotSet,
    /// Credentials are being verified against the router
    Validating,
    /// Connected; holds the time of the last successful check
    Ready(Timestamp),
    /// Verification failed
    Error(String),
}

impl ConnectionStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectionStatus::Ready(_))
    }
}

/// Where a dragged client card currently hovers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    DraggingOverApply,
    DraggingOverRemove,
    DraggingOverPolicy(PolicyId),
}

/// Dismissible feedback for commands issued through the assistant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantBanner {
    pub message: String,
    pub is_error: bool,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub credentials: Credentials,
    pub credential_errors: BTreeMap<CredentialField, String>,
    pub connection_status: ConnectionStatus,
    pub creds_panel_expanded: bool,
    pub last_successful_url: Option<String>,
    /// Completion time of the last successful fetch
    pub last_synced: Option<Timestamp>,
    pub policies: Vec<Policy>,
    pub clients: Vec<Client>,
    /// `None` shows the grid of all policies
    pub focused_policy_id: Option<PolicyId>,
    pub drag_state: DragState,
    pub is_refreshing: bool,
    pub search_query: String,
    pub assistant_banner: Option<AssistantBanner>,
    pub custom_commands: Vec<CustomCommand>,
    /// Clients with a single-client store call outstanding
    pub operations_in_flight: AHashSet<ClientId>,
    pub bulk_operation_in_progress: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            credential_errors: BTreeMap::new(),
            connection_status: ConnectionStatus::NotSet,
            creds_panel_expanded: true,
            last_successful_url: None,
            last_synced: None,
            policies: Vec::new(),
            clients: Vec::new(),
            focused_policy_id: None,
            drag_state: DragState::Idle,
            is_refreshing: false,
            search_query: String::new(),
            assistant_banner: None,
            custom_commands: Vec::new(),
            operations_in_flight: AHashSet::default(),
            bulk_operation_in_progress: false,
        }
    }
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy(&self, policy_id: &str) -> Option<&Policy> {
        self.policies.iter().find(|p| p.id == policy_id)
    }

    pub fn client(&self, client_id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == client_id)
    }

    pub fn focused_policy(&self) -> Option<&Policy> {
        self.focused_policy_id
            .as_deref()
            .and_then(|id| self.policy(id))
    }

    /// Display name for a policy id; dangling ids render as themselves
    pub fn policy_name<'a>(&'a self, policy_id: &'a str) -> &'a str {
        self.policy(policy_id)
            .map(|p| p.name.as_str())
            .unwrap_or(policy_id)
    }

    /// Controls for this client should be disabled
    pub fn is_busy(&self, client_id: &str) -> bool {
        self.bulk_operation_in_progress || self.operations_in_flight.contains(client_id)
    }

    /// Search-filtered clients split into (holding focused policy, the rest)
    ///
    /// With no focused policy every filtered client lands in the first list.
    pub fn clients_for_focused_policy(&self) -> (Vec<&Client>, Vec<&Client>) {
        let filtered = self.filtered_clients();
        match self.focused_policy_id.as_deref() {
            None => (filtered, Vec::new()),
            Some(focused) => filtered
                .into_iter()
                .partition(|c| c.policy_id.as_deref() == Some(focused)),
        }
    }

    /// Clients matching the current search query
    pub fn filtered_clients(&self) -> Vec<&Client> {
        let query = self.search_query.trim().to_lowercase();
        if query.is_empty() {
            return self.clients.iter().collect();
        }
        self.clients
            .iter()
            .filter(|c| c.matches_query(&query))
            .collect()
    }

    /// Swap in a client by id; unknown ids are ignored
    pub(crate) fn replace_client(&mut self, client: Client) {
        if let Some(slot) = self.clients.iter_mut().find(|c| c.id == client.id) {
            *slot = client;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> UiState {
        UiState {
            policies: vec![Policy::new("office", "Office"), Policy::new("kids", "Kids")],
            clients: vec![
                Client::new("c1", "Ноутбук Макс", "AA:BB:CC:DD:EE:01").with_policy("office"),
                Client::new("c2", "Планшет", "AA:BB:CC:DD:EE:02"),
                Client::new("c3", "Smart TV", "AA:BB:CC:DD:EE:03")
                    .with_policy("office")
                    .with_ip("192.168.10.40"),
            ],
            ..UiState::default()
        }
    }

    #[test]
    fn test_default_state() {
        let state = UiState::new();
        assert_eq!(state.connection_status, ConnectionStatus::NotSet);
        assert!(state.creds_panel_expanded);
        assert!(state.operations_in_flight.is_empty());
        assert_eq!(state.drag_state, DragState::Idle);
    }

    #[test]
    fn test_grid_view_lists_all_clients() {
        let state = sample_state();
        let (assigned, others) = state.clients_for_focused_policy();
        assert_eq!(assigned.len(), 3);
        assert!(others.is_empty());
    }

    #[test]
    fn test_focused_policy_partitions_clients() {
        let mut state = sample_state();
        state.focused_policy_id = Some("office".into());

        let (assigned, others) = state.clients_for_focused_policy();
        let assigned: Vec<_> = assigned.iter().map(|c| c.id.as_str()).collect();
        let others: Vec<_> = others.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(assigned, vec!["c1", "c3"]);
        assert_eq!(others, vec!["c2"]);
        assert_eq!(state.focused_policy().map(|p| p.name.as_str()), Some("Office"));
    }

    #[test]
    fn test_search_applies_before_partition() {
        let mut state = sample_state();
        state.focused_policy_id = Some("office".into());
        state.search_query = "  10.40 ".into();

        let (assigned, others) = state.clients_for_focused_policy();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].id, "c3");
        assert!(others.is_empty());
    }

    #[test]
    fn test_dangling_policy_renders_raw_id() {
        let state = sample_state();
        assert_eq!(state.policy_name("kids"), "Kids");
        assert_eq!(state.policy_name("removed"), "removed");
    }

    #[test]
    fn test_is_busy() {
        let mut state = sample_state();
        assert!(!state.is_busy("c1"));
        state.operations_in_flight.insert("c1".into());
        assert!(state.is_busy("c1"));
        assert!(!state.is_busy("c2"));
        state.bulk_operation_in_progress = true;
        assert!(state.is_busy("c2"));
    }
}
