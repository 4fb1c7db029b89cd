//! Intent resolution - matches policy and device references to live records

use crate::assistant::normalize::normalize;
use crate::model::{Client, CustomCommand, Policy};
use crate::ui::state::UiState;

/// How a device reference was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMatchReason {
    Name,
    Alias,
    Mac,
}

/// How a policy reference was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyMatchReason {
    Name,
    Id,
}

/// A matched device with the reason it matched
#[derive(Debug, Clone)]
pub struct DeviceMatch<'a> {
    pub client: &'a Client,
    pub match_reason: DeviceMatchReason,
}

/// A matched policy with the reason it matched
#[derive(Debug, Clone)]
pub struct PolicyMatch<'a> {
    pub policy: &'a Policy,
    pub match_reason: PolicyMatchReason,
}

/// Resolves references from an intent against a state snapshot
///
/// Comparison is done on normalized text, so case and diacritics never
/// matter. When several records match, the first in list order wins.
pub struct IntentResolver<'a> {
    state: &'a UiState,
}

impl<'a> IntentResolver<'a> {
    pub fn new(state: &'a UiState) -> Self {
        Self { state }
    }

    /// Find a client by name, alias, or exact MAC
    pub fn resolve_device(&self, raw_name: &str) -> Option<DeviceMatch<'a>> {
        let wanted = normalize(raw_name);
        let raw_mac = raw_name.trim();

        self.state.clients.iter().find_map(|client| {
            let match_reason = if !wanted.is_empty() && normalize(&client.name) == wanted {
                DeviceMatchReason::Name
            } else if !wanted.is_empty()
                && client.alias.as_deref().is_some_and(|a| normalize(a) == wanted)
            {
                DeviceMatchReason::Alias
            } else if client.mac.eq_ignore_ascii_case(raw_mac) {
                DeviceMatchReason::Mac
            } else {
                return None;
            };
            Some(DeviceMatch {
                client,
                match_reason,
            })
        })
    }

    /// Find a policy by name or exact id
    pub fn resolve_policy(&self, raw_name: &str) -> Option<PolicyMatch<'a>> {
        let wanted = normalize(raw_name);
        let raw_id = raw_name.trim();

        self.state.policies.iter().find_map(|policy| {
            let match_reason = if !wanted.is_empty() && normalize(&policy.name) == wanted {
                PolicyMatchReason::Name
            } else if policy.id.to_lowercase() == raw_id.to_lowercase() {
                PolicyMatchReason::Id
            } else {
                return None;
            };
            Some(PolicyMatch {
                policy,
                match_reason,
            })
        })
    }

    /// Enabled custom command whose phrase matches the input
    pub fn resolve_custom_phrase(&self, input: &str) -> Option<&'a CustomCommand> {
        let wanted = normalize(input);
        if wanted.is_empty() {
            return None;
        }
        self.state
            .custom_commands
            .iter()
            .find(|c| c.enabled_for_assistant && normalize(&c.phrase) == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AssistantActionType;

    fn state() -> UiState {
        UiState {
            policies: vec![
                Policy::new("vpn", "WireGuard"),
                Policy::new("office", "Office"),
            ],
            clients: vec![
                Client::new("c1", "Ноутбук", "AA:BB:CC:00:11:22"),
                Client::new("c2", "Телефон", "AA:BB:CC:00:11:23").with_alias("Мобильный"),
                Client::new("c3", "ноутбук", "AA:BB:CC:00:11:24"),
            ],
            ..UiState::default()
        }
    }

    #[test]
    fn test_resolve_device_by_name_case_insensitive() {
        let state = state();
        let resolver = IntentResolver::new(&state);
        let found = resolver.resolve_device("НОУТБУК").unwrap();
        // first in list order wins
        assert_eq!(found.client.id, "c1");
        assert_eq!(found.match_reason, DeviceMatchReason::Name);
    }

    #[test]
    fn test_resolve_device_by_alias() {
        let state = state();
        let resolver = IntentResolver::new(&state);
        let found = resolver.resolve_device("мобильный").unwrap();
        assert_eq!(found.client.id, "c2");
        assert_eq!(found.match_reason, DeviceMatchReason::Alias);
    }

    #[test]
    fn test_resolve_device_by_mac() {
        let state = state();
        let resolver = IntentResolver::new(&state);
        let found = resolver.resolve_device(" aa:bb:cc:00:11:23 ").unwrap();
        assert_eq!(found.client.id, "c2");
        assert_eq!(found.match_reason, DeviceMatchReason::Mac);
    }

    #[test]
    fn test_resolve_policy_by_name_or_id() {
        let state = state();
        let resolver = IntentResolver::new(&state);
        let by_name = resolver.resolve_policy("wireguard").unwrap();
        assert_eq!(by_name.policy.id, "vpn");
        assert_eq!(by_name.match_reason, PolicyMatchReason::Name);
        let by_id = resolver.resolve_policy("VPN").unwrap();
        assert_eq!(by_id.policy.id, "vpn");
        assert_eq!(by_id.match_reason, PolicyMatchReason::Id);
        assert!(resolver.resolve_policy("unknown").is_none());
    }

    #[test]
    fn test_blank_reference_matches_nothing() {
        let state = state();
        let resolver = IntentResolver::new(&state);
        assert!(resolver.resolve_device("  ").is_none());
        assert!(resolver.resolve_policy("").is_none());
    }

    #[test]
    fn test_resolve_custom_phrase_skips_disabled() {
        let mut state = state();
        state.custom_commands = vec![
            CustomCommand {
                id: "k1".into(),
                ..CustomCommand::new("Всем офис", AssistantActionType::ApplyToAll)
                    .with_policy("office")
                    .disabled()
            },
            CustomCommand {
                id: "k2".into(),
                ..CustomCommand::new("всем офис!", AssistantActionType::ApplyToAll)
                    .with_policy("office")
            },
        ];
        let resolver = IntentResolver::new(&state);
        assert_eq!(resolver.resolve_custom_phrase("ВСЕМ ОФИС").unwrap().id, "k2");
        assert!(resolver.resolve_custom_phrase("офис").is_none());
    }
}
