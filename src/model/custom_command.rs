//! User-defined assistant phrases and their JSON interchange format

use crate::core::error::Result;
use crate::core::types::{ClientId, PolicyId};
use serde::{Deserialize, Serialize};

/// What an assistant command does to router state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssistantActionType {
    /// Assign a policy to one device
    ApplyToDevice,
    /// Clear the policy of one device
    RemoveFromDevice,
    /// Assign a policy to every device
    ApplyToAll,
    /// Clear a policy from every device holding it
    RemoveFromAll,
}

/// A trigger phrase bound to a fixed action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CustomCommand {
    pub id: String,
    pub phrase: String,
    pub action_type: AssistantActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<PolicyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<ClientId>,
    #[serde(default = "enabled_by_default")]
    pub enabled_for_assistant: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl CustomCommand {
    pub fn new(phrase: impl Into<String>, action_type: AssistantActionType) -> Self {
        Self {
            id: String::new(),
            phrase: phrase.into(),
            action_type,
            policy_id: None,
            device_id: None,
            enabled_for_assistant: true,
        }
    }

    pub fn with_policy(mut self, policy_id: impl Into<String>) -> Self {
        self.policy_id = Some(policy_id.into());
        self
    }

    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled_for_assistant = false;
        self
    }
}

/// Serialize commands as a pretty-printed JSON array
pub fn export_commands(commands: &[CustomCommand]) -> Result<String> {
    Ok(serde_json::to_string_pretty(commands)?)
}

/// Decode a JSON array of commands; any malformed record fails the whole batch
pub fn import_commands(json: &str) -> Result<Vec<CustomCommand>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_serialization() {
        let json = serde_json::to_string(&AssistantActionType::RemoveFromAll).unwrap();
        assert_eq!(json, "\"REMOVE_FROM_ALL\"");
    }

    #[test]
    fn test_field_names_are_camel_case() {
        let command = CustomCommand {
            id: "k1".into(),
            ..CustomCommand::new("детский режим", AssistantActionType::ApplyToDevice)
                .with_policy("kids")
                .with_device("c4")
        };
        let json = export_commands(&[command]).unwrap();
        assert!(json.contains("\"actionType\": \"APPLY_TO_DEVICE\""));
        assert!(json.contains("\"policyId\": \"kids\""));
        assert!(json.contains("\"deviceId\": \"c4\""));
        assert!(json.contains("\"enabledForAssistant\": true"));
    }

    #[test]
    fn test_import_applies_defaults() {
        let json = r#"[{"id": "k1", "phrase": "всё офис", "actionType": "APPLY_TO_ALL", "policyId": "office"}]"#;
        let commands = import_commands(json).unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].device_id, None);
        assert!(commands[0].enabled_for_assistant);
    }

    #[test]
    fn test_import_rejects_unknown_action() {
        let json = r#"[{"id": "k1", "phrase": "x", "actionType": "REBOOT"}]"#;
        assert!(import_commands(json).is_err());
    }

    #[test]
    fn test_import_rejects_non_array() {
        assert!(import_commands(r#"{"id": "k1"}"#).is_err());
        assert!(import_commands("not json").is_err());
    }
}
