//! Command execution - turns intents into concrete commands or user errors

use crate::assistant::parser::AssistantIntent;
use crate::command::resolver::IntentResolver;
use crate::core::types::Timestamp;
use crate::model::{AssistantActionType, Client, CustomCommand, Policy};
use crate::ui::state::{AssistantBanner, UiState};

/// A fully resolved assistant command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantCommand {
    pub action_type: AssistantActionType,
    pub client: Option<Client>,
    pub policy: Option<Policy>,
    /// Anything the resolver chose to ignore
    pub notes: Vec<String>,
}

/// Result of executing an intent against a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantExecution {
    Command(AssistantCommand),
    Error { reason: String },
}

impl AssistantExecution {
    fn error(reason: String) -> Self {
        AssistantExecution::Error { reason }
    }
}

fn device_not_found(name: &str) -> String {
    format!("Устройство \"{}\" не найдено", name)
}

fn policy_not_found(name: &str) -> String {
    format!("Политика \"{}\" не найдена", name)
}

/// Executes assistant intents against the current state
pub struct CommandExecutor;

impl CommandExecutor {
    /// Resolve an intent into a command, or a reason it cannot run
    ///
    /// For device-scoped intents the device is resolved before the policy,
    /// so a missing device is reported even when the policy is missing too.
    pub fn execute(intent: &AssistantIntent, state: &UiState) -> AssistantExecution {
        let resolver = IntentResolver::new(state);

        match intent {
            AssistantIntent::ApplyToDevice {
                policy_name,
                device_name,
            } => {
                let Some(device) = resolver.resolve_device(device_name) else {
                    return AssistantExecution::error(device_not_found(device_name));
                };
                let Some(policy) = resolver.resolve_policy(policy_name) else {
                    return AssistantExecution::error(policy_not_found(policy_name));
                };
                AssistantExecution::Command(AssistantCommand {
                    action_type: AssistantActionType::ApplyToDevice,
                    client: Some(device.client.clone()),
                    policy: Some(policy.policy.clone()),
                    notes: Vec::new(),
                })
            }

            AssistantIntent::RemoveFromDevice {
                policy_name,
                device_name,
            } => {
                let Some(device) = resolver.resolve_device(device_name) else {
                    return AssistantExecution::error(device_not_found(device_name));
                };
                let mut notes = Vec::new();
                let policy = policy_name.as_deref().and_then(|name| {
                    let resolved = resolver.resolve_policy(name);
                    if resolved.is_none() {
                        notes.push(policy_not_found(name));
                    }
                    resolved.map(|m| m.policy.clone())
                });
                AssistantExecution::Command(AssistantCommand {
                    action_type: AssistantActionType::RemoveFromDevice,
                    client: Some(device.client.clone()),
                    policy,
                    notes,
                })
            }

            AssistantIntent::ApplyToAll { policy_name }
            | AssistantIntent::RemoveFromAll { policy_name } => {
                let Some(policy) = resolver.resolve_policy(policy_name) else {
                    return AssistantExecution::error(policy_not_found(policy_name));
                };
                AssistantExecution::Command(AssistantCommand {
                    action_type: intent.action_type(),
                    client: None,
                    policy: Some(policy.policy.clone()),
                    notes: Vec::new(),
                })
            }
        }
    }

    /// Resolve a custom command by its stored ids
    pub fn execute_custom(command: &CustomCommand, state: &UiState) -> AssistantExecution {
        let client = match command.device_id.as_deref() {
            Some(id) => match state.client(id) {
                Some(client) => Some(client.clone()),
                None => return AssistantExecution::error(device_not_found(id)),
            },
            None => None,
        };
        let policy = match command.policy_id.as_deref() {
            Some(id) => match state.policy(id) {
                Some(policy) => Some(policy.clone()),
                None => return AssistantExecution::error(policy_not_found(id)),
            },
            None => None,
        };

        let complete = match command.action_type {
            AssistantActionType::ApplyToDevice => client.is_some() && policy.is_some(),
            AssistantActionType::RemoveFromDevice => client.is_some(),
            AssistantActionType::ApplyToAll => policy.is_some(),
            // no policy clears every device
            AssistantActionType::RemoveFromAll => true,
        };
        if !complete {
            return AssistantExecution::error(format!(
                "Команда \"{}\" не настроена",
                command.phrase
            ));
        }

        AssistantExecution::Command(AssistantCommand {
            action_type: command.action_type,
            client,
            policy,
            notes: Vec::new(),
        })
    }

    pub fn banner_for_result(success: bool, message: String, now: Timestamp) -> AssistantBanner {
        AssistantBanner {
            message,
            is_error: !success,
            timestamp: now,
        }
    }
}
