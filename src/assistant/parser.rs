//! Parse assistant phrases into structured intents
//!
//! Patterns are tried in order against the normalized input and the first
//! full match wins. Captured names are only trimmed here; matching them
//! against policies and devices happens during resolution.

use crate::assistant::normalize::normalize;
use crate::model::AssistantActionType;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// A recognized assistant request with unresolved references
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantIntent {
    /// "включи политику P на D"
    ApplyToDevice {
        policy_name: String,
        device_name: String,
    },
    /// "отключи политику P на D"
    RemoveFromDevice {
        policy_name: Option<String>,
        device_name: String,
    },
    /// "включи всем политику P"
    ApplyToAll { policy_name: String },
    /// "отключи всем политику P" / "выключи всем политику P"
    RemoveFromAll { policy_name: String },
}

impl AssistantIntent {
    pub fn action_type(&self) -> AssistantActionType {
        match self {
            AssistantIntent::ApplyToDevice { .. } => AssistantActionType::ApplyToDevice,
            AssistantIntent::RemoveFromDevice { .. } => AssistantActionType::RemoveFromDevice,
            AssistantIntent::ApplyToAll { .. } => AssistantActionType::ApplyToAll,
            AssistantIntent::RemoveFromAll { .. } => AssistantActionType::RemoveFromAll,
        }
    }
}

type IntentBuilder = fn(&Captures) -> AssistantIntent;

struct IntentPattern {
    regex: Regex,
    build: IntentBuilder,
}

fn group(caps: &Captures, index: usize) -> String {
    caps.get(index)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn patterns() -> &'static [IntentPattern] {
    static PATTERNS: OnceLock<Vec<IntentPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let table: [(&str, IntentBuilder); 4] = [
            (r"^включи политику (.+) на (.+)$", |caps| {
                AssistantIntent::ApplyToDevice {
                    policy_name: group(caps, 1),
                    device_name: group(caps, 2),
                }
            }),
            (r"^отключи политику (.+) на (.+)$", |caps| {
                AssistantIntent::RemoveFromDevice {
                    policy_name: Some(group(caps, 1)),
                    device_name: group(caps, 2),
                }
            }),
            (r"^включи всем политику (.+)$", |caps| {
                AssistantIntent::ApplyToAll {
                    policy_name: group(caps, 1),
                }
            }),
            (r"^(?:отключи|выключи) всем политику (.+)$", |caps| {
                AssistantIntent::RemoveFromAll {
                    policy_name: group(caps, 1),
                }
            }),
        ];

        table
            .into_iter()
            .map(|(pattern, build)| IntentPattern {
                regex: Regex::new(pattern).expect("assistant pattern must compile"),
                build,
            })
            .collect()
    })
}

/// Parse a free-text command into an intent, or `None` when nothing matches
pub fn parse_command(command: &str) -> Option<AssistantIntent> {
    let normalized = normalize(command);
    if normalized.is_empty() {
        return None;
    }

    let intent = patterns().iter().find_map(|pattern| {
        pattern
            .regex
            .captures(&normalized)
            .map(|caps| (pattern.build)(&caps))
    });

    if intent.is_none() {
        tracing::debug!("No assistant pattern matched '{}'", normalized);
    }

    intent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_apply_to_device() {
        let intent = parse_command("Включи политику WireGuard на ноутбук").unwrap();
        assert_eq!(
            intent,
            AssistantIntent::ApplyToDevice {
                policy_name: "wireguard".into(),
                device_name: "ноутбук".into(),
            }
        );
        assert_eq!(intent.action_type(), AssistantActionType::ApplyToDevice);
    }

    #[test]
    fn test_parse_remove_from_device() {
        let intent = parse_command("Отключи политику Kids на Смартфон Ани").unwrap();
        assert_eq!(
            intent,
            AssistantIntent::RemoveFromDevice {
                policy_name: Some("kids".into()),
                device_name: "смартфон ани".into(),
            }
        );
    }

    #[test]
    fn test_parse_apply_to_all() {
        let intent = parse_command("включи всем политику Office").unwrap();
        assert_eq!(
            intent,
            AssistantIntent::ApplyToAll {
                policy_name: "office".into()
            }
        );
    }

    #[test]
    fn test_parse_remove_from_all_both_verbs() {
        for phrase in ["Отключи всем политику Guest", "выключи всем политику guest"] {
            let intent = parse_command(phrase).unwrap();
            assert_eq!(
                intent,
                AssistantIntent::RemoveFromAll {
                    policy_name: "guest".into()
                }
            );
        }
    }

    #[test]
    fn test_punctuation_ignored() {
        let intent = parse_command("Включи, политику «Office» на: Smart-TV!").unwrap();
        assert_eq!(
            intent,
            AssistantIntent::ApplyToDevice {
                policy_name: "office".into(),
                device_name: "smart tv".into(),
            }
        );
    }

    #[test]
    fn test_apply_pattern_takes_precedence_over_all() {
        // "всем" after "политику" is a policy name, not the bulk form
        let intent = parse_command("включи политику всем на ноутбук").unwrap();
        assert_eq!(intent.action_type(), AssistantActionType::ApplyToDevice);
    }

    #[test]
    fn test_unrecognized() {
        assert!(parse_command("какая погода").is_none());
        assert!(parse_command("включи политику").is_none());
        assert!(parse_command("").is_none());
        assert!(parse_command("   ").is_none());
    }

    #[test]
    fn test_partial_phrase_does_not_match() {
        assert!(parse_command("пожалуйста включи политику office на tv").is_none());
    }
}
