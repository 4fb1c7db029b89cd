//! One-shot feedback events emitted alongside state changes

/// Tactile feedback kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticType {
    Apply,
    Remove,
}

/// Transient notification for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Toast { message: String, is_error: bool },
    Haptic(HapticType),
}

impl UiEvent {
    pub fn toast(message: impl Into<String>) -> Self {
        UiEvent::Toast {
            message: message.into(),
            is_error: false,
        }
    }

    pub fn error_toast(message: impl Into<String>) -> Self {
        UiEvent::Toast {
            message: message.into(),
            is_error: true,
        }
    }
}
