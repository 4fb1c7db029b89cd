//! UI module - screen state, its container and the view-model driving it

pub mod container;
pub mod events;
pub mod state;
pub mod validation;
pub mod view_model;

pub use container::StateContainer;
pub use events::{HapticType, UiEvent};
pub use state::{AssistantBanner, ConnectionStatus, DragState, UiState};
pub use view_model::{PolicySwitcher, Settlement};
