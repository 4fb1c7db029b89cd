//! Domain records shared by the store, the assistant and the view-model

pub mod credentials;
pub mod custom_command;
pub mod router;

pub use credentials::{CredentialField, Credentials};
pub use custom_command::{AssistantActionType, CustomCommand};
pub use router::{Client, NewClient, Policy};
