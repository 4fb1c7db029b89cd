//! Command execution pipeline
//!
//! Converts assistant intents into resolved commands:
//! AssistantIntent -> IntentResolver -> CommandExecutor -> AssistantExecution

pub mod executor;
pub mod resolver;

pub use executor::{AssistantCommand, AssistantExecution, CommandExecutor};
pub use resolver::{
    DeviceMatch, DeviceMatchReason, IntentResolver, PolicyMatch, PolicyMatchReason,
};
