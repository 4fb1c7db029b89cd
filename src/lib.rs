//! Policy Switcher - router access-policy assignment with an assistant

pub mod assistant;
pub mod command;
pub mod core;
pub mod model;
pub mod store;
pub mod ui;
