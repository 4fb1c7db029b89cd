//! Assistant command interpretation
//!
//! Free text (typed or dictated) is normalized and matched against a fixed,
//! ordered set of Russian phrase patterns. The result is an
//! [`AssistantIntent`] carrying raw policy/device references; resolving those
//! against live state is the job of [`crate::command`].

pub mod normalize;
pub mod parser;

pub use normalize::normalize;
pub use parser::{parse_command, AssistantIntent};
