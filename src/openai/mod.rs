//! AI gateway integration: hosted vector stores and transient assistant runs.

pub mod client;
pub mod types;

pub use client::OpenAiService;
pub use types::{AssistantRunOutcome, OpenAiError};
