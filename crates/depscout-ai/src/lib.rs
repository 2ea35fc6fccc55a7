// ABOUTME: Model client abstraction for tool-using conversations
// ABOUTME: Exposes the ModelClient trait and an OpenAI-compatible Chat Completions provider

pub mod llm_provider;
pub mod openai_compatible_provider;

pub use llm_provider::*;
pub use openai_compatible_provider::*;
