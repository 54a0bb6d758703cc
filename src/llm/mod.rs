//! Generative model client.

mod client;

pub use client::{GeminiClient, GeminiConfig, LlmError};
