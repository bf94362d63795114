//! Resilient client for the upstream generation API.
//!
//! Keep the public surface small and predictable. Implementation details
//! are split into submodules under `src/client/`.

pub mod core;
mod policy;
pub mod wire;

pub use core::{CallStats, CancelHandle, GenerationClient, RawResponse};
pub use wire::{ChatCompletion, ChatMessage, ChatRequest, MessageRole};
