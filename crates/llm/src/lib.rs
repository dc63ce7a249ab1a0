//! Text-completion collaborator interface.
//!
//! Actions that want a model-written summary go through
//! [`CompletionProvider`]. Providers are expected to fail now and then;
//! every caller carries a deterministic local fallback.

pub mod provider;
pub mod providers;

pub use provider::{CompletionProvider, LlmError};
pub use providers::claude::ClaudeProvider;
pub use providers::ollama::OllamaProvider;
