//! Text generation backends.

use std::future::Future;

use anyhow::Result;

pub mod gemini;
pub mod shared;

pub use gemini::{GeminiClient, GeminiConfig};
pub use shared::{ProviderError, ProviderErrorKind};

/// A backend that turns one prompt into one complete reply.
///
/// Implementations return the full text at once; there is no partial
/// delivery. Failures are reported as `anyhow` errors, usually wrapping a
/// [`ProviderError`].
pub trait GenerationProvider: Send + Sync {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

impl<P: GenerationProvider> GenerationProvider for std::sync::Arc<P> {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send {
        (**self).generate(prompt)
    }
}
