//! LLM provider implementations

use async_trait::async_trait;

pub mod gemini;

// Re-export for convenience
pub use gemini::GeminiClient;

/// A hosted model API that turns a prompt into text.
///
/// Implementations must be safe to share between concurrent
/// requests; the relay holds one behind an `Arc` for the whole
/// process lifetime.
#[async_trait]
pub trait TextProvider: Send + Sync
{   /// Generate a completion of `prompt` with the named model
    async fn generate(
      &self
    , model: &str
    , prompt: &str
    ) -> Result<String, crate::error::Error>;

    /// Model identifiers this provider can serve
    async fn list_models(&self)
      -> Result<Vec<String>, crate::error::Error>;

    /// Short provider name for logs
    fn name(&self) -> &str;
}
