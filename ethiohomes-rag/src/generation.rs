//! Generation provider trait for turning a prompt into text.

use async_trait::async_trait;

use crate::error::Result;

/// A language model that completes a single prompt.
///
/// Failures are ordinary [`RagError`](crate::RagError) values; the
/// [`AnswerComposer`](crate::AnswerComposer) turns them into a degraded answer
/// instead of propagating them.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Complete `prompt` and return the generated text.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Name of the generation model, used in logs.
    fn model_name(&self) -> &str;
}
