// =============================================================================
// Narrative generation — comparison prompt + hosted model call
// =============================================================================

pub mod huggingface;
pub mod prompt;

use async_trait::async_trait;

use crate::error::NarrativeServiceError;

pub use huggingface::HuggingFaceClient;
pub use prompt::{build_comparison_prompt, DISCLAIMER};

/// Turns a prompt into markdown text.
///
/// `credential` is the caller's inference token for this request; `None`
/// (or blank) fails with [`NarrativeServiceError::MissingCredential`].
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Model identifier reported alongside the narrative.
    fn model(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        credential: Option<&str>,
    ) -> Result<String, NarrativeServiceError>;
}
