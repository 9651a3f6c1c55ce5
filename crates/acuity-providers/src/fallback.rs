//! Structured-output fallback policy.

use tracing::warn;

use crate::error::ProviderError;
use crate::models::{CompletionRequest, RawOutput};
use crate::provider::Provider;

/// Complete a request, preferring structured JSON output.
///
/// The first attempt always asks for structured output. If the provider
/// rejects that request, via the dedicated error or a message matching the
/// rejection vocabulary, the call is retried exactly once with the same
/// messages and structured output disabled. Any other error propagates.
pub async fn complete_with_structured_fallback(
    provider: &dyn Provider,
    request: &CompletionRequest,
) -> Result<RawOutput, ProviderError> {
    let structured = request.clone().with_structured_json(true);
    match provider.complete(&structured).await {
        Ok(output) => Ok(output),
        Err(err) if err.is_structured_output_rejection() => {
            warn!(
                provider = provider.id(),
                error = %err,
                "structured output rejected, retrying without response format"
            );
            let plain = request.clone().with_structured_json(false);
            provider.complete(&plain).await
        }
        Err(err) => Err(err),
    }
}
