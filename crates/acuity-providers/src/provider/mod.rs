//! Provider trait.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::models::{CompletionRequest, RawOutput};

/// Core trait that all inference providers implement.
///
/// A provider executes one completion call and returns whatever shape of
/// output the backing service produced. It imposes no timeout or
/// cancellation policy; that belongs to the caller.
#[async_trait]
pub trait Provider: Send + Sync {
    /// The provider's unique identifier.
    fn id(&self) -> &str;

    /// Execute a completion request.
    async fn complete(&self, request: &CompletionRequest) -> Result<RawOutput, ProviderError>;
}
