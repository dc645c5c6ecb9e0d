use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{ChatRequest, CompletionError, StreamEvent};

/// The remote completion service, reduced to its single streaming operation.
/// Implementations push incremental events into `tx` in arrival order and
/// finish with `Done` (or `Error`); a dropped receiver abandons the stream.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), CompletionError>;
}
