//! Drives a streaming completion request and exposes the reply as a pull-based
//! sequence of text fragments. All remote faults are contained here: the
//! consumer sees either the model's tokens or exactly one fallback fragment.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::providers::{ChatRequest, CompletionProvider, StreamEvent};

/// The entire user-visible response when the completion service fails.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error.";

pub struct ResponseStreamer {
    provider: Arc<dyn CompletionProvider>,
}

impl ResponseStreamer {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Issue the request and return the fragment sequence. Single-pass and
    /// not restartable; dropping the receiver abandons the stream and the
    /// underlying connection is released when the provider task unwinds.
    pub fn stream(&self, request: ChatRequest) -> mpsc::Receiver<String> {
        let (frag_tx, frag_rx) = mpsc::channel::<String>(64);
        let provider = Arc::clone(&self.provider);

        tokio::spawn(async move {
            let (tx, mut rx) = mpsc::channel::<StreamEvent>(64);

            let _request_task = tokio::spawn(async move {
                if let Err(e) = provider.stream_chat(request, tx.clone()).await {
                    let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                }
            });

            let mut finished = false;
            while let Some(event) = rx.recv().await {
                match event {
                    StreamEvent::Token(token) => {
                        if frag_tx.send(token).await.is_err() {
                            return; // consumer stopped pulling
                        }
                    }
                    StreamEvent::Done => {
                        finished = true;
                        break;
                    }
                    StreamEvent::Error(error) => {
                        tracing::error!("Completion stream failed: {}", error);
                        let _ = frag_tx.send(FALLBACK_REPLY.to_string()).await;
                        finished = true;
                        break;
                    }
                }
            }

            // Event channel closed without a terminal event
            if !finished {
                tracing::warn!("Completion stream ended unexpectedly");
                let _ = frag_tx.send(FALLBACK_REPLY.to_string()).await;
            }
        });

        frag_rx
    }
}
