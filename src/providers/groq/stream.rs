use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use super::models::GroqStreamChunk;
use crate::providers::types::StreamEvent;

/// Parse an SSE chat-completion stream into `StreamEvent`s. Generic over the
/// byte source so the framing logic can be driven without a live connection.
pub async fn parse_sse_stream<S, E>(mut stream: S, tx: mpsc::Sender<StreamEvent>)
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut byte_buf: Vec<u8> = Vec::new();
    let mut buffer = String::new();

    while let Some(chunk_result) = stream.next().await {
        let bytes = match chunk_result {
            Ok(b) => b,
            Err(e) => {
                let _ = tx
                    .send(StreamEvent::Error(format!("Stream error: {}", e)))
                    .await;
                return;
            }
        };

        byte_buf.extend_from_slice(&bytes);

        // Decode as much valid UTF-8 as possible from the byte buffer
        let decoded = match std::str::from_utf8(&byte_buf) {
            Ok(s) => {
                let decoded = s.to_string();
                byte_buf.clear();
                decoded
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                if valid_up_to == 0 {
                    continue;
                }
                let decoded = std::str::from_utf8(&byte_buf[..valid_up_to])
                    .unwrap()
                    .to_string();
                byte_buf.drain(..valid_up_to);
                decoded
            }
        };

        // Normalize CRLF to LF
        let chunk = decoded.replace("\r\n", "\n");
        buffer.push_str(&chunk);

        // Process complete SSE events (delimited by double newline)
        while let Some(event_end) = buffer.find("\n\n") {
            let event_text = buffer[..event_end].to_string();
            buffer.drain(..event_end + 2);

            for line in event_text.lines() {
                let payload = if let Some(p) = line.strip_prefix("data: ") {
                    p
                } else if let Some(p) = line.strip_prefix("data:") {
                    p
                } else {
                    continue;
                };

                // End of stream is signalled with [DONE]
                if payload.trim() == "[DONE]" {
                    let _ = tx.send(StreamEvent::Done).await;
                    return;
                }

                match serde_json::from_str::<GroqStreamChunk>(payload) {
                    Ok(chunk) => {
                        if let Some(choice) = chunk.choices.first() {
                            if let Some(content) = &choice.delta.content {
                                if !content.is_empty()
                                    && tx.send(StreamEvent::Token(content.clone())).await.is_err()
                                {
                                    return; // receiver dropped
                                }
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse SSE data: {}", e);
                    }
                }
            }
        }
    }

    // If the stream ended without a [DONE] signal, send Done anyway
    let _ = tx.send(StreamEvent::Done).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn delta(content: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":{}}},\"finish_reason\":null}}]}}\n\n",
            serde_json::to_string(content).unwrap()
        )
    }

    async fn collect(parts: Vec<Result<Bytes, String>>) -> Vec<StreamEvent> {
        let (tx, mut rx) = mpsc::channel(64);
        parse_sse_stream(stream::iter(parts), tx).await;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn tokens(events: &[StreamEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Token(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn parses_tokens_and_done() {
        let body = format!("{}{}data: [DONE]\n\n", delta("Hello"), delta(" there"));
        let events = collect(vec![Ok(Bytes::from(body))]).await;
        assert_eq!(tokens(&events), "Hello there");
        assert!(matches!(events.last(), Some(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn reassembles_events_split_across_chunks() {
        let body = format!("{}data: [DONE]\n\n", delta("fragmented"));
        let mid = body.len() / 2;
        let events = collect(vec![
            Ok(Bytes::copy_from_slice(&body.as_bytes()[..mid])),
            Ok(Bytes::copy_from_slice(&body.as_bytes()[mid..])),
        ])
        .await;
        assert_eq!(tokens(&events), "fragmented");
    }

    #[tokio::test]
    async fn handles_utf8_split_across_chunks() {
        let body = format!("{}data: [DONE]\n\n", delta("caf\u{e9}"));
        let bytes = body.as_bytes();
        // Split inside the two-byte encoding of é
        let split = body.find('\u{e9}').unwrap() + 1;
        let events = collect(vec![
            Ok(Bytes::copy_from_slice(&bytes[..split])),
            Ok(Bytes::copy_from_slice(&bytes[split..])),
        ])
        .await;
        assert_eq!(tokens(&events), "caf\u{e9}");
    }

    #[tokio::test]
    async fn normalizes_crlf_framing() {
        let body = delta("ok").replace("\n\n", "\r\n\r\n") + "data: [DONE]\r\n\r\n";
        let events = collect(vec![Ok(Bytes::from(body))]).await;
        assert_eq!(tokens(&events), "ok");
        assert!(matches!(events.last(), Some(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn transport_error_yields_error_event() {
        let events = collect(vec![
            Ok(Bytes::from(delta("partial"))),
            Err("connection reset".to_string()),
        ])
        .await;
        assert_eq!(tokens(&events), "partial");
        assert!(matches!(events.last(), Some(StreamEvent::Error(_))));
    }

    #[tokio::test]
    async fn stream_end_without_done_still_completes() {
        let events = collect(vec![Ok(Bytes::from(delta("tail")))]).await;
        assert_eq!(tokens(&events), "tail");
        assert!(matches!(events.last(), Some(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn malformed_event_is_skipped() {
        let body = format!("data: {{not json}}\n\n{}data: [DONE]\n\n", delta("after"));
        let events = collect(vec![Ok(Bytes::from(body))]).await;
        assert_eq!(tokens(&events), "after");
    }
}
