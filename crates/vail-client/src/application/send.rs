//! Send task: drains the outbound queue onto the relay stream.
//!
//! Events are written strictly one at a time and in queue order.  Each event
//! is encoded, wrapped in a client frame masked with a fresh random key, and
//! flushed before the next event is taken from the queue.

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};
use vail_core::{encode_client_frame, encode_event, FrameError};

use super::outbox::OutboundQueue;

/// Errors that end the send task.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("could not frame event: {0}")]
    Frame(#[from] FrameError),
    #[error("write to relay failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs until the queue is closed (`Ok`) or a write fails (`Err`).
pub async fn run_sender<W>(mut queue: OutboundQueue, writer: &mut W) -> Result<(), SendError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = queue.recv().await {
        let payload = encode_event(&event);
        let frame = encode_client_frame(&payload, rand::random())?;

        writer.write_all(&frame).await?;
        writer.flush().await?;

        debug!(
            ts = event.timestamp_ms,
            durations = ?event.durations,
            bytes = frame.len(),
            "event sent"
        );
    }

    info!("send queue closed; send task finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::application::outbox;
    use crate::application::session::Session;
    use vail_core::{ElementKind, KeyElement};

    #[tokio::test]
    async fn test_sender_exits_cleanly_when_queue_closes() {
        let (outbox, queue) = outbox::channel(Rc::new(Session::new()));
        drop(outbox);
        let mut sink = Vec::new();

        let result = run_sender(queue, &mut sink).await;

        assert!(result.is_ok());
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_sender_writes_one_masked_frame_per_event() {
        // Arrange
        let (outbox, queue) = outbox::channel(Rc::new(Session::new()));
        outbox.submit(KeyElement {
            kind: ElementKind::Dit,
            duration_ms: 48,
            started_at_ms: 1_000,
        });
        drop(outbox);
        let mut sink = Vec::new();

        // Act
        run_sender(queue, &mut sink).await.unwrap();

        // Assert: 2 header bytes + 4 mask bytes + 12 payload bytes.
        assert_eq!(sink.len(), 18);
        assert_eq!(sink[0], 0x82);
        assert_eq!(sink[1], 0x80 | 12);
    }
}
