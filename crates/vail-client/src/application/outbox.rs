//! The FIFO between the keyer and the send task.
//!
//! Every element the keyer produces goes through [`Outbox::submit`], which
//! does two things in one step:
//!
//! 1. records `(timestamp, duration)` in the session's sent history, so the
//!    receive pipeline can recognise the relay's echo of it, and
//! 2. pushes an [`OutboundEvent`] onto an unbounded channel drained by the
//!    send task in order.
//!
//! The channel is unbounded because the keyer must never suspend on a full
//! queue: a stalled keyer would stretch the element being keyed.

use std::rc::Rc;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use vail_core::{KeyElement, OutboundEvent};

use super::session::Session;

/// Receiving half of the outbound queue, owned by the send task.
pub type OutboundQueue = mpsc::UnboundedReceiver<OutboundEvent>;

/// Producer handle used by the keyer.
#[derive(Debug, Clone)]
pub struct Outbox {
    session: Rc<Session>,
    tx: mpsc::UnboundedSender<OutboundEvent>,
}

/// Creates the keyer → sender queue bound to `session`'s history.
pub fn channel(session: Rc<Session>) -> (Outbox, OutboundQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Outbox { session, tx }, rx)
}

impl Outbox {
    /// Queues `element` for transmission.
    ///
    /// If the send task is gone the session is already ending; the element is
    /// dropped with a warning instead of failing the keyer.
    pub fn submit(&self, element: KeyElement) {
        self.session
            .record_sent(element.started_at_ms, element.duration_ms);

        let event = OutboundEvent::single(element.started_at_ms, element.duration_ms);
        if self.tx.send(event).is_err() {
            warn!(kind = ?element.kind, "send queue closed; element dropped");
            return;
        }
        debug!(
            kind = ?element.kind,
            duration_ms = element.duration_ms,
            ts = element.started_at_ms,
            "element queued"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vail_core::ElementKind;

    fn dah(ts: u64) -> KeyElement {
        KeyElement {
            kind: ElementKind::Dah,
            duration_ms: 144,
            started_at_ms: ts,
        }
    }

    #[test]
    fn test_submit_records_history_and_queues_in_order() {
        // Arrange
        let session = Rc::new(Session::new());
        let (outbox, mut queue) = channel(Rc::clone(&session));

        // Act
        outbox.submit(dah(1_000));
        outbox.submit(dah(1_200));

        // Assert
        assert_eq!(queue.try_recv().unwrap(), OutboundEvent::single(1_000, 144));
        assert_eq!(queue.try_recv().unwrap(), OutboundEvent::single(1_200, 144));
        assert_eq!(session.sent_history().len(), 2);
    }

    #[test]
    fn test_submit_after_sender_dropped_still_records() {
        let session = Rc::new(Session::new());
        let (outbox, queue) = channel(Rc::clone(&session));
        drop(queue);

        outbox.submit(dah(5));

        assert_eq!(session.sent_history().len(), 1);
    }
}
