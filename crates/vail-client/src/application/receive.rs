//! Receive pipeline: relay frames in, receive tone out.
//!
//! # Per-frame steps (for beginners)
//!
//! 1. **Filter** – only binary frames carrying at least a full event header
//!    are protocol events.  Everything else is ignored.
//! 2. **Peer count** – every decoded event updates the shared peer count.
//! 3. **Echo cancellation** – a single-duration event that matches an entry
//!    of our sent history (same duration, timestamps less than 200 ms apart)
//!    is the relay echoing our own keying.  It is dropped.
//! 4. **Calibration** – the first event that survives step 3 is used only
//!    to fix the clock offset between relay timestamps and the local clock.
//! 5. **Heartbeat** – an event without durations only carries the peer count.
//! 6. **Playback** – anything else is played after the jitter buffer delay,
//!    as alternating tone on / tone off periods starting with "on".
//!
//! Frames are processed strictly in arrival order: the next frame is not
//! read until the current playback has finished.
//!
//! A frame's arrival time is taken when its first byte is available, not
//! when its payload has been read in full.  An event whose timestamp cannot
//! be placed on the local clock is ignored like a malformed one.

use std::rc::Rc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::{sleep, sleep_until};
use tracing::{debug, info, trace, warn};
use vail_core::protocol::messages::EVENT_HEADER_SIZE;
use vail_core::{
    decode_event, playback_wait_ms, read_frame, ClockOffset, Frame, FrameError, InboundKind,
    Opcode,
};

use super::hardware::Hardware;
use super::session::{LocalClock, Session};

/// Why the receive loop ended.  Every variant is fatal to the session.
#[derive(Debug, Error)]
pub enum ReceiveError {
    #[error("relay closed the connection")]
    Closed,
    #[error("failed to read frame: {0}")]
    Frame(#[source] FrameError),
}

/// What the pipeline decided to do with one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Not a protocol event, or a malformed one.
    Ignored,
    /// Our own transmission echoed back.
    Echo,
    /// Consumed to establish the clock offset.
    Calibrated { offset: i64 },
    /// Peer count update only.
    Heartbeat,
    /// Play `durations` after waiting `wait_ms` (zero or less: immediately).
    Playback { wait_ms: i64, durations: Vec<u16> },
}

/// Receive pipeline state for one session.
pub struct Receiver<H: Hardware> {
    hw: Rc<H>,
    session: Rc<Session>,
    clock: LocalClock,
    offset: ClockOffset,
    jitter_ms: u64,
}

impl<H: Hardware> Receiver<H> {
    pub fn new(hw: Rc<H>, session: Rc<Session>, clock: LocalClock, jitter_ms: u64) -> Self {
        Self {
            hw,
            session,
            clock,
            offset: ClockOffset::new(),
            jitter_ms,
        }
    }

    /// The clock offset, once calibrated.
    pub fn offset(&self) -> Option<i64> {
        self.offset.get()
    }

    /// Reads and handles frames until the stream fails or closes.
    pub async fn run<R>(&mut self, reader: &mut R) -> ReceiveError
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            match reader.fill_buf().await {
                Ok([]) => return ReceiveError::Closed,
                Ok(_) => {}
                Err(e) => return ReceiveError::Frame(FrameError::Io(e)),
            }
            let arrival_ms = self.clock.now_ms();

            let frame = match read_frame(reader).await {
                Ok(frame) => frame,
                Err(FrameError::Closed) => return ReceiveError::Closed,
                Err(e) => return ReceiveError::Frame(e),
            };
            if frame.opcode == Opcode::Close {
                info!("relay sent close frame");
                return ReceiveError::Closed;
            }

            if let Disposition::Playback { wait_ms, durations } = self.classify(&frame, arrival_ms)
            {
                if wait_ms > 0 {
                    sleep_until(self.clock.instant_at(arrival_ms + wait_ms as u64)).await;
                }
                self.play(&durations).await;
            }
        }
    }

    /// Applies steps 1 to 6 to a frame that arrived at local time `arrival_ms`.
    ///
    /// Updates the peer count, the sent history and the clock offset, but
    /// never touches the tone.
    pub fn classify(&mut self, frame: &Frame, arrival_ms: u64) -> Disposition {
        if frame.opcode != Opcode::Binary || frame.payload.len() < EVENT_HEADER_SIZE {
            trace!(opcode = ?frame.opcode, len = frame.payload.len(), "non-event frame ignored");
            return Disposition::Ignored;
        }
        let event = match decode_event(&frame.payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "malformed event skipped");
                return Disposition::Ignored;
            }
        };

        self.session.set_peer_count(event.peer_count);

        if let InboundKind::Single(duration) = event.kind() {
            if self.session.take_echo(event.timestamp_ms, duration) {
                debug!(ts = event.timestamp_ms, duration, "own echo discarded");
                return Disposition::Echo;
            }
        }

        match self.offset.calibrate(arrival_ms as i64, event.timestamp_ms) {
            Ok(Some(offset)) => {
                info!(offset_ms = offset, "clock offset calibrated");
                return Disposition::Calibrated { offset };
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "event skipped");
                return Disposition::Ignored;
            }
        }
        // calibrate() leaves an offset in place from here on.
        let offset = self.offset.get().unwrap_or_default();

        if event.durations.is_empty() {
            debug!(peers = event.peer_count, "heartbeat");
            return Disposition::Heartbeat;
        }

        let wait_ms =
            match playback_wait_ms(event.timestamp_ms, offset, self.jitter_ms, arrival_ms as i64) {
                Ok(wait_ms) => wait_ms,
                Err(e) => {
                    warn!(error = %e, "event skipped");
                    return Disposition::Ignored;
                }
            };
        info!(
            ts = event.timestamp_ms,
            elements = event.durations.len(),
            wait_ms,
            "playback scheduled"
        );
        Disposition::Playback {
            wait_ms,
            durations: event.durations,
        }
    }

    /// Plays `durations` as tone on, off, on, ...
    ///
    /// The tone is off when this returns, and also when the future is
    /// dropped part-way through.
    pub async fn play(&self, durations: &[u16]) {
        let _off = RxToneGuard(&*self.hw);
        for (i, &duration) in durations.iter().enumerate() {
            self.hw.rx_tone(i % 2 == 0);
            sleep(Duration::from_millis(u64::from(duration))).await;
        }
    }
}

/// Turns the receive tone off when dropped.
struct RxToneGuard<'a, H: Hardware>(&'a H);

impl<H: Hardware> Drop for RxToneGuard<'_, H> {
    fn drop(&mut self) {
        self.0.rx_tone(false);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::hardware::MockHardware;
    use mockall::Sequence;
    use vail_core::protocol::frame::LengthForm;

    fn event_frame(ts: u64, peers: u16, durations: &[u16]) -> Frame {
        let mut payload = ts.to_be_bytes().to_vec();
        payload.extend_from_slice(&peers.to_be_bytes());
        for d in durations {
            payload.extend_from_slice(&d.to_be_bytes());
        }
        Frame {
            fin: true,
            opcode: Opcode::Binary,
            length_form: LengthForm::Short,
            payload,
        }
    }

    fn receiver(session: Rc<Session>) -> Receiver<MockHardware> {
        Receiver::new(
            Rc::new(MockHardware::new()),
            session,
            LocalClock::start(),
            4_000,
        )
    }

    #[tokio::test]
    async fn test_first_heartbeat_calibrates_offset() {
        let mut rx = receiver(Rc::new(Session::new()));

        let got = rx.classify(&event_frame(10_000, 2, &[]), 10_100);

        assert_eq!(got, Disposition::Calibrated { offset: 100 });
        assert_eq!(rx.offset(), Some(100));
    }

    #[tokio::test]
    async fn test_second_heartbeat_keeps_offset() {
        // Arrange
        let mut rx = receiver(Rc::new(Session::new()));
        rx.classify(&event_frame(10_000, 2, &[]), 10_100);

        // Act
        let got = rx.classify(&event_frame(20_000, 2, &[]), 29_999);

        // Assert
        assert_eq!(got, Disposition::Heartbeat);
        assert_eq!(rx.offset(), Some(100));
    }

    #[tokio::test]
    async fn test_first_usable_frame_is_not_played() {
        let mut rx = receiver(Rc::new(Session::new()));

        let got = rx.classify(&event_frame(10_000, 2, &[60, 60, 180]), 10_100);

        assert_eq!(got, Disposition::Calibrated { offset: 100 });
    }

    #[tokio::test]
    async fn test_jitter_buffer_wait() {
        // Arrange: offset 100, jitter 4000.
        let mut rx = receiver(Rc::new(Session::new()));
        rx.classify(&event_frame(0, 2, &[]), 100);

        // Act
        let got = rx.classify(&event_frame(10_000, 2, &[48]), 10_050);

        // Assert
        assert_eq!(
            got,
            Disposition::Playback {
                wait_ms: 4_050,
                durations: vec![48]
            }
        );
    }

    #[tokio::test]
    async fn test_echo_inside_window_is_discarded() {
        // Arrange
        let session = Rc::new(Session::new());
        session.record_sent(1_000, 50);
        let mut rx = receiver(Rc::clone(&session));
        rx.classify(&event_frame(0, 2, &[]), 0);

        // Act
        let got = rx.classify(&event_frame(1_050, 2, &[50]), 1_100);

        // Assert
        assert_eq!(got, Disposition::Echo);
        assert!(session.sent_history().is_empty());
    }

    #[tokio::test]
    async fn test_event_outside_echo_window_is_played() {
        let session = Rc::new(Session::new());
        session.record_sent(1_000, 50);
        let mut rx = receiver(Rc::clone(&session));
        rx.classify(&event_frame(0, 2, &[]), 0);

        let got = rx.classify(&event_frame(1_300, 2, &[50]), 1_300);

        assert!(matches!(got, Disposition::Playback { .. }));
        assert_eq!(session.sent_history().len(), 1);
    }

    #[tokio::test]
    async fn test_echo_is_checked_before_calibration() {
        // An echo arriving before any heartbeat must not calibrate the clock.
        let session = Rc::new(Session::new());
        session.record_sent(5_000, 48);
        let mut rx = receiver(Rc::clone(&session));

        let got = rx.classify(&event_frame(5_010, 1, &[48]), 9_000);

        assert_eq!(got, Disposition::Echo);
        assert_eq!(rx.offset(), None);
    }

    #[tokio::test]
    async fn test_every_event_updates_peer_count() {
        let session = Rc::new(Session::new());
        let mut rx = receiver(Rc::clone(&session));

        rx.classify(&event_frame(0, 4, &[]), 0);
        assert_eq!(session.peer_count(), 4);

        rx.classify(&event_frame(10, 3, &[]), 10);
        assert_eq!(session.peer_count(), 3);
    }

    #[tokio::test]
    async fn test_short_and_non_binary_frames_are_ignored() {
        // Arrange
        let session = Rc::new(Session::new());
        let mut rx = receiver(Rc::clone(&session));
        let mut short = event_frame(0, 9, &[]);
        short.payload.truncate(9);
        let mut text = event_frame(0, 9, &[]);
        text.opcode = Opcode::Text;

        // Act / Assert
        assert_eq!(rx.classify(&short, 0), Disposition::Ignored);
        assert_eq!(rx.classify(&text, 0), Disposition::Ignored);
        assert_eq!(session.peer_count(), 0);
        assert_eq!(rx.offset(), None);
    }

    #[tokio::test]
    async fn test_odd_trailing_byte_is_ignored() {
        let mut rx = receiver(Rc::new(Session::new()));
        let mut frame = event_frame(0, 2, &[48]);
        frame.payload.push(0xFF);

        assert_eq!(rx.classify(&frame, 0), Disposition::Ignored);
    }

    #[tokio::test]
    async fn test_top_bit_timestamp_is_ignored_before_calibration() {
        let mut rx = receiver(Rc::new(Session::new()));

        let got = rx.classify(&event_frame(1u64 << 63, 2, &[]), 10);

        assert_eq!(got, Disposition::Ignored);
        assert_eq!(rx.offset(), None);
    }

    #[tokio::test]
    async fn test_top_bit_timestamp_is_ignored_after_calibration() {
        // Arrange
        let mut rx = receiver(Rc::new(Session::new()));
        rx.classify(&event_frame(1_700_000_000_000, 2, &[]), 10);

        // Act
        let got = rx.classify(&event_frame(1u64 << 63, 2, &[50]), 20);

        // Assert
        assert_eq!(got, Disposition::Ignored);
        assert_eq!(rx.offset(), Some(10 - 1_700_000_000_000));
    }

    #[tokio::test]
    async fn test_far_future_event_wait_is_capped() {
        // Arrange: offset 0, then an event stamped a day ahead.
        let mut rx = receiver(Rc::new(Session::new()));
        rx.classify(&event_frame(0, 2, &[]), 0);

        // Act
        let got = rx.classify(&event_frame(86_400_000, 2, &[48]), 0);

        // Assert
        assert_eq!(
            got,
            Disposition::Playback {
                wait_ms: 4_000 + vail_core::domain::clock::MAX_PLAYBACK_LEAD_MS as i64,
                durations: vec![48]
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_alternates_and_ends_off() {
        // Arrange
        let mut hw = MockHardware::new();
        let mut seq = Sequence::new();
        for on in [true, false, true, false] {
            hw.expect_rx_tone()
                .withf(move |v| *v == on)
                .times(1)
                .in_sequence(&mut seq)
                .return_const(());
        }
        let rx = Receiver::new(
            Rc::new(hw),
            Rc::new(Session::new()),
            LocalClock::start(),
            4_000,
        );

        // Act
        rx.play(&[60, 60, 180]).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_interrupted_turns_tone_off() {
        // Arrange
        let mut hw = MockHardware::new();
        let mut seq = Sequence::new();
        hw.expect_rx_tone()
            .withf(|v| *v)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        hw.expect_rx_tone()
            .withf(|v| !*v)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        let rx = Receiver::new(
            Rc::new(hw),
            Rc::new(Session::new()),
            LocalClock::start(),
            4_000,
        );

        // Act: cancel half-way through the first tone.
        let result = tokio::time::timeout(Duration::from_millis(30), rx.play(&[60, 60, 180])).await;

        // Assert
        assert!(result.is_err());
    }
}
