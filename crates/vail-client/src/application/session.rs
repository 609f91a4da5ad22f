//! State shared between the cooperative tasks of one relay session.
//!
//! # Why `Rc<Cell/RefCell>` instead of `Arc<Mutex>`? (for beginners)
//!
//! Keyer, send, receive and status tasks all run on one thread inside a
//! `tokio::task::LocalSet`.  They only interleave at `.await` points, so
//! there is never a second thread that could observe a half-finished update.
//! A `RefCell` borrow that starts and ends between two `.await`s is therefore
//! enough; no method here holds a borrow across an `.await`.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use tokio::time::Instant;
use vail_core::{SentEntry, SentHistory};

/// Local monotonic clock in milliseconds since the client started.
///
/// Built on `tokio::time::Instant`, so tests running with paused time see
/// the same virtual clock as the tasks under test.
#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    origin: Instant,
}

impl LocalClock {
    /// Starts the clock at zero now.
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Milliseconds elapsed since [`LocalClock::start`].
    pub fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    /// The instant at which the clock reads `ms`.
    pub fn instant_at(&self, ms: u64) -> Instant {
        self.origin + Duration::from_millis(ms)
    }
}

/// Send/receive state for one relay connection.
#[derive(Debug, Default)]
pub struct Session {
    history: RefCell<SentHistory>,
    peer_count: Cell<u16>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an element handed to the send queue.
    pub fn record_sent(&self, timestamp_ms: u64, duration_ms: u16) {
        self.history.borrow_mut().record(timestamp_ms, duration_ms);
    }

    /// Consumes a matching history entry if the inbound element is our echo.
    pub fn take_echo(&self, timestamp_ms: u64, duration_ms: u16) -> bool {
        self.history.borrow_mut().take_echo(timestamp_ms, duration_ms)
    }

    /// Snapshot of the sent history, oldest first.
    pub fn sent_history(&self) -> Vec<SentEntry> {
        self.history.borrow().iter().copied().collect()
    }

    /// Stations currently connected to the channel, as last reported by the relay.
    pub fn peer_count(&self) -> u16 {
        self.peer_count.get()
    }

    pub fn set_peer_count(&self, peers: u16) {
        self.peer_count.set(peers);
    }
}
