//! Conversions between the local monotonic clock and wall-clock time.
//!
//! Two clocks are involved:
//!
//! - **local milliseconds** – a monotonic counter that starts near zero when
//!   the client boots.  All sleeps and arrival times are measured with it.
//! - **epoch milliseconds** – Unix wall-clock time, used on the wire.
//!
//! Outbound timestamps are converted with an [`EpochAnchor`] captured once
//! at startup.  Inbound timestamps are aligned with a [`ClockOffset`] computed
//! once from the first usable frame.  Neither is ever adjusted afterwards, so
//! clock drift over a session is accepted rather than corrected.
//!
//! Remote timestamps are untrusted.  One that does not fit an `i64` cannot be
//! placed on the local clock and is reported as [`TimestampOutOfRange`].

use thiserror::Error;

/// Upper bound on how far past the jitter buffer a playback may be delayed.
///
/// A relay timestamp far in the future would otherwise park the receive
/// pipeline for the rest of the session.
pub const MAX_PLAYBACK_LEAD_MS: u64 = 10_000;

/// A remote timestamp that cannot be represented as signed milliseconds.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("remote timestamp {0} ms is out of range")]
pub struct TimestampOutOfRange(pub u64);

fn signed_ms(remote_ts_ms: u64) -> Result<i64, TimestampOutOfRange> {
    i64::try_from(remote_ts_ms).map_err(|_| TimestampOutOfRange(remote_ts_ms))
}

/// Fixed mapping from local milliseconds to epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochAnchor {
    epoch_ms: u64,
    local_ms: u64,
}

impl EpochAnchor {
    /// Anchors `local_ms` (local clock now) to `epoch_ms` (wall clock now).
    pub fn new(epoch_ms: u64, local_ms: u64) -> Self {
        Self { epoch_ms, local_ms }
    }

    /// Converts a local instant to epoch milliseconds.
    ///
    /// Instants before the anchor are converted by subtraction, saturating at
    /// the epoch itself.
    pub fn to_epoch_ms(&self, local_ms: u64) -> u64 {
        if local_ms >= self.local_ms {
            self.epoch_ms.saturating_add(local_ms - self.local_ms)
        } else {
            self.epoch_ms.saturating_sub(self.local_ms - local_ms)
        }
    }
}

/// Signed difference between the local clock and remote timestamps.
///
/// Assigned once; later calls to [`ClockOffset::calibrate`] are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockOffset {
    value: Option<i64>,
}

impl ClockOffset {
    pub fn new() -> Self {
        Self::default()
    }

    /// The established offset, if any.
    pub fn get(&self) -> Option<i64> {
        self.value
    }

    /// Establishes `offset = local_arrival_ms − remote_ts_ms` if no offset
    /// exists yet.
    ///
    /// Returns the newly assigned offset, or `Ok(None)` if the offset was
    /// already set (in which case it is left unchanged).  An out-of-range
    /// timestamp leaves the offset unassigned.
    pub fn calibrate(
        &mut self,
        local_arrival_ms: i64,
        remote_ts_ms: u64,
    ) -> Result<Option<i64>, TimestampOutOfRange> {
        if self.value.is_some() {
            return Ok(None);
        }
        let offset = local_arrival_ms
            .checked_sub(signed_ms(remote_ts_ms)?)
            .ok_or(TimestampOutOfRange(remote_ts_ms))?;
        self.value = Some(offset);
        Ok(Some(offset))
    }
}

/// How long to wait after arrival before playing an inbound event.
///
/// `target = remote_ts + offset + jitter_ms`, `wait = target − arrival`.
/// A result of zero or less means "play immediately".  The wait never exceeds
/// `jitter_ms + MAX_PLAYBACK_LEAD_MS`.
pub fn playback_wait_ms(
    remote_ts_ms: u64,
    offset: i64,
    jitter_ms: u64,
    arrival_ms: i64,
) -> Result<i64, TimestampOutOfRange> {
    let remote = i128::from(signed_ms(remote_ts_ms)?);
    let wait = remote + i128::from(offset) + i128::from(jitter_ms) - i128::from(arrival_ms);
    let ceiling = i128::from(jitter_ms) + i128::from(MAX_PLAYBACK_LEAD_MS);
    let clamped = wait.clamp(i128::from(i64::MIN), ceiling.min(i128::from(i64::MAX)));
    // In range after the clamp.
    Ok(clamped as i64)
}
