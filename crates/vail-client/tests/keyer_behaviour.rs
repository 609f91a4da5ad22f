//! Keyer timing tests driven by scripted paddles on paused tokio time.
//!
//! Every test starts the local clock and the keyer at the same virtual
//! instant, so the keyer polls at exactly 0, 5, 10, ... ms and the expected
//! tone edges can be written down by hand.

use std::rc::Rc;
use std::time::Duration;

use vail_client::application::hardware::Hardware;
use vail_client::application::keyer::{IambicMode, Keyer, KeyerMode};
use vail_client::application::outbox::{self, OutboundQueue};
use vail_client::application::session::{LocalClock, Session};
use vail_client::infrastructure::hardware::mock::ScriptedHardware;
use vail_core::{Contact, EpochAnchor, KeyerTiming, OutboundEvent};

const EPOCH: u64 = 1_700_000_000_000;

/// Runs the keyer in `mode` against `hw` for `run_ms` of virtual time and
/// returns everything it queued.
async fn run_keyer(
    hw: &Rc<ScriptedHardware>,
    clock: LocalClock,
    mode: KeyerMode,
    iambic: IambicMode,
    run_ms: u64,
) -> (Vec<OutboundEvent>, Rc<Session>) {
    let session = Rc::new(Session::new());
    let (outbox, queue) = outbox::channel(Rc::clone(&session));
    let keyer = Keyer::new(
        Rc::clone(hw),
        outbox,
        clock,
        EpochAnchor::new(EPOCH, 0),
        KeyerTiming::from_wpm(25),
        iambic,
    );

    let _ = tokio::time::timeout(Duration::from_millis(run_ms), keyer.run(mode)).await;
    (drain(queue), session)
}

fn drain(mut queue: OutboundQueue) -> Vec<OutboundEvent> {
    let mut events = Vec::new();
    while let Ok(event) = queue.try_recv() {
        events.push(event);
    }
    events
}

// ── Straight key ──────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_straight_key_19ms_press_is_bounce() {
    // Arrange
    let clock = LocalClock::start();
    let hw = Rc::new(ScriptedHardware::new(clock).press(Contact::Dit, 100, 119));

    // Act
    let (events, session) = run_keyer(
        &hw,
        clock,
        KeyerMode::Straight(Contact::Dit),
        IambicMode::B,
        300,
    )
    .await;

    // Assert: the sidetone still follows the contact, but nothing is sent.
    assert!(events.is_empty());
    assert!(session.sent_history().is_empty());
    assert_eq!(hw.tx_tone_changes(), vec![(100, true), (120, false)]);
}

#[tokio::test(start_paused = true)]
async fn test_straight_key_21ms_press_is_sent_once() {
    // Arrange
    let clock = LocalClock::start();
    let hw = Rc::new(ScriptedHardware::new(clock).press(Contact::Dit, 100, 121));

    // Act
    let (events, session) = run_keyer(
        &hw,
        clock,
        KeyerMode::Straight(Contact::Dit),
        IambicMode::B,
        300,
    )
    .await;

    // Assert: measured at 5 ms resolution, stamped at press start.
    assert_eq!(events, vec![OutboundEvent::single(EPOCH + 100, 25)]);
    assert_eq!(session.sent_history().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_straight_key_ignores_other_contact() {
    let clock = LocalClock::start();
    let hw = Rc::new(ScriptedHardware::new(clock).press(Contact::Dit, 50, 150));

    let (events, _) = run_keyer(
        &hw,
        clock,
        KeyerMode::Straight(Contact::Dah),
        IambicMode::B,
        300,
    )
    .await;

    assert!(events.is_empty());
    assert!(hw.tx_tone_changes().is_empty());
}

// ── Iambic ────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_iambic_single_dit() {
    // Arrange
    let clock = LocalClock::start();
    let hw = Rc::new(ScriptedHardware::new(clock).press(Contact::Dit, 0, 20));

    // Act
    let (events, _) = run_keyer(&hw, clock, KeyerMode::Iambic, IambicMode::B, 500).await;

    // Assert
    assert_eq!(events, vec![OutboundEvent::single(EPOCH, 48)]);
    assert_eq!(hw.tx_tone_changes(), vec![(0, true), (48, false)]);
}

#[tokio::test(start_paused = true)]
async fn test_mode_b_remembers_brief_squeeze() {
    // Arrange: dah tapped during the dit and released before it ends.
    let clock = LocalClock::start();
    let hw = Rc::new(
        ScriptedHardware::new(clock)
            .press(Contact::Dit, 0, 30)
            .press(Contact::Dah, 10, 30),
    );

    // Act
    let (events, _) = run_keyer(&hw, clock, KeyerMode::Iambic, IambicMode::B, 500).await;

    // Assert: dit, one-dot space, then the remembered dah.
    assert_eq!(
        events,
        vec![
            OutboundEvent::single(EPOCH, 48),
            OutboundEvent::single(EPOCH + 96, 144),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_mode_a_forgets_brief_squeeze() {
    let clock = LocalClock::start();
    let hw = Rc::new(
        ScriptedHardware::new(clock)
            .press(Contact::Dit, 0, 30)
            .press(Contact::Dah, 10, 30),
    );

    let (events, _) = run_keyer(&hw, clock, KeyerMode::Iambic, IambicMode::A, 500).await;

    assert_eq!(events, vec![OutboundEvent::single(EPOCH, 48)]);
}

#[tokio::test(start_paused = true)]
async fn test_held_squeeze_alternates_dit_dah() {
    // Arrange
    let clock = LocalClock::start();
    let hw = Rc::new(
        ScriptedHardware::new(clock)
            .press(Contact::Dit, 0, 300)
            .press(Contact::Dah, 0, 300),
    );

    // Act
    let (events, _) = run_keyer(&hw, clock, KeyerMode::Iambic, IambicMode::B, 1_000).await;

    // Assert
    assert_eq!(
        events,
        vec![
            OutboundEvent::single(EPOCH, 48),
            OutboundEvent::single(EPOCH + 96, 144),
            OutboundEvent::single(EPOCH + 288, 48),
            OutboundEvent::single(EPOCH + 384, 144),
        ]
    );
    assert_eq!(
        hw.tx_tone_changes(),
        vec![
            (0, true),
            (48, false),
            (96, true),
            (240, false),
            (288, true),
            (336, false),
            (384, true),
            (528, false),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_held_dah_repeats_with_one_dot_spacing() {
    let clock = LocalClock::start();
    let hw = Rc::new(ScriptedHardware::new(clock).press(Contact::Dah, 0, 200));

    let (events, _) = run_keyer(&hw, clock, KeyerMode::Iambic, IambicMode::A, 1_000).await;

    // 0..144 tone, 144..192 space, still held at 192 -> second dah.
    assert_eq!(
        events,
        vec![
            OutboundEvent::single(EPOCH, 144),
            OutboundEvent::single(EPOCH + 192, 144),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_iambic_drains_interrupt_ring() {
    // Arrange
    let clock = LocalClock::start();
    let hw = Rc::new(
        ScriptedHardware::new(clock)
            .press(Contact::Dit, 0, 20)
            .press(Contact::Dah, 200, 220),
    );
    hw.enable_interrupts();

    // Act
    let _ = run_keyer(&hw, clock, KeyerMode::Iambic, IambicMode::B, 600).await;

    // Assert: every edge up to now was consumed by the keyer.
    assert!(hw.poll_ring_buffer().is_none());
}
