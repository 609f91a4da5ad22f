//! Keyer → send task → relay echo → receive pipeline.
//!
//! Checks that what the keyer transmits is byte-for-byte what the relay
//! would echo back, and that the echo is recognised as our own.

use std::rc::Rc;
use std::time::Duration;

use vail_client::application::keyer::{IambicMode, Keyer, KeyerMode};
use vail_client::application::outbox;
use vail_client::application::receive::{Disposition, Receiver};
use vail_client::application::send::run_sender;
use vail_client::application::session::{LocalClock, Session};
use vail_client::infrastructure::hardware::mock::ScriptedHardware;
use vail_core::protocol::frame::LengthForm;
use vail_core::{decode_event, read_frame, Contact, EpochAnchor, Frame, KeyerTiming, Opcode};

#[tokio::test(start_paused = true)]
async fn test_transmitted_element_echo_is_cancelled() {
    // Arrange: one straight-key press of 60 ms.
    let clock = LocalClock::start();
    let hw = Rc::new(ScriptedHardware::new(clock).press(Contact::Dah, 100, 160));
    let session = Rc::new(Session::new());
    let (outbox, queue) = outbox::channel(Rc::clone(&session));
    let keyer = Keyer::new(
        Rc::clone(&hw),
        outbox,
        clock,
        EpochAnchor::new(5_000, 0),
        KeyerTiming::from_wpm(20),
        IambicMode::B,
    );

    // Act 1: key, then let the sender flush the queue once the keyer is gone.
    let _ = tokio::time::timeout(
        Duration::from_millis(400),
        keyer.run(KeyerMode::Straight(Contact::Dah)),
    )
    .await;
    let mut wire = Vec::new();
    run_sender(queue, &mut wire).await.expect("send");

    // Assert 1: one masked frame carrying (5100, reserved 0, 60).
    let sent = read_frame(&mut wire.as_slice()).await.expect("client frame");
    assert_eq!(sent.opcode, Opcode::Binary);
    let sent_event = decode_event(&sent.payload).expect("event");
    assert_eq!(sent_event.timestamp_ms, 5_100);
    assert_eq!(sent_event.peer_count, 0);
    assert_eq!(sent_event.durations, vec![60]);

    // Act 2: the relay echoes it with the peer count filled in.
    let mut echoed = sent.payload.clone();
    echoed[8..10].copy_from_slice(&2u16.to_be_bytes());
    let mut rx = Receiver::new(Rc::clone(&hw), Rc::clone(&session), clock, 4_000);
    let disposition = rx.classify(
        &Frame {
            fin: true,
            opcode: Opcode::Binary,
            length_form: LengthForm::Short,
            payload: echoed,
        },
        clock.now_ms(),
    );

    // Assert 2
    assert_eq!(disposition, Disposition::Echo);
    assert!(session.sent_history().is_empty());
    assert_eq!(session.peer_count(), 2);
    assert_eq!(rx.offset(), None);
}
