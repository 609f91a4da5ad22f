//! Status task: shows on the indicator whether other stations are present.
//!
//! The relay counts this client among the peers, so "someone else is here"
//! means a peer count above one.  While that holds the indicator blinks
//! 100 ms on / 100 ms off; otherwise it stays off and the count is checked
//! again every 500 ms.

use std::rc::Rc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use super::hardware::Hardware;
use super::session::Session;

const BLINK_MS: u64 = 100;
const IDLE_CHECK_MS: u64 = 500;

/// Blinks the indicator while more than one peer is connected.
pub async fn run_status<H: Hardware>(hw: Rc<H>, session: Rc<Session>) {
    let mut was_active = false;
    loop {
        let active = session.peer_count() > 1;
        if active != was_active {
            debug!(peers = session.peer_count(), active, "status indicator");
            was_active = active;
        }

        if active {
            hw.set_indicator(true);
            sleep(Duration::from_millis(BLINK_MS)).await;
            hw.set_indicator(false);
            sleep(Duration::from_millis(BLINK_MS)).await;
        } else {
            hw.set_indicator(false);
            sleep(Duration::from_millis(IDLE_CHECK_MS)).await;
        }
    }
}
