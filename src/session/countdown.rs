//! Countdown driver.
//!
//! Plays the part of the countdown view: it follows the published
//! [`SessionState`], counts down once per tick while the session runs, and
//! reports `CountdownExpired { epoch }` exactly once per epoch.
//!
//! - A new epoch restarts the count from `remaining_seconds`
//! - Pausing keeps the live count; resuming continues from it
//! - The live count is published for display

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::debug;

use super::event::SessionEvent;
use crate::types::SessionState;

/// One countdown second.
pub const TICK: Duration = Duration::from_secs(1);

/// Handle to a running countdown driver.
#[derive(Debug)]
pub struct Countdown {
    remaining: watch::Receiver<u32>,
    task: JoinHandle<()>,
}

impl Countdown {
    /// Spawns the driver.
    ///
    /// # Arguments
    ///
    /// * `state` - Published session state
    /// * `events` - Where expiry is reported
    /// * `tick` - Length of one countdown second ([`TICK`] outside tests)
    pub fn spawn(
        state: watch::Receiver<SessionState>,
        events: mpsc::UnboundedSender<SessionEvent>,
        tick: Duration,
    ) -> Self {
        let initial = state.borrow().remaining_seconds;
        let (remaining_tx, remaining) = watch::channel(initial);
        let task = tokio::spawn(run(state, events, remaining_tx, tick));

        Self { remaining, task }
    }

    /// Live remaining seconds.
    pub fn remaining(&self) -> u32 {
        *self.remaining.borrow()
    }

    /// Subscribes to the live remaining seconds.
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.remaining.clone()
    }

    /// Stops the driver.
    pub fn abort(&self) {
        self.task.abort();
    }
}

async fn run(
    mut state: watch::Receiver<SessionState>,
    events: mpsc::UnboundedSender<SessionEvent>,
    remaining_tx: watch::Sender<u32>,
    tick: Duration,
) {
    let mut current = *state.borrow_and_update();
    let mut remaining = current.remaining_seconds;
    let mut expired_epoch = None;
    remaining_tx.send_replace(remaining);

    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = *state.borrow_and_update();

                if next.epoch != current.epoch {
                    remaining = next.remaining_seconds;
                    ticker.reset();
                } else if next.is_running && !current.is_running {
                    ticker.reset();
                }

                current = next;
                remaining_tx.send_replace(remaining);
            }

            _ = ticker.tick() => {
                if !current.is_running || remaining == 0 {
                    continue;
                }

                remaining -= 1;
                remaining_tx.send_replace(remaining);

                if remaining == 0 && expired_epoch != Some(current.epoch) {
                    expired_epoch = Some(current.epoch);
                    debug!("Countdown expired (epoch {})", current.epoch);
                    if events
                        .send(SessionEvent::CountdownExpired { epoch: current.epoch })
                        .is_err()
                    {
                        break;
                    }
                }
            }
        }
    }

    debug!("Countdown stopped");
}
