use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use super::{Inner, SessionTracker};

/// Background task that calls [`SessionTracker::refresh_shared_state`] every
/// `period`. The first tick is one full period after spawning.
///
/// Aborted on [`Poller::stop`] or drop. It only holds a weak reference to the
/// tracker and exits by itself once the tracker is gone.
#[derive(Debug)]
pub(crate) struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    pub(crate) fn spawn(tracker: Weak<Inner>, period: Duration) -> Self {
        log::info!("[Poller::spawn] Refreshing shared state every {}ms", period.as_millis());

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(inner) = tracker.upgrade() else {
                    log::trace!("[Poller] Tracker dropped, exiting.");
                    break;
                };
                SessionTracker { inner }.refresh_shared_state().await;
            }
        });

        Self { handle }
    }

    pub(crate) fn stop(self) {
        log::info!("[Poller::stop] Stopping shared state refresh.");
        // abort happens in Drop
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
