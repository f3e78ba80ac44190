use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use meshbridge_core::{EventBus, ServiceEvent};

/// The set of background tasks owned by one running instance.
///
/// Cloning shares the same tracker, token and event bus.
#[derive(Clone)]
pub struct ServiceScope {
    tracker: TaskTracker,
    cancel: CancellationToken,
    events: EventBus,
}

impl ServiceScope {
    pub fn new(events: EventBus) -> Self {
        Self {
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            events,
        }
    }

    /// Spawn a tracked task on the current runtime.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task)
    }

    /// Fires when the scope is shut down.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn publish(&self, event: ServiceEvent) {
        self.events.publish(event);
    }

    /// Tasks still running.
    pub fn active_tasks(&self) -> usize {
        self.tracker.len()
    }

    /// Cancel every task and wait up to `grace` for them to finish.
    /// Returns false if some were still running at the deadline.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.cancel.cancel();
        self.tracker.close();
        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => {
                debug!("all service tasks finished");
                true
            }
            Err(_) => {
                warn!(
                    remaining = self.tracker.len(),
                    "service tasks still running after shutdown grace period"
                );
                false
            }
        }
    }
}
