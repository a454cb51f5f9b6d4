//! Run stop signal
//!
//! One [`RunStop`] is shared by the scheduler, every VU task, the live
//! monitor and whoever drives the run (the CLI wires Ctrl-C to it). Raising
//! it is always graceful: in-flight requests complete and are recorded, but
//! no new iteration starts and pending sleeps wake up immediately.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::info;

/// Why a run stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The run cap elapsed
    Cap,
    /// Stopped from outside (Ctrl-C, embedding code)
    External,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cap => write!(f, "run cap reached"),
            StopReason::External => write!(f, "stop requested"),
        }
    }
}

/// Cloneable, level-triggered stop flag
#[derive(Debug, Clone)]
pub struct RunStop {
    sender: Arc<watch::Sender<Option<StopReason>>>,
    receiver: watch::Receiver<Option<StopReason>>,
}

impl Default for RunStop {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStop {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Raise the signal; only the first reason is kept
    pub fn raise(&self, reason: StopReason) -> bool {
        let raised = self.sender.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        });
        if raised {
            info!("Stopping run: {}", reason);
        }
        raised
    }

    /// Shorthand for an external graceful stop
    pub fn stop(&self) -> bool {
        self.raise(StopReason::External)
    }

    pub fn is_raised(&self) -> bool {
        self.receiver.borrow().is_some()
    }

    pub fn reason(&self) -> Option<StopReason> {
        *self.receiver.borrow()
    }

    /// Resolve once the signal is raised
    pub async fn raised(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as `self`, so this only returns when raised
        let _ = receiver.wait_for(Option::is_some).await;
    }

    /// Sleep until `deadline`; false when the signal cut the sleep short
    pub async fn sleep_until(&self, deadline: Instant) -> bool {
        if self.is_raised() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => !self.is_raised(),
            _ = self.raised() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_first_reason_wins() {
        let stop = RunStop::new();
        assert!(!stop.is_raised());
        assert!(stop.raise(StopReason::Cap));
        assert!(!stop.stop());
        assert_eq!(stop.reason(), Some(StopReason::Cap));
    }

    #[tokio::test]
    async fn test_clones_observe_the_signal() {
        let stop = RunStop::new();
        let observer = stop.clone();
        let waiter = tokio::spawn(async move { observer.raised().await });
        stop.stop();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_is_interrupted() {
        let stop = RunStop::new();
        let sleeper = stop.clone();
        let started = Instant::now();
        let handle = tokio::spawn(async move {
            sleeper
                .sleep_until(Instant::now() + Duration::from_secs(60))
                .await
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        stop.stop();

        assert!(!handle.await.unwrap());
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes_without_signal() {
        let stop = RunStop::new();
        assert!(stop.sleep_until(Instant::now() + Duration::from_secs(5)).await);
        stop.stop();
        assert!(!stop.sleep_until(Instant::now() + Duration::from_secs(5)).await);
    }
}
