//! Cancellable periodic tasks on the Tokio runtime.
//!
//! Title animation, per-line refresh and board-wide refresh all run as a
//! [`spawn_periodic`] task.  The returned [`TaskHandle`] is owned by whatever
//! installed the task; dropping or cancelling it stops the task.
//!
//! Tasks never hold a strong reference to the board they drive.  The tick
//! closure resolves its target through a weak reference on every tick and
//! returns [`ControlFlow::Break`] once the target is gone, so a destroyed
//! board cannot be kept alive by its own timers.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle to a running periodic task.
#[derive(Debug)]
pub struct TaskHandle {
    join: JoinHandle<()>,
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    /// Stops the task.  A tick that is already running finishes its current
    /// await point and then observes the abort.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.join.abort();
    }

    /// `true` until the task is cancelled or returns on its own.
    pub fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst) && !self.join.is_finished()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Runs `tick` every `period`, starting one period from now.
///
/// Must be called from within a Tokio runtime.  Missed ticks are delayed
/// rather than bursted.
pub fn spawn_periodic<F, Fut>(period: Duration, mut tick: F) -> TaskHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ControlFlow<()>> + Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);

    let join = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            if flag.load(Ordering::SeqCst) {
                break;
            }
            if tick().await.is_break() {
                break;
            }
        }
    });

    TaskHandle { join, cancelled }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_periodic_task_ticks_until_break() {
        // Arrange
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        // Act
        let handle = spawn_periodic(Duration::from_millis(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }
        });
        tokio::time::sleep(Duration::from_millis(300)).await;

        // Assert
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(!handle.is_active());
    }

    #[tokio::test]
    async fn test_first_tick_waits_one_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let _handle = spawn_periodic(Duration::from_millis(200), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                ControlFlow::Continue(())
            }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(count.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let handle = spawn_periodic(Duration::from_millis(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                ControlFlow::Continue(())
            }
        });

        tokio::time::sleep(Duration::from_millis(35)).await;
        handle.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let seen = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!handle.is_active());
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }
}
