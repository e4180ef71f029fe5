use std::sync::Weak;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Something that can evict its stale holds on demand
pub trait Sweep: Send + Sync + 'static {
    /// Evicts every due hold and returns how many went.
    fn sweep(&self) -> usize;
}

/// Background task that periodically expires stale holds.
///
/// Holds only a weak reference to its target so it never keeps the owning
/// service alive; it stops when the halt signal fires or the target is gone.
#[derive(Debug)]
pub struct Sweeper {
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Must be called from within a tokio runtime.
    pub fn spawn<S: Sweep>(target: Weak<S>, interval: Duration, mut halt: watch::Receiver<bool>) -> Self {
        let handle = tokio::spawn(async move {
            info!("Hold sweeper started, sweeping every {:?}", interval);

            loop {
                if *halt.borrow_and_update() {
                    break;
                }

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    changed = halt.changed() => {
                        // Sender gone means the cache is gone too
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                }

                let Some(target) = target.upgrade() else {
                    break;
                };
                let evicted = target.sweep();
                if evicted > 0 {
                    debug!("Sweep released {} expired holds", evicted);
                }
            }

            info!("Hold sweeper stopped");
        });

        Self { handle }
    }

    /// Waits for the task to exit. Only returns once the halt signal has fired.
    pub async fn join(self) {
        if let Err(err) = self.handle.await {
            tracing::warn!("Hold sweeper ended abnormally: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingTarget {
        sweeps: AtomicUsize,
    }

    impl Sweep for CountingTarget {
        fn sweep(&self) -> usize {
            self.sweeps.fetch_add(1, Ordering::SeqCst);
            0
        }
    }

    #[tokio::test]
    async fn test_sweeps_until_halted() {
        let target = Arc::new(CountingTarget::default());
        let (halt_tx, halt_rx) = watch::channel(false);
        let sweeper = Sweeper::spawn(Arc::downgrade(&target), Duration::from_millis(5), halt_rx);

        for _ in 0..200 {
            if target.sweeps.load(Ordering::SeqCst) >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(target.sweeps.load(Ordering::SeqCst) >= 3);

        halt_tx.send_replace(true);
        tokio::time::timeout(Duration::from_secs(2), sweeper.join())
            .await
            .expect("sweeper should stop after halt");
    }

    #[tokio::test]
    async fn test_halt_interrupts_a_long_sleep() {
        let target = Arc::new(CountingTarget::default());
        let (halt_tx, halt_rx) = watch::channel(false);
        let sweeper = Sweeper::spawn(Arc::downgrade(&target), Duration::from_secs(3600), halt_rx);

        halt_tx.send_replace(true);
        tokio::time::timeout(Duration::from_secs(2), sweeper.join())
            .await
            .expect("halt should wake the sweeper");
        assert_eq!(target.sweeps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stops_when_target_is_dropped() {
        let target = Arc::new(CountingTarget::default());
        let (_halt_tx, halt_rx) = watch::channel(false);
        let sweeper = Sweeper::spawn(Arc::downgrade(&target), Duration::from_millis(5), halt_rx);
        drop(target);

        tokio::time::timeout(Duration::from_secs(2), sweeper.join())
            .await
            .expect("sweeper should notice its target is gone");
    }
}
