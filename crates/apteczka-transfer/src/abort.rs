//! Cooperative cancellation for long-running transfers.
//!
//! An [`AbortHandle`] stays with whoever can cancel (the settings screen);
//! the running task holds an [`AbortSignal`] and checks it between units of
//! work or races it against a pending future with `tokio::select!`.

use std::sync::Arc;
use tokio::sync::watch;

/// Creates a connected handle/signal pair.
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx: Arc::new(tx) }, AbortSignal { rx })
}

/// Requests cancellation.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    /// Signals every subscribed task to stop. Idempotent.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    /// True once `abort` was called.
    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }

    /// Another signal observing this handle.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observed by the running task.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, signal) = abort_pair();
        signal
    }

    /// True once cancellation was requested.
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when cancellation is requested.
    ///
    /// If every handle is dropped without aborting, this never resolves.
    pub async fn aborted(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_abort_reaches_all_signals() {
        let (handle, signal) = abort_pair();
        let second = handle.signal();
        assert!(!signal.is_aborted());

        handle.abort();
        handle.abort();

        assert!(handle.is_aborted());
        assert!(signal.is_aborted());
        assert!(second.is_aborted());
    }

    #[tokio::test]
    async fn test_aborted_wakes_waiting_task() {
        let (handle, mut signal) = abort_pair();

        let waiter = tokio::spawn(async move {
            signal.aborted().await;
            true
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.abort();

        assert!(waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_does_not_fire() {
        let mut signal = AbortSignal::never();
        assert!(!signal.is_aborted());

        let fired = tokio::time::timeout(Duration::from_secs(5), signal.aborted()).await;
        assert!(fired.is_err());
    }
}
