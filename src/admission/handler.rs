use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::warn;

use super::attributes::Operation;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
const READY_TIMEOUT: Duration = Duration::from_secs(10);

/// The operations a plugin applies to.
#[derive(Debug, Clone)]
pub struct Handler {
    operations: Vec<Operation>,
}

impl Handler {
    pub fn new(operations: &[Operation]) -> Self {
        Self {
            operations: operations.to_vec(),
        }
    }

    pub fn handles(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }
}

/// Holds a plugin back until the caches it reads from are synced.
#[derive(Clone)]
pub struct ReadyGate {
    ready_fn: Arc<dyn Fn() -> bool + Send + Sync>,
    ready: Arc<AtomicBool>,
    poll_interval: Duration,
    timeout: Duration,
}

impl ReadyGate {
    pub fn new(ready_fn: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            ready_fn: Arc::new(ready_fn),
            ready: Arc::new(AtomicBool::new(false)),
            poll_interval: READY_POLL_INTERVAL,
            timeout: READY_TIMEOUT,
        }
    }

    /// A gate that is open from the start.
    pub fn always_ready() -> Self {
        Self::new(|| true)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Polls until ready or the timeout passes. Once ready, stays ready.
    pub async fn wait_for_ready(&self) -> bool {
        if self.ready.load(Ordering::Acquire) {
            return true;
        }
        let deadline = Instant::now() + self.timeout;
        loop {
            if (self.ready_fn)() {
                self.ready.store(true, Ordering::Release);
                return true;
            }
            if Instant::now() >= deadline {
                warn!(timeout = ?self.timeout, "admission plugin caches not synced");
                return false;
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn test_handler() {
        let handler = Handler::new(&[Operation::Create, Operation::Update]);
        assert!(handler.handles(Operation::Create));
        assert!(handler.handles(Operation::Update));
        assert!(!handler.handles(Operation::Delete));
    }

    #[tokio::test]
    async fn test_ready_gate_waits_for_sync() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let gate = ReadyGate::new(move || counter.fetch_add(1, Ordering::SeqCst) >= 2);
        assert!(gate.wait_for_ready().await);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // Sticky once open.
        assert!(gate.wait_for_ready().await);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_ready_gate_times_out() {
        let gate = ReadyGate::new(|| false).with_timeout(Duration::from_millis(250));
        assert!(!gate.wait_for_ready().await);
    }
}
