use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::app::ports::RateLimiterPort;

/// Shared minimum-interval gate for an external service.
///
/// Every `acquire` waits the full interval before releasing the caller, and
/// callers are serialized on an async mutex, so consecutive calls through the
/// same spacer (or any clone of it) start at least `interval` apart even if
/// the pipeline is later parallelized.
#[derive(Clone, Debug)]
pub struct RequestSpacer {
    interval: Duration,
    gate: Arc<Mutex<()>>,
}

impl RequestSpacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, gate: Arc::new(Mutex::new(())) }
    }

    /// Wait for this caller's turn plus the fixed pre-call delay
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }
        let _turn = self.gate.lock().await;
        tokio::time::sleep(self.interval).await;
    }
}

#[async_trait]
impl RateLimiterPort for RequestSpacer {
    async fn acquire(&self) {
        RequestSpacer::acquire(self).await;
    }
}
