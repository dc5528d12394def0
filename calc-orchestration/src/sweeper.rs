//! Lease reclamation: a background task that reverts expired in-progress
//! leases to `Pending`, so a crashed or partitioned worker does not stall
//! its expression indefinitely (§4.3, §9).

use std::sync::Arc;
use std::time::Duration;

use crate::store::Store;

/// Runs [`Store::sweep_expired_leases`] on a fixed interval until the
/// process shuts down. Always on, per the design's resolution of the
/// "sweeper mandatory?" open question.
pub async fn run<S: Store + 'static>(store: Arc<S>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match store.sweep_expired_leases().await {
            Ok(0) => {}
            Ok(n) => tracing::info!(reclaimed = n, "reclaimed expired task leases"),
            Err(e) => tracing::warn!(error = %e, "lease sweep failed"),
        }
    }
}
