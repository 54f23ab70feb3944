use chrono::Utc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::state::AppState;

/// Periodically closes offers whose window has passed so drivers and
/// dashboards see them as expired without waiting for an accept attempt.
pub async fn start_offer_expiry_worker(state: AppState, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(every_ms = every.as_millis() as u64, "Offer expiry worker started");

    loop {
        ticker.tick().await;
        match state.offers().expire_lapsed(Utc::now()).await {
            Ok(0) => {}
            Ok(expired) => {
                state.metrics.offers_expired.inc_by(expired as u64);
                debug!(expired, "Expired lapsed offers");
            }
            Err(e) => error!("Offer expiry sweep failed: {}", e),
        }
    }
}
