use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::state::SharedState;

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Poll the challenge store and keep the degraded flag in line with its health.
///
/// After a failed health check the store is asked to reconnect a few times with
/// a growing delay; the flag is raised on the first failed attempt and cleared
/// once the store answers again.
pub async fn run(state: SharedState) {
    let store = state.store().clone();

    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
                sleep(HEALTH_POLL_INTERVAL).await;
            }
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                let mut delay = INITIAL_DELAY;
                let mut reconnected = false;

                for attempt in 0..MAX_RECONNECT_ATTEMPTS {
                    match store.try_reconnect().await {
                        Ok(()) => {
                            info!(attempt, "storage reconnection succeeded");
                            reconnected = true;
                            break;
                        }
                        Err(reconnect_err) => {
                            if attempt == 0 {
                                warn!(
                                    attempt, error = %reconnect_err,
                                    "storage reconnect first attempt failed; entering degraded mode"
                                );
                                state.update_degraded(true);
                            } else {
                                warn!(attempt, error = %reconnect_err, "storage reconnect attempt failed");
                            }
                            sleep(delay).await;
                            delay = (delay * 2).min(MAX_DELAY);
                        }
                    }
                }

                if reconnected {
                    state.update_degraded(false);
                    sleep(HEALTH_POLL_INTERVAL).await;
                } else {
                    warn!("exhausted storage reconnect attempts; staying in degraded mode");
                    sleep(MAX_DELAY).await;
                }
            }
        }
    }
}
