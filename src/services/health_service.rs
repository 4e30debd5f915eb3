use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the store and report whether the bot currently runs degraded.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    if let Err(err) = state.store().health_check().await {
        warn!(error = %err, "storage health check failed");
        return HealthResponse::degraded();
    }

    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;

    #[tokio::test]
    async fn reports_store_outage() {
        let harness = Harness::new();
        assert_eq!(health_status(&harness.state).await.status, "ok");

        harness.store.set_unavailable(true);
        assert_eq!(health_status(&harness.state).await.status, "degraded");
    }
}
