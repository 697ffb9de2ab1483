use crate::core::token_store::TokenStore;
use opentelemetry::{KeyValue, global, metrics::Gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Clone, Debug)]
struct Metrics {
    status: Gauge<i64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("taskboard-sessions");
        Self {
            status: meter
                .i64_gauge("taskboard_health_status")
                .with_description("Status of health checks (1 for ok, 0 for error)")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HealthService {
    store: Arc<dyn TokenStore>,
    check_timeout: Duration,
    metrics: Metrics,
}

impl HealthService {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>, check_timeout: Duration) -> Self {
        Self { store, check_timeout, metrics: Metrics::new() }
    }

    /// Checks that the token store answers within the deadline.
    ///
    /// # Errors
    /// Returns a string describing the failure if the store is unreachable or slow.
    pub async fn check_store(&self) -> Result<(), String> {
        let result = match timeout(self.check_timeout, self.store.ping()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(format!("token store unavailable: {e}")),
            Err(_) => Err("token store ping timed out".to_string()),
        };

        let status = i64::from(result.is_ok());
        self.metrics.status.record(status, &[KeyValue::new("component", "token_store")]);
        result
    }
}
