//! Minimal counters for the measurement points the source system
//! instruments (`original_source/service/metrics/*.go`). The spec treats
//! the Prometheus exposition format itself as out of scope — only the
//! *where* of measurement matters — so this crate keeps the counters as
//! plain atomics on the server state and renders them in a small text
//! format at `GET /metrics`, rather than pulling in a full Prometheus
//! client.

use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! counters {
    ($($field:ident => $metric_name:literal),* $(,)?) => {
        #[derive(Default)]
        pub struct Metrics {
            $(pub $field: AtomicU64,)*
        }

        impl Metrics {
            pub fn render_prometheus_text(&self) -> String {
                let mut out = String::new();
                $(
                    out.push_str(&format!(
                        "# TYPE {name} counter\n{name} {value}\n",
                        name = $metric_name,
                        value = self.$field.load(Ordering::Relaxed),
                    ));
                )*
                out
            }
        }
    };
}

counters! {
    device_auth_responses => "dsts_device_auth_responses_total",
    device_auth_bad_requests => "dsts_device_auth_bad_requests_total",
    device_auth_blocked => "dsts_device_auth_blocked_total",
    device_auth_internal_errors => "dsts_device_auth_internal_errors_total",
    device_auth_challenge_responses => "dsts_device_auth_challenge_responses_total",
    device_auth_challenge_bad_requests => "dsts_device_auth_challenge_bad_requests_total",
    device_auth_challenge_internal_errors => "dsts_device_auth_challenge_internal_errors_total",
    app_auth_responses => "dsts_app_auth_responses_total",
    app_auth_bad_requests => "dsts_app_auth_bad_requests_total",
    app_auth_internal_errors => "dsts_app_auth_internal_errors_total",
    database_devices_created => "dsts_database_devices_created_total",
    database_devices_retrieved => "dsts_database_devices_retrieved_total",
    database_device_not_found_errors => "dsts_database_device_not_found_errors_total",
    database_busy_errors => "dsts_database_busy_errors_total",
    enrollment_tokens_created => "dsts_enrollment_tokens_created_total",
    enrollment_tokens_validated => "dsts_enrollment_tokens_validated_total",
    enrollment_tokens_invalid => "dsts_enrollment_tokens_invalid_total",
}

impl Metrics {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_every_registered_counter() {
        let metrics = Metrics::default();
        Metrics::incr(&metrics.device_auth_responses);
        let text = metrics.render_prometheus_text();
        assert!(text.contains("dsts_device_auth_responses_total 1"));
        assert!(text.contains("dsts_database_busy_errors_total 0"));
    }
}
