//! Request metrics and tracing spans.
//!
//! With the `metrics` feature, [`METRICS`] records OpenTelemetry instruments
//! that are exported into a private `prometheus::Registry` and rendered by the
//! `/metrics` route. With the `tracing` feature, [`tracing_helpers`] provides
//! the spans used around SQL statements, connections and resolvers.

#[cfg(feature = "metrics")]
pub use self::otel::{RosterMetrics, METRICS};

/// Prometheus text exposition of the current metric values.
///
/// Empty when the `metrics` feature is off or the exporter failed to start.
pub fn render_prometheus() -> String {
    #[cfg(feature = "metrics")]
    {
        if let Some(metrics) = METRICS.as_ref() {
            return metrics.render();
        }
    }
    String::new()
}

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, MeterProvider as _};
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Encoder, Registry, TextEncoder};
    use std::time::Duration;

    /// `None` when the exporter could not be built; recording becomes a no-op.
    pub static METRICS: Lazy<Option<RosterMetrics>> = Lazy::new(RosterMetrics::init);

    pub struct RosterMetrics {
        registry: Registry,
        _provider: SdkMeterProvider,
        requests_total: Counter<u64>,
        request_duration: Histogram<f64>,
        gateway_errors_total: Counter<u64>,
    }

    impl RosterMetrics {
        pub fn init() -> Option<Self> {
            let registry = Registry::new();
            let exporter = match opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
            {
                Ok(exporter) => exporter,
                Err(err) => {
                    log::warn!("metrics disabled, prometheus exporter failed: {:?}", err);
                    return None;
                }
            };
            let provider = SdkMeterProvider::builder().with_reader(exporter).build();
            let meter = provider.meter("roster");

            let requests_total = meter
                .u64_counter("roster_requests_total")
                .with_description("GraphQL operations handled, by operation and outcome")
                .build();

            let request_duration = meter
                .f64_histogram("roster_request_duration_seconds")
                .with_description("Duration of GraphQL operations")
                .build();

            let gateway_errors_total = meter
                .u64_counter("roster_gateway_errors_total")
                .with_description("Persistence gateway failures")
                .build();

            Some(Self {
                registry,
                _provider: provider,
                requests_total,
                request_duration,
                gateway_errors_total,
            })
        }

        pub fn record_request(&self, operation: &'static str, outcome: &'static str, elapsed: Duration) {
            let attrs = [
                KeyValue::new("operation", operation),
                KeyValue::new("outcome", outcome),
            ];
            self.requests_total.add(1, &attrs);
            self.request_duration.record(elapsed.as_secs_f64(), &attrs[..1]);
        }

        pub fn record_gateway_error(&self, operation: &'static str) {
            self.gateway_errors_total
                .add(1, &[KeyValue::new("operation", operation)]);
        }

        pub fn render(&self) -> String {
            let encoder = TextEncoder::new();
            let families = self.registry.gather();
            let mut buffer = Vec::new();
            if let Err(err) = encoder.encode(&families, &mut buffer) {
                log::warn!("failed to encode metrics: {}", err);
                return String::new();
            }
            String::from_utf8(buffer).unwrap_or_default()
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    pub fn execute_query_span(query: &str) -> Span {
        tracing::debug_span!("roster.query", db.system = "postgresql", db.statement = %query)
    }

    pub fn acquire_connection_span() -> Span {
        tracing::info_span!("roster.connect", db.system = "postgresql")
    }

    pub fn resolver_span(operation: &'static str) -> Span {
        tracing::info_span!("roster.resolver", graphql.operation = operation)
    }
}
