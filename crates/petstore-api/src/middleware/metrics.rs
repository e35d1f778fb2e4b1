//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Domain-level gauges (orders by status, catalog sizes, coins
//! outstanding) are updated on each `/metrics` scrape (pull model) — see the
//! metrics handler in `lib.rs`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    core::Collector, Encoder, GaugeVec, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Domain gauges (pull model, updated on /metrics scrape) --
    orders_total: GaugeVec,
    products_total: GaugeVec,
    variants_total: prometheus::Gauge,
    users_total: prometheus::Gauge,
    reviews_total: prometheus::Gauge,
    carts_open: prometheus::Gauge,
    coins_outstanding: prometheus::Gauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("petstore_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "petstore_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new(
                "petstore_http_errors_total",
                "Total HTTP errors (4xx and 5xx)",
            ),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let orders_total = GaugeVec::new(
            Opts::new("petstore_orders_total", "Total orders by status"),
            &["status"],
        )
        .expect("metric can be created");

        let products_total = GaugeVec::new(
            Opts::new("petstore_products_total", "Total products by status"),
            &["status"],
        )
        .expect("metric can be created");

        let variants_total =
            prometheus::Gauge::new("petstore_variants_total", "Total product variants")
                .expect("metric can be created");

        let users_total = prometheus::Gauge::new("petstore_users_total", "Total registered users")
            .expect("metric can be created");

        let reviews_total =
            prometheus::Gauge::new("petstore_reviews_total", "Total product reviews")
                .expect("metric can be created");

        let carts_open = prometheus::Gauge::new("petstore_carts_open", "Open carts in memory")
            .expect("metric can be created");

        let coins_outstanding = prometheus::Gauge::new(
            "petstore_coins_outstanding",
            "Total unredeemed loyalty coins across all users",
        )
        .expect("metric can be created");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(orders_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(products_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(variants_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(users_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(reviews_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(carts_open.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(coins_outstanding.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                orders_total,
                products_total,
                variants_total,
                users_total,
                reviews_total,
                carts_open,
                coins_outstanding,
            }),
        }
    }

    /// Return current total request count (sum across all labels).
    pub fn requests(&self) -> u64 {
        let mut total = 0u64;
        let families = self.inner.http_requests_total.collect();
        for mf in &families {
            for m in mf.get_metric() {
                total += m.get_counter().get_value() as u64;
            }
        }
        total
    }

    /// Return current total error count (sum across all labels).
    pub fn errors(&self) -> u64 {
        let mut total = 0u64;
        let families = self.inner.http_errors_total.collect();
        for mf in &families {
            for m in mf.get_metric() {
                total += m.get_counter().get_value() as u64;
            }
        }
        total
    }

    /// Record an HTTP request (called by the middleware).
    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    // -- Domain gauge accessors (used by the /metrics handler) --

    /// Access the orders-by-status gauge for updating.
    pub fn orders_total(&self) -> &GaugeVec {
        &self.inner.orders_total
    }

    /// Access the products-by-status gauge for updating.
    pub fn products_total(&self) -> &GaugeVec {
        &self.inner.products_total
    }

    /// Access the variants gauge for updating.
    pub fn variants_total(&self) -> &prometheus::Gauge {
        &self.inner.variants_total
    }

    /// Access the users gauge for updating.
    pub fn users_total(&self) -> &prometheus::Gauge {
        &self.inner.users_total
    }

    /// Access the reviews gauge for updating.
    pub fn reviews_total(&self) -> &prometheus::Gauge {
        &self.inner.reviews_total
    }

    /// Access the open-carts gauge for updating.
    pub fn carts_open(&self) -> &prometheus::Gauge {
        &self.inner.carts_open
    }

    /// Access the coins-outstanding gauge for updating.
    pub fn coins_outstanding(&self) -> &prometheus::Gauge {
        &self.inner.coins_outstanding
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a request path by replacing UUID segments with `{id}`.
///
/// Prevents cardinality explosion in Prometheus labels.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.len() == 36
                && segment.chars().enumerate().all(|(i, c)| {
                    if i == 8 || i == 13 || i == 18 || i == 23 {
                        c == '-'
                    } else {
                        c.is_ascii_hexdigit()
                    }
                })
            {
                "{id}"
            } else if segment.len() == 32 && segment.chars().all(|c| c.is_ascii_hexdigit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records HTTP request metrics via Prometheus.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        let status = response.status().as_u16();
        m.record_request(&method, &path, status, duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_start_at_zero() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn record_request_counts_errors_separately() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/v1/products", 200, 0.01);
        m.record_request("GET", "/v1/products/{id}", 404, 0.002);
        m.record_request("POST", "/v1/orders", 500, 0.1);
        assert_eq!(m.requests(), 3);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn normalize_path_replaces_uuids() {
        assert_eq!(
            normalize_path("/v1/products/550e8400-e29b-41d4-a716-446655440000"),
            "/v1/products/{id}"
        );
        assert_eq!(
            normalize_path("/v1/carts/550e8400e29b41d4a716446655440000/items"),
            "/v1/carts/{id}/items"
        );
        assert_eq!(normalize_path("/v1/products"), "/v1/products");
        assert_eq!(normalize_path("/health/liveness"), "/health/liveness");
    }

    #[test]
    fn gather_and_encode_produces_text_format() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/v1/products", 200, 0.01);
        let text = m.gather_and_encode().unwrap();
        assert!(text.contains("petstore_http_requests_total"));
    }
}
