//! # Tower/Axum Middleware
//!
//! - [`metrics`] — Prometheus request metrics and domain gauges.
//! - [`rate_limit`] — fixed-window request rate limiting per caller.

pub mod metrics;
pub mod rate_limit;
