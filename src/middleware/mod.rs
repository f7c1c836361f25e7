//! Request middleware: structured request logs and per-route metrics.
//!
//! Both wrap the whole `App`, so routing has not happened when a request
//! enters them. Route patterns and path parameters are read from the
//! response's request, after the router has filled them in.

pub mod logging;
pub mod metrics;

pub use logging::RequestLogging;
pub use metrics::MetricsMiddleware;

use actix_web::HttpRequest;

/// Pattern used for routes the router did not match.
pub const UNMATCHED_ROUTE: &str = "<unmatched>";

/// `METHOD /pattern/{param}` for a routed request.
///
/// Keyed by pattern rather than path so every session id shares one entry.
pub fn route_label(req: &HttpRequest) -> String {
    let pattern = req.match_pattern().unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    format!("{} {}", req.method(), pattern)
}
