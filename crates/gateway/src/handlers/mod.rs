//! HTTP request handlers.

pub mod forward;
pub mod health;
pub mod metrics;

pub use forward::forward_graphql;
pub use health::health_check;
pub use metrics::metrics_handler;
