//! Monitoring and observability module
//!
//! Provides Prometheus metrics export, an HTTP server for scraping, and an
//! alerting system built on §7's saturation and missed-updates conditions.

pub mod alert_rules;
pub mod alerts;
pub mod metrics;
pub mod server;

pub use alert_rules::{AlertRule, RuleContext, RuleEngine};
pub use alerts::{
    Alert, AlertCategory, AlertId, AlertManager, AlertManagerConfig, AlertOutput, AlertSeverity,
};
pub use metrics::{
    BookMetrics, MetricsRegistry, PerformanceMetrics, SubscriberMetrics, SystemMetrics,
};
pub use server::{MetricsServer, MetricsServerConfig};
