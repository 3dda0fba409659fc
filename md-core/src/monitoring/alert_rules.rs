//! Alert rules engine for automatic alert triggering
//!
//! Defines rules that monitor link state and trigger alerts when the
//! conditions in §7's error-handling table are met: saturation (queue or
//! gap limit exceeded) and missed updates.

use super::alerts::{Alert, AlertCategory, AlertManager, AlertSeverity};
use super::MetricsRegistry;
use crate::subscriber::LinkStats;
use anyhow::Result;
use std::time::SystemTime;
use tracing::debug;

/// Rule evaluation context: one link's current stats plus the shared
/// metrics registry, evaluated on a timer by whatever drives the links.
pub struct RuleContext<'a> {
    /// The channel id the stats belong to.
    pub link_id: &'a str,
    /// Current link stats (reconnect count, rx/tx seq no, queue length, gap).
    pub stats: &'a LinkStats,
    /// Prometheus metrics registry.
    pub metrics: std::sync::Arc<MetricsRegistry>,
    /// Current timestamp.
    pub timestamp: SystemTime,
}

/// Alert rule trait
pub trait AlertRule: Send + Sync {
    /// Rule name for identification
    fn name(&self) -> &str;

    /// Rule category
    fn category(&self) -> AlertCategory;

    /// Evaluate rule and return alert if triggered
    fn evaluate(&self, context: &RuleContext) -> Option<Alert>;

    /// Check if rule is enabled
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Fires when a link's receive queue exceeds `maxQueueSize` — one of the
/// two forced-reconnect conditions.
pub struct QueueSaturationRule {
    pub max_queue_size: usize,
    pub severity: AlertSeverity,
}

impl QueueSaturationRule {
    pub fn new(max_queue_size: usize, severity: AlertSeverity) -> Self {
        Self {
            max_queue_size,
            severity,
        }
    }
}

impl AlertRule for QueueSaturationRule {
    fn name(&self) -> &str {
        "queue_saturation"
    }

    fn category(&self) -> AlertCategory {
        AlertCategory::Saturation
    }

    fn evaluate(&self, context: &RuleContext) -> Option<Alert> {
        if context.stats.queue_len > self.max_queue_size {
            let alert = Alert::new(
                self.category(),
                self.name(),
                self.severity,
                format!(
                    "link {} receive queue saturated: {} > {}",
                    context.link_id, context.stats.queue_len, self.max_queue_size
                ),
            )
            .with_detail("link", context.link_id.to_string())
            .with_detail("queue_len", context.stats.queue_len.to_string())
            .with_detail("max_queue_size", self.max_queue_size.to_string());

            return Some(alert);
        }

        None
    }
}

/// Fires when a single detected gap exceeds `reReqMaxGap` — the other
/// forced-reconnect condition. Also the source of the `MissedUpdates{venue, n}`
/// alert the log line names.
pub struct MissedUpdatesRule {
    pub re_req_max_gap: u64,
    pub severity: AlertSeverity,
}

impl MissedUpdatesRule {
    pub fn new(re_req_max_gap: u64, severity: AlertSeverity) -> Self {
        Self {
            re_req_max_gap,
            severity,
        }
    }
}

impl AlertRule for MissedUpdatesRule {
    fn name(&self) -> &str {
        "missed_updates"
    }

    fn category(&self) -> AlertCategory {
        AlertCategory::Saturation
    }

    fn evaluate(&self, context: &RuleContext) -> Option<Alert> {
        let gap = context.stats.last_gap?;
        if gap > self.re_req_max_gap {
            let alert = Alert::new(
                self.category(),
                self.name(),
                self.severity,
                format!(
                    "MissedUpdates{{venue: {}, n: {}}} exceeds reReqMaxGap {}",
                    context.link_id, gap, self.re_req_max_gap
                ),
            )
            .with_detail("venue", context.link_id.to_string())
            .with_detail("n", gap.to_string())
            .with_detail("re_req_max_gap", self.re_req_max_gap.to_string());

            return Some(alert);
        }

        None
    }
}

/// Fires when a link has reconnected more than `threshold` times since
/// process start — a flapping link, not a single transient drop.
pub struct LinkFlappingRule {
    pub threshold: u64,
    pub severity: AlertSeverity,
}

impl LinkFlappingRule {
    pub fn new(threshold: u64, severity: AlertSeverity) -> Self {
        Self {
            threshold,
            severity,
        }
    }
}

impl AlertRule for LinkFlappingRule {
    fn name(&self) -> &str {
        "link_flapping"
    }

    fn category(&self) -> AlertCategory {
        AlertCategory::System
    }

    fn evaluate(&self, context: &RuleContext) -> Option<Alert> {
        if context.stats.reconnect_count > self.threshold {
            let alert = Alert::new(
                self.category(),
                self.name(),
                self.severity,
                format!(
                    "link {} has reconnected {} times",
                    context.link_id, context.stats.reconnect_count
                ),
            )
            .with_detail("link", context.link_id.to_string())
            .with_detail("reconnect_count", context.stats.reconnect_count.to_string());

            return Some(alert);
        }

        None
    }
}

/// Rule engine that evaluates all rules periodically
pub struct RuleEngine {
    rules: Vec<Box<dyn AlertRule>>,
    alert_manager: std::sync::Arc<AlertManager>,
}

impl RuleEngine {
    /// Create a new rule engine
    pub fn new(alert_manager: std::sync::Arc<AlertManager>) -> Self {
        Self {
            rules: Vec::new(),
            alert_manager,
        }
    }

    /// Add a rule to the engine
    pub fn add_rule(&mut self, rule: Box<dyn AlertRule>) {
        debug!("Adding alert rule: {}", rule.name());
        self.rules.push(rule);
    }

    /// Default rules matching §7's saturation and missed-updates conditions.
    pub fn with_default_rules(mut self, max_queue_size: usize, re_req_max_gap: u64) -> Self {
        self.add_rule(Box::new(QueueSaturationRule::new(
            max_queue_size,
            AlertSeverity::Warning,
        )));
        self.add_rule(Box::new(MissedUpdatesRule::new(
            re_req_max_gap,
            AlertSeverity::Warning,
        )));
        self.add_rule(Box::new(LinkFlappingRule::new(10, AlertSeverity::Warning)));
        self
    }

    /// Evaluate all rules and send alerts
    pub fn evaluate_all(&self, context: &RuleContext) -> Result<()> {
        for rule in &self.rules {
            if !rule.is_enabled() {
                continue;
            }

            if let Some(alert) = rule.evaluate(context) {
                debug!("Alert triggered: {}", alert.id.to_string());
                self.alert_manager.send(alert)?;
            }
        }

        Ok(())
    }

    /// Get number of rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::alerts::AlertManagerConfig;
    use std::sync::Arc;

    fn stats(queue_len: usize, last_gap: Option<u64>, reconnect_count: u64) -> LinkStats {
        LinkStats {
            reconnect_count,
            rx_seq_no: 0,
            tx_seq_no: 0,
            queue_len,
            last_gap,
        }
    }

    fn context<'a>(link_id: &'a str, stats: &'a LinkStats, metrics: Arc<MetricsRegistry>) -> RuleContext<'a> {
        RuleContext {
            link_id,
            stats,
            metrics,
            timestamp: SystemTime::now(),
        }
    }

    #[test]
    fn queue_saturation_rule_fires_over_limit() {
        let rule = QueueSaturationRule::new(1000, AlertSeverity::Warning);
        let metrics = Arc::new(MetricsRegistry::new().unwrap());

        let under = stats(500, None, 0);
        assert!(rule.evaluate(&context("ch1", &under, metrics.clone())).is_none());

        let over = stats(1500, None, 0);
        let alert = rule.evaluate(&context("ch1", &over, metrics)).unwrap();
        assert_eq!(alert.severity, AlertSeverity::Warning);
        assert_eq!(alert.id.name, "queue_saturation");
    }

    #[test]
    fn missed_updates_rule_fires_over_re_req_max_gap() {
        let rule = MissedUpdatesRule::new(10, AlertSeverity::Warning);
        let metrics = Arc::new(MetricsRegistry::new().unwrap());

        let small_gap = stats(0, Some(3), 0);
        assert!(rule.evaluate(&context("ch1", &small_gap, metrics.clone())).is_none());

        let big_gap = stats(0, Some(50), 0);
        let alert = rule.evaluate(&context("ch1", &big_gap, metrics)).unwrap();
        assert_eq!(alert.id.name, "missed_updates");
        assert_eq!(alert.details.get("n").unwrap(), "50");
    }

    #[test]
    fn link_flapping_rule_fires_over_threshold() {
        let rule = LinkFlappingRule::new(10, AlertSeverity::Warning);
        let metrics = Arc::new(MetricsRegistry::new().unwrap());

        let stable = stats(0, None, 2);
        assert!(rule.evaluate(&context("ch1", &stable, metrics.clone())).is_none());

        let flapping = stats(0, None, 20);
        let alert = rule.evaluate(&context("ch1", &flapping, metrics)).unwrap();
        assert_eq!(alert.id.name, "link_flapping");
    }

    #[test]
    fn rule_engine_with_default_rules_evaluates_without_error() {
        let alert_manager = Arc::new(AlertManager::new(AlertManagerConfig::default()));
        let engine = RuleEngine::new(alert_manager).with_default_rules(100_000, 10);
        assert_eq!(engine.rule_count(), 3);

        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let stats = stats(0, None, 0);
        engine.evaluate_all(&context("ch1", &stats, metrics)).unwrap();
    }
}
