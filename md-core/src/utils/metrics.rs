/// Gate for whether the (possibly expensive) `monitoring::MetricsRegistry`
/// plumbing should be wired up at all — set from `--metrics` on the CLI.
pub struct MetricsCollector {
    enabled: bool,
}

impl MetricsCollector {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(false)
    }
}
