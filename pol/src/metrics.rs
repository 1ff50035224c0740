//! Prometheus metrics for the loyalty engine
//!
//! ## Metrics Exported
//! - `pol_tags_tracked` - Distinct miner tags in the ledger (gauge)
//! - `pol_blocks_connected_total` - Blocks passed to the ledger (counter)
//! - `pol_tagged_blocks_total` - Connected blocks that carried a tag (counter)
//! - `pol_rebuild_skipped_total` - Unreadable blocks skipped by rebuilds (counter)
//! - `pol_rpc_requests_total` - Query requests by method (counter)
//! - `pol_rpc_errors_total` - Query errors by method (counter)

use prometheus::{CounterVec, Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};

/// Per-engine metrics registry
pub struct LoyaltyMetrics {
    registry: Registry,
    /// Distinct tags in the ledger
    pub tags_tracked: IntGauge,
    /// Blocks passed to the ledger
    pub blocks_connected: IntCounter,
    /// Blocks that carried a tag
    pub tagged_blocks: IntCounter,
    /// Blocks a rebuild could not read
    pub rebuild_skipped: IntCounter,
    /// Query requests by method
    pub rpc_requests_total: CounterVec,
    /// Query errors by method
    pub rpc_errors_total: CounterVec,
}

impl LoyaltyMetrics {
    /// Create a new registry with all metrics registered
    pub fn new() -> Self {
        let registry = Registry::new();

        let tags_tracked = IntGauge::with_opts(Opts::new(
            "pol_tags_tracked",
            "Distinct miner tags in the loyalty ledger",
        ))
        .expect("metric can be created");

        let blocks_connected = IntCounter::with_opts(Opts::new(
            "pol_blocks_connected_total",
            "Blocks passed to the loyalty ledger",
        ))
        .expect("metric can be created");

        let tagged_blocks = IntCounter::with_opts(Opts::new(
            "pol_tagged_blocks_total",
            "Connected blocks that carried a miner tag",
        ))
        .expect("metric can be created");

        let rebuild_skipped = IntCounter::with_opts(Opts::new(
            "pol_rebuild_skipped_total",
            "Unreadable blocks skipped while rebuilding",
        ))
        .expect("metric can be created");

        let rpc_requests_total = CounterVec::new(
            Opts::new("pol_rpc_requests_total", "Total loyalty query requests"),
            &["method"],
        )
        .expect("metric can be created");

        let rpc_errors_total = CounterVec::new(
            Opts::new("pol_rpc_errors_total", "Total loyalty query errors"),
            &["method"],
        )
        .expect("metric can be created");

        registry
            .register(Box::new(tags_tracked.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(blocks_connected.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(tagged_blocks.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(rebuild_skipped.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(rpc_requests_total.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(rpc_errors_total.clone()))
            .expect("collector can be registered");

        Self {
            registry,
            tags_tracked,
            blocks_connected,
            tagged_blocks,
            rebuild_skipped,
            rpc_requests_total,
            rpc_errors_total,
        }
    }

    /// Record a query request
    pub fn record_request(&self, method: &str) {
        self.rpc_requests_total.with_label_values(&[method]).inc();
    }

    /// Record a query error
    pub fn record_error(&self, method: &str) {
        self.rpc_errors_total.with_label_values(&[method]).inc();
    }

    /// Encode metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap_or_default())
    }
}

impl Default for LoyaltyMetrics {
    fn default() -> Self {
        Self::new()
    }
}
