//! Prometheus metrics for the vote node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`]; [`NodeMetrics::render`]
//! encodes it in the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Submissions received, accepted or not.
    pub votes_submitted: IntCounter,
    /// Submissions accepted into the pool.
    pub votes_accepted: IntCounter,
    /// Submissions refused (ineligible, invalid candidate, busy, ...).
    pub votes_rejected: IntCounter,
    /// Votes whose block has been appended.
    pub votes_confirmed: IntCounter,
    /// Confirmed votes revoked by an administrator.
    pub votes_revoked: IntCounter,
    pub blocks_sealed: IntCounter,
    pub seal_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub pool_size: IntGauge,
    /// Blocks in the chain, genesis included.
    pub chain_length: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Proof-of-work search time per block, in milliseconds.
    pub mining_time_ms: Histogram,
    /// Time spent inside `submit`, in milliseconds.
    pub submit_latency_ms: Histogram,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, prometheus::Error> {
    register_int_counter_with_registry!(Opts::new(name, help), registry)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge, prometheus::Error> {
    register_int_gauge_with_registry!(Opts::new(name, help), registry)
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new [`Registry`].
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let votes_submitted = counter(&registry, "evote_votes_submitted_total", "Vote submissions received")?;
        let votes_accepted = counter(&registry, "evote_votes_accepted_total", "Votes accepted into the pool")?;
        let votes_rejected = counter(&registry, "evote_votes_rejected_total", "Vote submissions refused")?;
        let votes_confirmed = counter(&registry, "evote_votes_confirmed_total", "Votes sealed into a block")?;
        let votes_revoked = counter(&registry, "evote_votes_revoked_total", "Confirmed votes revoked by an administrator")?;
        let blocks_sealed = counter(&registry, "evote_blocks_sealed_total", "Blocks mined and appended")?;
        let seal_failures = counter(&registry, "evote_seal_failures_total", "Sealing runs that produced no block")?;

        let pool_size = gauge(&registry, "evote_pool_size", "Votes waiting to be sealed")?;
        let chain_length = gauge(&registry, "evote_chain_length", "Blocks in the chain including genesis")?;

        // Exponential buckets covering 1 ms → ~16 s.
        let mining_time_ms = register_histogram_with_registry!(
            HistogramOpts::new("evote_mining_time_ms", "Proof-of-work time per block in milliseconds")
                .buckets(prometheus::exponential_buckets(1.0, 2.0, 15)?),
            registry
        )?;

        let submit_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new("evote_submit_latency_ms", "Vote submission latency in milliseconds")
                .buckets(prometheus::exponential_buckets(0.1, 2.0, 15)?),
            registry
        )?;

        Ok(Self {
            registry,
            votes_submitted,
            votes_accepted,
            votes_rejected,
            votes_confirmed,
            votes_revoked,
            blocks_sealed,
            seal_failures,
            pool_size,
            chain_length,
            mining_time_ms,
            submit_latency_ms,
        })
    }

    /// Encode every metric in the text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
