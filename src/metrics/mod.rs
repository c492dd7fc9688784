// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};

pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for the checkout service
// ============================================================================
//
// - Checkout outcomes and latency
// - Failures that happened after the order was committed
// - Product/category cache lookups and background population failures
// - Event publication results and circuit breaker state
//
// Scraped via /metrics (see server.rs).
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Checkout
    pub checkouts_total: IntCounterVec,
    pub checkout_duration: HistogramVec,
    pub post_commit_failures: IntCounterVec,

    // Cache
    pub cache_lookups: IntCounterVec,
    pub cache_population_failures: IntCounterVec,

    // Messaging
    pub events_published: IntCounterVec,
    pub circuit_breaker_state: IntGauge,
    pub circuit_breaker_transitions: IntCounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let checkouts_total = IntCounterVec::new(
            Opts::new("checkouts_total", "Checkout calls by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(checkouts_total.clone()))?;

        let checkout_duration = HistogramVec::new(
            HistogramOpts::new("checkout_duration_seconds", "End-to-end checkout latency")
                .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(checkout_duration.clone()))?;

        let post_commit_failures = IntCounterVec::new(
            Opts::new(
                "checkout_post_commit_failures_total",
                "Checkouts whose order was committed but a later step failed",
            ),
            &["stage"],
        )?;
        registry.register(Box::new(post_commit_failures.clone()))?;

        let cache_lookups = IntCounterVec::new(
            Opts::new("cache_lookups_total", "Read-through cache lookups"),
            &["entity", "result"],
        )?;
        registry.register(Box::new(cache_lookups.clone()))?;

        let cache_population_failures = IntCounterVec::new(
            Opts::new(
                "cache_population_failures_total",
                "Background cache writes dropped after retries",
            ),
            &["entity"],
        )?;
        registry.register(Box::new(cache_population_failures.clone()))?;

        let events_published = IntCounterVec::new(
            Opts::new("events_published_total", "Domain events handed to the broker"),
            &["event_type", "result"],
        )?;
        registry.register(Box::new(events_published.clone()))?;

        let circuit_breaker_state = IntGauge::new(
            "circuit_breaker_state",
            "Broker circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        let circuit_breaker_transitions = IntCounterVec::new(
            Opts::new("circuit_breaker_transitions_total", "Circuit breaker state transitions"),
            &["from_state", "to_state"],
        )?;
        registry.register(Box::new(circuit_breaker_transitions.clone()))?;

        Ok(Self {
            registry,
            checkouts_total,
            checkout_duration,
            post_commit_failures,
            cache_lookups,
            cache_population_failures,
            events_published,
            circuit_breaker_state,
            circuit_breaker_transitions,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_checkout(&self, outcome: &str, duration_secs: f64) {
        self.checkouts_total.with_label_values(&[outcome]).inc();
        self.checkout_duration.with_label_values(&[outcome]).observe(duration_secs);
    }

    pub fn record_post_commit_failure(&self, stage: &str) {
        self.post_commit_failures.with_label_values(&[stage]).inc();
    }

    /// `result` is one of "hit", "miss" or "error".
    pub fn record_cache_lookup(&self, entity: &str, result: &str) {
        self.cache_lookups.with_label_values(&[entity, result]).inc();
    }

    pub fn record_cache_population_failure(&self, entity: &str) {
        self.cache_population_failures.with_label_values(&[entity]).inc();
    }

    pub fn record_publish(&self, event_type: &str, success: bool) {
        let result = if success { "ok" } else { "error" };
        self.events_published.with_label_values(&[event_type, result]).inc();
    }

    pub fn set_circuit_breaker_state(&self, state: i64) {
        self.circuit_breaker_state.set(state);
    }

    pub fn record_circuit_breaker_transition(&self, from_state: &str, to_state: &str) {
        self.circuit_breaker_transitions
            .with_label_values(&[from_state, to_state])
            .inc();
    }
}
