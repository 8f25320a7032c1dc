use prometheus::{Histogram, IntCounter, IntCounterVec, IntGauge, Registry};

/// Outcome label recorded for a successful refresh or decode.
pub const OUTCOME_OK: &str = "ok";

#[derive(Clone)]
pub struct JwksMetrics {
    pub registry: Registry,
    pub refresh_total: IntCounterVec,
    pub cache_hits: IntCounter,
    pub keys_loaded: IntGauge,
    pub refresh_duration_seconds: Histogram,
    pub decode_total: IntCounterVec,
}

impl JwksMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let refresh_total = IntCounterVec::new(
            prometheus::Opts::new("jwks_refresh_total", "JWKS refresh attempts by outcome"),
            &["outcome"],
        ).unwrap();
        let cache_hits = IntCounter::new(
            "jwks_cache_hits_total",
            "Key resolutions served without contacting the JWKS endpoint",
        ).unwrap();
        let keys_loaded = IntGauge::new(
            "jwks_keys",
            "Number of keys in the currently cached JWKS",
        ).unwrap();
        let refresh_duration_seconds = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "jwks_refresh_duration_seconds",
                "Time spent fetching and decoding the JWKS document"
            ).buckets(vec![0.01,0.05,0.1,0.25,0.5,1.0,2.5,5.0,10.0])
        ).unwrap();
        let decode_total = IntCounterVec::new(
            prometheus::Opts::new(
                "token_decode_total",
                "Token validations by outcome code"
            ),
            &["outcome"]
        ).unwrap();
        let _ = registry.register(Box::new(refresh_total.clone()));
        let _ = registry.register(Box::new(cache_hits.clone()));
        let _ = registry.register(Box::new(keys_loaded.clone()));
        let _ = registry.register(Box::new(refresh_duration_seconds.clone()));
        let _ = registry.register(Box::new(decode_total.clone()));
        JwksMetrics { registry, refresh_total, cache_hits, keys_loaded, refresh_duration_seconds, decode_total }
    }

    pub fn record_refresh(&self, outcome: &str) {
        self.refresh_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_decode(&self, outcome: &str) {
        self.decode_total.with_label_values(&[outcome]).inc();
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        use prometheus::Encoder;

        let mut buffer = Vec::new();
        let encoder = prometheus::TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for JwksMetrics {
    fn default() -> Self { Self::new() }
}
