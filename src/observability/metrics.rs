use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}

/// The metrics instance if something already initialized it.
pub fn try_get_metrics() -> Option<&'static Arc<Metrics>> {
    METRICS_INSTANCE.get()
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token metrics
    pub token_acquisitions: IntCounterVec,
    pub token_exchange_requests: IntCounterVec,
    pub token_exchange_failures: IntCounterVec,
    pub token_exchange_duration: HistogramVec,
    pub token_valid_until_unix: IntGauge,

    // Domain API metrics
    pub api_requests: IntCounterVec,
    pub api_request_failures: IntCounterVec,
    pub api_request_duration: HistogramVec,

    // Publish sink metrics
    pub publish_total: IntCounterVec,
    pub publish_failures: IntCounterVec,
    pub publish_duration: HistogramVec,

    // Config/runtime
    pub config_validation_errors: IntCounter,
    pub poll_cycles: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("smappeeagent".into()), None).expect("metrics registry");

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Token
            token_acquisitions: IntCounterVec::new(Opts::new("token_acquisitions_total", "Token acquisitions by outcome"),&["outcome"],).expect("token_acquisitions_total"),
            token_exchange_requests: IntCounterVec::new(Opts::new("token_exchange_requests_total", "Calls to the authorization endpoint by grant"),&["grant"],).expect("token_exchange_requests_total"),
            token_exchange_failures: IntCounterVec::new(Opts::new("token_exchange_failures_total", "Failed grants by reason"),&["grant", "reason"],).expect("token_exchange_failures_total"),
            token_exchange_duration: HistogramVec::new(HistogramOpts::new("token_exchange_duration_seconds", "Grant exchange duration seconds").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),&["grant"],).expect("token_exchange_duration_seconds"),
            token_valid_until_unix: IntGauge::new("token_valid_until_unix_seconds", "Last second the current token is handed out").expect("token_valid_until_unix_seconds"),

            // Domain API
            api_requests: IntCounterVec::new(Opts::new("api_requests_total", "Domain API calls by method"),&["method"],).expect("api_requests_total"),
            api_request_failures: IntCounterVec::new(Opts::new("api_request_failures_total", "Domain API failures by reason"),&["method", "reason"],).expect("api_request_failures_total"),
            api_request_duration: HistogramVec::new(HistogramOpts::new("api_request_duration_seconds", "Domain API call duration seconds").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),&["method"],).expect("api_request_duration_seconds"),

            // Publish
            publish_total: IntCounterVec::new(Opts::new("publish_total", "Retained MQTT publishes by topic"),&["topic"],).expect("publish_total"),
            publish_failures: IntCounterVec::new(Opts::new("publish_failures_total", "Failed MQTT publishes by topic"),&["topic"],).expect("publish_failures_total"),
            publish_duration: HistogramVec::new(HistogramOpts::new("publish_duration_seconds", "Connect + publish + disconnect seconds").buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),&["topic"],).expect("publish_duration_seconds"),

            // Config/runtime
            config_validation_errors: IntCounter::new("config_validation_errors_total","Validation errors during startup",).expect("config_validation_errors_total"),
            poll_cycles: IntCounter::new("poll_cycles_total", "Completed poll cycles in run mode").expect("poll_cycles_total"),
            up: IntGauge::new("up", "1 if service is healthy").expect("up"),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(metrics.token_acquisitions.clone()),
            Box::new(metrics.token_exchange_requests.clone()),
            Box::new(metrics.token_exchange_failures.clone()),
            Box::new(metrics.token_exchange_duration.clone()),
            Box::new(metrics.token_valid_until_unix.clone()),
            Box::new(metrics.api_requests.clone()),
            Box::new(metrics.api_request_failures.clone()),
            Box::new(metrics.api_request_duration.clone()),
            Box::new(metrics.publish_total.clone()),
            Box::new(metrics.publish_failures.clone()),
            Box::new(metrics.publish_duration.clone()),
            Box::new(metrics.config_validation_errors.clone()),
            Box::new(metrics.poll_cycles.clone()),
            Box::new(metrics.up.clone()),
        ];
        for collector in collectors {
            reg.register(collector).expect("metric registered twice");
        }

        metrics
    }
}
