use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static BIDS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PAYMENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PAYMENT_AMOUNT_TOTAL: OnceLock<IntCounter> = OnceLock::new();

pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }

    let registry = Registry::new();

    let bids_counter = IntCounterVec::new(
        Opts::new("bids_total", "Total bids processed by outcome"),
        &["outcome"],
    )
    .expect("Failed to create bids_total metric");

    let payments_counter = IntCounterVec::new(
        Opts::new("payments_total", "Total payment events by stage"),
        &["stage"],
    )
    .expect("Failed to create payments_total metric");

    let amount_counter = IntCounter::with_opts(Opts::new(
        "payment_amount_paisa_total",
        "Total initiated payment amount in paisa",
    ))
    .expect("Failed to create payment_amount_paisa_total metric");

    registry
        .register(Box::new(bids_counter.clone()))
        .expect("Failed to register bids_total");
    registry
        .register(Box::new(payments_counter.clone()))
        .expect("Failed to register payments_total");
    registry
        .register(Box::new(amount_counter.clone()))
        .expect("Failed to register payment_amount_paisa_total");

    PROMETHEUS_REGISTRY
        .set(registry)
        .expect("Failed to set prometheus registry");
    BIDS_TOTAL
        .set(bids_counter)
        .expect("Failed to set bids_total");
    PAYMENTS_TOTAL
        .set(payments_counter)
        .expect("Failed to set payments_total");
    PAYMENT_AMOUNT_TOTAL
        .set(amount_counter)
        .expect("Failed to set payment_amount_paisa_total");
}

pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

/// Record a processed bid by outcome ("accepted" / "rejected").
pub fn record_bid(outcome: &str) {
    if let Some(counter) = BIDS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Record a payment lifecycle event by stage.
pub fn record_payment(stage: &str) {
    if let Some(counter) = PAYMENTS_TOTAL.get() {
        counter.with_label_values(&[stage]).inc();
    }
}

/// Record an initiated amount in paisa.
pub fn record_payment_amount(amount_paisa: u64) {
    if let Some(counter) = PAYMENT_AMOUNT_TOTAL.get() {
        counter.inc_by(amount_paisa);
    }
}
