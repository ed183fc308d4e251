use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

/// Counts attempt lifecycle transitions, labelled by outcome.
pub(crate) fn record_attempt_event(event: &'static str) {
    metrics::counter!("exam_attempt_events_total", "event" => event).increment(1);
}

/// Counts answers that could not be mapped back to an option when their
/// attempt closed.
pub(crate) fn record_unresolvable_answer() {
    metrics::counter!("exam_unresolvable_answers_total").increment(1);
}
