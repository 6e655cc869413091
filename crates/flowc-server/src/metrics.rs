//! ADS metrics.
//!
//! Recorded through the `metrics` facade; no exporter is installed here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Counters and gauges for the ADS service.
///
/// Cloning shares the active-stream count.
#[derive(Debug, Clone, Default)]
pub struct AdsMetrics {
    active_streams: Arc<AtomicU64>,
}

impl AdsMetrics {
    /// Create a metrics handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// A discovery request arrived.
    pub fn record_request(&self, type_url: &str) {
        counter!("flowc_ads_requests_total", "type_url" => type_url.to_string()).increment(1);
    }

    /// A discovery response was sent.
    pub fn record_response(&self, type_url: &str, resources: usize) {
        counter!("flowc_ads_responses_total", "type_url" => type_url.to_string()).increment(1);
        histogram!("flowc_ads_response_resources", "type_url" => type_url.to_string())
            .record(resources as f64);
    }

    /// The client accepted a response.
    pub fn record_ack(&self, type_url: &str) {
        counter!("flowc_ads_acks_total", "type_url" => type_url.to_string()).increment(1);
    }

    /// The client rejected a response.
    pub fn record_nack(&self, type_url: &str) {
        counter!("flowc_ads_nacks_total", "type_url" => type_url.to_string()).increment(1);
    }

    /// A stream opened.
    pub fn stream_opened(&self) {
        let count = self.active_streams.fetch_add(1, Ordering::Relaxed) + 1;
        gauge!("flowc_ads_active_streams").set(count as f64);
    }

    /// A stream closed after `duration`.
    pub fn stream_closed(&self, duration: Duration) {
        let count = self.active_streams.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        gauge!("flowc_ads_active_streams").set(count as f64);
        histogram!("flowc_ads_stream_duration_seconds").record(duration.as_secs_f64());
    }

    /// Streams currently open.
    pub fn active_streams(&self) -> u64 {
        self.active_streams.load(Ordering::Relaxed)
    }
}
