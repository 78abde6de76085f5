//! Prometheus-backed counters for record actions and REST traffic.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Label values are the action and HTTP method names, never record ids.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared by screen sessions.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    crud_actions_total: IntCounterVec,
    crud_actions_coalesced_total: IntCounter,
    rest_requests_total: IntCounterVec,
    pending_actions: IntGauge,
}

/// Snapshot of the scalar metrics for health reporting and tests.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Requests folded into an already pending action.
    pub crud_actions_coalesced_total: u64,
    /// Actions queued but not yet started.
    pub pending_actions: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let crud_actions_total = IntCounterVec::new(
            Opts::new("crud_actions_total", "Record actions executed by outcome"),
            &["action", "outcome"],
        )
        .map_err(|source| TelemetryError::Collector {
            name: "crud_actions_total",
            source,
        })?;
        let crud_actions_coalesced_total = IntCounter::with_opts(Opts::new(
            "crud_actions_coalesced_total",
            "Action requests folded into an already pending request",
        ))
        .map_err(|source| TelemetryError::Collector {
            name: "crud_actions_coalesced_total",
            source,
        })?;
        let rest_requests_total = IntCounterVec::new(
            Opts::new("rest_requests_total", "REST calls issued by method and status"),
            &["method", "status"],
        )
        .map_err(|source| TelemetryError::Collector {
            name: "rest_requests_total",
            source,
        })?;
        let pending_actions = IntGauge::with_opts(Opts::new(
            "crud_pending_actions",
            "Record actions queued but not yet started",
        ))
        .map_err(|source| TelemetryError::Collector {
            name: "crud_pending_actions",
            source,
        })?;

        register(&registry, "crud_actions_total", crud_actions_total.clone())?;
        register(
            &registry,
            "crud_actions_coalesced_total",
            crud_actions_coalesced_total.clone(),
        )?;
        register(&registry, "rest_requests_total", rest_requests_total.clone())?;
        register(&registry, "crud_pending_actions", pending_actions.clone())?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                crud_actions_total,
                crud_actions_coalesced_total,
                rest_requests_total,
                pending_actions,
            }),
        })
    }

    /// Count one executed action with its outcome label (`success` or `error`).
    pub fn inc_action(&self, action: &str, outcome: &str) {
        self.inner
            .crud_actions_total
            .with_label_values(&[action, outcome])
            .inc();
    }

    /// Count one request that was folded into a pending action.
    pub fn inc_coalesced(&self) {
        self.inner.crud_actions_coalesced_total.inc();
    }

    /// Count one REST call. Transport failures use status `0`.
    pub fn inc_rest_request(&self, method: &str, status: u16) {
        let status = status.to_string();
        self.inner
            .rest_requests_total
            .with_label_values(&[method, status.as_str()])
            .inc();
    }

    /// Set the number of actions waiting to run.
    pub fn set_pending_actions(&self, count: usize) {
        self.inner
            .pending_actions
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Current value of the executed-action counter for the given labels.
    #[must_use]
    pub fn action_count(&self, action: &str, outcome: &str) -> u64 {
        self.inner
            .crud_actions_total
            .with_label_values(&[action, outcome])
            .get()
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Encode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::Utf8 { source })
    }

    /// Take a point-in-time snapshot of the scalar metrics.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            crud_actions_coalesced_total: self.inner.crud_actions_coalesced_total.get(),
            pending_actions: self.inner.pending_actions.get(),
        }
    }
}

fn register<C>(registry: &Registry, name: &'static str, collector: C) -> Result<()>
where
    C: prometheus::core::Collector + 'static,
{
    registry
        .register(Box::new(collector))
        .map_err(|source| TelemetryError::Collector { name, source })
}
