use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::sync::{Arc, Mutex, PoisonError};

/// Counters shared between form instances and the modal registry.
#[derive(Debug, Default, Clone)]
pub struct FormMetrics {
    validations: u64,
    failed_validations: u64,
    submissions: u64,
    blocked_submissions: u64,
    modals_opened: u64,
    modals_closed: u64,
    close_callbacks: u64,
}

pub type SharedMetrics = Arc<Mutex<FormMetrics>>;

impl FormMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedMetrics {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn record_validation(&mut self, passed: bool) {
        self.validations = self.validations.saturating_add(1);
        if !passed {
            self.failed_validations = self.failed_validations.saturating_add(1);
        }
    }

    pub fn record_submission(&mut self, delivered: bool) {
        if delivered {
            self.submissions = self.submissions.saturating_add(1);
        } else {
            self.blocked_submissions = self.blocked_submissions.saturating_add(1);
        }
    }

    pub fn record_modal_opened(&mut self) {
        self.modals_opened = self.modals_opened.saturating_add(1);
    }

    pub fn record_modal_closed(&mut self) {
        self.modals_closed = self.modals_closed.saturating_add(1);
    }

    pub fn record_close_callbacks(&mut self, count: usize) {
        self.close_callbacks = self.close_callbacks.saturating_add(count as u64);
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            validations: self.validations,
            failed_validations: self.failed_validations,
            submissions: self.submissions,
            blocked_submissions: self.blocked_submissions,
            modals_opened: self.modals_opened,
            modals_closed: self.modals_closed,
            close_callbacks: self.close_callbacks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub validations: u64,
    pub failed_validations: u64,
    pub submissions: u64,
    pub blocked_submissions: u64,
    pub modals_opened: u64,
    pub modals_closed: u64,
    pub close_callbacks: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "form_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("validations".to_string(), json!(self.validations));
        map.insert("failed_validations".to_string(), json!(self.failed_validations));
        map.insert("submissions".to_string(), json!(self.submissions));
        map.insert("blocked_submissions".to_string(), json!(self.blocked_submissions));
        map.insert("modals_opened".to_string(), json!(self.modals_opened));
        map.insert("modals_closed".to_string(), json!(self.modals_closed));
        map.insert("close_callbacks".to_string(), json!(self.close_callbacks));
        map
    }
}

/// Apply `record` to an optional shared metrics handle.
pub(crate) fn with_metrics(metrics: Option<&SharedMetrics>, record: impl FnOnce(&mut FormMetrics)) {
    if let Some(metrics) = metrics {
        let mut guard = metrics.lock().unwrap_or_else(PoisonError::into_inner);
        record(&mut guard);
    }
}
