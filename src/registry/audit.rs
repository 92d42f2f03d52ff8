//! Modal lifecycle audit hooks.
//!
//! Records capture a stage plus structured details so callers can log,
//! buffer, or visualize how dialogs move through the registry without
//! touching the registry itself.

use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use serde_json::Value;

use super::core::ModalId;

/// Lifecycle checkpoints emitted by [`super::ModalRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalAuditStage {
    /// `open` was called; the id is assigned but not yet visible.
    Requested,
    /// The request is in the registry and visible to renders.
    Opened,
    /// Removed from the registry; the close callback is scheduled.
    Closing,
    /// The close callback ran.
    Closed,
}

#[derive(Debug, Clone)]
pub struct ModalAuditEvent {
    pub timestamp: SystemTime,
    pub stage: ModalAuditStage,
    pub id: ModalId,
    pub details: Vec<(String, Value)>,
}

pub struct ModalAuditEventBuilder {
    event: ModalAuditEvent,
}

impl ModalAuditEventBuilder {
    pub fn new(stage: ModalAuditStage, id: ModalId) -> Self {
        Self {
            event: ModalAuditEvent {
                timestamp: SystemTime::now(),
                stage,
                id,
                details: Vec::new(),
            },
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.details.push((key.into(), value.into()));
        self
    }

    pub fn finish(self) -> ModalAuditEvent {
        self.event
    }
}

/// Implemented by any audit sink.
pub trait ModalAudit: Send + Sync {
    fn record(&self, event: ModalAuditEvent);
}

#[derive(Debug, Default)]
pub struct NullModalAudit;

impl ModalAudit for NullModalAudit {
    fn record(&self, _event: ModalAuditEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct BufferedModalAudit {
    events: Mutex<Vec<ModalAuditEvent>>,
}

impl BufferedModalAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ModalAuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stages recorded for `id`, in order.
    pub fn stages_of(&self, id: ModalId) -> Vec<ModalAuditStage> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| event.id == id)
            .map(|event| event.stage)
            .collect()
    }
}

impl ModalAudit for BufferedModalAudit {
    fn record(&self, event: ModalAuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_audit_filters_by_id() {
        let audit = BufferedModalAudit::new();
        let first = ModalId::from_raw(1);
        let second = ModalId::from_raw(2);
        audit.record(ModalAuditEventBuilder::new(ModalAuditStage::Requested, first).finish());
        audit.record(
            ModalAuditEventBuilder::new(ModalAuditStage::Requested, second)
                .detail("title", "Second")
                .finish(),
        );
        audit.record(ModalAuditEventBuilder::new(ModalAuditStage::Opened, first).finish());

        assert_eq!(
            audit.stages_of(first),
            vec![ModalAuditStage::Requested, ModalAuditStage::Opened]
        );
        assert_eq!(audit.events()[1].details[0].0, "title");
    }
}
