//! Fire-and-forget telemetry side channel
//!
//! Sinks observe engine events; nothing they do feeds back into selection
//! or scoring.

use std::cell::RefCell;

use serde::Serialize;

use crate::types::{Badge, BankPhase, Face, LineId, OptionKey, QuestionType, QuizPhase};

/// Events emitted by the selector and the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    QuestionSelected {
        question_id: String,
        phase: BankPhase,
        line: LineId,
        question_type: Option<QuestionType>,
        order: u8,
    },
    BankMiss {
        phase: BankPhase,
        line: LineId,
        question_type: Option<QuestionType>,
        order: u8,
    },
    AnswerRecorded {
        question_id: String,
        line: LineId,
        choice: OptionKey,
    },
    SeverityRequired {
        line: LineId,
    },
    PhaseChanged {
        from: QuizPhase,
        to: QuizPhase,
    },
    AnchorCommitted {
        anchor: Face,
        auto: bool,
    },
    SifFinalized {
        primary: Face,
        secondary: Face,
        prize: Face,
        badge: Badge,
    },
}

/// Observer for telemetry events
pub trait TelemetrySink: std::fmt::Debug {
    fn emit(&self, event: &TelemetryEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn emit(&self, event: &TelemetryEvent) {
        let payload = serde_json::to_string(event).unwrap_or_default();
        match event {
            TelemetryEvent::BankMiss { .. } => tracing::warn!(target: "sifquiz::telemetry", %payload, "bank miss"),
            TelemetryEvent::PhaseChanged { .. }
            | TelemetryEvent::AnchorCommitted { .. }
            | TelemetryEvent::SifFinalized { .. } => {
                tracing::info!(target: "sifquiz::telemetry", %payload, "quiz event")
            }
            _ => tracing::debug!(target: "sifquiz::telemetry", %payload, "quiz event"),
        }
    }
}

/// Drops every event
#[derive(Debug, Default)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn emit(&self, _event: &TelemetryEvent) {}
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: RefCell<Vec<TelemetryEvent>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events seen so far
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn emit(&self, event: &TelemetryEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
