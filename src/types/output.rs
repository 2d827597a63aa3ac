//! Output structures for terminal display

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::types::{LineId, Pick, QuizPhase, ReasonCode, SeverityLevel, Verdict};

/// Output structure for each recorded answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutput {
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Phase the answer was recorded in
    pub phase: QuizPhase,
    /// Line the answer belonged to
    pub line: LineId,
    /// Question answered
    pub question_id: String,
    /// Pick recorded, if a duel/module question
    pub pick: Option<Pick>,
    /// Severity recorded, if a severity probe
    pub severity: Option<SeverityLevel>,
    /// Verdict once the line's picks are complete
    pub verdict: Option<Verdict>,
    /// Running or final purity for the line
    pub purity: Option<f64>,
    /// Reason for the outcome
    pub reason: ReasonCode,
    /// Can the quiz advance to the next phase?
    pub phase_complete: bool,
}

impl StepOutput {
    /// Create new output
    pub fn new(phase: QuizPhase, line: LineId, question_id: &str, reason: ReasonCode) -> Self {
        Self {
            timestamp: Utc::now(),
            phase,
            line,
            question_id: question_id.to_string(),
            pick: None,
            severity: None,
            verdict: None,
            purity: None,
            reason,
            phase_complete: false,
        }
    }

    fn answer_str(&self) -> String {
        match (self.pick, self.severity) {
            (Some(p), _) => p.to_string(),
            (None, Some(s)) => s.to_string(),
            _ => "-".to_string(),
        }
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let verdict = match self.verdict {
            Some(Verdict::C) => "C".green().to_string(),
            Some(Verdict::O) => "O".yellow().to_string(),
            Some(Verdict::F) => "F".red().to_string(),
            None => "-".dimmed().to_string(),
        };
        let reason = if self.reason.is_blocking() {
            self.reason.code().red().bold().to_string()
        } else {
            self.reason.code().dimmed().to_string()
        };
        format!(
            "{} {} | line={} | answer={} | verdict={} | {}",
            self.phase.emoji(),
            self.phase.to_string().bold(),
            self.line,
            self.answer_str(),
            verdict,
            reason
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "phase={} | line={} | question={} | answer={} | verdict={} | purity={} | reason={}",
            self.phase,
            self.line,
            self.question_id,
            self.answer_str(),
            self.verdict.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
            self.purity.map(|p| format!("{:.2}", p)).unwrap_or_else(|| "-".to_string()),
            self.reason.code()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parseable_string_fields() {
        let mut out = StepOutput::new(QuizPhase::C, LineId::Pace, "C-Pace-CF-1", ReasonCode::Q302_SEVERITY_REQUIRED);
        out.pick = Some(Pick::F);
        out.verdict = Some(Verdict::F);
        out.purity = Some(-1.6);
        let s = out.to_parseable_string();
        assert!(s.contains("phase=PHASE_C"));
        assert!(s.contains("answer=F"));
        assert!(s.contains("verdict=F"));
        assert!(s.contains("purity=-1.60"));
        assert!(s.contains("reason=Q302_SEVERITY_REQUIRED"));
    }
}
