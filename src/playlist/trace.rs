//! Human-readable reasoning trace returned in explain mode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage a trace step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningStepType {
    /// What a detector or the completion call found in the request.
    Extraction,
    /// Which candidate source was chosen and what it produced.
    Sourcing,
    /// Generative top-up of a short pool.
    Fallback,
    Enrichment,
    /// Constraint enforcement header and per-track checks.
    Validation,
    /// A degraded external call.
    Warning,
}

impl fmt::Display for ReasoningStepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReasoningStepType::Extraction => "extraction",
            ReasoningStepType::Sourcing => "sourcing",
            ReasoningStepType::Fallback => "fallback",
            ReasoningStepType::Enrichment => "enrichment",
            ReasoningStepType::Validation => "validation",
            ReasoningStepType::Warning => "warning",
        };
        f.write_str(label)
    }
}

/// A single entry in the trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStep {
    /// 0-indexed position within the request.
    pub step_number: u32,
    /// Unix timestamp (milliseconds).
    pub timestamp: i64,
    pub step_type: ReasoningStepType,
    pub content: String,
}

impl ReasoningStep {
    pub fn new(step_number: u32, step_type: ReasoningStepType, content: impl Into<String>) -> Self {
        Self {
            step_number,
            timestamp: chrono::Utc::now().timestamp_millis(),
            step_type,
            content: content.into(),
        }
    }
}

/// Accumulates trace steps for one request.
///
/// A disabled logger drops everything, so stages can log unconditionally
/// and only explain-mode requests pay for the strings.
#[derive(Debug, Default)]
pub struct ReasoningLogger {
    enabled: bool,
    steps: Vec<ReasoningStep>,
}

impl ReasoningLogger {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            steps: Vec::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn log(&mut self, step_type: ReasoningStepType, content: impl Into<String>) {
        if !self.enabled {
            return;
        }
        let step = ReasoningStep::new(self.steps.len() as u32, step_type, content);
        self.steps.push(step);
    }

    /// Like [`log`](Self::log), but the content is only built when enabled.
    pub fn log_with<F>(&mut self, step_type: ReasoningStepType, content: F)
    where
        F: FnOnce() -> String,
    {
        if self.enabled {
            self.log(step_type, content());
        }
    }

    /// The recorded steps, or `None` when disabled.
    pub fn into_steps(self) -> Option<Vec<ReasoningStep>> {
        self.enabled.then_some(self.steps)
    }

    /// The trace as plain sentences, or `None` when disabled.
    pub fn into_lines(self) -> Option<Vec<String>> {
        self.into_steps().map(lines)
    }
}

/// Plain sentences of `steps`, the shape returned to callers.
pub fn lines(steps: Vec<ReasoningStep>) -> Vec<String> {
    steps.into_iter().map(|s| s.content).collect()
}

impl fmt::Display for ReasoningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} [{}] {}", self.step_number, self.step_type, self.content)
    }
}
