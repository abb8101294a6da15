//! Result maps returned by the administrative operations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one independent section of a best-effort operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionOutcome {
    Succeeded { detail: String },
    Failed { error: String },
}

impl SectionOutcome {
    pub fn succeeded(detail: impl Into<String>) -> Self {
        SectionOutcome::Succeeded {
            detail: detail.into(),
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        SectionOutcome::Failed {
            error: error.to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SectionOutcome::Failed { .. })
    }
}

/// Per-section results of warm-up or a full flush.
///
/// A failing section never prevents the others from running; its error is
/// recorded here instead of being raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionReport {
    pub sections: BTreeMap<String, SectionOutcome>,
    pub completed_at: DateTime<Utc>,
}

pub type WarmUpReport = SectionReport;
pub type ClearReport = SectionReport;

impl SectionReport {
    pub(crate) fn new() -> Self {
        Self {
            sections: BTreeMap::new(),
            completed_at: Utc::now(),
        }
    }

    pub(crate) fn record(&mut self, section: &str, outcome: SectionOutcome) {
        self.sections.insert(section.to_string(), outcome);
    }

    pub(crate) fn finish(mut self) -> Self {
        self.completed_at = Utc::now();
        self
    }

    pub fn get(&self, section: &str) -> Option<&SectionOutcome> {
        self.sections.get(section)
    }

    pub fn has_failures(&self) -> bool {
        self.sections.values().any(SectionOutcome::is_failure)
    }

    pub fn failed_sections(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|(_, outcome)| outcome.is_failure())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
