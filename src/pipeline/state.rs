use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StateError;

/// Lifecycle events the driver feeds into trigger evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    EngineStarted,
    StageFinished { stage: String },
    EngineFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Success,
    Failure,
}

impl StageStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StageStatus::Pending)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageStatus::Pending => f.write_str("pending"),
            StageStatus::Success => f.write_str("success"),
            StageStatus::Failure => f.write_str("failure"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: String,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

/// Append-only record of stage executions for one run.
///
/// Triggers and producers only read from it; the driver appends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    records: Vec<StageRecord>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    pub fn has_record(&self, stage: &str) -> bool {
        self.records.iter().any(|r| r.stage == stage)
    }

    /// True if any record for `stage` finished successfully.
    pub fn succeeded(&self, stage: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.stage == stage && r.status == StageStatus::Success)
    }

    /// Output of the last record for `stage` that has one.
    pub fn output_of(&self, stage: &str) -> Option<&str> {
        self.records
            .iter()
            .rev()
            .filter(|r| r.stage == stage)
            .find_map(|r| r.output.as_deref())
    }

    /// Record that `stage` has been handed to a service.
    pub fn begin(&mut self, stage: &str) -> Result<(), StateError> {
        if self.has_terminal(stage) {
            return Err(StateError::AlreadyFinished(stage.to_string()));
        }
        self.records.push(StageRecord {
            stage: stage.to_string(),
            status: StageStatus::Pending,
            output: None,
            error: None,
            started_at: Some(chrono::Utc::now().to_rfc3339()),
            finished_at: None,
        });
        Ok(())
    }

    /// Close the pending record for `stage`. Output is set once and never changed.
    pub fn finish(
        &mut self,
        stage: &str,
        status: StageStatus,
        output: Option<String>,
        error: Option<String>,
    ) -> Result<(), StateError> {
        if self.has_terminal(stage) {
            return Err(StateError::AlreadyFinished(stage.to_string()));
        }
        let record = self
            .records
            .iter_mut()
            .rev()
            .find(|r| r.stage == stage && r.status == StageStatus::Pending)
            .ok_or_else(|| StateError::NotStarted(stage.to_string()))?;
        record.status = status;
        record.output = output;
        record.error = error;
        record.finished_at = Some(chrono::Utc::now().to_rfc3339());
        Ok(())
    }

    fn has_terminal(&self, stage: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.stage == stage && r.status.is_terminal())
    }
}
