// Core data model for workflow tracking - plain serializable records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Metadata key holding the workflow's target path
pub const METADATA_PATH: &str = "path";
pub const METADATA_STAGE: &str = "stage";
pub const METADATA_PERCENT: &str = "percent_complete";

/// Kind of phase workflow being tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowKind {
    ProjectGeneration,
    Validation,
    Audit,
    ValidationAudit,
    Configuration,
    Offline,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::ProjectGeneration => "project-generation",
            WorkflowKind::Validation => "validation",
            WorkflowKind::Audit => "audit",
            WorkflowKind::ValidationAudit => "validation-audit",
            WorkflowKind::Configuration => "configuration",
            WorkflowKind::Offline => "offline",
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a workflow.
///
/// Transitions only run pending -> running -> {completed | failed | cancelled}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Pending => "pending",
            WorkflowState::Running => "running",
            WorkflowState::Completed => "completed",
            WorkflowState::Failed => "failed",
            WorkflowState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Completed | WorkflowState::Failed | WorkflowState::Cancelled
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public progress snapshot handed to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowProgress {
    pub stage: String,
    pub step: String,
    pub percent_complete: f64,
    pub message: String,
    pub start_time: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl WorkflowProgress {
    pub fn new(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            step: String::new(),
            percent_complete: 0.0,
            message: String::new(),
            start_time: Utc::now(),
            elapsed_ms: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Live status of a registered workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStatus {
    pub id: String,
    pub kind: WorkflowKind,
    pub state: WorkflowState,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub last_error: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl WorkflowStatus {
    pub fn new(id: String, kind: WorkflowKind, metadata: BTreeMap<String, String>) -> Self {
        Self {
            id,
            kind,
            state: WorkflowState::Pending,
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
            last_error: None,
            metadata,
        }
    }

    pub fn path(&self) -> Option<&str> {
        self.metadata.get(METADATA_PATH).map(String::as_str)
    }

    /// Stamp the end time and duration for a terminal transition
    pub(crate) fn stamp_end(&mut self) {
        let end = Utc::now();
        let elapsed = (end - self.start_time).num_milliseconds().max(0) as u64;
        self.end_time = Some(end);
        self.duration_ms = Some(elapsed);
    }
}

/// Immutable history record derived from a status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInfo {
    pub id: String,
    pub kind: WorkflowKind,
    pub state: WorkflowState,
    pub success: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub last_error: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl From<&WorkflowStatus> for WorkflowInfo {
    fn from(status: &WorkflowStatus) -> Self {
        Self {
            id: status.id.clone(),
            kind: status.kind,
            state: status.state,
            success: status.state == WorkflowState::Completed,
            start_time: status.start_time,
            end_time: status.end_time,
            duration_ms: status.duration_ms,
            last_error: status.last_error.clone(),
            metadata: status.metadata.clone(),
        }
    }
}

impl From<&WorkflowInfo> for WorkflowStatus {
    fn from(info: &WorkflowInfo) -> Self {
        Self {
            id: info.id.clone(),
            kind: info.kind,
            state: info.state,
            start_time: info.start_time,
            end_time: info.end_time,
            duration_ms: info.duration_ms,
            last_error: info.last_error.clone(),
            metadata: info.metadata.clone(),
        }
    }
}

/// Outcome fields shared by every per-kind result type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub success: bool,
    pub duration_ms: u64,
    pub progress: WorkflowProgress,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl RunSummary {
    pub fn new(success: bool, duration: Duration, progress: WorkflowProgress) -> Self {
        Self {
            success,
            duration_ms: duration.as_millis() as u64,
            errors: progress.errors.clone(),
            warnings: progress.warnings.clone(),
            progress,
        }
    }
}
