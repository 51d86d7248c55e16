// Workflow registry - active workflows plus bounded history
//
// A single read/write lock guards both collections. Writers: registration,
// status mutation, moves to history. Readers: status lookups and listings.
// Collaborator calls never happen while the lock is held.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use super::context::CancelFlag;
use super::error::WorkflowError;
use super::lifecycle::{Lifecycle, LifecycleEvent};
use super::types::{
    WorkflowInfo, WorkflowKind, WorkflowProgress, WorkflowState, WorkflowStatus, METADATA_PATH,
    METADATA_PERCENT, METADATA_STAGE,
};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

struct ActiveEntry {
    status: WorkflowStatus,
    lifecycle: Lifecycle,
    cancel: CancelFlag,
}

#[derive(Default)]
struct RegistryInner {
    active: HashMap<String, ActiveEntry>,
    history: VecDeque<WorkflowInfo>,
}

/// Counters for registry events
#[derive(Debug, Default)]
pub struct RegistryMetrics {
    pub registered: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub cancelled: AtomicU64,
    pub evicted: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub registered: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub evicted: u64,
}

impl RegistryMetrics {
    fn record_terminal(&self, state: WorkflowState) {
        let counter = match state {
            WorkflowState::Completed => &self.completed,
            WorkflowState::Failed => &self.failed,
            WorkflowState::Cancelled => &self.cancelled,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> RegistryStats {
        RegistryStats {
            registered: self.registered.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Workflow metrics: registered={}, completed={}, failed={}, cancelled={}, evicted={}",
            stats.registered, stats.completed, stats.failed, stats.cancelled, stats.evicted
        );
    }
}

pub struct WorkflowRegistry {
    inner: RwLock<RegistryInner>,
    history_limit: usize,
    metrics: RegistryMetrics,
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl WorkflowRegistry {
    pub fn new(history_limit: usize) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            history_limit: history_limit.max(1),
            metrics: RegistryMetrics::default(),
        }
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn metrics(&self) -> &RegistryMetrics {
        &self.metrics
    }

    /// Insert a pending workflow; returns the flag used to cancel it
    pub fn register(
        &self,
        id: &str,
        kind: WorkflowKind,
        metadata: BTreeMap<String, String>,
    ) -> Result<CancelFlag, WorkflowError> {
        let mut inner = self.inner.write();
        if inner.active.contains_key(id) || inner.history.iter().any(|info| info.id == id) {
            return Err(WorkflowError::InvalidInput(format!(
                "workflow id {id} is already registered"
            )));
        }

        let status = WorkflowStatus::new(id.to_string(), kind, metadata);
        let cancel = CancelFlag::new();
        info!(
            workflow_id = %id,
            kind = %kind,
            path = status.path().unwrap_or_default(),
            "Workflow registered"
        );
        inner.active.insert(
            id.to_string(),
            ActiveEntry {
                status,
                lifecycle: Lifecycle::new(id),
                cancel: cancel.clone(),
            },
        );
        self.metrics.registered.fetch_add(1, Ordering::Relaxed);
        Ok(cancel)
    }

    pub fn mark_running(&self, id: &str) -> Result<(), WorkflowError> {
        let mut inner = self.inner.write();
        let entry = inner
            .active
            .get_mut(id)
            .ok_or_else(|| WorkflowError::NotFound { id: id.to_string() })?;

        entry.lifecycle.apply(LifecycleEvent::Start)?;
        entry.status.state = WorkflowState::Running;
        entry.status.start_time = chrono::Utc::now();
        info!(
            workflow_id = %id,
            kind = %entry.status.kind,
            path = entry.status.path().unwrap_or_default(),
            "Workflow started"
        );
        Ok(())
    }

    /// Mirror the latest progress into the active entry's metadata
    pub fn record_progress(&self, id: &str, progress: &WorkflowProgress) {
        let mut inner = self.inner.write();
        if let Some(entry) = inner.active.get_mut(id) {
            let metadata = &mut entry.status.metadata;
            metadata.insert(METADATA_STAGE.to_string(), progress.stage.clone());
            metadata.insert(
                METADATA_PERCENT.to_string(),
                format!("{:.1}", progress.percent_complete),
            );
        }
    }

    /// Record the outcome of an execute call. Returns the terminal state, or
    /// `None` when the workflow already left `active` (e.g. it was cancelled).
    pub fn finish(&self, id: &str, outcome: Result<(), String>) -> Option<WorkflowState> {
        let mut inner = self.inner.write();
        let Some(entry) = inner.active.get_mut(id) else {
            debug!(workflow_id = %id, "Workflow already retired, ignoring outcome");
            return None;
        };

        let event = match &outcome {
            Ok(()) => LifecycleEvent::Complete,
            Err(error) => LifecycleEvent::Fail {
                error: error.clone(),
            },
        };
        if let Err(e) = entry.lifecycle.apply(event) {
            warn!(workflow_id = %id, "Rejected terminal transition: {}", e);
            return None;
        }

        entry.status.state = entry.lifecycle.state();
        entry.status.last_error = entry.lifecycle.last_error().map(str::to_string);
        entry.status.stamp_end();

        let state = entry.status.state;
        match &outcome {
            Ok(()) => info!(
                workflow_id = %id,
                kind = %entry.status.kind,
                path = entry.status.path().unwrap_or_default(),
                duration_ms = entry.status.duration_ms.unwrap_or_default(),
                "Workflow completed"
            ),
            Err(error) => warn!(
                workflow_id = %id,
                kind = %entry.status.kind,
                path = entry.status.path().unwrap_or_default(),
                error = %error,
                "Workflow failed"
            ),
        }

        self.retire(&mut inner, id);
        Some(state)
    }

    /// Cancel a running workflow. Best-effort: the running phase finishes its
    /// current collaborator call, but no further stage starts.
    pub fn cancel(&self, id: &str) -> Result<WorkflowInfo, WorkflowError> {
        let mut inner = self.inner.write();
        let entry = inner
            .active
            .get_mut(id)
            .ok_or_else(|| WorkflowError::NotFound { id: id.to_string() })?;

        if entry.status.state != WorkflowState::Running {
            return Err(WorkflowError::InvalidState {
                id: id.to_string(),
                actual: entry.status.state,
                expected: WorkflowState::Running,
            });
        }

        entry.lifecycle.apply(LifecycleEvent::Cancel)?;
        entry.status.state = WorkflowState::Cancelled;
        entry.status.last_error = entry.lifecycle.last_error().map(str::to_string);
        entry.status.stamp_end();
        entry.cancel.cancel();
        info!(
            workflow_id = %id,
            kind = %entry.status.kind,
            path = entry.status.path().unwrap_or_default(),
            "Workflow cancelled"
        );

        self.retire(&mut inner, id)
            .ok_or_else(|| WorkflowError::NotFound { id: id.to_string() })
    }

    pub fn status(&self, id: &str) -> Result<WorkflowStatus, WorkflowError> {
        let inner = self.inner.read();
        if let Some(entry) = inner.active.get(id) {
            return Ok(entry.status.clone());
        }
        inner
            .history
            .iter()
            .find(|info| info.id == id)
            .map(WorkflowStatus::from)
            .ok_or_else(|| WorkflowError::NotFound { id: id.to_string() })
    }

    pub fn list_active(&self) -> Vec<WorkflowInfo> {
        let inner = self.inner.read();
        let mut active: Vec<WorkflowInfo> = inner
            .active
            .values()
            .map(|entry| WorkflowInfo::from(&entry.status))
            .collect();
        active.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
        active
    }

    /// History in completion order, oldest first
    pub fn list_history(&self) -> Vec<WorkflowInfo> {
        self.inner.read().history.iter().cloned().collect()
    }

    /// Move an entry to history, evicting the oldest beyond the limit
    fn retire(&self, inner: &mut RegistryInner, id: &str) -> Option<WorkflowInfo> {
        let entry = inner.active.remove(id)?;
        let info = WorkflowInfo::from(&entry.status);
        self.metrics.record_terminal(info.state);

        inner.history.push_back(info.clone());
        while inner.history.len() > self.history_limit {
            if let Some(evicted) = inner.history.pop_front() {
                debug!(workflow_id = %evicted.id, "Evicted workflow from history");
                self.metrics.evicted.fetch_add(1, Ordering::Relaxed);
            }
        }
        Some(info)
    }
}

pub(crate) fn path_metadata(path: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(METADATA_PATH.to_string(), path.to_string())])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered(registry: &WorkflowRegistry, id: &str) {
        registry
            .register(id, WorkflowKind::Validation, path_metadata("/tmp/project"))
            .unwrap();
    }

    #[test]
    fn test_register_creates_pending_entry() {
        let registry = WorkflowRegistry::default();
        registered(&registry, "wf-1");

        let status = registry.status("wf-1").unwrap();
        assert_eq!(status.state, WorkflowState::Pending);
        assert_eq!(status.path(), Some("/tmp/project"));
        assert_eq!(registry.list_active().len(), 1);
        assert!(registry.list_history().is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let registry = WorkflowRegistry::default();
        registered(&registry, "wf-1");
        let err = registry
            .register("wf-1", WorkflowKind::Audit, BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));
    }

    #[test]
    fn test_finish_moves_to_history() {
        let registry = WorkflowRegistry::default();
        registered(&registry, "wf-1");
        registry.mark_running("wf-1").unwrap();

        let state = registry.finish("wf-1", Err("validation: broken".to_string()));
        assert_eq!(state, Some(WorkflowState::Failed));
        assert!(registry.list_active().is_empty());

        let history = registry.list_history();
        assert_eq!(history.len(), 1);
        assert!(!history[0].success);
        assert_eq!(history[0].last_error.as_deref(), Some("validation: broken"));
        assert!(history[0].end_time.is_some());

        // Lookups fall through to history
        assert_eq!(registry.status("wf-1").unwrap().state, WorkflowState::Failed);
    }

    #[test]
    fn test_cancel_errors_leave_registry_untouched() {
        let registry = WorkflowRegistry::default();
        registered(&registry, "wf-1");

        assert!(matches!(
            registry.cancel("missing").unwrap_err(),
            WorkflowError::NotFound { .. }
        ));
        assert!(matches!(
            registry.cancel("wf-1").unwrap_err(),
            WorkflowError::InvalidState { actual: WorkflowState::Pending, .. }
        ));
        assert!(registry.list_history().is_empty());
        assert_eq!(registry.status("wf-1").unwrap().state, WorkflowState::Pending);
    }

    #[test]
    fn test_cancel_running_trips_flag_and_retires() {
        let registry = WorkflowRegistry::default();
        let flag = registry
            .register("wf-1", WorkflowKind::Offline, BTreeMap::new())
            .unwrap();
        registry.mark_running("wf-1").unwrap();

        let info = registry.cancel("wf-1").unwrap();
        assert_eq!(info.state, WorkflowState::Cancelled);
        assert!(flag.is_cancelled());

        // The execute call returning later must not resurrect the entry
        assert_eq!(registry.finish("wf-1", Ok(())), None);
        assert_eq!(registry.list_history().len(), 1);
        assert_eq!(registry.status("wf-1").unwrap().state, WorkflowState::Cancelled);
    }

    #[test]
    fn test_history_evicts_in_completion_order() {
        let registry = WorkflowRegistry::new(2);
        for id in ["a", "b", "c"] {
            registered(&registry, id);
            registry.mark_running(id).unwrap();
        }
        // Complete out of start order
        registry.finish("b", Ok(()));
        registry.finish("a", Ok(()));
        registry.finish("c", Ok(()));

        let ids: Vec<String> = registry.list_history().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(registry.metrics().get_stats().evicted, 1);
    }

    #[test]
    fn test_progress_updates_metadata() {
        let registry = WorkflowRegistry::default();
        registered(&registry, "wf-1");

        let mut progress = WorkflowProgress::new("audit");
        progress.percent_complete = 70.0;
        registry.record_progress("wf-1", &progress);

        let status = registry.status("wf-1").unwrap();
        assert_eq!(status.metadata.get(METADATA_STAGE).map(String::as_str), Some("audit"));
        assert_eq!(status.metadata.get(METADATA_PERCENT).map(String::as_str), Some("70.0"));
    }
}
