// Mock collaborators for phase unit tests

use std::sync::Arc;

use crate::collaborators::{
    Collaborators, MockAuditEngine, MockCacheManager, MockConfigManager, MockGenerator,
    MockTemplateManager, MockValidationEngine,
};
use crate::workflow::{CancelFlag, ProgressChannel, ProgressTracker, WorkflowProgress};

#[derive(Default)]
pub struct Mocks {
    pub generator: MockGenerator,
    pub templates: MockTemplateManager,
    pub validator: MockValidationEngine,
    pub auditor: MockAuditEngine,
    pub cache: MockCacheManager,
    pub config_store: MockConfigManager,
}

impl Mocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_collaborators(self) -> Collaborators {
        Collaborators {
            generator: Arc::new(self.generator),
            templates: Arc::new(self.templates),
            validator: Arc::new(self.validator),
            auditor: Arc::new(self.auditor),
            cache: Arc::new(self.cache),
            config_store: Arc::new(self.config_store),
        }
    }
}

pub fn tracker() -> (ProgressTracker, ProgressChannel, CancelFlag) {
    let channel = ProgressChannel::new(WorkflowProgress::new("initialization"));
    let cancel = CancelFlag::new();
    let tracker = ProgressTracker::new("workflow_test", cancel.clone(), channel.clone());
    (tracker, channel, cancel)
}
