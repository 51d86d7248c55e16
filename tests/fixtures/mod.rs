// Hand-written collaborator fakes shared by the integration tests
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use scaffolder::collaborators::{
    AuditEngine, AuditOptions, AuditResult, CacheManager, CacheStats, Collaborators,
    FileConfigManager, FixResult, Generator, ProjectConfig, ReportFormat, TemplateInfo,
    TemplateManager, ValidationEngine, ValidationIssue, ValidationResult,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Lets a test hold a collaborator call open until it is released
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[derive(Default)]
pub struct FakeGenerator {
    pub existing: AtomicBool,
    pub gate: Option<Arc<Gate>>,
    pub created: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn create_project(
        &self,
        _config: &ProjectConfig,
        output_path: &Path,
    ) -> Result<Vec<String>> {
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        self.created.lock().push(output_path.to_path_buf());
        Ok(vec!["Cargo.toml".to_string(), "src".to_string()])
    }

    fn file_exists(&self, _path: &Path) -> bool {
        self.existing.load(Ordering::SeqCst)
    }

    async fn backup_existing(&self, path: &Path) -> Result<PathBuf> {
        Ok(path.with_extension("backup"))
    }
}

pub struct FakeTemplates {
    pub available: bool,
}

impl Default for FakeTemplates {
    fn default() -> Self {
        Self { available: true }
    }
}

#[async_trait]
impl TemplateManager for FakeTemplates {
    async fn list_templates(&self) -> Result<Vec<TemplateInfo>> {
        Ok(vec![TemplateInfo {
            name: "basic".to_string(),
            description: "fake".to_string(),
            files: 2,
        }])
    }

    async fn is_available(&self, _name: &str) -> Result<bool> {
        Ok(self.available)
    }

    async fn process_variables(
        &self,
        _root: &Path,
        _variables: &BTreeMap<String, String>,
    ) -> Result<usize> {
        Ok(2)
    }
}

/// Reports the same project issues on every run
#[derive(Default)]
pub struct FakeValidator {
    pub project_issues: Vec<ValidationIssue>,
    pub runs: AtomicUsize,
}

#[async_trait]
impl ValidationEngine for FakeValidator {
    async fn validate_configuration(&self, _config: &ProjectConfig) -> Result<ValidationResult> {
        Ok(ValidationResult::from_issues(Vec::new()))
    }

    async fn validate_project(&self, _path: &Path) -> Result<ValidationResult> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(ValidationResult::from_issues(self.project_issues.clone()))
    }

    fn fixable_issues(&self, issues: &[ValidationIssue]) -> Vec<ValidationIssue> {
        issues.iter().filter(|i| i.fixable).cloned().collect()
    }

    async fn fix_validation_issues(
        &self,
        _path: &Path,
        issues: &[ValidationIssue],
    ) -> Result<FixResult> {
        Ok(FixResult {
            fixed: issues.to_vec(),
            failed: Vec::new(),
        })
    }

    async fn generate_validation_report(
        &self,
        result: &ValidationResult,
        _format: ReportFormat,
    ) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(result)?)
    }
}

#[derive(Default)]
pub struct FakeAuditor {
    pub fail: bool,
}

#[async_trait]
impl AuditEngine for FakeAuditor {
    async fn audit_project(&self, _path: &Path, _options: &AuditOptions) -> Result<AuditResult> {
        if self.fail {
            return Err(anyhow!("scanner unavailable"));
        }
        Ok(AuditResult {
            score: 100,
            passed: true,
            findings: Vec::new(),
        })
    }

    async fn generate_audit_report(
        &self,
        result: &AuditResult,
        _format: ReportFormat,
    ) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(result)?)
    }
}

#[derive(Default)]
pub struct FakeCache {
    pub valid: AtomicBool,
}

#[async_trait]
impl CacheManager for FakeCache {
    async fn stats(&self) -> Result<CacheStats> {
        Ok(CacheStats {
            entries: 3,
            total_bytes: 128,
            last_sync: None,
            location: PathBuf::from("fake-cache"),
        })
    }

    async fn validate_cache(&self) -> Result<()> {
        if self.valid.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(anyhow!("cache manifest is missing"))
        }
    }

    async fn repair_cache(&self) -> Result<()> {
        self.valid.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn sync_templates(&self) -> Result<CacheStats> {
        self.valid.store(true, Ordering::SeqCst);
        self.stats().await
    }
}

/// Bundle of fakes; the config store is the real file-backed one
#[derive(Default)]
pub struct Fakes {
    pub generator: FakeGenerator,
    pub templates: FakeTemplates,
    pub validator: FakeValidator,
    pub auditor: FakeAuditor,
    pub cache: FakeCache,
}

impl Fakes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Gate>) -> Self {
        Self {
            generator: FakeGenerator {
                gate: Some(gate),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn into_collaborators(self) -> Collaborators {
        Collaborators {
            generator: Arc::new(self.generator),
            templates: Arc::new(self.templates),
            validator: Arc::new(self.validator),
            auditor: Arc::new(self.auditor),
            cache: Arc::new(self.cache),
            config_store: Arc::new(FileConfigManager::new()),
        }
    }
}
