//! Collaborator contracts.
//!
//! Phase workflows call into these engines but never implement them. Each
//! trait is object safe and `Send + Sync` so a [`Collaborators`] bundle can be
//! shared between every workflow the manager creates. Under `cfg(test)` (or
//! the `testing` feature) `mockall` generates a `Mock*` type for each trait.
//!
//! The `local` implementations in the submodules back the `scaffolder`
//! binary: built-in templates, a filesystem generator, structural validator,
//! heuristic auditor, on-disk template cache and a JSON/TOML config store.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

pub mod auditor;
pub mod cache;
pub mod config_store;
pub mod generator;
pub mod templates;
pub mod types;
pub mod validator;

pub use auditor::ProjectAuditor;
pub use cache::{CacheError, FsCacheManager};
pub use config_store::FileConfigManager;
pub use generator::FsProjectGenerator;
pub use templates::BuiltinTemplates;
pub use types::*;
pub use validator::StructureValidator;

/// Writes a project skeleton to disk
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    /// Create the project and return the generated top-level entries
    async fn create_project(&self, config: &ProjectConfig, output_path: &Path)
        -> Result<Vec<String>>;

    fn file_exists(&self, path: &Path) -> bool;

    /// Move an existing directory out of the way, returning where it went
    async fn backup_existing(&self, path: &Path) -> Result<PathBuf>;
}

/// Template availability and variable substitution
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait TemplateManager: Send + Sync {
    async fn list_templates(&self) -> Result<Vec<TemplateInfo>>;

    async fn is_available(&self, name: &str) -> Result<bool>;

    /// Substitute `{{var}}` placeholders under `root`; returns files rewritten
    async fn process_variables(
        &self,
        root: &Path,
        variables: &BTreeMap<String, String>,
    ) -> Result<usize>;
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ValidationEngine: Send + Sync {
    async fn validate_configuration(&self, config: &ProjectConfig) -> Result<ValidationResult>;

    async fn validate_project(&self, path: &Path) -> Result<ValidationResult>;

    fn fixable_issues(&self, issues: &[ValidationIssue]) -> Vec<ValidationIssue>;

    async fn fix_validation_issues(
        &self,
        path: &Path,
        issues: &[ValidationIssue],
    ) -> Result<FixResult>;

    async fn generate_validation_report(
        &self,
        result: &ValidationResult,
        format: ReportFormat,
    ) -> Result<Vec<u8>>;
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait AuditEngine: Send + Sync {
    async fn audit_project(&self, path: &Path, options: &AuditOptions) -> Result<AuditResult>;

    async fn generate_audit_report(
        &self,
        result: &AuditResult,
        format: ReportFormat,
    ) -> Result<Vec<u8>>;
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait CacheManager: Send + Sync {
    async fn stats(&self) -> Result<CacheStats>;

    async fn validate_cache(&self) -> Result<()>;

    async fn repair_cache(&self) -> Result<()>;

    /// Populate the cache with every known template
    async fn sync_templates(&self) -> Result<CacheStats>;
}

/// Persisted project configuration files
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ConfigManager: Send + Sync {
    async fn export(&self, config: &ProjectConfig, path: &Path) -> Result<()>;

    async fn import(&self, path: &Path) -> Result<ProjectConfig>;

    /// Merge files in order; later files override earlier ones
    async fn merge(&self, paths: &[PathBuf]) -> Result<ProjectConfig>;

    /// Problems found in the file; empty when valid
    async fn validate(&self, path: &Path) -> Result<Vec<String>>;
}

/// Every collaborator a workflow may need
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn Generator>,
    pub templates: Arc<dyn TemplateManager>,
    pub validator: Arc<dyn ValidationEngine>,
    pub auditor: Arc<dyn AuditEngine>,
    pub cache: Arc<dyn CacheManager>,
    pub config_store: Arc<dyn ConfigManager>,
}

impl Collaborators {
    /// Filesystem-backed collaborators rooted at `cache_dir` for the cache
    pub fn local(cache_dir: impl Into<PathBuf>) -> Self {
        let templates = Arc::new(BuiltinTemplates::new());
        Self {
            generator: Arc::new(FsProjectGenerator::new(templates.clone())),
            cache: Arc::new(FsCacheManager::new(cache_dir, templates.clone())),
            templates,
            validator: Arc::new(StructureValidator::new()),
            auditor: Arc::new(ProjectAuditor::new()),
            config_store: Arc::new(FileConfigManager::new()),
        }
    }
}
