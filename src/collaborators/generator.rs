// Filesystem project generator

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::templates::BuiltinTemplates;
use super::types::ProjectConfig;
use super::Generator;

/// Writes the raw files of a built-in template. Placeholders are left for
/// the template manager to substitute.
#[derive(Debug, Clone)]
pub struct FsProjectGenerator {
    templates: Arc<BuiltinTemplates>,
}

impl FsProjectGenerator {
    pub fn new(templates: Arc<BuiltinTemplates>) -> Self {
        Self { templates }
    }
}

fn top_level_entry(relative: &str) -> Option<String> {
    match Path::new(relative).components().next()? {
        Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
        _ => None,
    }
}

fn backup_path(path: &Path, attempt: usize) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("project"));
    name.push(format!(".backup-{}", Utc::now().format("%Y%m%d%H%M%S")));
    if attempt > 0 {
        name.push(format!("-{attempt}"));
    }
    path.with_file_name(name)
}

#[async_trait]
impl Generator for FsProjectGenerator {
    async fn create_project(
        &self,
        config: &ProjectConfig,
        output_path: &Path,
    ) -> Result<Vec<String>> {
        let template = self
            .templates
            .get(&config.template)
            .ok_or_else(|| anyhow!("Unknown template: {}", config.template))?;

        tokio::fs::create_dir_all(output_path)
            .await
            .with_context(|| format!("Failed to create {}", output_path.display()))?;

        let mut entries = BTreeSet::new();
        for file in template.files {
            let target = output_path.join(file.path);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, file.contents)
                .await
                .with_context(|| format!("Failed to write {}", target.display()))?;
            debug!(file = %target.display(), "Wrote template file");

            if let Some(entry) = top_level_entry(file.path) {
                entries.insert(entry);
            }
        }

        info!(
            template = template.name,
            path = %output_path.display(),
            files = template.files.len(),
            "Generated project structure"
        );
        Ok(entries.into_iter().collect())
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    async fn backup_existing(&self, path: &Path) -> Result<PathBuf> {
        let mut attempt = 0;
        let mut target = backup_path(path, attempt);
        while tokio::fs::try_exists(&target).await.unwrap_or(false) {
            attempt += 1;
            target = backup_path(path, attempt);
        }

        tokio::fs::rename(path, &target).await.with_context(|| {
            format!("Failed to move {} to {}", path.display(), target.display())
        })?;
        info!(from = %path.display(), to = %target.display(), "Backed up existing directory");
        Ok(target)
    }
}
