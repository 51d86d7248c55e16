// JSON/TOML project configuration files

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::types::{ConfigFormat, ProjectConfig};
use super::validator::is_semver;
use super::ConfigManager;

#[derive(Debug, Clone, Default)]
pub struct FileConfigManager;

impl FileConfigManager {
    pub fn new() -> Self {
        Self
    }

    async fn read_value(path: &Path) -> Result<Value> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value = match ConfigFormat::from_path(path) {
            ConfigFormat::Json => serde_json::from_str(&raw)
                .with_context(|| format!("Invalid JSON in {}", path.display()))?,
            ConfigFormat::Toml => {
                let table: toml::Value = toml::from_str(&raw)
                    .with_context(|| format!("Invalid TOML in {}", path.display()))?;
                serde_json::to_value(table)?
            }
        };
        Ok(value)
    }
}

/// Objects merge key by key; anything else is replaced by the overlay
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[async_trait]
impl ConfigManager for FileConfigManager {
    async fn export(&self, config: &ProjectConfig, path: &Path) -> Result<()> {
        let body = match ConfigFormat::from_path(path) {
            ConfigFormat::Json => serde_json::to_string_pretty(config)?,
            ConfigFormat::Toml => toml::to_string_pretty(config)?,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), "Exported configuration");
        Ok(())
    }

    async fn import(&self, path: &Path) -> Result<ProjectConfig> {
        let value = Self::read_value(path).await?;
        serde_json::from_value(value)
            .with_context(|| format!("{} is not a project configuration", path.display()))
    }

    async fn merge(&self, paths: &[PathBuf]) -> Result<ProjectConfig> {
        if paths.is_empty() {
            bail!("No configuration files to merge");
        }
        let mut merged = Value::Object(Default::default());
        for path in paths {
            merge_values(&mut merged, Self::read_value(path).await?);
        }
        serde_json::from_value(merged).context("Merged configuration is incomplete")
    }

    async fn validate(&self, path: &Path) -> Result<Vec<String>> {
        if !path.is_file() {
            return Ok(vec![format!("{} does not exist", path.display())]);
        }
        let config = match self.import(path).await {
            Ok(config) => config,
            Err(e) => return Ok(vec![format!("{e:#}")]),
        };

        let mut problems = Vec::new();
        if config.name.trim().is_empty() {
            problems.push("name must not be empty".to_string());
        }
        if config.template.trim().is_empty() {
            problems.push("template must not be empty".to_string());
        }
        if !is_semver(&config.version) {
            problems.push(format!("version '{}' is not semantic versioning", config.version));
        }
        Ok(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_export_import_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/project.toml");
        let config = ProjectConfig::new("demo").with_license("MIT");

        let store = FileConfigManager::new();
        store.export(&config, &path).await.unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("name = \"demo\""));
        assert_eq!(store.import(&path).await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_merge_later_files_override() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.json");
        let overlay = dir.path().join("overlay.toml");
        std::fs::write(
            &base,
            r#"{"name":"demo","license":"MIT","variables":{"a":"1","b":"2"}}"#,
        )
        .unwrap();
        std::fs::write(&overlay, "template = \"library\"\n[variables]\nb = \"3\"\n").unwrap();

        let merged = FileConfigManager::new()
            .merge(&[base, overlay])
            .await
            .unwrap();
        assert_eq!(merged.name, "demo");
        assert_eq!(merged.template, "library");
        assert_eq!(merged.license.as_deref(), Some("MIT"));
        assert_eq!(merged.variables["a"], "1");
        assert_eq!(merged.variables["b"], "3");
    }

    #[tokio::test]
    async fn test_merge_requires_paths() {
        assert!(FileConfigManager::new().merge(&[]).await.is_err());
    }

    #[tokio::test]
    async fn test_validate_reports_problems() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigManager::new();

        let missing = store.validate(&dir.path().join("nope.json")).await.unwrap();
        assert_eq!(missing.len(), 1);

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"name":"","version":"one"}"#).unwrap();
        let problems = store.validate(&bad).await.unwrap();
        assert_eq!(problems.len(), 2);

        let good = dir.path().join("good.json");
        std::fs::write(&good, r#"{"name":"demo"}"#).unwrap();
        assert!(store.validate(&good).await.unwrap().is_empty());
    }
}
