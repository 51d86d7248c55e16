use anyhow::Result;
use ::config::{builder::DefaultState, Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::workflow::DEFAULT_HISTORY_LIMIT;

pub const CONFIG_FILE: &str = "scaffolder.toml";
pub const RC_FILE: &str = ".scaffolder-rc";
pub const ENV_PREFIX: &str = "SCAFFOLDER";

/// Main configuration structure for the scaffolder
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScaffolderConfig {
    pub workflows: WorkflowSettings,
    pub cache: CacheSettings,
    pub templates: TemplateSettings,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkflowSettings {
    /// Terminal workflows kept in history
    pub history_limit: usize,
    /// Deadline applied to each execute call; unset means none
    pub stage_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheSettings {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TemplateSettings {
    pub default_template: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit JSON log lines instead of compact text
    pub json_logs: bool,
}

impl Default for ScaffolderConfig {
    fn default() -> Self {
        Self {
            workflows: WorkflowSettings {
                history_limit: DEFAULT_HISTORY_LIMIT,
                stage_timeout_seconds: None,
            },
            cache: CacheSettings {
                dir: PathBuf::from(".scaffolder/cache"),
            },
            templates: TemplateSettings {
                default_template: "basic".to_string(),
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: false,
            },
        }
    }
}

impl WorkflowSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.stage_timeout_seconds.map(Duration::from_secs)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl ScaffolderConfig {
    /// Layered sources, lowest precedence first:
    /// 1. Default values
    /// 2. Configuration files (scaffolder.toml, .scaffolder-rc) in `dir`
    /// 3. Environment variables (SCAFFOLDER_<SECTION>__<KEY>)
    fn builder(dir: &Path) -> Result<ConfigBuilder<DefaultState>> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        let file = dir.join(CONFIG_FILE);
        if file.exists() {
            builder = builder.add_source(File::from(file).format(FileFormat::Toml));
        }

        let rc = dir.join(RC_FILE);
        if rc.exists() {
            builder = builder.add_source(File::from(rc).format(FileFormat::Toml));
        }

        Ok(builder)
    }

    /// Load configuration with files looked up in `dir`
    pub fn load_from(dir: &Path) -> Result<Self> {
        let config = Self::builder(dir)?.add_source(environment()).build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load configuration from the current directory and environment
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::debug!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<ScaffolderConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = ScaffolderConfig::load_env_file();
        ScaffolderConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static ScaffolderConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<&'static ScaffolderConfig> {
    let config = config()?;
    tracing::debug!(
        history_limit = config.workflows.history_limit,
        cache_dir = %config.cache.dir.display(),
        "Configuration loaded"
    );
    Ok(config)
}
