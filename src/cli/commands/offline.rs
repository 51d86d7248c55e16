use anyhow::Result;
use std::path::PathBuf;

use super::{print_summary, CommandContext};
use crate::collaborators::ProjectConfig;
use crate::phases::{OfflineOptions, OfflineResult};

pub struct OfflineCommand {
    pub options: OfflineOptions,
    /// Cache directory used by `sync` and `validate`
    pub cache_dir: PathBuf,
    pub output: Option<PathBuf>,
}

impl OfflineCommand {
    pub fn new(operation: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            options: OfflineOptions::new(operation),
            cache_dir: cache_dir.into(),
            output: None,
        }
    }

    pub fn with_repair(mut self, repair: bool) -> Self {
        self.options.repair_cache = repair;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.options.force = force;
        self
    }

    pub fn with_project(
        mut self,
        name: Option<String>,
        template: Option<String>,
        output: Option<PathBuf>,
    ) -> Self {
        self.options.config = name.map(|name| {
            let config = ProjectConfig::new(name);
            match template {
                Some(template) => config.with_template(template),
                None => config,
            }
        });
        self.output = output;
        self
    }

    /// `generate` targets the project directory; everything else the cache
    fn target(&self) -> PathBuf {
        if self.options.operation != "generate" {
            return self.cache_dir.clone();
        }
        match (&self.output, &self.options.config) {
            (Some(output), _) => output.clone(),
            (None, Some(config)) => PathBuf::from(&config.name),
            (None, None) => self.cache_dir.clone(),
        }
    }

    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let target = self.target();
        if !ctx.is_json() {
            println!("📦 Offline {} ({})", self.options.operation, target.display());
        }
        let mut workflow = ctx
            .manager
            .create_offline_workflow(target, self.options.clone())?;
        ctx.run(&mut workflow, render).await?;
        Ok(())
    }
}

fn render(result: &OfflineResult) {
    if let Some(cache) = &result.cache {
        println!(
            "   🗄️  {} cached file(s), {} bytes at {}",
            cache.entries,
            cache.total_bytes,
            cache.location.display()
        );
        if let Some(last_sync) = cache.last_sync {
            println!("      last sync {}", last_sync.to_rfc3339());
        }
    }
    match result.cache_valid {
        Some(true) => println!("   ✅ Cache is valid"),
        Some(false) => println!("   ❌ Cache is invalid"),
        None => {}
    }
    if result.repaired {
        println!("   🔧 Cache repaired");
    }
    if !result.generated_files.is_empty() {
        println!("   📁 Created: {}", result.generated_files.join(", "));
    }
    print_summary(&result.summary);
}
