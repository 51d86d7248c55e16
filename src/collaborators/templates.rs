// Built-in project templates and placeholder substitution

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

use super::types::TemplateInfo;
use super::TemplateManager;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

#[derive(Debug, Clone, Copy)]
pub struct TemplateFile {
    pub path: &'static str,
    pub contents: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub name: &'static str,
    pub description: &'static str,
    pub files: &'static [TemplateFile],
}

const README: TemplateFile = TemplateFile {
    path: "README.md",
    contents: "# {{name}}\n\n{{description}}\n\n## Getting started\n\nSee the project manifest for build instructions.\n",
};

const LICENSE: TemplateFile = TemplateFile {
    path: "LICENSE",
    contents: "{{license}} License\n\nCopyright (c) {{year}} {{author}}\n",
};

const RUST_GITIGNORE: TemplateFile = TemplateFile {
    path: ".gitignore",
    contents: "/target\n**/*.rs.bk\n.env\n",
};

const CARGO_MANIFEST: TemplateFile = TemplateFile {
    path: "Cargo.toml",
    contents: "[package]\nname = \"{{name}}\"\nversion = \"{{version}}\"\nedition = \"2021\"\nlicense = \"{{license}}\"\ndescription = \"{{description}}\"\n\n[dependencies]\n",
};

const BASIC_FILES: &[TemplateFile] = &[
    README,
    LICENSE,
    RUST_GITIGNORE,
    CARGO_MANIFEST,
    TemplateFile {
        path: "src/main.rs",
        contents: "fn main() {\n    println!(\"Hello from {{name}}!\");\n}\n",
    },
    TemplateFile {
        path: "tests/smoke.rs",
        contents: "#[test]\nfn smoke() {\n    assert_eq!(2 + 2, 4);\n}\n",
    },
];

const LIBRARY_FILES: &[TemplateFile] = &[
    README,
    LICENSE,
    RUST_GITIGNORE,
    CARGO_MANIFEST,
    TemplateFile {
        path: "src/lib.rs",
        contents: "//! {{description}}\n\npub fn version() -> &'static str {\n    \"{{version}}\"\n}\n",
    },
    TemplateFile {
        path: "tests/version.rs",
        contents: "#[test]\nfn reports_version() {\n    assert_eq!({{name}}::version(), \"{{version}}\");\n}\n",
    },
];

const CLI_FILES: &[TemplateFile] = &[
    README,
    LICENSE,
    RUST_GITIGNORE,
    TemplateFile {
        path: "Cargo.toml",
        contents: "[package]\nname = \"{{name}}\"\nversion = \"{{version}}\"\nedition = \"2021\"\nlicense = \"{{license}}\"\ndescription = \"{{description}}\"\n\n[dependencies]\nclap = { version = \"4\", features = [\"derive\"] }\n",
    },
    TemplateFile {
        path: "src/main.rs",
        contents: "use clap::Parser;\n\n/// {{description}}\n#[derive(Parser)]\n#[command(name = \"{{name}}\", version = \"{{version}}\")]\nstruct Cli {\n    /// Who to greet\n    #[arg(default_value = \"world\")]\n    name: String,\n}\n\nfn main() {\n    let cli = Cli::parse();\n    println!(\"Hello, {}!\", cli.name);\n}\n",
    },
    TemplateFile {
        path: "tests/cli.rs",
        contents: "#[test]\nfn binary_is_built() {\n    assert!(!env!(\"CARGO_PKG_NAME\").is_empty());\n}\n",
    },
];

const TEMPLATES: &[Template] = &[
    Template {
        name: "basic",
        description: "Rust binary with a smoke test",
        files: BASIC_FILES,
    },
    Template {
        name: "library",
        description: "Rust library crate",
        files: LIBRARY_FILES,
    },
    Template {
        name: "cli",
        description: "Rust command-line tool built on clap",
        files: CLI_FILES,
    },
];

/// The template set compiled into the binary
#[derive(Debug, Clone, Default)]
pub struct BuiltinTemplates;

impl BuiltinTemplates {
    pub fn new() -> Self {
        Self
    }

    pub fn get(&self, name: &str) -> Option<&'static Template> {
        TEMPLATES.iter().find(|template| template.name == name)
    }

    pub fn all(&self) -> &'static [Template] {
        TEMPLATES
    }
}

/// Replace known placeholders, leaving unknown ones intact
pub fn substitute(contents: &str, variables: &BTreeMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(contents, |caps: &Captures| match variables.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn collect_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

#[async_trait]
impl TemplateManager for BuiltinTemplates {
    async fn list_templates(&self) -> Result<Vec<TemplateInfo>> {
        Ok(TEMPLATES
            .iter()
            .map(|template| TemplateInfo {
                name: template.name.to_string(),
                description: template.description.to_string(),
                files: template.files.len(),
            })
            .collect())
    }

    async fn is_available(&self, name: &str) -> Result<bool> {
        Ok(self.get(name).is_some())
    }

    async fn process_variables(
        &self,
        root: &Path,
        variables: &BTreeMap<String, String>,
    ) -> Result<usize> {
        let mut rewritten = 0;
        for file in collect_files(root) {
            // Binary files are left alone
            let Ok(contents) = tokio::fs::read_to_string(&file).await else {
                continue;
            };
            let rendered = substitute(&contents, variables);
            if rendered != contents {
                tokio::fs::write(&file, rendered)
                    .await
                    .with_context(|| format!("Failed to write {}", file.display()))?;
                rewritten += 1;
            }
        }
        tracing::debug!(root = %root.display(), rewritten, "Processed template variables");
        Ok(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("name".to_string(), "demo".to_string()),
            ("version".to_string(), "1.2.3".to_string()),
        ])
    }

    #[test]
    fn test_substitute_known_and_unknown() {
        let rendered = substitute("{{name}} v{{ version }} by {{author}}", &vars());
        assert_eq!(rendered, "demo v1.2.3 by {{author}}");
    }

    #[tokio::test]
    async fn test_availability() {
        let templates = BuiltinTemplates::new();
        assert!(templates.is_available("basic").await.unwrap());
        assert!(templates.is_available("library").await.unwrap());
        assert!(!templates.is_available("cobol").await.unwrap());
        assert_eq!(templates.list_templates().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_process_variables_rewrites_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "# {{name}}\n").unwrap();
        std::fs::write(dir.path().join("plain.txt"), "nothing here\n").unwrap();

        let count = BuiltinTemplates::new()
            .process_variables(dir.path(), &vars())
            .await
            .unwrap();

        assert_eq!(count, 1);
        let readme = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert_eq!(readme, "# demo\n");
    }
}
