// End-to-end project generation against the filesystem collaborators

use scaffolder::collaborators::{Collaborators, ProjectConfig};
use scaffolder::phases::GenerationOptions;
use scaffolder::workflow::{
    ExecutionContext, WorkflowError, WorkflowManager, WorkflowRegistry, WorkflowState,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn local_manager(cache: &Path) -> WorkflowManager {
    WorkflowManager::new(
        Arc::new(WorkflowRegistry::default()),
        Collaborators::local(cache),
    )
}

fn config(name: &str, template: &str) -> ProjectConfig {
    let mut config = ProjectConfig::new(name)
        .with_template(template)
        .with_license("MIT");
    config.description = "A generated project".to_string();
    config.author = Some("Sam Doe".to_string());
    config
}

#[tokio::test]
async fn test_generates_basic_project_with_substituted_variables() {
    let dir = TempDir::new().unwrap();
    let manager = local_manager(&dir.path().join("cache"));
    let target = dir.path().join("demo");

    let mut workflow = manager
        .create_project_workflow(config("demo", "basic"), &target, None)
        .unwrap();
    let result = manager
        .execute(&mut workflow, &ExecutionContext::new())
        .await
        .unwrap();

    assert!(result.summary.success);
    assert_eq!(result.summary.progress.percent_complete, 100.0);
    assert!(result.generated_files.contains(&"Cargo.toml".to_string()));
    assert!(result.generated_files.contains(&"src".to_string()));
    assert!(result.files_processed > 0);

    let manifest = fs::read_to_string(target.join("Cargo.toml")).unwrap();
    assert!(manifest.contains("name = \"demo\""));
    assert!(manifest.contains("license = \"MIT\""));
    let readme = fs::read_to_string(target.join("README.md")).unwrap();
    assert!(readme.starts_with("# demo"));
    assert!(!readme.contains("{{"));
    let license = fs::read_to_string(target.join("LICENSE")).unwrap();
    assert!(license.contains("Sam Doe"));

    // A fresh scaffold passes its own checks
    assert!(result.validation.as_ref().unwrap().valid);
    assert!(result.audit.as_ref().unwrap().passed);
    assert!(result.summary.warnings.is_empty());
}

#[tokio::test]
async fn test_library_and_cli_templates() {
    let dir = TempDir::new().unwrap();
    let manager = local_manager(&dir.path().join("cache"));
    let ctx = ExecutionContext::new();

    let lib_target = dir.path().join("mylib");
    let mut workflow = manager
        .create_project_workflow(config("mylib", "library"), &lib_target, None)
        .unwrap();
    manager.execute(&mut workflow, &ctx).await.unwrap();
    let lib = fs::read_to_string(lib_target.join("src/lib.rs")).unwrap();
    assert!(lib.contains("\"0.1.0\""));

    let cli_target = dir.path().join("mytool");
    let mut workflow = manager
        .create_project_workflow(config("mytool", "cli"), &cli_target, None)
        .unwrap();
    manager.execute(&mut workflow, &ctx).await.unwrap();
    let main = fs::read_to_string(cli_target.join("src/main.rs")).unwrap();
    assert!(main.contains("name = \"mytool\""));
    let manifest = fs::read_to_string(cli_target.join("Cargo.toml")).unwrap();
    assert!(manifest.contains("clap"));
}

#[tokio::test]
async fn test_existing_target_requires_force() {
    let dir = TempDir::new().unwrap();
    let manager = local_manager(&dir.path().join("cache"));
    let target = dir.path().join("demo");
    fs::create_dir_all(&target).unwrap();
    fs::write(target.join("keep.txt"), "mine").unwrap();

    let mut workflow = manager
        .create_project_workflow(config("demo", "basic"), &target, None)
        .unwrap();
    let err = manager
        .execute(&mut workflow, &ExecutionContext::new())
        .await
        .unwrap_err();

    assert_eq!(err.phase_name(), Some("structure-generation"));
    assert!(err.to_string().contains("already exists"));
    assert_eq!(workflow.status().unwrap().state, WorkflowState::Failed);
    assert!(workflow.last_result().unwrap().generated_files.is_empty());
    assert!(!target.join("Cargo.toml").exists());
    assert_eq!(fs::read_to_string(target.join("keep.txt")).unwrap(), "mine");
}

#[tokio::test]
async fn test_force_with_backup_moves_existing_directory() {
    let dir = TempDir::new().unwrap();
    let manager = local_manager(&dir.path().join("cache"));
    let target = dir.path().join("demo");
    fs::create_dir_all(&target).unwrap();
    fs::write(target.join("keep.txt"), "mine").unwrap();

    let options = GenerationOptions {
        force: true,
        backup_existing: true,
        ..Default::default()
    };
    let mut workflow = manager
        .create_project_workflow(config("demo", "basic"), &target, Some(options))
        .unwrap();
    let result = manager
        .execute(&mut workflow, &ExecutionContext::new())
        .await
        .unwrap();

    let backup = result.backup_path.unwrap();
    assert!(backup
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("demo.backup-"));
    assert_eq!(fs::read_to_string(backup.join("keep.txt")).unwrap(), "mine");
    assert!(target.join("Cargo.toml").exists());
    assert!(!target.join("keep.txt").exists());
}

#[tokio::test]
async fn test_unknown_template_fails_preparation() {
    let dir = TempDir::new().unwrap();
    let manager = local_manager(&dir.path().join("cache"));
    let target = dir.path().join("demo");

    let mut workflow = manager
        .create_project_workflow(config("demo", "haskell"), &target, None)
        .unwrap();
    let err = manager
        .execute(&mut workflow, &ExecutionContext::new())
        .await
        .unwrap_err();

    assert_eq!(err.phase_name(), Some("template-preparation"));
    assert!(err.to_string().contains("'haskell' is not available"));
    assert!(!target.exists());
}

#[tokio::test]
async fn test_invalid_name_fails_configuration_validation() {
    let dir = TempDir::new().unwrap();
    let manager = local_manager(&dir.path().join("cache"));

    let mut workflow = manager
        .create_project_workflow(config("Bad Name", "basic"), dir.path().join("bad"), None)
        .unwrap();
    let err = manager
        .execute(&mut workflow, &ExecutionContext::new())
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Phase { .. }));
    assert_eq!(err.phase_name(), Some("configuration-validation"));
    let result = workflow.last_result().unwrap();
    assert_eq!(result.summary.progress.percent_complete, 10.0);
}
