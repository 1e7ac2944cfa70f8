// End-to-end resolve scenarios against a recording mock runner

mod common;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use common::{orchestrator, python_request, MockRunner};
use hookenv::cancel::Cancellation;
use hookenv::error::ErrorKind;
use hookenv::file_lock::FileLock;
use hookenv::fingerprint;
use hookenv::install_state;
use hookenv::orchestrator::ResolveRequest;

fn mode(path: &Path) -> u32 {
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}

#[tokio::test]
async fn test_python_without_dependencies() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new());
    let orchestrator = orchestrator(temp_dir.path(), runner.clone());

    let resolved = orchestrator
        .resolve(&python_request(), &Cancellation::new())
        .await
        .unwrap();

    let expected_repo = orchestrator
        .cache_dir()
        .join("repos")
        .join(fingerprint::repo_dir_name("https://example/p", "v1", &[]));
    assert_eq!(resolved.repo_path, expected_repo);
    assert_eq!(resolved.env_path, expected_repo.join("py_env-default"));
    assert_eq!(resolved.env_name, "py_env-default");
    assert_eq!(resolved.bin_path, resolved.env_path.join("bin"));

    let v1 = resolved.env_path.join(install_state::STATE_FILE_V1);
    let v2 = resolved.env_path.join(install_state::STATE_FILE_V2);
    assert_eq!(
        fs::read_to_string(&v1).unwrap(),
        r#"{"additional_dependencies": []}"#
    );
    assert_eq!(fs::metadata(&v2).unwrap().len(), 0);
    assert_eq!(mode(&v1), 0o600);
    assert_eq!(mode(&v2), 0o600);

    let repos = orchestrator.list_repos().unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].repo, "https://example/p");
    assert_eq!(repos[0].rev, "v1");
    assert_eq!(repos[0].path, expected_repo);

    assert_eq!(runner.count("git", "clone"), 1);
    assert_eq!(runner.count("git", "checkout"), 1);
    assert_eq!(runner.count("python3", "venv") + runner.count("python", "venv"), 1);
}

#[tokio::test]
async fn test_second_resolve_runs_no_subprocess() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new());
    let orchestrator = orchestrator(temp_dir.path(), runner.clone());
    let cancel = Cancellation::new();

    let first = orchestrator.resolve(&python_request(), &cancel).await.unwrap();
    let calls_after_first = runner.call_count();
    let second = orchestrator.resolve(&python_request(), &cancel).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(runner.call_count(), calls_after_first);
}

#[tokio::test]
async fn test_python_with_dependencies() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new());
    let orchestrator = orchestrator(temp_dir.path(), runner.clone());
    let request = python_request().with_additional_dependencies(["requests", "flask"]);

    let resolved = orchestrator
        .resolve(&request, &Cancellation::new())
        .await
        .unwrap();

    let requirements = resolved.env_path.join("requirements.txt");
    assert_eq!(fs::read_to_string(&requirements).unwrap(), "requests\nflask\n");
    assert_eq!(mode(&requirements), 0o600);
    assert_eq!(
        install_state::read(&resolved.env_path).unwrap(),
        Some(vec!["requests".to_string(), "flask".to_string()])
    );
    assert_eq!(runner.count("pip", "install"), 1);

    // Dependencies are part of the catalog key
    let repos = orchestrator.list_repos().unwrap();
    assert_eq!(repos.len(), 1);
    assert!(repos[0].rev.starts_with("v1:"));
}

#[tokio::test]
async fn test_node_with_version() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new());
    let orchestrator = orchestrator(temp_dir.path(), runner.clone());
    let request = ResolveRequest::new("https://example/n", "v2", "eslint", "nodejs").with_version("18");

    let resolved = orchestrator
        .resolve(&request, &Cancellation::new())
        .await
        .unwrap();

    assert_eq!(resolved.env_name, "node_env-18");
    assert_eq!(resolved.language, "node");
    assert_eq!(
        resolved.bin_path,
        resolved.env_path.join("node_modules").join(".bin")
    );
    assert!(resolved.bin_path.is_dir());

    let package_json = fs::read_to_string(resolved.env_path.join("package.json")).unwrap();
    assert!(package_json.contains("\"name\": \"pre-commit-env\""));
    assert_eq!(
        runner
            .calls()
            .iter()
            .filter(|config| config.command == "nodeenv")
            .count(),
        1
    );
    assert_eq!(runner.count("npm", "install"), 1);
}

#[tokio::test]
async fn test_system_language_uses_repository() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new());
    let orchestrator = orchestrator(temp_dir.path(), runner.clone());
    let request = ResolveRequest::new("https://example/s", "v1", "check", "system").with_version("3.11");

    let resolved = orchestrator
        .resolve(&request, &Cancellation::new())
        .await
        .unwrap();

    assert_eq!(resolved.env_name, "");
    assert_eq!(resolved.env_path, resolved.repo_path);
    assert!(!install_state::is_ready(&resolved.env_path));

    let mut entries: Vec<String> = fs::read_dir(&resolved.repo_path)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    assert_eq!(entries, vec![".git", ".pre-commit-hooks.yaml"]);
    assert_eq!(runner.call_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_resolves_clone_once() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new().with_delay(Duration::from_millis(50)));
    let orchestrator = Arc::new(orchestrator(temp_dir.path(), runner.clone()));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move {
                orchestrator
                    .resolve(&python_request(), &Cancellation::new())
                    .await
            })
        })
        .collect();

    let mut paths = Vec::new();
    for handle in handles {
        let resolved = handle.await.unwrap().unwrap();
        assert!(install_state::is_ready(&resolved.env_path));
        paths.push(resolved.env_path);
    }

    assert_eq!(paths[0], paths[1]);
    assert_eq!(runner.count("git", "clone"), 1);
    assert_eq!(runner.count("python3", "venv") + runner.count("python", "venv"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_orchestrators_share_one_cache() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new().with_delay(Duration::from_millis(30)));
    let first = Arc::new(orchestrator(temp_dir.path(), runner.clone()));
    let second = Arc::new(orchestrator(temp_dir.path(), runner.clone()));

    let a = {
        let first = Arc::clone(&first);
        tokio::spawn(async move { first.resolve(&python_request(), &Cancellation::new()).await })
    };
    let b = {
        let second = Arc::clone(&second);
        tokio::spawn(async move { second.resolve(&python_request(), &Cancellation::new()).await })
    };

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();
    assert_eq!(a.env_path, b.env_path);
    assert_eq!(runner.count("git", "clone"), 1);
}

#[tokio::test]
async fn test_recovery_after_interrupted_install() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new());
    let orchestrator = orchestrator(temp_dir.path(), runner.clone());
    let cancel = Cancellation::new();

    let resolved = orchestrator.resolve(&python_request(), &cancel).await.unwrap();
    let v1_contents =
        fs::read_to_string(resolved.env_path.join(install_state::STATE_FILE_V1)).unwrap();

    // Process died after the clone and before the install state was written
    fs::remove_file(resolved.env_path.join(install_state::STATE_FILE_V2)).unwrap();
    fs::write(resolved.env_path.join("half-written"), "junk").unwrap();

    let recovered = orchestrator.resolve(&python_request(), &cancel).await.unwrap();

    assert_eq!(recovered, resolved);
    assert!(install_state::is_ready(&recovered.env_path));
    assert!(!recovered.env_path.join("half-written").exists());
    assert_eq!(
        fs::read_to_string(recovered.env_path.join(install_state::STATE_FILE_V1)).unwrap(),
        v1_contents
    );
    assert_eq!(runner.count("git", "clone"), 1);
    assert_eq!(runner.count("python3", "venv") + runner.count("python", "venv"), 2);
}

#[tokio::test]
async fn test_unhealthy_environment_is_rebuilt() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new());
    let orchestrator = orchestrator(temp_dir.path(), runner.clone());
    let cancel = Cancellation::new();

    let resolved = orchestrator.resolve(&python_request(), &cancel).await.unwrap();
    fs::remove_dir_all(resolved.env_path.join("bin")).unwrap();

    orchestrator.resolve(&python_request(), &cancel).await.unwrap();
    assert!(resolved.env_path.join("bin").join("python").exists());
    assert_eq!(runner.count("python3", "venv") + runner.count("python", "venv"), 2);
}

#[tokio::test]
async fn test_dependency_order_changes_paths() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(temp_dir.path(), Arc::new(MockRunner::new()));

    let ab = orchestrator
        .locate(&python_request().with_additional_dependencies(["a", "b"]))
        .unwrap();
    let ba = orchestrator
        .locate(&python_request().with_additional_dependencies(["b", "a"]))
        .unwrap();
    assert_ne!(ab.env_path, ba.env_path);
}

#[tokio::test]
async fn test_uncatalogued_working_copy_is_recloned() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new());
    let orchestrator = orchestrator(temp_dir.path(), runner.clone());

    // Killed between `clone --no-checkout` and `checkout`: .git present, nothing checked out
    let located = orchestrator.locate(&python_request()).unwrap();
    fs::create_dir_all(located.repo_path.join(".git")).unwrap();

    let resolved = orchestrator
        .resolve(&python_request(), &Cancellation::new())
        .await
        .unwrap();

    assert_eq!(runner.count("git", "clone"), 1);
    assert_eq!(runner.count("git", "checkout"), 1);
    assert!(resolved.repo_path.join(".pre-commit-hooks.yaml").is_file());
    assert!(install_state::is_ready(&resolved.env_path));
    assert_eq!(orchestrator.list_repos().unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_clone_is_cleaned_up() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new());
    runner.fail_on("git", "checkout");
    let orchestrator = orchestrator(temp_dir.path(), runner.clone());
    let cancel = Cancellation::new();

    let err = orchestrator
        .resolve(&python_request(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RepoFetch);
    assert!(err.is_retryable());
    assert!(err.user_message().contains("mock failure"));

    let located = orchestrator.locate(&python_request()).unwrap();
    assert!(!located.repo_path.exists());
    assert_eq!(
        fs::read_dir(temp_dir.path().join("repos")).unwrap().count(),
        0
    );
    assert!(orchestrator.list_repos().unwrap().is_empty());

    runner.clear_failures();
    let resolved = orchestrator.resolve(&python_request(), &cancel).await.unwrap();
    assert!(install_state::is_ready(&resolved.env_path));
}

#[tokio::test]
async fn test_failed_install_leaves_no_ready_environment() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new());
    runner.fail_on("pip", "install");
    let orchestrator = orchestrator(temp_dir.path(), runner.clone());
    let cancel = Cancellation::new();
    let request = python_request().with_additional_dependencies(["nonexistent-package"]);

    let err = orchestrator.resolve(&request, &cancel).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EnvironmentBuild);
    assert!(err.user_message().contains("mock failure"));

    let located = orchestrator.locate(&request).unwrap();
    assert!(!install_state::is_ready(&located.env_path));
    assert!(!located.env_path.exists());
    // The clone itself succeeded and stays catalogued
    assert_eq!(orchestrator.list_repos().unwrap().len(), 1);

    runner.clear_failures();
    let resolved = orchestrator.resolve(&request, &cancel).await.unwrap();
    assert!(install_state::is_ready(&resolved.env_path));
    assert_eq!(runner.count("git", "clone"), 1);
}

#[tokio::test]
async fn test_cancellation_interrupts_and_releases_lock() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new().with_delay(Duration::from_secs(30)));
    let orchestrator = orchestrator(temp_dir.path(), runner.clone());
    let cancel = Cancellation::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = orchestrator
        .resolve(&python_request(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    let lock = FileLock::for_cache_root(orchestrator.cache_dir());
    assert!(lock.try_acquire().unwrap().is_some());

    let located = orchestrator.locate(&python_request()).unwrap();
    assert!(!located.repo_path.exists());
}

#[tokio::test]
async fn test_deadline_cancels_resolve() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new().with_delay(Duration::from_secs(30)));
    let orchestrator = orchestrator(temp_dir.path(), runner);

    let cancel = Cancellation::new().with_timeout(Duration::from_millis(50));
    let err = orchestrator
        .resolve(&python_request(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test]
async fn test_unsupported_language() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new());
    let orchestrator = orchestrator(temp_dir.path(), runner.clone());
    let request = ResolveRequest::new("https://example/p", "v1", "hook", "brainfuck");

    let err = orchestrator
        .resolve(&request, &Cancellation::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedLanguage);
    assert!(!err.is_retryable());
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_mark_config_used_records_once() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = orchestrator(&temp_dir.path().join("cache"), Arc::new(MockRunner::new()));
    let config = temp_dir.path().join(".pre-commit-config.yaml");
    fs::write(&config, "repos: []\n").unwrap();
    let cancel = Cancellation::new();

    let recorded = orchestrator.mark_config_used(&config, &cancel).await.unwrap();
    orchestrator.mark_config_used(&config, &cancel).await.unwrap();

    let configs = orchestrator.list_configs().unwrap();
    assert_eq!(configs, vec![recorded.clone()]);
    assert!(recorded.is_absolute());
}

#[tokio::test]
async fn test_check_health_probes_ready_environment() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new());
    let orchestrator = orchestrator(temp_dir.path(), runner.clone());
    let cancel = Cancellation::new();

    let err = orchestrator
        .check_health(&python_request(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EnvironmentBuild);
    assert_eq!(runner.call_count(), 0);

    let resolved = orchestrator.resolve(&python_request(), &cancel).await.unwrap();
    let checked = orchestrator
        .check_health(&python_request(), &cancel)
        .await
        .unwrap();
    assert_eq!(checked, resolved);

    let probe = runner.calls().pop().unwrap();
    assert_eq!(
        probe.command,
        resolved.bin_path.join("python").to_string_lossy()
    );
    assert_eq!(probe.args, vec![std::ffi::OsString::from("--version")]);
}

#[tokio::test]
async fn test_check_health_reports_failing_probe() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new());
    let orchestrator = orchestrator(temp_dir.path(), runner.clone());
    let cancel = Cancellation::new();

    orchestrator.resolve(&python_request(), &cancel).await.unwrap();
    runner.fail_on("python", "");

    let err = orchestrator
        .check_health(&python_request(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EnvironmentBuild);
    assert!(err.to_string().contains("python"));
}
