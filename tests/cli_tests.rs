// Binary-level tests: argument handling, pure commands and cache-backed listings

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

use hookenv::exit_codes;
use hookenv::fingerprint;

fn hookenv() -> Command {
    let mut cmd = Command::cargo_bin("hookenv").unwrap();
    cmd.env_remove("PRE_COMMIT_HOME")
        .env_remove("HOOKENV_NODE_PACKAGE_MANAGER")
        .env_remove("HOOKENV_SUBPROCESS_TIMEOUT_SECS")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_env_name_prints_directory_name() {
    hookenv()
        .args(["env-name", "--language", "python"])
        .assert()
        .success()
        .stdout("py_env-default\n");

    hookenv()
        .args(["env-name", "--language", "node", "--language-version", "18"])
        .assert()
        .success()
        .stdout("node_env-18\n");

    hookenv()
        .args(["env-name", "--language", "rust", "--language-version", "1.70.0"])
        .assert()
        .success()
        .stdout("rustenv-1.70.0\n");

    hookenv()
        .args(["env-name", "--language", "system"])
        .assert()
        .success()
        .stdout("\n");
}

#[test]
fn test_fingerprint_matches_library() {
    let expected = fingerprint::repo_dir_name(
        "https://example/p",
        "v1",
        &["requests".to_string(), "flask".to_string()],
    );

    hookenv()
        .args([
            "fingerprint",
            "--repo",
            "https://example/p",
            "--rev",
            "v1",
            "--additional-dependency",
            "requests",
            "--additional-dependency",
            "flask",
        ])
        .assert()
        .success()
        .stdout(format!("{expected}\n"));
}

#[test]
fn test_verbose_and_quiet_conflict() {
    hookenv()
        .args(["--verbose", "--quiet", "env-name", "--language", "python"])
        .assert()
        .code(exit_codes::CLI_ERROR)
        .stderr(predicate::str::contains("--verbose"));
}

#[test]
fn test_missing_subcommand_is_usage_error() {
    hookenv().assert().failure();
}

#[test]
fn test_generate_completion() {
    hookenv()
        .args(["generate-completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hookenv"));
}

#[test]
fn test_empty_cache_listings() {
    let temp_dir = TempDir::new().unwrap();
    let cache = temp_dir.path().join("cache");

    hookenv()
        .arg("--cache-dir")
        .arg(&cache)
        .arg("list-configs")
        .assert()
        .success()
        .stdout("");

    hookenv()
        .arg("--cache-dir")
        .arg(&cache)
        .arg("list-repos")
        .assert()
        .success()
        .stdout("");

    assert!(cache.join("README").is_file());
    assert!(cache.join(".lock").exists());
    assert!(cache.join("db.db").is_file());
}

#[test]
fn test_mark_config_then_list() {
    let temp_dir = TempDir::new().unwrap();
    let cache = temp_dir.path().join("cache");
    let config = temp_dir.path().join(".pre-commit-config.yaml");
    fs::write(&config, "repos: []\n").unwrap();
    let canonical = fs::canonicalize(&config).unwrap();

    for _ in 0..2 {
        hookenv()
            .env("PRE_COMMIT_HOME", &cache)
            .arg("mark-config")
            .arg(&config)
            .assert()
            .success()
            .stdout(format!("{}\n", canonical.display()));
    }

    hookenv()
        .env("PRE_COMMIT_HOME", &cache)
        .arg("list-configs")
        .assert()
        .success()
        .stdout(format!("{}\n", canonical.display()));
}

#[test]
fn test_install_env_unsupported_language() {
    let temp_dir = TempDir::new().unwrap();

    hookenv()
        .arg("--cache-dir")
        .arg(temp_dir.path())
        .args([
            "install-env",
            "--repo",
            "https://example/p",
            "--rev",
            "v1",
            "--language",
            "cobol",
        ])
        .assert()
        .code(exit_codes::UNSUPPORTED_LANGUAGE)
        .stderr(predicate::str::contains("cobol"));
}

#[test]
fn test_list_languages_names_every_builtin() {
    let temp_dir = TempDir::new().unwrap();

    let output = hookenv()
        .arg("--cache-dir")
        .arg(temp_dir.path())
        .arg("list-languages")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let listing = String::from_utf8(output).unwrap();

    assert_eq!(listing.lines().count(), 21);
    for name in ["python", "node", "ruby", "rust", "go", "docker_image", "system"] {
        assert!(
            listing.lines().any(|line| line.split('\t').next() == Some(name)),
            "missing {name} in:\n{listing}"
        );
    }
}

#[test]
fn test_check_env_on_empty_cache_fails() {
    let temp_dir = TempDir::new().unwrap();

    hookenv()
        .arg("--cache-dir")
        .arg(temp_dir.path())
        .args([
            "check-env",
            "--repo",
            "https://example/p",
            "--rev",
            "v1",
            "--language",
            "python",
        ])
        .assert()
        .code(exit_codes::ENVIRONMENT_BUILD_ERROR)
        .stderr(predicate::str::contains("not installed"));
}
