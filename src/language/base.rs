// Shared building blocks for language managers: the materialization skeleton,
// the version probe and version matching

use std::path::{Path, PathBuf};
use tracing::{debug, info, Instrument};

use crate::error::{HookEnvError, LanguageError, Result};
use crate::filesystem::FileSystem;
use crate::install_state;
use crate::logging::spans;

use super::traits::{Language, LanguageVersion, SetupContext};

/// Absent -> Created -> Installed for `language`, rolling back on failure.
///
/// A directory that is not ready (crash leftovers) or fails the structural
/// health check is removed first. Install state is written by the caller.
pub async fn materialize<L: Language + ?Sized>(language: &L, ctx: &SetupContext) -> Result<PathBuf> {
    let env_path = ctx.env_path(language.name());

    if install_state::is_ready(&env_path) && language.check_environment_health(&env_path) {
        debug!(language = language.name(), env_path = %env_path.display(), "Environment already ready");
        return Ok(env_path);
    }

    let span = spans::environment_setup_span(language.name(), &env_path);
    async {
        ctx.cancel.check("environment setup")?;

        if env_path.exists() {
            info!(env_path = %env_path.display(), "Removing incomplete environment");
            FileSystem::remove_dir_if_exists(&env_path)?;
        }
        FileSystem::create_dir_all(&env_path)?;

        let outcome = async {
            language.create_environment(ctx, &env_path).await?;
            language
                .install_dependencies(ctx, &env_path, &ctx.additional_dependencies)
                .await
        }
        .await;

        match outcome {
            Ok(()) => {
                info!(language = language.name(), "Environment installed");
                Ok(env_path.clone())
            }
            Err(e) => {
                FileSystem::discard_dir(&env_path);
                Err(e)
            }
        }
    }
    .instrument(span)
    .await
}

/// Executable inside the environment when present, otherwise the bare name for PATH lookup
pub fn environment_executable<L: Language + ?Sized>(language: &L, env_path: &Path) -> String {
    let candidate = language
        .environment_bin_path(env_path)
        .join(language.executable_name());
    if candidate.exists() {
        candidate.to_string_lossy().into_owned()
    } else {
        language.executable_name().to_string()
    }
}

/// Run `<executable> --version` and, for specific requests, compare the reported version
pub async fn version_probe<L: Language + ?Sized>(
    language: &L,
    ctx: &SetupContext,
    env_path: &Path,
    version: &LanguageVersion,
) -> Result<String> {
    let executable = environment_executable(language, env_path);
    let config = ctx.command(executable).with_arg("--version");
    let output = ctx.runner.run(&config, &ctx.cancel).await?;

    let health_failed = |message: String| {
        HookEnvError::Language(Box::new(LanguageError::HealthCheckFailed {
            language: language.name().to_string(),
            env_path: env_path.to_path_buf(),
            message,
        }))
    };

    if !output.success() {
        return Err(health_failed(format!(
            "{} failed: {}",
            config.command_line(),
            output.combined_output().trim()
        )));
    }

    let reported = output.combined_output().trim().to_string();
    if let Some(requested) = version.specific() {
        if !reported.is_empty() && !version_matches(requested, &reported) {
            return Err(HookEnvError::Language(Box::new(LanguageError::UnsupportedVersion {
                language: language.name().to_string(),
                version: requested.to_string(),
                found: Some(reported),
            })));
        }
    }
    Ok(reported)
}

/// Numeric components of the first version-looking token in `text`
fn numeric_components(text: &str) -> Vec<u64> {
    let start = match text.find(|c: char| c.is_ascii_digit()) {
        Some(start) => start,
        None => return Vec::new(),
    };
    text[start..]
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .next()
        .unwrap_or_default()
        .split('.')
        .map_while(|part| part.parse::<u64>().ok())
        .collect()
}

/// Whether `actual` satisfies the components given in `requested`.
///
/// `"3.9"` matches `"Python 3.9.18"`, `"3"` matches any 3.x, and
/// `"python3.9"` is read as `"3.9"`. A request without digits matches anything.
pub fn version_matches(requested: &str, actual: &str) -> bool {
    let wanted = numeric_components(requested);
    if wanted.is_empty() {
        return true;
    }
    let found = numeric_components(actual);
    if found.is_empty() {
        return false;
    }

    let requirement = wanted
        .iter()
        .take(3)
        .map(|part| part.to_string())
        .collect::<Vec<_>>()
        .join(".");
    let mut padded: Vec<u64> = found.iter().copied().take(3).collect();
    padded.resize(3, 0);
    let actual_version = semver::Version::new(padded[0], padded[1], padded[2]);

    match semver::VersionReq::parse(&format!("={requirement}")) {
        Ok(req) => req.matches(&actual_version),
        Err(_) => wanted.iter().zip(found.iter()).all(|(w, f)| w == f) && found.len() >= wanted.len(),
    }
}

/// First of `candidates` found on PATH
pub fn which_first(candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .find_map(|candidate| which::which(candidate).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_components() {
        assert_eq!(numeric_components("Python 3.9.18"), vec![3, 9, 18]);
        assert_eq!(numeric_components("python3.11"), vec![3, 11]);
        assert_eq!(numeric_components("v18.17.1"), vec![18, 17, 1]);
        assert_eq!(numeric_components("3.12.0rc1"), vec![3, 12, 0]);
        assert!(numeric_components("default").is_empty());
    }

    #[test]
    fn test_version_matches() {
        assert!(version_matches("3.9", "Python 3.9.18"));
        assert!(version_matches("3", "Python 3.12.1"));
        assert!(version_matches("python3.9", "Python 3.9.2"));
        assert!(version_matches("3.9.18", "3.9.18"));
        assert!(!version_matches("3.9", "Python 3.10.1"));
        assert!(!version_matches("3.1", "Python 3.10.1"));
        assert!(!version_matches("18", "v20.1.0"));
        assert!(version_matches("default", "anything"));
        assert!(!version_matches("3.9", "no digits here"));
    }
}
