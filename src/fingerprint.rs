// Stable on-disk keys: repository fingerprints, dependency suffixes and environment names
use sha2::{Digest, Sha256};
use std::path::Path;

/// Number of hex digits kept from each SHA-256 digest
pub const FINGERPRINT_LEN: usize = 12;

/// Version string used when the caller does not request one
pub const DEFAULT_VERSION: &str = "default";

/// Languages that run straight from the repository without an environment directory
pub const NO_ENVIRONMENT_LANGUAGES: &[&str] = &["system", "script", "fail", "pygrep", "docker_image"];

fn truncated_hex(hasher: Sha256) -> String {
    let digest = hex::encode(hasher.finalize());
    digest[..FINGERPRINT_LEN].to_string()
}

/// 12-hex-digit key over `url \0 ref \0 dep1 \0 dep2 ...`.
///
/// No case folding or trimming is applied and dependency order is significant.
pub fn repo_fingerprint(url: &str, rev: &str, deps: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update([0u8]);
    hasher.update(rev.as_bytes());
    hasher.update([0u8]);
    for (index, dep) in deps.iter().enumerate() {
        if index > 0 {
            hasher.update([0u8]);
        }
        hasher.update(dep.as_bytes());
    }
    truncated_hex(hasher)
}

/// Directory name for a cloned repository under `<root>/repos/`
pub fn repo_dir_name(url: &str, rev: &str, deps: &[String]) -> String {
    format!("repo{}", repo_fingerprint(url, rev, deps))
}

/// Suffix appended to `ref` in catalog keys; empty when there are no deps
pub fn env_fingerprint(deps: &[String]) -> String {
    if deps.is_empty() {
        return String::new();
    }
    let mut hasher = Sha256::new();
    hasher.update(deps.join("\0").as_bytes());
    format!(":{}", truncated_hex(hasher))
}

/// The `ref` column value for a (ref, deps) pair
pub fn catalog_ref(rev: &str, deps: &[String]) -> String {
    format!("{rev}{}", env_fingerprint(deps))
}

/// Map language aliases onto the registry's canonical names
pub fn canonical_language(language: &str) -> String {
    let lowered = language.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "python3" => "python".to_string(),
        "nodejs" => "node".to_string(),
        "golang" => "go".to_string(),
        ".net" => "dotnet".to_string(),
        _ => lowered,
    }
}

/// `<lang>env-<version>`, or an empty string for languages without an environment.
///
/// `python` becomes `py_` and `node` becomes `node_`; an empty version
/// is written as `default`.
pub fn environment_name(language: &str, version: &str) -> String {
    let canonical = canonical_language(language);
    if NO_ENVIRONMENT_LANGUAGES.contains(&canonical.as_str()) {
        return String::new();
    }

    let prefix = match canonical.as_str() {
        "python" => "py_".to_string(),
        "node" => "node_".to_string(),
        other => other.to_string(),
    };
    let version = if version.is_empty() {
        DEFAULT_VERSION
    } else {
        version
    };
    format!("{prefix}env-{version}")
}

/// Image tag for docker hooks built from `repo_path`
pub fn docker_image_tag(repo_path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(repo_path.to_string_lossy().as_bytes());
    format!("pre-commit-{}", truncated_hex(hasher))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_repo_fingerprint_shape() {
        let fp = repo_fingerprint("https://example/p", "v1", &[]);
        assert_eq!(fp.len(), FINGERPRINT_LEN);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(repo_dir_name("https://example/p", "v1", &[]), format!("repo{fp}"));
    }

    #[test]
    fn test_repo_fingerprint_matches_manual_digest() {
        let mut hasher = Sha256::new();
        hasher.update(b"https://example/p\0v1\0requests\0flask");
        let expected = &hex::encode(hasher.finalize())[..12];
        assert_eq!(
            repo_fingerprint("https://example/p", "v1", &deps(&["requests", "flask"])),
            expected
        );

        let mut bare = Sha256::new();
        bare.update(b"https://example/p\0v1\0");
        assert_eq!(
            repo_fingerprint("https://example/p", "v1", &[]),
            &hex::encode(bare.finalize())[..12]
        );
    }

    #[test]
    fn test_repo_fingerprint_order_and_case_sensitive() {
        let ab = repo_fingerprint("u", "r", &deps(&["a", "b"]));
        let ba = repo_fingerprint("u", "r", &deps(&["b", "a"]));
        assert_ne!(ab, ba);
        assert_ne!(
            repo_fingerprint("https://Example/p", "v1", &[]),
            repo_fingerprint("https://example/p", "v1", &[])
        );
        assert_ne!(
            repo_fingerprint("u", "v1 ", &[]),
            repo_fingerprint("u", "v1", &[])
        );
    }

    #[test]
    fn test_env_fingerprint() {
        assert_eq!(env_fingerprint(&[]), "");
        assert_eq!(catalog_ref("v1", &[]), "v1");

        let suffix = env_fingerprint(&deps(&["requests"]));
        assert!(suffix.starts_with(':'));
        assert_eq!(suffix.len(), 1 + FINGERPRINT_LEN);
        assert_eq!(catalog_ref("v1", &deps(&["requests"])), format!("v1{suffix}"));
        assert_ne!(
            env_fingerprint(&deps(&["a", "b"])),
            env_fingerprint(&deps(&["b", "a"]))
        );
    }

    #[test]
    fn test_environment_name() {
        assert_eq!(environment_name("python", "default"), "py_env-default");
        assert_eq!(environment_name("python3", ""), "py_env-default");
        assert_eq!(environment_name("nodejs", "18"), "node_env-18");
        assert_eq!(environment_name("node", "default"), "node_env-default");
        assert_eq!(environment_name("golang", "1.21"), "goenv-1.21");
        assert_eq!(environment_name(".net", "default"), "dotnetenv-default");
        assert_eq!(environment_name("Ruby", "3.2"), "rubyenv-3.2");
        for language in ["system", "script", "fail", "pygrep"] {
            assert_eq!(environment_name(language, "anything"), "");
        }
    }

    #[test]
    fn test_docker_image_tag() {
        let tag = docker_image_tag(Path::new("/cache/repos/repoabc"));
        assert!(tag.starts_with("pre-commit-"));
        assert_eq!(tag.len(), "pre-commit-".len() + FINGERPRINT_LEN);
        assert_eq!(tag, docker_image_tag(Path::new("/cache/repos/repoabc")));
    }
}
