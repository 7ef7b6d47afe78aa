//! Lockfile collection and per-tool version inference.
//!
//! Each package manager leaves a different marker in its lockfile:
//! npm a `lockfileVersion` integer, yarn berry a `__metadata` key, pnpm a
//! `lockfileVersion` float. Inference maps those markers to the major
//! version of the tool that wrote the file. Inference never fails: a
//! lockfile we cannot make sense of yields the tool's default major.

use anyhow::Result;
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

use crate::pm::PackageManager;
use crate::runtime::Runtime;

/// npm major written for `lockfileVersion` >= 2.
pub const NPM_MODERN_MAJOR: u64 = 8;
/// npm major for v1 lockfiles (or ones without the field).
pub const NPM_LEGACY_MAJOR: u64 = 6;

/// yarn major for berry-lineage lockfiles.
pub const YARN_BERRY_MAJOR: u64 = 3;
/// yarn major for classic lockfiles.
pub const YARN_CLASSIC_MAJOR: u64 = 1;

/// pnpm major for lockfiles older than any known threshold band.
pub const PNPM_FALLBACK_MAJOR: u64 = 6;

/// Raw contents of the lockfiles present in a repository directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LockfileSet {
    contents: BTreeMap<PackageManager, String>,
}

impl LockfileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tool: PackageManager, content: String) {
        self.contents.insert(tool, content);
    }

    /// Lockfile content for `tool`, if the file exists.
    pub fn get(&self, tool: PackageManager) -> Option<&str> {
        self.contents.get(&tool).map(String::as_str)
    }

    /// Read whichever lockfiles exist in `dir`. Missing files are simply
    /// absent from the set.
    pub fn load(runtime: &dyn Runtime, dir: &Path) -> Result<Self> {
        let mut set = LockfileSet::new();
        for tool in PackageManager::all() {
            let path = dir.join(tool.lockfile_name());
            if runtime.exists(&path) {
                set.insert(tool, runtime.read_to_string(&path)?);
            }
        }
        Ok(set)
    }
}

/// Infer the major version of `tool` from its lockfile content.
pub fn inferred_major(tool: PackageManager, content: &str) -> u64 {
    match tool {
        PackageManager::Npm => npm_major(content),
        PackageManager::Yarn => yarn_major(content),
        PackageManager::Pnpm => pnpm_major(content),
    }
}

/// npm: `lockfileVersion` >= 2 means the modern lockfile format.
/// Malformed JSON falls back to the tool default rather than failing.
pub fn npm_major(content: &str) -> u64 {
    let parsed: serde_json::Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(e) => {
            debug!("package-lock.json did not parse ({}), using npm default", e);
            return PackageManager::Npm.default_major();
        }
    };

    match parsed.get("lockfileVersion").and_then(|v| v.as_i64()) {
        Some(version) if version >= 2 => NPM_MODERN_MAJOR,
        _ => NPM_LEGACY_MAJOR,
    }
}

/// yarn: a top-level `__metadata` key marks the berry (v2+) lineage.
pub fn yarn_is_berry(content: &str) -> bool {
    content.lines().any(|line| line.starts_with("__metadata"))
}

pub fn yarn_major(content: &str) -> u64 {
    if yarn_is_berry(content) {
        YARN_BERRY_MAJOR
    } else {
        YARN_CLASSIC_MAJOR
    }
}

/// pnpm: the `lockfileVersion` line holds a float that bands onto majors.
/// A lockfile without a parseable version line gets the tool default.
pub fn pnpm_major(content: &str) -> u64 {
    match pnpm_lockfile_version(content) {
        Some(v) if v >= 9.0 => 9,
        Some(v) if v >= 6.0 => 8,
        Some(v) if v >= 5.4 => 7,
        Some(_) => PNPM_FALLBACK_MAJOR,
        None => PackageManager::Pnpm.default_major(),
    }
}

fn pnpm_lockfile_version(content: &str) -> Option<f64> {
    let line = content
        .lines()
        .find(|line| line.trim_start().starts_with("lockfileVersion"))?;
    let value = line.split_once(':')?.1.trim();
    let value = value.trim_matches(|c| c == '\'' || c == '"');
    value.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use std::path::PathBuf;

    #[test]
    fn test_npm_modern_lockfile_versions() {
        for v in [2, 3, 9] {
            let content = format!(r#"{{"lockfileVersion": {}}}"#, v);
            assert_eq!(npm_major(&content), NPM_MODERN_MAJOR, "version {v}");
        }
    }

    #[test]
    fn test_npm_legacy_lockfile_versions() {
        assert_eq!(npm_major(r#"{"lockfileVersion": 1}"#), NPM_LEGACY_MAJOR);
        assert_eq!(npm_major(r#"{"lockfileVersion": 0}"#), NPM_LEGACY_MAJOR);
        // Field missing entirely
        assert_eq!(npm_major(r#"{"name": "app"}"#), NPM_LEGACY_MAJOR);
    }

    #[test]
    fn test_npm_malformed_json_uses_default() {
        assert_eq!(npm_major("not json at all"), PackageManager::Npm.default_major());
        assert_eq!(npm_major(""), PackageManager::Npm.default_major());
        assert_eq!(npm_major(r#"{"lockfileVersion":"#), PackageManager::Npm.default_major());
    }

    #[test]
    fn test_yarn_berry_detection() {
        let berry = "__metadata:\n  version: 6\n  cacheKey: 8\n";
        assert!(yarn_is_berry(berry));
        assert_eq!(yarn_major(berry), YARN_BERRY_MAJOR);

        let classic = "# yarn lockfile v1\n\nleft-pad@^1.3.0:\n  version \"1.3.0\"\n";
        assert!(!yarn_is_berry(classic));
        assert_eq!(yarn_major(classic), YARN_CLASSIC_MAJOR);
    }

    #[test]
    fn test_yarn_metadata_must_start_a_line() {
        // A dependency mentioning "__metadata" elsewhere is not the marker.
        let content = "something:\n  comment \"__metadata\"\n";
        assert!(!yarn_is_berry(content));
    }

    #[test]
    fn test_pnpm_banding_is_monotonic() {
        assert_eq!(pnpm_major("lockfileVersion: '9.0'"), 9);
        assert_eq!(pnpm_major("lockfileVersion: '9.1'"), 9);
        assert_eq!(pnpm_major("lockfileVersion: '6.0'"), 8);
        assert_eq!(pnpm_major("lockfileVersion: '6.1'"), 8);
        assert_eq!(pnpm_major("lockfileVersion: 5.4"), 7);
        assert_eq!(pnpm_major("lockfileVersion: 5.3"), PNPM_FALLBACK_MAJOR);
        assert_eq!(pnpm_major("lockfileVersion: 3"), PNPM_FALLBACK_MAJOR);
    }

    #[test]
    fn test_pnpm_quoting_styles() {
        assert_eq!(pnpm_major("lockfileVersion: \"6.0\""), 8);
        assert_eq!(pnpm_major("lockfileVersion: 6.0"), 8);
        assert_eq!(pnpm_major("  lockfileVersion: '5.4'"), 7);
    }

    #[test]
    fn test_pnpm_missing_version_line_uses_default() {
        assert_eq!(pnpm_major("dependencies:\n  foo: 1.0.0\n"), PackageManager::Pnpm.default_major());
        assert_eq!(pnpm_major("lockfileVersion: banana"), PackageManager::Pnpm.default_major());
        assert_eq!(pnpm_major(""), PackageManager::Pnpm.default_major());
    }

    #[test]
    fn test_lockfile_set_load_reads_present_files() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .returning(|path| path.ends_with("yarn.lock"));
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("__metadata:\n".to_string()));

        let set = LockfileSet::load(&runtime, &PathBuf::from("/repo")).unwrap();
        assert!(set.get(PackageManager::Yarn).is_some());
        assert!(set.get(PackageManager::Npm).is_none());
        assert!(set.get(PackageManager::Pnpm).is_none());
    }

    #[test]
    fn test_inferred_major_dispatch() {
        assert_eq!(
            inferred_major(PackageManager::Npm, r#"{"lockfileVersion": 3}"#),
            NPM_MODERN_MAJOR
        );
        assert_eq!(inferred_major(PackageManager::Yarn, "__metadata:\n"), YARN_BERRY_MAJOR);
        assert_eq!(inferred_major(PackageManager::Pnpm, "lockfileVersion: '9.0'"), 9);
    }
}
