//! Package-manager version resolution.
//!
//! A repository can pin its tool version in several overlapping places; this
//! module collapses them into a single concrete version with a documented
//! precedence:
//!
//! 1. `packageManager: "tool@X.Y.Z"` — used verbatim.
//! 2. `packageManager: "tool"` plus an `engines` entry — engine-pinned version.
//! 3. An `engines` entry alone — engine-pinned version.
//! 4. Lockfile markers — major version of the tool that wrote the lockfile.
//! 5. A hardcoded per-tool default major.
//!
//! The precedence is a single ordered chain; there are no tie-break cases
//! beyond the order above.

use anyhow::Result;
use log::debug;
use semver::Version;
use std::fmt;

use crate::error;
use crate::lockfile::{self, LockfileSet};
use crate::manifest::Manifest;
use crate::pm::PackageManager;

/// Where a resolved version came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// `packageManager` pinned `tool@X.Y.Z`.
    Declared,
    /// Pinned through an `engines` range.
    EngineRange,
    /// Inferred from lockfile format markers.
    LockfileInferred,
    /// Nothing in the repository pinned a version.
    Default,
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionSource::Declared => "declared",
            ResolutionSource::EngineRange => "engine-range",
            ResolutionSource::LockfileInferred => "lockfile-inferred",
            ResolutionSource::Default => "default",
        };
        write!(f, "{}", s)
    }
}

/// The single outcome of a resolution call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTool {
    pub tool: PackageManager,
    pub version: Version,
    pub source: ResolutionSource,
}

impl fmt::Display for ResolvedTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.tool, self.version, self.source)
    }
}

/// Resolve the version of `tool` and validate it.
///
/// This is the resolver contract: exactly one `ResolvedTool` per call, or an
/// error when the resolved version falls in a rejected band.
pub fn resolve(
    manifest: &Manifest,
    lockfiles: &LockfileSet,
    tool: PackageManager,
) -> Result<ResolvedTool> {
    let resolved = resolve_unvalidated(manifest, lockfiles, tool);
    validate(&resolved)?;
    Ok(resolved)
}

/// Resolution without the version-band check.
///
/// Installers use this so the rejection happens after the install attempt,
/// where it can name the version that was actually set up.
pub fn resolve_unvalidated(
    manifest: &Manifest,
    lockfiles: &LockfileSet,
    tool: PackageManager,
) -> ResolvedTool {
    if let Some(declared) = manifest.declared(tool) {
        if let Some(version) = declared.version {
            debug!("{} pinned by packageManager: {}", tool, version);
            return ResolvedTool {
                tool,
                version,
                source: ResolutionSource::Declared,
            };
        }
    }

    if let Some(version) = manifest.engine_version(tool) {
        debug!("{} pinned by engines: {}", tool, version);
        return ResolvedTool {
            tool,
            version,
            source: ResolutionSource::EngineRange,
        };
    }

    if let Some(content) = lockfiles.get(tool) {
        let major = lockfile::inferred_major(tool, content);
        debug!("{} inferred from lockfile: major {}", tool, major);
        return ResolvedTool {
            tool,
            version: Version::new(major, 0, 0),
            source: ResolutionSource::LockfileInferred,
        };
    }

    ResolvedTool {
        tool,
        version: Version::new(tool.default_major(), 0, 0),
        source: ResolutionSource::Default,
    }
}

/// Reject versions the platform no longer supports, however they were
/// resolved. Currently only pnpm below major 7.
pub fn validate(resolved: &ResolvedTool) -> Result<()> {
    if resolved.tool == PackageManager::Pnpm && resolved.version.major < 7 {
        return error::unsupported_pnpm(&resolved.version);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SetupError;
    use std::collections::BTreeMap;

    fn manifest(package_manager: Option<&str>, engines: &[(&str, &str)]) -> Manifest {
        Manifest {
            package_manager: package_manager.map(String::from),
            engines: engines
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn lockfiles(entries: &[(PackageManager, &str)]) -> LockfileSet {
        let mut set = LockfileSet::new();
        for (tool, content) in entries {
            set.insert(*tool, content.to_string());
        }
        set
    }

    #[test_log::test]
    fn test_declared_version_wins() {
        let m = manifest(Some("yarn@2.3.4"), &[("yarn", "1.22.19")]);
        let l = lockfiles(&[(PackageManager::Yarn, "__metadata:\n")]);

        let resolved = resolve(&m, &l, PackageManager::Yarn).unwrap();
        assert_eq!(resolved.version, Version::new(2, 3, 4));
        assert_eq!(resolved.source, ResolutionSource::Declared);
    }

    #[test]
    fn test_bare_declared_falls_to_engines() {
        let m = manifest(Some("yarn"), &[("yarn", "1.22.19")]);
        let l = LockfileSet::new();

        let resolved = resolve(&m, &l, PackageManager::Yarn).unwrap();
        assert_eq!(resolved.version, Version::new(1, 22, 19));
        assert_eq!(resolved.source, ResolutionSource::EngineRange);
    }

    #[test]
    fn test_engines_alone() {
        let m = manifest(None, &[("npm", "^8.19.2")]);
        let l = lockfiles(&[(PackageManager::Npm, r#"{"lockfileVersion": 1}"#)]);

        let resolved = resolve(&m, &l, PackageManager::Npm).unwrap();
        assert_eq!(resolved.version, Version::new(8, 19, 2));
        assert_eq!(resolved.source, ResolutionSource::EngineRange);
    }

    #[test_log::test]
    fn test_loose_engine_range_falls_to_lockfile() {
        let m = manifest(None, &[("npm", ">=6")]);
        let l = lockfiles(&[(PackageManager::Npm, r#"{"lockfileVersion": 3}"#)]);

        let resolved = resolve(&m, &l, PackageManager::Npm).unwrap();
        assert_eq!(resolved.version, Version::new(8, 0, 0));
        assert_eq!(resolved.source, ResolutionSource::LockfileInferred);
    }

    #[test]
    fn test_declared_other_tool_does_not_interfere() {
        let m = manifest(Some("yarn@3.2.1"), &[]);
        let l = lockfiles(&[(PackageManager::Npm, r#"{"lockfileVersion": 2}"#)]);

        let resolved = resolve(&m, &l, PackageManager::Npm).unwrap();
        assert_eq!(resolved.source, ResolutionSource::LockfileInferred);
        assert_eq!(resolved.version, Version::new(8, 0, 0));
    }

    #[test]
    fn test_npm_legacy_lockfile() {
        let m = Manifest::default();
        let l = lockfiles(&[(PackageManager::Npm, r#"{"lockfileVersion": 1}"#)]);

        let resolved = resolve(&m, &l, PackageManager::Npm).unwrap();
        assert_eq!(resolved.version, Version::new(6, 0, 0));
    }

    #[test]
    fn test_npm_malformed_lockfile_never_raises() {
        let m = Manifest::default();
        let l = lockfiles(&[(PackageManager::Npm, "{{{ nope")]);

        let resolved = resolve(&m, &l, PackageManager::Npm).unwrap();
        assert_eq!(resolved.version, Version::new(8, 0, 0));
        assert_eq!(resolved.source, ResolutionSource::LockfileInferred);
    }

    #[test]
    fn test_yarn_berry_lockfile() {
        let m = Manifest::default();
        let l = lockfiles(&[(PackageManager::Yarn, "__metadata:\n  version: 6\n")]);

        let resolved = resolve(&m, &l, PackageManager::Yarn).unwrap();
        assert_eq!(resolved.version, Version::new(3, 0, 0));
    }

    #[test]
    fn test_missing_lockfile_uses_default() {
        let m = Manifest::default();
        let l = LockfileSet::new();

        for (tool, major) in [
            (PackageManager::Npm, 8),
            (PackageManager::Yarn, 1),
            (PackageManager::Pnpm, 9),
        ] {
            let resolved = resolve(&m, &l, tool).unwrap();
            assert_eq!(resolved.version, Version::new(major, 0, 0), "{tool}");
            assert_eq!(resolved.source, ResolutionSource::Default);
        }
    }

    #[test]
    fn test_pnpm_below_seven_rejected() {
        let m = manifest(Some("pnpm@6.0.2"), &[]);
        let l = LockfileSet::new();

        let err = resolve(&m, &l, PackageManager::Pnpm).unwrap_err();
        match err.downcast_ref::<SetupError>() {
            Some(SetupError::ToolVersionNotSupported { version, .. }) => {
                assert_eq!(version, "6.0.2");
            }
            _ => panic!("Expected ToolVersionNotSupported, got {err:?}"),
        }
    }

    #[test]
    fn test_pnpm_ancient_lockfile_rejected() {
        let m = Manifest::default();
        let l = lockfiles(&[(PackageManager::Pnpm, "lockfileVersion: 5.3\n")]);

        let err = resolve(&m, &l, PackageManager::Pnpm).unwrap_err();
        assert!(err.downcast_ref::<SetupError>().is_some());
    }

    #[test]
    fn test_pnpm_unvalidated_still_resolves() {
        let m = manifest(Some("pnpm@6.0.2"), &[]);
        let l = LockfileSet::new();

        let resolved = resolve_unvalidated(&m, &l, PackageManager::Pnpm);
        assert_eq!(resolved.version, Version::new(6, 0, 2));
        assert!(validate(&resolved).is_err());
    }

    #[test]
    fn test_pnpm_banding_through_resolution() {
        for (lockfile_version, major) in [("9.0", 9), ("6.0", 8), ("5.4", 7)] {
            let m = Manifest::default();
            let content = format!("lockfileVersion: '{}'\n", lockfile_version);
            let l = lockfiles(&[(PackageManager::Pnpm, content.as_str())]);

            let resolved = resolve(&m, &l, PackageManager::Pnpm).unwrap();
            assert_eq!(resolved.version.major, major, "lockfileVersion {lockfile_version}");
        }
    }

    #[test]
    fn test_display() {
        let resolved = ResolvedTool {
            tool: PackageManager::Yarn,
            version: Version::new(3, 2, 1),
            source: ResolutionSource::LockfileInferred,
        };
        assert_eq!(resolved.to_string(), "yarn 3.2.1 (lockfile-inferred)");
    }
}
