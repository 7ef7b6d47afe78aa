//! Manifest (`package.json`) model: declared package manager and engines.

use anyhow::{Context, Result};
use semver::{Op, Version, VersionReq};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::pm::PackageManager;
use crate::runtime::Runtime;

pub const MANIFEST_NAME: &str = "package.json";

/// The manifest fields relevant to tool-version resolution.
///
/// Everything else in `package.json` is ignored on deserialization.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Manifest {
    /// `"packageManager": "yarn@3.2.1"` or `"packageManager": "yarn"`
    #[serde(default, rename = "packageManager")]
    pub package_manager: Option<String>,
    /// `"engines": { "npm": "^8.1.0", ... }` — tool name to range string.
    #[serde(default)]
    pub engines: BTreeMap<String, String>,
}

/// A `packageManager` entry naming a specific tool.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredTool {
    pub tool: PackageManager,
    /// Present for `tool@X.Y.Z`, absent for a bare `tool`.
    pub version: Option<Version>,
}

impl Manifest {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse manifest JSON")
    }

    /// Load `package.json` from `dir`. A missing manifest is not an error;
    /// resolution then runs on lockfiles and defaults alone.
    pub fn load(runtime: &dyn Runtime, dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_NAME);
        if !runtime.exists(&path) {
            return Ok(Manifest::default());
        }
        let raw = runtime.read_to_string(&path)?;
        Self::parse(&raw)
    }

    /// The `packageManager` entry, if it names `tool`.
    ///
    /// Entries naming a different tool, or that fail to parse, are not a
    /// declaration for `tool`.
    pub fn declared(&self, tool: PackageManager) -> Option<DeclaredTool> {
        let raw = self.package_manager.as_deref()?;
        let (name, version) = match raw.split_once('@') {
            Some((name, version)) => (name, Some(version)),
            None => (raw, None),
        };
        if name != tool.name() {
            return None;
        }
        match version {
            // Build metadata (corepack hash suffixes like `+sha224.abc`) is
            // accepted by the semver parser and kept verbatim.
            Some(v) => Version::parse(v).ok().map(|version| DeclaredTool {
                tool,
                version: Some(version),
            }),
            None => Some(DeclaredTool { tool, version: None }),
        }
    }

    /// The concrete version the `engines` entry for `tool` pins, if any.
    ///
    /// An exact version string is used as-is. For a range, the first
    /// comparator yields a version only when it pins major.minor.patch
    /// (`=1.2.3`, `^1.2.3`, `~1.2.3`, `>=1.2.3`); looser ranges pin nothing.
    pub fn engine_version(&self, tool: PackageManager) -> Option<Version> {
        let range = self.engines.get(tool.name())?;

        if let Ok(version) = Version::parse(range.trim()) {
            return Some(version);
        }

        let req = VersionReq::parse(range).ok()?;
        let comparator = req.comparators.first()?;
        match comparator.op {
            Op::Exact | Op::Caret | Op::Tilde | Op::GreaterEq => {
                let minor = comparator.minor?;
                let patch = comparator.patch?;
                let mut version = Version::new(comparator.major, minor, patch);
                version.pre = comparator.pre.clone();
                Some(version)
            }
            _ => None,
        }
    }
}
