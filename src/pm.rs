//! Supported package managers and their built-in constants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A package manager whose version can be resolved and installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
}

impl PackageManager {
    /// Tool name as it appears in manifests, lockfile tables and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
        }
    }

    /// Lockfile filename written by this tool.
    pub fn lockfile_name(&self) -> &'static str {
        match self {
            PackageManager::Npm => "package-lock.json",
            PackageManager::Yarn => "yarn.lock",
            PackageManager::Pnpm => "pnpm-lock.yaml",
        }
    }

    /// Major version used when nothing in the repository pins one.
    pub fn default_major(&self) -> u64 {
        match self {
            PackageManager::Npm => 8,
            PackageManager::Yarn => 1,
            PackageManager::Pnpm => 9,
        }
    }

    pub fn all() -> [PackageManager; 3] {
        [PackageManager::Npm, PackageManager::Yarn, PackageManager::Pnpm]
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for PackageManager {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "npm" => Ok(PackageManager::Npm),
            "yarn" => Ok(PackageManager::Yarn),
            "pnpm" => Ok(PackageManager::Pnpm),
            other => Err(anyhow::anyhow!("Unknown package manager: {}", other)),
        }
    }
}
