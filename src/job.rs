//! Job-record deserialization.
//!
//! An update run is described by a JSON document with a top-level `job`
//! object. This is a data-transfer contract: unknown fields are tolerated
//! everywhere, and the experiments map is deliberately open so the platform
//! can ship flags this consumer has never heard of.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::runtime::Runtime;

/// Top-level wrapper: `{ "job": { ... } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub job: Job,
}

/// One dependency-update job.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub package_manager: String,
    #[serde(default)]
    pub allowed_updates: Vec<AllowedUpdate>,
    #[serde(default)]
    pub dependency_groups: Vec<DependencyGroup>,
    #[serde(default)]
    pub existing_pull_requests: Vec<Vec<ExistingDependency>>,
    #[serde(default)]
    pub existing_group_pull_requests: Vec<ExistingGroupPullRequest>,
    #[serde(default)]
    pub ignore_conditions: Vec<IgnoreCondition>,
    #[serde(default)]
    pub experiments: Experiments,
    pub source: Source,
    #[serde(default)]
    pub lockfile_only: bool,
    #[serde(default)]
    pub update_subdependencies: bool,
    #[serde(default)]
    pub vendor_dependencies: bool,
    #[serde(default)]
    pub reject_external_code: bool,
    #[serde(default)]
    pub security_updates_only: bool,
}

/// Which updates the job is allowed to open.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllowedUpdate {
    #[serde(default)]
    pub dependency_type: Option<String>,
    #[serde(default)]
    pub dependency_name: Option<String>,
    #[serde(default)]
    pub update_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DependencyGroup {
    pub name: String,
    #[serde(default)]
    pub applies_to: Option<String>,
    /// Group rules are matched elsewhere; kept structurally opaque here.
    #[serde(default)]
    pub rules: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExistingDependency {
    #[serde(rename = "dependency-name")]
    pub dependency_name: String,
    #[serde(default, rename = "dependency-version")]
    pub dependency_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExistingGroupPullRequest {
    #[serde(rename = "dependency-group-name")]
    pub dependency_group_name: String,
    #[serde(default)]
    pub dependencies: Vec<ExistingDependency>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IgnoreCondition {
    #[serde(rename = "dependency-name")]
    pub dependency_name: String,
    #[serde(default, rename = "version-requirement")]
    pub version_requirement: Option<String>,
    #[serde(default, rename = "update-types")]
    pub update_types: Vec<String>,
}

/// Where the dependency files live.
///
/// `provider` and `repo` are required; a job file without them fails
/// deserialization outright.
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub provider: String,
    pub repo: String,
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default, rename = "api-endpoint")]
    pub api_endpoint: Option<String>,
}

/// Open map of experiment flags.
///
/// Only recognized flags affect behavior; unknown keys and non-boolean
/// values are carried but ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Experiments(BTreeMap<String, serde_json::Value>);

impl Experiments {
    /// Whether a flag is enabled. Accepts `true` or the string `"true"`,
    /// mirroring how the platform serializes flags.
    pub fn enabled(&self, name: &str) -> bool {
        match self.0.get(name) {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s == "true",
            _ => false,
        }
    }
}

impl JobFile {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse job file")
    }

    pub fn load(runtime: &dyn Runtime, path: &Path) -> Result<Self> {
        let raw = runtime.read_to_string(path)?;
        Self::parse(&raw)
    }
}

impl Job {
    /// Directory the update runs in, defaulting to the repository root.
    pub fn directory(&self) -> &str {
        self.source.directory.as_deref().unwrap_or("/")
    }
}
