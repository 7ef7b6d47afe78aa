//! Typed error kinds for tool setup, with data-driven stderr classification.

use anyhow::Result;

/// Errors raised while installing or configuring a package manager.
#[derive(Debug)]
pub enum SetupError {
    /// The repository's tooling configuration is broken (bad yarnPath,
    /// invalid .yarnrc.yml values, unrecognized settings).
    MisconfiguredTooling(String),
    /// The resolved tool version falls in an explicitly rejected band.
    ToolVersionNotSupported {
        tool: String,
        version: String,
        detail: String,
    },
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::MisconfiguredTooling(msg) => {
                write!(f, "Misconfigured tooling: {}", msg)
            }
            SetupError::ToolVersionNotSupported {
                tool,
                version,
                detail,
            } => {
                write!(f, "{} {} is not supported: {}", tool, version, detail)
            }
        }
    }
}

impl std::error::Error for SetupError {}

/// Known stderr signatures that indicate a broken tooling configuration
/// rather than a transient failure.
///
/// Kept as a table so new signatures are one line, not another branch.
const MISCONFIGURED_TOOLING_PATTERNS: &[&str] = &[
    // yarnPath in .yarnrc.yml points at a file that is not there
    "Unable to locate yarnPath file",
    "could not find a release script",
    // invalid .yarnrc.yml contents
    "Invalid value type",
    "Unrecognized or legacy configuration settings found",
    "expected a string (in configuration file)",
    // npm refusing a malformed .npmrc
    "Invalid configuration option",
];

/// Yarn berry's complaint about an unresolved `${VAR}` placeholder in a
/// configuration file. This one is recoverable: see `yarn::configure`.
pub const ENV_PLACEHOLDER_PATTERN: &str = "Environment variable not found";

/// Classify captured subprocess stderr against the known signature table.
///
/// Returns the matching typed error, or `None` when the failure is not one
/// we recognize (callers re-raise those unchanged).
pub fn classify_stderr(stderr: &str) -> Option<SetupError> {
    MISCONFIGURED_TOOLING_PATTERNS
        .iter()
        .find(|pattern| stderr.contains(*pattern))
        .map(|pattern| {
            SetupError::MisconfiguredTooling(format!(
                "subprocess output matched \"{}\"",
                pattern
            ))
        })
}

/// True when stderr carries the recoverable unresolved-placeholder signature.
pub fn is_env_placeholder_failure(stderr: &str) -> bool {
    stderr.contains(ENV_PLACEHOLDER_PATTERN)
}

/// Map a failed subprocess result onto a typed error when its stderr matches
/// a known signature; otherwise return the original error unchanged.
pub fn classify_failure(err: anyhow::Error, stderr: &str) -> anyhow::Error {
    match classify_stderr(stderr) {
        Some(typed) => anyhow::Error::from(typed),
        None => err,
    }
}

/// Convenience for the pnpm version band rejection.
pub fn unsupported_pnpm(version: &semver::Version) -> Result<()> {
    Err(anyhow::Error::from(SetupError::ToolVersionNotSupported {
        tool: "pnpm".to_string(),
        version: version.to_string(),
        detail: "pnpm versions below 7 are no longer supported".to_string(),
    }))
}
