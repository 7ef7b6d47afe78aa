//! Tool installation and pre-invocation setup.
//!
//! Installation goes through corepack, which mutates shared global tool
//! state. Setup therefore takes `&mut self`: two setups against the same
//! working directory must not interleave, and the borrow checker enforces
//! that for callers holding one installer.

use anyhow::Result;
use log::{debug, info};
use std::path::Path;

use crate::exec::{self, CommandRunner, Fingerprint};
use crate::lockfile::LockfileSet;
use crate::manifest::Manifest;
use crate::pm::PackageManager;
use crate::resolver::{self, ResolvedTool};
use crate::runtime::Runtime;
use crate::yarn::YarnConfigurator;

pub struct ToolInstaller<'a> {
    runtime: &'a dyn Runtime,
    runner: &'a dyn CommandRunner,
}

impl<'a> ToolInstaller<'a> {
    pub fn new(runtime: &'a dyn Runtime, runner: &'a dyn CommandRunner) -> Self {
        Self { runtime, runner }
    }

    /// Resolve, install and configure `tool` for the repository in `dir`.
    ///
    /// The version-band check runs after the install attempt, so a rejected
    /// version names the tool that was actually set up. `allow_scripts`
    /// controls whether yarn berry may run postinstall scripts; leave it
    /// false unless the install runs sandboxed.
    pub fn setup(
        &mut self,
        dir: &Path,
        tool: PackageManager,
        allow_scripts: bool,
    ) -> Result<ResolvedTool> {
        let manifest = Manifest::load(self.runtime, dir)?;
        let lockfiles = LockfileSet::load(self.runtime, dir)?;
        let resolved = resolver::resolve_unvalidated(&manifest, &lockfiles, tool);

        self.install(dir, &resolved)?;
        resolver::validate(&resolved)?;

        if tool == PackageManager::Yarn && resolved.version.major >= 2 {
            YarnConfigurator::new(self.runtime, self.runner)
                .configure_berry(dir, allow_scripts)?;
        }

        info!("Set up {}", resolved);
        Ok(resolved)
    }

    fn install(&mut self, dir: &Path, resolved: &ResolvedTool) -> Result<()> {
        let spec = format!("{}@{}", resolved.tool, resolved.version);
        debug!("Installing {} via corepack", spec);

        let install_args = exec::args(&["install", "-g", &spec]);
        let fingerprint = Fingerprint::plain("corepack", &install_args);
        self.runner
            .run("corepack", &install_args, dir, &fingerprint)?;

        let enable_args = exec::args(&["enable", resolved.tool.name()]);
        let fingerprint = Fingerprint::plain("corepack", &enable_args);
        self.runner.run("corepack", &enable_args, dir, &fingerprint)?;

        Ok(())
    }
}
