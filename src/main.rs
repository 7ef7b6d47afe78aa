use anyhow::Result;
use clap::Parser;
use depup::exec::RealCommandRunner;
use depup::job::JobFile;
use depup::lockfile::LockfileSet;
use depup::manifest::Manifest;
use depup::pm::PackageManager;
use depup::runtime::RealRuntime;
use depup::setup::ToolInstaller;
use std::path::PathBuf;

/// depup - package-manager helpers for dependency updates
///
/// Resolves which npm/yarn/pnpm version a repository expects, installs and
/// configures that tool, and validates update-job descriptions.
#[derive(Parser, Debug)]
#[command(author, version = env!("DEPUP_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Resolve the expected version of a package manager
    Resolve(ResolveArgs),

    /// Install and configure the resolved package manager
    Setup(SetupArgs),

    /// Parse and validate an update-job file
    Job(JobArgs),
}

#[derive(clap::Args, Debug)]
struct ResolveArgs {
    /// Package manager to resolve
    #[arg(long, value_name = "TOOL")]
    tool: PackageManagerArg,

    /// Repository directory (also via DEPUP_DIR)
    #[arg(value_name = "DIR", env = "DEPUP_DIR", default_value = ".")]
    dir: PathBuf,
}

#[derive(clap::Args, Debug)]
struct SetupArgs {
    /// Package manager to set up
    #[arg(long, value_name = "TOOL")]
    tool: PackageManagerArg,

    /// Repository directory (also via DEPUP_DIR)
    #[arg(value_name = "DIR", env = "DEPUP_DIR", default_value = ".")]
    dir: PathBuf,

    /// Allow yarn berry to run postinstall scripts (only in a sandbox)
    #[arg(long)]
    allow_scripts: bool,
}

#[derive(clap::Args, Debug)]
struct JobArgs {
    /// Path to the job JSON file
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum PackageManagerArg {
    Npm,
    Yarn,
    Pnpm,
}

impl From<PackageManagerArg> for PackageManager {
    fn from(arg: PackageManagerArg) -> Self {
        match arg {
            PackageManagerArg::Npm => PackageManager::Npm,
            PackageManagerArg::Yarn => PackageManager::Yarn,
            PackageManagerArg::Pnpm => PackageManager::Pnpm,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;

    match cli.command {
        Commands::Resolve(args) => {
            let manifest = Manifest::load(&runtime, &args.dir)?;
            let lockfiles = LockfileSet::load(&runtime, &args.dir)?;
            let resolved = depup::resolver::resolve(&manifest, &lockfiles, args.tool.into())?;
            println!("{}", resolved);
        }
        Commands::Setup(args) => {
            let runner = RealCommandRunner;
            let mut installer = ToolInstaller::new(&runtime, &runner);
            let resolved = installer.setup(&args.dir, args.tool.into(), args.allow_scripts)?;
            println!("{}", resolved);
        }
        Commands::Job(args) => {
            let job = JobFile::load(&runtime, &args.file)?.job;
            println!("{} {}", job.package_manager, job.source.repo);
        }
    }
    Ok(())
}
