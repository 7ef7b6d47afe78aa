pub mod error;
pub mod exec;
pub mod job;
pub mod lockfile;
pub mod manifest;
pub mod pm;
pub mod resolver;
pub mod runtime;
pub mod setup;
pub mod yarn;

pub use pm::PackageManager;
pub use resolver::{ResolutionSource, ResolvedTool};
