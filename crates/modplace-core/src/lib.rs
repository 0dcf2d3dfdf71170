//! modplace core library
//!
//! Deploys a package's files into an application tree from a declarative
//! source → target mapping, using symlinks, hard links or copies.

pub mod config;
pub mod deploy;
pub mod error;
pub mod fs;
pub mod mapping;
pub mod orchestration;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{InstallerConfig, InstallerSettings, PackageExtra};

    // Deployment
    pub use crate::deploy::{CleanReport, DeployReport, DeployStrategy, StrategyKind};

    // Errors
    pub use crate::error::{DeployError, DeployResult, ErrorKind};

    // Mapping
    pub use crate::mapping::{MappingSource, PathMapping};

    // Orchestration
    pub use crate::orchestration::{Installer, LifecycleReport, Package, PackageHost};
}
