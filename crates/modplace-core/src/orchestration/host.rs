//! What the installer needs from the host package manager.

use std::path::PathBuf;

use crate::config::PackageExtra;
use crate::error::DeployResult;

/// A resolved package as handed over by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// `vendor/name`
    pub name: String,
    /// Directory name below the modman root, when the package declares one
    pub target_dir: Option<String>,
    pub extra: PackageExtra,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_dir: None,
            extra: PackageExtra::default(),
        }
    }

    pub fn with_extra(mut self, extra: PackageExtra) -> Self {
        self.extra = extra;
        self
    }

    pub fn with_target_dir(mut self, target_dir: impl Into<String>) -> Self {
        self.target_dir = Some(target_dir.into());
        self
    }

    /// Directory name used below a modman root: the declared target dir, or
    /// the part of the name after `vendor/`.
    pub fn modman_dir_name(&self) -> &str {
        match self.target_dir.as_deref() {
            Some(dir) if !dir.trim().is_empty() => dir,
            _ => self
                .name
                .split_once('/')
                .map(|(_, name)| name)
                .unwrap_or(&self.name),
        }
    }
}

/// Host capabilities consumed by the installer.
///
/// The lifecycle methods perform the host's own work (fetching, unpacking,
/// removing the package directory); deployment into the application root is
/// layered around them by [`super::Installer`].
pub trait PackageHost {
    /// Absolute directory holding the package's files.
    fn install_path(&self, package: &Package) -> PathBuf;

    fn install(&mut self, package: &Package) -> DeployResult<()>;

    fn update(&mut self, initial: &Package, target: &Package) -> DeployResult<()>;

    fn uninstall(&mut self, package: &Package) -> DeployResult<()>;
}
