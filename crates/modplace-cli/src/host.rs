//! Local package host backed by `[[package]]` tables in the project file.

use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use modplace_core::prelude::*;

/// Directory holding package sources when a `[[package]]` omits `source`.
const VENDOR_DIR: &str = "vendor";

/// Top-level layout of `modplace.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectFile {
    #[serde(flatten)]
    pub settings: InstallerSettings,

    #[serde(rename = "package", default)]
    pub packages: Vec<PackageEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackageEntry {
    pub name: String,

    /// Package directory, relative to the project file
    #[serde(default)]
    pub source: Option<PathBuf>,

    #[serde(default)]
    pub target_dir: Option<String>,

    #[serde(flatten)]
    pub extra: PackageExtra,
}

impl PackageEntry {
    fn to_package(&self) -> Package {
        let package = Package::new(&self.name).with_extra(self.extra.clone());
        match &self.target_dir {
            Some(dir) => package.with_target_dir(dir),
            None => package,
        }
    }
}

/// Packages already sit on disk; the host steps only verify that.
#[derive(Debug)]
pub struct LocalHost {
    base_dir: PathBuf,
    /// Packages live here instead of their declared source when set
    modman_root_dir: Option<PathBuf>,
    entries: Vec<PackageEntry>,
    /// Install path of a package until its update step runs
    previous: Option<(String, PathBuf)>,
}

impl LocalHost {
    pub fn new(base_dir: &Path, entries: &[PackageEntry]) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            modman_root_dir: None,
            entries: entries.to_vec(),
            previous: None,
        }
    }

    pub fn with_modman_root_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.modman_root_dir = dir;
        self
    }

    pub fn package(&self, name: &str) -> DeployResult<Package> {
        self.entry(name).map(PackageEntry::to_package).ok_or_else(|| {
            DeployError::configuration(format!("package '{}' is not declared", name))
        })
    }

    /// Serve `dir` as the install path of `target` until the host update step.
    pub fn register_previous(&mut self, target: &Package, dir: PathBuf) -> Package {
        self.previous = Some((target.name.clone(), dir));
        target.clone()
    }

    fn entry(&self, name: &str) -> Option<&PackageEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    fn ensure_present(&self, step: &'static str, package: &Package) -> DeployResult<()> {
        let path = self.install_path(package);
        if path.is_dir() {
            return Ok(());
        }
        Err(DeployError::Host {
            step,
            source: Box::new(io::Error::new(
                io::ErrorKind::NotFound,
                format!("package directory {} does not exist", path.display()),
            )),
        })
    }
}

impl PackageHost for LocalHost {
    fn install_path(&self, package: &Package) -> PathBuf {
        if let Some((_, dir)) = self
            .previous
            .as_ref()
            .filter(|(name, _)| *name == package.name)
        {
            return dir.clone();
        }
        if let Some(root) = &self.modman_root_dir {
            return root.join(package.modman_dir_name());
        }
        match self.entry(&package.name).and_then(|e| e.source.as_ref()) {
            Some(source) => self.base_dir.join(source),
            None => self.base_dir.join(VENDOR_DIR).join(&package.name),
        }
    }

    fn install(&mut self, package: &Package) -> DeployResult<()> {
        self.ensure_present("install", package)?;
        info!(package = %package.name, "package present");
        Ok(())
    }

    fn update(&mut self, initial: &Package, target: &Package) -> DeployResult<()> {
        if self.previous.take().is_some() {
            debug!(package = %initial.name, "switched to the current package directory");
        }
        self.ensure_present("update", target)?;
        info!(package = %target.name, "package present");
        Ok(())
    }

    fn uninstall(&mut self, package: &Package) -> DeployResult<()> {
        info!(package = %package.name, "package left in place");
        Ok(())
    }
}
