//! Configuration schema
//!
//! Keys mirror the package-extra block a host package manager carries, so the
//! same structs load from `modplace.toml` or from a JSON `extra` object.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::deploy::StrategyKind;
use crate::error::{DeployError, DeployResult};

/// Installer-wide settings as written by the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InstallerSettings {
    /// Application root packages are deployed into
    #[serde(default, alias = "magento-root-dir")]
    pub root_dir: Option<PathBuf>,

    /// Alternate root holding package sources
    #[serde(default)]
    pub modman_root_dir: Option<PathBuf>,

    /// symlink, link or copy
    #[serde(default, alias = "magento-deploystrategy")]
    pub deploy_strategy: Option<String>,

    /// Overwrite existing targets
    #[serde(default, alias = "magento-force", deserialize_with = "loose_bool")]
    pub force: bool,

    /// Track packages without placing them into the application root
    #[serde(default, deserialize_with = "loose_bool")]
    pub skip_package_deployment: bool,
}

/// Validated installer configuration. All paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerConfig {
    pub root_dir: PathBuf,
    pub modman_root_dir: Option<PathBuf>,
    pub strategy: StrategyKind,
    pub force: bool,
    pub skip_package_deployment: bool,
}

impl InstallerSettings {
    pub fn from_json(extra: &serde_json::Value) -> DeployResult<Self> {
        serde_json::from_value(extra.clone()).map_err(|err| {
            DeployError::configuration(format!("invalid installer settings: {}", err))
        })
    }

    /// Validate and absolutize against `base_dir` (normally the directory of
    /// the configuration file).
    pub fn resolve(&self, base_dir: &Path) -> DeployResult<InstallerConfig> {
        if !base_dir.is_absolute() {
            return Err(DeployError::configuration(format!(
                "base directory must be absolute: {}",
                base_dir.display()
            )));
        }

        let root_dir = self
            .root_dir
            .as_deref()
            .ok_or_else(|| DeployError::configuration("root-dir is not set"))?;
        let root_dir = existing_dir(base_dir, root_dir, "root-dir")?;

        let modman_root_dir = self
            .modman_root_dir
            .as_deref()
            .map(|dir| existing_dir(base_dir, dir, "modman-root-dir"))
            .transpose()?;

        let strategy = match self.deploy_strategy.as_deref() {
            Some(name) => name.parse::<StrategyKind>()?,
            None => StrategyKind::default(),
        };

        Ok(InstallerConfig {
            root_dir,
            modman_root_dir,
            strategy,
            force: self.force,
            skip_package_deployment: self.skip_package_deployment,
        })
    }
}

impl InstallerConfig {
    /// Defaults: symlink strategy, no force, deployment enabled.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            modman_root_dir: None,
            strategy: StrategyKind::default(),
            force: false,
            skip_package_deployment: false,
        }
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_modman_root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.modman_root_dir = Some(dir.into());
        self
    }

    pub fn with_skip_package_deployment(mut self, skip: bool) -> Self {
        self.skip_package_deployment = skip;
        self
    }

    /// Check the roots are absolute, existing directories.
    pub fn validate(&self) -> DeployResult<()> {
        ensure_absolute_dir(&self.root_dir, "root-dir")?;
        if let Some(dir) = &self.modman_root_dir {
            ensure_absolute_dir(dir, "modman-root-dir")?;
        }
        Ok(())
    }
}

/// Per-package mapping description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackageExtra {
    /// Ordered `[source, target]` pairs
    #[serde(default)]
    pub map: Option<Vec<(String, String)>>,

    /// Manifest path relative to the package source
    #[serde(default)]
    pub package_xml: Option<String>,
}

impl PackageExtra {
    pub fn from_json(extra: &serde_json::Value) -> DeployResult<Self> {
        serde_json::from_value(extra.clone()).map_err(|err| {
            DeployError::configuration(format!("invalid package mapping settings: {}", err))
        })
    }
}

/// Flag values as found in package-manager `extra` blocks, where
/// `"magento-force": "override"` is as common as `true`.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseBool {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Null(()),
}

/// `false`, `0`, `""`, `"0"` and null are false; any other value is true.
fn loose_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match LooseBool::deserialize(deserializer)? {
        LooseBool::Bool(value) => value,
        LooseBool::Int(value) => value != 0,
        LooseBool::Float(value) => value != 0.0,
        LooseBool::Text(value) => !(value.is_empty() || value == "0"),
        LooseBool::Null(()) => false,
    };
    Ok(value)
}

fn existing_dir(base_dir: &Path, dir: &Path, key: &str) -> DeployResult<PathBuf> {
    let raw = dir.to_string_lossy();
    let trimmed = raw.trim();
    let stripped = trimmed.trim_end_matches(['/', '\\']);
    let trimmed = if stripped.is_empty() { trimmed } else { stripped };
    if trimmed.is_empty() {
        return Err(DeployError::configuration(format!("{} is empty", key)));
    }
    let dir = base_dir.join(trimmed);
    ensure_absolute_dir(&dir, key)?;
    Ok(dir)
}

fn ensure_absolute_dir(dir: &Path, key: &str) -> DeployResult<()> {
    if !dir.is_absolute() {
        return Err(DeployError::configuration(format!(
            "{} must be an absolute path: {}",
            key,
            dir.display()
        )));
    }
    if !dir.is_dir() {
        return Err(DeployError::configuration(format!(
            "{} \"{}\" is not a valid directory",
            key,
            dir.display()
        )));
    }
    Ok(())
}
