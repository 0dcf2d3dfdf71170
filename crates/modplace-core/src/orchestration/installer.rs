//! Install / update / uninstall lifecycle around the host's own steps.

use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::config::InstallerConfig;
use crate::deploy::{CleanReport, DeployReport, DeployStrategy};
use crate::error::{DeployError, DeployResult};
use crate::mapping::{MODMAN_FILE, MappingSource, PathMapping};

use super::host::{Package, PackageHost};

#[derive(Debug, Clone, Default, Serialize)]
pub struct LifecycleReport {
    pub package: String,
    /// Set when previously placed mappings were removed
    pub cleaned: Option<CleanReport>,
    /// Set when mappings were placed
    pub deployed: Option<DeployReport>,
}

impl LifecycleReport {
    fn new(package: &Package) -> Self {
        Self {
            package: package.name.clone(),
            ..Default::default()
        }
    }

    /// True when deployment was skipped by configuration.
    pub fn skipped(&self) -> bool {
        self.cleaned.is_none() && self.deployed.is_none()
    }
}

#[derive(Debug)]
pub struct Installer<H> {
    config: InstallerConfig,
    host: H,
}

impl<H: PackageHost> Installer<H> {
    /// Fails when the configured roots are not absolute, existing directories.
    pub fn new(config: InstallerConfig, host: H) -> DeployResult<Self> {
        config.validate()?;
        Ok(Self { config, host })
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Absolute source directory of `package`.
    pub fn source_dir(&self, package: &Package) -> DeployResult<PathBuf> {
        let dir = match &self.config.modman_root_dir {
            Some(root) => root.join(package.modman_dir_name()),
            None => self.host.install_path(package),
        };
        if !dir.is_absolute() {
            return Err(DeployError::configuration(format!(
                "source directory is not absolute: {}",
                dir.display()
            ))
            .for_package(&package.name));
        }
        Ok(dir)
    }

    /// Pick the mapping description: inline map, then manifest, then a
    /// `modman` file in the package source.
    pub fn mapping_source(&self, package: &Package) -> DeployResult<MappingSource> {
        if let Some(map) = &package.extra.map {
            return Ok(MappingSource::Inline(map.clone()));
        }
        if let Some(manifest) = &package.extra.package_xml {
            return Ok(MappingSource::Manifest(manifest.clone()));
        }
        if self.source_dir(package)?.join(MODMAN_FILE).is_file() {
            return Ok(MappingSource::MappingFile);
        }
        Err(
            DeployError::configuration("unable to find a mapping: no known mapping source")
                .for_package(&package.name),
        )
    }

    pub fn resolve_mappings(&self, package: &Package) -> DeployResult<Vec<PathMapping>> {
        let source = self.mapping_source(package)?;
        let source_dir = self.source_dir(package)?;
        let mappings = source
            .resolve(&source_dir)
            .map_err(|err| err.for_package(&package.name))?;
        info!(
            package = %package.name,
            mappings = mappings.len(),
            "resolved mappings from {}",
            source.describe()
        );
        Ok(mappings)
    }

    pub fn strategy_for(&self, package: &Package) -> DeployResult<DeployStrategy> {
        DeployStrategy::new(
            self.config.strategy,
            self.source_dir(package)?,
            &self.config.root_dir,
            self.config.force,
        )
        .map_err(|err| err.for_package(&package.name))
    }

    pub fn install(&mut self, package: &Package) -> DeployResult<LifecycleReport> {
        self.host
            .install(package)
            .map_err(|err| err.for_package(&package.name))?;

        let mut report = LifecycleReport::new(package);
        if !self.config.skip_package_deployment {
            report.deployed = Some(self.deploy(package)?);
        }
        Ok(report)
    }

    /// Clean `initial`, let the host update, then deploy `target`.
    ///
    /// The clean must come first so the new deploy's conflict check does not
    /// trip over the previous version's placements.
    pub fn update(&mut self, initial: &Package, target: &Package) -> DeployResult<LifecycleReport> {
        let mut report = LifecycleReport::new(target);

        if !self.config.skip_package_deployment {
            report.cleaned = Some(self.clean(initial)?);
        }

        self.host
            .update(initial, target)
            .map_err(|err| err.for_package(&target.name))?;

        if !self.config.skip_package_deployment {
            report.deployed = Some(self.deploy(target)?);
        }
        Ok(report)
    }

    pub fn uninstall(&mut self, package: &Package) -> DeployResult<LifecycleReport> {
        let mut report = LifecycleReport::new(package);
        if !self.config.skip_package_deployment {
            report.cleaned = Some(self.clean(package)?);
        }

        self.host
            .uninstall(package)
            .map_err(|err| err.for_package(&package.name))?;
        Ok(report)
    }

    fn deploy(&self, package: &Package) -> DeployResult<DeployReport> {
        let mappings = self.resolve_mappings(package)?;
        let strategy = self.strategy_for(package)?;
        let report = strategy
            .deploy(&mappings)
            .map_err(|err| err.for_package(&package.name))?;
        info!(
            package = %package.name,
            strategy = %strategy.kind(),
            placed = report.placed.len(),
            "deployed"
        );
        Ok(report)
    }

    fn clean(&self, package: &Package) -> DeployResult<CleanReport> {
        let mappings = self.resolve_mappings(package)?;
        let strategy = self.strategy_for(package)?;
        let report = strategy
            .clean(&mappings)
            .map_err(|err| err.for_package(&package.name))?;
        info!(
            package = %package.name,
            strategy = %strategy.kind(),
            removed = report.removed.len(),
            "cleaned"
        );
        Ok(report)
    }
}
