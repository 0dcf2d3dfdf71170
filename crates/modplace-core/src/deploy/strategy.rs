//! Deploy and clean a resolved mapping sequence.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{DeployError, DeployResult};
use crate::fs::{create_missing_dirs, entry_exists, remove_dir_if_empty, remove_path};
use crate::mapping::PathMapping;

use super::place::{Removal, place, remove};
use super::{CleanReport, DeployReport, StrategyKind};

/// Materializes mappings from a package source root into a target root.
///
/// Built per package and per operation; holds no state between calls.
#[derive(Debug, Clone)]
pub struct DeployStrategy {
    kind: StrategyKind,
    source_root: PathBuf,
    target_root: PathBuf,
    force: bool,
}

impl DeployStrategy {
    /// Both roots must be absolute.
    pub fn new(
        kind: StrategyKind,
        source_root: impl Into<PathBuf>,
        target_root: impl Into<PathBuf>,
        force: bool,
    ) -> DeployResult<Self> {
        let source_root = source_root.into();
        let target_root = target_root.into();
        for (label, root) in [("source", &source_root), ("target", &target_root)] {
            if !root.is_absolute() {
                return Err(DeployError::configuration(format!(
                    "{} root must be an absolute path: {}",
                    label,
                    root.display()
                )));
            }
        }
        Ok(Self {
            kind,
            source_root,
            target_root,
            force,
        })
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    pub fn force(&self) -> bool {
        self.force
    }

    /// Place every mapping in order.
    ///
    /// Stops at the first failure; mappings placed before it stay on disk.
    pub fn deploy(&self, mappings: &[PathMapping]) -> DeployResult<DeployReport> {
        let mut report = DeployReport::default();

        for mapping in mappings {
            let source = mapping.source_path(&self.source_root);
            let target = mapping.target_path(&self.target_root);

            if let Err(err) = fs::metadata(&source) {
                return Err(if err.kind() == io::ErrorKind::NotFound {
                    DeployError::SourceMissing { path: source }
                } else {
                    DeployError::filesystem("inspect", &source, err)
                });
            }

            if let Some(parent) = target.parent() {
                for dir in create_missing_dirs(parent)? {
                    report.created_dirs.push(self.relative_to_target(&dir));
                }
            }

            if entry_exists(&target)? {
                if !self.force {
                    return Err(DeployError::Conflict { path: target });
                }
                debug!(target = %target.display(), "removing existing target");
                remove_path(&target)
                    .map_err(|err| DeployError::filesystem("remove existing", &target, err))?;
            }

            place(self.kind, &source, &target)?;
            debug!(
                strategy = %self.kind,
                source = %source.display(),
                target = %target.display(),
                "placed"
            );
            report.placed.push(mapping.clone());
        }

        Ok(report)
    }

    /// Remove every mapping's target in reverse order.
    ///
    /// Absent targets are already clean. Entries this mechanism did not
    /// produce are left alone and reported as warnings. Directories above the
    /// targets are never touched; see [`DeployStrategy::clean_deployed`].
    pub fn clean(&self, mappings: &[PathMapping]) -> DeployResult<CleanReport> {
        let mut report = CleanReport::default();

        for mapping in mappings.iter().rev() {
            let source = mapping.source_path(&self.source_root);
            let target = mapping.target_path(&self.target_root);

            match remove(self.kind, &source, &target)? {
                Removal::Removed => {
                    debug!(strategy = %self.kind, target = %target.display(), "removed");
                    report.removed.push(mapping.clone());
                }
                Removal::Absent => {
                    debug!(target = %target.display(), "already clean");
                }
                Removal::Kept(reason) => {
                    warn!(target = %target.display(), "left in place: {}", reason);
                    report
                        .warnings
                        .push(format!("{}: {}", target.display(), reason));
                }
            }
        }

        Ok(report)
    }

    /// Clean the mappings of an earlier `deploy`, then remove the directories
    /// that deploy created and that are empty again, innermost first.
    pub fn clean_deployed(&self, deployed: &DeployReport) -> DeployResult<CleanReport> {
        let report = self.clean(&deployed.placed)?;

        for dir in deployed.created_dirs.iter().rev() {
            let path = self.target_root.join(dir);
            if remove_dir_if_empty(&path)? {
                debug!(dir = %path.display(), "removed created directory");
            }
        }

        Ok(report)
    }

    fn relative_to_target(&self, path: &Path) -> String {
        path.strip_prefix(&self.target_root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}
