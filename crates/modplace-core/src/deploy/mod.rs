//! Deployment strategies: place or remove resolved mappings on disk.

pub mod kind;
mod place;
pub mod strategy;

use serde::Serialize;

use crate::mapping::PathMapping;

pub use kind::StrategyKind;
pub use strategy::DeployStrategy;

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeployReport {
    /// Mappings placed, in deploy order
    pub placed: Vec<PathMapping>,
    /// Directories created to hold the targets, relative to the target
    /// root, outermost first
    pub created_dirs: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
    /// Mappings whose targets were removed, in clean (reverse) order
    pub removed: Vec<PathMapping>,
    pub warnings: Vec<String>,
}
