//! Package lifecycle orchestration.

pub mod host;
pub mod installer;

pub use host::{Package, PackageHost};
pub use installer::{Installer, LifecycleReport};
