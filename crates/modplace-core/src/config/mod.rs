//! Installer and package configuration
//!
//! Settings load from `modplace.toml` (see [`parser`]) or from a JSON extra
//! block handed over by a host package manager, and are validated into an
//! [`InstallerConfig`] with absolute paths before any deployment happens.

pub mod parser;
pub mod schema;

pub use parser::{parse_toml_file, parse_toml_str};
pub use schema::{InstallerConfig, InstallerSettings, PackageExtra};
