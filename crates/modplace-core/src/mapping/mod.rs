//! Mapping resolution: turn a mapping description into ordered source/target pairs.
//!
//! Three descriptions are supported:
//! - an inline list of `[source, target]` pairs from package configuration
//! - a line-oriented `modman` file at the package root
//! - a `package.xml` manifest whose target nodes map onto well-known roots

pub mod inline;
pub mod modman;
pub mod package_xml;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::DeployResult;

pub use inline::parse_inline;
pub use modman::{MODMAN_FILE, parse_modman};
pub use package_xml::{PackageXmlParser, target_prefix};

/// One source → target placement rule.
///
/// Both sides are relative, `/`-separated and normalized. An empty source
/// stands for the whole package root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathMapping {
    source: String,
    target: String,
}

impl PathMapping {
    /// Build a mapping from raw paths.
    ///
    /// Fails when either side escapes its root or the target normalizes to
    /// the target root itself.
    pub fn new(source: &str, target: &str) -> Result<Self, InvalidPath> {
        let source = normalize_path(source)?;
        let target = normalize_path(target)?;
        if target.is_empty() {
            return Err(InvalidPath::EmptyTarget);
        }
        Ok(Self { source, target })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// True when the whole source root is placed as one entry.
    pub fn is_whole_root(&self) -> bool {
        self.source.is_empty()
    }

    pub fn source_path(&self, source_root: &Path) -> PathBuf {
        join_relative(source_root, &self.source)
    }

    pub fn target_path(&self, target_root: &Path) -> PathBuf {
        join_relative(target_root, &self.target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPath {
    #[error("path '{0}' escapes its root")]
    Escapes(String),
    #[error("target path must not be empty")]
    EmptyTarget,
}

/// Normalize a relative path: `/` separators, no empty or `.` segments, no
/// trailing separator, interior `..` folded. A `..` that would climb above the
/// root is rejected.
pub fn normalize_path(raw: &str) -> Result<String, InvalidPath> {
    let unified = raw.trim().replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(InvalidPath::Escapes(raw.to_string()));
                }
            }
            other => segments.push(other),
        }
    }
    Ok(segments.join("/"))
}

fn join_relative(root: &Path, relative: &str) -> PathBuf {
    if relative.is_empty() {
        return root.to_path_buf();
    }
    relative
        .split('/')
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

/// Where a package's mappings come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingSource {
    /// Ordered pairs supplied directly by configuration
    Inline(Vec<(String, String)>),
    /// Path of a `package.xml` style manifest, relative to the source root
    Manifest(String),
    /// The fixed-name `modman` file at the source root
    MappingFile,
}

impl MappingSource {
    /// Parse this description against a package source root.
    pub fn resolve(&self, source_root: &Path) -> DeployResult<Vec<PathMapping>> {
        match self {
            MappingSource::Inline(pairs) => parse_inline(pairs),
            MappingSource::Manifest(path) => PackageXmlParser::new(source_root, path).parse(),
            MappingSource::MappingFile => parse_modman(source_root),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            MappingSource::Inline(_) => "inline map",
            MappingSource::Manifest(_) => "package manifest",
            MappingSource::MappingFile => "modman file",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_separators() {
        assert_eq!(normalize_path("app//code/./Local/").unwrap(), "app/code/Local");
        assert_eq!(normalize_path("\\app\\etc\\modules").unwrap(), "app/etc/modules");
        assert_eq!(normalize_path("  lib/Foo  ").unwrap(), "lib/Foo");
    }

    #[test]
    fn test_normalize_root_forms_are_empty() {
        assert_eq!(normalize_path("").unwrap(), "");
        assert_eq!(normalize_path("/").unwrap(), "");
        assert_eq!(normalize_path("./").unwrap(), "");
    }

    #[test]
    fn test_normalize_folds_interior_parent() {
        assert_eq!(normalize_path("code/../app/etc").unwrap(), "app/etc");
    }

    #[test]
    fn test_normalize_rejects_escape() {
        assert_eq!(
            normalize_path("../outside"),
            Err(InvalidPath::Escapes("../outside".to_string()))
        );
        assert!(normalize_path("a/../../b").is_err());
    }

    #[test]
    fn test_mapping_rejects_empty_target() {
        assert_eq!(PathMapping::new("code", "/"), Err(InvalidPath::EmptyTarget));
    }

    #[test]
    fn test_mapping_whole_root_resolves_to_root() {
        let mapping = PathMapping::new(".", "app/code/local/Vendor/Module").unwrap();
        assert!(mapping.is_whole_root());
        assert_eq!(mapping.source_path(Path::new("/pkg")), PathBuf::from("/pkg"));
        assert_eq!(
            mapping.target_path(Path::new("/srv/app")),
            PathBuf::from("/srv/app/app/code/local/Vendor/Module")
        );
    }
}
