//! Error types for mapping resolution and deployment.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for modplace operations
pub type DeployResult<T> = Result<T, DeployError>;

/// Coarse classification of a [`DeployError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    NotFound,
    Parse,
    SourceMissing,
    Conflict,
    Filesystem,
    Host,
}

#[derive(Error, Debug)]
pub enum DeployError {
    /// Bad or missing setting (strategy name, root directory, mapping source)
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Expected mapping file or manifest is absent
    #[error("{what} not found: {path}")]
    NotFound { what: &'static str, path: PathBuf },

    /// Malformed mapping file line, manifest, or unknown manifest target
    #[error("parse error in {}: {message}", location(.file, .line))]
    Parse {
        file: PathBuf,
        line: Option<usize>,
        message: String,
    },

    /// A mapping's source does not exist at deploy time
    #[error("source path does not exist: {path}")]
    SourceMissing { path: PathBuf },

    /// Target already exists and force is disabled
    #[error("target already exists: {path} (enable force to overwrite)")]
    Conflict { path: PathBuf },

    /// OS-level failure while creating, placing or removing entries
    #[error("failed to {action} {path}: {source}")]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failure reported by the host's own lifecycle step
    #[error("host {step} step failed: {source}")]
    Host {
        step: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Any of the above, attributed to a package
    #[error("package '{package}': {source}")]
    Package {
        package: String,
        source: Box<DeployError>,
    },
}

impl DeployError {
    pub fn configuration(message: impl Into<String>) -> Self {
        DeployError::Configuration {
            message: message.into(),
        }
    }

    pub fn parse(file: &Path, line: Option<usize>, message: impl Into<String>) -> Self {
        DeployError::Parse {
            file: file.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    pub fn filesystem(action: &'static str, path: &Path, source: io::Error) -> Self {
        DeployError::Filesystem {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Attribute this error to a package. Already-attributed errors are kept as is.
    pub fn for_package(self, package: &str) -> Self {
        match self {
            DeployError::Package { .. } => self,
            other => DeployError::Package {
                package: package.to_string(),
                source: Box::new(other),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::Configuration { .. } => ErrorKind::Configuration,
            DeployError::NotFound { .. } => ErrorKind::NotFound,
            DeployError::Parse { .. } => ErrorKind::Parse,
            DeployError::SourceMissing { .. } => ErrorKind::SourceMissing,
            DeployError::Conflict { .. } => ErrorKind::Conflict,
            DeployError::Filesystem { .. } => ErrorKind::Filesystem,
            DeployError::Host { .. } => ErrorKind::Host,
            DeployError::Package { source, .. } => source.kind(),
        }
    }
}

fn location(file: &Path, line: &Option<usize>) -> String {
    match line {
        Some(line) => format!("{}:{}", file.display(), line),
        None => file.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_with_line() {
        let err = DeployError::parse(Path::new("pkg/modman"), Some(3), "expected 2 or 3 tokens");
        assert_eq!(
            err.to_string(),
            "parse error in pkg/modman:3: expected 2 or 3 tokens"
        );
    }

    #[test]
    fn test_parse_error_display_without_line() {
        let err = DeployError::parse(Path::new("package.xml"), None, "unknown target 'foo'");
        assert_eq!(
            err.to_string(),
            "parse error in package.xml: unknown target 'foo'"
        );
    }

    #[test]
    fn test_conflict_names_path() {
        let err = DeployError::Conflict {
            path: PathBuf::from("/srv/app/app/code/Module"),
        };
        assert!(err.to_string().contains("/srv/app/app/code/Module"));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_package_wrapper_delegates_kind() {
        let err = DeployError::SourceMissing {
            path: PathBuf::from("/src/missing"),
        }
        .for_package("vendor/module");
        assert_eq!(err.kind(), ErrorKind::SourceMissing);
        assert!(err.to_string().starts_with("package 'vendor/module': "));

        let twice = err.for_package("other/module");
        assert!(twice.to_string().contains("vendor/module"));
    }
}
