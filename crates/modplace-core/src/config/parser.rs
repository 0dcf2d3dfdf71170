//! TOML parser with helpful error messages

use std::fs;
use std::io;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{DeployError, DeployResult};

/// Read and parse a TOML configuration file.
pub fn parse_toml_file<T: DeserializeOwned>(path: &Path) -> DeployResult<T> {
    let content = fs::read_to_string(path).map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            DeployError::NotFound {
                what: "config file",
                path: path.to_path_buf(),
            }
        } else {
            DeployError::filesystem("read", path, err)
        }
    })?;
    parse_toml_str(&content, path)
}

/// Parse TOML content; `origin` is only used in error messages.
pub fn parse_toml_str<T: DeserializeOwned>(content: &str, origin: &Path) -> DeployResult<T> {
    toml::from_str(content).map_err(|err| enhance_toml_error(err, content, origin))
}

/// Attach the line number and surrounding lines to a TOML error.
fn enhance_toml_error(error: toml::de::Error, content: &str, origin: &Path) -> DeployError {
    let message = error.message().to_string();
    let line_hint = error
        .span()
        .map(|span| content[..span.start.min(content.len())].matches('\n').count() + 1);

    match line_hint {
        Some(line_num) => {
            let context = get_line_context(content, line_num);
            DeployError::parse(origin, Some(line_num), format!("{}\n{}", message, context))
        }
        None => DeployError::parse(origin, None, message),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 1).min(lines.len());
    if start >= end {
        return String::new();
    }

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstallerSettings;
    use crate::error::ErrorKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_settings() {
        let toml = r#"
root-dir = "htdocs"
deploy-strategy = "copy"
force = true
"#;
        let settings: InstallerSettings = parse_toml_str(toml, Path::new("modplace.toml")).unwrap();
        assert_eq!(settings.root_dir.as_deref(), Some(Path::new("htdocs")));
        assert_eq!(settings.deploy_strategy.as_deref(), Some("copy"));
        assert!(settings.force);
        assert!(!settings.skip_package_deployment);
    }

    #[test]
    fn test_invalid_toml_reports_line_and_context() {
        let toml = "root-dir = \"htdocs\"\nforce = [unclosed\n";
        let err = parse_toml_str::<InstallerSettings>(toml, Path::new("modplace.toml"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        let message = err.to_string();
        assert!(message.contains("modplace.toml:2"), "{}", message);
        assert!(message.contains(">>>"), "{}", message);
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let err = parse_toml_str::<InstallerSettings>("root-dir = 5", Path::new("m.toml"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_parse_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "magento-root-dir = \"/srv/magento\"").unwrap();

        let settings: InstallerSettings = parse_toml_file(temp_file.path()).unwrap();
        assert_eq!(settings.root_dir.as_deref(), Some(Path::new("/srv/magento")));
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let err = parse_toml_file::<InstallerSettings>(Path::new("/nonexistent/modplace.toml"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
