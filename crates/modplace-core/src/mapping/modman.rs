//! Line-oriented `modman` mapping files.
//!
//! Each rule is `<source> <target> [<hint>]`. The optional hint names a
//! placement mechanism; it is read but ignored since the strategy comes from
//! installer configuration.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::error::{DeployError, DeployResult};

use super::PathMapping;

/// File name probed at the package source root.
pub const MODMAN_FILE: &str = "modman";

const COMMENT_MARKER: char = '#';
const DIRECTIVE_MARKER: char = '@';

/// Read and parse `<source_root>/modman`.
pub fn parse_modman(source_root: &Path) -> DeployResult<Vec<PathMapping>> {
    let path = source_root.join(MODMAN_FILE);
    let content = fs::read_to_string(&path).map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            DeployError::NotFound {
                what: "modman file",
                path: path.clone(),
            }
        } else if err.kind() == io::ErrorKind::InvalidData {
            DeployError::parse(&path, None, "file is not valid UTF-8")
        } else {
            DeployError::filesystem("read", &path, err)
        }
    })?;
    parse_modman_str(&content, &path)
}

/// Parse modman content; `origin` is only used in error messages.
pub fn parse_modman_str(content: &str, origin: &Path) -> DeployResult<Vec<PathMapping>> {
    let mut mappings = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            continue;
        }
        if line.starts_with(DIRECTIVE_MARKER) {
            debug!(file = %origin.display(), line = line_no, "skipping modman directive: {}", line);
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (source, target) = match tokens.as_slice() {
            [source, target] => (*source, *target),
            [source, target, hint] => {
                debug!(line = line_no, hint, "ignoring placement hint");
                (*source, *target)
            }
            _ => {
                return Err(DeployError::parse(
                    origin,
                    Some(line_no),
                    format!(
                        "expected '<source> <target> [<hint>]', found {} token(s)",
                        tokens.len()
                    ),
                ));
            }
        };

        let mapping = PathMapping::new(source, target)
            .map_err(|err| DeployError::parse(origin, Some(line_no), err.to_string()))?;
        mappings.push(mapping);
    }

    Ok(mappings)
}
