//! Inline maps supplied directly by package configuration.

use crate::error::{DeployError, DeployResult};

use super::PathMapping;

/// Convert ordered `(source, target)` pairs into mappings, keeping their order.
pub fn parse_inline(pairs: &[(String, String)]) -> DeployResult<Vec<PathMapping>> {
    pairs
        .iter()
        .enumerate()
        .map(|(index, (source, target))| {
            if source.trim().is_empty() || target.trim().is_empty() {
                return Err(DeployError::configuration(format!(
                    "map entry #{} has an empty source or target",
                    index + 1
                )));
            }
            PathMapping::new(source, target).map_err(|err| {
                DeployError::configuration(format!("map entry #{}: {}", index + 1, err))
            })
        })
        .collect()
}
