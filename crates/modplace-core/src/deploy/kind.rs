use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DeployError;

/// How a mapping's source is materialized at its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Symbolic link to the absolute source
    #[default]
    Symlink,
    /// Hard links, mirroring directories
    #[serde(alias = "hardlink")]
    Link,
    /// Byte-for-byte copy
    Copy,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Symlink => "symlink",
            StrategyKind::Link => "link",
            StrategyKind::Copy => "copy",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "symlink" => Ok(StrategyKind::Symlink),
            "link" | "hardlink" => Ok(StrategyKind::Link),
            "copy" => Ok(StrategyKind::Copy),
            other => Err(DeployError::configuration(format!(
                "unknown deploy strategy '{}' (expected symlink, link or copy)",
                other
            ))),
        }
    }
}
