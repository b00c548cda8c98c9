//! MoSCoW priority scale and its dominance ranking

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Priority of a story on the MoSCoW scale.
///
/// Variants are declared in rank order: `Must` is the most dominant.
/// Any unrecognized wire value (including legacy `high`/`medium`/`low`)
/// deserializes as [`Priority::Should`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Must,
    #[default]
    Should,
    Could,
    Wont,
}

impl Priority {
    /// All priorities, most dominant first
    pub const ALL: [Priority; 4] = [
        Priority::Must,
        Priority::Should,
        Priority::Could,
        Priority::Wont,
    ];

    /// Numeric rank: 0 for `must` up to 3 for `wont`
    pub fn rank(self) -> u8 {
        match self {
            Priority::Must => 0,
            Priority::Should => 1,
            Priority::Could => 2,
            Priority::Wont => 3,
        }
    }

    /// True if `self` strictly outranks `other`
    pub fn dominates(self, other: Priority) -> bool {
        self.rank() < other.rank()
    }

    /// Lowercase wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Must => "must",
            Priority::Should => "should",
            Priority::Could => "could",
            Priority::Wont => "wont",
        }
    }

    /// Parse a wire value, falling back to `should` for anything unknown.
    pub fn parse_lossy(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "must" => Priority::Must,
            "should" => Priority::Should,
            "could" => Priority::Could,
            "wont" => Priority::Wont,
            _ => Priority::Should,
        }
    }
}

/// Most dominant priority of a sequence, or `None` when it is empty
pub fn most_dominant<I>(priorities: I) -> Option<Priority>
where
    I: IntoIterator<Item = Priority>,
{
    priorities.into_iter().min_by_key(|p| p.rank())
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Priority::parse_lossy(s))
    }
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Priority::parse_lossy(&raw))
    }
}
