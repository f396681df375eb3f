//! Bus stops and area membership.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// A bus stop from the stop directory.
///
/// Coordinates are kept as the strings the directory publishes; nothing
/// in the service does arithmetic on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    /// Stop id (the directory's `stop` field)
    pub stop: String,
    pub name_en: String,
    #[serde(default)]
    pub name_tc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_sc: Option<String>,
    #[serde(default)]
    pub lat: String,
    #[serde(default)]
    pub long: String,
}

/// A named cluster of nearby stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    Home,
    Work,
}

impl Area {
    pub const ALL: [Area; 2] = [Area::Home, Area::Work];

    pub fn as_str(&self) -> &'static str {
        match self {
            Area::Home => "home",
            Area::Work => "work",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Area {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(Area::Home),
            "work" => Ok(Area::Work),
            other => Err(DomainError::UnknownArea(other.to_string())),
        }
    }
}

/// Case-insensitive substring matcher over a list of stop names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaMatcher {
    names: Vec<String>,
}

impl AreaMatcher {
    /// Build a matcher. Names are upper-cased; blank entries are dropped
    /// so they cannot match every stop.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_uppercase())
            .filter(|n| !n.is_empty())
            .collect();
        Self { names }
    }

    /// Whether an English stop name contains any configured name.
    pub fn matches(&self, name_en: &str) -> bool {
        let upper = name_en.to_uppercase();
        self.names.iter().any(|n| upper.contains(n.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
