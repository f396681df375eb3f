//! Route and direction types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Travel direction of a route.
///
/// The arrival API reports directions as single letters (`I`/`O`), the
/// route-stop API and the cache use the long names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    /// Single-letter code used by the arrival API.
    pub fn code(&self) -> &'static str {
        match self {
            Direction::Inbound => "I",
            Direction::Outbound => "O",
        }
    }

    /// Long name used by the route-stop API and cache fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }

    /// Parse either the letter code or the long name.
    pub fn from_any(s: &str) -> Option<Self> {
        match s {
            "I" | "inbound" => Some(Direction::Inbound),
            "O" | "outbound" => Some(Direction::Outbound),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction filter for ETA and route-map queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionFilter {
    Only(Direction),
    Both,
}

impl DirectionFilter {
    /// Whether an arrival's raw direction code passes the filter.
    pub fn accepts_code(&self, code: &str) -> bool {
        match self {
            DirectionFilter::Both => true,
            DirectionFilter::Only(dir) => dir.code() == code,
        }
    }

    /// Whether a typed direction passes the filter.
    pub fn accepts(&self, direction: Direction) -> bool {
        match self {
            DirectionFilter::Both => true,
            DirectionFilter::Only(dir) => *dir == direction,
        }
    }
}

impl FromStr for DirectionFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound" => Ok(DirectionFilter::Only(Direction::Inbound)),
            "outbound" => Ok(DirectionFilter::Only(Direction::Outbound)),
            "both" => Ok(DirectionFilter::Both),
            other => Err(DomainError::UnknownDirection(other.to_string())),
        }
    }
}

/// Identity of a route-stop sequence: `(route, direction, service_type)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    pub route: String,
    pub direction: Direction,
    pub service_type: String,
}

impl RouteKey {
    pub fn new(
        route: impl Into<String>,
        direction: Direction,
        service_type: impl Into<String>,
    ) -> Self {
        Self {
            route: route.into(),
            direction,
            service_type: service_type.into(),
        }
    }

    /// Cache field name, e.g. `269D_outbound_1`.
    pub fn field(&self) -> String {
        format!("{}_{}_{}", self.route, self.direction.as_str(), self.service_type)
    }

    /// Parse a cache field name.
    ///
    /// Anything after the second underscore is the service type, so
    /// service types containing underscores survive the round trip.
    pub fn parse_field(field: &str) -> Result<Self, DomainError> {
        let mut parts = field.splitn(3, '_');
        let (Some(route), Some(dir), Some(service_type)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(DomainError::MalformedRouteField(field.to_string()));
        };
        let direction = Direction::from_any(dir)
            .ok_or_else(|| DomainError::MalformedRouteField(field.to_string()))?;
        Ok(Self::new(route, direction, service_type))
    }

    /// Route label used by the stop-route map, e.g. `269D/1`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.route, self.service_type)
    }
}
