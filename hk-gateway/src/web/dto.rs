//! Request and response bodies.

use serde::{Deserialize, Serialize};

/// Query of `/kmb/bus-etas/:area/:direction`.
#[derive(Debug, Default, Deserialize)]
pub struct BusEtaQuery {
    /// Stop name to measure distance to
    pub destination_stop: Option<String>,

    /// Include records without an arrival time (default true)
    pub show_all: Option<bool>,

    #[serde(default)]
    pub format: EtaFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EtaFormat {
    #[default]
    Csv,
    Json,
}

/// Query of `/kmb/stop-route-map/:area`.
#[derive(Debug, Default, Deserialize)]
pub struct RouteMapQuery {
    /// `inbound`, `outbound` or `both` (default)
    pub direction: Option<String>,
}

/// Query of `/weather/hk/radar`.
#[derive(Debug, Default, Deserialize)]
pub struct RadarQuery {
    /// Radar range number (default 2, the 64 km picture)
    pub range: Option<String>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
