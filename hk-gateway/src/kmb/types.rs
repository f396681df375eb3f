//! KMB API response DTOs.
//!
//! Fields are optional because the API omits or nulls them freely, and
//! numeric fields (`service_type`, `seq`, `eta_seq`) arrive as numbers on
//! some endpoints and strings on others. They are all read as strings.

use serde::{Deserialize, Deserializer};

use crate::domain::Stop;

/// Accept a string, number or boolean as `Some(String)`; null as `None`.
fn stringish<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// One entry of the stop directory.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StopDto {
    #[serde(default, deserialize_with = "stringish")]
    pub stop: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub name_en: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub name_tc: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub name_sc: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub lat: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub long: Option<String>,
}

impl StopDto {
    /// Convert to a domain stop. Entries without an id or English name
    /// are unusable for area matching and yield `None`.
    pub fn into_stop(self) -> Option<Stop> {
        let stop = self.stop.filter(|s| !s.is_empty())?;
        let name_en = self.name_en.filter(|s| !s.is_empty())?;
        Some(Stop {
            stop,
            name_en,
            name_tc: self.name_tc.unwrap_or_default(),
            name_sc: self.name_sc,
            lat: self.lat.unwrap_or_default(),
            long: self.long.unwrap_or_default(),
        })
    }
}

/// One arrival prediction from `/stop-eta/{stop}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EtaDto {
    /// Operating company
    #[serde(default, deserialize_with = "stringish")]
    pub co: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub route: Option<String>,
    /// `I` or `O`
    #[serde(default, deserialize_with = "stringish")]
    pub dir: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub service_type: Option<String>,
    /// Position of this stop on the route
    #[serde(default, deserialize_with = "stringish")]
    pub seq: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub dest_tc: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub dest_en: Option<String>,
    /// 1 for the next bus, 2 for the one after, ...
    #[serde(default, deserialize_with = "stringish")]
    pub eta_seq: Option<String>,
    /// ISO 8601 arrival time; null when there is no service
    #[serde(default, deserialize_with = "stringish")]
    pub eta: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub rmk_tc: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub data_timestamp: Option<String>,
}

/// One stop of a route from `/route-stop/...`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RouteStopDto {
    #[serde(default, deserialize_with = "stringish")]
    pub route: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub bound: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub service_type: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub seq: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub stop: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_stop() {
        let json = r#"{
            "stop": "18492910339410B1",
            "name_en": "CHUK YUEN ESTATE BUS TERMINUS",
            "name_tc": "竹園邨總站",
            "name_sc": "竹园邨总站",
            "lat": "22.345415",
            "long": "114.192640"
        }"#;
        let dto: StopDto = serde_json::from_str(json).unwrap();
        let stop = dto.into_stop().unwrap();
        assert_eq!(stop.stop, "18492910339410B1");
        assert_eq!(stop.name_tc, "竹園邨總站");
        assert_eq!(stop.lat, "22.345415");
    }

    #[test]
    fn stop_without_english_name_is_dropped() {
        let dto: StopDto = serde_json::from_str(r#"{"stop": "X", "name_tc": "某站"}"#).unwrap();
        assert!(dto.into_stop().is_none());
    }

    #[test]
    fn deserialize_eta_with_numeric_fields() {
        let json = r#"{
            "co": "KMB", "route": "269D", "dir": "O", "service_type": 1,
            "seq": 3, "dest_tc": "中環", "dest_en": "CENTRAL", "eta_seq": 1,
            "eta": "2024-01-01T08:00:00+08:00", "rmk_tc": "",
            "data_timestamp": "2024-01-01T07:55:00+08:00"
        }"#;
        let eta: EtaDto = serde_json::from_str(json).unwrap();
        assert_eq!(eta.service_type.as_deref(), Some("1"));
        assert_eq!(eta.seq.as_deref(), Some("3"));
        assert_eq!(eta.eta_seq.as_deref(), Some("1"));
        assert_eq!(eta.rmk_tc.as_deref(), Some(""));
    }

    #[test]
    fn deserialize_eta_with_null_time() {
        let eta: EtaDto =
            serde_json::from_str(r#"{"route": "1A", "dir": "I", "eta": null}"#).unwrap();
        assert_eq!(eta.eta, None);
        assert_eq!(eta.co, None);
    }

    #[test]
    fn deserialize_route_stop() {
        let json = r#"{"route":"1A","bound":"O","service_type":"1","seq":"2","stop":"ABC"}"#;
        let rs: RouteStopDto = serde_json::from_str(json).unwrap();
        assert_eq!(rs.stop.as_deref(), Some("ABC"));
        assert_eq!(rs.seq.as_deref(), Some("2"));
    }
}
