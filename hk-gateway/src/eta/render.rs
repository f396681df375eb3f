//! CSV output for ETA records and the stop → route map.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use thiserror::Error;

use super::aggregate::EtaRecord;
use super::route_map::StopRoutes;

/// Shown in place of arrival times when a record has none.
pub const NO_SERVICE_PLACEHOLDER: &str = "沒有服務或到站時間";

/// Hong Kong is UTC+8 all year.
const HK_OFFSET_SECS: i32 = 8 * 3600;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV flush error: {0}")]
    Flush(String),

    #[error("CSV output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Serialize)]
struct EtaRow<'a> {
    #[serde(rename = "Stop Name (TC)")]
    stop_name: &'a str,
    #[serde(rename = "Route")]
    route: &'a str,
    #[serde(rename = "Direction")]
    direction: &'a str,
    #[serde(rename = "Service Type")]
    service_type: &'a str,
    #[serde(rename = "Sequence")]
    sequence: &'a str,
    #[serde(rename = "Destination (TC)")]
    destination: &'a str,
    #[serde(rename = "ETA Sequence")]
    eta_sequence: String,
    #[serde(rename = "ETA")]
    eta: String,
    #[serde(rename = "Remarks (TC)")]
    remarks: String,
    #[serde(rename = "Intermediate Stops")]
    intermediate_stops: String,
    #[serde(rename = "Stops Until Target")]
    stops_to_target: &'a str,
    #[serde(rename = "Distance To Target")]
    distance_to_target: Option<u32>,
}

impl<'a> From<&'a EtaRecord> for EtaRow<'a> {
    fn from(r: &'a EtaRecord) -> Self {
        Self {
            stop_name: &r.stop_name_tc,
            route: &r.route,
            direction: &r.direction,
            service_type: &r.service_type,
            sequence: &r.sequence,
            destination: &r.destination_tc,
            eta_sequence: r.eta_sequence_field(),
            eta: r.eta_field(),
            remarks: r.remarks_field(),
            intermediate_stops: r.intermediate_stops_field(),
            stops_to_target: &r.stops_to_target,
            distance_to_target: r.distance_to_target,
        }
    }
}

#[derive(Debug, Serialize)]
struct RouteMapRow<'a> {
    #[serde(rename = "Stop Name")]
    stop_name: &'a str,
    #[serde(rename = "Routes (Route/Direction)")]
    routes: String,
}

/// Format an ISO-8601 timestamp as `HH:MM` Hong Kong time.
///
/// Empty and unparsable values are returned unchanged.
pub fn format_hk_time(raw: &str) -> String {
    let Some(offset) = FixedOffset::east_opt(HK_OFFSET_SECS) else {
        return raw.to_string();
    };
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&offset).format("%H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Display ordering of records.
///
/// Records with a distance to the target come first, nearest first; then
/// records with an arrival time; then by stop name.
pub fn compare_records(a: &EtaRecord, b: &EtaRecord) -> Ordering {
    b.distance_to_target
        .is_some()
        .cmp(&a.distance_to_target.is_some())
        .then_with(|| a.distance_to_target.cmp(&b.distance_to_target))
        .then_with(|| b.has_eta().cmp(&a.has_eta()))
        .then_with(|| a.stop_name_tc.cmp(&b.stop_name_tc))
}

/// Filter, format and order records for output.
///
/// With `show_all` unset, records without any arrival time are dropped.
/// Remaining records without a time get [`NO_SERVICE_PLACEHOLDER`] once
/// sorted.
pub fn prepare_rows(records: Vec<EtaRecord>, show_all: bool) -> Vec<EtaRecord> {
    let mut rows: Vec<EtaRecord> = records
        .into_iter()
        .filter(|r| show_all || r.has_eta())
        .map(|mut r| {
            r.eta = r.eta.iter().map(|t| format_hk_time(t)).collect();
            r
        })
        .collect();

    rows.sort_by(compare_records);

    for row in rows.iter_mut().filter(|r| !r.has_eta()) {
        row.eta = vec![NO_SERVICE_PLACEHOLDER.to_string()];
    }
    rows
}

/// Write prepared ETA records as CSV with a header row.
pub fn render_eta_csv(records: &[EtaRecord]) -> Result<String, RenderError> {
    let mut writer = csv_writer();
    for record in records {
        writer.serialize(EtaRow::from(record))?;
    }
    finish(writer, &EtaRow::HEADERS)
}

/// Write the stop → route map as CSV with a header row.
pub fn render_route_map_csv(entries: &[StopRoutes]) -> Result<String, RenderError> {
    let mut writer = csv_writer();
    for entry in entries {
        writer.serialize(RouteMapRow {
            stop_name: &entry.stop_name,
            routes: entry.routes.join(", "),
        })?;
    }
    finish(writer, &RouteMapRow::HEADERS)
}

impl EtaRow<'_> {
    const HEADERS: [&'static str; 12] = [
        "Stop Name (TC)",
        "Route",
        "Direction",
        "Service Type",
        "Sequence",
        "Destination (TC)",
        "ETA Sequence",
        "ETA",
        "Remarks (TC)",
        "Intermediate Stops",
        "Stops Until Target",
        "Distance To Target",
    ];
}

impl RouteMapRow<'_> {
    const HEADERS: [&'static str; 2] = ["Stop Name", "Routes (Route/Direction)"];
}

fn csv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .has_headers(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

/// Flush the writer. Serde only emits headers with the first row, so an
/// empty table gets its header row written here.
fn finish(mut writer: csv::Writer<Vec<u8>>, headers: &[&str]) -> Result<String, RenderError> {
    writer.flush().map_err(|e| RenderError::Flush(e.to_string()))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| RenderError::Flush(e.to_string()))?;
    if !bytes.is_empty() {
        return Ok(String::from_utf8(bytes)?);
    }

    let mut writer = csv_writer();
    writer.write_record(headers)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| RenderError::Flush(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn record(name: &str, eta: &[&str], distance: Option<u32>) -> EtaRecord {
        EtaRecord {
            stop_id: format!("id-{name}"),
            stop_name_tc: name.into(),
            company: "KMB".into(),
            route: "269D".into(),
            direction: "O".into(),
            service_type: "1".into(),
            sequence: "3".into(),
            destination_tc: "中環".into(),
            eta_sequence: eta.iter().enumerate().map(|(i, _)| (i + 1).to_string()).collect(),
            eta: eta.iter().map(|s| s.to_string()).collect(),
            remarks_tc: Vec::new(),
            data_timestamp: String::new(),
            intermediate_stops: Vec::new(),
            stops_to_target: String::new(),
            distance_to_target: distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::record;
    use super::*;

    #[test]
    fn formats_hong_kong_time() {
        assert_eq!(format_hk_time("2024-01-01T08:05:00+08:00"), "08:05");
        assert_eq!(format_hk_time("2024-01-01T00:05:00Z"), "08:05");
        assert_eq!(format_hk_time("soon"), "soon");
        assert_eq!(format_hk_time(""), "");
    }

    #[test]
    fn hides_records_without_eta_unless_show_all() {
        let records = vec![
            record("甲", &[""], None),
            record("乙", &["2024-01-01T08:00:00+08:00"], None),
        ];

        let hidden = prepare_rows(records.clone(), false);
        assert_eq!(hidden.len(), 1);
        assert_eq!(hidden[0].stop_name_tc, "乙");

        let shown = prepare_rows(records, true);
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].eta, vec!["08:00"]);
        assert_eq!(shown[1].eta, vec![NO_SERVICE_PLACEHOLDER]);
    }

    #[test]
    fn distance_ranks_first() {
        let records = vec![
            record("A", &["2024-01-01T08:00:00+08:00"], None),
            record("B", &[""], Some(4)),
            record("C", &["2024-01-01T08:00:00+08:00"], Some(1)),
        ];
        let names: Vec<_> = prepare_rows(records, true)
            .into_iter()
            .map(|r| r.stop_name_tc)
            .collect();
        assert_eq!(names, vec!["C", "B", "A"]);
    }

    #[test]
    fn renders_eta_csv() {
        let mut r = record(
            "金泰閣",
            &["2024-01-01T08:00:00+08:00", "2024-01-01T08:10:00+08:00"],
            Some(2),
        );
        r.remarks_tc = vec!["原定班次".into()];
        r.intermediate_stops = vec!["沙田".into(), "中環".into()];
        r.stops_to_target = "中環".into();

        let csv = render_eta_csv(&prepare_rows(vec![r], true)).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Stop Name (TC),Route,Direction,Service Type,Sequence,Destination (TC),ETA Sequence,ETA,Remarks (TC),Intermediate Stops,Stops Until Target,Distance To Target"
        );
        assert_eq!(
            lines.next().unwrap(),
            "金泰閣,269D,O,1,3,中環,1|2,08:00|08:10,原定班次,\"沙田,中環\",中環,2"
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn missing_distance_is_empty_column() {
        let csv = render_eta_csv(&[record("甲", &["x"], None)]).unwrap();
        assert!(csv.lines().nth(1).unwrap().ends_with(",,"));
    }

    #[test]
    fn empty_tables_still_have_headers() {
        assert_eq!(render_eta_csv(&[]).unwrap().lines().count(), 1);
        assert_eq!(
            render_route_map_csv(&[]).unwrap(),
            "Stop Name,Routes (Route/Direction)\n"
        );
    }

    #[test]
    fn renders_route_map_csv() {
        let entries = vec![StopRoutes {
            stop_name: "沙田".into(),
            routes: vec!["269D/1".into(), "81K/1".into()],
        }];
        assert_eq!(
            render_route_map_csv(&entries).unwrap(),
            "Stop Name,Routes (Route/Direction)\n沙田,\"269D/1, 81K/1\"\n"
        );
    }
}
