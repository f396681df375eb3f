//! Merge raw arrivals into display records.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::domain::{Direction, DirectionFilter, RouteKey, Stop, display_name};
use crate::kmb::EtaDto;

use super::fetch::StopArrivals;
use super::filter::AreaFilter;

/// Parameters of one ETA request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtaQuery {
    pub direction: DirectionFilter,
    /// Stop-name substring to measure distance to; already suffix-stripped
    /// and never empty.
    pub target: Option<String>,
}

impl EtaQuery {
    /// Build a query. A target that is blank once its parenthetical
    /// suffix is removed counts as no target.
    pub fn new(direction: DirectionFilter, target: Option<&str>) -> Self {
        let target = target
            .map(display_name)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        Self { direction, target }
    }
}

/// One merged arrival record: all predictions for the same stop, route,
/// direction, service type and destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EtaRecord {
    pub stop_id: String,
    pub stop_name_tc: String,
    pub company: String,
    pub route: String,
    pub direction: String,
    pub service_type: String,
    pub sequence: String,
    pub destination_tc: String,
    /// One slot per merged arrival, in input order
    pub eta_sequence: Vec<String>,
    /// One slot per merged arrival; empty when the API gave no time
    pub eta: Vec<String>,
    /// Non-empty remarks only
    pub remarks_tc: Vec<String>,
    pub data_timestamp: String,
    /// Stop names after this one, display form
    pub intermediate_stops: Vec<String>,
    /// Name of the matched target stop, empty if none
    pub stops_to_target: String,
    /// Stops until the target; `Some(0)` when this stop is the target
    pub distance_to_target: Option<u32>,
}

impl EtaRecord {
    /// Whether any merged arrival carries a time.
    pub fn has_eta(&self) -> bool {
        self.eta.iter().any(|t| !t.is_empty())
    }

    pub fn eta_field(&self) -> String {
        self.eta.join("|")
    }

    pub fn eta_sequence_field(&self) -> String {
        self.eta_sequence.join("|")
    }

    pub fn remarks_field(&self) -> String {
        self.remarks_tc.join("|")
    }

    pub fn intermediate_stops_field(&self) -> String {
        self.intermediate_stops.join(",")
    }
}

/// Distance from the current stop to the first stop matching a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDistance {
    pub stops: u32,
    pub stop_name: String,
}

/// Position of a stop on a route: first name containing `name_tc`.
/// An empty name never matches.
pub fn find_position(route_names: &[String], name_tc: &str) -> Option<usize> {
    if name_tc.is_empty() {
        return None;
    }
    route_names.iter().position(|n| n.contains(name_tc))
}

/// Display names of the stops after `current`, blanks dropped.
pub fn downstream_stops(route_names: &[String], current: usize) -> Vec<String> {
    route_names
        .iter()
        .skip(current + 1)
        .map(|n| display_name(n))
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

/// Count stops from `current` to the first stop whose display name
/// contains `target`, looking at the current stop first.
pub fn distance_to_target(
    route_names: &[String],
    current: usize,
    target: &str,
) -> Option<TargetDistance> {
    route_names
        .iter()
        .enumerate()
        .skip(current)
        .map(|(i, n)| (i - current, display_name(n)))
        .find(|(_, name)| name.contains(target))
        .map(|(steps, name)| TargetDistance {
            stops: steps as u32,
            stop_name: name.to_string(),
        })
}

type MergeKey = (String, String, String, String, String);

fn field(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Merge the arrivals of an area's stops into records.
///
/// Stops are visited in `stops` order; stops whose fetch failed or that
/// have no arrivals contribute nothing. Records keep first-seen order.
pub fn aggregate(
    stops: &BTreeMap<String, Stop>,
    results: &[StopArrivals],
    route_stops: &HashMap<RouteKey, Vec<String>>,
    filter: &AreaFilter,
    query: &EtaQuery,
) -> Vec<EtaRecord> {
    let by_stop: HashMap<&str, &StopArrivals> =
        results.iter().map(|r| (r.stop_id.as_str(), r)).collect();
    let filter_state = filter.pre_pass(results, stops, query.direction);

    let mut records: Vec<EtaRecord> = Vec::new();
    let mut index: HashMap<MergeKey, usize> = HashMap::new();

    for (stop_id, stop) in stops {
        let Some(arrivals) = by_stop.get(stop_id.as_str()).and_then(|r| r.arrivals()) else {
            continue;
        };

        let etas: Vec<&EtaDto> = arrivals
            .iter()
            .filter(|e| query.direction.accepts_code(e.dir.as_deref().unwrap_or_default()))
            .collect();
        let etas = filter.apply(etas, stop, &filter_state);

        for eta in etas {
            let merge_key = (
                stop_id.clone(),
                field(&eta.route),
                field(&eta.dir),
                field(&eta.service_type),
                field(&eta.dest_tc),
            );

            let slot = match index.get(&merge_key) {
                Some(&slot) => slot,
                None => {
                    records.push(new_record(stop_id, stop, eta, route_stops, query));
                    index.insert(merge_key, records.len() - 1);
                    records.len() - 1
                }
            };

            let record = &mut records[slot];
            record.eta_sequence.push(field(&eta.eta_seq));
            record.eta.push(field(&eta.eta));
            if let Some(remark) = eta.rmk_tc.as_ref().filter(|r| !r.is_empty()) {
                record.remarks_tc.push(remark.clone());
            }
        }
    }

    records
}

/// Start a record from the first arrival of its merge group.
fn new_record(
    stop_id: &str,
    stop: &Stop,
    eta: &EtaDto,
    route_stops: &HashMap<RouteKey, Vec<String>>,
    query: &EtaQuery,
) -> EtaRecord {
    let route_names = eta
        .dir
        .as_deref()
        .and_then(Direction::from_any)
        .map(|dir| RouteKey::new(field(&eta.route), dir, field(&eta.service_type)))
        .and_then(|key| route_stops.get(&key))
        .map(Vec::as_slice)
        .unwrap_or_default();

    let position = find_position(route_names, &stop.name_tc);
    let intermediate_stops = position
        .map(|p| downstream_stops(route_names, p))
        .unwrap_or_default();
    let target = match (position, &query.target) {
        (Some(p), Some(target)) => distance_to_target(route_names, p, target),
        _ => None,
    };

    EtaRecord {
        stop_id: if stop.stop.is_empty() { stop_id.to_string() } else { stop.stop.clone() },
        stop_name_tc: display_name(&stop.name_tc).to_string(),
        company: field(&eta.co),
        route: field(&eta.route),
        direction: field(&eta.dir),
        service_type: field(&eta.service_type),
        sequence: field(&eta.seq),
        destination_tc: field(&eta.dest_tc),
        eta_sequence: Vec::new(),
        eta: Vec::new(),
        remarks_tc: Vec::new(),
        data_timestamp: field(&eta.data_timestamp),
        intermediate_stops,
        stops_to_target: target.as_ref().map(|t| t.stop_name.clone()).unwrap_or_default(),
        distance_to_target: target.map(|t| t.stops),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn stop(id: &str, name_en: &str, name_tc: &str) -> Stop {
        Stop {
            stop: id.into(),
            name_en: name_en.into(),
            name_tc: name_tc.into(),
            name_sc: None,
            lat: String::new(),
            long: String::new(),
        }
    }

    pub fn eta(route: &str, dir: &str, dest: &str, time: Option<&str>, rmk: &str) -> EtaDto {
        EtaDto {
            co: Some("KMB".into()),
            route: Some(route.into()),
            dir: Some(dir.into()),
            service_type: Some("1".into()),
            seq: Some("3".into()),
            dest_tc: Some(dest.into()),
            dest_en: None,
            eta_seq: Some("1".into()),
            eta: time.map(str::to_string),
            rmk_tc: Some(rmk.into()),
            data_timestamp: Some("2024-01-01T07:55:00+08:00".into()),
        }
    }

    pub fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }
}
