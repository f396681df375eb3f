//! Intermediate stop → route map.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::domain::{DirectionFilter, RouteKey, Stop, display_name};

/// Routes serving one stop name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopRoutes {
    pub stop_name: String,
    /// `route/service_type` labels, first-seen order
    pub routes: Vec<String>,
}

/// Invert the cached route sequences that touch an area.
///
/// A route touches the area when one of its stop names equals, after
/// trimming, the Traditional-Chinese name of one of the area's stops.
/// Touching is decided per `route/service_type` label, so with both
/// directions selected the return leg of a touching route is included
/// too. Every stop on a touching route is listed, in display form, with
/// the labels serving it. Output is sorted by stop name.
pub fn build_stop_route_map(
    area_stops: &BTreeMap<String, Stop>,
    route_stops: &HashMap<RouteKey, Vec<String>>,
    direction: DirectionFilter,
) -> Vec<StopRoutes> {
    let area_names: BTreeSet<&str> = area_stops
        .values()
        .map(|s| s.name_tc.trim())
        .filter(|n| !n.is_empty())
        .collect();

    let mut routes: Vec<(&RouteKey, &Vec<String>)> = route_stops
        .iter()
        .filter(|(key, _)| direction.accepts(key.direction))
        .collect();
    routes.sort_by(|a, b| a.0.cmp(b.0));

    let touching: BTreeSet<String> = routes
        .iter()
        .filter(|(_, names)| names.iter().any(|n| area_names.contains(n.trim())))
        .map(|(key, _)| key.label())
        .collect();

    let mut by_stop: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, names) in routes {
        let label = key.label();
        if !touching.contains(&label) {
            continue;
        }
        for name in names.iter().map(|n| display_name(n)).filter(|n| !n.is_empty()) {
            let entry = by_stop.entry(name.to_string()).or_default();
            if !entry.contains(&label) {
                entry.push(label.clone());
            }
        }
    }

    by_stop
        .into_iter()
        .map(|(stop_name, routes)| StopRoutes { stop_name, routes })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use crate::eta::aggregate::fixtures::{names, stop};

    fn area() -> BTreeMap<String, Stop> {
        BTreeMap::from([("S1".to_string(), stop("S1", "KAM TAI COURT", "金泰閣"))])
    }

    #[test]
    fn lists_every_stop_on_touching_routes() {
        let route_stops = HashMap::from([
            (
                RouteKey::new("269D", Direction::Outbound, "1"),
                names(&["金泰閣", "沙田", "中環"]),
            ),
            (
                RouteKey::new("81K", Direction::Outbound, "1"),
                names(&["金泰閣 ", "沙田"]),
            ),
            (
                RouteKey::new("1A", Direction::Outbound, "1"),
                names(&["尖沙咀", "沙田"]),
            ),
        ]);

        let map = build_stop_route_map(&area(), &route_stops, DirectionFilter::Both);

        assert_eq!(
            map,
            vec![
                StopRoutes {
                    stop_name: "中環".into(),
                    routes: vec!["269D/1".into()],
                },
                StopRoutes {
                    stop_name: "沙田".into(),
                    routes: vec!["269D/1".into(), "81K/1".into()],
                },
                StopRoutes {
                    stop_name: "金泰閣".into(),
                    routes: vec!["269D/1".into(), "81K/1".into()],
                },
            ]
        );
    }

    #[test]
    fn direction_filter_limits_routes() {
        let route_stops = HashMap::from([
            (
                RouteKey::new("269D", Direction::Outbound, "1"),
                names(&["金泰閣", "中環"]),
            ),
            (
                RouteKey::new("269D", Direction::Inbound, "1"),
                names(&["天水圍", "金泰閣"]),
            ),
        ]);

        let map = build_stop_route_map(
            &area(),
            &route_stops,
            DirectionFilter::Only(Direction::Inbound),
        );
        let stop_names: Vec<_> = map.iter().map(|e| e.stop_name.as_str()).collect();
        assert_eq!(stop_names, vec!["天水圍", "金泰閣"]);
    }

    #[test]
    fn return_leg_of_touching_route_is_included() {
        let route_stops = HashMap::from([
            (
                RouteKey::new("269D", Direction::Outbound, "1"),
                names(&["金泰閣", "中環 (CE1)"]),
            ),
            (
                RouteKey::new("269D", Direction::Inbound, "1"),
                names(&["中環 (CE2)", "天水圍"]),
            ),
        ]);

        let map = build_stop_route_map(&area(), &route_stops, DirectionFilter::Both);
        let stop_names: Vec<_> = map.iter().map(|e| e.stop_name.as_str()).collect();
        assert_eq!(stop_names, vec!["中環", "天水圍", "金泰閣"]);
        assert_eq!(map[0].routes, vec!["269D/1"]);
    }

    #[test]
    fn partial_name_does_not_touch() {
        let route_stops = HashMap::from([(
            RouteKey::new("269D", Direction::Outbound, "1"),
            names(&["金泰閣 (TW1)", "中環"]),
        )]);
        assert!(build_stop_route_map(&area(), &route_stops, DirectionFilter::Both).is_empty());
    }
}
