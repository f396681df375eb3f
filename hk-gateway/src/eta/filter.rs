//! Area-specific arrival filters.
//!
//! The home area has two stops a short walk apart that share services.
//! The dedup filter hides a service at the secondary stop when the same
//! route and direction is already listed at the primary stop.

use std::collections::{BTreeMap, HashSet};

use crate::domain::{DirectionFilter, Stop};
use crate::kmb::EtaDto;

use super::fetch::StopArrivals;

/// Filter applied to an area's arrivals before aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AreaFilter {
    /// Keep everything.
    #[default]
    None,
    /// Drop route/direction pairs at `secondary` that also serve `primary`.
    /// Both names are matched as upper-case substrings of the English
    /// stop name.
    DedupSecondary { primary: String, secondary: String },
}

/// Data gathered by [`AreaFilter::pre_pass`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    /// `(route, direction code)` pairs seen at the primary stop.
    primary_routes: HashSet<(String, String)>,
}

impl FilterState {
    pub fn contains(&self, route: &str, dir: &str) -> bool {
        self.primary_routes.contains(&(route.to_string(), dir.to_string()))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.primary_routes.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.primary_routes.is_empty()
    }
}

impl AreaFilter {
    /// Build the dedup filter, or `None` when either name is blank.
    pub fn dedup_secondary(primary: &str, secondary: &str) -> Self {
        let primary = primary.trim().to_uppercase();
        let secondary = secondary.trim().to_uppercase();
        if primary.is_empty() || secondary.is_empty() {
            return AreaFilter::None;
        }
        AreaFilter::DedupSecondary { primary, secondary }
    }

    /// Collect what the apply pass needs from all successful fetches.
    pub fn pre_pass(
        &self,
        results: &[StopArrivals],
        stops: &BTreeMap<String, Stop>,
        direction: DirectionFilter,
    ) -> FilterState {
        let AreaFilter::DedupSecondary { primary, .. } = self else {
            return FilterState::default();
        };

        let primary_routes = results
            .iter()
            .filter(|r| {
                stops
                    .get(&r.stop_id)
                    .is_some_and(|s| s.name_en.to_uppercase().contains(primary.as_str()))
            })
            .filter_map(StopArrivals::arrivals)
            .flatten()
            .filter_map(|eta| {
                let route = eta.route.as_deref().filter(|r| !r.is_empty())?;
                let dir = eta.dir.as_deref().unwrap_or_default();
                direction
                    .accepts_code(dir)
                    .then(|| (route.to_string(), dir.to_string()))
            })
            .collect();

        FilterState { primary_routes }
    }

    /// Filter the (already direction-filtered) arrivals of one stop.
    pub fn apply<'a>(
        &self,
        etas: Vec<&'a EtaDto>,
        stop: &Stop,
        state: &FilterState,
    ) -> Vec<&'a EtaDto> {
        let AreaFilter::DedupSecondary { secondary, .. } = self else {
            return etas;
        };
        if !stop.name_en.to_uppercase().contains(secondary.as_str()) {
            return etas;
        }

        etas.into_iter()
            .filter(|eta| {
                let route = eta.route.as_deref().unwrap_or_default();
                let dir = eta.dir.as_deref().unwrap_or_default();
                !state.contains(route, dir)
            })
            .collect()
    }
}
