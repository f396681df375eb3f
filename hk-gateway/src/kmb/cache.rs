//! Typed view of the KMB data held in the key-value store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{Area, Direction, RouteKey, Stop};
use crate::store::{Batch, KvStore};

/// Store keys.
pub mod keys {
    pub const ALL_STOPS: &str = "kmb_all_stops";
    pub const HOME_STOPS: &str = "kmb_stops_home_area";
    pub const WORK_STOPS: &str = "kmb_stops_work_area";
    pub const HOME_ROUTES: &str = "kmb_home_area_routes";
    pub const WORK_ROUTES: &str = "kmb_work_area_routes";
    pub const ROUTE_STOPS: &str = "kmb_route_stop";
    pub const LAST_FETCH_TIME: &str = "kmb_stops_last_fetch_time";

    /// Every key a refresh rewrites, except the timestamp.
    pub const DATA_KEYS: [&str; 6] = [
        HOME_STOPS,
        WORK_STOPS,
        ALL_STOPS,
        HOME_ROUTES,
        WORK_ROUTES,
        ROUTE_STOPS,
    ];
}

/// Route entry of the per-area route lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredRoute {
    route: String,
    dir: Direction,
    #[serde(rename = "serviceType")]
    service_type: String,
}

impl From<&RouteKey> for StoredRoute {
    fn from(key: &RouteKey) -> Self {
        Self {
            route: key.route.clone(),
            dir: key.direction,
            service_type: key.service_type.clone(),
        }
    }
}

/// KMB data accessors over a shared [`KvStore`].
#[derive(Debug, Clone)]
pub struct KmbCache {
    store: Arc<KvStore>,
}

impl KmbCache {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }

    pub fn stops_key(area: Area) -> &'static str {
        match area {
            Area::Home => keys::HOME_STOPS,
            Area::Work => keys::WORK_STOPS,
        }
    }

    pub fn routes_key(area: Area) -> &'static str {
        match area {
            Area::Home => keys::HOME_ROUTES,
            Area::Work => keys::WORK_ROUTES,
        }
    }

    /// Cached stops of an area, keyed and ordered by stop id.
    ///
    /// Entries that no longer parse are skipped.
    pub async fn area_stops(&self, area: Area) -> BTreeMap<String, Stop> {
        self.store
            .hgetall(Self::stops_key(area))
            .await
            .into_iter()
            .filter_map(|(id, json)| match serde_json::from_str::<Stop>(&json) {
                Ok(stop) => Some((id, stop)),
                Err(e) => {
                    warn!(stop_id = %id, error = %e, "Skipping unparsable cached stop");
                    None
                }
            })
            .collect()
    }

    /// Cached route lists of an area.
    #[cfg(test)]
    pub async fn area_routes(&self, area: Area) -> Vec<RouteKey> {
        let Some(json) = self.store.get(Self::routes_key(area)).await else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<StoredRoute>>(&json) {
            Ok(routes) => routes
                .into_iter()
                .map(|r| RouteKey::new(r.route, r.dir, r.service_type))
                .collect(),
            Err(e) => {
                warn!(area = %area, error = %e, "Ignoring unparsable cached route list");
                Vec::new()
            }
        }
    }

    /// All cached route-stop sequences, as stop names in travel order.
    pub async fn route_stops(&self) -> HashMap<RouteKey, Vec<String>> {
        self.store
            .hgetall(keys::ROUTE_STOPS)
            .await
            .into_iter()
            .filter_map(|(field, joined)| {
                let key = RouteKey::parse_field(&field).ok()?;
                let names = joined.split(',').map(|s| s.trim().to_string()).collect();
                Some((key, names))
            })
            .collect()
    }

    /// Epoch milliseconds of the last completed refresh.
    pub async fn last_refresh_millis(&self) -> Option<i64> {
        self.store
            .get(keys::LAST_FETCH_TIME)
            .await
            .and_then(|s| s.parse().ok())
    }

    /// Queue a stop into a stop hash.
    pub fn stage_stop(batch: &mut Batch, key: &str, stop: &Stop) -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(stop)?;
        batch.hset(key, stop.stop.clone(), json);
        Ok(())
    }

    /// Queue an area's route list.
    pub fn stage_routes(
        batch: &mut Batch,
        area: Area,
        routes: &[RouteKey],
    ) -> Result<(), serde_json::Error> {
        let stored: Vec<StoredRoute> = routes.iter().map(StoredRoute::from).collect();
        batch.set(Self::routes_key(area), serde_json::to_string(&stored)?);
        Ok(())
    }

    /// Queue one route-stop sequence.
    pub fn stage_route_stops(batch: &mut Batch, key: &RouteKey, names: &[String]) {
        batch.hset(keys::ROUTE_STOPS, key.field(), names.join(","));
    }
}
