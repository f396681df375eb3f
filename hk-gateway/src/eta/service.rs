//! Request-time ETA service over the cache and a live source.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{Area, DirectionFilter, Stop};
use crate::kmb::{KmbCache, KmbSource};

use super::aggregate::{EtaQuery, EtaRecord, aggregate};
use super::fetch::fetch_arrivals;
use super::filter::AreaFilter;
use super::route_map::{StopRoutes, build_stop_route_map};

/// Serves area stops, merged arrivals and stop → route maps.
pub struct EtaService<S> {
    source: Arc<S>,
    cache: KmbCache,
    home_filter: AreaFilter,
}

impl<S> Clone for EtaService<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            cache: self.cache.clone(),
            home_filter: self.home_filter.clone(),
        }
    }
}

impl<S: KmbSource> EtaService<S> {
    pub fn new(source: Arc<S>, cache: KmbCache, home_filter: AreaFilter) -> Self {
        Self {
            source,
            cache,
            home_filter,
        }
    }

    /// The filter used for an area. Only home has one.
    pub fn filter_for(&self, area: Area) -> &AreaFilter {
        const NO_FILTER: &AreaFilter = &AreaFilter::None;
        match area {
            Area::Home => &self.home_filter,
            Area::Work => NO_FILTER,
        }
    }

    /// Cached stops of an area.
    pub async fn area_stops(&self, area: Area) -> BTreeMap<String, Stop> {
        self.cache.area_stops(area).await
    }

    /// Live arrivals for every cached stop of `area`, merged.
    ///
    /// Returns no records when the area has no cached stops or no stop
    /// answered with matching arrivals.
    pub async fn bus_etas(&self, area: Area, query: &EtaQuery) -> Vec<EtaRecord> {
        let stops = self.cache.area_stops(area).await;
        if stops.is_empty() {
            debug!(area = %area, "No cached stops");
            return Vec::new();
        }

        let results = fetch_arrivals(self.source.as_ref(), stops.keys()).await;
        let route_stops = self.cache.route_stops().await;
        let records = aggregate(&stops, &results, &route_stops, self.filter_for(area), query);

        debug!(
            area = %area,
            stops = stops.len(),
            records = records.len(),
            "Aggregated arrivals"
        );
        records
    }

    /// Stop → route map for the routes touching `area`.
    pub async fn stop_route_map(&self, area: Area, direction: DirectionFilter) -> Vec<StopRoutes> {
        let stops = self.cache.area_stops(area).await;
        let route_stops = self.cache.route_stops().await;
        build_stop_route_map(&stops, &route_stops, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, RouteKey};
    use crate::eta::aggregate::fixtures::{eta, names, stop};
    use crate::kmb::MockKmbSource;
    use crate::kmb::keys;
    use crate::store::{Batch, KvStore};

    async fn seeded_cache() -> KmbCache {
        let cache = KmbCache::new(Arc::new(KvStore::in_memory()));
        let mut batch = Batch::new();
        for s in [
            stop("S1", "KAM TAI COURT", "金泰閣"),
            stop("S2", "CHEVALIER GARDEN BUS", "富豪花園"),
        ] {
            KmbCache::stage_stop(&mut batch, keys::HOME_STOPS, &s).unwrap();
        }
        let work = stop("W1", "HANKOW ROAD", "漢口道");
        KmbCache::stage_stop(&mut batch, keys::WORK_STOPS, &work).unwrap();
        KmbCache::stage_route_stops(
            &mut batch,
            &RouteKey::new("269D", Direction::Outbound, "1"),
            &names(&["金泰閣", "富豪花園", "中環"]),
        );
        cache.store().apply(batch).await.unwrap();
        cache
    }

    fn source() -> MockKmbSource {
        MockKmbSource::new()
            .with_etas(
                "S1",
                vec![eta("269D", "O", "中環", Some("2024-01-01T08:00:00+08:00"), "")],
            )
            .with_etas(
                "S2",
                vec![
                    eta("269D", "O", "中環", Some("2024-01-01T08:03:00+08:00"), ""),
                    eta("81K", "O", "沙田", Some("2024-01-01T08:05:00+08:00"), ""),
                ],
            )
            .with_failing_eta("W1", "boom")
    }

    #[tokio::test]
    async fn home_filter_dedups_secondary_stop() {
        let service = EtaService::new(
            Arc::new(source()),
            seeded_cache().await,
            AreaFilter::dedup_secondary("KAM TAI COURT", "CHEVALIER GARDEN BUS"),
        );
        let query = EtaQuery::new(DirectionFilter::Both, Some("中環"));

        let records = service.bus_etas(Area::Home, &query).await;

        let summary: Vec<_> = records
            .iter()
            .map(|r| (r.stop_id.as_str(), r.route.as_str(), r.distance_to_target))
            .collect();
        assert_eq!(summary, vec![("S1", "269D", Some(2)), ("S2", "81K", None)]);
    }

    #[tokio::test]
    async fn without_filter_both_stops_report_the_route() {
        let service = EtaService::new(Arc::new(source()), seeded_cache().await, AreaFilter::None);
        let records = service
            .bus_etas(Area::Home, &EtaQuery::new(DirectionFilter::Both, None))
            .await;
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn failing_stops_yield_no_records() {
        let service = EtaService::new(Arc::new(source()), seeded_cache().await, AreaFilter::None);
        let records = service
            .bus_etas(Area::Work, &EtaQuery::new(DirectionFilter::Both, None))
            .await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn empty_cache_yields_nothing() {
        let cache = KmbCache::new(Arc::new(KvStore::in_memory()));
        let service = EtaService::new(Arc::new(source()), cache, AreaFilter::None);
        let query = EtaQuery::new(DirectionFilter::Both, None);
        assert!(service.bus_etas(Area::Home, &query).await.is_empty());
        assert!(service.area_stops(Area::Home).await.is_empty());
    }

    #[tokio::test]
    async fn route_map_for_home() {
        let service = EtaService::new(Arc::new(source()), seeded_cache().await, AreaFilter::None);
        let map = service.stop_route_map(Area::Home, DirectionFilter::Both).await;
        assert_eq!(map.len(), 3);
        assert!(map.iter().all(|e| e.routes == vec!["269D/1".to_string()]));
        assert!(service.stop_route_map(Area::Work, DirectionFilter::Both).await.is_empty());
    }
}
