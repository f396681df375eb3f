//! Background refresh of the cached stop directory and route sequences.
//!
//! The refresher checks the stored refresh timestamp on every tick and only
//! talks to the upstream API once the configured interval has elapsed. All
//! writes of one cycle go into a single [`Batch`], so readers see either the
//! previous cache or the complete new one.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::domain::{Area, AreaMatcher, Direction, RouteKey};
use crate::eta::fetch_arrivals;
use crate::kmb::{KmbCache, KmbError, KmbSource, keys};
use crate::store::{Batch, StoreError};

/// Shortest loop period `start` will schedule.
const MIN_TICK: Duration = Duration::from_secs(1);

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(millis)),
        }
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Failed to fetch stop directory: {0}")]
    Source(#[from] KmbError),

    #[error("Failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to write cache: {0}")]
    Store(#[from] StoreError),
}

/// Which stops belong to which area, and how often to refresh.
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub interval: Duration,
    pub home: AreaMatcher,
    pub work: AreaMatcher,
}

impl RefreshSettings {
    fn matcher(&self, area: Area) -> &AreaMatcher {
        match area {
            Area::Home => &self.home,
            Area::Work => &self.work,
        }
    }
}

/// Counts from one completed refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub all_stops: usize,
    pub home_stops: usize,
    pub work_stops: usize,
    pub home_routes: usize,
    pub work_routes: usize,
    /// Route sequences written
    pub route_sequences: usize,
    /// Route sequences skipped after a failed or empty fetch
    pub skipped_routes: usize,
    pub refreshed_at_millis: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The cache is younger than the interval.
    Fresh,
    /// Another refresh is running.
    InFlight,
    Refreshed(RefreshStats),
}

/// Owns the refresh cycle for the KMB cache.
pub struct RefreshService<S> {
    source: Arc<S>,
    cache: KmbCache,
    clock: Arc<dyn Clock>,
    settings: RefreshSettings,
    in_flight: Mutex<()>,
}

/// Handle to a running refresh loop.
#[derive(Debug)]
pub struct RefreshHandle {
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Stop the loop. A refresh in progress is abandoned before its batch
    /// is applied, leaving the cache as it was.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl<S: KmbSource + 'static> RefreshService<S> {
    pub fn new(
        source: Arc<S>,
        cache: KmbCache,
        clock: Arc<dyn Clock>,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            source,
            cache,
            clock,
            settings,
            in_flight: Mutex::new(()),
        }
    }

    /// Spawn the refresh loop: one check now, then one per interval.
    ///
    /// The loop never ticks faster than once a second.
    pub fn start(self: Arc<Self>) -> RefreshHandle {
        let interval = self.settings.interval;
        if interval < MIN_TICK {
            warn!(?interval, "Refresh interval below one second, ticking every second");
        }
        let interval = interval.max(MIN_TICK);
        info!(interval_secs = interval.as_secs(), "Starting KMB cache refresher");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.run_once().await {
                    Ok(RefreshOutcome::Refreshed(stats)) => {
                        debug!(?stats, "Refresh cycle finished");
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "Error refreshing KMB stop or route data"),
                }
            }
        });

        RefreshHandle { task }
    }

    /// Run one refresh check.
    pub async fn run_once(&self) -> Result<RefreshOutcome, RefreshError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            info!("KMB refresh already in flight, skipping");
            return Ok(RefreshOutcome::InFlight);
        };

        let now = self.clock.now_millis();
        let interval_ms = i64::try_from(self.settings.interval.as_millis()).unwrap_or(i64::MAX);
        if let Some(last) = self.cache.last_refresh_millis().await
            && now.saturating_sub(last) < interval_ms
        {
            info!(last_refresh = last, "KMB stop data is fresh, skipping refresh");
            return Ok(RefreshOutcome::Fresh);
        }

        info!("Starting KMB stop data refresh");
        let stats = self.refresh(now).await?;
        info!(
            all_stops = stats.all_stops,
            home_stops = stats.home_stops,
            work_stops = stats.work_stops,
            home_routes = stats.home_routes,
            work_routes = stats.work_routes,
            route_sequences = stats.route_sequences,
            skipped_routes = stats.skipped_routes,
            refreshed_at = %chrono::DateTime::from_timestamp_millis(now)
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            "KMB stop data refreshed"
        );
        Ok(RefreshOutcome::Refreshed(stats))
    }

    async fn refresh(&self, now: i64) -> Result<RefreshStats, RefreshError> {
        let directory = self.source.fetch_stops().await?;

        let mut batch = Batch::new();
        for key in keys::DATA_KEYS {
            batch.del(key);
        }

        let mut stats = RefreshStats {
            refreshed_at_millis: now,
            ..Default::default()
        };
        let mut names_by_id: HashMap<String, String> = HashMap::new();
        let mut area_ids: HashMap<Area, Vec<String>> = HashMap::new();

        for stop in directory.into_iter().filter_map(|dto| dto.into_stop()) {
            KmbCache::stage_stop(&mut batch, keys::ALL_STOPS, &stop)?;
            stats.all_stops += 1;

            for area in Area::ALL {
                if self.settings.matcher(area).matches(&stop.name_en) {
                    KmbCache::stage_stop(&mut batch, KmbCache::stops_key(area), &stop)?;
                    area_ids.entry(area).or_default().push(stop.stop.clone());
                }
            }
            names_by_id.insert(stop.stop.clone(), stop.name_tc);
        }
        stats.home_stops = area_ids.get(&Area::Home).map_or(0, Vec::len);
        stats.work_stops = area_ids.get(&Area::Work).map_or(0, Vec::len);

        let mut all_routes = Vec::new();
        for area in Area::ALL {
            let ids = area_ids.get(&area).map(Vec::as_slice).unwrap_or_default();
            let routes = self.discover_routes(ids).await;
            KmbCache::stage_routes(&mut batch, area, &routes)?;
            info!(area = %area, routes = routes.len(), "Identified area routes");
            match area {
                Area::Home => stats.home_routes = routes.len(),
                Area::Work => stats.work_routes = routes.len(),
            }
            all_routes.extend(routes);
        }

        let mut seen = HashSet::new();
        for key in all_routes {
            if !seen.insert(key.clone()) {
                continue;
            }
            match self.source.fetch_route_stops(&key).await {
                Ok(rows) => {
                    let names: Vec<String> = rows
                        .into_iter()
                        .filter_map(|row| row.stop)
                        .map(|id| match names_by_id.get(&id) {
                            Some(name) if !name.is_empty() => name.clone(),
                            _ => id,
                        })
                        .collect();
                    KmbCache::stage_route_stops(&mut batch, &key, &names);
                    stats.route_sequences += 1;
                }
                Err(KmbError::Malformed { .. }) => {
                    warn!(route = %key.field(), "No data found for route-stop");
                    stats.skipped_routes += 1;
                }
                Err(e) => {
                    warn!(route = %key.field(), error = %e, "Failed to fetch route-stop data");
                    stats.skipped_routes += 1;
                }
            }
        }

        batch.set(keys::LAST_FETCH_TIME, now.to_string());
        self.cache.store().apply(batch).await?;
        Ok(stats)
    }

    /// Distinct routes with live arrivals at any of `stop_ids`, first-seen
    /// order. Stops whose arrivals fail are skipped.
    async fn discover_routes(&self, stop_ids: &[String]) -> Vec<RouteKey> {
        let results = fetch_arrivals(self.source.as_ref(), stop_ids).await;

        let mut seen = HashSet::new();
        let mut routes = Vec::new();
        for eta in results.iter().filter_map(|r| r.arrivals()).flatten() {
            let (Some(route), Some(dir), Some(service_type)) = (
                eta.route.as_deref().filter(|s| !s.is_empty()),
                eta.dir.as_deref().filter(|s| !s.is_empty()),
                eta.service_type.as_deref().filter(|s| !s.is_empty()),
            ) else {
                continue;
            };
            let Some(direction) = Direction::from_any(dir) else {
                debug!(route, dir, "Skipping arrival with unknown direction");
                continue;
            };
            let key = RouteKey::new(route, direction, service_type);
            if seen.insert(key.clone()) {
                routes.push(key);
            }
        }
        routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Stop;
    use crate::eta::aggregate::fixtures::eta;
    use crate::kmb::{MockKmbSource, StopDto};
    use crate::store::KvStore;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);
    const START: i64 = 1_704_067_200_000;

    fn stop_dto(id: &str, name_en: &str, name_tc: &str) -> StopDto {
        StopDto {
            stop: Some(id.into()),
            name_en: Some(name_en.into()),
            name_tc: Some(name_tc.into()),
            lat: Some("22.3".into()),
            long: Some("114.1".into()),
            ..Default::default()
        }
    }

    fn settings() -> RefreshSettings {
        RefreshSettings {
            interval: DAY,
            home: AreaMatcher::new(["KAM TAI COURT", "CHEVALIER GARDEN BUS"]),
            work: AreaMatcher::new(["HANKOW ROAD"]),
        }
    }

    fn source() -> MockKmbSource {
        MockKmbSource::new()
            .with_stops(vec![
                stop_dto("S1", "KAM TAI COURT", "金泰閣"),
                stop_dto("S2", "CHEVALIER GARDEN BUS", "豪門"),
                stop_dto("W1", "HANKOW ROAD BUS TERMINUS", "漢口道"),
                stop_dto("X1", "SHA TIN CENTRAL", ""),
                StopDto {
                    stop: Some("NONAME".into()),
                    ..Default::default()
                },
            ])
            .with_etas("S1", vec![eta("269D", "O", "中環", Some("t"), "")])
            .with_etas(
                "S2",
                vec![
                    eta("269D", "O", "中環", Some("t"), ""),
                    eta("81K", "I", "沙田", Some("t"), ""),
                ],
            )
            .with_etas("W1", vec![eta("269D", "O", "中環", Some("t"), "")])
            .with_route_stops(RouteKey::new("269D", Direction::Outbound, "1"), ["S1", "X1", "W1"])
    }

    fn service(
        source: MockKmbSource,
        clock: &ManualClock,
    ) -> (RefreshService<MockKmbSource>, KmbCache) {
        service_with(source, clock, settings())
    }

    fn service_with(
        source: MockKmbSource,
        clock: &ManualClock,
        settings: RefreshSettings,
    ) -> (RefreshService<MockKmbSource>, KmbCache) {
        let cache = KmbCache::new(Arc::new(KvStore::in_memory()));
        let service =
            RefreshService::new(Arc::new(source), cache.clone(), Arc::new(clock.clone()), settings);
        (service, cache)
    }

    async fn wait_for_refresh(cache: &KmbCache) -> Option<i64> {
        for _ in 0..100 {
            if let Some(at) = cache.last_refresh_millis().await {
                return Some(at);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }

    #[tokio::test]
    async fn populates_all_keys() {
        let clock = ManualClock::new(START);
        let (service, cache) = service(source(), &clock);

        let outcome = service.run_once().await.unwrap();

        let RefreshOutcome::Refreshed(stats) = outcome else {
            panic!("expected a refresh, got {outcome:?}");
        };
        assert_eq!(stats.all_stops, 4);
        assert_eq!(stats.home_stops, 2);
        assert_eq!(stats.work_stops, 1);
        assert_eq!(stats.home_routes, 2);
        assert_eq!(stats.work_routes, 1);
        assert_eq!(stats.route_sequences, 1);
        assert_eq!(stats.skipped_routes, 1);

        let home: Vec<String> = cache.area_stops(Area::Home).await.into_keys().collect();
        assert_eq!(home, vec!["S1", "S2"]);
        assert_eq!(cache.store().hgetall(keys::ALL_STOPS).await.len(), 4);
        assert_eq!(cache.last_refresh_millis().await, Some(START));
        assert_eq!(
            cache.area_routes(Area::Home).await,
            vec![
                RouteKey::new("269D", Direction::Outbound, "1"),
                RouteKey::new("81K", Direction::Inbound, "1"),
            ]
        );

        let sequences = cache.route_stops().await;
        assert_eq!(
            sequences[&RouteKey::new("269D", Direction::Outbound, "1")],
            vec!["金泰閣", "X1", "漢口道"]
        );
    }

    #[tokio::test]
    async fn skips_until_interval_elapses() {
        let clock = ManualClock::new(START);
        let (service, _) = service(source(), &clock);

        assert!(matches!(service.run_once().await.unwrap(), RefreshOutcome::Refreshed(_)));

        clock.advance(DAY - Duration::from_secs(1));
        assert_eq!(service.run_once().await.unwrap(), RefreshOutcome::Fresh);

        clock.advance(Duration::from_secs(1));
        assert!(matches!(service.run_once().await.unwrap(), RefreshOutcome::Refreshed(_)));
        assert_eq!(service.source.stop_fetch_count(), 2);
    }

    #[tokio::test]
    async fn malformed_directory_keeps_previous_cache() {
        let clock = ManualClock::new(START);
        let (service, cache) = service(MockKmbSource::new(), &clock);

        let mut batch = Batch::new();
        let old = Stop {
            stop: "OLD".into(),
            name_en: "KAM TAI COURT".into(),
            name_tc: "金泰閣".into(),
            name_sc: None,
            lat: String::new(),
            long: String::new(),
        };
        KmbCache::stage_stop(&mut batch, keys::HOME_STOPS, &old).unwrap();
        cache.store().apply(batch).await.unwrap();

        let result = service.run_once().await;

        assert!(matches!(result, Err(RefreshError::Source(KmbError::Malformed { .. }))));
        assert!(cache.area_stops(Area::Home).await.contains_key("OLD"));
        assert_eq!(cache.last_refresh_millis().await, None);
    }

    #[tokio::test]
    async fn refresh_replaces_previous_data() {
        let clock = ManualClock::new(START);
        let (service, cache) = service(source(), &clock);

        let mut batch = Batch::new();
        batch.hset(keys::HOME_STOPS, "GONE", "{}");
        cache.store().apply(batch).await.unwrap();

        service.run_once().await.unwrap();
        assert!(!cache.area_stops(Area::Home).await.contains_key("GONE"));
    }

    #[tokio::test]
    async fn overlapping_refresh_is_skipped() {
        let clock = ManualClock::new(START);
        let (service, _) = service(source(), &clock);

        let _held = service.in_flight.lock().await;
        assert_eq!(service.run_once().await.unwrap(), RefreshOutcome::InFlight);
        assert_eq!(service.source.stop_fetch_count(), 0);
    }

    #[tokio::test]
    async fn started_loop_refreshes_immediately_and_stops() {
        let clock = ManualClock::new(START);
        let (service, cache) = service(source(), &clock);
        let handle = Arc::new(service).start();

        assert_eq!(wait_for_refresh(&cache).await, Some(START));
        assert!(!handle.task.is_finished());
        handle.stop();
    }

    #[tokio::test]
    async fn zero_interval_loop_still_runs() {
        let clock = ManualClock::new(START);
        let settings = RefreshSettings {
            interval: Duration::ZERO,
            ..settings()
        };
        let (service, cache) = service_with(source(), &clock, settings);
        let handle = Arc::new(service).start();

        assert_eq!(wait_for_refresh(&cache).await, Some(START));
        assert!(!handle.task.is_finished());
        handle.stop();
    }

    #[tokio::test]
    async fn huge_interval_keeps_cache_fresh() {
        let clock = ManualClock::new(START);
        let settings = RefreshSettings {
            interval: Duration::MAX,
            ..settings()
        };
        let (service, _) = service_with(source(), &clock, settings);

        assert!(matches!(service.run_once().await.unwrap(), RefreshOutcome::Refreshed(_)));
        clock.advance(DAY * 365);
        assert_eq!(service.run_once().await.unwrap(), RefreshOutcome::Fresh);
    }

    #[test]
    fn manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(5);
        assert_eq!(clock.now_millis(), 5);
        clock.advance(Duration::from_millis(10));
        assert_eq!(clock.now_millis(), 15);
        clock.set(1);
        assert_eq!(clock.now_millis(), 1);
    }
}
