//! In-memory KMB source for tests and offline development.
//!
//! Serves canned stops, arrivals and route-stop sequences as if they were
//! live API responses. Stops or routes without canned data answer with a
//! 404 API error, like the real service does for unknown ids.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::RouteKey;

use super::error::KmbError;
use super::source::KmbSource;
use super::types::{EtaDto, RouteStopDto, StopDto};

/// Mock KMB source.
#[derive(Debug, Clone, Default)]
pub struct MockKmbSource {
    stops: Option<Vec<StopDto>>,
    etas: HashMap<String, Vec<EtaDto>>,
    failing_etas: HashMap<String, String>,
    route_stops: HashMap<RouteKey, Vec<RouteStopDto>>,
    stop_fetches: Arc<AtomicUsize>,
}

impl MockKmbSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canned stop directory. Without one, `fetch_stops` reports a
    /// malformed response.
    pub fn with_stops(mut self, stops: Vec<StopDto>) -> Self {
        self.stops = Some(stops);
        self
    }

    pub fn with_etas(mut self, stop_id: impl Into<String>, etas: Vec<EtaDto>) -> Self {
        self.etas.insert(stop_id.into(), etas);
        self
    }

    /// Make arrivals for `stop_id` fail with an API error.
    pub fn with_failing_eta(
        mut self,
        stop_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.failing_etas.insert(stop_id.into(), message.into());
        self
    }

    /// Canned route-stop sequence, given as stop ids in travel order.
    pub fn with_route_stops<I, S>(mut self, key: RouteKey, stop_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = stop_ids
            .into_iter()
            .enumerate()
            .map(|(i, stop)| RouteStopDto {
                route: Some(key.route.clone()),
                bound: Some(key.direction.code().to_string()),
                service_type: Some(key.service_type.clone()),
                seq: Some((i + 1).to_string()),
                stop: Some(stop.into()),
            })
            .collect();
        self.route_stops.insert(key, rows);
        self
    }

    /// Number of times the stop directory has been requested.
    pub fn stop_fetch_count(&self) -> usize {
        self.stop_fetches.load(Ordering::SeqCst)
    }
}

impl KmbSource for MockKmbSource {
    async fn fetch_stops(&self) -> Result<Vec<StopDto>, KmbError> {
        self.stop_fetches.fetch_add(1, Ordering::SeqCst);
        self.stops.clone().ok_or_else(|| KmbError::Malformed {
            url: "mock://stop".to_string(),
        })
    }

    async fn fetch_stop_eta(&self, stop_id: &str) -> Result<Vec<EtaDto>, KmbError> {
        if let Some(message) = self.failing_etas.get(stop_id) {
            return Err(KmbError::Api {
                status: 500,
                message: message.clone(),
            });
        }
        self.etas.get(stop_id).cloned().ok_or_else(|| KmbError::Api {
            status: 404,
            message: format!("No mock arrivals for stop {stop_id}"),
        })
    }

    async fn fetch_route_stops(&self, key: &RouteKey) -> Result<Vec<RouteStopDto>, KmbError> {
        self.route_stops.get(key).cloned().ok_or_else(|| KmbError::Api {
            status: 404,
            message: format!("No mock route-stop data for {}", key.field()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;

    #[tokio::test]
    async fn missing_stop_directory_is_malformed() {
        let source = MockKmbSource::new();
        assert!(matches!(
            source.fetch_stops().await,
            Err(KmbError::Malformed { .. })
        ));
        assert_eq!(source.stop_fetch_count(), 1);
    }

    #[tokio::test]
    async fn route_stops_are_numbered_in_order() {
        let key = RouteKey::new("1A", Direction::Inbound, "1");
        let source = MockKmbSource::new().with_route_stops(key.clone(), ["A", "B"]);
        let rows = source.fetch_route_stops(&key).await.unwrap();
        assert_eq!(rows[1].seq.as_deref(), Some("2"));
        assert_eq!(rows[1].stop.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn failing_eta_reports_api_error() {
        let source = MockKmbSource::new().with_failing_eta("S1", "boom");
        assert!(matches!(
            source.fetch_stop_eta("S1").await,
            Err(KmbError::Api { status: 500, .. })
        ));
        assert!(matches!(
            source.fetch_stop_eta("S2").await,
            Err(KmbError::Api { status: 404, .. })
        ));
    }
}
