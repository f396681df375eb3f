//! Trait seam over the KMB API so the refresher and ETA pipeline can run
//! against canned data.

use std::future::Future;

use crate::domain::RouteKey;

use super::client::KmbClient;
use super::error::KmbError;
use super::types::{EtaDto, RouteStopDto, StopDto};

/// Provides KMB stop, arrival and route-stop data.
pub trait KmbSource: Send + Sync {
    fn fetch_stops(&self) -> impl Future<Output = Result<Vec<StopDto>, KmbError>> + Send;

    fn fetch_stop_eta(
        &self,
        stop_id: &str,
    ) -> impl Future<Output = Result<Vec<EtaDto>, KmbError>> + Send;

    fn fetch_route_stops(
        &self,
        key: &RouteKey,
    ) -> impl Future<Output = Result<Vec<RouteStopDto>, KmbError>> + Send;
}

impl KmbSource for KmbClient {
    async fn fetch_stops(&self) -> Result<Vec<StopDto>, KmbError> {
        KmbClient::fetch_stops(self).await
    }

    async fn fetch_stop_eta(&self, stop_id: &str) -> Result<Vec<EtaDto>, KmbError> {
        KmbClient::fetch_stop_eta(self, stop_id).await
    }

    async fn fetch_route_stops(&self, key: &RouteKey) -> Result<Vec<RouteStopDto>, KmbError> {
        KmbClient::fetch_route_stops(self, key).await
    }
}
