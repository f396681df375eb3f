//! Application state for the web layer.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::eta::EtaService;
use crate::weather::WeatherService;

/// Shared application state.
pub struct AppState<S> {
    /// Bus stops and arrivals
    pub eta: EtaService<S>,

    /// HKO summaries and radar analysis
    pub weather: Arc<WeatherService>,

    /// `/apis` and `/docs` content
    pub catalog: Arc<Catalog>,
}

impl<S> AppState<S> {
    pub fn new(eta: EtaService<S>, weather: WeatherService, catalog: Catalog) -> Self {
        Self {
            eta,
            weather: Arc::new(weather),
            catalog: Arc::new(catalog),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            eta: self.eta.clone(),
            weather: Arc::clone(&self.weather),
            catalog: Arc::clone(&self.catalog),
        }
    }
}
