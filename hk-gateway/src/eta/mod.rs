//! Bus arrival pipeline.
//!
//! Request flow: cached area stops → [`fetch`] live arrivals per stop in
//! parallel → optional [`filter::AreaFilter`] → [`aggregate`] into one
//! record per stop/route/direction/service type/destination → [`render`]
//! as sorted CSV.

pub mod aggregate;
pub mod fetch;
pub mod filter;
pub mod render;
pub mod route_map;
mod service;

pub use aggregate::{EtaQuery, EtaRecord, aggregate};
pub use fetch::{StopArrivals, fetch_arrivals};
pub use filter::{AreaFilter, FilterState};
pub use render::{
    NO_SERVICE_PLACEHOLDER, RenderError, prepare_rows, render_eta_csv, render_route_map_csv,
};
pub use route_map::{StopRoutes, build_stop_route_map};
pub use service::EtaService;
