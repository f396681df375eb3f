//! KMB open-data bus API.
//!
//! Three endpoints are consumed:
//! - `/stop` – the full stop directory
//! - `/stop-eta/{stop}` – live arrival predictions at one stop
//! - `/route-stop/{route}/{direction}/{service_type}` – a route's stops in
//!   travel order
//!
//! All three wrap their payload in a `{"data": [...]}` envelope.

mod cache;
mod client;
mod error;
mod mock;
mod source;
mod types;

pub use cache::{KmbCache, keys};
pub use client::{KmbClient, KmbClientConfig};
pub use error::KmbError;
pub use mock::MockKmbSource;
pub use source::KmbSource;
pub use types::{EtaDto, RouteStopDto, StopDto};
