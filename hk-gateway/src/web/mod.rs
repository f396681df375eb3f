//! HTTP layer.
//!
//! KMB bus data lives under `/kmb`, HKO weather under `/weather`; `/apis`
//! and `/docs` describe what is available.

mod dto;
mod error;
mod routes;
mod state;

pub use dto::*;
pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
