//! Domain types for the bus ETA service.
//!
//! These are plain values shared by the refresher, the ETA pipeline and
//! the web layer. Upstream DTOs live in [`crate::kmb`] and are converted
//! into these types at the boundary.

mod error;
mod names;
mod route;
mod stop;

pub use error::DomainError;
pub use names::{display_name, strip_parenthetical};
pub use route::{Direction, DirectionFilter, RouteKey};
pub use stop::{Area, AreaMatcher, Stop};
