//! Domain error types.
//!
//! These errors represent invalid request parameters. They are distinct
//! from upstream API and storage errors.

/// Domain-level parse errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Area is neither `home` nor `work`
    #[error("invalid area '{0}': use \"home\" or \"work\"")]
    UnknownArea(String),

    /// Direction is not one of the accepted spellings
    #[error("invalid direction '{0}': use \"inbound\", \"outbound\", or \"both\"")]
    UnknownDirection(String),

    /// Route-stop field name is not `route_direction_serviceType`
    #[error("malformed route field: {0}")]
    MalformedRouteField(String),
}
