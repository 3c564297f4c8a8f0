/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules,
/// so access control is applied explicitly at the module level (via Axum
/// layers) and protected endpoints cannot be exposed by accident.

/// Routes accessible to all users (anonymous, read-only, plus registration).
/// Handlers must apply the visibility rules at the Repository level or via
/// the visibility predicate.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Requires a validated user session.
pub mod authenticated;
