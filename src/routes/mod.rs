//! Router Module Index
//!
//! Splits the routing table by access level. Authentication is applied as a layer on the
//! whole `authenticated` router in `create_router`, so no protected endpoint can be
//! registered without it.

/// Routes reachable without a token: health check, login and registration.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
pub mod authenticated;
