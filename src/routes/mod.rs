//! Router Module Index
//!
//! Splits the API into two route sets by access level. Authentication is applied as a
//! route layer on the authenticated set only.
//!
//! Both sets are nested under `API_PREFIX` by `create_router`.

/// Routes accessible to anonymous clients: registration and login.
pub mod public;

/// Routes behind the token check. Role rules are enforced by the services.
pub mod authenticated;

pub const API_PREFIX: &str = "/api/v1";
