//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireStaff`] -- Requires the `staff` or `admin` role.

pub mod auth;
pub mod rbac;
