//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`auth::CurrentUser`] -- [`auth::AuthUser`] resolved into an authorization context.
//! - [`rbac::RequireAssignmentManager`] -- Requires a manager or admin.

pub mod auth;
pub mod rbac;
