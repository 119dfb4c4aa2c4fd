//! Authentication primitives.
//!
//! - [`jwt`] -- JWT access-token generation and validation.
//!
//! Credentials are issued by the identity provider; this service only
//! verifies the bearer tokens it signs.

pub mod jwt;
