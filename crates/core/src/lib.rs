//! Domain logic for the medical-review case workflow service.
//!
//! Everything in this crate is pure: no database, no HTTP. The storage
//! adapter (`medreview-db`) and the service layer (`medreview-api`) feed
//! snapshots in and persist the decisions that come out.

pub mod assignment;
pub mod authorization;
pub mod bulk_reassignment;
pub mod case;
pub mod concurrency;
pub mod error;
pub mod findings;
pub mod irr;
pub mod query;
pub mod roles;
pub mod status;
pub mod types;
pub mod workflow;
