//! Case workflow engine.
//!
//! Each operation runs the pure decisions from `medreview_core` against
//! rows locked inside one transaction, appends the resulting workflow
//! entries, commits, and only then publishes review events. Handlers stay
//! thin wrappers around these functions.

pub mod assignment;
pub mod bulk;
pub mod consensus;
pub mod findings;
pub mod transition;
