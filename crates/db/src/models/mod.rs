//! Row models and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching the
//! database row and, where rows are created through the API or intake, a
//! `Deserialize` create DTO.

pub mod case;
pub mod finding;
pub mod irr_match;
pub mod record;
pub mod user;
pub mod workflow_entry;
