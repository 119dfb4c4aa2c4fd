//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (reads and self-contained writes) or an open
//! `Transaction` (steps of a larger unit of work) as the first argument.

pub mod case_repo;
pub mod finding_repo;
pub mod irr_match_repo;
pub mod record_repo;
pub mod user_repo;
pub mod workflow_repo;

pub use case_repo::CaseRepo;
pub use finding_repo::FindingRepo;
pub use irr_match_repo::IrrMatchRepo;
pub use record_repo::RecordRepo;
pub use user_repo::UserRepo;
pub use workflow_repo::WorkflowRepo;
