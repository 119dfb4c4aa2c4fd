//! Well-known role and product entitlement names.
//!
//! These must match the seed data in `20261001000002_create_users_table.sql`.

use crate::status::CaseType;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_ABSTRACTOR: &str = "abstractor";
pub const ROLE_PHYSICIAN: &str = "physician";
pub const ROLE_PEER_REVIEWER: &str = "peer_reviewer";

pub const PRODUCT_ABSTRACTION: &str = "abstraction";
pub const PRODUCT_PHYSICIAN_REVIEW: &str = "physician_review";
pub const PRODUCT_PEER_REVIEW: &str = "peer_review";

/// Role a reviewer must hold to be assigned a case of this type.
///
/// Consensus cases are worked by abstractors.
pub fn required_role(case_type: CaseType) -> &'static str {
    match case_type {
        CaseType::Abstraction | CaseType::Consensus => ROLE_ABSTRACTOR,
        CaseType::Physician => ROLE_PHYSICIAN,
        CaseType::PeerReview => ROLE_PEER_REVIEWER,
    }
}

/// Product entitlement a reviewer must hold to work a case of this type.
pub fn required_product(case_type: CaseType) -> &'static str {
    match case_type {
        CaseType::Abstraction | CaseType::Consensus => PRODUCT_ABSTRACTION,
        CaseType::Physician => PRODUCT_PHYSICIAN_REVIEW,
        CaseType::PeerReview => PRODUCT_PEER_REVIEW,
    }
}
