//! Per-request authorization context and capability predicates.
//!
//! The identity collaborator resolves a user into an [`AuthorizationContext`]
//! once per request; every operation receives it explicitly and asks it
//! boolean questions. The same value describes a prospective assignee when
//! checking assignment eligibility.

use serde::Serialize;

use crate::error::CoreError;
use crate::roles::{required_product, required_role, ROLE_ADMIN, ROLE_MANAGER};
use crate::status::CaseType;
use crate::types::DbId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationContext {
    pub user_id: DbId,
    pub is_active: bool,
    pub role: String,
    pub products: Vec<String>,
    /// External credential identifier (e.g. a licensing board number).
    pub credential_id: Option<String>,
}

impl AuthorizationContext {
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    pub fn has_product(&self, product: &str) -> bool {
        self.products.iter().any(|p| p == product)
    }

    pub fn has_credential(&self) -> bool {
        self.credential_id
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }

    /// Admins and managers may move work between reviewers.
    pub fn can_manage_assignments(&self) -> bool {
        self.is_active && (self.has_role(ROLE_ADMIN) || self.has_role(ROLE_MANAGER))
    }

    /// Only the current assignee edits a case's content; admins may act for them.
    pub fn can_edit_case(&self, assignee_id: Option<DbId>) -> bool {
        self.is_active && (assignee_id == Some(self.user_id) || self.has_role(ROLE_ADMIN))
    }

    /// Role and product entitlement for working a case type.
    pub fn is_entitled_to(&self, case_type: CaseType) -> bool {
        self.has_role(required_role(case_type)) && self.has_product(required_product(case_type))
    }

    /// Fail with `Forbidden` unless the user may manage assignments.
    pub fn require_assignment_manager(&self) -> Result<(), CoreError> {
        if self.can_manage_assignments() {
            Ok(())
        } else {
            Err(CoreError::Forbidden(
                "Manager or Admin role required to assign cases".into(),
            ))
        }
    }

    /// Fail with `Forbidden` unless the user may edit the case content.
    pub fn require_case_editor(&self, case_id: DbId, assignee_id: Option<DbId>) -> Result<(), CoreError> {
        if self.can_edit_case(assignee_id) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "User {} is not assigned to case {case_id}",
                self.user_id
            )))
        }
    }
}
