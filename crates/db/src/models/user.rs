//! User model and the access view used to build authorization contexts.

use medreview_core::authorization::AuthorizationContext;
use medreview_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub role_id: i16,
    pub is_active: bool,
    pub credential_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a user. Role and products are given by name.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub role: String,
    pub products: Vec<String>,
    pub credential_id: Option<String>,
}

/// A user joined with role name and product entitlements.
#[derive(Debug, Clone, FromRow)]
pub struct UserAccess {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub role_name: String,
    pub credential_id: Option<String>,
    pub products: Vec<String>,
}

impl UserAccess {
    pub fn to_authorization_context(&self) -> AuthorizationContext {
        AuthorizationContext {
            user_id: self.id,
            is_active: self.is_active,
            role: self.role_name.clone(),
            products: self.products.clone(),
            credential_id: self.credential_id.clone(),
        }
    }
}
