//! Repository for `users` and their role / product entitlements.

use medreview_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{CreateUser, User, UserAccess};

/// Column list shared across queries.
const COLUMNS: &str =
    "id, username, email, role_id, is_active, credential_id, created_at, updated_at";

/// User joined with role name and aggregated product names.
const ACCESS_SELECT: &str = "SELECT u.id, u.username, u.email, u.is_active, \
        r.name AS role_name, u.credential_id, \
        COALESCE(ARRAY_AGG(p.name ORDER BY p.name) FILTER (WHERE p.name IS NOT NULL), '{}') AS products \
     FROM users u \
     JOIN roles r ON r.id = u.role_id \
     LEFT JOIN user_products up ON up.user_id = u.id \
     LEFT JOIN products p ON p.id = up.product_id";

pub struct UserRepo;

impl UserRepo {
    /// Insert a user and their product entitlements.
    ///
    /// Unknown role names fail the insert; unknown product names are ignored.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO users (username, email, role_id, credential_id) \
             VALUES ($1, $2, (SELECT id FROM roles WHERE name = $3), $4) \
             RETURNING {COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.role)
            .bind(&input.credential_id)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO user_products (user_id, product_id) \
             SELECT $1, id FROM products WHERE name = ANY($2)",
        )
        .bind(user.id)
        .bind(&input.products)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Load the access view the authorization context is built from.
    pub async fn find_access(pool: &PgPool, id: DbId) -> Result<Option<UserAccess>, sqlx::Error> {
        let query = format!("{ACCESS_SELECT} WHERE u.id = $1 GROUP BY u.id, r.name");
        sqlx::query_as::<_, UserAccess>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Activate or deactivate a user. Returns `true` if a row was updated.
    pub async fn set_active(pool: &PgPool, id: DbId, is_active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(is_active)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
