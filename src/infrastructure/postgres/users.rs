use async_trait::async_trait;

use super::rows::{self, PROFILE_COLUMNS, USER_COLUMNS};
use super::PostgresStore;
use crate::application::store::{Page, UserStore};
use crate::domain::{TokenDigest, User, UserId, VendorProfile};
use crate::{Error, Result};

#[async_trait]
impl UserStore for PostgresStore {
    async fn insert_user(&self, user: &User, token: &TokenDigest) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO users (id, email, display_name, role, token_digest, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id.into_inner())
        .bind(user.email.as_ref())
        .bind(user.display_name.as_ref())
        .bind(user.role.as_str())
        .bind(token.as_str())
        .bind(user.created_at)
        .execute(self.pool())
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(Error::conflict(
                format!("email {} is already registered", user.email),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_token(&self, token: &TokenDigest) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE token_digest = $1");
        let row = sqlx::query(&sql)
            .bind(token.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(rows::user).transpose()
    }

    async fn upsert_vendor_profile(&self, profile: &VendorProfile) -> Result<()> {
        sqlx::query(
            "INSERT INTO vendor_profiles (vendor_id, farm_name, description, location, updated_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (vendor_id) DO UPDATE SET \
                farm_name = EXCLUDED.farm_name, \
                description = EXCLUDED.description, \
                location = EXCLUDED.location, \
                updated_at = EXCLUDED.updated_at",
        )
        .bind(profile.vendor_id.into_inner())
        .bind(profile.farm_name.as_ref())
        .bind(profile.description.as_ref())
        .bind(profile.location.as_ref())
        .bind(profile.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn find_vendor_profile(&self, vendor_id: UserId) -> Result<Option<VendorProfile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM vendor_profiles WHERE vendor_id = $1");
        let row = sqlx::query(&sql)
            .bind(vendor_id.into_inner())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(rows::vendor_profile).transpose()
    }

    async fn list_vendor_profiles(&self, page: Page) -> Result<Vec<VendorProfile>> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM vendor_profiles ORDER BY vendor_id LIMIT $1 OFFSET $2"
        );
        let found = sqlx::query(&sql)
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(self.pool())
            .await?;
        found.iter().map(rows::vendor_profile).collect()
    }
}
