use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::users::repo_types::{NewUser, ProfileField, User, UserFlag};

const USER_COLUMNS: &str = "id, forename, lastname, email, username, password_hash, biography, \
     is_activated, is_admin, token, created_at";

/// Data access for user rows. Every method is a single store round trip.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// All users, ordered by username.
    async fn list_all(&self) -> StoreResult<Vec<User>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Case-insensitive substring match on forename, lastname or username.
    async fn search(&self, fragment: &str) -> StoreResult<Vec<User>>;

    /// Fails with `StoreError::Conflict` when email or username is taken.
    async fn insert(&self, user: NewUser) -> StoreResult<User>;

    /// Returns the number of rows affected.
    async fn replace_token(&self, id: Uuid, token: &str) -> StoreResult<u64>;

    /// `None` clears the column. Returns the updated row, if any.
    async fn update_profile(
        &self,
        id: Uuid,
        field: ProfileField,
        value: Option<&str>,
    ) -> StoreResult<Option<User>>;

    /// Returns the number of rows affected.
    async fn set_flag(&self, id: Uuid, flag: UserFlag, value: bool) -> StoreResult<u64>;

    /// Returns the deleted row, if any.
    async fn delete(&self, id: Uuid) -> StoreResult<Option<User>>;
}

/// Escapes LIKE metacharacters so the fragment matches literally.
pub(crate) fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn list_all(&self) -> StoreResult<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username"
        ))
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn search(&self, fragment: &str) -> StoreResult<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE forename ILIKE $1 ESCAPE '\'
               OR lastname ILIKE $1 ESCAPE '\'
               OR username ILIKE $1 ESCAPE '\'
            ORDER BY username
            "#
        ))
        .bind(like_pattern(fragment))
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, forename, lastname, email, username, password_hash, token)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.forename)
        .bind(&user.lastname)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.token)
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn replace_token(&self, id: Uuid, token: &str) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE users SET token = $2 WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(result.rows_affected())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        field: ProfileField,
        value: Option<&str>,
    ) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET {} = $2 WHERE id = $1 RETURNING {USER_COLUMNS}",
            field.column()
        ))
        .bind(id)
        .bind(value)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn set_flag(&self, id: Uuid, flag: UserFlag, value: bool) -> StoreResult<u64> {
        let result = sqlx::query(&format!(
            "UPDATE users SET {} = $2 WHERE id = $1",
            flag.column()
        ))
        .bind(id)
        .bind(value)
        .execute(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern("ann"), "%ann%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
