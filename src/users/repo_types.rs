use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User row in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub forename: String,
    pub lastname: String,
    pub email: String,
    pub username: String,
    pub password_hash: String, // Argon2 hash
    pub biography: Option<String>,
    pub is_activated: bool,
    pub is_admin: bool,
    pub token: Option<String>, // last issued session token
    pub created_at: OffsetDateTime,
}

/// Fields written by a single INSERT on registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub forename: String,
    pub lastname: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub token: String,
}

/// Profile columns a user may rewrite on their own record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Forename,
    Lastname,
    Biography,
}

impl ProfileField {
    pub fn column(self) -> &'static str {
        match self {
            ProfileField::Forename => "forename",
            ProfileField::Lastname => "lastname",
            ProfileField::Biography => "biography",
        }
    }
}

/// Admin-controlled boolean columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFlag {
    Activated,
    Admin,
}

impl UserFlag {
    pub fn column(self) -> &'static str {
        match self {
            UserFlag::Activated => "is_activated",
            UserFlag::Admin => "is_admin",
        }
    }
}
