use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::users::repo::UserRepository;
use crate::users::repo_types::{NewUser, ProfileField, User, UserFlag};

/// In-memory implementation of `UserRepository` (for tests and database-less runs).
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_username(mut users: Vec<User>) -> Vec<User> {
    users.sort_by(|a, b| a.username.cmp(&b.username));
    users
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn list_all(&self) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(sorted_by_username(users.values().cloned().collect()))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn search(&self, fragment: &str) -> StoreResult<Vec<User>> {
        let needle = fragment.to_lowercase();
        let users = self.users.read().await;
        let matches = users
            .values()
            .filter(|u| {
                [&u.forename, &u.lastname, &u.username]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        Ok(sorted_by_username(matches))
    }

    async fn insert(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("email".into()));
        }
        if users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict("username".into()));
        }

        let row = User {
            id: user.id,
            forename: user.forename,
            lastname: user.lastname,
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            biography: None,
            is_activated: false,
            is_admin: false,
            token: Some(user.token),
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn replace_token(&self, id: Uuid, token: &str) -> StoreResult<u64> {
        let mut users = self.users.write().await;
        Ok(match users.get_mut(&id) {
            Some(u) => {
                u.token = Some(token.to_string());
                1
            }
            None => 0,
        })
    }

    async fn update_profile(
        &self,
        id: Uuid,
        field: ProfileField,
        value: Option<&str>,
    ) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        let value = value.map(str::to_string);
        match field {
            ProfileField::Forename => user.forename = value.unwrap_or_default(),
            ProfileField::Lastname => user.lastname = value.unwrap_or_default(),
            ProfileField::Biography => user.biography = value,
        }
        Ok(Some(user.clone()))
    }

    async fn set_flag(&self, id: Uuid, flag: UserFlag, value: bool) -> StoreResult<u64> {
        let mut users = self.users.write().await;
        Ok(match users.get_mut(&id) {
            Some(u) => {
                match flag {
                    UserFlag::Activated => u.is_activated = value,
                    UserFlag::Admin => u.is_admin = value,
                }
                1
            }
            None => 0,
        })
    }

    async fn delete(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.remove(&id))
    }
}
