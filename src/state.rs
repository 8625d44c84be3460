use std::sync::Arc;

use crate::auth::jwt::JwtKeys;
use crate::config::AppConfig;
use crate::db;
use crate::users::memory::InMemoryUserRepository;
use crate::users::repo::{PgUserRepository, UserRepository};
use crate::users::services::UserService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: UserService,
}

impl AppState {
    /// Reads configuration from the environment and connects to Postgres.
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let pool = db::connect(&config).await?;
        db::migrate(&pool).await?;
        Ok(Self::from_parts(config, Arc::new(PgUserRepository::new(pool))))
    }

    pub fn from_parts(config: AppConfig, repo: Arc<dyn UserRepository>) -> Self {
        let keys = JwtKeys::from(&config.jwt);
        Self {
            config: Arc::new(config),
            users: UserService::new(repo, keys),
        }
    }

    /// State backed by an empty in-memory store.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::from_parts(config, Arc::new(InMemoryUserRepository::new()))
    }
}
