use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::SessionData;
use crate::error::{ServiceError, ServiceResult};
use crate::users::dto::{Credentials, Registration};
use crate::users::repo::UserRepository;
use crate::users::repo_types::{NewUser, ProfileField, User, UserFlag};

/// A user together with the token just issued for them.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

#[derive(Debug)]
pub enum LoginOutcome {
    UnknownUser,
    InvalidCredentials,
    Authenticated(AuthenticatedUser),
}

/// Domain operations on users. Access rights are enforced by the caller.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    keys: JwtKeys,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, keys: JwtKeys) -> Self {
        Self { repo, keys }
    }

    pub async fn get_all_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.repo.list_all().await?)
    }

    pub async fn get_profile_by_id(&self, id: Uuid) -> ServiceResult<Option<User>> {
        Ok(self.repo.find_by_id(id).await?)
    }

    pub async fn get_all_users_similar_to(&self, fragment: &str) -> ServiceResult<Vec<User>> {
        Ok(self.repo.search(fragment).await?)
    }

    /// Fails with a store conflict when the email or username is taken.
    pub async fn register(&self, registration: Registration) -> ServiceResult<AuthenticatedUser> {
        let id = Uuid::new_v4();
        let password_hash =
            hash_password(&registration.password).map_err(ServiceError::Credentials)?;
        let token = self.keys.sign(id).map_err(ServiceError::Credentials)?;

        let user = self
            .repo
            .insert(NewUser {
                id,
                forename: registration.forename,
                lastname: registration.lastname,
                email: registration.email,
                username: registration.username,
                password_hash,
                token: token.clone(),
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(AuthenticatedUser { user, token })
    }

    pub async fn login(&self, credentials: Credentials) -> ServiceResult<LoginOutcome> {
        let Some(mut user) = self.repo.find_by_username(&credentials.username).await? else {
            return Ok(LoginOutcome::UnknownUser);
        };

        let ok = verify_password(&credentials.password, &user.password_hash)
            .map_err(ServiceError::Credentials)?;
        if !ok {
            return Ok(LoginOutcome::InvalidCredentials);
        }

        let token = self.keys.sign(user.id).map_err(ServiceError::Credentials)?;
        if self.repo.replace_token(user.id, &token).await? == 0 {
            // deleted between lookup and token write
            return Ok(LoginOutcome::UnknownUser);
        }
        user.token = Some(token.clone());

        info!(user_id = %user.id, "user logged in");
        Ok(LoginOutcome::Authenticated(AuthenticatedUser { user, token }))
    }

    pub async fn update_forename(&self, id: Uuid, forename: &str) -> ServiceResult<Option<User>> {
        Ok(self
            .repo
            .update_profile(id, ProfileField::Forename, Some(forename))
            .await?)
    }

    pub async fn update_lastname(&self, id: Uuid, lastname: &str) -> ServiceResult<Option<User>> {
        Ok(self
            .repo
            .update_profile(id, ProfileField::Lastname, Some(lastname))
            .await?)
    }

    pub async fn update_biography(
        &self,
        id: Uuid,
        biography: Option<&str>,
    ) -> ServiceResult<Option<User>> {
        Ok(self
            .repo
            .update_profile(id, ProfileField::Biography, biography)
            .await?)
    }

    pub async fn activate_user(&self, id: Uuid) -> ServiceResult<u64> {
        Ok(self.repo.set_flag(id, UserFlag::Activated, true).await?)
    }

    pub async fn set_admin(&self, id: Uuid) -> ServiceResult<u64> {
        Ok(self.repo.set_flag(id, UserFlag::Admin, true).await?)
    }

    pub async fn set_not_admin(&self, id: Uuid) -> ServiceResult<u64> {
        Ok(self.repo.set_flag(id, UserFlag::Admin, false).await?)
    }

    pub async fn delete_user(&self, id: Uuid) -> ServiceResult<Option<User>> {
        Ok(self.repo.delete(id).await?)
    }

    /// Resolves the user behind a session, or `None` when the session is stale or forged.
    pub async fn authenticate(&self, session: &SessionData) -> ServiceResult<Option<User>> {
        let claims = match self.keys.verify(&session.token) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "session token rejected");
                return Ok(None);
            }
        };
        if claims.sub != session.user_id {
            return Ok(None);
        }

        let user = self.repo.find_by_id(session.user_id).await?;
        Ok(user.filter(|u| u.token.as_deref() == Some(session.token.as_str())))
    }
}
