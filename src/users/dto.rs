use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::users::repo_types::User;
use crate::users::services::AuthenticatedUser;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trimmed value of a required string field, or a validation error naming it.
pub(crate) fn required(field: &'static str, value: Option<String>) -> ApiResult<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => {
            warn!(field, "missing or blank field");
            Err(ApiError::Validation(format!("{field} is required")))
        }
    }
}

/// Request body for registration. Fields are optional so that absence is a 400, not a 422.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub forename: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub forename: String,
    pub lastname: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> ApiResult<Registration> {
        let forename = required("forename", self.forename)?;
        let lastname = required("lastname", self.lastname)?;
        let email = required("email", self.email)?.to_lowercase();
        let username = required("username", self.username)?;
        // blank check only; the password itself is hashed as submitted
        required("password", self.password.clone())?;
        let password = self.password.unwrap_or_default();

        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(ApiError::Validation("email is invalid".into()));
        }

        Ok(Registration {
            forename,
            lastname,
            email,
            username,
            password,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Validated login input.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> ApiResult<Credentials> {
        let username = required("username", self.username)?;
        required("password", self.password.clone())?;
        Ok(Credentials {
            username,
            password: self.password.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ForenameRequest {
    pub forename: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LastnameRequest {
    pub lastname: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BiographyRequest {
    pub biography: Option<String>,
}

impl BiographyRequest {
    /// Blank biographies are stored as absent.
    pub fn normalized(self) -> Option<String> {
        self.biography
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub forename: String,
    pub lastname: String,
    pub email: String,
    pub username: String,
    pub biography: Option<String>,
    pub is_activated: bool,
    pub is_admin: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            forename: u.forename,
            lastname: u.lastname,
            email: u.email,
            username: u.username,
            biography: u.biography,
            is_activated: u.is_activated,
            is_admin: u.is_admin,
            created_at: u.created_at,
        }
    }
}

/// Response returned after register or login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub id: Uuid,
    pub token: String,
    pub user: PublicUser,
}

impl From<AuthenticatedUser> for AuthResponse {
    fn from(auth: AuthenticatedUser) -> Self {
        Self {
            id: auth.user.id,
            token: auth.token,
            user: auth.user.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_registration() -> RegisterRequest {
        RegisterRequest {
            forename: Some("  Grace ".into()),
            lastname: Some("Hopper".into()),
            email: Some("Grace@Example.COM".into()),
            username: Some(" grace".into()),
            password: Some(" spaced pass ".into()),
        }
    }

    #[test]
    fn registration_trims_and_lowercases() {
        let reg = full_registration().validate().unwrap();
        assert_eq!(reg.forename, "Grace");
        assert_eq!(reg.username, "grace");
        assert_eq!(reg.email, "grace@example.com");
        assert_eq!(reg.password, " spaced pass ");
    }

    #[test]
    fn registration_rejects_each_missing_or_blank_field() {
        let blankers: [fn(&mut RegisterRequest); 5] = [
            |r: &mut RegisterRequest| r.forename = None,
            |r: &mut RegisterRequest| r.lastname = Some("   ".into()),
            |r: &mut RegisterRequest| r.email = None,
            |r: &mut RegisterRequest| r.username = Some(String::new()),
            |r: &mut RegisterRequest| r.password = Some("\t".into()),
        ];
        for blank in blankers {
            let mut req = full_registration();
            blank(&mut req);
            assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
        }
    }

    #[test]
    fn registration_rejects_malformed_email() {
        let mut req = full_registration();
        req.email = Some("not-an-email".into());
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn login_requires_both_fields() {
        let req = LoginRequest {
            username: Some("grace".into()),
            password: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn blank_biography_normalizes_to_none() {
        let req = BiographyRequest {
            biography: Some("   ".into()),
        };
        assert_eq!(req.normalized(), None);
    }

    #[test]
    fn public_user_hides_secrets() {
        let user = User {
            id: Uuid::new_v4(),
            forename: "Grace".into(),
            lastname: "Hopper".into(),
            email: "grace@example.com".into(),
            username: "grace".into(),
            password_hash: "$argon2id$secret".into(),
            biography: None,
            is_activated: false,
            is_admin: false,
            token: Some("session-token".into()),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(json.contains("grace@example.com"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("session-token"));
    }
}
