use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tower_sessions::Session;
use tracing::{error, warn};
use uuid::Uuid;

use crate::auth::session;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::users::repo_types::User;

/// The user resolved from the session, attached to the request by a guard.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Level of access a route group requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    User,
    Admin,
}

impl Access {
    pub fn admit(self, user: &User) -> ApiResult<()> {
        match self {
            Access::User => Ok(()),
            Access::Admin if user.is_admin => Ok(()),
            Access::Admin => {
                warn!(user_id = %user.id, "admin route refused");
                Err(ApiError::Forbidden)
            }
        }
    }
}

/// Self-service routes: the actor must own the target record or be an admin.
pub fn ensure_owner_or_admin(actor: &User, target: Uuid) -> ApiResult<()> {
    if actor.is_admin || actor.id == target {
        return Ok(());
    }
    warn!(actor = %actor.id, target = %target, "ownership check failed");
    Err(ApiError::Unauthorized)
}

async fn resolve(state: &AppState, session: &Session) -> ApiResult<User> {
    let Some(data) = session::load(session).await? else {
        return Err(ApiError::Unauthorized);
    };
    match state.users.authenticate(&data).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            warn!(user_id = %data.user_id, "stale or invalid session");
            Err(ApiError::Unauthorized)
        }
        Err(e) => {
            error!(error = %e, "session lookup failed");
            Err(e.into())
        }
    }
}

async fn guard(
    access: Access,
    state: AppState,
    session: Session,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let user = resolve(&state, &session).await?;
    access.admit(&user)?;
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Rejects requests without a valid session with 401.
pub async fn authorize_user(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    guard(Access::User, state, session, request, next).await
}

/// As `authorize_user`, and rejects non-admins with 403.
pub async fn authorize_admin(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    guard(Access::Admin, state, session, request, next).await
}
