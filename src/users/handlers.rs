use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        guard::{authorize_admin, authorize_user, ensure_owner_or_admin, CurrentUser},
        session::{self, SessionData},
    },
    error::{ApiError, ApiResult, ServiceError, StoreError},
    state::AppState,
    users::{
        dto::{
            required, AuthResponse, BiographyRequest, ForenameRequest, LastnameRequest,
            LoginRequest, PublicUser, RegisterRequest,
        },
        extractors::{JsonBody, UserIdPath},
        repo_types::User,
        services::{AuthenticatedUser, LoginOutcome},
    },
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn member_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/disconnect", get(disconnect))
        .route("/profile/:id", get(get_profile))
        .route("/search/:search", get(search))
        .route("/:id", delete(delete_user))
        .route("/forename/:id", put(update_forename))
        .route("/lastname/:id", put(update_lastname))
        .route("/biography/:id", put(update_biography))
        .route_layer(from_fn_with_state(state, authorize_user))
}

pub fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/all", get(get_all_users))
        .route("/activate/:id", put(activate_user))
        .route("/setadmin/:id", put(set_admin))
        .route("/setnotadmin/:id", put(set_not_admin))
        .route_layer(from_fn_with_state(state, authorize_admin))
}

fn public_list(users: Vec<User>) -> Vec<PublicUser> {
    users.into_iter().map(PublicUser::from).collect()
}

async fn open_session(session: &Session, auth: &AuthenticatedUser) -> ApiResult<()> {
    let data = SessionData {
        user_id: auth.user.id,
        token: auth.token.clone(),
    };
    session::store(session, &data).await?;
    Ok(())
}

// --- reads ---

#[instrument(skip(state, actor))]
pub async fn get_all_users(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<PublicUser>>> {
    let users = state.users.get_all_users().await?;
    info!(admin_id = %actor.id, count = users.len(), "listed all users");
    Ok(Json(public_list(users)))
}

#[instrument(skip(session))]
pub async fn disconnect(session: Session) -> ApiResult<StatusCode> {
    session::clear(&session).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    UserIdPath(id): UserIdPath,
) -> ApiResult<Json<PublicUser>> {
    let user = state
        .users
        .get_profile_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Path(fragment): Path<String>,
) -> ApiResult<Json<Vec<PublicUser>>> {
    let users = state.users.get_all_users_similar_to(&fragment).await?;
    Ok(Json(public_list(users)))
}

// --- delete ---

#[instrument(skip(state, session, actor))]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    session: Session,
    UserIdPath(id): UserIdPath,
) -> ApiResult<Json<PublicUser>> {
    ensure_owner_or_admin(&actor, id)?;

    let deleted = state.users.delete_user(id).await?.ok_or(ApiError::NotFound)?;
    if deleted.id == actor.id {
        session::clear(&session).await?;
    }

    info!(user_id = %deleted.id, actor = %actor.id, "user deleted");
    Ok(Json(deleted.into()))
}

// --- register / login ---

#[instrument(skip(state, session, payload))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let registration = payload.validate()?;

    let auth = match state.users.register(registration).await {
        Ok(a) => a,
        Err(ServiceError::Store(StoreError::Conflict(field))) => {
            warn!(field = %field, "registration conflict");
            return Err(ApiError::Conflict(field));
        }
        Err(e) => return Err(e.into()),
    };

    open_session(&session, &auth).await?;
    Ok(Json(auth.into()))
}

#[instrument(skip(state, session, payload))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let credentials = payload.validate()?;
    let username = credentials.username.clone();

    let auth = match state.users.login(credentials).await? {
        LoginOutcome::Authenticated(auth) => auth,
        LoginOutcome::UnknownUser => {
            warn!(username = %username, "login unknown username");
            return Err(ApiError::NotFound);
        }
        LoginOutcome::InvalidCredentials => {
            warn!(username = %username, "login invalid password");
            return Err(ApiError::InvalidCredentials);
        }
    };

    open_session(&session, &auth).await?;
    Ok(Json(auth.into()))
}

// --- profile updates ---

#[instrument(skip(state, actor, payload))]
pub async fn update_forename(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    UserIdPath(id): UserIdPath,
    JsonBody(payload): JsonBody<ForenameRequest>,
) -> ApiResult<Json<PublicUser>> {
    let forename = required("forename", payload.forename)?;
    ensure_owner_or_admin(&actor, id)?;

    let user = state
        .users
        .update_forename(id, &forename)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(user_id = %user.id, "forename updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state, actor, payload))]
pub async fn update_lastname(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    UserIdPath(id): UserIdPath,
    JsonBody(payload): JsonBody<LastnameRequest>,
) -> ApiResult<Json<PublicUser>> {
    let lastname = required("lastname", payload.lastname)?;
    ensure_owner_or_admin(&actor, id)?;

    let user = state
        .users
        .update_lastname(id, &lastname)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(user_id = %user.id, "lastname updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state, actor, payload))]
pub async fn update_biography(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    UserIdPath(id): UserIdPath,
    JsonBody(payload): JsonBody<BiographyRequest>,
) -> ApiResult<Json<PublicUser>> {
    ensure_owner_or_admin(&actor, id)?;

    let biography = payload.normalized();
    let user = state
        .users
        .update_biography(id, biography.as_deref())
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(user_id = %user.id, "biography updated");
    Ok(Json(user.into()))
}

// --- admin flags ---

fn rows_to_status(rows: u64) -> ApiResult<StatusCode> {
    if rows == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(StatusCode::OK)
}

#[instrument(skip(state, actor))]
pub async fn activate_user(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    UserIdPath(id): UserIdPath,
) -> ApiResult<StatusCode> {
    let rows = state.users.activate_user(id).await.map_err(ApiError::upstream)?;
    info!(user_id = %id, admin_id = %actor.id, rows, "activate user");
    rows_to_status(rows)
}

#[instrument(skip(state, actor))]
pub async fn set_admin(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    UserIdPath(id): UserIdPath,
) -> ApiResult<StatusCode> {
    let rows = state.users.set_admin(id).await.map_err(ApiError::upstream)?;
    info!(user_id = %id, admin_id = %actor.id, rows, "set user admin");
    rows_to_status(rows)
}

#[instrument(skip(state, actor))]
pub async fn set_not_admin(
    State(state): State<AppState>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    UserIdPath(id): UserIdPath,
) -> ApiResult<StatusCode> {
    let rows = state.users.set_not_admin(id).await.map_err(ApiError::upstream)?;
    info!(user_id = %id, admin_id = %actor.id, rows, "set user non admin");
    rows_to_status(rows)
}
