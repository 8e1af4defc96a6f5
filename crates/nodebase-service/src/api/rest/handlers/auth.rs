//! Account and session handlers.
//!
//! Email + password with auto-sign-in on signup; sessions are opaque
//! bearer tokens delivered both in the JSON body (for API clients) and as
//! an http-only cookie (for the browser pages).

use crate::api::rest::state::AppState;
use crate::auth::{
    bearer_token, hash_password, token_digest, verify_password, MIN_PASSWORD_LEN, SESSION_COOKIE,
};
use crate::error::{ApiError, ApiResult};
use crate::storage::{SessionStorage, UserStorage};
use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::AppendHeaders,
    Json,
};
use chrono::Utc;
use nodebase_core::{Capability, Session, SessionRecord, User, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Signup/login request
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Caller-visible session
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user_id: UserId,
    pub email: String,
    pub entitled: bool,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl From<Session> for SessionInfo {
    fn from(session: Session) -> Self {
        Self {
            user_id: session.user_id,
            email: session.email,
            entitled: session.entitled,
            expires_at: session.expires_at,
        }
    }
}

/// Signup/login response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub session: SessionInfo,
}

type WithSessionCookie = (AppendHeaders<[(axum::http::HeaderName, String); 1]>, Json<AuthResponse>);

/// Register a new account and sign it in.
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> ApiResult<WithSessionCookie> {
    let email = request.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::BadRequest("invalid email address".into()));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    if state.storage.get_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "email {} is already registered",
            email
        )));
    }

    let user = User::new(email, hash_password(&request.password)?);
    state.storage.insert_user(user.clone()).await?;

    tracing::info!(user_id = %user.id, "user registered");

    let (token, session) = issue_session(&state, &user).await?;
    let cookie = session_cookie(&token, state.session_ttl.num_seconds());

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(AuthResponse {
            token,
            session: session.into(),
        }),
    ))
}

/// Sign in with email and password.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> ApiResult<WithSessionCookie> {
    let email = request.email.trim().to_lowercase();

    // One rejection path for both unknown email and wrong password.
    let user = state
        .storage
        .get_user_by_email(&email)
        .await?
        .filter(|user| verify_password(&request.password, &user.password_hash))
        .ok_or_else(|| ApiError::Unauthorized("invalid email or password".into()))?;

    tracing::info!(user_id = %user.id, "login successful");

    let (token, session) = issue_session(&state, &user).await?;
    let cookie = session_cookie(&token, state.session_ttl.num_seconds());

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(AuthResponse {
            token,
            session: session.into(),
        }),
    ))
}

/// Logout response
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub revoked: bool,
}

/// Revoke the current session.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<(
    AppendHeaders<[(axum::http::HeaderName, String); 1]>,
    Json<LogoutResponse>,
)> {
    state.authorize(&headers, Capability::Authenticated).await?;

    // The chain passed, so a token is present.
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("authentication required".into()))?;
    let revoked = state.storage.delete_session(&token_digest(&token)).await?;

    if revoked {
        tracing::info!("session revoked");
    }

    Ok((
        AppendHeaders([(SET_COOKIE, clear_session_cookie())]),
        Json(LogoutResponse { revoked }),
    ))
}

/// Return the caller's session, or null when anonymous.
pub async fn current_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<Option<SessionInfo>> {
    let session = crate::auth::resolve_session(state.storage.as_ref(), &headers).await;
    Json(session.map(SessionInfo::from))
}

async fn issue_session(state: &AppState, user: &User) -> ApiResult<(String, Session)> {
    let token = Uuid::new_v4().simple().to_string();
    let now = Utc::now();
    let expires_at = now + state.session_ttl;

    // best-effort sweep of stale rows; failure must not block sign-in
    if let Ok(purged) = state.storage.purge_expired_sessions(now).await {
        if purged > 0 {
            tracing::debug!(purged, "dropped expired sessions");
        }
    }

    state
        .storage
        .insert_session(SessionRecord {
            token_digest: token_digest(&token),
            user_id: user.id,
            created_at: now,
            expires_at,
        })
        .await?;

    Ok((
        token,
        Session {
            user_id: user.id,
            email: user.email.clone(),
            entitled: user.entitled,
            expires_at,
        },
    ))
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}
