//! Server-rendered pages.
//!
//! Every page runs its gate before any markup is emitted; a failed gate
//! returns the redirect and nothing else.

use crate::api::rest::state::AppState;
use crate::auth::{require_no_session, require_session};
use axum::{
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};

const DASHBOARD_HTML: &str = include_str!("../../../../assets/dashboard.html");
const LOGIN_HTML: &str = include_str!("../../../../assets/login.html");
const SIGNUP_HTML: &str = include_str!("../../../../assets/signup.html");

/// Protected dashboard. Anonymous visitors are redirected to login.
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match require_session(state.storage.as_ref(), &headers).await {
        Ok(_) => Html(DASHBOARD_HTML).into_response(),
        Err(redirect) => redirect.into_response(),
    }
}

/// Login form. Signed-in visitors are redirected home.
pub async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match require_no_session(state.storage.as_ref(), &headers).await {
        Ok(()) => Html(LOGIN_HTML).into_response(),
        Err(redirect) => redirect.into_response(),
    }
}

/// Signup form. Signed-in visitors are redirected home.
pub async fn signup_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match require_no_session(state.storage.as_ref(), &headers).await {
        Ok(()) => Html(SIGNUP_HTML).into_response(),
        Err(redirect) => redirect.into_response(),
    }
}
