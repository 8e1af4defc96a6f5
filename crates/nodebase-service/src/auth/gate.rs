//! Page gates.
//!
//! Server-rendered pages run a gate before emitting any markup. A failed
//! gate short-circuits the handler with a redirect; nothing of the wrapped
//! page is rendered.

use axum::http::HeaderMap;
use axum::response::Redirect;
use nodebase_core::Session;

use super::resolver::resolve_session;
use crate::storage::Storage;

/// Where unauthenticated visitors of protected pages land
pub const LOGIN_ROUTE: &str = "/login";

/// Where authenticated visitors of anonymous-only pages land
pub const HOME_ROUTE: &str = "/";

/// Gate for protected pages. Resolves the session or redirects to login.
pub async fn require_session(
    storage: &dyn Storage,
    headers: &HeaderMap,
) -> Result<Session, Redirect> {
    resolve_session(storage, headers)
        .await
        .ok_or_else(|| Redirect::to(LOGIN_ROUTE))
}

/// Gate for anonymous-only pages (login, signup). Redirects signed-in
/// visitors home.
pub async fn require_no_session(storage: &dyn Storage, headers: &HeaderMap) -> Result<(), Redirect> {
    match resolve_session(storage, headers).await {
        Some(_) => Err(Redirect::to(HOME_ROUTE)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::resolver::token_digest;
    use crate::storage::{InMemoryStorage, SessionStorage, UserStorage};
    use axum::http::{header, HeaderValue};
    use chrono::{Duration, Utc};
    use nodebase_core::{SessionRecord, User};

    async fn signed_in_storage(token: &str) -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        let user = User::new("alice@example.com", "hash");
        let user_id = user.id;
        storage.insert_user(user).await.unwrap();
        storage
            .insert_session(SessionRecord {
                token_digest: token_digest(token),
                user_id,
                created_at: Utc::now(),
                expires_at: Utc::now() + Duration::hours(1),
            })
            .await
            .unwrap();
        storage
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn protected_gate_passes_signed_in_visitors() {
        let storage = signed_in_storage("tok").await;
        assert!(require_session(&storage, &bearer("tok")).await.is_ok());
    }

    #[tokio::test]
    async fn protected_gate_redirects_anonymous_visitors() {
        let storage = InMemoryStorage::new();
        assert!(require_session(&storage, &HeaderMap::new()).await.is_err());
    }

    #[tokio::test]
    async fn anonymous_gate_redirects_signed_in_visitors() {
        let storage = signed_in_storage("tok").await;
        assert!(require_no_session(&storage, &bearer("tok")).await.is_err());
    }

    #[tokio::test]
    async fn anonymous_gate_passes_anonymous_visitors() {
        let storage = InMemoryStorage::new();
        assert!(require_no_session(&storage, &HeaderMap::new()).await.is_ok());
    }
}
