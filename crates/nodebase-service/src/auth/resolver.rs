//! Session resolution from request headers.
//!
//! Resolution never fails the caller: internal storage faults are logged
//! and surfaced as "no session", indistinguishable from true absence.

use axum::http::{header, HeaderMap};
use chrono::Utc;
use nodebase_core::Session;
use sha2::{Digest, Sha256};

use crate::storage::{session_from_parts, SessionStorage, Storage, UserStorage};

/// Cookie carrying the session token for browser requests
pub const SESSION_COOKIE: &str = "nodebase_session";

/// Sha-256 hex digest of a bearer token; only digests touch storage.
pub fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Extract the bearer token from `Authorization` or, failing that, the
/// session cookie.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    cookie_token(headers)
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == SESSION_COOKIE && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Resolve the authenticated session for a request, if any.
pub async fn resolve_session(storage: &dyn Storage, headers: &HeaderMap) -> Option<Session> {
    let token = bearer_token(headers)?;
    let digest = token_digest(&token);

    let record = match storage.get_session(&digest).await {
        Ok(record) => record?,
        Err(error) => {
            tracing::warn!(%error, "session lookup failed; treating as no session");
            return None;
        }
    };

    if record.is_expired(Utc::now()) {
        return None;
    }

    let user = match storage.get_user(&record.user_id).await {
        Ok(user) => user?,
        Err(error) => {
            tracing::warn!(%error, user_id = %record.user_id, "user lookup failed; treating as no session");
            return None;
        }
    };

    Some(session_from_parts(&user, &record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryStorage, SessionStorage, UserStorage};
    use axum::http::HeaderValue;
    use chrono::Duration;
    use nodebase_core::{SessionRecord, User};

    fn headers_with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    async fn seeded_storage(token: &str, ttl_hours: i64) -> (InMemoryStorage, User) {
        let storage = InMemoryStorage::new();
        let mut user = User::new("alice@example.com", "hash");
        user.entitled = true;
        storage.insert_user(user.clone()).await.unwrap();

        let now = Utc::now();
        storage
            .insert_session(SessionRecord {
                token_digest: token_digest(token),
                user_id: user.id,
                created_at: now,
                expires_at: now + Duration::hours(ttl_hours),
            })
            .await
            .unwrap();

        (storage, user)
    }

    #[tokio::test]
    async fn resolves_a_valid_bearer_token() {
        let (storage, user) = seeded_storage("tok-1", 1).await;
        let session = resolve_session(&storage, &headers_with_bearer("tok-1"))
            .await
            .unwrap();
        assert_eq!(session.user_id, user.id);
        assert!(session.entitled);
    }

    #[tokio::test]
    async fn resolves_the_session_cookie() {
        let (storage, _) = seeded_storage("tok-2", 1).await;
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}=tok-2", SESSION_COOKIE)).unwrap(),
        );
        assert!(resolve_session(&storage, &headers).await.is_some());
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_none() {
        let (storage, _) = seeded_storage("tok-3", 1).await;
        assert!(resolve_session(&storage, &headers_with_bearer("other"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn expired_session_resolves_to_none() {
        let (storage, _) = seeded_storage("tok-4", -1).await;
        assert!(resolve_session(&storage, &headers_with_bearer("tok-4"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn missing_headers_resolve_to_none() {
        let (storage, _) = seeded_storage("tok-5", 1).await;
        assert!(resolve_session(&storage, &HeaderMap::new()).await.is_none());
    }
}
