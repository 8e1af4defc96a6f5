//! Procedure authorization — the ordered capability chain.
//!
//! A procedure declares the [`Capability`] it requires; the chain runs its
//! layers left-to-right over a [`ProcedureContext`] and either passes the
//! context through to the handler or fails the call before the handler
//! body executes. Ordering is load-bearing: an anonymous caller is always
//! rejected by the authentication layer, so entitlement checks (and any
//! side effects they might grow) are unreachable for anonymous callers.

use crate::types::Session;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authorization failures raised by the capability layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No session where one is required.
    #[error("authentication required")]
    Unauthenticated,

    /// Session present but the actor lacks the paid entitlement.
    #[error("active entitlement required")]
    EntitlementRequired,
}

/// Per-call context carried through the capability chain into the handler.
///
/// Owned exclusively by a single procedure invocation; dropped when the
/// call completes.
#[derive(Debug, Clone, Default)]
pub struct ProcedureContext {
    session: Option<Session>,
}

impl ProcedureContext {
    pub fn anonymous() -> Self {
        Self { session: None }
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Session accessor for handlers running behind `Authenticated` or
    /// `Entitled`; those chains guarantee presence.
    pub fn require_session(&self) -> Result<&Session, AuthError> {
        self.session.as_ref().ok_or(AuthError::Unauthenticated)
    }
}

/// A single authorization layer: pure, total over its input context.
pub type Layer = fn(ProcedureContext) -> Result<ProcedureContext, AuthError>;

/// Passes the context through unchanged.
pub fn public(ctx: ProcedureContext) -> Result<ProcedureContext, AuthError> {
    Ok(ctx)
}

/// Rejects contexts without a session.
pub fn authenticated(ctx: ProcedureContext) -> Result<ProcedureContext, AuthError> {
    if ctx.session.is_some() {
        Ok(ctx)
    } else {
        Err(AuthError::Unauthenticated)
    }
}

/// Rejects sessions without the paid entitlement.
///
/// Safe to run standalone: a missing session still fails as
/// `Unauthenticated`, never as an entitlement error.
pub fn entitled(ctx: ProcedureContext) -> Result<ProcedureContext, AuthError> {
    let ctx = authenticated(ctx)?;
    match ctx.session() {
        Some(session) if session.entitled => Ok(ctx),
        Some(_) => Err(AuthError::EntitlementRequired),
        None => Err(AuthError::Unauthenticated),
    }
}

/// Authorization tier a procedure is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Public,
    Authenticated,
    Entitled,
}

impl Capability {
    /// The ordered layers this tier composes, outermost first.
    pub fn layers(&self) -> &'static [Layer] {
        match self {
            Capability::Public => &[public],
            Capability::Authenticated => &[authenticated],
            Capability::Entitled => &[authenticated, entitled],
        }
    }

    /// Run the chain left-to-right; the first failing layer wins.
    pub fn check(&self, ctx: ProcedureContext) -> Result<ProcedureContext, AuthError> {
        self.layers().iter().try_fold(ctx, |ctx, layer| layer(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use chrono::{Duration, Utc};

    fn session(entitled: bool) -> Session {
        Session {
            user_id: UserId::new(),
            email: "user@example.com".into(),
            entitled,
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[test]
    fn public_admits_anonymous() {
        assert!(Capability::Public
            .check(ProcedureContext::anonymous())
            .is_ok());
    }

    #[test]
    fn authenticated_rejects_anonymous() {
        let err = Capability::Authenticated
            .check(ProcedureContext::anonymous())
            .unwrap_err();
        assert_eq!(err, AuthError::Unauthenticated);
    }

    #[test]
    fn entitled_rejects_anonymous_as_unauthenticated() {
        // The authentication layer must win before entitlement is consulted.
        let err = Capability::Entitled
            .check(ProcedureContext::anonymous())
            .unwrap_err();
        assert_eq!(err, AuthError::Unauthenticated);
    }

    #[test]
    fn entitled_rejects_free_tier_session() {
        let err = Capability::Entitled
            .check(ProcedureContext::with_session(session(false)))
            .unwrap_err();
        assert_eq!(err, AuthError::EntitlementRequired);
    }

    #[test]
    fn entitled_admits_paid_session() {
        let ctx = Capability::Entitled
            .check(ProcedureContext::with_session(session(true)))
            .unwrap();
        assert!(ctx.session().unwrap().entitled);
    }

    #[test]
    fn chain_preserves_the_session() {
        let s = session(true);
        let ctx = Capability::Authenticated
            .check(ProcedureContext::with_session(s.clone()))
            .unwrap();
        assert_eq!(ctx.session(), Some(&s));
    }

    #[test]
    fn standalone_entitled_layer_still_requires_a_session() {
        assert_eq!(
            entitled(ProcedureContext::anonymous()).unwrap_err(),
            AuthError::Unauthenticated
        );
    }
}
