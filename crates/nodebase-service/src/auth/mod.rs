//! Request authentication: password handling, session resolution, and
//! page-level gates.

mod gate;
mod password;
mod resolver;

pub use gate::{require_no_session, require_session, HOME_ROUTE, LOGIN_ROUTE};
pub use password::{hash_password, verify_password, MIN_PASSWORD_LEN};
pub use resolver::{bearer_token, resolve_session, token_digest, SESSION_COOKIE};
