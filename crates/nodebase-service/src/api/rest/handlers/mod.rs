//! API handlers

mod ai;
mod auth;
mod health;
mod pages;
mod workflows;

pub use ai::*;
pub use auth::*;
pub use health::*;
pub use pages::*;
pub use workflows::*;
