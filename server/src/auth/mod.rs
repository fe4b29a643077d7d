//! Bearer-token sessions. Signup and login issue tokens; `require_auth`
//! and `AuthUser` resolve them on protected routes.

mod crypto;
mod guard;
mod session;

pub use crypto::{hash_password, verify_password};
pub use guard::{require_auth, AuthUser};
pub use session::create_session;
