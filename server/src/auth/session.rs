//! Bearer sessions: issued at signup and login, resolved on every
//! protected request.

use crate::db::DbPool;
use crate::models::{NewSession, User};
use crate::schema::{sessions, users};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::crypto::{generate_token, hash_token};
use super::guard::AuthError;

/// Store a new session for `user_id` and return its plaintext token.
pub fn create_session(
    conn: &mut PgConnection,
    user_id: Uuid,
    ttl: Duration,
) -> QueryResult<String> {
    let token = generate_token();
    let token_hash = hash_token(&token);

    diesel::insert_into(sessions::table)
        .values(&NewSession {
            user_id,
            token_hash: &token_hash,
            expires_at: Utc::now() + ttl,
        })
        .execute(conn)?;

    Ok(token)
}

/// Owner of an unexpired session. Deleted accounts never resolve.
pub fn session_user(conn: &mut PgConnection, token: &str) -> QueryResult<Option<User>> {
    sessions::table
        .inner_join(users::table)
        .filter(sessions::token_hash.eq(hash_token(token)))
        .filter(sessions::expires_at.gt(Utc::now()))
        .filter(users::deleted_at.is_null())
        .select(User::as_select())
        .first(conn)
        .optional()
}

pub fn authenticate(pool: &DbPool, token: &str) -> Result<User, AuthError> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!("Failed to get database connection: {}", e);
        AuthError::Unavailable
    })?;

    match session_user(&mut conn, token) {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            tracing::debug!("rejected unknown or expired session token");
            Err(AuthError::InvalidToken)
        }
        Err(e) => {
            tracing::error!("Failed to look up session: {}", e);
            Err(AuthError::Unavailable)
        }
    }
}
