use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::auth::dto::PublicUser;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::User;
use crate::config::{MAX_USERNAME_LENGTH, MIN_PASSWORD_LENGTH, MIN_USERNAME_LENGTH};
use crate::error::{is_unique_violation, ApiError};
use crate::state::AppState;

/// Outcome of a successful register or login.
pub struct AuthSuccess {
    pub user: PublicUser,
    pub token: String,
}

fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]+$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

/// Checks registration input, reporting the first violated rule.
pub fn validate_registration(username: &str, password: &str) -> Result<(), ApiError> {
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "Username and password are required".into(),
        ));
    }
    if username.chars().count() < MIN_USERNAME_LENGTH {
        return Err(ApiError::Validation(format!(
            "Username must be at least {MIN_USERNAME_LENGTH} characters long"
        )));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ApiError::Validation(format!(
            "Username must be at most {MAX_USERNAME_LENGTH} characters long"
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    if !is_valid_username(username) {
        return Err(ApiError::Validation(
            "Username can only contain letters, numbers, and underscores".into(),
        ));
    }
    Ok(())
}

pub async fn register(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<AuthSuccess, ApiError> {
    validate_registration(username, password)?;

    if User::find_by_username(&state.db, username).await?.is_some() {
        warn!(%username, "registration rejected: username taken");
        return Err(ApiError::Conflict("Username already exists".into()));
    }

    let hash = hash_password(password).map_err(ApiError::Internal)?;
    let user = match User::create(&state.db, username, &hash).await {
        Ok(user) => user,
        // A concurrent registration can slip past the pre-check; the unique
        // index reports it as the same conflict.
        Err(e) if is_unique_violation(&e) => {
            warn!(%username, "registration rejected: username taken (unique index)");
            return Err(ApiError::Conflict("Username already exists".into()));
        }
        Err(e) => return Err(e.into()),
    };

    let token = state.sessions.create(user.id);
    info!(
        user_id = user.id,
        %username,
        active_sessions = state.sessions.active_count(),
        "user registered"
    );
    Ok(AuthSuccess {
        user: PublicUser {
            id: user.id,
            username: user.username,
        },
        token,
    })
}

pub async fn login(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<AuthSuccess, ApiError> {
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::Validation(
            "Username and password are required".into(),
        ));
    }

    // Unknown username and wrong password must be indistinguishable to the
    // caller.
    let user = match User::find_by_username(&state.db, username).await? {
        Some(user) => user,
        None => {
            warn!(%username, "login failed: unknown username");
            return Err(ApiError::Unauthorized(
                "Invalid username or password".into(),
            ));
        }
    };
    if !verify_password(password, &user.password_hash).map_err(ApiError::Internal)? {
        warn!(user_id = user.id, "login failed: wrong password");
        return Err(ApiError::Unauthorized(
            "Invalid username or password".into(),
        ));
    }

    let token = state.sessions.create(user.id);
    info!(
        user_id = user.id,
        %username,
        active_sessions = state.sessions.active_count(),
        "user logged in"
    );
    Ok(AuthSuccess {
        user: PublicUser {
            id: user.id,
            username: user.username,
        },
        token,
    })
}

/// Revokes the session. Idempotent: unknown tokens are ignored.
pub fn logout(state: &AppState, token: &str) {
    state.sessions.revoke(token);
    debug!(
        active_sessions = state.sessions.active_count(),
        "session revoked"
    );
}

pub async fn current_user(state: &AppState, token: &str) -> Result<PublicUser, ApiError> {
    let user_id = match state.sessions.resolve(token) {
        Some(id) => id,
        None => {
            return Err(ApiError::Unauthorized("Invalid or expired session".into()));
        }
    };

    // The session may outlive the account it points at.
    match User::find_by_id(&state.db, user_id).await? {
        Some(user) => Ok(PublicUser {
            id: user.id,
            username: user.username,
        }),
        None => Err(ApiError::NotFound("User not found".into())),
    }
}

/// Primitive behind the request guard on mutating endpoints.
pub fn verify(state: &AppState, token: &str) -> Option<i32> {
    state.sessions.resolve(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: ApiError) -> String {
        err.to_string()
    }

    #[test]
    fn rejects_empty_username_or_password() {
        for (u, p) in [("", "secret1"), ("alice", ""), ("", "")] {
            let err = validate_registration(u, p).unwrap_err();
            assert_eq!(message(err), "Username and password are required");
        }
    }

    #[test]
    fn rejects_short_username_before_short_password() {
        let err = validate_registration("ab", "x").unwrap_err();
        assert_eq!(message(err), "Username must be at least 3 characters long");
    }

    #[test]
    fn rejects_overlong_username() {
        let long = "a".repeat(81);
        let err = validate_registration(&long, "secret1").unwrap_err();
        assert_eq!(message(err), "Username must be at most 80 characters long");
    }

    #[test]
    fn rejects_short_password() {
        let err = validate_registration("alice", "12345").unwrap_err();
        assert_eq!(message(err), "Password must be at least 6 characters long");
    }

    #[test]
    fn rejects_username_with_invalid_characters() {
        for bad in ["al ice", "alice!", "ali-ce", "çlice"] {
            let err = validate_registration(bad, "secret1").unwrap_err();
            assert_eq!(
                message(err),
                "Username can only contain letters, numbers, and underscores"
            );
        }
    }

    #[test]
    fn accepts_alphanumeric_and_underscore() {
        let longest = "A".repeat(80);
        for good in ["alice", "Alice_99", "a_b", longest.as_str()] {
            assert!(validate_registration(good, "secret1").is_ok());
        }
    }
}
