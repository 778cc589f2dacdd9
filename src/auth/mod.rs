//! Authentication and session lifecycle.
//!
//! Credentials live in the local users table; the authenticated identity is a
//! single persisted entry so the app can resume without a new login. Password
//! comparison is constant-time to mitigate timing attacks.

use subtle::ConstantTimeEq;

use crate::cart::Cart;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{NewUser, User};

/// A live user session owning the cart.
///
/// Created by `login`/`resume`, consumed by `logout`; the cart's lifecycle is
/// exactly the session's.
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub cart: Cart,
}

impl Session {
    fn start(user: User) -> Self {
        Self {
            user,
            cart: Cart::new(),
        }
    }

    /// End the session: clear the persisted identity and drop the cart.
    pub async fn logout(self, repo: &Repository) -> Result<(), AppError> {
        repo.clear_session().await?;
        tracing::info!("User {} logged out", self.user.username);
        Ok(())
    }
}

/// Create a new account.
pub async fn register(repo: &Repository, new_user: &NewUser) -> Result<User, AppError> {
    if new_user.username.trim().is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    if new_user.password.is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }
    repo.create_user(new_user).await
}

/// Check credentials and open a session.
///
/// Returns `None` on an unknown username or wrong password, without revealing
/// which; on success the identity is persisted for `resume`.
pub async fn login(
    repo: &Repository,
    username: &str,
    password: &str,
) -> Result<Option<Session>, AppError> {
    let Some((user, stored_password)) = repo.find_user_credentials(username).await? else {
        tracing::info!("Login rejected for unknown username");
        return Ok(None);
    };

    if !constant_time_compare(password, &stored_password) {
        tracing::info!("Login rejected for user {}", username);
        return Ok(None);
    }

    repo.save_session(&user).await?;
    tracing::info!("User {} logged in as {}", user.username, user.role.as_str());
    Ok(Some(Session::start(user)))
}

/// Rebuild a session from the persisted identity, with a fresh empty cart.
pub async fn resume(repo: &Repository) -> Result<Option<Session>, AppError> {
    Ok(repo.load_session().await?.map(Session::start))
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    a_bytes.ct_eq(b_bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("correct-horse", "correct-horse"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("correct-horse", "correct-horsf"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-password"));
    }

    #[test]
    fn test_constant_time_compare_empty() {
        assert!(constant_time_compare("", ""));
        assert!(!constant_time_compare("", "not-empty"));
    }
}
