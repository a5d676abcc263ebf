//! User service
//!
//! Implements business logic for user accounts:
//! - Registration with a unique email and a hashed password
//! - Login, issuing a fresh auth token per call
//! - Resolving an `x-auth` token back to its user
//! - Logout, which pulls only the token used for the request

use anyhow::Context;
use std::sync::Arc;

use crate::db::repositories::UserRepository;
use crate::db::StoreError;
use crate::models::{AuthToken, Credentials, User, ValidationError, ValidationErrors, ACCESS_AUTH};
use crate::services::password::{dummy_verify, hash_password, verify_password};

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Registration payload failed validation (including a taken email)
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Token missing from every user, wrong access level, or expired
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Logout asked to remove a token the user does not hold
    #[error("Token not found")]
    TokenNotFound,

    /// The store rejected the operation
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing accounts and auth tokens
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    token_ttl_days: i64,
}

impl UserService {
    /// Create a new user service issuing tokens valid for `token_ttl_days`
    pub fn with_token_ttl(user_repo: Arc<dyn UserRepository>, token_ttl_days: i64) -> Self {
        Self {
            user_repo,
            token_ttl_days,
        }
    }

    /// Register a new user and issue their first auth token.
    ///
    /// # Errors
    ///
    /// - `Validation` for a bad email/password or an email already in use
    /// - `Store` / `InternalError` for database and hashing failures
    pub async fn register(&self, input: &Credentials) -> Result<(User, AuthToken), UserServiceError> {
        let new_user = input.validate()?;

        if self.user_repo.find_by_email(&new_user.email).await?.is_some() {
            return Err(duplicate_email(&new_user.email));
        }

        let password_hash = hash_password(&new_user.password).context("Failed to hash password")?;
        let mut user = User::new(new_user.email, password_hash);
        let token = AuthToken::issue(user.id, self.token_ttl_days);
        user.tokens.push(token.clone());

        // The unique index still catches a concurrent registration
        let user = match self.user_repo.create(&user).await {
            Ok(user) => user,
            Err(StoreError::Duplicate("email")) => return Err(duplicate_email(&user.email)),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(user_id = %user.id, "User registered");
        Ok((user, token))
    }

    /// Check credentials and issue a new auth token.
    ///
    /// Every failure is reported as `InvalidCredentials`. An unknown email
    /// still pays for one password verification.
    pub async fn login(&self, input: &Credentials) -> Result<(User, AuthToken), UserServiceError> {
        let (email, password) = input
            .login_pair()
            .ok_or(UserServiceError::InvalidCredentials)?;

        let Some(mut user) = self.user_repo.find_by_email(email).await? else {
            dummy_verify(password);
            tracing::debug!("Login failed: unknown email");
            return Err(UserServiceError::InvalidCredentials);
        };

        let password_valid =
            verify_password(password, &user.password_hash).context("Failed to verify password")?;
        if !password_valid {
            tracing::debug!(user_id = %user.id, "Login failed: wrong password");
            return Err(UserServiceError::InvalidCredentials);
        }

        let pruned = self.user_repo.remove_expired_tokens(user.id).await?;
        if pruned > 0 {
            user.tokens.retain(|t| !t.is_expired());
        }

        let token = AuthToken::issue(user.id, self.token_ttl_days);
        self.user_repo.push_token(&token).await?;
        user.tokens.push(token.clone());

        tracing::info!(user_id = %user.id, "User logged in");
        Ok((user, token))
    }

    /// Resolve an auth token to the user holding it
    pub async fn authenticate(&self, token: &str) -> Result<User, UserServiceError> {
        let user = self
            .user_repo
            .find_by_token(token, ACCESS_AUTH)
            .await?
            .ok_or(UserServiceError::InvalidToken)?;

        if !user.has_valid_token(token) {
            return Err(UserServiceError::InvalidToken);
        }
        Ok(user)
    }

    /// Remove one token from a user's list
    pub async fn logout(&self, user: &User, token: &str) -> Result<(), UserServiceError> {
        if !self.user_repo.remove_token(user.id, token).await? {
            return Err(UserServiceError::TokenNotFound);
        }

        tracing::info!(user_id = %user.id, "User logged out");
        Ok(())
    }
}

fn duplicate_email(email: &str) -> UserServiceError {
    ValidationErrors::from(ValidationError::DuplicateEmail {
        value: email.to_string(),
    })
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        UserService::with_token_ttl(SqlxUserRepository::boxed(pool), 7)
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    // ========================================================================
    // Registration tests
    // ========================================================================

    #[tokio::test]
    async fn test_register_issues_token() {
        let service = setup_test_service().await;

        let (user, token) = service
            .register(&credentials("slacker@example.com", "password123"))
            .await
            .expect("Failed to register");

        assert_eq!(user.email, "slacker@example.com");
        assert!(user.password_hash.starts_with("$argon2id$"));
        assert_eq!(token.access, ACCESS_AUTH);

        let resolved = service.authenticate(&token.token).await.unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let service = setup_test_service().await;
        service
            .register(&credentials("slacker@example.com", "password123"))
            .await
            .unwrap();

        let result = service
            .register(&credentials(" slacker@example.com ", "different456"))
            .await;
        match result {
            Err(UserServiceError::Validation(errors)) => assert!(errors.has_field("email")),
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_invalid_input() {
        let service = setup_test_service().await;

        let result = service.register(&credentials("not-an-email", "123")).await;
        match result {
            Err(UserServiceError::Validation(errors)) => {
                assert!(errors.has_field("email"));
                assert!(errors.has_field("password"));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    // ========================================================================
    // Login tests
    // ========================================================================

    #[tokio::test]
    async fn test_login_success_issues_new_token() {
        let service = setup_test_service().await;
        let (_, first) = service
            .register(&credentials("slacker@example.com", "password123"))
            .await
            .unwrap();

        let (user, second) = service
            .login(&credentials("slacker@example.com", "password123"))
            .await
            .expect("Login should succeed");

        assert_ne!(first.token, second.token);
        assert_eq!(user.tokens.len(), 2);
        assert!(service.authenticate(&first.token).await.is_ok());
        assert!(service.authenticate(&second.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_login_failures() {
        let service = setup_test_service().await;
        service
            .register(&credentials("slacker@example.com", "password123"))
            .await
            .unwrap();

        for input in [
            credentials("slacker@example.com", "wrong_password"),
            credentials("nobody@example.com", "password123"),
            Credentials::default(),
        ] {
            assert!(matches!(
                service.login(&input).await,
                Err(UserServiceError::InvalidCredentials)
            ));
        }
    }

    // ========================================================================
    // Token tests
    // ========================================================================

    #[tokio::test]
    async fn test_authenticate_unknown_token() {
        let service = setup_test_service().await;
        assert!(matches!(
            service.authenticate("missing").await,
            Err(UserServiceError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let service = UserService::with_token_ttl(SqlxUserRepository::boxed(pool), -1);

        let (_, token) = service
            .register(&credentials("slacker@example.com", "password123"))
            .await
            .unwrap();

        assert!(matches!(
            service.authenticate(&token.token).await,
            Err(UserServiceError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_logout_removes_only_current_token() {
        let service = setup_test_service().await;
        let (user, first) = service
            .register(&credentials("slacker@example.com", "password123"))
            .await
            .unwrap();
        let (_, second) = service
            .login(&credentials("slacker@example.com", "password123"))
            .await
            .unwrap();

        service.logout(&user, &first.token).await.expect("Logout should succeed");

        assert!(service.authenticate(&first.token).await.is_err());
        assert!(service.authenticate(&second.token).await.is_ok());
        assert!(matches!(
            service.logout(&user, &first.token).await,
            Err(UserServiceError::TokenNotFound)
        ));
    }
}
