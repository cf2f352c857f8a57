use crate::config::SecurityConfig;
use crate::db::models::user_models::{AuthToken, AuthenticatedUser, LoginCredentials, User, UserRole};
use crate::db::repositories::users::UsersRepository;
use crate::error::Error;
use crate::security::{password, SecurityService};
use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Authentication service for handling user login and credential
/// verification
pub struct AuthService {
    users_repo: UsersRepository,
    security: SecurityService,
    config: SecurityConfig,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(pool: Arc<PgPool>, config: &SecurityConfig) -> Self {
        Self {
            users_repo: UsersRepository::new(pool),
            security: SecurityService::new(config.clone()),
            config: config.clone(),
        }
    }

    /// Login a user with username/password
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<(User, AuthToken)> {
        let user = self
            .users_repo
            .get_by_username(&credentials.username)
            .await?
            .ok_or_else(|| Error::Authentication("Invalid username or password".to_string()))?;

        if !user.active {
            return Err(Error::Authentication("User account is inactive".to_string()).into());
        }

        let valid = password::verify_password(&credentials.password, &user.password_hash)?;

        if !valid {
            return Err(Error::Authentication("Invalid username or password".to_string()).into());
        }

        self.users_repo.update_last_login(&user.id).await?;

        let token = self.security.generate_token(&user)?;

        info!("User logged in: {}", user.username);

        Ok((user, token))
    }

    /// Register a new user
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<User> {
        if self.users_repo.get_by_username(username).await?.is_some() {
            return Err(Error::AlreadyExists("Username already exists".to_string()).into());
        }

        if self.users_repo.get_by_email(email).await?.is_some() {
            return Err(Error::AlreadyExists("Email already exists".to_string()).into());
        }

        let password_hash = password::hash_password(password, &self.config)?;

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login: None,
            active: true,
        };

        let created_user = self.users_repo.create(&user).await?;

        info!("New user registered: {}", username);

        Ok(created_user)
    }

    /// Verify a bearer credential and resolve the identity behind it.
    /// This is the only capability the read endpoints depend on.
    pub fn verify_credential(&self, token: &str) -> Result<AuthenticatedUser> {
        let data = self.security.validate_token(token)?;
        let user_id = data
            .claims
            .user_id()
            .map_err(|e| Error::Authentication(format!("Invalid user ID in token: {}", e)))?;

        Ok(AuthenticatedUser {
            user_id,
            email: data.claims.email,
            role: data.claims.role,
        })
    }

    /// Reset a user's password to a generated one and return it.
    /// Callers gate this behind the admin role.
    pub async fn reset_password(&self, user_id: &Uuid) -> Result<String> {
        let user = self
            .users_repo
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

        let new_password = password::generate_random_password(12);
        let password_hash = password::hash_password(&new_password, &self.config)?;

        self.users_repo.update_password(&user.id, &password_hash).await?;

        info!("Password reset for user: {}", user.username);

        Ok(new_password)
    }
}
