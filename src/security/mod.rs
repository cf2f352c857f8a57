use crate::config::SecurityConfig;
use crate::db::models::user_models::{AuthToken, User, UserRole};
use crate::error::Error;
use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod auth;
pub mod password;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User name
    pub name: String,
    /// User email
    pub email: String,
    /// User role
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

impl Claims {
    /// Get the user ID from the claims
    pub fn user_id(&self) -> Result<Uuid, uuid::Error> {
        Uuid::parse_str(&self.sub)
    }
}

/// Security service for handling authentication and authorization
pub struct SecurityService {
    config: SecurityConfig,
}

impl SecurityService {
    /// Create a new security service
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    /// Generate a JWT token for a user
    pub fn generate_token(&self, user: &User) -> Result<AuthToken> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.jwt_expiration_minutes as i64);

        let claims = Claims {
            sub: user.id.to_string(),
            name: user.username.clone(),
            email: user.email.clone(),
            role: format!("{:?}", user.role).to_lowercase(),
            exp: expiration.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| Error::Authentication(format!("Failed to generate JWT token: {}", e)))?;

        Ok(AuthToken {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.jwt_expiration_minutes * 60, // Convert to seconds
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| Error::Authentication(format!("Invalid token: {}", e)))?;

        Ok(token_data)
    }

    /// Check if user has specified role
    pub fn has_role(&self, token_data: &TokenData<Claims>, required_role: UserRole) -> bool {
        let user_role = match token_data.claims.role.as_str() {
            "admin" => UserRole::Admin,
            "operator" => UserRole::Operator,
            "viewer" => UserRole::Viewer,
            _ => return false,
        };

        // Role hierarchy: admin > operator > viewer
        match required_role {
            UserRole::Admin => user_role == UserRole::Admin,
            UserRole::Operator => user_role == UserRole::Admin || user_role == UserRole::Operator,
            UserRole::Viewer => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "observer".to_string(),
            email: "observer@example.com".to_string(),
            password_hash: "irrelevant".to_string(),
            role: UserRole::Viewer,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login: None,
            active: true,
        }
    }

    #[test]
    fn token_round_trip() {
        let service = SecurityService::new(SecurityConfig::default());
        let user = test_user();

        let token = service.generate_token(&user).unwrap();
        assert_eq!(token.token_type, "Bearer");

        let data = service.validate_token(&token.access_token).unwrap();
        assert_eq!(data.claims.user_id().unwrap(), user.id);
        assert_eq!(data.claims.email, user.email);
        assert_eq!(data.claims.role, "viewer");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let service = SecurityService::new(SecurityConfig::default());
        let token = service.generate_token(&test_user()).unwrap();

        let mut tampered = token.access_token.clone();
        tampered.push('x');
        assert!(service.validate_token(&tampered).is_err());
    }

    #[test]
    fn role_hierarchy() {
        let service = SecurityService::new(SecurityConfig::default());
        let mut user = test_user();
        user.role = UserRole::Operator;
        let token = service.generate_token(&user).unwrap();
        let data = service.validate_token(&token.access_token).unwrap();

        assert!(!service.has_role(&data, UserRole::Admin));
        assert!(service.has_role(&data, UserRole::Operator));
        assert!(service.has_role(&data, UserRole::Viewer));
    }
}
