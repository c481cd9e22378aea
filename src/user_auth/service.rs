use std::sync::Arc;
use std::time::Duration as StdDuration;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::error::UserError;
use super::models::{
    CreateUserParams, LoginResponse, UpdateUserParams, User, UserResponse,
};
use super::repository::UserRepository;

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (username)
    pub exp: usize,  // Expiration time (as UTC timestamp)
    pub iat: usize,  // Issued at
}

/// Fields a user may change about themselves
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct UserService {
    repo: Arc<dyn UserRepository>,
    jwt_secret: String,
    token_duration: StdDuration,
    argon2: Argon2<'static>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, jwt_secret: String, token_duration: StdDuration) -> Self {
        Self {
            repo,
            jwt_secret,
            token_duration,
            argon2: Argon2::default(),
        }
    }

    /// Replace the password hasher, e.g. with cheaper parameters in tests.
    pub fn with_hasher(mut self, argon2: Argon2<'static>) -> Self {
        self.argon2 = argon2;
        self
    }

    pub fn hash_password(&self, password: &str) -> Result<String, UserError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| UserError::Internal(format!("Hashing failed: {}", e)))
    }

    /// Verify against a PHC string; parameters are read from the hash itself.
    pub fn check_password(&self, password: &str, hashed: &str) -> bool {
        match PasswordHash::new(hashed) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::error!("Invalid hash format: {}", e);
                false
            }
        }
    }

    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        full_name: &str,
        email: &str,
    ) -> Result<User, UserError> {
        let hashed_password = self.hash_password(password)?;
        let user = self
            .repo
            .create_user(CreateUserParams {
                username: username.to_string(),
                hashed_password,
                full_name: full_name.to_string(),
                email: email.to_string(),
            })
            .await?;
        tracing::info!(username = %user.username, "User created");
        Ok(user)
    }

    pub async fn get_user(&self, username: &str) -> Result<User, UserError> {
        self.repo.get_user(username).await
    }

    /// Apply a partial update. A new password also stamps `password_changed_at`.
    pub async fn update_user(&self, username: &str, changes: UserChanges) -> Result<User, UserError> {
        let mut params = UpdateUserParams {
            username: username.to_string(),
            full_name: changes.full_name,
            email: changes.email,
            ..Default::default()
        };
        if let Some(password) = changes.password {
            params.hashed_password = Some(self.hash_password(&password)?);
            params.password_changed_at = Some(Utc::now());
        }
        self.repo.update_user(params).await
    }

    /// Login user and issue JWT
    ///
    /// Unknown usernames and wrong passwords both yield `NotFound`.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, UserError> {
        let user = self.repo.get_user(username).await?;

        if !self.check_password(password, &user.hashed_password) {
            tracing::warn!(username, "Login with wrong password");
            return Err(UserError::NotFound(format!("invalid password for {}", username)));
        }

        let (access_token, access_token_expires_at) = self.issue_token(&user.username)?;
        Ok(LoginResponse {
            access_token,
            access_token_expires_at,
            user: UserResponse::from(user),
        })
    }

    /// Sign an HS256 token for `username`
    pub fn issue_token(&self, username: &str) -> Result<(String, DateTime<Utc>), UserError> {
        let now = Utc::now();
        let lifetime = Duration::from_std(self.token_duration)
            .map_err(|e| UserError::Internal(format!("Invalid token duration: {}", e)))?;
        let expires_at = now
            .checked_add_signed(lifetime)
            .ok_or_else(|| UserError::Internal("Token expiry out of range".to_string()))?;

        let claims = Claims {
            sub: username.to_string(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| UserError::Internal(format!("Failed to generate token: {}", e)))?;

        Ok((token, expires_at))
    }

    /// Verify JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, UserError> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| UserError::InvalidToken)
    }
}
