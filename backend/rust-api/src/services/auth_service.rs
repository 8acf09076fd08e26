use std::sync::Arc;

use anyhow::Context;
use bcrypt::{hash, verify};
use chrono::Utc;
use validator::Validate;

use crate::config::Config;
use crate::error::AppError;
use crate::middlewares::auth::{JwtClaims, JwtService};
use crate::models::user::{AuthResponse, LoginRequest, RegisterRequest, User};
use crate::store::DocumentStore;

pub struct AuthService {
    store: Arc<dyn DocumentStore>,
    jwt_service: JwtService,
    token_ttl_seconds: i64,
    bcrypt_cost: u32,
}

/// Emails are stored and looked up lower-cased and trimmed.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AuthService {
    pub fn new(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        Self {
            store,
            jwt_service: JwtService::new(&config.jwt_secret),
            token_ttl_seconds: config.jwt_ttl_seconds,
            bcrypt_cost: config.bcrypt_cost,
        }
    }

    pub fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        hash(password, self.bcrypt_cost).context("Failed to hash password")
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> anyhow::Result<bool> {
        verify(password, hash).context("Failed to verify password")
    }

    pub async fn register(&self, mut req: RegisterRequest) -> Result<AuthResponse, AppError> {
        req.email = normalize_email(&req.email);
        req.name = req.name.trim().to_string();
        req.validate()?;

        if self.store.find_user_by_email(&req.email).await?.is_some() {
            return Err(AppError::Conflict("Email already used".to_string()));
        }

        let password_hash = self.hash_password(&req.password)?;
        let user = User::new(req.name, req.email, password_hash);
        self.store.insert_user(&user).await?;

        tracing::info!("Registered user {}", user.id);
        self.issue(&user)
    }

    pub async fn login(&self, mut req: LoginRequest) -> Result<AuthResponse, AppError> {
        req.email = normalize_email(&req.email);
        req.validate()?;

        let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

        let user = self
            .store
            .find_user_by_email(&req.email)
            .await?
            .ok_or_else(invalid)?;

        if !self.verify_password(&req.password, &user.password_hash)? {
            tracing::debug!("Password mismatch for user {}", user.id);
            return Err(invalid());
        }

        tracing::info!("User {} logged in", user.id);
        self.issue(&user)
    }

    fn issue(&self, user: &User) -> Result<AuthResponse, AppError> {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            exp: (now + self.token_ttl_seconds) as usize,
            iat: now as usize,
        };
        let token = self.jwt_service.generate_token(&claims)?;
        Ok(AuthResponse {
            token,
            user_id: user.id.clone(),
        })
    }
}
