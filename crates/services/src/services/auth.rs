//! Password login backed by server-side session rows.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use db::models::{
    session::Session,
    user::{CreateUser, User, UserRole},
};
use rand::RngCore;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

pub const MIN_PASSWORD_LEN: usize = 6;
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid email address")]
    InvalidEmail,
    #[error("password must be at least {} characters", MIN_PASSWORD_LEN)]
    WeakPassword,
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("session missing or expired")]
    InvalidSession,
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Hash a password using Argon2id. Returns a PHC-format string.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Verify a password against a PHC-format hash string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// 32 random bytes, hex encoded.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A user together with the session that authenticated them.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub session: Session,
}

#[derive(Clone)]
pub struct AuthService {
    pool: SqlitePool,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(pool: SqlitePool, session_ttl: Duration) -> Self {
        Self { pool, session_ttl }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthenticatedUser, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        if User::find_by_email(&self.pool, &email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(password)?;
        let data = CreateUser {
            email,
            name: name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
            role: UserRole::User,
        };
        let user = User::create(&self.pool, &data, &password_hash)
            .await
            .map_err(|e| {
                // lost a race with a concurrent registration
                if db::is_unique_violation(&e) {
                    AuthError::EmailTaken
                } else {
                    AuthError::Database(e)
                }
            })?;

        info!(user_id = %user.id, "Registered new user");
        let session = self.open_session(&user).await?;
        Ok(AuthenticatedUser { user, session })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthenticatedUser, AuthError> {
        let email = normalize_email(email);
        let user = User::find_by_email(&self.pool, &email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "Rejected login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.open_session(&user).await?;
        Ok(AuthenticatedUser { user, session })
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        Session::delete_by_token(&self.pool, token).await?;
        Ok(())
    }

    /// Resolve a cookie token. Expired rows are deleted on sight.
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let session = Session::find_by_token(&self.pool, token)
            .await?
            .ok_or(AuthError::InvalidSession)?;

        if session.is_expired(Utc::now()) {
            Session::delete_by_token(&self.pool, token).await?;
            return Err(AuthError::InvalidSession);
        }

        match User::find_by_id(&self.pool, session.user_id).await? {
            Some(user) => Ok(AuthenticatedUser { user, session }),
            None => {
                Session::delete_by_token(&self.pool, token).await?;
                Err(AuthError::InvalidSession)
            }
        }
    }

    /// Changes the password and ends every other session of the user.
    pub async fn change_password(
        &self,
        auth: &AuthenticatedUser,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if !verify_password(current_password, &auth.user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let hash = hash_password(new_password)?;
        User::update_password(&self.pool, auth.user.id, &hash).await?;
        let ended =
            Session::delete_for_user_except(&self.pool, auth.user.id, &auth.session.token).await?;
        info!(user_id = %auth.user.id, ended_sessions = ended, "Password changed");
        Ok(())
    }

    /// Create the configured admin account, or promote it if it exists as a regular user.
    /// An existing admin keeps its current password.
    pub async fn ensure_admin(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, AuthError> {
        let email = normalize_email(email);
        if let Some(existing) = User::find_by_email(&self.pool, &email).await? {
            if existing.is_admin() {
                return Ok(existing);
            }
            info!(user_id = %existing.id, "Promoting configured admin account");
            return Ok(User::update_role(&self.pool, existing.id, UserRole::Admin).await?);
        }

        let password_hash = hash_password(password)?;
        let data = CreateUser {
            email,
            name: Some(name.to_string()),
            role: UserRole::Admin,
        };
        let admin = User::create(&self.pool, &data, &password_hash).await?;
        info!(user_id = %admin.id, "Created admin account");
        Ok(admin)
    }

    async fn open_session(&self, user: &User) -> Result<Session, AuthError> {
        let token = generate_session_token();
        let expires_at = Utc::now() + self.session_ttl;
        Ok(Session::create(&self.pool, user.id, &token, expires_at).await?)
    }
}
