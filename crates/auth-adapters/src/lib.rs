//! # auth-adapters
//!
//! Argon2-based implementation of `AuthService` for the offline backend.
//! Accounts live in process memory; passwords are stored only as PHC hash
//! strings.

use std::collections::HashMap;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use domains::{AuthService, DomainError, Result};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Account {
    user_id: String,
    password_hash: String,
}

#[derive(Debug, Default)]
pub struct LocalAuthService {
    /// normalised email -> account
    accounts: RwLock<HashMap<String, Account>>,
    current: RwLock<Option<String>>,
}

impl LocalAuthService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }
}

fn normalise_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(DomainError::Validation("Email is required".into()));
    }
    Ok(email)
}

/// Hashing is CPU-bound, so it runs on the blocking pool.
async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DomainError::NetworkFailure(format!("password hashing failed: {e}")))
    })
    .await
    .map_err(|e| DomainError::NetworkFailure(format!("password task failed: {e}")))?
}

async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let Ok(parsed) = PasswordHash::new(&hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
    .await
    .unwrap_or(false)
}

#[async_trait]
impl AuthService for LocalAuthService {
    async fn sign_up(&self, email: &str, password: &str) -> Result<String> {
        let email = normalise_email(email)?;
        if self.accounts.read().await.contains_key(&email) {
            return Err(DomainError::Conflict(
                "An account with this email already exists".into(),
            ));
        }

        let password_hash = hash_password(password).await?;
        let user_id = Uuid::new_v4().simple().to_string();

        // Re-check under the write lock: another sign-up may have won while hashing.
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&email) {
            return Err(DomainError::Conflict(
                "An account with this email already exists".into(),
            ));
        }
        accounts.insert(
            email,
            Account {
                user_id: user_id.clone(),
                password_hash,
            },
        );
        drop(accounts);

        *self.current.write().await = Some(user_id.clone());
        tracing::info!(%user_id, "auth: account created");
        Ok(user_id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<String> {
        let email = normalise_email(email)?;
        let account = self.accounts.read().await.get(&email).cloned();
        let Some(account) = account else {
            return Err(DomainError::Unauthenticated("Invalid email or password".into()));
        };
        if !verify_password(password, &account.password_hash).await {
            tracing::warn!(user_id = %account.user_id, "auth: password rejected");
            return Err(DomainError::Unauthenticated("Invalid email or password".into()));
        }

        *self.current.write().await = Some(account.user_id.clone());
        tracing::info!(user_id = %account.user_id, "auth: signed in");
        Ok(account.user_id)
    }

    async fn sign_out(&self) -> Result<()> {
        if let Some(user_id) = self.current.write().await.take() {
            tracing::info!(%user_id, "auth: signed out");
        }
        Ok(())
    }

    async fn current_user(&self) -> Option<String> {
        self.current.read().await.clone()
    }
}
