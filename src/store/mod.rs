//! Account store seam.
//!
//! Handlers only see [`UserService`]. Two implementations ship with the crate:
//! [`MemoryStore`] keeps accounts in process memory and backs the tests and
//! DSN-less runs, [`PgStore`] persists them in `PostgreSQL`.
//!
//! Every method returns `Ok(false)` / `Ok(None)` for domain outcomes (unknown
//! id, nothing changed) and `Err` only for infrastructure failures.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::SecretString;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Public view of an account. Credentials never leave the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[async_trait]
pub trait UserService: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn get_user(&self, id: &str) -> Result<Option<User>>;

    /// Whether `email` belongs to an account other than `except_id`.
    async fn email_taken(&self, email: &str, except_id: Option<&str>) -> Result<bool>;

    async fn create_user(&self, name: &str, email: &str, password: &SecretString) -> Result<bool>;

    /// Replace name and email, and the password when one is given.
    async fn update_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password: Option<&SecretString>,
    ) -> Result<bool>;

    /// `true` when `password` matches the stored credential of `id`.
    async fn verify_credential(&self, id: &str, password: &SecretString) -> Result<bool>;

    async fn patch_password(
        &self,
        id: &str,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<bool>;

    async fn delete_user(&self, id: &str) -> Result<bool>;

    /// Liveness probe used by `/health`.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Store handle shared by every handler through an axum `Extension`.
pub type SharedStore = Arc<dyn UserService>;
