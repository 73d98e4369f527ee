//! `PostgreSQL` account store.
//!
//! Password hashing is delegated to `pgcrypto` (`crypt` + `gen_salt('bf')`),
//! so credentials only exist in clear text inside the query parameters.
//! bcrypt reads at most 72 bytes of a password; the Validation Gate rejects
//! longer ones so no two accepted passwords collide.
//! Ids are UUIDs; an id that does not parse as one is treated like an unknown
//! account.

use super::{User, UserService};
use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::{postgres::PgPoolOptions, Connection, PgPool, Row};
use std::time::Duration;
use tracing::{info_span, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `dsn`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be reached.
    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }
}

fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id.trim()).ok()
}

fn query_span(operation: &'static str, statement: &'static str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[async_trait]
impl UserService for PgStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        let query = r"
            SELECT id::text AS id, name, email
            FROM users
            ORDER BY created_at
        ";
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("Failed to list users")?;

        Ok(rows
            .into_iter()
            .map(|row| User {
                id: row.get("id"),
                name: row.get("name"),
                email: row.get("email"),
            })
            .collect())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let Some(user_id) = parse_id(id) else {
            return Ok(None);
        };

        let query = "SELECT id::text AS id, name, email FROM users WHERE id = $1";
        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("Failed to fetch user")?;

        Ok(row.map(|row| User {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
        }))
    }

    async fn email_taken(&self, email: &str, except_id: Option<&str>) -> Result<bool> {
        let query = r"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2)
            ) AS taken
        ";
        let row = sqlx::query(query)
            .bind(email)
            .bind(except_id.and_then(parse_id))
            .fetch_one(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("Failed to check email")?;

        Ok(row.get("taken"))
    }

    async fn create_user(&self, name: &str, email: &str, password: &SecretString) -> Result<bool> {
        let query = r"
            INSERT INTO users (id, name, email, password)
            VALUES ($1, $2, $3, crypt($4, gen_salt('bf')))
            ON CONFLICT (email) DO NOTHING
        ";
        let result = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(email)
            .bind(password.expose_secret())
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("Failed to insert user")?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        password: Option<&SecretString>,
    ) -> Result<bool> {
        let Some(user_id) = parse_id(id) else {
            return Ok(false);
        };

        let query = r"
            UPDATE users
            SET
                name = $1,
                email = $2,
                password = COALESCE(crypt($3, gen_salt('bf')), password),
                updated_at = NOW()
            WHERE id = $4
              AND NOT EXISTS (SELECT 1 FROM users WHERE email = $2 AND id <> $4)
        ";
        let result = sqlx::query(query)
            .bind(name)
            .bind(email)
            .bind(password.map(|p| p.expose_secret()))
            .bind(user_id)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("Failed to update user")?;

        Ok(result.rows_affected() > 0)
    }

    async fn verify_credential(&self, id: &str, password: &SecretString) -> Result<bool> {
        let Some(user_id) = parse_id(id) else {
            return Ok(false);
        };

        let query = r"
            SELECT EXISTS(
                SELECT 1 FROM users WHERE id = $1 AND password = crypt($2, password)
            ) AS verified
        ";
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(password.expose_secret())
            .fetch_one(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("Failed to verify credential")?;

        Ok(row.get("verified"))
    }

    async fn patch_password(
        &self,
        id: &str,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<bool> {
        let Some(user_id) = parse_id(id) else {
            return Ok(false);
        };

        let query = r"
            UPDATE users
            SET password = crypt($1, gen_salt('bf')), updated_at = NOW()
            WHERE id = $2 AND password = crypt($3, password)
        ";
        let result = sqlx::query(query)
            .bind(new_password.expose_secret())
            .bind(user_id)
            .bind(old_password.expose_secret())
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("Failed to patch password")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: &str) -> Result<bool> {
        let Some(user_id) = parse_id(id) else {
            return Ok(false);
        };

        let query = "DELETE FROM users WHERE id = $1";
        let result = sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("Failed to acquire database connection")?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("Failed to ping database")
    }
}
