use crate::{
    api,
    store::{MemoryStore, PgStore, SharedStore},
};
use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<SecretString>,
    pub db_max_connections: u32,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let store: SharedStore = match &args.dsn {
        Some(dsn) => {
            let dsn = dsn.expose_secret();
            info!("Using PostgreSQL store at {}", redacted_dsn(dsn)?);
            Arc::new(PgStore::connect(dsn, args.db_max_connections).await?)
        }
        None => {
            warn!("No DSN configured, accounts are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    api::new(args.port, store).await
}

/// DSN with the password stripped, for logging.
fn redacted_dsn(dsn: &str) -> Result<String> {
    let mut url = Url::parse(dsn).context("Invalid database connection string")?;
    if url.password().is_some() {
        url.set_password(Some("***"))
            .map_err(|()| anyhow!("Error redacting password"))?;
    }
    Ok(url.to_string())
}
