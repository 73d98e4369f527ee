//! End-to-end tests for the accounts API.
//!
//! Each test serves [`accounts::api::app`] on an ephemeral port and talks to it
//! over real HTTP. The in-memory store is always exercised; the `PostgreSQL`
//! store only when `ACCOUNTS_TEST_DSN` points at a disposable database.

use accounts::{
    api,
    store::{MemoryStore, PgStore, SharedStore},
};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use sqlx::{Connection, PgConnection};
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, task::JoinHandle};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

struct TestServer {
    addr: SocketAddr,
    client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    async fn start(store: SharedStore) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = api::app(store);

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app.into_make_service()).await {
                eprintln!("test server stopped: {err}");
            }
        });

        Ok(Self {
            addr,
            client: reqwest::Client::new(),
            handle,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn json_body(response: reqwest::Response) -> Result<(StatusCode, Value)> {
    let status = response.status();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    Ok((status, body))
}

/// Walk one account through its whole lifecycle.
async fn account_lifecycle(server: &TestServer, email: &str) -> Result<()> {
    let client = &server.client;

    let (status, body) = json_body(
        client
            .post(server.url("/users"))
            .json(&json!({
                "name": "Alice",
                "email": email,
                "password": "secret1",
                "confirmPassword": "secret1"
            }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"name": "Alice", "email": email}));

    let (status, users) = json_body(client.get(server.url("/users")).send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    let id = users
        .as_array()
        .and_then(|users| users.iter().find(|u| u["email"] == email))
        .and_then(|u| u["id"].as_str())
        .map(str::to_string)
        .context("created user is not listed")?;

    let (status, body) = json_body(
        client
            .post(server.url("/users"))
            .json(&json!({
                "name": "Alice Again",
                "email": email,
                "password": "secret1",
                "confirmPassword": "secret1"
            }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "EMAIL_ALREADY_TAKEN");

    let (status, body) = json_body(
        client
            .put(server.url(&format!("/users/{id}")))
            .json(&json!({"name": "Alice Liddell", "email": email}))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": id}));

    let (status, body) = json_body(
        client
            .patch(server.url(&format!("/users/{id}")))
            .json(&json!({
                "oldPassword": "wrong-pass",
                "newPassword": "secret2",
                "confirmNewPassword": "secret2"
            }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Wrong password!");

    let (status, _) = json_body(
        client
            .patch(server.url(&format!("/users/{id}")))
            .json(&json!({
                "oldPassword": "secret1",
                "newPassword": "secret2",
                "confirmNewPassword": "secret2"
            }))
            .send()
            .await?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, user) =
        json_body(client.get(server.url(&format!("/users/{id}"))).send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["name"], "Alice Liddell");
    assert!(user.get("password").is_none());

    let (status, _) =
        json_body(client.delete(server.url(&format!("/users/{id}"))).send().await?).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        json_body(client.delete(server.url(&format!("/users/{id}"))).send().await?).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "UNPROCESSABLE_ENTITY");

    Ok(())
}

#[tokio::test]
async fn memory_store_lifecycle() -> Result<()> {
    let server = TestServer::start(Arc::new(MemoryStore::new())).await?;
    account_lifecycle(&server, "alice@example.com").await
}

#[tokio::test]
async fn health_and_request_id() -> Result<()> {
    let server = TestServer::start(Arc::new(MemoryStore::new())).await?;

    let response = server.client.get(server.url("/health")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert!(response.headers().contains_key("x-app"));

    let response = server
        .client
        .get(server.url("/health"))
        .header("x-request-id", "req-42")
        .send()
        .await?;
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-42")
    );

    let response = server
        .client
        .request(reqwest::Method::OPTIONS, server.url("/health"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.bytes().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served() -> Result<()> {
    let server = TestServer::start(Arc::new(MemoryStore::new())).await?;

    let (status, doc) =
        json_body(server.client.get(server.url("/api-docs/openapi.json")).send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["info"]["title"], "accounts");
    assert!(doc["paths"]["/users/{id}"]["patch"].is_object());

    Ok(())
}

#[tokio::test]
async fn postgres_store_lifecycle() -> Result<()> {
    let Ok(dsn) = std::env::var("ACCOUNTS_TEST_DSN") else {
        eprintln!("Skipping integration test: ACCOUNTS_TEST_DSN is not set");
        return Ok(());
    };

    let mut connection = PgConnection::connect(&dsn)
        .await
        .context("failed to connect for schema setup")?;
    for statement in SCHEMA_SQL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement)
            .execute(&mut connection)
            .await
            .with_context(|| format!("failed to execute schema statement: {statement}"))?;
    }

    let email = format!("alice-{}@example.com", uuid::Uuid::new_v4());
    let store = PgStore::connect(&dsn, 2).await?;
    let server = TestServer::start(Arc::new(store)).await?;

    account_lifecycle(&server, &email).await
}
