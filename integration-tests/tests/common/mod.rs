//! Shared test utilities for integration tests.
//!
//! Starts a real kernel on an ephemeral port backed by a temporary SQLite
//! file, and provides helpers for users, tokens and requests.

#![allow(dead_code)]

use anyhow::Result;
use conservation_kernel::auth::{ACCESS_TOKEN_HEADER, JwtAccessGate, issue_token};
use conservation_kernel::branch_manager::BranchManager;
use conservation_kernel::host::KernelState;
use conservation_kernel::infrastructure::server;
use conservation_kernel::store::{self, users};
use secrecy::SecretString;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::oneshot;

/// Base path the branch routes are mounted under.
pub const BASE_PATH: &str = "/api/branch";

const SECRET: &str = "integration-secret";

/// Integration test context providing a running server.
pub struct IntegrationTestContext {
    /// Temporary directory holding the database file
    pub temp_dir: TempDir,
    /// Host state shared with the server
    pub state: Arc<KernelState>,
    /// Server root, e.g. `http://127.0.0.1:49152`
    pub base_url: String,
    /// HTTP client
    pub client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
}

impl IntegrationTestContext {
    /// Starts a server with a fresh database.
    pub async fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let url = format!("sqlite://{}", temp_dir.path().join("kernel.db").display());

        let pool = store::connect(&url, 4).await?;
        store::migrate(&pool, "schweinfurthii").await?;

        let manager = BranchManager::new(pool.clone(), "schweinfurthii");
        let gate = JwtAccessGate::new(pool, &secret());
        let state = Arc::new(KernelState::new(manager, Arc::new(gate)));

        let app = server::build_router(state.clone(), BASE_PATH, None);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let shutdown = async {
                let _ = rx.await;
            };
            let _ = server::run_server(listener, app, shutdown).await;
        });

        Ok(Self {
            temp_dir,
            state,
            base_url,
            client: reqwest::Client::new(),
            shutdown: Some(tx),
        })
    }

    /// Absolute URL for a branch route.
    pub fn url(&self, path: &str) -> String {
        format!("{}{BASE_PATH}{path}", self.base_url)
    }

    /// Absolute URL for a root route.
    pub fn root_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Registers a user and returns a token for it.
    pub async fn user(&self, id: &str) -> Result<String> {
        let mut conn = self.state.db().acquire().await?;
        users::upsert(
            &mut conn,
            &users::User {
                id: id.to_string(),
                first_name: "Test".to_string(),
                last_name: id.to_string(),
                email: format!("{id}@example.org"),
            },
        )
        .await?;
        token(id)
    }

    /// `GET` a branch route with an optional token.
    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<reqwest::Response> {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.header(ACCESS_TOKEN_HEADER, token);
        }
        Ok(req.send().await?)
    }

    /// `POST` JSON to a branch route with a token.
    pub async fn post(&self, path: &str, token: &str, body: &Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url(path))
            .header(ACCESS_TOKEN_HEADER, token)
            .json(body)
            .send()
            .await?)
    }

    /// `DELETE` a branch route with a token.
    pub async fn delete(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .delete(self.url(path))
            .header(ACCESS_TOKEN_HEADER, token)
            .send()
            .await?)
    }

    /// Creates a branch and returns the `{branch, commit}` body.
    pub async fn create_branch(&self, token: &str, note: &str) -> Result<Value> {
        let resp = self
            .post(
                "/create",
                token,
                &serde_json::json!({
                    "branchNote": note,
                    "commitNote": "initial",
                    "features": {"type": "FeatureCollection", "features": []},
                }),
            )
            .await?;
        anyhow::ensure!(resp.status() == 200, "create failed: {}", resp.status());
        Ok(resp.json().await?)
    }

    /// Appends a commit and returns its body.
    pub async fn commit(&self, token: &str, branch: &str, note: &str) -> Result<Value> {
        let resp = self
            .post(
                "/commit",
                token,
                &serde_json::json!({
                    "branchSlug": branch,
                    "commitNote": note,
                    "features": {"edit": note},
                }),
            )
            .await?;
        anyhow::ensure!(resp.status() == 200, "commit failed: {}", resp.status());
        Ok(resp.json().await?)
    }

    /// Orders of a line's history, newest first.
    pub async fn orders(&self, token: &str, line: &str) -> Result<Vec<i64>> {
        let history: Vec<Value> = self
            .get(&format!("/{line}/commits"), Some(token))
            .await?
            .json()
            .await?;
        Ok(history
            .iter()
            .filter_map(|c| c["order"].as_i64())
            .collect())
    }
}

impl Drop for IntegrationTestContext {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Signing secret shared by the server and the test tokens.
pub fn secret() -> SecretString {
    SecretString::from(SECRET.to_string())
}

/// Token for `uid` signed with the server secret.
pub fn token(uid: &str) -> Result<String> {
    Ok(issue_token(&secret(), uid, 3600)?)
}
