//! Access gate behaviour over HTTP.

mod common;

use anyhow::Result;
use common::IntegrationTestContext;
use conservation_kernel::auth::issue_token;
use secrecy::SecretString;
use serde_json::{Value, json};

/// Test that protected routes need a token.
#[tokio::test]
async fn test_missing_token() -> Result<()> {
    let ctx = IntegrationTestContext::new().await?;

    let resp = ctx
        .client
        .post(ctx.url("/create"))
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await?;
    assert_eq!(body["message"], "Missing token");

    let history = ctx.get("/main/commits", None).await?;
    assert_eq!(history.status(), 400);
    Ok(())
}

/// Test tokens that fail verification.
#[tokio::test]
async fn test_invalid_token() -> Result<()> {
    let ctx = IntegrationTestContext::new().await?;
    ctx.user("u-1").await?;

    let garbage = ctx.post("/create", "not-a-jwt", &json!({})).await?;
    assert_eq!(garbage.status(), 403);
    let body: Value = garbage.json().await?;
    assert_eq!(body["message"], "Invalid token");

    let foreign = issue_token(&SecretString::from("other-secret".to_string()), "u-1", 60)?;
    let resp = ctx.post("/create", &foreign, &json!({})).await?;
    assert_eq!(resp.status(), 403);
    Ok(())
}

/// Test a valid token naming a user that does not exist.
#[tokio::test]
async fn test_unknown_user() -> Result<()> {
    let ctx = IntegrationTestContext::new().await?;
    let token = common::token("ghost")?;

    let resp = ctx.post("/create", &token, &json!({})).await?;
    assert_eq!(resp.status(), 406);
    let body: Value = resp.json().await?;
    assert_eq!(body["status"], 406);
    assert_eq!(body["message"], "User does not exist within database.");
    Ok(())
}

/// Test the `Authorization: Bearer` fallback.
#[tokio::test]
async fn test_bearer_header() -> Result<()> {
    let ctx = IntegrationTestContext::new().await?;
    let token = ctx.user("u-1").await?;

    let resp = ctx
        .client
        .post(ctx.url("/create"))
        .bearer_auth(&token)
        .json(&json!({"branchNote": "bearer"}))
        .send()
        .await?;
    assert_eq!(resp.status(), 200);
    let created: Value = resp.json().await?;
    assert_eq!(created["branch"]["owner"]["id"], "u-1");
    Ok(())
}

/// Test that read-only lookups are public.
#[tokio::test]
async fn test_public_routes() -> Result<()> {
    let ctx = IntegrationTestContext::new().await?;

    for path in ["/conservations", "/all", "/anything"] {
        let resp = ctx.get(path, None).await?;
        assert_eq!(resp.status(), 200, "{path}");
    }
    Ok(())
}
