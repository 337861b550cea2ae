#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use coffee_shop::auth::{StaticJwks, TokenVerifier};
use coffee_shop::config::SecurityConfig;
use coffee_shop::database::MemoryDrinkStore;
use coffee_shop::AppState;

pub const KEY_ID: &str = "coffee-shop-test-key";
pub const AUDIENCE: &str = "coffee-shop";
pub const ISSUER: &str = "https://coffee-shop.test/";

const JWKS: &str = include_str!("../fixtures/jwks.json");
const SIGNING_KEY_PEM: &str = include_str!("../fixtures/signing_key.pem");
pub const ROGUE_KEY_PEM: &str = include_str!("../fixtures/rogue_key.pem");

/// Every permission a manager holds
pub const MANAGER: &[&str] = &[
    "get:drinks",
    "get:drinks-detail",
    "post:drinks",
    "patch:drinks",
    "delete:drinks",
];

/// Baristas can read but not change the menu
pub const BARISTA: &[&str] = &["get:drinks", "get:drinks-detail"];

pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryDrinkStore>,
    pub client: reqwest::Client,
}

impl TestServer {
    /// One fresh server and empty store per test, so tests stay independent.
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let store = Arc::new(MemoryDrinkStore::new());
        let keys = StaticJwks::from_json(JWKS).context("fixture jwks")?;
        let verifier = TokenVerifier::new(Arc::new(keys), AUDIENCE, ISSUER);
        let state = AppState::new(store.clone(), Arc::new(verifier));
        let app = coffee_shop::app(state, &SecurityConfig { cors_origins: Vec::new() });

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self {
            base_url,
            store,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Creates a drink as a manager and returns its long form.
    pub async fn create_drink(&self, title: &str, recipe: Value) -> Result<Value> {
        let res = self
            .client
            .post(self.url("/drinks"))
            .bearer_auth(token(MANAGER))
            .json(&json!({ "title": title, "recipe": recipe }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "create failed: {}", res.status());

        let body = res.json::<Value>().await?;
        Ok(body["drinks"][0].clone())
    }
}

pub struct Claims<'a> {
    pub permissions: Option<&'a [&'a str]>,
    pub audience: &'a str,
    pub expires_in: i64,
    pub kid: &'a str,
}

impl<'a> Claims<'a> {
    pub fn granting(permissions: &'a [&'a str]) -> Self {
        Self {
            permissions: Some(permissions),
            audience: AUDIENCE,
            expires_in: 3600,
            kid: KEY_ID,
        }
    }
}

pub fn token(permissions: &[&str]) -> String {
    sign(&Claims::granting(permissions), SIGNING_KEY_PEM)
}

pub fn sign(claims: &Claims<'_>, pem: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let mut payload = json!({
        "sub": "auth0|integration",
        "iss": ISSUER,
        "aud": claims.audience,
        "iat": now,
        "exp": now + claims.expires_in,
    });
    if let Some(permissions) = claims.permissions {
        payload["permissions"] = json!(permissions);
    }

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(claims.kid.to_string());

    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("fixture key");
    encode(&header, &payload, &key).expect("sign token")
}

pub fn sign_default(claims: &Claims<'_>) -> String {
    sign(claims, SIGNING_KEY_PEM)
}

pub fn espresso() -> Value {
    json!([
        {"name": "espresso", "color": "#3b1f0e", "parts": 1}
    ])
}

pub fn latte() -> Value {
    json!([
        {"name": "espresso", "color": "#3b1f0e", "parts": 1},
        {"name": "steamed milk", "color": "white", "parts": 3}
    ])
}
