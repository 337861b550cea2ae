//! Signing fixtures for unit tests. The integration tests under `tests/`
//! carry their own copy in `tests/common`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, routing::get, Router};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;

use crate::auth::{StaticJwks, TokenVerifier};
use crate::database::models::{Drink, NewDrink};
use crate::database::{DatabaseError, DrinkStore};

pub const JWKS: &str = include_str!("../../tests/fixtures/jwks.json");
pub const SIGNING_KEY_PEM: &str = include_str!("../../tests/fixtures/signing_key.pem");
pub const ROGUE_KEY_PEM: &str = include_str!("../../tests/fixtures/rogue_key.pem");

pub const KEY_ID: &str = "coffee-shop-test-key";
pub const AUDIENCE: &str = "coffee-shop";
pub const ISSUER: &str = "https://coffee-shop.test/";

pub struct TokenSpec {
    pub kid: Option<String>,
    pub audience: String,
    pub issuer: String,
    /// Seconds from now; negative for an already expired token
    pub expires_in: i64,
    pub permissions: Option<Vec<String>>,
}

impl TokenSpec {
    pub fn with_permissions(permissions: &[&str]) -> Self {
        Self {
            kid: Some(KEY_ID.to_string()),
            audience: AUDIENCE.to_string(),
            issuer: ISSUER.to_string(),
            expires_in: 3600,
            permissions: Some(permissions.iter().map(|p| p.to_string()).collect()),
        }
    }
}

pub fn mint(spec: &TokenSpec) -> String {
    mint_with_key(spec, SIGNING_KEY_PEM)
}

pub fn mint_with_key(spec: &TokenSpec, pem: &str) -> String {
    let now = Utc::now().timestamp();
    let mut claims = json!({
        "sub": "auth0|barista",
        "aud": spec.audience,
        "iss": spec.issuer,
        "iat": now,
        "exp": now + spec.expires_in,
    });
    if let Some(permissions) = &spec.permissions {
        claims["permissions"] = json!(permissions);
    }

    let mut header = Header::new(Algorithm::RS256);
    header.kid = spec.kid.clone();

    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("fixture key");
    encode(&header, &claims, &key).expect("sign fixture token")
}

pub fn verifier() -> TokenVerifier {
    let keys = StaticJwks::from_json(JWKS).expect("fixture jwks");
    TokenVerifier::new(Arc::new(keys), AUDIENCE, ISSUER)
}

/// Local issuer serving the fixture key set and counting requests.
pub struct JwksServer {
    pub url: url::Url,
    hits: Arc<AtomicUsize>,
}

impl JwksServer {
    pub async fn spawn() -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/.well-known/jwks.json",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    ([("content-type", "application/json")], JWKS)
                }),
            )
            .with_state(hits.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind jwks server");
        let addr = listener.local_addr().expect("jwks server addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let url = url::Url::parse(&format!("http://{}/.well-known/jwks.json", addr)).expect("jwks url");
        Self { url, hits }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Store whose every call fails, as if Postgres went away.
pub struct UnreachableStore;

fn unreachable() -> DatabaseError {
    DatabaseError::Corrupt("connection refused".to_string())
}

#[async_trait]
impl DrinkStore for UnreachableStore {
    async fn list(&self) -> Result<Vec<Drink>, DatabaseError> {
        Err(unreachable())
    }

    async fn find(&self, _id: i32) -> Result<Option<Drink>, DatabaseError> {
        Err(unreachable())
    }

    async fn insert(&self, _drink: NewDrink) -> Result<Drink, DatabaseError> {
        Err(unreachable())
    }

    async fn update(&self, _drink: &Drink) -> Result<Drink, DatabaseError> {
        Err(unreachable())
    }

    async fn delete(&self, _id: i32) -> Result<bool, DatabaseError> {
        Err(unreachable())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Err(unreachable())
    }
}
