pub mod jwks;
pub mod verify;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use jwks::{KeySource, RemoteJwks, StaticJwks};
pub use verify::TokenVerifier;

/// Decoded access token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub exp: i64,
    pub permissions: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Fails with 403 when the token carries no `permissions` claim or
    /// `permission` is not in it. The two cases keep distinct codes.
    pub fn require(&self, permission: &str) -> Result<(), AuthError> {
        let granted = self.permissions.as_ref().ok_or(AuthError::PermissionsMissing)?;

        if granted.iter().any(|p| p == permission) {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied)
        }
    }
}

/// Authorization failures, each with a stable machine code and HTTP status
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization header is expected.")]
    MissingHeader,

    #[error("{0}")]
    InvalidHeader(&'static str),

    #[error("Token expired.")]
    TokenExpired,

    #[error("Incorrect claims. Please, check the audience and issuer.")]
    InvalidClaims,

    #[error("Permissions not included in JWT.")]
    PermissionsMissing,

    #[error("Permission not found.")]
    PermissionDenied,

    #[error("Unable to fetch signing keys.")]
    KeysUnavailable(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingHeader
            | AuthError::InvalidHeader(_)
            | AuthError::TokenExpired
            | AuthError::InvalidClaims => StatusCode::UNAUTHORIZED,
            AuthError::PermissionsMissing | AuthError::PermissionDenied => StatusCode::FORBIDDEN,
            AuthError::KeysUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "authorization_header_missing",
            AuthError::InvalidHeader(_) => "invalid_header",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims | AuthError::PermissionsMissing => "invalid_claims",
            AuthError::PermissionDenied => "unauthorized",
            AuthError::KeysUnavailable(_) => "jwks_unavailable",
        }
    }
}

/// A permission string a route demands from the caller's token.
pub trait Permission: Send + Sync + 'static {
    const NAME: &'static str;
}

macro_rules! permissions {
    ($($(#[$meta:meta])* $name:ident => $value:literal;)+) => {
        $(
            $(#[$meta])*
            pub struct $name;

            impl Permission for $name {
                const NAME: &'static str = $value;
            }
        )+
    };
}

permissions! {
    /// `GET /drinks`
    GetDrinks => "get:drinks";
    /// `GET /drinks-detail`
    GetDrinksDetail => "get:drinks-detail";
    /// `POST /drinks`
    PostDrinks => "post:drinks";
    /// `PATCH /drinks/:id`
    PatchDrinks => "patch:drinks";
    /// `DELETE /drinks/:id`
    DeleteDrinks => "delete:drinks";
}
