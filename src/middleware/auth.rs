use std::marker::PhantomData;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::auth::{AuthError, Claims, Permission, TokenVerifier};
use crate::error::ApiError;

/// Proof that the caller's bearer token is valid and grants `P`.
///
/// Put it first in a handler's argument list so that nothing else, and in
/// particular no store access, happens for rejected requests.
pub struct Authorized<P: Permission> {
    pub claims: Claims,
    _permission: PhantomData<P>,
}

#[async_trait]
impl<S, P> FromRequestParts<S> for Authorized<P>
where
    S: Send + Sync,
    P: Permission,
    Arc<TokenVerifier>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<TokenVerifier>::from_ref(state);

        let result = async {
            let token = extract_bearer_token(&parts.headers)?;
            let claims = verifier.verify(token).await?;
            claims.require(P::NAME)?;
            Ok::<_, AuthError>(claims)
        }
        .await;

        match result {
            Ok(claims) => Ok(Self {
                claims,
                _permission: PhantomData,
            }),
            Err(err) => {
                tracing::debug!(
                    "Rejected {} {} requiring {}: {}",
                    parts.method,
                    parts.uri.path(),
                    P::NAME,
                    err.code()
                );
                Err(err.into())
            }
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers.get(AUTHORIZATION).ok_or(AuthError::MissingHeader)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::InvalidHeader("Authorization malformed."))?;

    let mut parts = auth_str.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), _, _) if !scheme.eq_ignore_ascii_case("bearer") => Err(
            AuthError::InvalidHeader("Authorization header must start with \"Bearer\"."),
        ),
        (None, _, _) | (Some(_), None, _) => Err(AuthError::InvalidHeader("Token not found.")),
        (Some(_), Some(token), None) => Ok(token),
        (Some(_), Some(_), Some(_)) => Err(AuthError::InvalidHeader(
            "Authorization header must be bearer token.",
        )),
    }
}
