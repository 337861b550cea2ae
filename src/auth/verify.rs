use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use tracing::{debug, info};

use super::{AuthError, Claims, KeySource, RemoteJwks, StaticJwks};
use crate::config::{AuthConfig, ConfigError};

/// Checks RS256 access tokens against the issuer's published keys.
pub struct TokenVerifier {
    keys: Arc<dyn KeySource>,
    audience: String,
    issuer: String,
}

impl TokenVerifier {
    pub fn new(keys: Arc<dyn KeySource>, audience: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            keys,
            audience: audience.into(),
            issuer: issuer.into(),
        }
    }

    /// Keys come from `JWKS_FILE` when set, otherwise from the issuer.
    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        let issuer = config.issuer()?;
        let audience = config.audience()?;

        let keys: Arc<dyn KeySource> = match &config.jwks_file {
            Some(path) => {
                let keys = StaticJwks::from_file(path).map_err(|e| ConfigError::Invalid {
                    name: "JWKS_FILE",
                    value: e.to_string(),
                })?;
                info!("Using signing keys from {}", path.display());
                Arc::new(keys)
            }
            None => {
                let url = config.jwks_url()?;
                info!("Using signing keys from {}", url);
                Arc::new(RemoteJwks::new(url, Duration::from_secs(config.jwks_cache_ttl_secs)))
            }
        };

        Ok(Self::new(keys, audience, issuer.as_str()))
    }

    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token)
            .map_err(|_| AuthError::InvalidHeader("Unable to parse authentication token."))?;
        let kid = header
            .kid
            .ok_or(AuthError::InvalidHeader("Authorization malformed."))?;

        let key = match find_key(&*self.keys.keys().await?, &kid)? {
            Some(key) => key,
            None => {
                debug!("Signing key {} not in cached set, refreshing", kid);
                find_key(&*self.keys.refresh().await?, &kid)?
                    .ok_or(AuthError::InvalidHeader("Unable to find the appropriate key."))?
            }
        };

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);

        let data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidAudience | ErrorKind::InvalidIssuer => AuthError::InvalidClaims,
            other => {
                debug!("Token rejected: {:?}", other);
                AuthError::InvalidHeader("Unable to parse authentication token.")
            }
        })?;

        Ok(data.claims)
    }
}

fn find_key(keys: &JwkSet, kid: &str) -> Result<Option<DecodingKey>, AuthError> {
    let Some(jwk) = keys
        .keys
        .iter()
        .find(|k| k.common.key_id.as_deref() == Some(kid))
    else {
        return Ok(None);
    };

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map(Some)
            .map_err(|_| AuthError::InvalidHeader("Unable to find the appropriate key.")),
        _ => Err(AuthError::InvalidHeader("Unable to find the appropriate key.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, TokenSpec};

    fn verifier() -> TokenVerifier {
        testing::verifier()
    }

    #[tokio::test]
    async fn valid_token_yields_claims() {
        let token = testing::mint(&TokenSpec::with_permissions(&["get:drinks"]));
        let claims = verifier().verify(&token).await.unwrap();
        assert_eq!(claims.permissions, Some(vec!["get:drinks".to_string()]));
        assert_eq!(claims.sub.as_deref(), Some("auth0|barista"));
    }

    #[tokio::test]
    async fn expired_token_is_distinct() {
        let spec = TokenSpec {
            expires_in: -3600,
            ..TokenSpec::with_permissions(&["get:drinks"])
        };
        let err = verifier().verify(&testing::mint(&spec)).await.unwrap_err();
        assert_eq!(err, AuthError::TokenExpired);
    }

    #[tokio::test]
    async fn wrong_audience_or_issuer_is_invalid_claims() {
        let spec = TokenSpec {
            audience: "someone-else".to_string(),
            ..TokenSpec::with_permissions(&[])
        };
        assert_eq!(verifier().verify(&testing::mint(&spec)).await.unwrap_err(), AuthError::InvalidClaims);

        let spec = TokenSpec {
            issuer: "https://evil.example.com/".to_string(),
            ..TokenSpec::with_permissions(&[])
        };
        assert_eq!(verifier().verify(&testing::mint(&spec)).await.unwrap_err(), AuthError::InvalidClaims);
    }

    #[tokio::test]
    async fn unknown_key_id_is_rejected() {
        let spec = TokenSpec {
            kid: Some("rotated-away".to_string()),
            ..TokenSpec::with_permissions(&[])
        };
        let err = verifier().verify(&testing::mint(&spec)).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidHeader("Unable to find the appropriate key."));
    }

    #[tokio::test]
    async fn unknown_key_ids_do_not_hammer_the_issuer() {
        let issuer = testing::JwksServer::spawn().await;
        let keys = RemoteJwks::new(issuer.url.clone(), Duration::from_secs(3600));
        let verifier = TokenVerifier::new(Arc::new(keys), testing::AUDIENCE, testing::ISSUER);

        for n in 0..20 {
            let spec = TokenSpec {
                kid: Some(format!("made-up-{}", n)),
                ..TokenSpec::with_permissions(&["delete:drinks"])
            };
            let err = verifier.verify(&testing::mint(&spec)).await.unwrap_err();
            assert_eq!(err, AuthError::InvalidHeader("Unable to find the appropriate key."));
        }
        assert_eq!(issuer.hits(), 1);

        let token = testing::mint(&TokenSpec::with_permissions(&["get:drinks"]));
        assert!(verifier.verify(&token).await.is_ok());
        assert_eq!(issuer.hits(), 1);
    }

    #[tokio::test]
    async fn missing_key_id_is_malformed() {
        let spec = TokenSpec {
            kid: None,
            ..TokenSpec::with_permissions(&[])
        };
        let err = verifier().verify(&testing::mint(&spec)).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidHeader("Authorization malformed."));
    }

    #[tokio::test]
    async fn forged_signature_is_rejected() {
        let token = testing::mint_with_key(
            &TokenSpec::with_permissions(&["delete:drinks"]),
            testing::ROGUE_KEY_PEM,
        );
        let err = verifier().verify(&token).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn from_config_reads_local_jwks_file() {
        let mut config = crate::config::AppConfig::from_env().auth;
        config.domain = Some("coffee-shop.test".to_string());
        config.audience = Some(testing::AUDIENCE.to_string());
        config.jwks_file = Some(
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/jwks.json"),
        );

        let verifier = TokenVerifier::from_config(&config).unwrap();
        let token = testing::mint(&TokenSpec::with_permissions(&["patch:drinks"]));
        assert!(verifier.verify(&token).await.is_ok());
    }

    #[test]
    fn from_config_requires_audience() {
        let mut config = crate::config::AppConfig::from_env().auth;
        config.domain = Some("coffee-shop.test".to_string());
        config.audience = None;
        assert!(matches!(
            TokenVerifier::from_config(&config),
            Err(ConfigError::Missing("API_AUDIENCE"))
        ));
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        let err = verifier().verify("not-a-jwt").await.unwrap_err();
        assert_eq!(err.code(), "invalid_header");
    }
}
