use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Identity provider tenant domain, e.g. `example.eu.auth0.com`
    pub domain: Option<String>,
    /// API identifier expected in the `aud` claim
    pub audience: Option<String>,
    /// Read signing keys from a local JWKS document instead of the issuer
    pub jwks_file: Option<PathBuf>,
    pub jwks_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Empty means any origin is allowed
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Auth overrides
        if let Ok(v) = env::var("AUTH0_DOMAIN") {
            self.auth.domain = Some(v);
        }
        if let Ok(v) = env::var("API_AUDIENCE") {
            self.auth.audience = Some(v);
        }
        if let Ok(v) = env::var("JWKS_FILE") {
            self.auth.jwks_file = Some(PathBuf::from(v));
        }
        if let Ok(v) = env::var("JWKS_CACHE_TTL_SECS") {
            self.auth.jwks_cache_ttl_secs = v.parse().unwrap_or(self.auth.jwks_cache_ttl_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.security.cors_origins = parse_origins(&v);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            auth: AuthConfig {
                domain: None,
                audience: None,
                jwks_file: None,
                jwks_cache_ttl_secs: 60,
            },
            security: SecurityConfig {
                cors_origins: Vec::new(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
            },
            auth: AuthConfig {
                domain: None,
                audience: None,
                jwks_file: None,
                jwks_cache_ttl_secs: 600,
            },
            security: SecurityConfig {
                cors_origins: Vec::new(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            auth: AuthConfig {
                domain: None,
                audience: None,
                jwks_file: None,
                jwks_cache_ttl_secs: 3600,
            },
            security: SecurityConfig {
                cors_origins: Vec::new(),
            },
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl AuthConfig {
    pub fn domain(&self) -> Result<&str, ConfigError> {
        self.domain
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or(ConfigError::Missing("AUTH0_DOMAIN"))
    }

    pub fn audience(&self) -> Result<&str, ConfigError> {
        self.audience
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .ok_or(ConfigError::Missing("API_AUDIENCE"))
    }

    /// Tokens are issued by `https://<domain>/`, trailing slash included.
    pub fn issuer(&self) -> Result<url::Url, ConfigError> {
        let domain = self.domain()?;
        let raw = format!("https://{}/", domain.trim_end_matches('/'));
        url::Url::parse(&raw).map_err(|_| ConfigError::Invalid {
            name: "AUTH0_DOMAIN",
            value: domain.to_string(),
        })
    }

    pub fn jwks_url(&self) -> Result<url::Url, ConfigError> {
        let issuer = self.issuer()?;
        issuer
            .join(".well-known/jwks.json")
            .map_err(|_| ConfigError::Invalid {
                name: "AUTH0_DOMAIN",
                value: issuer.to_string(),
            })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
