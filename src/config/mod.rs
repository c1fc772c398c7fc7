use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Which store implementation backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    Postgres,
    Memory,
}

impl Backend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Backend::Postgres),
            "memory" | "mem" => Some(Backend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: Backend,
    /// Full connection URL; takes precedence over the individual parts below
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub name: String,
    pub schema: String,
    /// Seconds allowed for establishing a connection
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Append the underlying error text to 500 responses
    pub expose_error_details: bool,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(lookup)
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Database overrides
        if let Some(v) = lookup("DATABASE_BACKEND") {
            self.database.backend = Backend::parse(&v).unwrap_or(self.database.backend);
        }
        if let Some(v) = lookup("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Some(v) = lookup("DATABASE_HOST") {
            self.database.host = v;
        }
        if let Some(v) = lookup("DATABASE_PORT") {
            self.database.port = v.parse().unwrap_or(self.database.port);
        }
        if let Some(v) = lookup("DATABASE_USER") {
            self.database.user = v;
        }
        if let Some(v) = lookup("DATABASE_PASSWORD") {
            self.database.password = Some(v);
        }
        if let Some(v) = lookup("DATABASE_NAME") {
            self.database.name = v;
        }
        if let Some(v) = lookup("DATABASE_SCHEMA") {
            self.database.schema = v;
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Some(v) = lookup("API_HOST") {
            self.api.host = v;
        }
        if let Some(port) = lookup("API_PORT")
            .or_else(|| lookup("PORT"))
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Some(v) = lookup("API_EXPOSE_ERROR_DETAILS") {
            self.api.expose_error_details = v.parse().unwrap_or(self.api.expose_error_details);
        }
        if let Some(v) = lookup("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Some(v) = lookup("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig::default_local(),
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                expose_error_details: true,
                enable_request_logging: true,
            },
            security: SecurityConfig { enable_cors: true },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                connection_timeout: 10,
                ..DatabaseConfig::default_local()
            },
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                expose_error_details: false,
                enable_request_logging: true,
            },
            security: SecurityConfig { enable_cors: true },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                connection_timeout: 5,
                ..DatabaseConfig::default_local()
            },
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                expose_error_details: false,
                enable_request_logging: false,
            },
            security: SecurityConfig { enable_cors: false },
        }
    }

    /// Copy of the configuration that is safe to print
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.database.password.is_some() {
            copy.database.password = Some("********".to_string());
        }
        if let Some(raw) = &copy.database.url {
            if let Ok(mut parsed) = url::Url::parse(raw) {
                if parsed.password().is_some() {
                    let _ = parsed.set_password(Some("********"));
                }
                copy.database.url = Some(parsed.to_string());
            }
        }
        copy
    }
}

impl DatabaseConfig {
    fn default_local() -> Self {
        Self {
            backend: Backend::Postgres,
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: None,
            name: "geofence".to_string(),
            schema: "public".to_string(),
            connection_timeout: 30,
        }
    }
}
