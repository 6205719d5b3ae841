use serde::Deserialize;
use std::env;

const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017/hack-app";
const DEFAULT_DATABASE: &str = "hack-app";
const DEV_JWT_SECRET: &str = "dev-secret-only-for-local-testing";

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Mongo,
    Memory,
}

impl StorageBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mongo" | "mongodb" => Some(StorageBackend::Mongo),
            "memory" | "mem" => Some(StorageBackend::Memory),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Mongo => "mongodb",
            StorageBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub storage: StorageBackend,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one.
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGODB_URI"))
            .unwrap_or_else(|_| DEFAULT_MONGO_URI.to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| database_from_uri(&mongo_uri));

        let jwt_secret = match settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("JWT_SECRET"))
        {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if env == "prod" => {
                return Err(config::ConfigError::Message(
                    "JWT_SECRET must be set in production".to_string(),
                ))
            }
            _ => {
                tracing::warn!("Using default JWT secret (dev mode only)");
                DEV_JWT_SECRET.to_string()
            }
        };

        let host = settings
            .get_string("server.host")
            .or_else(|_| env::var("HOST"))
            .unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = match settings
            .get_string("server.port")
            .or_else(|_| env::var("PORT"))
        {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| config::ConfigError::Message(format!("Invalid port: {}", raw)))?,
            Err(_) => 8081,
        };

        let cors_origins = settings
            .get_string("server.cors_origins")
            .or_else(|_| env::var("CORS_ORIGINS"))
            .map(|raw| split_origins(&raw))
            .unwrap_or_else(|_| {
                vec![
                    "http://127.0.0.1:5173".to_string(),
                    "http://localhost:5173".to_string(),
                ]
            });

        let storage = match settings
            .get_string("database.storage")
            .or_else(|_| env::var("STORAGE_BACKEND"))
        {
            Ok(raw) => StorageBackend::parse(&raw).ok_or_else(|| {
                config::ConfigError::Message(format!("Unknown storage backend: {}", raw))
            })?,
            Err(_) => StorageBackend::Mongo,
        };

        Ok(Config {
            mongo_uri,
            mongo_database,
            jwt_secret,
            host,
            port,
            cors_origins,
            storage,
        })
    }

    /// In-memory configuration used by tests and local demos.
    pub fn for_memory(jwt_secret: impl Into<String>) -> Self {
        Config {
            mongo_uri: DEFAULT_MONGO_URI.to_string(),
            mongo_database: DEFAULT_DATABASE.to_string(),
            jwt_secret: jwt_secret.into(),
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: Vec::new(),
            storage: StorageBackend::Memory,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database name embedded in the connection string path, if any.
fn database_from_uri(uri: &str) -> String {
    let without_scheme = uri.split("://").nth(1).unwrap_or(uri);
    without_scheme
        .split_once('/')
        .map(|(_, rest)| rest.split('?').next().unwrap_or_default())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_DATABASE)
        .to_string()
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_name_comes_from_uri_path() {
        assert_eq!(
            database_from_uri("mongodb://localhost:27017/graidea?authSource=admin"),
            "graidea"
        );
        assert_eq!(database_from_uri("mongodb://localhost:27017"), DEFAULT_DATABASE);
        assert_eq!(database_from_uri("mongodb://localhost:27017/"), DEFAULT_DATABASE);
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        assert_eq!(
            split_origins("http://a.test, http://b.test,,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn storage_backend_parses_aliases() {
        assert_eq!(StorageBackend::parse("MongoDB"), Some(StorageBackend::Mongo));
        assert_eq!(StorageBackend::parse("memory"), Some(StorageBackend::Memory));
        assert_eq!(StorageBackend::parse("redis"), None);
    }
}
