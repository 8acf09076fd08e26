use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Some(StoreBackend::Mongo),
            "memory" | "in-memory" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub mongo_uri: String,
    pub mongo_database: String,
    pub jwt_secret: String,
    pub jwt_ttl_seconds: i64,
    pub bcrypt_cost: u32,
    pub ml_service_url: String,
    pub ml_timeout_seconds: u64,
    pub history_page_size: u32,
    pub bind_addr: String,
    pub metrics_auth: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_backend: StoreBackend::Mongo,
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "studyhelper".to_string(),
            jwt_secret: "dev-secret-only-for-local-testing".to_string(),
            jwt_ttl_seconds: 7 * 24 * 3600,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            ml_service_url: "http://127.0.0.1:8000".to_string(),
            ml_timeout_seconds: 30,
            history_page_size: 5,
            bind_addr: "0.0.0.0:8081".to_string(),
            metrics_auth: "admin:changeme".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/<env>.toml first, then APP__SECTION__KEY overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let lookup = |key: &str, var: &str| -> Option<String> {
            settings.get_string(key).ok().or_else(|| env::var(var).ok())
        };

        let store_backend = match lookup("database.backend", "STORE_BACKEND") {
            Some(raw) => StoreBackend::parse(&raw).ok_or_else(|| {
                config::ConfigError::Message(format!("Unknown store backend: {}", raw))
            })?,
            None => defaults.store_backend,
        };

        let jwt_secret = match lookup("auth.jwt_secret", "JWT_SECRET") {
            Some(secret) => secret,
            None if env == "prod" => {
                return Err(config::ConfigError::Message(
                    "JWT_SECRET must be set in production".to_string(),
                ))
            }
            None => {
                eprintln!("WARNING: Using default JWT_SECRET (dev mode only!)");
                defaults.jwt_secret
            }
        };

        Ok(Config {
            store_backend,
            mongo_uri: lookup("database.mongo_uri", "MONGO_URI").unwrap_or(defaults.mongo_uri),
            mongo_database: lookup("database.mongo_database", "MONGO_DATABASE")
                .unwrap_or(defaults.mongo_database),
            jwt_secret,
            jwt_ttl_seconds: parse_or(
                lookup("auth.jwt_ttl_seconds", "JWT_TTL_SECONDS"),
                defaults.jwt_ttl_seconds,
            ),
            bcrypt_cost: parse_or(lookup("auth.bcrypt_cost", "BCRYPT_COST"), defaults.bcrypt_cost),
            ml_service_url: lookup("ml_service.url", "ML_SERVICE_URL")
                .unwrap_or(defaults.ml_service_url),
            ml_timeout_seconds: parse_or(
                lookup("ml_service.timeout_seconds", "ML_TIMEOUT_SECONDS"),
                defaults.ml_timeout_seconds,
            ),
            history_page_size: parse_or(
                lookup("quiz.history_page_size", "HISTORY_PAGE_SIZE"),
                defaults.history_page_size,
            )
            .max(1),
            bind_addr: lookup("server.bind_addr", "BIND_ADDR").unwrap_or(defaults.bind_addr),
            metrics_auth: lookup("metrics.auth", "METRICS_AUTH").unwrap_or(defaults.metrics_auth),
        })
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, fallback: T) -> T {
    raw.and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(fallback)
}
