use anyhow::Context;
use tracing::warn;

/// Fixed key used when JWT_SECRET is absent. Fine for local testing, never
/// for a production deployment; startup logs a warning when it is in play.
pub const DEV_JWT_SECRET: &str = "cardfolio-insecure-dev-secret";

/// Persistence backend, chosen once at startup. Handlers only ever see the
/// store traits, never this enum.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    Postgres { database_url: String },
    Memory,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: StoreBackend,
    pub jwt: JwtConfig,
    pub frontend_url: String,
    pub openai_api_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = match std::env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            _ => StoreBackend::Postgres {
                database_url: std::env::var("DATABASE_URL")
                    .context("DATABASE_URL is required unless STORE_BACKEND=memory")?,
            },
        };

        let secret = match std::env::var("JWT_SECRET") {
            Ok(s) if !s.trim().is_empty() => s,
            _ => {
                warn!("JWT_SECRET is not set; falling back to an insecure development key");
                DEV_JWT_SECRET.to_string()
            }
        };

        let jwt = JwtConfig {
            secret,
            ttl_hours: std::env::var("JWT_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        };

        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".into());

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        Ok(Self {
            backend,
            jwt,
            frontend_url,
            openai_api_key,
        })
    }
}
