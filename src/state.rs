use std::sync::Arc;

use anyhow::Context;
use tracing::warn;

use crate::bio::{BioWriter, OpenAiBioWriter, TemplateBioWriter};
use crate::cards::repo::{CardStore, MemCardStore, PgCardStore};
use crate::config::{AppConfig, StoreBackend};
use crate::profiles::repo::{MemProfileStore, PgProfileStore, ProfileStore};
use crate::qr::QrRenderer;
use crate::users::repo::{MemUserStore, PgUserStore, UserStore};

/// Shared handler state: the stores and collaborators, constructed once at
/// startup and injected everywhere. No ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub cards: Arc<dyn CardStore>,
    pub bio: Arc<dyn BioWriter>,
    pub qr: Arc<QrRenderer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (users, profiles, cards): (
            Arc<dyn UserStore>,
            Arc<dyn ProfileStore>,
            Arc<dyn CardStore>,
        ) = match &config.backend {
            StoreBackend::Postgres { database_url } => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(database_url)
                    .await
                    .context("connect to database")?;
                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                (
                    Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>,
                    Arc::new(PgProfileStore::new(db.clone())) as Arc<dyn ProfileStore>,
                    Arc::new(PgCardStore::new(db)) as Arc<dyn CardStore>,
                )
            }
            StoreBackend::Memory => {
                warn!("using in-memory stores; data will not survive a restart");
                (
                    Arc::new(MemUserStore::default()) as Arc<dyn UserStore>,
                    Arc::new(MemProfileStore::default()) as Arc<dyn ProfileStore>,
                    Arc::new(MemCardStore::default()) as Arc<dyn CardStore>,
                )
            }
        };

        let bio: Arc<dyn BioWriter> = match &config.openai_api_key {
            Some(key) => Arc::new(OpenAiBioWriter::new(key.clone())),
            None => {
                warn!("OPENAI_API_KEY is not set; profile bios will use a placeholder template");
                Arc::new(TemplateBioWriter)
            }
        };

        let qr = Arc::new(QrRenderer::new(config.frontend_url.clone()));

        Ok(Self {
            users,
            profiles,
            cards,
            bio,
            qr,
            config,
        })
    }

    /// Fully in-process state backed by the memory stores and the template
    /// bio writer.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        let config = Arc::new(AppConfig {
            backend: StoreBackend::Memory,
            jwt: crate::config::JwtConfig {
                secret: "test-secret".into(),
                ttl_hours: 24,
            },
            frontend_url: "http://localhost:5173".into(),
            openai_api_key: None,
        });
        Self {
            users: Arc::new(MemUserStore::default()),
            profiles: Arc::new(MemProfileStore::default()),
            cards: Arc::new(MemCardStore::default()),
            bio: Arc::new(TemplateBioWriter),
            qr: Arc::new(QrRenderer::new(config.frontend_url.clone())),
            config,
        }
    }
}
