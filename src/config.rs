// src/config.rs

use crate::{
    db::{ItemStore, MemoryItemRepository, PgItemRepository},
    services::ItemService,
    storage::{ImageStore, LocalImageStore},
};
use anyhow::{bail, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => bail!("STORAGE_BACKEND inválido: '{other}' (use postgres ou memory)"),
        }
    }
}

// Configuração lida do ambiente (.env incluído)
#[derive(Debug, Clone)]
pub struct Config {
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub cors_origin: String,
    pub max_upload_bytes: usize,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_var<T>(name: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var_or(name, default)
        .parse()
        .with_context(|| format!("{name} contém um valor inválido"))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let storage_backend: StorageBackend = var_or("STORAGE_BACKEND", "postgres").parse()?;
        let database_url = env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL deve ser definida");
        }

        Ok(Self {
            storage_backend,
            database_url,
            db_max_connections: parsed_var("DB_MAX_CONNECTIONS", "5")?,
            host: var_or("HOST", "0.0.0.0"),
            port: parsed_var("PORT", "5000")?,
            upload_dir: PathBuf::from(var_or("UPLOAD_DIR", "uploads")),
            public_base_url: var_or("PUBLIC_BASE_URL", "http://localhost:5000")
                .trim_end_matches('/')
                .to_string(),
            cors_origin: var_or("CORS_ORIGIN", "http://localhost:3000"),
            max_upload_bytes: parsed_var("MAX_UPLOAD_BYTES", "26214400")?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Prefixo público das imagens servidas em /uploads.
    pub fn uploads_url(&self) -> String {
        format!("{}/uploads", self.public_base_url)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: Option<PgPool>,
    pub item_service: ItemService,
}

impl AppState {
    // Monta o gráfico de dependências a partir da configuração.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let images: Arc<dyn ImageStore> =
            Arc::new(LocalImageStore::new(config.upload_dir.clone(), &config.uploads_url()));

        let (db_pool, repo): (Option<PgPool>, Arc<dyn ItemStore>) = match config.storage_backend {
            StorageBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL deve ser definida")?;

                // Conecta ao banco de dados, usando '?' para propagar erros
                let pool = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await
                    .context("Falha ao conectar ao banco de dados")?;

                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
                let repo: Arc<dyn ItemStore> = Arc::new(PgItemRepository::new(pool.clone()));
                (Some(pool), repo)
            }
            StorageBackend::Memory => {
                tracing::warn!("⚠️ STORAGE_BACKEND=memory: itens somem ao reiniciar");
                let repo: Arc<dyn ItemStore> = Arc::new(MemoryItemRepository::new());
                (None, repo)
            }
        };

        Ok(Self::from_parts(config, db_pool, repo, images))
    }

    pub fn from_parts(
        config: Config,
        db_pool: Option<PgPool>,
        repo: Arc<dyn ItemStore>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            db_pool,
            item_service: ItemService::new(repo, images),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parses_known_names() {
        assert_eq!("postgres".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert_eq!(" Memory ".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("mongo".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn uploads_url_is_under_public_base() {
        let config = Config {
            storage_backend: StorageBackend::Memory,
            database_url: None,
            db_max_connections: 5,
            host: "127.0.0.1".into(),
            port: 5000,
            upload_dir: PathBuf::from("uploads"),
            public_base_url: "http://localhost:5000".into(),
            cors_origin: "http://localhost:3000".into(),
            max_upload_bytes: 1024,
        };
        assert_eq!(config.uploads_url(), "http://localhost:5000/uploads");
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
    }
}
