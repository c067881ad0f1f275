use crate::db::models::Document;
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub type DbPool = Pool<Postgres>;

const DOCUMENT_NAME: &str = "pollpulse";

/// Backing storage for the whole document. Implementations load and save it
/// wholesale; partial updates are not supported.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load(&self) -> Result<Document, StoreError>;

    async fn save(&self, document: &Document) -> Result<(), StoreError>;
}

/// Handle shared by the handlers. Every mutation is a full load/mutate/save
/// cycle and cycles never interleave within one process.
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn DocumentStore>,
    write_lock: Arc<Mutex<()>>,
}

impl Database {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Database {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn in_memory() -> Self {
        Database::new(Arc::new(MemoryStore::default()))
    }

    pub async fn snapshot(&self) -> Result<Document, StoreError> {
        self.store.load().await
    }

    pub async fn update<T, F>(&self, mutate: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Document) -> T + Send,
        T: Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut document = self.store.load().await?;
        let out = mutate(&mut document);
        document.last_updated = Utc::now();
        self.store.save(&document).await?;
        Ok(out)
    }

    /// Like [`Database::update`], but nothing is written when `mutate`
    /// returns `None`.
    pub async fn try_update<T, F>(&self, mutate: F) -> Result<Option<T>, StoreError>
    where
        F: FnOnce(&mut Document) -> Option<T> + Send,
        T: Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut document = self.store.load().await?;
        let Some(out) = mutate(&mut document) else {
            return Ok(None);
        };
        document.last_updated = Utc::now();
        self.store.save(&document).await?;
        Ok(Some(out))
    }
}

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        info!("Creating document store at {}", self.path.display());
        self.write(&Document::default()).await
    }

    async fn write(&self, document: &Document) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(document)?;
        let tmp_path = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp_path, body).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn load(&self) -> Result<Document, StoreError> {
        self.initialize().await?;
        let body = tokio::fs::read(&self.path).await?;

        Ok(serde_json::from_slice(&body)?)
    }

    async fn save(&self, document: &Document) -> Result<(), StoreError> {
        self.write(document).await
    }
}

#[derive(Default)]
pub struct MemoryStore {
    document: Mutex<Document>,
}

impl MemoryStore {
    pub fn with_document(document: Document) -> Self {
        MemoryStore {
            document: Mutex::new(document),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self) -> Result<Document, StoreError> {
        Ok(self.document.lock().await.clone())
    }

    async fn save(&self, document: &Document) -> Result<(), StoreError> {
        *self.document.lock().await = document.clone();
        Ok(())
    }
}

pub async fn init_db(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .max_lifetime(Duration::from_secs(30 * 60))
        .idle_timeout(Duration::from_secs(10 * 60))
        .connect(database_url)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            name VARCHAR(64) PRIMARY KEY,
            body JSONB NOT NULL,
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}

/// Keeps the document as a single JSONB row.
pub struct PgDocumentStore {
    pool: DbPool,
}

impl PgDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        PgDocumentStore { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn load(&self) -> Result<Document, StoreError> {
        let row = sqlx::query("SELECT body FROM documents WHERE name = $1")
            .bind(DOCUMENT_NAME)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let body: Json<Document> = row.try_get("body")?;
                Ok(body.0)
            }
            None => {
                debug!("No stored document yet, starting empty");
                Ok(Document::default())
            }
        }
    }

    async fn save(&self, document: &Document) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO documents (name, body, updated_at) VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET body = EXCLUDED.body, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(DOCUMENT_NAME)
        .bind(Json(document.clone()))
        .bind(document.last_updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
