use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use tokio_postgres::{NoTls, Row};

use crate::{
    config::DatabaseConfig,
    error::BackendError,
    models::{Note, NoteDraft},
    repository::{Backend, PageWindow, Session, embedded::migrations},
};

/// PostgreSQL backend handing out pooled connections, one per session.
#[derive(Clone)]
pub struct PgBackend {
    pool: Pool,
}

impl PgBackend {
    /// Builds the pool. Connections are opened lazily on first acquisition.
    pub fn new(config: &DatabaseConfig) -> Result<Self, BackendError> {
        let pg_config = config.dsn.parse::<tokio_postgres::Config>()?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let pool = Pool::builder(manager)
            .max_size(config.pool_size)
            .wait_timeout(Some(config.pool_timeout))
            .runtime(Runtime::Tokio1)
            .build()?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), BackendError> {
        let mut client = self.pool.get().await?;
        let migrations_report = migrations::runner().run_async(&mut **client).await?;

        for migration in migrations_report.applied_migrations() {
            tracing::info!(
                "Migration Applied -  Name: {}, Version: {}",
                migration.name(),
                migration.version()
            );
        }

        tracing::info!("DB migrations finished!");

        Ok(())
    }
}

#[async_trait]
impl Backend for PgBackend {
    async fn acquire(&self) -> Result<Box<dyn Session>, BackendError> {
        let client = self.pool.get().await?;
        Ok(Box::new(PgSession { client }))
    }
}

struct PgSession {
    client: Object,
}

fn note_from_row(row: &Row) -> Note {
    Note {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl Session for PgSession {
    async fn count(&self) -> Result<u64, BackendError> {
        let row = self
            .client
            .query_one("SELECT COUNT(*) AS total FROM notes", &[])
            .await?;
        let total: i64 = row.get("total");

        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn fetch_page(&self, window: PageWindow) -> Result<Vec<Note>, BackendError> {
        let rows = self
            .client
            .query(
                "SELECT id, title, text, created_at, updated_at FROM notes \
                 ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
                &[&window.limit, &window.offset],
            )
            .await?;

        Ok(rows.iter().map(note_from_row).collect())
    }

    async fn fetch_all(&self) -> Result<Vec<Note>, BackendError> {
        let rows = self
            .client
            .query(
                "SELECT id, title, text, created_at, updated_at FROM notes",
                &[],
            )
            .await?;

        Ok(rows.iter().map(note_from_row).collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Note>, BackendError> {
        let row = self
            .client
            .query_opt(
                "SELECT id, title, text, created_at, updated_at FROM notes WHERE id = $1",
                &[&id],
            )
            .await?;

        Ok(row.as_ref().map(note_from_row))
    }

    async fn insert(&self, draft: &NoteDraft, at: DateTime<Utc>) -> Result<Note, BackendError> {
        let row = self
            .client
            .query_one(
                "INSERT INTO notes (title, text, created_at, updated_at) VALUES ($1, $2, $3, $3) \
                 RETURNING id, title, text, created_at, updated_at",
                &[&draft.title, &draft.text, &at],
            )
            .await?;

        Ok(note_from_row(&row))
    }

    async fn update(&self, note: &Note) -> Result<bool, BackendError> {
        let rows = self
            .client
            .execute(
                "UPDATE notes SET title = $1, text = $2, updated_at = $3 WHERE id = $4",
                &[&note.title, &note.text, &note.updated_at, &note.id],
            )
            .await?;

        Ok(rows == 1)
    }

    async fn delete(&self, id: i64) -> Result<bool, BackendError> {
        let rows = self
            .client
            .execute("DELETE FROM notes WHERE id = $1", &[&id])
            .await?;

        Ok(rows == 1)
    }
}
