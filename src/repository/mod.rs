mod embedded;
pub mod memory;
pub mod postgres;

pub use memory::MemoryBackend;
pub use postgres::PgBackend;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::BackendError,
    models::{Note, NoteDraft},
};

/// Limit/offset pair of one listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: i64,
    pub offset: i64,
}

impl PageWindow {
    /// Page numbers start at 1; zero page numbers and sizes are clamped to 1.
    pub fn new(page_number: u32, page_size: u32) -> Self {
        let page_number = i64::from(page_number.max(1));
        let page_size = i64::from(page_size.max(1));

        Self {
            limit: page_size,
            offset: (page_number - 1).saturating_mul(page_size),
        }
    }
}

/// Source of scoped sessions against the notes table.
#[async_trait]
pub trait Backend: Send + Sync {
    /// The session is released when dropped, on every exit path.
    async fn acquire(&self) -> Result<Box<dyn Session>, BackendError>;
}

/// Primitive operations on the notes table, valid for one store operation.
#[async_trait]
pub trait Session: Send + Sync {
    async fn count(&self) -> Result<u64, BackendError>;

    /// Ordered by `created_at` descending, then `id` descending.
    async fn fetch_page(&self, window: PageWindow) -> Result<Vec<Note>, BackendError>;

    async fn fetch_all(&self) -> Result<Vec<Note>, BackendError>;

    async fn find(&self, id: i64) -> Result<Option<Note>, BackendError>;

    /// Stores a new note with both timestamps set to `at` and returns it
    /// with its generated id.
    async fn insert(&self, draft: &NoteDraft, at: DateTime<Utc>) -> Result<Note, BackendError>;

    /// Overwrites title, text and `updated_at` of the row with `note.id`.
    /// Returns `false` when no such row exists.
    async fn update(&self, note: &Note) -> Result<bool, BackendError>;

    /// Returns `false` when no such row exists.
    async fn delete(&self, id: i64) -> Result<bool, BackendError>;
}
