use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    error::BackendError,
    models::{Note, NoteDraft},
    repository::{Backend, PageWindow, Session},
};

#[derive(Debug, Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, Note>,
}

/// Backend keeping the notes table in process memory.
///
/// Clones share the same table. The lock is held per statement only, so
/// concurrent operations interleave the way they would on a read-committed
/// database.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    table: Arc<Mutex<Table>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn acquire(&self) -> Result<Box<dyn Session>, BackendError> {
        Ok(Box::new(MemorySession {
            table: Arc::clone(&self.table),
        }))
    }
}

struct MemorySession {
    table: Arc<Mutex<Table>>,
}

fn newest_first(notes: &mut [Note]) {
    notes.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[async_trait]
impl Session for MemorySession {
    async fn count(&self) -> Result<u64, BackendError> {
        let table = self.table.lock().await;
        Ok(table.rows.len() as u64)
    }

    async fn fetch_page(&self, window: PageWindow) -> Result<Vec<Note>, BackendError> {
        let mut notes: Vec<Note> = self.table.lock().await.rows.values().cloned().collect();
        newest_first(&mut notes);

        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);

        Ok(notes.into_iter().skip(offset).take(limit).collect())
    }

    async fn fetch_all(&self) -> Result<Vec<Note>, BackendError> {
        Ok(self.table.lock().await.rows.values().cloned().collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Note>, BackendError> {
        Ok(self.table.lock().await.rows.get(&id).cloned())
    }

    async fn insert(&self, draft: &NoteDraft, at: DateTime<Utc>) -> Result<Note, BackendError> {
        let mut table = self.table.lock().await;
        table.last_id += 1;

        let note = Note {
            id: table.last_id,
            title: draft.title.clone(),
            text: draft.text.clone(),
            created_at: at,
            updated_at: at,
        };
        table.rows.insert(note.id, note.clone());

        Ok(note)
    }

    async fn update(&self, note: &Note) -> Result<bool, BackendError> {
        let mut table = self.table.lock().await;

        match table.rows.get_mut(&note.id) {
            Some(row) => {
                row.title.clone_from(&note.title);
                row.text.clone_from(&note.text);
                row.updated_at = note.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, BackendError> {
        Ok(self.table.lock().await.rows.remove(&id).is_some())
    }
}
