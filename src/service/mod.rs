use std::{fmt, str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{BackendError, StoreError},
    models::{Note, NoteDraft, next_update_timestamp, timestamp_now},
    repository::{Backend, PageWindow, Session},
};

/// How update and delete treat backend failures. Create always propagates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Log the failure and report success.
    #[default]
    BestEffort,
    /// Return the failure to the caller.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown write policy '{0}', expected 'best_effort' or 'strict'")]
pub struct UnknownWritePolicy(pub String);

impl FromStr for WritePolicy {
    type Err = UnknownWritePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best_effort" | "best-effort" => Ok(Self::BestEffort),
            "strict" => Ok(Self::Strict),
            other => Err(UnknownWritePolicy(other.to_string())),
        }
    }
}

impl fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BestEffort => f.write_str("best_effort"),
            Self::Strict => f.write_str("strict"),
        }
    }
}

/// Lower-cases one character at a time. Unlike `str::to_lowercase` this
/// ignores word context, so a folded needle matches wherever the folded
/// haystack does.
fn fold_case(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

/// Access point for all reads and writes of notes.
///
/// Every operation acquires its own backend session and releases it before
/// returning. The store keeps no mutable state of its own, so clones can be
/// used from any number of tasks.
#[derive(Clone)]
pub struct NoteStore {
    backend: Arc<dyn Backend>,
    policy: WritePolicy,
}

impl NoteStore {
    pub fn new(backend: Arc<dyn Backend>, policy: WritePolicy) -> Self {
        Self { backend, policy }
    }

    pub const fn policy(&self) -> WritePolicy {
        self.policy
    }

    async fn session(&self) -> Result<Box<dyn Session>, BackendError> {
        self.backend.acquire().await
    }

    /// Notes of one page, newest first. Out-of-range pages are empty.
    pub async fn list_page(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<Vec<Note>, StoreError> {
        let window = PageWindow::new(page_number, page_size);
        let notes = self.session().await?.fetch_page(window).await?;

        Ok(notes)
    }

    /// Notes whose title or text contains `term`, ignoring letter case,
    /// newest first. An empty term matches every note.
    pub async fn search(&self, term: &str) -> Result<Vec<Note>, StoreError> {
        let notes = self.session().await?.fetch_all().await?;

        let needle = fold_case(term);
        let mut found: Vec<Note> = notes
            .into_iter()
            .filter(|note| {
                fold_case(&note.title).contains(&needle)
                    || fold_case(&note.text).contains(&needle)
            })
            .collect();

        found.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(found)
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.session().await?.count().await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Note>, StoreError> {
        Ok(self.session().await?.find(id).await?)
    }

    /// Stores a new note stamped with the current time and returns it with
    /// its assigned id.
    pub async fn create(&self, draft: NoteDraft) -> Result<Note, StoreError> {
        draft.validate()?;

        let at = timestamp_now();
        match self.insert(&draft, at).await {
            Ok(note) => {
                tracing::debug!("created note {}", note.id);
                Ok(note)
            }
            Err(e) => {
                tracing::error!("failed to create note: {e}");
                Err(e.into())
            }
        }
    }

    /// Replaces title and text of note `id`. A missing note is not an error.
    pub async fn update(&self, id: i64, draft: NoteDraft) -> Result<(), StoreError> {
        draft.validate()?;

        match self.apply_update(id, draft).await {
            Ok(true) => {
                tracing::debug!("updated note {id}");
                Ok(())
            }
            Ok(false) => {
                tracing::warn!("note {id} not found, nothing to update");
                Ok(())
            }
            Err(e) => self.settle_write("update", id, e),
        }
    }

    /// Removes note `id` permanently. A missing note is not an error.
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        match self.remove(id).await {
            Ok(true) => {
                tracing::debug!("deleted note {id}");
                Ok(())
            }
            Ok(false) => {
                tracing::debug!("note {id} not found, nothing to delete");
                Ok(())
            }
            Err(e) => self.settle_write("delete", id, e),
        }
    }

    async fn insert(
        &self,
        draft: &NoteDraft,
        at: DateTime<Utc>,
    ) -> Result<Note, BackendError> {
        self.session().await?.insert(draft, at).await
    }

    async fn apply_update(&self, id: i64, draft: NoteDraft) -> Result<bool, BackendError> {
        let session = self.session().await?;

        let Some(mut note) = session.find(id).await? else {
            return Ok(false);
        };

        note.title = draft.title;
        note.text = draft.text;
        note.updated_at = next_update_timestamp(note.updated_at);

        session.update(&note).await
    }

    async fn remove(&self, id: i64) -> Result<bool, BackendError> {
        self.session().await?.delete(id).await
    }

    fn settle_write(&self, action: &str, id: i64, e: BackendError) -> Result<(), StoreError> {
        tracing::error!("failed to {action} note {id}: {e}");

        match self.policy {
            WritePolicy::BestEffort => Ok(()),
            WritePolicy::Strict => Err(e.into()),
        }
    }
}
