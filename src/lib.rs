pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use error::{BackendError, StoreError, ValidationError};
pub use models::{Note, NoteDraft};
pub use service::{NoteStore, UnknownWritePolicy, WritePolicy};
