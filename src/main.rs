use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use notes_store::{
    config,
    handlers::{self, rest::ApiState},
    repository::{Backend, MemoryBackend, PgBackend},
    service::NoteStore,
};

#[tokio::main]
async fn main() {
    // Log setup
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load config
    let cfg = config::load_config().unwrap_or_else(|e| {
        tracing::error!("Failed to load config: {e}");
        panic!("failed to load config: {e}");
    });
    tracing::info!("Successfully loaded notes store config");

    // Backend creation and migration
    let backend: Arc<dyn Backend> = if let Some(database) = &cfg.database {
        let backend = PgBackend::new(database).unwrap_or_else(|e| {
            tracing::error!("Failed to create database pool: {e}");
            panic!("failed to create database pool: {e}");
        });

        backend.migrate().await.unwrap_or_else(|e| {
            tracing::error!("Failed to migrate database: {e}");
            panic!("failed to migrate database: {e}");
        });

        Arc::new(backend)
    } else {
        tracing::warn!("No database configured, notes are kept in memory only");
        Arc::new(MemoryBackend::new())
    };

    // Store creation
    let store = NoteStore::new(backend, cfg.store.write_policy);
    tracing::info!("Write policy for updates and deletes: {}", store.policy());

    let state = Arc::new(ApiState::new(store, cfg.store.default_page_size));
    let router = handlers::router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cfg.http.port))
        .await
        .expect("Failed to bind to address");
    let addr = listener.local_addr().expect("Failed to read bound address");

    tracing::info!("REST server starting, listening on {}", addr);

    axum::serve(listener, router)
        .await
        .expect("Failed to start server");
}
