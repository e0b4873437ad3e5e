//! The judge-compatible HTTP server binary: axum router, in-memory
//! storage, `env_logger`-backed logging. Generalizes the teacher's
//! hardcoded `tokio::main` entry point into a `Config::from_env()`-driven
//! one.

use std::sync::Arc;

use rusty_ship::config::ServerConfig;
use rusty_ship::http::{build_router, AppState};
use rusty_ship::storage::MemoryStore;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env();
    let state = AppState::new(Arc::new(MemoryStore::new()));
    let app = build_router(state);

    log::info!("rusty-ship server listening on {}", config.bind_addr);

    axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .await
        .expect("server failed");
}
