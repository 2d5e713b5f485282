//! Expense chat - a chat assistant that keeps expenses in a Google Sheet
//!
//! Structured commands (`Add`, `Edit`, `Remove`, `Show`) edit the sheet;
//! anything else goes to a Gemini model with per-session history.

mod api;
mod chat;
mod command;
mod config;
mod ledger;
mod llm;
mod session;

#[cfg(test)]
mod testing;

use api::{create_router, AppState};
use chat::ChatSurface;
use config::Settings;
use ledger::{GoogleSheet, Ledger};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "expense_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let settings = Settings::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
    })?;

    // Spreadsheet client
    let sheet = GoogleSheet::open(
        &settings.credentials_path,
        &settings.sheet_name,
        settings.http_timeout,
    )
    .inspect_err(|e| tracing::error!(error = %e, "Cannot open expense sheet"))?;
    let ledger = Arc::new(Ledger::new(Arc::new(sheet)));

    tracing::info!(
        model = %settings.llm.model,
        base_url = %settings.llm.base_url,
        sheet = %settings.sheet_name,
        "Chat surface configured"
    );

    // Create application state
    let chat = ChatSurface::new(ledger, settings.llm, llm::openai_factory());
    let state = AppState::new(chat, settings.session_idle);
    state.sessions.spawn_sweeper();

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!("Expense chat listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
