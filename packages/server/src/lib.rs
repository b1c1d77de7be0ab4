#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for INGRES groundwater data.
//!
//! Serves region assessments, historical readings, comparisons, critical
//! unit rollups, exports, and conversational queries over a
//! [`GroundwaterStore`]. Text generation is optional: without provider
//! credentials the bare generation endpoint answers 502 and the combined
//! ask endpoint falls back to placeholder insight content.

pub mod config;
mod error;
mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use ingres_ai::providers::{LlmProvider, create_provider_from_env};
use ingres_database::{GroundwaterStore, db, queries::SqlStore, run_migrations};

pub use config::ServerConfig;

/// Shared application state.
pub struct AppState {
    /// Groundwater record store.
    pub store: Arc<dyn GroundwaterStore>,
    /// Text-generation provider, when configured.
    pub generator: Option<Arc<dyn LlmProvider>>,
}

/// Registers every API route under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/ai/chat", web::post().to(handlers::ai_chat))
            .service(
                web::scope("/groundwater")
                    .route(
                        "/current-assessment",
                        web::get().to(handlers::current_assessment),
                    )
                    .route("/historical-data", web::get().to(handlers::historical_data))
                    .route("/compare-regions", web::get().to(handlers::compare_regions))
                    .route("/critical-units", web::get().to(handlers::critical_units))
                    .route("/export", web::get().to(handlers::export))
                    .route("/simple-export", web::get().to(handlers::simple_export))
                    .route("/chat-query", web::post().to(handlers::chat_query))
                    .route("/ask", web::post().to(handlers::ask)),
            ),
    );
}

/// Starts the INGRES API server.
///
/// Connects to the database, runs migrations, sets up the text-generation
/// provider if credentials are present, and starts the Actix-Web HTTP
/// server. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the database connection or
/// migrations fail, or the HTTP server fails to bind or encounters a
/// runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    log::info!("Connecting to database...");
    let db_conn = db::connect(&config.database_url)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to connect to database: {e}")))?;

    log::info!("Running migrations...");
    run_migrations(db_conn.as_ref())
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to run migrations: {e}")))?;

    let generator: Option<Arc<dyn LlmProvider>> = match create_provider_from_env() {
        Ok(provider) => {
            log::info!("Text generation enabled via {}", provider.name());
            Some(Arc::from(provider))
        }
        Err(e) => {
            log::warn!("Text generation disabled: {e}");
            None
        }
    };

    let state = web::Data::new(AppState {
        store: Arc::new(SqlStore::new(Arc::from(db_conn))),
        generator,
    });

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}
