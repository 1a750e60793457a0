//! HTTP API for the plocky plogging tracker.
//!
//! # Routes
//!
//! | Method | Path | Success |
//! |---|---|---|
//! | `POST` | `/members` | 201 profile |
//! | `GET` | `/members/me` | 200 profile |
//! | `POST` | `/plogging` | 201 `{ "ploggingId": n }` |
//! | `GET` | `/plogging` | 200 session history |
//! | `GET` | `/plogging/{id}` | 200 session summary |
//! | `GET` | `/trashcan` | 200 list |
//! | `POST` | `/trashcan` | 201 trashcan |
//! | `DELETE` | `/trashcan?trashcanId=` | 204 |
//!
//! Member routes read the acting member from the `X-Member-Id` header, which the
//! authentication proxy in front of this service is expected to set.
//!
//! # Configuration
//!
//! - `KAKAO_REST_API_KEY` (required)
//! - `PLOCKY_PORT` (default `8080`)
//! - `KAKAO_BASE_URL` (default `https://dapi.kakao.com`)
//! - `GEOCODER_TIMEOUT_SECS` (default `5`)
//! - `DATABASE_URL` (default `sqlite://plocky.db`)
//! - `RUST_LOG` (default `info`)
#![deny(missing_docs)]

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderName, Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use plocky_provider_kakao::KakaoGeocoder;
use plocky_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;
pub mod state;

use config::Config;
use identity::MEMBER_HEADER;
use routes::{
    create_plogging_handler, create_trashcan_handler, delete_trashcan_handler,
    get_plogging_handler, health_handler, list_ploggings_handler, list_trashcans_handler,
    member_profile_handler, register_member_handler,
};
use state::AppState;

/// Build the application router around the given state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(MEMBER_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_handler))
        .route("/members", post(register_member_handler))
        .route("/members/me", get(member_profile_handler))
        .route(
            "/plogging",
            get(list_ploggings_handler).post(create_plogging_handler),
        )
        .route("/plogging/{id}", get(get_plogging_handler))
        .route(
            "/trashcan",
            get(list_trashcans_handler)
                .post(create_trashcan_handler)
                .delete(delete_trashcan_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Wire the store and geocoder from `config` and serve until a shutdown signal.
///
/// # Errors
///
/// Fails when the HTTP client cannot be built, the database cannot be opened,
/// or the port cannot be bound.
pub async fn start_server(config: Config) -> Result<()> {
    info!("Initializing state...");
    let client = reqwest::Client::builder()
        .user_agent("plocky/0.1")
        .timeout(config.geocoder_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let geocoder = Arc::new(KakaoGeocoder::with_base_url(
        client,
        config.kakao_api_key.clone(),
        config.kakao_base_url.clone(),
    ));
    let store = Arc::new(
        SqliteStore::connect(&config.database_url)
            .await
            .with_context(|| format!("Failed to open database {}", config.database_url))?,
    );
    let app = router(AppState::new(Arc::<SqliteStore>::clone(&store), geocoder));

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    store.close().await;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
