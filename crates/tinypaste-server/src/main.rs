mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use tinypaste_api::auth::{AppState, AppStateInner};
use tinypaste_crypto::PasteSecret;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `tinypaste generate-secret` prints a value for TINYPASTE_ENCRYPTION_KEY
    if std::env::args().nth(1).as_deref() == Some("generate-secret") {
        println!("{}", PasteSecret::generate().to_base64());
        return Ok(());
    }

    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tinypaste=debug,tinypaste_api=debug,tinypaste_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;
    if config.paste_secret.is_none() {
        warn!("TINYPASTE_ENCRYPTION_KEY is not set; private pastes are disabled");
    }

    // Init database
    let db = tinypaste_db::Database::open(&config.db_path)?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret,
        paste_secret: config.paste_secret,
        public_url: config.public_url,
    });

    let app = tinypaste_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("tinypaste listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
