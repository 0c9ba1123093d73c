//! Devfeed UI server - HTTP and SSE bridge between a browser and a feed session.

mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::bail;
use axum::Router;
use axum::routing::get;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use devfeed::io::api::ApiClient;
use devfeed::io::config::{DEFAULT_CONFIG_FILE, load_config};
use devfeed::io::credentials::{SessionCredentials, TOKEN_ENV};
use devfeed::session::spawn_session;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "devfeed-ui")]
#[command(about = "Web bridge for swiping through developer profiles")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Path to the TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Directory containing UI static files (defaults to ./ui/dist)
    #[arg(long)]
    ui_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("devfeed_ui=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let cfg = load_config(&args.config)?;
    let credentials = SessionCredentials::resolve(&cfg.session);
    if !credentials.is_authenticated() {
        bail!(
            "no session token: set session.token in {} or {}",
            args.config.display(),
            TOKEN_ENV
        );
    }
    let api = ApiClient::new(&cfg, credentials)?;
    info!(
        base_url = api.base_url(),
        user_id = api.user_id().unwrap_or("unknown"),
        "starting devfeed-ui"
    );

    let feed = spawn_session(api.clone(), api, cfg.controller_options());
    let state = AppState::new(feed.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .nest("/api", routes::api_router())
        .route("/events", get(sse::events_handler))
        .layer(cors)
        .with_state(state);

    let ui_dir = args.ui_dir.unwrap_or_else(|| PathBuf::from("ui").join("dist"));
    if ui_dir.exists() {
        info!(ui_dir = %ui_dir.display(), "serving static UI files");
        app = app.fallback_service(ServeDir::new(ui_dir).append_index_html_on_directories(true));
    } else {
        info!(ui_dir = %ui_dir.display(), "UI directory not found, API-only mode");
    }

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
            // Open SSE streams end once the session stops.
            feed.shutdown().await;
        })
        .await?;

    Ok(())
}
