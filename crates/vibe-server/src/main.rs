use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use vibe_proto::config::Config;
use vibe_server::routes::{self, AppState};
use vibe_server::session::SessionStore;
use vibe_server::spotify::SpotifyClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Allow RUST_LOG override; suppress noisy connection-level DEBUG from
    // HTTP client internals (hyper_util, reqwest).
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        "info,vibe_server=debug,hyper_util=warn,hyper=warn,reqwest=warn".to_string()
    });
    tracing_subscriber::fmt()
        .with_env_filter(log_filter.as_str())
        .init();

    let config = Config::load()?;
    info!("config loaded from {:?}", Config::config_path());

    if !config.spotify.is_configured() {
        warn!(
            "Spotify credentials not configured — set SPOTIFY_CLIENT_ID / \
             SPOTIFY_CLIENT_SECRET or edit {:?}; /login will refuse until then",
            Config::config_path()
        );
    }

    let state = AppState {
        store: Arc::new(SessionStore::new()),
        spotify: Arc::new(SpotifyClient::new(config.spotify.clone())?),
    };
    let app = routes::router(state);

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("vibe server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
