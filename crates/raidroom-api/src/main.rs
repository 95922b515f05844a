//! Raidroom API server entry point.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use raidroom_api::config::AppConfig;
use raidroom_api::error::AppError;
use raidroom_api::routes;
use raidroom_api::state::AppState;
use raidroom_api::telemetry;
use raidroom_core::clock::SystemClock;
use raidroom_core::rng::SystemRng;
use raidroom_encounter::domain::entities::Boss;
use raidroom_encounter::domain::template::{boss_from_yaml, shadow_drake};
use raidroom_oracle::ChatCompletionOracle;
use raidroom_session::application::actor::RoomActor;
use raidroom_session::application::room::Room;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    // Read configuration from environment.
    let config = AppConfig::from_env()?;

    let telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;
    tracing::info!(
        otlp = telemetry.is_exporting(),
        "Starting Raidroom API server"
    );

    // Build the room.
    let boss = load_boss(&config).await?;
    tracing::info!(boss = boss.name(), max_health = boss.max_health(), "boss template loaded");

    let oracle = ChatCompletionOracle::new(config.oracle.clone())
        .map_err(|e| AppError::Config(format!("oracle client: {e}")))?;
    tracing::info!(base_url = oracle.base_url(), "oracle client ready");

    let room = Room::new(boss, config.room.clone());
    let (handle, actor) = RoomActor::spawn(
        room,
        Arc::new(oracle),
        Arc::new(SystemClock),
        Box::new(SystemRng::new()),
    );

    // Build router.
    let app = routes::app(AppState::new(handle));

    // Start server.
    let addr: SocketAddr = config
        .listen_address()
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(AppError::Server)?;

    axum::serve(listener, app).await.map_err(AppError::Server)?;

    actor.abort();
    telemetry.shutdown();

    Ok(())
}

async fn load_boss(config: &AppConfig) -> Result<Boss, AppError> {
    match &config.boss_template_path {
        Some(path) => {
            let source = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| AppError::Template(format!("{}: {e}", path.display())))?;
            boss_from_yaml(&source).map_err(|e| AppError::Template(e.to_string()))
        }
        None => shadow_drake().map_err(|e| AppError::Template(e.to_string())),
    }
}
