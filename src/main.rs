use mission_tracker::adapters::inbound::{FileMissionSource, SimulatedSource};
use mission_tracker::adapters::outbound::{init_domain_logger, GeoJsonSurface};
use mission_tracker::application::{TrackingEngine, TrackingSession};
use mission_tracker::domains::feed::{FeedScope, MissionFeed};
use mission_tracker::domains::logger::ScopedLogger;
use mission_tracker::domains::overlay::{CameraMode, SelectionListener};
use mission_tracker::domains::tracking::{MissionId, MissionReadSource};
use mission_tracker::Config;
use std::error::Error;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // fast_log owns the `log` facade when file logging is on, so tracing is
    // installed without its log bridge.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            warn!("Falling back to default configuration: {:#}", e);
            Config::default()
        }
    };
    let logger = init_domain_logger(&config.logging);
    info!("Starting mission tracker");

    let source: Arc<dyn MissionReadSource> = if config.source.simulate {
        info!("Serving the simulated demo fleet");
        Arc::new(SimulatedSource::new(SimulatedSource::demo_fleet(chrono::Utc::now())))
    } else {
        info!("Reading missions from {}", config.source.missions_path.display());
        Arc::new(FileMissionSource::new(config.source.missions_path.clone()))
    };

    let tracking = &config.tracking;
    let (scope, camera_mode) = match &config.source.focus_mission {
        Some(id) => {
            let mission_id = MissionId::new(id.as_str());
            (
                FeedScope::Mission(mission_id.clone()),
                CameraMode::Follow {
                    mission_id,
                    zoom: tracking.zoom,
                },
            )
        }
        None => (
            FeedScope::AllActive,
            CameraMode::Overview {
                zoom: tracking.zoom,
                follow_live: tracking.overview_follows_live,
            },
        ),
    };

    let selection_logger = ScopedLogger::new("selection", logger.clone());
    let listener: Arc<dyn SelectionListener> = Arc::new(move |id: &MissionId| {
        selection_logger.info(&format!("Mission {} selected", id));
    });
    let surface = GeoJsonSurface::new(config.output.geojson_path.clone())
        .with_selection_listener(listener)
        .with_initial_view(tracking.default_center, tracking.zoom);

    let engine = TrackingEngine::new(
        surface,
        camera_mode,
        tracking.frame_policy(),
        ScopedLogger::new("engine", logger.clone()),
    )
    .with_epsilon(tracking.position_epsilon_deg)
    .with_viewer(config.source.viewer);

    let feed = MissionFeed::new(source, scope, ScopedLogger::new("feed", logger.clone()))
        .with_urgency_window(tracking.frame_policy().urgency_window);
    let session = TrackingSession::start(feed, engine, config.polling.tracking_interval());
    let mut board = session.board();

    loop {
        tokio::select! {
            changed = board.changed() => {
                if changed.is_err() {
                    warn!("Tracking session ended unexpectedly");
                    break;
                }
                let line = board.borrow_and_update().status_line();
                info!("{}", line);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    match session.stop().await {
        Ok(mut surface) => {
            surface.flush().await;
            info!("Overlay cleared ({} features left)", surface.feature_count());
        }
        Err(e) => error!("Failed to stop tracking session: {}", e),
    }
    logger.info("Mission tracker stopped");
    log::logger().flush();

    Ok(())
}
