use domain::activity::{ActivityFeed, ActivityRenderer};
use domain::dashboard::{DashboardRenderer, DashboardStats};
use domain::heartbeat::HeartbeatMonitor;
use domain::requests::{RequestsRenderer, RequestsSnapshot};
use domain::support::{SupportRenderer, SupportSnapshot};
use domain::{AppContext, DirectorySurface, FeatureModule, LogNotifier};
use log::*;
use service::{config::Config, logging::Logger};
use std::sync::Arc;
use std::time::Duration;

/// The backend sends a heartbeat roughly every 30 seconds.
const HEARTBEAT_MAX_AGE: Duration = Duration::from_secs(90);

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!(
        "Starting print shop console [{}] against {}",
        config.runtime_env(),
        config.base_url()
    );

    let surface = match DirectorySurface::new(config.output_dir()) {
        Ok(surface) => Arc::new(surface),
        Err(e) => {
            error!("Failed to prepare the output directory: {e}");
            std::process::exit(1);
        }
    };

    let ctx = match AppContext::from_config(config, surface, Arc::new(LogNotifier)).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Failed to initialize: {e}");
            std::process::exit(1);
        }
    };

    let dashboard =
        FeatureModule::<DashboardStats>::mount(&ctx, Arc::new(DashboardRenderer::new()));
    let activity = FeatureModule::<ActivityFeed>::mount(&ctx, Arc::new(ActivityRenderer::new()));
    let requests =
        FeatureModule::<RequestsSnapshot>::mount(&ctx, Arc::new(RequestsRenderer::new()));
    let support = FeatureModule::<SupportSnapshot>::mount(&ctx, Arc::new(SupportRenderer::new()));

    tokio::join!(
        dashboard.load(),
        activity.load(),
        requests.load(),
        support.load()
    );

    let heartbeat = Arc::new(HeartbeatMonitor::new());
    ctx.stream.on(events::HEARTBEAT, heartbeat.clone());
    ctx.connect();

    let mut watchdog = tokio::time::interval(HEARTBEAT_MAX_AGE);
    // The first tick completes immediately.
    watchdog.tick().await;
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Failed to listen for Ctrl-C: {e}");
                }
                break;
            }
            _ = watchdog.tick() => {
                if !ctx.stream.is_closed() && heartbeat.is_stale(HEARTBEAT_MAX_AGE) {
                    warn!(
                        "No heartbeat for {HEARTBEAT_MAX_AGE:?} (stream is {})",
                        ctx.stream.state().status
                    );
                }
            }
        }
    }

    info!("Shutting down");
    dashboard.destroy();
    activity.destroy();
    requests.destroy();
    support.destroy();
    ctx.stream.close().await;
}
