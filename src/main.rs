/// Announcement moderation service
///
/// Serves the moderation queue API and watches for decisions the external
/// dispatch job has not picked up.

use annonce_moderation::{
    config::{AppConfig, LoggingConfig},
    context::AppContext,
    error::ModerationResult,
    jobs, server,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ModerationResult<()> {
    // Load configuration
    let config = AppConfig::from_env()?;

    // Initialize logging
    init_tracing(&config.logging);

    tracing::info!(
        version = %config.service.version,
        dispatch_hour = config.dispatch.hour,
        "starting announcement moderation service"
    );

    // Create application context
    let ctx = Arc::new(AppContext::new(config).await?);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = logging.env_filter();

    if logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
