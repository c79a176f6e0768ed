use crate::metrics;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::overdue_dispatch_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Report decisions the external dispatch has not confirmed in time
    async fn overdue_dispatch_job(scheduler: Arc<Self>) {
        let period = Duration::from_secs(scheduler.context.config.jobs.overdue_check_secs);
        let mut interval = interval(period);

        loop {
            interval.tick().await;

            match tasks::check_overdue_dispatches(&scheduler.context).await {
                Ok(count) => {
                    metrics::record_background_job("overdue_dispatch", "success");
                    if count > 0 {
                        info!("{} decided announcements still waiting for dispatch", count);
                    }
                }
                Err(e) => {
                    metrics::record_background_job("overdue_dispatch", "failure");
                    error!("Failed to check overdue dispatches: {}", e);
                }
            }
        }
    }
}
