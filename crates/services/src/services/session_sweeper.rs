//! Background service that deletes expired login sessions.

use std::time::Duration;

use chrono::Utc;
use db::{DBService, models::session::Session};
use tokio::time::interval;
use tracing::{debug, error, info};

pub struct SessionSweeper {
    db: DBService,
    sweep_interval: Duration,
}

impl SessionSweeper {
    pub fn new(db: DBService, sweep_interval: Duration) -> Self {
        Self { db, sweep_interval }
    }

    /// Spawn the sweeper loop on the runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.start().await;
        })
    }

    async fn start(&self) {
        info!(
            "Starting session sweeper with interval {:?}",
            self.sweep_interval
        );

        let mut interval = interval(self.sweep_interval);

        loop {
            interval.tick().await;
            if let Err(e) = self.sweep_once().await {
                error!("Error sweeping expired sessions: {}", e);
            }
        }
    }

    /// Delete every session whose expiry has passed. Returns the number removed.
    pub async fn sweep_once(&self) -> Result<u64, sqlx::Error> {
        let removed = Session::delete_expired(&self.db.pool, Utc::now()).await?;
        if removed > 0 {
            info!(removed, "Removed expired sessions");
        } else {
            debug!("Session sweep: nothing expired");
        }
        Ok(removed)
    }
}
