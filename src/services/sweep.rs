//! Periodic reconciliation: drivers for waiting trips and fresh room
//! statuses as the hotel day rolls over.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::services::dispatch::DispatchEngine;
use crate::services::notify::Notifier;
use crate::services::room_status;

/// One reconciliation pass. Failures are logged and the next pass retries.
pub async fn run_once(db: &DatabaseConnection, notifier: &dyn Notifier, config: &Config) {
    let now = Utc::now();

    if let Err(e) = DispatchEngine::new(db, notifier)
        .assign_drivers_to_unassigned(now)
        .await
    {
        tracing::error!(error = %e, "Driver assignment sweep failed");
    }

    match room_status::refresh_all(db, now, config.hotel_offset()).await {
        Ok(0) => {}
        Ok(changed) => tracing::info!(changed, "Room statuses refreshed"),
        Err(e) => tracing::error!(error = %e, "Room status sweep failed"),
    }
}

pub fn spawn(db: DatabaseConnection, notifier: Arc<dyn Notifier>, config: Config) -> JoinHandle<()> {
    let period = Duration::from_secs(config.sweep_interval_secs.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            run_once(&db, notifier.as_ref(), &config).await;
        }
    })
}
