//! Per-drive disc watcher: polls the probe and turns absent→present edges
//! into pending jobs. Edge detection lives here, not in the probe, so a
//! disc sitting in the tray across many polls creates exactly one job.

use std::sync::Arc;
use std::time::Duration;

use ripshelf_domain::{active_mode_enabled, DriveId, ACTIVE_MODE_KEY};
use ripshelf_driver::{DiscProbe, DiscStatus, Notifier};
use ripshelf_store::JobStore;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub struct DiscWatcher {
    store: Arc<dyn JobStore>,
    probe: Arc<dyn DiscProbe>,
    notifier: Arc<dyn Notifier>,
    drive: DriveId,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl DiscWatcher {
    pub fn new(
        store: Arc<dyn JobStore>,
        probe: Arc<dyn DiscProbe>,
        notifier: Arc<dyn Notifier>,
        drive: DriveId,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            probe,
            notifier,
            drive,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let mut was_present = false;

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            // A failed probe counts as an empty tray for edge purposes, so a
            // flaky drive re-arms instead of wedging the watcher.
            let status = match self.probe.probe(&self.drive).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(drive_id = %self.drive, error = %e, "disc probe failed");
                    DiscStatus::empty()
                }
            };

            if status.present && !was_present {
                self.on_disc_inserted(&status.label).await;
            }
            was_present = status.present;

            tokio::select! {
                _ = self.shutdown.changed() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        info!(drive_id = %self.drive, "disc watcher stopped");
    }

    async fn on_disc_inserted(&self, label: &str) {
        match self.store.create_job(&self.drive, label).await {
            Ok(job) => {
                info!(job_id = %job.id, drive_id = %self.drive, label, "disc detected, job created");
                let active = match self.store.get_setting(ACTIVE_MODE_KEY).await {
                    Ok(value) => active_mode_enabled(value.as_deref()),
                    Err(e) => {
                        warn!(error = %e, "could not read active mode, assuming active");
                        true
                    }
                };
                if active {
                    let shown = if label.is_empty() { "(unlabeled)" } else { label };
                    self.notifier
                        .notify(
                            "Disc inserted",
                            &format!("drive {}: {}", self.drive, shown),
                            0,
                            None,
                        )
                        .await;
                }
            }
            Err(e) => {
                error!(drive_id = %self.drive, error = %e, "failed to create job for inserted disc");
            }
        }
    }
}
