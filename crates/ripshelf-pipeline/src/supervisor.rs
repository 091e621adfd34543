//! Construction and lifecycle. Startup order matters: the workspace layout
//! and the startup sweep come before any worker can touch a job.

use std::path::PathBuf;
use std::sync::Arc;

use ripshelf_config::Config;
use ripshelf_driver::{Catalog, DiscProbe, Notifier, Ripper, Transcoder};
use ripshelf_store::JobStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::encode::EncodeWorker;
use crate::identify::IdentifyWorker;
use crate::mover::MoveWorker;
use crate::rip::RipWorker;
use crate::watch::DiscWatcher;
use crate::{oversight, paths, PipelineError};

/// The external-world capabilities the pipeline runs against. Tests swap in
/// stubs; the binary wires up the real tools.
pub struct Drivers {
    pub probe: Arc<dyn DiscProbe>,
    pub ripper: Arc<dyn Ripper>,
    pub transcoder: Arc<dyn Transcoder>,
    /// None when no catalog token is configured.
    pub catalog: Option<Arc<dyn Catalog>>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct Supervisor {
    handles: Vec<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
}

impl Supervisor {
    /// Prepare the workspace, sweep stale state, then start one disc
    /// watcher and one rip worker per drive plus the three singleton
    /// workers (encode, identify, move).
    pub async fn start(
        config: &Config,
        store: Arc<dyn JobStore>,
        drivers: Drivers,
    ) -> Result<Self, PipelineError> {
        let movies_root: PathBuf = config
            .movies_root
            .clone()
            .ok_or_else(|| PipelineError::Internal("movies root not configured".into()))?;

        paths::ensure_workspace_layout(&config.workspace_root)?;

        let report = oversight::startup_sweep(&store).await?;
        info!(
            ripping_failed = report.ripping_failed,
            encoding_requeued = report.encoding_requeued,
            identifying_requeued = report.identifying_requeued,
            "startup sweep complete"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handles = Vec::new();

        for drive in &config.drives {
            let watcher = DiscWatcher::new(
                store.clone(),
                drivers.probe.clone(),
                drivers.notifier.clone(),
                drive.clone(),
                config.poll_interval,
                shutdown_rx.clone(),
            );
            handles.push(tokio::spawn(watcher.run()));

            let ripper = RipWorker::new(
                store.clone(),
                drivers.ripper.clone(),
                config.workspace_root.clone(),
                drive.clone(),
                shutdown_rx.clone(),
            );
            handles.push(tokio::spawn(ripper.run()));
        }

        let encoder = EncodeWorker::new(
            store.clone(),
            drivers.transcoder.clone(),
            config.workspace_root.clone(),
            shutdown_rx.clone(),
        );
        handles.push(tokio::spawn(encoder.run()));

        let identifier = IdentifyWorker::new(
            store.clone(),
            drivers.catalog.clone(),
            config.auto_approve_threshold,
            shutdown_rx.clone(),
        );
        handles.push(tokio::spawn(identifier.run()));

        let mover = MoveWorker::new(
            store.clone(),
            drivers.notifier.clone(),
            movies_root,
            config.workspace_root.clone(),
            shutdown_rx,
        );
        handles.push(tokio::spawn(mover.run()));

        info!(drives = config.drives.len(), "pipeline started");
        Ok(Self {
            handles,
            shutdown_tx,
        })
    }

    /// Signal every worker and wait for them to drain. The encode worker
    /// returns its in-flight job to ripped before exiting.
    pub async fn shutdown(self) {
        info!("shutting down pipeline");
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
        info!("pipeline stopped");
    }
}
