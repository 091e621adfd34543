use std::sync::Arc;

use anyhow::{Context, Result};
use ripshelf_api::build_app;
use ripshelf_config::Config;
use ripshelf_driver::{
    Catalog, HandBrakeTranscoder, MakemkvProbe, MakemkvRipper, PushoverNotifier, TmdbCatalog,
};
use ripshelf_pipeline::{Drivers, Supervisor};
use ripshelf_store::{JobStore, MemoryStore, RedbStore};
use tracing::info;

use crate::output;

// ── Serve ─────────────────────────────────────────────────────────────────────

pub async fn serve(ephemeral: bool) -> Result<()> {
    let config = Config::from_env().context("loading configuration")?;
    config
        .validate_for_serving()
        .context("configuration incomplete for serving")?;

    let store: Arc<dyn JobStore> = if ephemeral {
        info!("using in-memory store; jobs will not survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        let path = config.store_path();
        info!(path = %path.display(), "opening job store");
        Arc::new(
            RedbStore::open(&path)
                .with_context(|| format!("opening store at {}", path.display()))?,
        )
    };

    let catalog: Option<Arc<dyn Catalog>> = match &config.tmdb_token {
        Some(token) => Some(Arc::new(TmdbCatalog::new(token.clone()))),
        None => {
            info!("no catalog token configured; every disc will need review");
            None
        }
    };

    let drivers = Drivers {
        probe: Arc::new(MakemkvProbe::new()),
        ripper: Arc::new(MakemkvRipper::new()),
        transcoder: Arc::new(HandBrakeTranscoder::new()),
        catalog: catalog.clone(),
        notifier: Arc::new(PushoverNotifier::new(
            config.pushover_user.clone(),
            config.pushover_token.clone(),
        )),
    };

    let supervisor = Supervisor::start(&config, store.clone(), drivers)
        .await
        .context("starting pipeline")?;

    let app = build_app(store, catalog);
    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(bind = %config.bind, "control surface listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving control surface")?;

    supervisor.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not listen for shutdown signal");
    } else {
        info!("interrupt received, shutting down");
    }
}

// ── Remote inspection ─────────────────────────────────────────────────────────

async fn get_json(url: &str) -> Result<serde_json::Value> {
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("requesting {}", url))?
        .error_for_status()
        .with_context(|| format!("server rejected {}", url))?;
    Ok(response.json().await?)
}

pub async fn status(server: &str) -> Result<()> {
    let body = get_json(&format!("{}/status", server)).await?;
    print!("{}", output::render_status(&body));
    Ok(())
}

pub async fn jobs(server: &str, limit: usize, include_archived: bool) -> Result<()> {
    let url = format!(
        "{}/jobs?limit={}&include_archived={}",
        server, limit, include_archived
    );
    let body = get_json(&url).await?;
    print!("{}", output::render_jobs(&body));
    Ok(())
}

pub async fn check(server: &str) -> Result<()> {
    let body = get_json(&format!("{}/oversight/check", server)).await?;
    print!("{}", output::render_issues(&body));
    Ok(())
}

pub async fn fix_encoding(server: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let body: serde_json::Value = client
        .post(format!("{}/oversight/fix-encoding", server))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let repaired = body["repaired"].as_u64().unwrap_or(0);
    if repaired == 0 {
        println!("Nothing to repair.");
    } else {
        println!("Returned {} job(s) to the encode queue.", repaired);
    }
    Ok(())
}
