use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use fmaster_config::{load_master_config, StoreBackend};
use fmaster_reconciler::{FamilyLifecycleController, LeaderRoleGate, Role, WatchSyncReconciler};
use fmaster_rgroup::{LocalBundlePlacer, ResourceGroupManager};
use fmaster_signal::{LocalSchedulerRegistry, LoopbackSignalSender, StaticSchedulerDirectory};
use fmaster_store::{InMemoryMetaStore, MetaStoreClient};
use tokio::sync::{watch, Mutex};
use tracing::info;

/// `serve`: the master's own bootstrap entrypoint — starts the reconciler
/// loop and the HTTP API in-process against a single in-memory store
/// (§4.G, §7 ambient additions). Shuts down cleanly on Ctrl-C.
pub async fn serve(config_path: &Path) -> Result<()> {
    let config = load_master_config(config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let store: Arc<dyn MetaStoreClient> = match config.store_backend {
        StoreBackend::Memory => Arc::new(InMemoryMetaStore::new()),
    };
    let sender = Arc::new(LoopbackSignalSender::new());
    let registry = Arc::new(LocalSchedulerRegistry::new());
    let role = LeaderRoleGate::new(Role::Master);
    let directory = Arc::new(StaticSchedulerDirectory::new(config.nodes.clone()));

    let controller = Arc::new(Mutex::new(FamilyLifecycleController::with_timing(
        store.clone(),
        sender.clone(),
        registry.clone(),
        role.clone(),
        config.runtime_recover_enable,
        config.retry_kill_interval,
        config.kill_timeout,
    )));

    let placer = Arc::new(LocalBundlePlacer::new(vec![]));
    let rgroups = Arc::new(Mutex::new(ResourceGroupManager::new(
        store.clone(),
        sender,
        registry,
        placer,
    )));

    let mut reconciler = WatchSyncReconciler::with_interval(
        store.clone(),
        controller.clone(),
        rgroups.clone(),
        role,
        directory,
        config.sweep_interval,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reconciler_task = tokio::spawn(async move {
        reconciler.run_forever(shutdown_rx).await;
    });

    let app = fmaster_api::build_app(controller, rgroups, store, Arc::new(config.auth_token));
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;
    info!(bind_address = %config.bind_address, "fmaster listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("http server failed")?;

    let _ = shutdown_tx.send(true);
    let _ = reconciler_task.await;
    Ok(())
}

/// `status`: hits the running master's health and resource-summary
/// endpoints (§6 HTTP surface), teacher's `commands::status`.
pub async fn status(url: &str, token: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let base = url.trim_end_matches('/');

    let healthy = client
        .get(format!("{base}/global-scheduler/healthy"))
        .bearer_auth(token)
        .send()
        .await
        .with_context(|| format!("failed to reach master at {url}"))?
        .status()
        .is_success();
    println!("healthy: {}", healthy);

    let resources: serde_json::Value = client
        .get(format!("{base}/global-scheduler/resources"))
        .bearer_auth(token)
        .send()
        .await
        .with_context(|| format!("failed to reach master at {url}"))?
        .json()
        .await?;
    println!("{}", serde_json::to_string_pretty(&resources)?);
    Ok(())
}
