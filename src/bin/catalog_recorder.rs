//! Watches every catalog kind and records each change as a commit in a Git repository.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kubernetes_service_catalog::client::CatalogClient;
use kubernetes_service_catalog::recorder::{record_changes, GitRecorder};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Working tree the history is committed to; initialized when missing.
    #[arg(long, env = "RECORDER_REPO", default_value = "./catalog-history")]
    repo: PathBuf,

    /// Only record namespaced catalog objects of this namespace.
    #[arg(long, env = "WATCH_NAMESPACE")]
    watch_namespace: Option<String>,

    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    std::fs::create_dir_all(&args.repo)
        .with_context(|| format!("creating {}", args.repo.display()))?;
    let recorder = Arc::new(
        GitRecorder::open(&args.repo).with_context(|| format!("opening {}", args.repo.display()))?,
    );
    let client = CatalogClient::new(kube::Client::try_default().await?);
    let ns = args.watch_namespace.as_deref();
    let cancel = CancellationToken::new();

    let mut tasks = JoinSet::new();
    tasks.spawn(record_changes(client.cluster_service_brokers(), recorder.clone(), cancel.clone()));
    tasks.spawn(record_changes(client.service_brokers(ns), recorder.clone(), cancel.clone()));
    tasks.spawn(record_changes(client.cluster_service_classes(), recorder.clone(), cancel.clone()));
    tasks.spawn(record_changes(client.service_classes(ns), recorder.clone(), cancel.clone()));
    tasks.spawn(record_changes(client.cluster_service_plans(), recorder.clone(), cancel.clone()));
    tasks.spawn(record_changes(client.service_plans(ns), recorder.clone(), cancel.clone()));
    tasks.spawn(record_changes(client.service_instances(ns), recorder.clone(), cancel.clone()));
    tasks.spawn(record_changes(client.service_bindings(ns), recorder, cancel.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    cancel.cancel();
    while let Some(res) = tasks.join_next().await {
        res?;
    }
    Ok(())
}
