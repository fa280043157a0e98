//! Runs the broker catalog controllers and the instance reference resolver.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use kubernetes_service_catalog::apis::{parse_duration, ClusterServiceBroker, ServiceBroker};
use kubernetes_service_catalog::client::{CatalogClient, Informers};
use kubernetes_service_catalog::controller::{
    run_broker_controller, run_instance_controller, Context,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Only reconcile namespaced catalog objects of this namespace.
    #[arg(long, env = "WATCH_NAMESPACE")]
    watch_namespace: Option<String>,

    /// How long a failing broker relist is retried before the broker is marked Failed.
    #[arg(long, env = "RECONCILIATION_RETRY_DURATION", default_value = "168h", value_parser = parse_duration)]
    reconciliation_retry_duration: Duration,

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

    let client = CatalogClient::new(kube::Client::try_default().await?);
    let cancel = CancellationToken::new();
    let informers = Informers::start(&client, args.watch_namespace.as_deref(), cancel.clone());
    let ctx = Arc::new(Context {
        client,
        informers,
        retry_duration: args.reconciliation_retry_duration,
    });
    info!(
        retry = %humantime::format_duration(args.reconciliation_retry_duration),
        "Starting controller manager"
    );

    let ns = args.watch_namespace;
    let mut tasks = JoinSet::new();
    tasks.spawn(run_broker_controller::<ClusterServiceBroker>(ctx.clone(), None, cancel.clone()));
    tasks.spawn(run_broker_controller::<ServiceBroker>(ctx.clone(), ns.clone(), cancel.clone()));
    tasks.spawn(run_instance_controller(ctx, ns, cancel.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    cancel.cancel();
    while let Some(res) = tasks.join_next().await {
        res?;
    }
    Ok(())
}
