use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use itertools::Itertools;
use kubernetes_service_catalog::admission::{
    plugins, AdmissionError, KubeAccessReviewer, PluginContext, Plugins,
};
use kubernetes_service_catalog::client::{CatalogClient, Informers};
use kubernetes_service_catalog::registry::Registry;
use kubernetes_service_catalog::webhook::{self, WebhookState};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Admission webhook for the service catalog resources.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[arg(long, env = "TLS_CERT_PATH", default_value = "./kubernetes-service-catalog.crt")]
    tls_cert_path: String,

    #[arg(long, env = "TLS_KEY_PATH", default_value = "./kubernetes-service-catalog.key")]
    tls_key_path: String,

    #[arg(long, env = "PORT", default_value_t = 8443)]
    port: u16,

    /// Comma separated admission plugins, run in the given order. All built-in plugins when unset.
    #[arg(long, env = "ADMISSION_PLUGINS", value_delimiter = ',')]
    admission_plugins: Vec<String>,

    /// Only cache namespaced catalog objects of this namespace.
    #[arg(long, env = "WATCH_NAMESPACE")]
    watch_namespace: Option<String>,

    /// Log as JSON lines.
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.log_json);

    if let Err(e) = run(args).await {
        error!("Setup failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn run(args: Args) -> Result<(), SetupError> {
    let provider = rustls::crypto::ring::default_provider();
    rustls::crypto::CryptoProvider::install_default(provider)
        .map_err(|_| SetupError::CryptoProviderFailed)?;

    let tls_config = RustlsConfig::from_pem_file(&args.tls_cert_path, &args.tls_key_path)
        .await
        .map_err(|error| SetupError::TLSConfigFailed {
            cert_path: args.tls_cert_path.clone(),
            key_path: args.tls_key_path.clone(),
            error,
        })?;

    let kube_client = kube::Client::try_default().await?;
    let cancel = CancellationToken::new();

    let informers = Informers::start(
        &CatalogClient::new(kube_client.clone()),
        args.watch_namespace.as_deref(),
        cancel.clone(),
    );
    let ctx = PluginContext {
        informers: informers.clone(),
        access_reviewer: Arc::new(KubeAccessReviewer::new(kube_client)),
    };

    let mut registered = Plugins::new();
    plugins::register_all(&mut registered)?;
    let names = match args.admission_plugins.as_slice() {
        [] => plugins::default_plugins(),
        names => names.iter().map(|n| n.trim().to_string()).filter(|n| !n.is_empty()).collect(),
    };
    let chain = registered.new_chain(&names, &ctx).map_err(|e| match e {
        AdmissionError::UnknownPlugin(name) => SetupError::UnknownPlugin {
            name,
            known: registered.registered().iter().join(", "),
        },
        e => SetupError::Admission(e),
    })?;

    let app = webhook::router(WebhookState::new(Registry::new(), chain, Some(informers)));

    let handle = axum_server::Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
            cancel.cancel();
            shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting TLS server on {}", addr);
    axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(SetupError::BindFailed)
}

#[derive(thiserror::Error, Debug)]
enum SetupError {
    #[error(r#"Failed to load TLS config (cert: {cert_path}, key: {key_path}): {error}"#)]
    TLSConfigFailed {
        cert_path: String,
        key_path: String,
        error: std::io::Error,
    },
    #[error("Failed to bind to address: {0}")]
    BindFailed(std::io::Error),
    #[error("Failed to install crypto provider")]
    CryptoProviderFailed,
    #[error("Failed to create Kubernetes client: {0}")]
    KubernetesClientFailed(#[from] kube::Error),
    #[error("Unknown admission plugin {name}, known plugins: {known}")]
    UnknownPlugin { name: String, known: String },
    #[error("Failed to set up admission plugins: {0}")]
    Admission(#[from] AdmissionError),
}
