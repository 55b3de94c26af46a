//! Node Autoscaler
//!
//! Watches unschedulable workload demand, arbitrates Azure VM offerings,
//! provisions machines and retires failed attempts into the
//! unavailable-offerings cache. Runs as a long-lived service with a
//! health/metrics/claims HTTP surface.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::Environment;
use domain_instances::handlers::ApiState;
use domain_instances::{ClaimQueue, InstanceService, Reconciler};
use domain_offerings::UnavailableOfferings;
use domain_pricing::{PricingProvider, RetailPriceClient};
use eyre::{eyre, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

mod client;
mod config;
mod instance_types;
mod server;
mod workers;

use client::ArmMachineClient;
use config::Config;
use instance_types::default_sku_catalog;

#[derive(Parser)]
#[command(name = "node-autoscaler")]
#[command(about = "Provision AKS machines for unschedulable workload demand")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the autoscaler service
    Serve,

    /// Look up current prices for a set of SKUs
    Prices {
        /// SKU names to price, e.g. Standard_D2s_v3,Standard_F4s_v2
        #[arg(short, long, value_delimiter = ',')]
        skus: Vec<String>,
    },

    /// Query a running autoscaler for health and cache state
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let environment = Environment::detect();
    init_tracing(&environment);

    let config = Config::from_env().map_err(|e| eyre!("Configuration failed: {}", e))?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Prices { skus } => prices(config, skus).await,
        Commands::Status => status(config).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    observability::init_metrics();

    let arm_token = config
        .arm_token
        .clone()
        .ok_or_else(|| eyre!("AZURE_ARM_TOKEN is required to serve"))?;

    let machine_client = Arc::new(ArmMachineClient::new(
        config.arm_base_url.clone(),
        config.cluster.subscription_id.clone(),
        arm_token,
    ));
    let cache = Arc::new(UnavailableOfferings::new());
    let catalog = Arc::new(default_sku_catalog());
    let pricing = Arc::new(PricingProvider::new(
        Arc::new(RetailPriceClient::new()),
        config.cluster.location.clone(),
        config.pricing.public_cloud,
        config.pricing.refresh_interval,
    ));

    let service = Arc::new(InstanceService::new(
        machine_client,
        config.cluster_identity(),
        Arc::clone(&cache),
        Arc::clone(&catalog),
        config.domain_poller_config(),
    ));
    let reconciler = Arc::new(Reconciler::new(service, config.reconciler.claim_timeout));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (queue, claims) = ClaimQueue::new(config.claim_queue_capacity);

    tokio::spawn(Arc::clone(&pricing).run_refresher(shutdown_rx.clone()));
    tokio::spawn(workers::run_status_publisher(
        Arc::clone(&cache),
        Arc::clone(&pricing),
        shutdown_rx.clone(),
    ));

    let worker_ctx = workers::WorkerContext {
        reconciler,
        pricing: Arc::clone(&pricing),
        cache: Arc::clone(&cache),
        catalog,
        zones: config.zones(),
        shutdown: shutdown_rx.clone(),
    };
    let worker_handle = tokio::spawn(workers::run_reconcile_workers(
        worker_ctx,
        claims,
        config.reconcile_workers,
    ));

    let router = server::build_router(
        server::HealthState {
            cache: Arc::clone(&cache),
            pricing,
        },
        ApiState { queue, cache },
    );

    let addr = config.probe.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, workers = config.reconcile_workers, "Node autoscaler serving");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_on_ctrl_c(shutdown_tx))
        .await?;

    worker_handle.await?;
    info!("Node autoscaler stopped");
    Ok(())
}

async fn shutdown_on_ctrl_c(shutdown_tx: watch::Sender<bool>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
    let _ = shutdown_tx.send(true);
}

async fn prices(config: Config, skus: Vec<String>) -> Result<()> {
    let pricing = PricingProvider::new(
        Arc::new(RetailPriceClient::new()),
        config.cluster.location.clone(),
        config.pricing.public_cloud,
        config.pricing.refresh_interval,
    );

    if let Err(e) = pricing.refresh().await {
        info!(error = %e, "Live refresh failed, serving compiled-in prices");
    }

    let rows: Vec<_> = skus
        .iter()
        .map(|sku| {
            serde_json::json!({
                "sku": sku,
                "region": pricing.region(),
                "on_demand": pricing.on_demand_price(sku),
                "spot": pricing.spot_price(sku),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

async fn status(config: Config) -> Result<()> {
    let base = format!("http://127.0.0.1:{}", config.probe.port);
    let http = reqwest::Client::new();

    let health: serde_json::Value = http
        .get(format!("{base}/healthz"))
        .send()
        .await?
        .json()
        .await?;
    let unavailable: serde_json::Value = http
        .get(format!("{base}/v1/offerings/unavailable"))
        .send()
        .await?
        .json()
        .await?;

    let status = serde_json::json!({
        "health": health,
        "unavailable_offerings": unavailable,
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
