//! biohub-regions - Region Resolution microservice
//!
//! Resolves survey/project geometries to the administrative and ecological
//! regions they fall within.

use anyhow::{Context, Result};
use biohub_common::config::{load_config, resolve_config_path, CONFIG_ENV_VAR};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use biohub_regions::services::{
    FeatureServiceClient, LayerExtractor, PgSpatialDatabase, RegionCrossReference, RegionResolver,
};
use biohub_regions::{build_router, AppState};

/// Command-line arguments for biohub-regions
#[derive(Parser, Debug)]
#[command(name = "biohub-regions")]
#[command(about = "Region resolution microservice for BioHub")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Postgres connection string (overrides config file)
    #[arg(long, env = "BIOHUB_DATABASE_URL")]
    database_url: Option<String>,

    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "BIOHUB_REGIONS_PORT")]
    port: Option<u16>,

    /// Feature service base URL (overrides config file)
    #[arg(long, env = "BIOHUB_WFS_URL")]
    wfs_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let mut config = load_config(config_path.as_deref())?;

    biohub_common::logging::init_tracing(&config.logging)?;

    // Build identification first, before any network or database delay
    info!(
        "Starting BioHub Region Resolution (biohub-regions) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(url) = args.wfs_url {
        config.feature_service.base_url = url;
    }
    let database_url = args
        .database_url
        .or(config.database_url.clone())
        .context("No database_url configured (use --database-url, BIOHUB_DATABASE_URL or the config file)")?;

    let pool = biohub_common::db::connect_pool(&database_url, &config.database).await?;

    let cross_reference = match &config.cross_reference_path {
        Some(path) => RegionCrossReference::load(path)
            .with_context(|| format!("Failed to load cross-reference table {}", path.display()))?,
        None => RegionCrossReference::builtin(),
    };
    info!(entries = cross_reference.len(), "Region cross-reference table ready");

    let client = FeatureServiceClient::http(
        &config.feature_service.base_url,
        config.feature_service.timeout(),
    )?;
    info!("Feature service: {}", client.base_url());

    let resolver = RegionResolver::new(
        Arc::new(PgSpatialDatabase::new(pool.clone())),
        LayerExtractor::for_all_layers(&client),
        Arc::new(cross_reference),
        config.feature_service.max_concurrent_requests,
    );

    let state = AppState::new(pool, Arc::new(resolver));
    let app = build_router(state);

    let address = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Listening on http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app).await?;

    Ok(())
}
