use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use contact_map::app::build_pipeline;
use contact_map::app::session::{ContactSession, SessionState};
use contact_map::config::Config;
use contact_map::error::ContactMapError;
use contact_map::infra::{HubSpotClient, NominatimGeocoder};
use contact_map::pipeline::{FilterCriteria, PipelineEvent};
use contact_map::server::{create_server, render_view, start_server, AppState};
use contact_map::{logging, metrics};

#[derive(Parser)]
#[command(name = "contact_map")]
#[command(about = "HubSpot contacts proxy with geocoding enrichment")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HubSpot proxy and the enriched contact view
    Serve {
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Fetch and enrich contacts once, then print the filtered view as JSON
    Enrich {
        /// Roles to keep (comma-separated)
        #[arg(long)]
        roles: Option<String>,
        /// Case-insensitive address substring
        #[arg(long)]
        location: Option<String>,
        /// Write the view to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Seed for placeholder roles and fallback jitter
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    info!("Loaded configuration: {:?}", config);

    let hubspot = Arc::new(HubSpotClient::new(&config.hubspot)?);
    let geocoder = Arc::new(NominatimGeocoder::new(&config.geocoder)?);

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            let metrics = metrics::init_metrics();
            let pipeline = build_pipeline(&config, hubspot.clone(), geocoder, None);
            let session = ContactSession::start(Arc::new(pipeline));
            session.refresh();

            let state = Arc::new(AppState { hubspot, session, metrics });
            let app = create_server(state, &config.server.allowed_origin)?;
            start_server(app, config.server.port).await?;
        }
        Commands::Enrich { roles, location, output, seed } => {
            let pipeline = Arc::new(build_pipeline(&config, hubspot, geocoder, seed));
            let criteria = FilterCriteria::from_parts(roles.as_deref(), location.as_deref());
            let state = run_once(pipeline).await;

            if let Some(err) = &state.error {
                error!("❌ Enrichment failed: {}", err);
                return Err(ContactMapError::Fetch(err.clone()).into());
            }

            let view = serde_json::to_string_pretty(&render_view(&state, &criteria)?)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, view)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!("Wrote contact view to {}", path.display());
                }
                None => println!("{view}"),
            }
        }
    }
    Ok(())
}

/// Run a single pipeline pass, folding its events into a session state
async fn run_once(pipeline: Arc<contact_map::pipeline::EnrichmentPipeline>) -> SessionState {
    const RUN_ID: u64 = 1;
    let (tx, mut rx) = mpsc::channel(16);
    let task = tokio::spawn(async move { pipeline.run(RUN_ID, tx).await });

    let mut state = SessionState::idle();
    state.begin(RUN_ID);
    while let Some(event) = rx.recv().await {
        if let PipelineEvent::Snapshot { contacts, .. } = &event {
            info!("📍 {} of {} contacts placed", contacts.len(), state.total.unwrap_or_default());
        }
        state.apply(event);
    }

    match task.await {
        Ok(summary) => info!(
            "Run finished: {} resolved, {} fallback",
            summary.resolved, summary.fallback
        ),
        Err(e) => error!("Pipeline task failed: {}", e),
    }
    state
}
