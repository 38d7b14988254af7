use anyhow::{Context, Result};
use clap::Parser;
use playlist_composer::config::{AppConfig, CliConfig, FileConfig};
use playlist_composer::llm::{DisabledProvider, LlmProvider, OpenAIProvider};
use playlist_composer::playlist::{PlaylistAssembler, PlaylistResponse, RequestContext};
use playlist_composer::services::{
    CachedGenreLookup, CatalogLookup, FileSnapshotProvider, GenreLookup, LastFmClient,
    SimilarityService, Unavailable,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(version = env!("PLAYLIST_COMPOSER_VERSION"))]
struct CliArgs {
    /// The playlist request, e.g. "45 minute upbeat workout mix".
    pub query: String,

    /// Identifies whose listening-history snapshot to load.
    #[clap(long, default_value = "default")]
    pub credential: String,

    /// Include the reasoning trace in the output.
    #[clap(long)]
    pub explain: bool,

    /// Path to a TOML config file. Values there override CLI flags.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Directory holding `<credential>.json` snapshots.
    #[clap(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Base URL of an OpenAI-compatible completion API.
    #[clap(long)]
    pub llm_base_url: Option<String>,

    /// Completion model name.
    #[clap(long)]
    pub llm_model: Option<String>,

    /// Run on heuristics alone, without a completion backend.
    #[clap(long)]
    pub no_llm: bool,

    /// Last.fm API key for similarity, genre and artwork lookups.
    #[clap(long)]
    pub lastfm_api_key: Option<String>,

    /// Also print the resolved constraints, the pipeline states and the timed trace steps.
    #[clap(long)]
    pub debug_run: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            snapshot_dir: self.snapshot_dir.clone(),
            llm_base_url: self.llm_base_url.clone(),
            llm_model: self.llm_model.clone(),
            lastfm_api_key: self.lastfm_api_key.clone(),
            disable_llm: self.no_llm,
        }
    }
}

fn build_assembler(config: &AppConfig) -> Result<PlaylistAssembler> {
    let llm: Arc<dyn LlmProvider> = match &config.llm {
        Some(llm) => {
            info!("Using completion model {} at {}", llm.model, llm.base_url);
            Arc::new(OpenAIProvider::new(
                llm.base_url.clone(),
                llm.model.clone(),
                llm.api_key.clone(),
            ))
        }
        None => {
            warn!("No completion backend configured, running on heuristics only");
            Arc::new(DisabledProvider)
        }
    };

    let (similarity, genres, catalog): (
        Arc<dyn SimilarityService>,
        Arc<dyn GenreLookup>,
        Arc<dyn CatalogLookup>,
    ) = match &config.lastfm {
        Some(lastfm) => {
            let client = Arc::new(
                LastFmClient::new(&lastfm.api_key, lastfm.requests_per_second)
                    .context("Failed to create Last.fm client")?,
            );
            let similarity: Arc<dyn SimilarityService> = client.clone();
            let catalog: Arc<dyn CatalogLookup> = client.clone();
            let genres: Arc<dyn GenreLookup> = Arc::new(CachedGenreLookup::new(
                client,
                config.pipeline.genre_cache_ttl,
            ));
            (similarity, genres, catalog)
        }
        None => {
            warn!("Last.fm not configured, similarity and catalog lookups are unavailable");
            let similarity: Arc<dyn SimilarityService> = Arc::new(Unavailable("similarity"));
            let genres: Arc<dyn GenreLookup> = Arc::new(Unavailable("genres"));
            let catalog: Arc<dyn CatalogLookup> = Arc::new(Unavailable("catalog"));
            (similarity, genres, catalog)
        }
    };

    info!("Reading snapshots from {:?}", config.snapshot_dir);
    let snapshots = Arc::new(FileSnapshotProvider::new(config.snapshot_dir.clone()));

    Ok(PlaylistAssembler::new(
        llm,
        similarity,
        genres,
        snapshots,
        config.pipeline.clone(),
    )
    .with_catalog(catalog))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    let assembler = build_assembler(&config)?;

    if cli_args.debug_run {
        // Always trace; the printed response still honors --explain.
        let ctx = RequestContext::new(cli_args.credential.as_str(), true);
        match assembler.run(&cli_args.query, &ctx).await {
            Ok(run) => {
                println!("{}", run.constraints.summary());
                println!("branch: {:?}", run.branch);
                println!("states: {:?}", run.states);
                let started = run.steps.first().map_or(0, |s| s.timestamp);
                for step in &run.steps {
                    println!("{:>6}ms {}", step.timestamp - started, step);
                }
                let mut result = run.result;
                if !cli_args.explain {
                    result.reasoning_trace = None;
                }
                let response = PlaylistResponse::from(result);
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
            Err(e) => println!("error: {}", e),
        }
        return Ok(());
    }

    let response = assembler
        .generate_playlist(&cli_args.query, &cli_args.credential, cli_args.explain)
        .await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
