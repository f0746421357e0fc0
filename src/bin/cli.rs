//! Geofencing CLI
//!
//! Runs place searches, route replays and track replays against monitored
//! regions and writes the resulting visits and overlays to an output directory.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use geofencing::{
    error::Result,
    models::{Config, Coordinate},
    pipeline::{self, Session},
    services::ReplayOptions,
    storage::{LocalStorage, SessionStorage},
    utils,
};

/// Geofence place visits from search, isochrones and route replay
#[derive(Parser, Debug)]
#[command(name = "geofencing", version, about = "Geofenced place visits")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Directory for visits, regions and overlays
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Replay speed in metres per second (default from config)
    #[arg(long)]
    speed: Option<f64>,

    /// Pace samples in real time instead of replaying instantly
    #[arg(long)]
    realtime: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Free-text place search with isochrone regions
    Search {
        query: String,

        /// Search centre as "lon,lat" (default from config)
        #[arg(long, allow_hyphen_values = true)]
        at: Option<Coordinate>,

        /// Icon name for result markers
        #[arg(long, default_value = "seveneleven")]
        icon: String,
    },

    /// Category search filtered by brand name
    Discover {
        category: String,

        /// Brand name results must start with
        #[arg(long)]
        name: String,

        /// Search centre as "lon,lat" (default from config)
        #[arg(long, allow_hyphen_values = true)]
        at: Option<Coordinate>,

        #[arg(long, default_value = "starbucks")]
        icon: String,
    },

    /// Fetch a walking route and replay it through monitored regions
    Route {
        #[arg(long, allow_hyphen_values = true)]
        from: Coordinate,

        #[arg(long, allow_hyphen_values = true)]
        to: Coordinate,

        /// Regions GeoJSON to monitor (default: {output_dir}/regions.geojson)
        #[arg(long)]
        regions: Option<PathBuf>,

        #[command(flatten)]
        replay: ReplayArgs,
    },

    /// Replay a recorded track GeoJSON against a regions GeoJSON
    Replay {
        /// GeoJSON with a LineString track
        #[arg(long)]
        track: PathBuf,

        /// Regions GeoJSON (default: {output_dir}/regions.geojson)
        #[arg(long)]
        regions: Option<PathBuf>,

        #[command(flatten)]
        replay: ReplayArgs,
    },

    /// Validate the configuration file
    Validate,

    /// Show saved session info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn replay_options(session: &Session, args: &ReplayArgs) -> ReplayOptions {
    let mut options = session.replay_options();
    if let Some(speed) = args.speed {
        options.speed_mps = speed;
    }
    options.realtime = args.realtime;
    options
}

/// Regions from an explicit file, else from the last saved session.
async fn monitored_regions(
    path: Option<PathBuf>,
    storage: &LocalStorage,
) -> Result<Vec<geofencing::models::Region>> {
    match path {
        Some(path) => pipeline::load_regions(path).await,
        None => storage.load_regions().await,
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Command::Validate = cli.command {
        pipeline::run_validate(&cli.config)?;
        return Ok(());
    }

    let config = Config::load_or_default(&cli.config);
    config.validate()?;
    utils::log::init(if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    });
    log::info!("Loaded configuration from {}", cli.config.display());

    let storage = LocalStorage::new(&cli.output_dir);
    let default_at = config.location.default_coordinate();
    let session = Session::from_config(config)?;

    match cli.command {
        Command::Search { query, at, icon } => {
            let at = at.unwrap_or(default_at);
            pipeline::run_search(&session, &storage, &query, &icon, at).await?;
        }

        Command::Discover {
            category,
            name,
            at,
            icon,
        } => {
            let at = at.unwrap_or(default_at);
            pipeline::run_discover(&session, &storage, &category, &name, &icon, at).await?;
        }

        Command::Route {
            from,
            to,
            regions: path,
            replay,
        } => {
            let regions = monitored_regions(path, &storage).await?;
            let options = replay_options(&session, &replay);
            pipeline::run_route(&session, &storage, from, to, regions, options).await?;
        }

        Command::Replay {
            track,
            regions: path,
            replay,
        } => {
            let regions = monitored_regions(path, &storage).await?;
            let track = pipeline::load_track(&track).await?;
            let options = replay_options(&session, &replay);
            pipeline::run_replay(&session, &storage, regions, &track, options).await?;
        }

        Command::Info => {
            log::info!("Output directory: {}", cli.output_dir.display());
            match storage.load_snapshot().await? {
                Some(snapshot) => {
                    log::info!("Last saved: {}", snapshot.updated_at);
                    log::info!("Visits: {}", snapshot.count);
                    for visit in &snapshot.visits {
                        log::info!(
                            "  {}",
                            visit.format("{title} ({id}) in {entered} out {exited}")
                        );
                    }
                }
                None => log::info!("No session saved yet."),
            }
            log::info!("Regions: {}", storage.load_regions().await?.len());
        }

        Command::Validate => {}
    }

    session.shutdown();
    log::info!("Done!");

    Ok(())
}
