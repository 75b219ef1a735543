//! Drift - streaming playback engine, run against a simulated backend

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use drift_cli::simulation::Catalog;
use drift_cli::{follow, DriftConfig, Output, SessionReport, Simulation};
use drift_core::{AudioQuality, CollectionId, LoopMode, Track, TrackId};
use drift_playback::{Player, PlayerHandle};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "drift")]
#[command(about = "Drift streaming playback engine (simulated backend)", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./drift.toml when present)
    #[arg(short, long, global = true, env = "DRIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `drift_playback=trace` (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Print every state snapshot as a JSON line
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play catalog tracks as a queue
    Play {
        /// Track ids to queue (defaults to the whole catalog)
        ids: Vec<String>,
        /// Index of the first track to play
        #[arg(short, long, default_value_t = 0)]
        start: usize,
        /// Shuffle the queue
        #[arg(long)]
        shuffle: bool,
        /// Loop mode: off, one or all
        #[arg(long = "loop")]
        loop_mode: Option<LoopMode>,
        /// Audio quality: low, medium or high
        #[arg(short, long)]
        quality: Option<AudioQuality>,
    },
    /// Start a radio session from a seed track
    Radio {
        /// Seed track id
        seed: String,
        /// Audio quality: low, medium or high
        #[arg(short, long)]
        quality: Option<AudioQuality>,
    },
    /// List the generated catalog
    Catalog,
    /// Print the effective configuration as TOML
    PrintConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so JSON output stays clean
    let filter = match &cli.log_level {
        Some(directives) => tracing_subscriber::EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter: {directives}"))?,
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "drift=info".into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = DriftConfig::load(cli.config.as_deref())?;
    let output = if cli.json { Output::Json } else { Output::Text };

    match cli.command {
        Commands::Play {
            ids,
            start,
            shuffle,
            loop_mode,
            quality,
        } => {
            config.player.shuffle |= shuffle;
            if let Some(mode) = loop_mode {
                config.player.loop_mode = mode;
            }
            if let Some(quality) = quality {
                config.player.audio_quality = quality;
            }
            play(&config, &ids, start, output).await?;
        }
        Commands::Radio { seed, quality } => {
            if let Some(quality) = quality {
                config.player.audio_quality = quality;
            }
            radio(&config, &seed, output).await?;
        }
        Commands::Catalog => {
            list_catalog(&config);
        }
        Commands::PrintConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn play(config: &DriftConfig, ids: &[String], start: usize, output: Output) -> anyhow::Result<()> {
    let sim = Simulation::new(&config.simulation);
    let tracks = if ids.is_empty() {
        sim.catalog.tracks().to_vec()
    } else {
        ids.iter()
            .map(|id| lookup(&sim, id).cloned())
            .collect::<anyhow::Result<Vec<_>>>()?
    };
    if start >= tracks.len() {
        bail!("start index {start} is out of range for {} tracks", tracks.len());
    }

    tracing::info!(tracks = tracks.len(), start, "starting queue");
    let player = start_player(config, &sim);
    player
        .play_queue(tracks, start, Some(CollectionId::new("catalog")))
        .await?;
    run(&player, config, output).await
}

async fn radio(config: &DriftConfig, seed: &str, output: Output) -> anyhow::Result<()> {
    let sim = Simulation::new(&config.simulation);
    let seed = lookup(&sim, seed)?.clone();

    tracing::info!(seed = %seed.id, "starting radio");
    let player = start_player(config, &sim);
    player.play_track(seed, true).await?;
    run(&player, config, output).await
}

fn start_player(config: &DriftConfig, sim: &Simulation) -> PlayerHandle {
    Player::new(
        config.player.clone(),
        sim.resolver.clone(),
        sim.engine.clone(),
        sim.catalog.clone(),
    )
    .start()
}

fn lookup<'a>(sim: &'a Simulation, id: &str) -> anyhow::Result<&'a Track> {
    sim.catalog
        .get(&TrackId::new(id))
        .with_context(|| format!("unknown track id: {id} (see `drift catalog`)"))
}

async fn run(player: &PlayerHandle, config: &DriftConfig, output: Output) -> anyhow::Result<()> {
    let report = tokio::select! {
        report = follow(player, config.simulation.max_tracks, output) => report?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
            SessionReport::default()
        }
    };
    player.shutdown().await?;

    match output {
        Output::Json => println!("{}", serde_json::to_string(&report)?),
        Output::Text => println!(
            "played {} track(s), peak queue length {}, {} failure(s)",
            report.started.len(),
            report.peak_queue_len,
            report.failures
        ),
        Output::Quiet => {}
    }
    Ok(())
}

fn list_catalog(config: &DriftConfig) {
    let catalog = Catalog::generate(config.simulation.seed, config.simulation.catalog_size);
    for track in catalog.tracks() {
        let secs = track.duration().map_or(0, |d| d.as_secs());
        println!(
            "{}  {:<16} {:<22} {}:{:02}  {}",
            track.id,
            track.artist,
            track.title,
            secs / 60,
            secs % 60,
            track.album.as_deref().unwrap_or("-"),
        );
    }
}
