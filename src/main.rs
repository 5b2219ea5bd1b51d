//! Binary entrypoint for the chroma booth.
//!
//! Plays a looped still (or synthetic) track through the compositing
//! pipeline for a while and writes the final canvas to a PNG.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chroma_booth::compositor::Compositor;
use chroma_booth::config::Configuration;
use chroma_booth::events::{CompositorCommand, PipelineEvent};
use chroma_booth::render::canvas::CanvasPresenter;
use chroma_booth::schedule::QualityProfile;
use chroma_booth::source::{StaticTrackProvider, TrackId, test_pattern};
use chroma_booth::tasks::pipeline;
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "chroma-booth", version, about = "Real-time chroma-key compositor")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Frames for the camera track (played in a loop); synthetic when empty
    #[arg(short, long = "input", value_name = "IMAGE")]
    inputs: Vec<PathBuf>,

    /// Override the quality profile (high, good, low)
    #[arg(short, long, value_name = "PROFILE")]
    quality: Option<QualityProfile>,

    /// Start with the chroma key switched off
    #[arg(long)]
    no_key: bool,

    /// How long to run the pipeline
    #[arg(long, value_name = "DURATION", default_value = "2s", value_parser = humantime::parse_duration)]
    duration: Duration,

    /// Where to write the final canvas
    #[arg(short, long, value_name = "FILE", default_value = "composite.png")]
    output: PathBuf,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("chroma_booth={}", level).parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(quality) = cli.quality {
        cfg.quality = quality;
    }
    if cli.no_key {
        cfg.chroma_key.enabled = false;
    }
    let cfg = cfg.validated().context("validating configuration")?;

    let track = TrackId::new("camera");
    let mut provider = StaticTrackProvider::new();
    if cli.inputs.is_empty() {
        provider.insert(
            track.clone(),
            vec![test_pattern(cfg.surface.width, cfg.surface.height)],
        );
    } else {
        provider
            .insert_files(track.clone(), &cli.inputs)
            .context("loading input frames")?;
    }

    let mut compositor = Compositor::new(&cfg, Instant::now());
    compositor
        .attach(&mut provider, track, Instant::now())
        .context("starting compositor")?;

    let presenter = CanvasPresenter::new(cfg.surface.width, cfg.surface.height, [24, 24, 24, 255]);
    let (_control_tx, control_rx) = mpsc::channel::<CompositorCommand>(16);
    let (events_tx, mut events_rx) = mpsc::channel::<PipelineEvent>(64);
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(pipeline::run(
        compositor,
        provider,
        presenter,
        control_rx,
        events_tx,
        cancel.clone(),
        cfg.driver_interval,
    ));

    let deadline = tokio::time::sleep(cli.duration);
    tokio::pin!(deadline);
    let mut frames = 0u64;
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted; shutting down");
                break;
            }
            Some(event) = events_rx.recv() => match event {
                PipelineEvent::Presented { .. } => frames += 1,
                PipelineEvent::AttachFailed { track, reason } => warn!(%track, %reason, "attach failed"),
                PipelineEvent::Detached(_) => {}
            },
        }
    }
    cancel.cancel();

    let presenter = handle.await.context("pipeline task panicked")??;
    presenter
        .canvas()
        .save(&cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    info!(frames, output = %cli.output.display(), "composite written");
    Ok(())
}
