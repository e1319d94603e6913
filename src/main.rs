mod call;
mod commands;
mod config;
mod discover;
mod error;
mod probe;
mod tools;
mod work;

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use bytesize::ByteSize;
use clap::{ArgAction, Parser};
use tokio::task::spawn_blocking;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::{
    call::call,
    commands::{transcode_job, Job},
    config::{Config, Preset, ProxySize},
    discover::discover,
    error::Error,
    tools::Tools,
    work::{make_dirs, work_items},
};

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Generate Blender proxies for the videos and images under a directory.
#[derive(Parser, Debug)]
#[command(name = "bpsproxy", version)]
struct Args {
    /// Directory to scan for media.
    #[arg(default_value = ".")]
    working_directory: PathBuf,

    /// Encoder preset for video proxies.
    #[arg(short, long, value_enum, default_value_t = Preset::Mp4, env = "BPSPROXY_PRESET")]
    preset: Preset,

    /// Proxy sizes to generate, in percent of the source.
    #[arg(short, long, value_enum, num_args = 1.., default_values_t = [ProxySize::Quarter])]
    sizes: Vec<ProxySize>,

    /// Increase verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Log every planned action without touching the filesystem or running anything.
    #[arg(long)]
    dry_run: bool,

    /// ffmpeg program name or path.
    #[arg(long, env = "BPSPROXY_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: String,

    /// ffprobe program name or path.
    #[arg(long, env = "BPSPROXY_FFPROBE", default_value = "ffprobe")]
    ffprobe: String,
}

impl Args {
    fn level(&self) -> LevelFilter {
        match (self.dry_run, self.verbose) {
            (true, _) | (_, 2..) => LevelFilter::DEBUG,
            (false, 1) => LevelFilter::INFO,
            (false, _) => LevelFilter::WARN,
        }
    }

    fn sizes(&self) -> Vec<ProxySize> {
        let mut sizes = self.sizes.clone();
        sizes.sort();
        sizes.dedup();
        sizes
    }
}

fn init_tracing(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let indicatif_layer = IndicatifLayer::new();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(indicatif_layer.get_stderr_writer())
                .with_filter(filter),
        )
        .with(indicatif_layer)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    human_panic::setup_panic!();

    let args = Args::parse();
    init_tracing(args.level());
    let cfg = Config::default();

    tokio::select! {
        res = run(&cfg, &args) => match res {
            Ok(()) => Ok(ExitCode::SUCCESS),
            Err(e) => match e.downcast_ref::<Error>() {
                Some(e @ (Error::ToolsMissing(_) | Error::InvalidDirectory(_))) => {
                    error!("{e}");
                    Ok(ExitCode::FAILURE)
                }
                _ => Err(e),
            },
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, exiting");
            Ok(ExitCode::from(130))
        }
    }
}

/// Expands `~` and environment variables, then resolves to an absolute directory.
async fn resolve_dir(dir: &Path) -> Result<PathBuf> {
    let expanded = shellexpand::path::full(dir)
        .with_context(|| format!("expand '{}'", dir.display()))?;
    match tokio::fs::canonicalize(&expanded).await {
        Ok(dir) if dir.is_dir() => Ok(dir),
        _ => Err(Error::InvalidDirectory(expanded.into_owned()).into()),
    }
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Runs the whole pipeline once.
///
/// ```mermaid
/// stateDiagram-v2
///     [*] --> locate_tools
///     locate_tools --> discover
///     locate_tools --> [*]: tools missing
///     discover --> probe
///     discover --> [*]: invalid directory / nothing found
///     probe --> make_dirs
///     probe --> [*]: all up to date
///     make_dirs --> transcode
///     transcode --> [*]
/// ```
async fn run(cfg: &Config, args: &Args) -> Result<()> {
    let start = Instant::now();

    let tools = Tools::locate(&args.ffmpeg, &args.ffprobe)?;
    let root = resolve_dir(&args.working_directory).await?;
    let sizes = args.sizes();
    info!(
        preset = %args.preset,
        sizes = ?sizes.iter().map(|s| s.percent()).collect::<Vec<_>>(),
        dry_run = args.dry_run,
        "Processing '{}'",
        root.display()
    );

    info!("Discovering files to process...");
    let proxy_dir = cfg.proxy_dir;
    let extensions: Vec<&'static str> = cfg.extensions().collect();
    let (files, total) = spawn_blocking(move || {
        let files = discover(&root, proxy_dir, &extensions)?;
        let total: u64 = files
            .iter()
            .filter_map(|p| p.metadata().ok())
            .map(|md| md.len())
            .sum();
        anyhow::Ok((files, total))
    })
    .await??;
    info!("Found {} media files ({})", files.len(), ByteSize(total));

    let items = work_items(cfg, files);
    if items.is_empty() {
        info!("{} No media found, nothing to process", cfg.glyphs.skip);
        return Ok(());
    }

    let items = probe::stale(cfg, &tools, items, &sizes, args.dry_run).await;
    if items.is_empty() {
        info!("{} All proxies are up to date, nothing to process", cfg.glyphs.skip);
        return Ok(());
    }
    info!("{} {} files need proxies", cfg.glyphs.work, items.len());

    make_dirs(cfg, &items, &sizes, args.dry_run).await?;

    let jobs: Vec<Job> = items
        .iter()
        .map(|item| transcode_job(cfg, &tools, args.preset, &sizes, item))
        .collect();
    call(&jobs, args.dry_run, true).await?;

    let elapsed = Duration::from_millis(start.elapsed().as_millis() as u64);
    info!("{} Done in {}", cfg.glyphs.done, humantime::format_duration(elapsed));
    Ok(())
}
