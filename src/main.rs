mod config;
mod error;
mod ffmpeg;
mod queue;
mod scan;
mod utils;

use anyhow::{Context, Result, bail};
use clap::Parser;
use config::{AppConfig, EncodingProfile, QualityPreset};
use error::AppError;
use ffmpeg::{AudioFilter, FilterCapability, RetimeParams};
use queue::{Job, JobEvent, JobStatus, WorkerPool};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Convert 2x-speed recordings back to natural 1x playback in batch.
#[derive(Parser, Debug)]
#[command(name = "slowback", version, about)]
struct Cli {
    /// Files or directories to convert; directories are scanned recursively
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory; each input directory's hierarchy is mirrored
    /// beneath it. Defaults to writing next to the sources with a suffix.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Concurrent conversions (default: processing units minus one)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Replace existing destination files instead of disambiguating
    #[arg(long)]
    overwrite: bool,

    /// Quality preset
    #[arg(long, value_enum)]
    preset: Option<QualityPreset>,

    /// Video encoder passed to -c:v (libx264, h264_nvenc, h264_qsv,
    /// h264_videotoolbox)
    #[arg(long)]
    encoder: Option<String>,

    /// CRF override for the video encoder
    #[arg(long)]
    crf: Option<u8>,

    /// Audio bitrate in kbps
    #[arg(long)]
    audio_bitrate: Option<u32>,

    /// Do not copy subtitle streams
    #[arg(long)]
    no_subtitles: bool,

    /// Encode only a centered preview window of each file
    #[arg(long)]
    preview: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_log = utils::init_session_log();
    if let Some((_, path)) = &session_log {
        eprintln!("session log: {}", path.display());
    }

    let mut config = AppConfig::load();
    apply_cli_overrides(&mut config, &cli);
    config.validate().context("invalid configuration")?;

    // Tool resolution is session-fatal; the error text carries the
    // remediation (env override or install).
    let ffmpeg_bin = ffmpeg::which_ffmpeg(config.ffmpeg_path.as_deref())?;
    let ffprobe_bin = ffmpeg::which_ffprobe(config.ffprobe_path.as_deref())?;
    info!("using ffmpeg at {}", ffmpeg_bin.display());

    // Probed once; every command built this session reads the result.
    let capability = ffmpeg::detect_rubberband(&ffmpeg_bin);
    match capability {
        FilterCapability::Available => {}
        FilterCapability::Absent => {
            eprintln!("Rubber Band filter unavailable; falling back to atempo.");
        }
        FilterCapability::Unknown => {
            eprintln!("Could not check for the Rubber Band filter; using atempo.");
        }
    }
    let audio_filter = AudioFilter::from_capability(capability);

    let (events_tx, events_rx) = mpsc::channel();
    let mut pool = WorkerPool::new(config.effective_concurrency(), events_tx);
    let preview = cli.preview.then_some(config.preview_seconds);

    let mut probe_failures = 0usize;
    for input in &cli.inputs {
        let input_root = input.is_dir().then_some(input.as_path());
        for file in scan::discover_media(input) {
            match prepare_job(
                &ffmpeg_bin,
                &ffprobe_bin,
                &file,
                input_root,
                cli.output.as_deref(),
                &config,
                audio_filter,
                preview,
            ) {
                Ok(job) => {
                    pool.enqueue(job);
                }
                Err(e) => {
                    warn!("skipping {}: {}", file.display(), e);
                    eprintln!("skipping {}: {}", file.display(), e);
                    probe_failures += 1;
                }
            }
        }
    }

    if pool.registry().jobs().is_empty() {
        bail!("no convertible media files found");
    }

    let total = pool.registry().jobs().len();
    println!(
        "{} job(s), {} concurrent worker(s)",
        total,
        config.effective_concurrency()
    );

    let started = Instant::now();
    let mut last_status_line = Instant::now();

    while !pool.is_idle() {
        pool.pump(Duration::from_millis(100));

        for event in events_rx.try_iter() {
            render_event(&event, &pool);
        }

        if last_status_line.elapsed() >= Duration::from_secs(2) {
            print_running_line(&pool);
            last_status_line = Instant::now();
        }
    }
    for event in events_rx.try_iter() {
        render_event(&event, &pool);
    }

    print_summary(&pool, started.elapsed(), probe_failures);

    let summary = pool.registry().summary();
    if summary.failed > 0 || probe_failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn apply_cli_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(preset) = cli.preset {
        config.profile = EncodingProfile::from_preset(preset);
    }
    if let Some(jobs) = cli.jobs {
        config.concurrent_jobs = jobs;
    }
    if cli.overwrite {
        config.overwrite = true;
    }
    if let Some(encoder) = &cli.encoder {
        config.profile.video_encoder = encoder.clone();
    }
    if let Some(crf) = cli.crf {
        config.profile.video_crf = crf;
    }
    if let Some(bitrate) = cli.audio_bitrate {
        config.profile.audio_bitrate_kbps = bitrate;
    }
    if cli.no_subtitles {
        config.profile.copy_subtitles = false;
    }
}

/// Probe one file and turn it into a launchable job: derive and
/// deduplicate the destination, then fix the full command line.
#[allow(clippy::too_many_arguments)]
fn prepare_job(
    ffmpeg_bin: &Path,
    ffprobe_bin: &Path,
    file: &Path,
    input_root: Option<&Path>,
    output_root: Option<&Path>,
    config: &AppConfig,
    audio_filter: AudioFilter,
    preview_seconds: Option<u32>,
) -> Result<Job, AppError> {
    let media = ffmpeg::probe_media(ffprobe_bin, file)?;

    let mapped = scan::derive_output_path(file, input_root, output_root, &config.output_suffix);
    if let Some(parent) = mapped.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dest = scan::resolve_collision(&mapped, &config.output_suffix, config.overwrite);

    let args = ffmpeg::build_retime_args(&RetimeParams {
        input: file,
        output: &dest,
        media: &media,
        profile: &config.profile,
        audio_filter,
        preview_seconds,
    })?;

    let mut command = Vec::with_capacity(args.len() + 1);
    command.push(ffmpeg_bin.to_string_lossy().into_owned());
    command.extend(args);

    Ok(Job::new(file.to_path_buf(), dest, media.duration_secs, command))
}

fn render_event(event: &JobEvent, pool: &WorkerPool) {
    let JobEvent::StatusChanged { id, status } = event else {
        // Progress is rendered periodically; diagnostics already go to the
        // session log.
        return;
    };
    let Some(job) = pool.registry().get(*id) else {
        return;
    };

    match status {
        JobStatus::Completed => println!("done     {} -> {}", job.filename(), job.dest.display()),
        JobStatus::Failed { reason } => {
            let first = reason.lines().next().unwrap_or("unknown error");
            println!("failed   {}: {}", job.filename(), first);
        }
        JobStatus::Canceled => println!("canceled {}", job.filename()),
        JobStatus::Running => println!("start    {}", job.filename()),
        JobStatus::Pending | JobStatus::Paused => {}
    }
}

fn print_running_line(pool: &WorkerPool) {
    let parts: Vec<String> = pool
        .registry()
        .jobs()
        .iter()
        .filter(|j| j.status == JobStatus::Running)
        .map(|j| match j.progress {
            Some(fraction) => format!(
                "{} {:.0}% (ETA {})",
                j.filename(),
                fraction * 100.0,
                utils::format_eta(j.eta)
            ),
            None => format!("{} …", j.filename()),
        })
        .collect();

    if !parts.is_empty() {
        println!("  {}", parts.join(" | "));
    }
}

fn print_summary(pool: &WorkerPool, elapsed: Duration, probe_failures: usize) {
    let summary = pool.registry().summary();

    let output_bytes: u64 = pool
        .registry()
        .jobs()
        .iter()
        .filter(|j| j.status == JobStatus::Completed)
        .filter_map(|j| std::fs::metadata(&j.dest).ok())
        .map(|m| m.len())
        .sum();

    println!(
        "finished in {}: {} completed ({}), {} failed, {} canceled{}",
        utils::format_duration(elapsed),
        summary.completed,
        utils::format_file_size(output_bytes),
        summary.failed,
        summary.canceled,
        if probe_failures > 0 {
            format!(", {probe_failures} unreadable")
        } else {
            String::new()
        }
    );
}
