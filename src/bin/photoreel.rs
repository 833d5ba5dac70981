use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use photoreel::{AudioTrackSettings, RenderEngine, RenderSettings};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "photoreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the slideshow to an MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render the frame shown at one instant as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct SettingsArgs {
    /// Settings JSON; missing fields take their defaults.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Directory for the per-run log file.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    common: SettingsArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Background audio track (overrides the settings file).
    #[arg(long)]
    audio: Option<PathBuf>,

    /// Loop the audio track until the video ends.
    #[arg(long, requires = "audio")]
    loop_audio: bool,

    /// Audio gain, 0..=1.
    #[arg(long, requires = "audio", default_value_t = 1.0)]
    volume: f32,

    /// Source images, in display order.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    common: SettingsArgs,

    /// Time in seconds; clamped to the slideshow.
    #[arg(long, default_value_t = 0.0)]
    at: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Source images, in display order.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("photoreel=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args).await,
        Command::Frame(args) => cmd_frame(args).await,
    }
}

fn load_settings(args: &SettingsArgs) -> anyhow::Result<RenderSettings> {
    let mut settings = match &args.settings {
        Some(path) => RenderSettings::from_path(path)?,
        None => RenderSettings::default(),
    };
    if let Some(dir) = &args.log_dir {
        settings.log_dir = Some(dir.clone());
    }
    Ok(settings)
}

async fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut settings = load_settings(&args.common)?;
    if let Some(source) = args.audio {
        settings.audio = Some(AudioTrackSettings {
            source,
            volume: args.volume,
            looping: args.loop_audio,
        });
    }
    let engine = RenderEngine::new(settings)?;

    let cancel = engine.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("cancelling...");
            cancel.cancel();
        }
    });

    let mut last_pct = None;
    let report = engine
        .export(&args.images, &args.out, |p| {
            let pct = (p * 100.0).floor() as u32;
            if last_pct != Some(pct) {
                last_pct = Some(pct);
                eprint!("\r{pct:3}%");
            }
        })
        .await;
    eprintln!();

    let report = report?;
    eprintln!(
        "wrote {} ({} frames, {:.2}s video, {:.2}s elapsed)",
        report.output.display(),
        report.frames_written,
        report.duration,
        report.elapsed.as_secs_f64()
    );
    if let Some(log) = &report.log_path {
        eprintln!("log: {}", log.display());
    }
    Ok(())
}

async fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let settings = load_settings(&args.common)?;
    let engine = RenderEngine::new(settings)?;
    let frame = engine.preview_frame(&args.images, args.at).await?;

    ensure_parent(&args.out)?;
    image::save_buffer_with_format(
        &args.out,
        &frame.to_straight_rgba8(),
        frame.width(),
        frame.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}
