use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use reelcut::export::FnProgress;
use reelcut::{
    ClipRegistry, ExportConfig, ExportProgress, Exporter, LoadOptions, Preset, Resolution,
    TransitionSettings, TransitionType, load_clips,
};

#[derive(Parser, Debug)]
#[command(name = "reelcut", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe a clip and print its stream facts.
    Probe(ProbeArgs),
    /// Stitch clips into one MP4 (requires `ffmpeg` on PATH).
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Clip file to probe.
    file: PathBuf,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Clip files in timeline order.
    #[arg(required = true)]
    clips: Vec<PathBuf>,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Render the fixed low-resolution preview profile instead.
    #[arg(long, default_value_t = false)]
    preview: bool,

    /// Output frame rate (30 or 60).
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Output resolution (720 or 1080).
    #[arg(long, default_value_t = 720)]
    resolution: u32,

    /// x264 preset (ultrafast, fast, slow).
    #[arg(long, default_value = "ultrafast")]
    preset: String,

    /// Transition kind (none, random, fade, directional, cube, crosswarp,
    /// wind, doom_screen, grid_flip, dreamy, simple_zoom, pixelize).
    #[arg(long, default_value = "fade")]
    transition: String,

    /// Transition duration in seconds.
    #[arg(long, default_value_t = 1.0)]
    transition_duration: f64,

    /// Background music file.
    #[arg(long)]
    music: Option<PathBuf>,

    /// Background music volume, 0-100.
    #[arg(long, default_value_t = 50.0)]
    music_volume: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Probe(args) => cmd_probe(args),
        Command::Export(args) => cmd_export(args),
    }
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let info = reelcut::media::probe_source(&args.file)
        .with_context(|| format!("probe '{}'", args.file.display()))?;
    println!("path:      {}", info.path.display());
    println!("size:      {}x{}", info.width, info.height);
    println!("fps:       {:.3}", info.fps());
    println!("duration:  {:.3}s", info.duration_sec);
    println!("audio:     {}", if info.has_audio { "yes" } else { "no" });
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let mut registry = ClipRegistry::new();
    registry.add_clips(args.clips.iter().cloned());

    let load_opts = LoadOptions::new(std::env::temp_dir().join("reelcut-sprites")).without_sprites();
    let report = load_clips(&mut registry, &load_opts, None)?;
    for path in &report.deleted {
        eprintln!("warning: clip not readable, skipping: {}", path.display());
    }
    for path in &report.unsupported {
        eprintln!("warning: unsupported container, skipping: {}", path.display());
    }

    let mut config = ExportConfig::new(&args.out);
    config.fps = args.fps;
    config.resolution = match args.resolution {
        720 => Resolution::Hd720,
        1080 => Resolution::Fhd1080,
        other => anyhow::bail!("unsupported resolution {other} (expected 720 or 1080)"),
    };
    config.preset = match args.preset.as_str() {
        "ultrafast" => Preset::Ultrafast,
        "fast" => Preset::Fast,
        "slow" => Preset::Slow,
        other => anyhow::bail!("unsupported preset '{other}'"),
    };
    config.transition =
        TransitionSettings::new(TransitionType::parse(&args.transition)?, args.transition_duration)?;
    config.audio.music_enabled = args.music.is_some();
    config.audio.music_path = args.music;
    config.audio.music_volume = args.music_volume;

    let mut exporter = Exporter::new(config);
    let mut progress = FnProgress::new(|p: ExportProgress| {
        eprint!("\r{:?}: frame {}/{}", p.phase, p.current_frame, p.total_frames);
    });

    let summary = exporter.export(&mut registry, args.preview, &mut progress)?;
    eprintln!();

    if let Some(error) = &summary.error {
        anyhow::bail!("export failed: {error}");
    }
    eprintln!(
        "{:?}: wrote {} of {} expected frames to {}",
        summary.state,
        summary.written_frames,
        summary.expected_frames,
        summary.output_path.display()
    );
    Ok(())
}
