use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use frameseq_core::pipeline::export_frames_use_case::ExportFramesUseCase;
use frameseq_core::pipeline::playback_logger::StdoutPlaybackLogger;
use frameseq_core::pipeline::player::{PlayOptions, Player};
use frameseq_core::pipeline::save_video_use_case::{SaveOptions, SaveVideoUseCase};
use frameseq_core::video::domain::frame_buffer::FrameBuffer;
use frameseq_core::video::domain::image_writer::ImageWriter;
use frameseq_core::video::domain::playback_control::PlaybackCommand;
use frameseq_core::video::domain::source_descriptor::SourceDescriptor;
use frameseq_core::video::domain::video::Video;
use frameseq_core::video::infrastructure::channel_controller::ChannelController;
use frameseq_core::video::infrastructure::ffmpeg_video_writer::FfmpegVideoWriter;
use frameseq_core::video::infrastructure::image_dir_display::ImageDirDisplay;
use frameseq_core::video::infrastructure::image_file_writer::ImageFileWriter;
use frameseq_core::video::infrastructure::source_factory;

/// Play, inspect and export video files, image directories, cameras and streams.
#[derive(Parser)]
#[command(name = "frameseq", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print source metadata.
    Info {
        #[command(flatten)]
        source: SourceArgs,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Play a source. Commands are read from stdin, one per line:
    /// space pauses, c continues, s steps, q quits, a aborts, an empty
    /// line steps.
    Play(PlayArgs),
    /// Write every frame as a numbered PNG.
    Export {
        #[command(flatten)]
        source: SourceArgs,

        /// Output directory.
        output_dir: PathBuf,

        /// Letterbox frames into WxH.
        #[arg(long, value_parser = parse_dims)]
        size: Option<(u32, u32)>,
    },
    /// Encode every frame into a movie file (MPEG-4; container from the
    /// file extension).
    Save {
        #[command(flatten)]
        source: SourceArgs,

        /// Output movie, e.g. out.mp4.
        output: PathBuf,

        /// Letterbox frames into WxH (default: the source size).
        #[arg(long, value_parser = parse_dims)]
        size: Option<(u32, u32)>,

        /// Frames per second (default: the source rate).
        #[arg(long)]
        fps: Option<f64>,
    },
    /// Compose the first frames into a single montage image.
    Montage {
        #[command(flatten)]
        source: SourceArgs,

        /// Output image; labels are written next to it as JSON.
        output: PathBuf,

        /// Grid as RxC.
        #[arg(long, value_parser = parse_dims, default_value = "2x4")]
        layout: (u32, u32),

        /// Tile size as WxH (default: a fifth of the first frame).
        #[arg(long, value_parser = parse_dims)]
        tile: Option<(u32, u32)>,

        /// Number of frames to include.
        #[arg(long, default_value = "8")]
        count: usize,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Video file, image, directory, camera index or stream URL.
    source: String,

    /// Wildcard for directory sources.
    #[arg(long)]
    pattern: Option<String>,
}

#[derive(Args)]
struct PlayArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// First frame to play.
    #[arg(long)]
    start: Option<usize>,

    /// Last frame to play (inclusive).
    #[arg(long)]
    end: Option<usize>,

    /// Delay between frames in milliseconds (0 = no wait).
    #[arg(long, default_value = "20")]
    delay_ms: u64,

    /// Start in step mode.
    #[arg(long)]
    paused: bool,

    /// Do not label frames with their number.
    #[arg(long)]
    no_annotate: bool,

    /// Stretch frames to WxH.
    #[arg(long, value_parser = parse_dims)]
    size: Option<(u32, u32)>,

    /// Keep the N most recent frames buffered.
    #[arg(long)]
    buffer: Option<usize>,

    /// Write shown frames to this directory instead of running headless.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    match cli.command {
        Command::Info { source, json } => run_info(&source, json),
        Command::Play(args) => run_play(args),
        Command::Export {
            source,
            output_dir,
            size,
        } => run_export(&source, &output_dir, size),
        Command::Save {
            source,
            output,
            size,
            fps,
        } => run_save(&source, &output, SaveOptions { size, fps }),
        Command::Montage {
            source,
            output,
            layout,
            tile,
            count,
        } => run_montage(&source, &output, layout, tile, count),
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.command {
        Command::Play(args) => {
            if let (Some(start), Some(end)) = (args.start, args.end) {
                if end < start {
                    return Err(format!("--end {end} precedes --start {start}").into());
                }
            }
            if args.buffer == Some(0) {
                return Err("--buffer must be at least 1".into());
            }
        }
        Command::Montage { layout, count, .. } => {
            if layout.0 == 0 || layout.1 == 0 {
                return Err("--layout needs at least one row and one column".into());
            }
            if *count == 0 {
                return Err("--count must be at least 1".into());
            }
        }
        Command::Save { fps: Some(fps), .. } if fps.is_nan() || *fps <= 0.0 => {
            return Err(format!("--fps must be positive, got {fps}").into());
        }
        Command::Info { .. } | Command::Export { .. } | Command::Save { .. } => {}
    }
    Ok(())
}

/// Parses `WxH` (or `RxC`) into a pair of positive integers.
fn parse_dims(s: &str) -> Result<(u32, u32), String> {
    let (a, b) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{s}'"))?;
    let parse = |v: &str| -> Result<u32, String> {
        match v.trim().parse::<u32>() {
            Ok(0) | Err(_) => Err(format!("expected a positive integer, got '{v}'")),
            Ok(n) => Ok(n),
        }
    };
    Ok((parse(a)?, parse(b)?))
}

fn open_source(args: &SourceArgs) -> Result<Video, Box<dyn std::error::Error>> {
    let descriptor = SourceDescriptor::parse(&args.source, args.pattern.as_deref());
    Ok(source_factory::open(&descriptor)?)
}

fn run_info(source: &SourceArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let video = open_source(source)?;
    let meta = video.metadata();
    if json {
        println!("{}", serde_json::to_string_pretty(meta)?);
        return Ok(());
    }
    println!("Source:  {}", source.source);
    println!("Size:    {}x{}", meta.width, meta.height);
    println!("FPS:     {:.2}", meta.fps);
    match meta.total_frames {
        Some(n) => println!("Frames:  {n}"),
        None => println!("Frames:  live"),
    }
    println!("Codec:   {}", meta.codec);
    println!("Seekable: {}", video.is_seekable());
    Ok(())
}

fn run_play(args: PlayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut video = open_source(&args.source)?;
    if let Some((w, h)) = args.size {
        video = video.with_output_size(w, h);
    }
    if let Some(capacity) = args.buffer {
        video = video.with_buffer(capacity)?;
    }

    let options = PlayOptions {
        start_frame: args.start,
        end_frame: args.end,
        delay: Duration::from_millis(args.delay_ms),
        start_paused: args.paused,
        annotate: !args.no_annotate,
        window_title: args.source.source.clone(),
    };

    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let command = match line.chars().next() {
                Some(c) => PlaybackCommand::from_key(c),
                None => PlaybackCommand::Step,
            };
            if tx.send(command).is_err() {
                break;
            }
        }
    });

    let mut display = args.output_dir.as_ref().map(ImageDirDisplay::new);
    let mut player = Player::new(options)
        .with_controller(ChannelController::new(rx))
        .with_logger(StdoutPlaybackLogger::default());
    if let Some(display) = display.as_mut() {
        player = player.with_display(display);
    }

    let summary = player.play_video(&mut video)?;
    info!(
        "Played {} frames, stopped by {:?}",
        summary.frames_played, summary.stop_reason
    );
    if let Some(last) = summary.last_frame_index {
        println!("Last frame: {last}");
    }
    Ok(())
}

fn run_export(
    source: &SourceArgs,
    output_dir: &Path,
    size: Option<(u32, u32)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut video = open_source(source)?;
    let total = video.len();
    let mut use_case = ExportFramesUseCase::new(
        Box::new(ImageFileWriter::new()),
        Box::new(StdoutPlaybackLogger::default()),
        size,
        None,
    );
    let summary = use_case.execute(&mut video, total, output_dir)?;
    if !summary.skipped.is_empty() {
        warn!("{} frames could not be decoded", summary.skipped.len());
    }
    println!(
        "Wrote {} frames to {}",
        summary.written,
        output_dir.display()
    );
    Ok(())
}

fn run_save(
    source: &SourceArgs,
    output: &Path,
    options: SaveOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut video = open_source(source)?;
    let Some(total) = video.len() else {
        return Err("cannot save a live source: it never ends".into());
    };
    let metadata = video.metadata().clone();
    let mut use_case = SaveVideoUseCase::new(
        Box::new(FfmpegVideoWriter::new()),
        Box::new(StdoutPlaybackLogger::default()),
        options,
        None,
    );
    let summary = use_case.execute(&mut video, Some(total), &metadata, output)?;
    if !summary.skipped.is_empty() {
        warn!("{} frames could not be decoded", summary.skipped.len());
    }
    println!("Wrote {} frames to {}", summary.written, output.display());
    Ok(())
}

fn run_montage(
    source: &SourceArgs,
    output: &Path,
    layout: (u32, u32),
    tile: Option<(u32, u32)>,
    count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut video = open_source(source)?;
    let mut buffer = FrameBuffer::new(count)?;
    buffer.fill_from(&mut video)?;
    let montage = buffer.as_montage(layout, tile)?;

    ImageFileWriter::new().write(output, montage.frame(), None)?;
    let sidecar = output.with_extension("json");
    std::fs::write(&sidecar, montage.annotations().to_json()?)?;
    println!(
        "Wrote {}-frame montage ({}x{}) to {}",
        buffer.len(),
        montage.size().0,
        montage.size().1,
        output.display()
    );
    Ok(())
}
