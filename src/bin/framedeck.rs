use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use framedeck::{
    Canvas, Element, ElementKind, ElementRect, Engine, EngineEvent, EngineEventKind, EngineOpts,
    FontSpec, FrameQueue, FrameRGBA, TextContent, TimeRange, VideoFrames,
};

#[derive(Parser, Debug)]
#[command(name = "framedeck", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the frame at one point in time as a PNG.
    Frame(FrameArgs),
    /// Play the timeline in real time, printing engine events as JSON lines.
    Play(PlayArgs),
}

#[derive(Args, Debug)]
struct SceneArgs {
    /// Engine options JSON; every field is optional.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Surface size, e.g. `1280x720`. Overrides the config.
    #[arg(long, value_parser = parse_canvas)]
    canvas: Option<Canvas>,

    /// Font file to register; repeatable.
    #[arg(long = "font-file")]
    font_files: Vec<PathBuf>,

    /// Image element: `PATH@X,Y,W,H@START..END[@Z]`.
    #[arg(long = "image")]
    images: Vec<String>,

    /// Text element: `TEXT@X,Y,W,H@START..END[@Z]`, drawn with `--font`.
    #[arg(long = "text")]
    texts: Vec<String>,

    /// Font for text elements, e.g. `"30px Inter"`.
    #[arg(long)]
    font: Option<String>,

    /// Video element: `PATH@X,Y,W,H@START..END[@Z]`; frames are extracted with ffmpeg.
    #[arg(long = "video")]
    videos: Vec<String>,

    /// Sampling rate for `--video` elements.
    #[arg(long)]
    sample_rate_hz: Option<f64>,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Time to render, in milliseconds.
    #[arg(long, default_value_t = 0.0)]
    at: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct PlayArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Host refresh rate driving the tick loop.
    #[arg(long, default_value_t = 60.0)]
    refresh_hz: f64,

    /// Write every rendered frame as `frame_<n>.png` into this directory.
    #[arg(long)]
    dump_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Play(args) => cmd_play(args),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let engine = build_scene(&args.scene)?;
    if engine.extractions_in_flight() > 0 {
        engine.wait_for_extractions();
    }
    engine.seek(args.at);
    let stats = engine.render_once()?;
    tracing::info!(?stats, at = args.at, "rendered");

    let frame = engine.snapshot().context("surface has no pixels to read back")?;
    write_png(&args.out, frame)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    if !args.refresh_hz.is_finite() || args.refresh_hz <= 0.0 {
        anyhow::bail!("--refresh-hz must be finite and > 0");
    }
    let engine = build_scene(&args.scene)?;
    for kind in [
        EngineEventKind::Play,
        EngineEventKind::Pause,
        EngineEventKind::TimeUpdate,
        EngineEventKind::DurationUpdate,
        EngineEventKind::Ended,
        EngineEventKind::Progress,
        EngineEventKind::Seek,
    ] {
        engine.subscribe(kind, print_event);
    }
    if let Some(dir) = &args.dump_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create dump dir '{}'", dir.display()))?;
    }

    let interval = Duration::from_secs_f64(1.0 / args.refresh_hz);
    let mut rendered = 0u64;
    engine.play();
    dump_frame(&engine, args.dump_dir.as_deref(), &mut rendered)?;
    while let Some(token) = engine.frame_queue().and_then(FrameQueue::pop) {
        std::thread::sleep(interval);
        if engine.drive_frame(token) {
            dump_frame(&engine, args.dump_dir.as_deref(), &mut rendered)?;
        }
    }
    // Whatever extraction is still running has nothing left to draw into.
    engine.poll_extractions();
    Ok(())
}

fn print_event(ev: &EngineEvent) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(ev)?);
    Ok(())
}

fn dump_frame(engine: &Engine, dir: Option<&Path>, n: &mut u64) -> anyhow::Result<()> {
    let Some(dir) = dir else {
        return Ok(());
    };
    let frame = engine.snapshot().context("surface has no pixels to read back")?;
    write_png(&dir.join(format!("frame_{n}.png")), frame)?;
    *n += 1;
    Ok(())
}

fn build_scene(args: &SceneArgs) -> anyhow::Result<Engine> {
    let mut opts = match &args.config {
        Some(path) => EngineOpts::from_json_path(path)?,
        None => EngineOpts::default().with_env_overrides(),
    };
    if let Some(canvas) = args.canvas {
        opts.canvas = canvas;
    }
    opts.font_paths.extend(args.font_files.iter().cloned());
    if let Some(rate) = args.sample_rate_hz {
        opts.sample_rate_hz = rate;
    }
    let sample_rate_hz = opts.sample_rate_hz;

    let engine = Engine::builder(opts).build()?;
    if !args.videos.is_empty() {
        engine.start()?;
    }

    let font = args.font.as_deref().map(FontSpec::parse).transpose()?;
    let mut n = 0usize;
    let mut next_id = |prefix: &str| {
        n += 1;
        format!("{prefix}-{n}")
    };

    for spec in &args.images {
        let (path, placement) = parse_element_spec(spec)?;
        let source = framedeck::load_image(Path::new(path))?;
        engine.add_element(placement.into_element(next_id("image"), ElementKind::Image { source }));
    }
    for spec in &args.texts {
        let (text, placement) = parse_element_spec(spec)?;
        let mut content = TextContent::new(text);
        if let Some(font) = &font {
            content = content.with_font(font.clone());
        }
        engine.add_element(placement.into_element(next_id("text"), ElementKind::Text(content)));
    }
    for spec in &args.videos {
        let (path, placement) = parse_element_spec(spec)?;
        let video = VideoFrames::from_source(path, sample_rate_hz);
        engine.add_element(placement.into_element(next_id("video"), ElementKind::VideoFrames(video)));
    }
    Ok(engine)
}

struct Placement {
    rect: ElementRect,
    range: TimeRange,
    z_index: i32,
}

impl Placement {
    fn into_element(self, id: String, kind: ElementKind) -> Element {
        Element::new(id, self.rect, self.range, kind).with_z_index(self.z_index)
    }
}

/// Split `HEAD@X,Y,W,H@START..END[@Z]` into its head and placement.
fn parse_element_spec(spec: &str) -> anyhow::Result<(&str, Placement)> {
    let malformed = || format!("element spec '{spec}' is not HEAD@X,Y,W,H@START..END[@Z]");
    let (rest, last) = spec.rsplit_once('@').with_context(malformed)?;
    let (rest, z) = if last.contains("..") {
        (spec, "0")
    } else {
        (rest, last)
    };
    let (rest, range) = rest.rsplit_once('@').with_context(malformed)?;
    let (head, rect) = rest.rsplit_once('@').with_context(malformed)?;

    let nums = rect
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("parse rect '{rect}'"))?;
    let [x, y, w, h] = nums[..] else {
        anyhow::bail!("rect '{rect}' must be X,Y,W,H");
    };
    let (start, end) = range
        .split_once("..")
        .with_context(|| format!("range '{range}' must be START..END"))?;
    let range = TimeRange::new(
        start.trim().parse().with_context(|| format!("parse start '{start}'"))?,
        end.trim().parse().with_context(|| format!("parse end '{end}'"))?,
    )?;
    let z_index = z.parse().with_context(|| format!("parse z-index '{z}'"))?;

    Ok((
        head,
        Placement {
            rect: ElementRect::new(x, y, w, h),
            range,
            z_index,
        },
    ))
}

fn parse_canvas(s: &str) -> Result<Canvas, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("canvas '{s}' must be WIDTHxHEIGHT"))?;
    let width = w.trim().parse().map_err(|e| format!("canvas width: {e}"))?;
    let height = h.trim().parse().map_err(|e| format!("canvas height: {e}"))?;
    Ok(Canvas { width, height })
}

fn write_png(path: &Path, mut frame: FrameRGBA) -> anyhow::Result<()> {
    if frame.premultiplied {
        framedeck::unpremultiply_rgba8_in_place(&mut frame.data);
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        path,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}
