use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "renderscope", version)]
struct Cli {
    /// Log pipeline activity at debug level.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a render-event trace and write the final overlay frame as a PNG.
    Replay(ReplayArgs),
    /// Print the effective pipeline options as JSON.
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Input trace JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Draw on a background thread where the host supports it.
    #[arg(long)]
    offload: bool,

    /// Host frames delivered after each flush (overrides the trace).
    #[arg(long)]
    frames: Option<u32>,

    /// Pipeline options JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    /// Pipeline options JSON to merge over the defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Replay(args) => cmd_replay(args),
        Command::Config(args) => cmd_config(args),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_opts(path: Option<&Path>) -> anyhow::Result<renderscope::PipelineOpts> {
    let opts = match path {
        Some(p) => {
            let s = std::fs::read_to_string(p)
                .with_context(|| format!("read options '{}'", p.display()))?;
            renderscope::PipelineOpts::from_json_str(&s)
                .with_context(|| format!("parse options '{}'", p.display()))?
        }
        None => renderscope::PipelineOpts::default(),
    };
    let opts = opts.with_env_overrides();
    opts.validate()?;
    Ok(opts)
}

fn cmd_replay(args: ReplayArgs) -> anyhow::Result<()> {
    let mut opts = load_opts(args.config.as_deref())?;
    if args.offload {
        opts.offload = true;
    }

    let s = std::fs::read_to_string(&args.in_path)
        .with_context(|| format!("read trace '{}'", args.in_path.display()))?;
    let trace = renderscope::ReplayTrace::from_json_str(&s)
        .with_context(|| format!("parse trace '{}'", args.in_path.display()))?;

    let outcome = renderscope::run_replay(&trace, &opts, args.frames)?;
    for (i, r) in outcome.reports.iter().enumerate() {
        eprintln!(
            "cycle {i}: {} blueprints, {} elements, {} batches, {} outlines, {} dropped",
            r.blueprints, r.elements, r.batches, r.outlines_emitted, r.dropped
        );
    }

    let frame = match outcome.frame {
        Some(f) => f,
        None => {
            let (w, h) = trace.viewport.physical(trace.dpr)?;
            renderscope::FrameRGBA {
                width: u32::from(w),
                height: u32::from(h),
                data: vec![0; usize::from(w) * usize::from(h) * 4],
                premultiplied: true,
            }
        }
    };

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        &args.out,
        &frame.to_straight_rgba(),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({:?} backend, {} presents)",
        args.out.display(),
        outcome.backend,
        outcome.presents
    );
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let opts = load_opts(args.config.as_deref())?;
    let s = serde_json::to_string_pretty(&opts).context("serialize options")?;
    println!("{s}");
    Ok(())
}
