use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use poisson_blend::{
    default_output_path, BlendEngine, BlendJob, BlendParams, EdgePolicy, Offset, ProcessOptions,
    ProcessResult, SolverConfig, SolverKind,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SolverArg {
    /// Jacobi-preconditioned BiCGSTAB
    Bicgstab,
    /// Gauss-Seidel with over-relaxation (see --omega)
    GaussSeidel,
}

#[derive(Parser)]
#[command(
    name = "poisson-blend",
    about = "Seamlessly clone a source image into a target via Poisson image editing",
    version,
    after_help = "Simple usage: poisson-blend <cutout.png> <background.jpg>\n\n\
                  Without --mask, the source's alpha channel selects the region to clone\n\
                  and the target is resized to the source's size."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Source image (RGBA cut-out, or any image when --mask is given)
    source: String,

    /// Target image
    target: String,

    /// Grayscale mask image, same size as the (resized) target
    #[arg(short, long)]
    mask: Option<String>,

    /// Output file (default: {target}_blended.{ext})
    #[arg(short, long)]
    output: Option<String>,

    /// Horizontal source offset in pixels
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    dx: i32,

    /// Vertical source offset in pixels
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    dy: i32,

    /// Scale applied to the source gradients
    #[arg(short, long, default_value_t = 1.0)]
    strength: f64,

    /// Linear solver
    #[arg(long, value_enum, default_value_t = SolverArg::Bicgstab)]
    solver: SolverArg,

    /// Relaxation factor for gauss-seidel, in (0, 2)
    #[arg(long, default_value_t = 1.8)]
    omega: f64,

    /// Relative residual at which the solve stops
    #[arg(long, default_value_t = 1e-10)]
    tolerance: f64,

    /// Iteration cap per channel
    #[arg(long, default_value_t = 10_000)]
    max_iterations: usize,

    /// Pin unselected pixels on the canvas edge to the target
    #[arg(long)]
    pin_edges: bool,

    /// Fail instead of resizing the target when sizes differ
    #[arg(long)]
    no_resize: bool,

    /// Mask/alpha values strictly above this are selected
    #[arg(long, default_value_t = 0)]
    mask_threshold: u8,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let kind = match cli.solver {
        SolverArg::Bicgstab => SolverKind::BiCgStab,
        SolverArg::GaussSeidel => SolverKind::GaussSeidel { omega: cli.omega },
    };

    let opts = ProcessOptions {
        params: BlendParams {
            strength: cli.strength,
            edge_policy: if cli.pin_edges {
                EdgePolicy::PinUnmasked
            } else {
                EdgePolicy::Laplacian
            },
            solver: SolverConfig {
                kind,
                tolerance: cli.tolerance,
                max_iterations: cli.max_iterations,
            },
        },
        offset: Offset::new(cli.dx, cli.dy),
        resize_target: !cli.no_resize,
        mask_threshold: cli.mask_threshold,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let engine = match BlendEngine::new(opts) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    for input in [&cli.source, &cli.target].into_iter().chain(cli.mask.as_ref()) {
        if !Path::new(input).exists() {
            eprintln!("Error: Input path does not exist: {input}");
            process::exit(1);
        }
    }

    let output = match &cli.output {
        Some(o) => PathBuf::from(o),
        None => default_output_path(Path::new(&cli.target)),
    };

    let job = BlendJob {
        source: PathBuf::from(&cli.source),
        target: PathBuf::from(&cli.target),
        mask: cli.mask.as_ref().map(PathBuf::from),
        output,
    };

    let result = engine.process_files(&job);
    print_result(&result, engine.options());

    if !result.success {
        process::exit(1);
    }
}

/// `RUST_LOG` overrides the level picked by `--verbose`/`--quiet`.
fn init_logging(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    }
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    if opts.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.skipped {
        if !opts.quiet {
            eprintln!("[SKIP] {filename}: {}", result.message);
        }
    } else if result.success {
        if !opts.quiet {
            eprintln!("[OK] {filename} ({} pixels blended)", result.selected);
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if opts.verbose && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}
