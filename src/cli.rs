//! Command-line interface implementation

use clap::{ArgAction, Parser, Subcommand};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::{load_config, merge_cli_overrides, CliOverrides, ImportConfig, NamedAlignment, PixelOrigin};
use crate::error::ImportError;
use crate::models::SourceModel;
use crate::output::write_result;
use crate::pipeline::{import, ImportResult};
use crate::target::{Target, ROOT_PATH};

/// Exit codes
const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

/// Rigatlas - pack layered frame art into a sprite atlas with pivot and offset rigging data
#[derive(Parser)]
#[command(name = "rigatlas")]
#[command(about = "Pack layered frame art into a sprite atlas with pivot and offset rigging data")]
#[command(version)]
pub struct Cli {
    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings shared by every command that runs an import
#[derive(clap::Args)]
pub struct ImportArgs {
    /// Source model (JSON)
    pub input: PathBuf,

    /// Config file (default: rigatlas.toml found above the input)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Padding in pixels between packed sprites
    #[arg(long)]
    pub border: Option<u32>,

    /// Default pivot alignment for targets without a pivot layer
    #[arg(long, value_enum, ignore_case = true)]
    pub alignment: Option<NamedAlignment>,

    /// Pixel origin convention for normalized pivots
    #[arg(long, value_enum)]
    pub pixel_origin: Option<PixelOrigin>,

    /// Keep full-canvas frame images instead of trimming to content
    #[arg(long)]
    pub no_trim: bool,

    /// Pixels per world unit for offsets in the metadata
    #[arg(long)]
    pub pixels_per_unit: Option<f32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the atlas PNG and its metadata JSON
    Pack {
        #[command(flatten)]
        args: ImportArgs,

        /// Output directory (default: the input's directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Strict mode: treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
    /// Print the resolved target tree
    Targets {
        #[command(flatten)]
        args: ImportArgs,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Pack { args, output, strict } => run_pack(&args, output.as_deref(), strict),
        Commands::Targets { args } => run_targets(&args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Turn command-line settings into overrides
fn build_overrides(args: &ImportArgs) -> CliOverrides {
    CliOverrides {
        border: args.border,
        default_alignment: args.alignment.map(Into::into),
        pixel_origin: args.pixel_origin,
        dense_packed: args.no_trim.then_some(false),
        pixels_per_unit: args.pixels_per_unit,
    }
}

/// Load config and model, then run the import.
///
/// On failure the exit code to use is returned after the error is printed.
fn load_and_import(args: &ImportArgs) -> Result<(ImportConfig, ImportResult), ExitCode> {
    let overrides = build_overrides(args);

    let search_from = args
        .input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let config = load_config(args.config.as_deref(), search_from)
        .and_then(|mut config| merge_cli_overrides(&mut config, &overrides).map(|_| config))
        .map_err(|e| {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_INVALID_ARGS)
        })?;

    let file = File::open(&args.input).map_err(|e| {
        eprintln!("Error: Cannot open input file '{}': {}", args.input.display(), e);
        ExitCode::from(EXIT_INVALID_ARGS)
    })?;

    let model = SourceModel::from_reader(BufReader::new(file)).map_err(|e| {
        eprintln!("Error: '{}': {}", args.input.display(), e);
        match e {
            ImportError::Model(_) | ImportError::Io(_) => ExitCode::from(EXIT_INVALID_ARGS),
            _ => ExitCode::from(EXIT_ERROR),
        }
    })?;

    let result = import(&model, &config).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_ERROR)
    })?;

    Ok((config, result))
}

/// Execute the pack command
fn run_pack(args: &ImportArgs, output: Option<&Path>, strict: bool) -> ExitCode {
    let (config, result) = match load_and_import(args) {
        Ok(r) => r,
        Err(code) => return code,
    };

    // In strict mode, any warning is fatal and nothing is written
    if strict && !result.warnings.is_empty() {
        for warning in &result.warnings {
            eprintln!("Error: {}", warning);
        }
        return ExitCode::from(EXIT_ERROR);
    }

    let (png, json) = match write_result(&result, &args.input, output, config.pixels_per_unit) {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("Error: Failed to write output: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    println!(
        "Packed: {} ({}x{}, {} sprite(s))",
        png.display(),
        result.atlas_size,
        result.atlas_size,
        result.sprites.len()
    );
    println!("Metadata: {}", json.display());

    for warning in &result.warnings {
        eprintln!("Warning: {}", warning);
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// One line of the target tree
fn describe_target(target: &Target) -> String {
    let depth = if target.path == ROOT_PATH {
        0
    } else {
        target.path.matches('/').count()
    };
    format!(
        "{}{}  sprite={} pivot={} content_layers={:?} frames={}",
        "  ".repeat(depth),
        target.path,
        target.sprite_base_name,
        target.pivot_source,
        target.content_layers,
        target.dimensions.len()
    )
}

/// Execute the targets command
fn run_targets(args: &ImportArgs) -> ExitCode {
    let (_, result) = match load_and_import(args) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let mut targets: Vec<&Target> = result.registry.iter().collect();
    targets.sort_by(|a, b| a.path.cmp(&b.path));
    for target in targets {
        println!("{}", describe_target(target));
    }

    for warning in &result.warnings {
        eprintln!("Warning: {}", warning);
    }

    ExitCode::from(EXIT_SUCCESS)
}
