//! StudioClock CLI - place and route the clock board from the command line.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use studioclock::{ClockParams, LayoutOptions, LayoutResult, StudioClockCore};
use tracing::Level;

#[derive(Parser)]
#[command(name = "studioclock")]
#[command(about = "Placement and two-layer routing for the KiCad studio clock", long_about = None)]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clear, place and route a .kicad_pcb file
    Layout {
        /// Path to the .kicad_pcb file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write the result here instead of overwriting FILE
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// JSON file with board parameters; missing keys keep their defaults
        #[arg(long, value_name = "JSON")]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Run the layout without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the default board parameters as JSON
    Params,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for scripts
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match cli.command {
        Commands::Layout {
            file,
            output,
            config,
            format,
            dry_run,
        } => handle_layout(&file, output, config.as_deref(), format, dry_run),
        Commands::Params => handle_params(),
    };

    process::exit(exit_code);
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn handle_layout(
    file: &Path,
    output: Option<PathBuf>,
    config: Option<&Path>,
    format: OutputFormat,
    dry_run: bool,
) -> i32 {
    if file.extension().and_then(|s| s.to_str()) != Some("kicad_pcb") {
        eprintln!("Error: File must be .kicad_pcb");
        return 1;
    }

    match run_layout(file, output, config, dry_run) {
        Ok(result) => {
            match format {
                OutputFormat::Human => output_human(&result),
                OutputFormat::Json => output_json(&result),
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn run_layout(
    file: &Path,
    output: Option<PathBuf>,
    config: Option<&Path>,
    dry_run: bool,
) -> anyhow::Result<LayoutResult> {
    let params = match config {
        Some(path) => ClockParams::from_json_file(path)
            .with_context(|| format!("loading parameters from {}", path.display()))?,
        None => ClockParams::default(),
    };
    let options = LayoutOptions {
        params,
        output,
        dry_run,
    };
    StudioClockCore::layout_pcb(file, &options)
        .with_context(|| format!("laying out {}", file.display()))
}

fn output_human(result: &LayoutResult) {
    let report = &result.report;
    println!("\nFile: {}", result.file.display());
    println!("{}", "─".repeat(60));
    println!(
        "  Cleared:  {} tracks, {} vias, {} outline lines",
        report.cleared_tracks, report.cleared_vias, report.cleared_drawings
    );
    println!("  Placed:   {} elements", report.placed_elements);
    println!(
        "  Nets:     {} sink, {} source",
        report.sink_nets, report.source_nets
    );
    println!(
        "  Routed:   {} tracks, {} vias, {} drawings",
        report.tracks, report.vias, report.drawings
    );
    match &result.output {
        Some(path) => println!("\n  Saved to {}", path.display()),
        None => println!("\n  Dry run, nothing saved"),
    }
}

fn output_json(result: &LayoutResult) {
    match serde_json::to_string_pretty(result) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: {}", e),
    }
}

fn handle_params() -> i32 {
    match serde_json::to_string_pretty(&ClockParams::default()) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}
