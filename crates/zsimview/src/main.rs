//! zsimview - Interactive TUI viewer for simulator statistics files.
//!
//! Usage:
//!   zsimview run/zsim.h5           # open a file
//!   zsimview --role ev --dir run   # open run/zsim-ev.h5
//!   zsimview --precision 5 --sum-row stats.zsv

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use zsimview_core::container::FileRole;
use zsimview_core::tui::App;
use zsimview_core::{Session, ViewerConfig, ViewerError};

/// Redraw tick; also ages status messages.
const TICK_RATE: Duration = Duration::from_millis(250);

/// Interactive viewer for periodic simulator statistics.
#[derive(Parser)]
#[command(name = "zsimview", about = "Simulator statistics viewer")]
struct Args {
    /// Statistics file to open. Defaults to the --role file inside --dir.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// File role to open when FILE is omitted: primary, ev, cmp.
    #[arg(long, default_value = "primary")]
    role: String,

    /// Directory holding the role files.
    #[arg(long, default_value = ".")]
    dir: PathBuf,

    /// JSON config file (recognized key tables, precision, ...).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Digits after the decimal point for float cells.
    #[arg(long, env = "ZSIMVIEW_PRECISION")]
    precision: Option<usize>,

    /// Prepend a SUM row to per-core tables.
    #[arg(long)]
    sum_row: bool,

    /// Light color palette.
    #[arg(long)]
    light: bool,

    /// Print the effective config as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Write logs to this file (the terminal is used by the UI).
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();

    if let Some(ref path) = args.log_file {
        if let Err(e) = init_logging(path, args.verbose) {
            eprintln!("Error: cannot open log file '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if args.print_config {
        match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let path = match args.file.clone() {
        Some(path) => path,
        None => match FileRole::parse(&args.role) {
            Some(role) => role.default_path(&args.dir),
            None => {
                eprintln!("Error: unknown role '{}' (expected primary, ev or cmp)", args.role);
                std::process::exit(1);
            }
        },
    };

    let mut session = Session::new(config);
    if let Err(e) = session.open(&path) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    info!(path = %path.display(), "starting viewer");

    if let Err(e) = App::new(session).run(TICK_RATE) {
        eprintln!("Error: terminal failure: {}", e);
        std::process::exit(1);
    }
}

/// Defaults, then the config file, then CLI flags and environment.
fn build_config(args: &Args) -> Result<ViewerConfig, ViewerError> {
    let mut config = match args.config {
        Some(ref path) => ViewerConfig::from_file(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(precision) = args.precision {
        config = config.with_precision(precision);
    }
    if args.sum_row {
        config = config.with_sum_row(true);
    }
    if args.light {
        config.light_theme = true;
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(path: &Path, verbose: u8) -> std::io::Result<()> {
    let file = File::create(path)?;
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let mut filter = EnvFilter::from_default_env();
    for directive in [format!("zsimview={}", level), format!("zsimview_core={}", level)] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}
