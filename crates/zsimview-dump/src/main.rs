//! zsimview-dump - Non-interactive inspector for simulator statistics files.
//!
//! Usage:
//!   zsimview-dump run/zsim.zsv                        # snapshots + schema of snapshot 0
//!   zsimview-dump run/zsim.zsv --snapshot 3 --select core
//!   zsimview-dump run/zsim.zsv --select l2:bank0 --json
//!   zsimview-dump --demo demo.zsv                     # write a small sample file

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use tracing::{Level, debug};
use tracing_subscriber::EnvFilter;

use zsimview_core::container::{DataType, FieldDef, Node, Value, write_container};
use zsimview_core::fmt::truncate;
use zsimview_core::selection::Selection;
use zsimview_core::snapshot::SnapshotInfo;
use zsimview_core::view::{Grid, GridStatus, RowStyleClass};
use zsimview_core::{Session, ViewerConfig, ViewerError};

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "zsimview-dump", about = "Inspect simulator statistics files")]
struct Cli {
    /// Statistics file (.zsv, .json, or a packed file)
    #[arg(required_unless_present = "demo")]
    path: Option<PathBuf>,

    /// Snapshot index to describe
    #[arg(long, default_value_t = 0)]
    snapshot: usize,

    /// Print the table of MODULE or MODULE:RECORD
    #[arg(long, value_name = "MODULE[:RECORD]")]
    select: Option<String>,

    /// Print every snapshot's schema, not only --snapshot
    #[arg(long)]
    all: bool,

    /// JSON config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Digits after the decimal point for float cells
    #[arg(long, env = "ZSIMVIEW_PRECISION")]
    precision: Option<usize>,

    /// Prepend a SUM row to per-core tables
    #[arg(long)]
    sum_row: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Write a sample file to this path and exit
    #[arg(long, value_name = "OUT", conflicts_with = "path")]
    demo: Option<PathBuf>,

    /// Log to stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(ref out) = cli.demo {
        match write_demo(out) {
            Ok(()) => println!("wrote {}", out.display()),
            Err(e) => fail(e),
        }
        return;
    }

    let Some(ref path) = cli.path else {
        fail("no input file");
    };
    if let Err(e) = dump(path, &cli) {
        fail(e);
    }
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", e);
    std::process::exit(1);
}

fn init_logging(verbose: u8) {
    if verbose == 0 {
        return;
    }
    let level = if verbose == 1 { Level::DEBUG } else { Level::TRACE };
    let mut filter = EnvFilter::from_default_env();
    for directive in [format!("zsimview_dump={}", level), format!("zsimview_core={}", level)] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_config(cli: &Cli) -> Result<ViewerConfig, ViewerError> {
    let mut config = match cli.config {
        Some(ref path) => ViewerConfig::from_file(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(precision) = cli.precision {
        config = config.with_precision(precision);
    }
    if cli.sum_row {
        config = config.with_sum_row(true);
    }
    config.validate()?;
    Ok(config)
}

// ── Formatting helpers ───────────────────────────────────────────────────────

fn fmt_ts(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Aligned plain-text rendition of a grid, label column first.
fn grid_lines(grid: &Grid) -> Vec<String> {
    if grid.headers.is_empty() {
        return grid.message().into_iter().collect();
    }
    let label_width = grid.label_width as usize;
    let mut lines = Vec::with_capacity(grid.rows.len() + 2);

    let mut header = format!("{:<label_width$}", "");
    for (h, w) in grid.headers.iter().zip(&grid.widths) {
        let w = *w as usize;
        header.push_str(&format!("  {:>w$}", truncate(h, w)));
    }
    lines.push(header.trim_end().to_string());
    let total: usize = label_width + grid.widths.iter().map(|w| *w as usize + 2).sum::<usize>();
    lines.push("─".repeat(total));

    for row in &grid.rows {
        let mut line = format!("{:<label_width$}", row.label);
        for (c, w) in row.cells.iter().zip(&grid.widths) {
            let w = *w as usize;
            line.push_str(&format!("  {:>w$}", truncate(c, w)));
        }
        lines.push(line.trim_end().to_string());
        if row.style == RowStyleClass::Total {
            lines.push("─".repeat(total));
        }
    }
    if let Some(message) = grid.message() {
        lines.push(message);
    }
    lines
}

// ── JSON output types ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct DumpJson {
    file: String,
    format: String,
    role: Option<String>,
    generated_at: String,
    snapshots: Vec<SnapshotJson>,
    schemas: Vec<SchemaJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    table: Option<TableJson>,
}

#[derive(Serialize)]
struct SnapshotJson {
    index: usize,
    name: String,
    phase: Option<i64>,
    time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preview_error: Option<String>,
}

#[derive(Serialize)]
struct SchemaJson {
    snapshot: usize,
    modules: Vec<ModuleJson>,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct ModuleJson {
    name: String,
    records: Vec<RecordJson>,
}

#[derive(Serialize)]
struct RecordJson {
    name: String,
    path: String,
    kind: String,
}

#[derive(Serialize)]
struct TableJson {
    selection: String,
    title: String,
    status: String,
    headers: Vec<String>,
    rows: Vec<RowJson>,
}

#[derive(Serialize)]
struct RowJson {
    label: String,
    cells: Vec<String>,
    total: bool,
}

fn snapshot_json(info: &SnapshotInfo) -> SnapshotJson {
    SnapshotJson {
        index: info.index,
        name: info.name.clone(),
        phase: info.phase,
        time: info.time,
        preview_error: info.preview_error.clone(),
    }
}

/// Schema of the session's current snapshot.
fn schema_json(session: &Session) -> Option<SchemaJson> {
    let schema = session.schema()?;
    Some(SchemaJson {
        snapshot: schema.snapshot,
        modules: schema
            .modules
            .iter()
            .map(|m| ModuleJson {
                name: m.name.clone(),
                records: m
                    .records
                    .iter()
                    .map(|r| RecordJson {
                        name: r.name.clone(),
                        path: r.path.to_string(),
                        kind: r.record.kind_label(),
                    })
                    .collect(),
            })
            .collect(),
        warnings: session.warnings().iter().map(|w| w.to_string()).collect(),
    })
}

fn table_json(selection: &str, grid: &Grid) -> TableJson {
    let status = match &grid.status {
        GridStatus::Ready => "ready".to_string(),
        GridStatus::Empty(_) => "empty".to_string(),
        GridStatus::Deferred { .. } => "deferred".to_string(),
        GridStatus::Failed(e) => format!("failed: {}", e),
    };
    TableJson {
        selection: selection.to_string(),
        title: grid.title.clone(),
        status,
        headers: grid.headers.clone(),
        rows: grid
            .rows
            .iter()
            .map(|r| RowJson {
                label: r.label.clone(),
                cells: r.cells.clone(),
                total: r.style == RowStyleClass::Total,
            })
            .collect(),
    }
}

// ── Dump ─────────────────────────────────────────────────────────────────────

fn dump(path: &Path, cli: &Cli) -> Result<(), String> {
    let config = build_config(cli).map_err(|e| e.to_string())?;
    let mut session = Session::new(config);
    session.open(path).map_err(|e| e.to_string())?;

    let snapshot_count = session.snapshots().len();
    if snapshot_count > 0 && cli.snapshot >= snapshot_count {
        return Err(format!(
            "snapshot {} out of range (file has {})",
            cli.snapshot, snapshot_count
        ));
    }

    let indexes: Vec<usize> = if cli.all {
        (0..snapshot_count).collect()
    } else if snapshot_count > 0 {
        vec![cli.snapshot]
    } else {
        Vec::new()
    };

    let mut schemas = Vec::with_capacity(indexes.len());
    for &index in &indexes {
        session.switch_snapshot(index).map_err(|e| e.to_string())?;
        if let Some(schema) = schema_json(&session) {
            schemas.push(schema);
        }
    }

    let table = match cli.select {
        Some(ref spec) => {
            if snapshot_count > 0 {
                session
                    .switch_snapshot(cli.snapshot)
                    .map_err(|e| e.to_string())?;
            }
            session.select(Selection::parse(spec)).map_err(|e| e.to_string())?;
            // A dump always wants the full table.
            session.load_deferred();
            debug!(selection = %spec, rows = session.grid().rows.len(), "table materialized");
            Some(table_json(spec, session.grid()))
        }
        None => None,
    };

    let container = session
        .container()
        .ok_or_else(|| "no file open".to_string())?;
    let out = DumpJson {
        file: container.file_name(),
        format: container.format_name().to_string(),
        role: container.role().map(|r| r.name().to_string()),
        generated_at: Utc::now().to_rfc3339(),
        snapshots: session.snapshots().iter().map(snapshot_json).collect(),
        schemas,
        table,
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&out).map_err(|e| e.to_string())?;
        println!("{}", json);
    } else {
        print_text(&out, session.grid());
    }
    Ok(())
}

fn print_text(out: &DumpJson, grid: &Grid) {
    println!(
        "File:      {} [{}, {}]",
        out.file,
        out.format,
        out.role.as_deref().unwrap_or("-")
    );
    println!("Snapshots: {}", out.snapshots.len());
    for snap in &out.snapshots {
        let info = SnapshotInfo {
            index: snap.index,
            name: snap.name.clone(),
            path: Default::default(),
            phase: snap.phase,
            time: snap.time,
            preview_error: snap.preview_error.clone(),
        };
        match snap.preview_error {
            Some(ref e) => println!("  {}  (preview unavailable: {})", info.label(), e),
            None => println!("  {}", info.label()),
        }
    }

    for schema in &out.schemas {
        println!("\nSchema of snapshot {}:", schema.snapshot);
        println!("  {:<32} {:<12} {}", "Record", "Kind", "Path");
        println!("  {}", "─".repeat(60));
        for module in &schema.modules {
            for record in &module.records {
                let label = if module.records.len() == 1 && record.name == module.name {
                    module.name.clone()
                } else {
                    format!("{}:{}", module.name, record.name)
                };
                println!("  {:<32} {:<12} {}", label, record.kind, record.path);
            }
        }
        if schema.modules.is_empty() {
            println!("  (no modules)");
        }
        for warning in &schema.warnings {
            println!("  warning: {}", warning);
        }
    }

    if let Some(ref table) = out.table {
        let title = if table.title.is_empty() {
            table.selection.as_str()
        } else {
            table.title.as_str()
        };
        println!("\n{}:", title);
        for line in grid_lines(grid) {
            println!("  {}", line);
        }
    }
}

// ── Demo file ────────────────────────────────────────────────────────────────

/// Two snapshots of a small 4-core run. The second one drops the `cache`
/// module and grows `l2` by one bank.
fn demo_tree(created: &str) -> Node {
    let core_fields = || {
        vec![
            FieldDef::new("instrs", DataType::u64()),
            FieldDef::new("cycles", DataType::u64()),
            FieldDef::new("ipc", DataType::f64()),
        ]
    };
    let cores = |scale: u64| {
        (0..4u64)
            .map(|i| {
                let instrs = (i + 1) * 1000 * scale;
                let cycles = 2000 * scale;
                vec![
                    Value::UInt(instrs),
                    Value::UInt(cycles),
                    Value::Float(instrs as f64 / cycles as f64),
                ]
            })
            .collect::<Vec<_>>()
    };
    let bank_fields = || {
        vec![
            FieldDef::new("hits", DataType::u64()),
            FieldDef::new("misses", DataType::u64()),
        ]
    };
    let bank = |name: String, hits: u64, misses: u64| {
        Node::compound_array(
            name,
            bank_fields(),
            vec![vec![Value::UInt(hits), Value::UInt(misses)]],
        )
    };

    let first = Node::group("0")
        .with_attr("phase", Value::Int(1))
        .with_attr("time", Value::UInt(2000))
        .with_child(Node::compound_array("core", core_fields(), cores(1)))
        .with_child(
            Node::group("l2")
                .with_child(bank("bank0".to_string(), 900, 100))
                .with_child(bank("bank1".to_string(), 850, 150)),
        )
        .with_child(Node::compound(
            "cache",
            &[("accesses", Value::UInt(5000)), ("evictions", Value::UInt(42))],
        ))
        .with_child(Node::scalar("heartbeats", Value::UInt(4)));

    let second = Node::group("1")
        .with_attr("phase", Value::Int(2))
        .with_attr("time", Value::UInt(4000))
        .with_child(Node::compound_array("core", core_fields(), cores(2)))
        .with_child(
            (0..3)
                .map(|i| bank(format!("bank{}", i), 1800 - i * 50, 200 + i * 50))
                .fold(Node::group("l2"), |group, b| group.with_child(b)),
        )
        .with_child(Node::scalar("heartbeats", Value::UInt(8)));

    Node::group("/")
        .with_attr("created", Value::Str(created.to_string()))
        .with_child(first)
        .with_child(second)
}

fn write_demo(out: &Path) -> Result<(), ViewerError> {
    let tree = demo_tree(&fmt_ts(Utc::now()));
    write_container(out, &tree)?;
    debug!(path = %out.display(), "demo file written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_round_trips_through_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zsim.zsv");
        write_demo(&path).unwrap();

        let mut session = Session::new(ViewerConfig::default());
        session.open(&path).unwrap();
        assert_eq!(session.snapshots().len(), 2);
        assert_eq!(session.snapshots()[1].label(), "1: phase=2, time=4000");

        session.select(Selection::whole("core")).unwrap();
        assert_eq!(session.grid().rows.len(), 4);
        assert_eq!(session.grid().headers, vec!["instrs", "cycles", "ipc"]);

        session.select(Selection::whole("cache")).unwrap();
        session.advance().unwrap();
        assert!(session.selection().is_stale());
    }

    #[test]
    fn grid_lines_align_columns() {
        let mut session = Session::new(ViewerConfig::default().with_sum_row(true));
        session
            .install(zsimview_core::container::Container::from_tree(
                "demo.zsv",
                demo_tree("2026-01-01 00:00:00"),
                &ViewerConfig::default(),
            ))
            .unwrap();
        session.select(Selection::named("l2", "bank0")).unwrap();
        let lines = grid_lines(session.grid());
        assert!(lines[0].ends_with("hits  misses"));
        assert!(lines.iter().any(|l| l.starts_with("SUM")));
        assert!(lines.iter().any(|l| l.contains("900") && l.contains("100")));
    }

    #[test]
    fn placeholder_grid_prints_its_message() {
        let session = Session::new(ViewerConfig::default());
        assert_eq!(grid_lines(session.grid()), vec!["no file open".to_string()]);
    }
}
