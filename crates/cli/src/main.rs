// cellmerge CLI - merge query results into spreadsheet snapshots

mod exit_codes;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use cellmerge_config::{ConfigError, ConnectionConfig, ConnectionKind, Settings};
use cellmerge_engine::address::coord_to_a1;
use cellmerge_engine::{
    col_to_index, extract_chart_data, extract_range, resolve_sheet, ChartDataRange, ColumnMapping,
    FormatKind, GrowthPolicy, MergeError, QueryExecutor, SheetSnapshot, WorkbookSnapshot,
};
use cellmerge_io::{read_snapshot, write_snapshot, FileExecutor, IoError};
use cellmerge_protocol::{handle_merge, ErrorResponse, MergeRequest, StartColumn};

use exit_codes::{merge_exit_code, EXIT_ERROR, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "cmerge")]
#[command(about = "Merge query results into spreadsheet workbook snapshots")]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/cellmerge/settings.toml)
    #[arg(long, global = true, env = "CELLMERGE_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). Logs go to stderr.
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a query and merge its rows into a sheet
    #[command(after_help = "\
Examples:
  cmerge merge book.json --sheet s1 --connection sales --query 'SELECT name, total FROM orders'
  cmerge merge book.json --sheet s1 --table orders.csv --start-row 1 --start-column C
  cmerge merge book.json --sheet s1 --table orders.csv --map total=D:currency --map name=A
  cmerge merge book.json --sheet s1 --table orders.csv --template-row 0 -o merged.json")]
    Merge {
        /// Workbook snapshot (JSON)
        snapshot: PathBuf,

        /// Destination sheet id
        #[arg(long)]
        sheet: String,

        /// Connection id from the settings registry
        #[arg(long, requires = "query", conflicts_with = "table")]
        connection: Option<String>,

        /// Query text (table name or SELECT <cols> FROM <table>)
        #[arg(long)]
        query: Option<String>,

        /// Read results directly from a CSV or JSON table file
        #[arg(long, value_name = "FILE")]
        table: Option<PathBuf>,

        /// Destination row of the first result row (0-based)
        #[arg(long, default_value_t = 0)]
        start_row: u32,

        /// First destination column for auto-mapping (index or letters)
        #[arg(long)]
        start_column: Option<String>,

        /// Row whose styles are copied onto written cells (0-based)
        #[arg(long)]
        template_row: Option<u32>,

        /// Explicit mapping SOURCE=DEST[:FORMAT]; DEST is letters or an index.
        /// Repeatable. Formats: currency, number, percentage, date
        #[arg(long = "map", value_name = "MAPPING")]
        mappings: Vec<String>,

        /// Write the merged snapshot here instead of printing the response
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Answer a merge request body (JSON) with a response or error body
    #[command(after_help = "\
Examples:
  cmerge serve-request request.json
  cat request.json | cmerge serve-request")]
    ServeRequest {
        /// Request file (omit or '-' to read stdin)
        input: Option<PathBuf>,
    },

    /// Print the values of a single-column range as JSON
    #[command(after_help = "\
Examples:
  cmerge extract book.json A1:A10
  cmerge extract book.json C2:C50 --sheet s2")]
    Extract {
        snapshot: PathBuf,

        /// A1-style range; only its first column is read
        range: String,

        /// Sheet id (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,
    },

    /// Print axis and series data for a chart as JSON
    #[command(after_help = "\
Examples:
  cmerge chart book.json --x-axis A2:A13 --series B2:B13 --series C2:C13")]
    Chart {
        snapshot: PathBuf,

        #[arg(long)]
        x_axis: String,

        /// Series range. Repeatable.
        #[arg(long)]
        series: Vec<String>,

        #[arg(long)]
        sheet: Option<String>,
    },

    /// Report a sheet's populated extent and declared size
    #[command(after_help = "\
Examples:
  cmerge bounds book.json --sheet s1
  cmerge bounds book.json --sheet s1 --fit -o sized.json")]
    Bounds {
        snapshot: PathBuf,

        #[arg(long)]
        sheet: Option<String>,

        /// Grow declared row/column counts to fit content plus margins
        #[arg(long)]
        fit: bool,

        /// With --fit, write the resized snapshot here (default: print it)
        #[arg(long, short = 'o', requires = "fit")]
        output: Option<PathBuf>,
    },

    /// Load a CSV file into a new single-sheet snapshot
    #[command(after_help = "\
Examples:
  cmerge import data.csv -o book.json
  cmerge import data.csv --sheet-name Orders")]
    Import {
        input: PathBuf,

        #[arg(long, default_value = "Sheet1")]
        sheet_name: String,

        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Write a sheet's values as CSV
    #[command(after_help = "\
Examples:
  cmerge export book.json out.csv --sheet s1
  cmerge export book.json out.tsv --delimiter '\\t'")]
    Export {
        snapshot: PathBuf,

        output: PathBuf,

        #[arg(long)]
        sheet: Option<String>,

        #[arg(long, default_value = ",")]
        delimiter: String,
    },

    /// List configured connections
    Connections {
        /// Check that each connection's directory is reachable
        #[arg(long)]
        test: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<MergeError> for CliError {
    fn from(e: MergeError) -> Self {
        let hint = match &e {
            MergeError::SheetNotFound(_) => Some("run `cmerge bounds <snapshot>` to list sheet ids".to_string()),
            MergeError::InvalidAddress(_) => Some("ranges look like A1:C10; rows start at 1".to_string()),
            _ => None,
        };
        Self { code: merge_exit_code(&e), message: e.to_string(), hint }
    }
}

impl From<IoError> for CliError {
    fn from(e: IoError) -> Self {
        Self::io(e.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::args(e.to_string()).with_hint(format!(
            "default settings path: {}",
            Settings::config_path().display()
        ))
    }
}

// ============================================================================
// main
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(log::LevelFilter::Info);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Debug);
        }
    }
    builder.format_timestamp(None).init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.config;
    match cli.command {
        Commands::Merge {
            snapshot,
            sheet,
            connection,
            query,
            table,
            start_row,
            start_column,
            template_row,
            mappings,
            output,
        } => cmd_merge(MergeArgs {
            config,
            snapshot,
            sheet,
            connection,
            query,
            table,
            start_row,
            start_column,
            template_row,
            mappings,
            output,
        }),
        Commands::ServeRequest { input } => cmd_serve_request(config, input),
        Commands::Extract { snapshot, range, sheet } => cmd_extract(snapshot, range, sheet),
        Commands::Chart { snapshot, x_axis, series, sheet } => cmd_chart(snapshot, x_axis, series, sheet),
        Commands::Bounds { snapshot, sheet, fit, output } => cmd_bounds(config, snapshot, sheet, fit, output),
        Commands::Import { input, sheet_name, output } => cmd_import(config, input, sheet_name, output),
        Commands::Export { snapshot, output, sheet, delimiter } => cmd_export(snapshot, output, sheet, delimiter),
        Commands::Connections { test, json } => cmd_connections(config, test, json),
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

fn load_settings(config: Option<&Path>) -> Result<Settings, CliError> {
    match config {
        Some(path) => Ok(Settings::from_path(path)?),
        None => Ok(Settings::load_or_default()),
    }
}

fn read_input(input: Option<&Path>) -> Result<String, CliError> {
    match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("{}: {e}", path.display()))),
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| CliError::io(format!("stdin: {e}")))?;
            Ok(buf)
        }
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::general(format!("failed to serialize output: {e}")))?;
    println!("{text}");
    Ok(())
}

/// Parse `SOURCE=DEST[:FORMAT]`.
fn parse_mapping_arg(arg: &str) -> Result<ColumnMapping, CliError> {
    let (source, target) = arg
        .rsplit_once('=')
        .ok_or_else(|| CliError::args(format!("invalid --map {arg:?}")).with_hint("expected SOURCE=DEST[:FORMAT]"))?;
    if source.is_empty() {
        return Err(CliError::args(format!("invalid --map {arg:?}: empty source column")));
    }

    let (dest, format) = match target.split_once(':') {
        Some((dest, fmt)) => {
            let kind = fmt.parse::<FormatKind>().map_err(|e| CliError::args(format!("invalid --map {arg:?}: {e}")))?;
            (dest, Some(kind))
        }
        None => (target, None),
    };

    let dest = dest.trim();
    let destination_column = if !dest.is_empty() && dest.chars().all(|c| c.is_ascii_digit()) {
        dest.parse::<i64>()
            .map_err(|_| CliError::args(format!("invalid --map {arg:?}: column out of range")))?
    } else {
        i64::from(col_to_index(dest)?)
    };

    let mut mapping = ColumnMapping::new(source, destination_column);
    mapping.format = format;
    Ok(mapping)
}

/// Ad hoc connection serving a single table file.
fn table_connection(path: &Path) -> Result<(ConnectionConfig, String), CliError> {
    let kind = match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("csv") => ConnectionKind::Csv,
        Some("json") => ConnectionKind::Json,
        _ => {
            return Err(CliError::args(format!("unsupported table file {}", path.display()))
                .with_hint("use a .csv or .json file"))
        }
    };
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| CliError::args(format!("invalid table file name {}", path.display())))?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let conn = ConnectionConfig {
        id: "table".to_string(),
        kind,
        path: dir,
        name: None,
    };
    Ok((conn, stem.to_string()))
}

// ============================================================================
// merge
// ============================================================================

struct MergeArgs {
    config: Option<PathBuf>,
    snapshot: PathBuf,
    sheet: String,
    connection: Option<String>,
    query: Option<String>,
    table: Option<PathBuf>,
    start_row: u32,
    start_column: Option<String>,
    template_row: Option<u32>,
    mappings: Vec<String>,
    output: Option<PathBuf>,
}

fn cmd_merge(args: MergeArgs) -> Result<(), CliError> {
    let settings = load_settings(args.config.as_deref())?;
    let column_mappings = args
        .mappings
        .iter()
        .map(|m| parse_mapping_arg(m))
        .collect::<Result<Vec<_>, _>>()?;

    let (executor, connection_id, query_text) = match (args.table, args.connection, args.query) {
        (Some(path), None, None) => {
            let (conn, table) = table_connection(&path)?;
            let id = conn.id.clone();
            (FileExecutor::new(vec![conn]), id, table)
        }
        (None, Some(connection), Some(query)) => {
            if settings.connection(&connection).is_none() {
                return Err(CliError::args(format!("unknown connection {connection:?}"))
                    .with_hint("run `cmerge connections` to list configured connections"));
            }
            (FileExecutor::from_settings(&settings), connection, query)
        }
        _ => {
            return Err(CliError::args("specify either --table FILE or --connection ID --query TEXT"));
        }
    };

    let request = MergeRequest {
        snapshot: read_snapshot(&args.snapshot)?,
        connection_id,
        query_text,
        data_start_row: args.start_row,
        sheet_id: args.sheet,
        column_mappings,
        start_column: args.start_column.map(StartColumn::Letters),
        style_template_row: args.template_row,
    };

    let response = handle_merge(&request, &executor, &settings.merge.merge_settings())?;

    match args.output {
        Some(path) => {
            write_snapshot(&path, &response.snapshot)?;
            eprintln!("merged {} rows into {}", response.row_count, path.display());
            Ok(())
        }
        None => print_json(&response),
    }
}

// ============================================================================
// serve-request
// ============================================================================

fn cmd_serve_request(config: Option<PathBuf>, input: Option<PathBuf>) -> Result<(), CliError> {
    let settings = load_settings(config.as_deref())?;
    let body = read_input(input.as_deref())?;

    let request: MergeRequest = match serde_json::from_str(&body) {
        Ok(r) => r,
        Err(e) => {
            let message = format!("malformed request: {e}");
            print_json(&ErrorResponse { error: message.clone(), kind: "bad_request".to_string() })?;
            return Err(CliError::args(message));
        }
    };

    let executor = FileExecutor::from_settings(&settings);
    match handle_merge(&request, &executor, &settings.merge.merge_settings()) {
        Ok(response) => print_json(&response),
        Err(e) => {
            print_json(&ErrorResponse::from(&e))?;
            Err(e.into())
        }
    }
}

// ============================================================================
// extract / chart
// ============================================================================

fn cmd_extract(snapshot: PathBuf, range: String, sheet: Option<String>) -> Result<(), CliError> {
    let workbook = read_snapshot(&snapshot)?;
    let values = extract_range(&workbook, sheet.as_deref(), &range)?;
    print_json(&values)
}

fn cmd_chart(snapshot: PathBuf, x_axis: String, series: Vec<String>, sheet: Option<String>) -> Result<(), CliError> {
    let workbook = read_snapshot(&snapshot)?;
    let ranges = ChartDataRange { x_axis, series };
    let data = extract_chart_data(&workbook, sheet.as_deref(), &ranges)?;
    print_json(&data)
}

// ============================================================================
// bounds
// ============================================================================

fn growth_policy(config: Option<&Path>) -> Result<GrowthPolicy, CliError> {
    Ok(load_settings(config)?.merge.merge_settings().growth)
}

fn sheet_summary(sheet: &SheetSnapshot) -> serde_json::Value {
    let bounds = sheet.bounds();
    serde_json::json!({
        "sheetId": sheet.id,
        "name": sheet.name,
        "maxRow": bounds.map(|b| b.max_row),
        "maxCol": bounds.map(|b| b.max_col),
        "lastCell": bounds.map(|b| coord_to_a1(b.max_row, b.max_col)),
        "rowCount": sheet.row_count,
        "columnCount": sheet.column_count,
        "cells": sheet.cell_data.cell_count(),
    })
}

fn cmd_bounds(
    config: Option<PathBuf>,
    snapshot: PathBuf,
    sheet: Option<String>,
    fit: bool,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let mut workbook = read_snapshot(&snapshot)?;

    if !fit {
        return match sheet {
            Some(id) => print_json(&sheet_summary(workbook.sheet(&id)?)),
            None => {
                let sheets: Vec<serde_json::Value> = workbook
                    .sheet_order
                    .iter()
                    .filter_map(|id| workbook.sheets.get(id))
                    .map(sheet_summary)
                    .collect();
                print_json(&sheets)
            }
        };
    }

    let policy = growth_policy(config.as_deref())?;
    let sheet_id = resolve_sheet(&workbook, sheet.as_deref())?.id.clone();
    let target = workbook.sheet_mut(&sheet_id)?;
    if target.grow_to_fit(&policy) {
        log::info!(
            "sheet {:?} resized to {} rows x {} columns",
            sheet_id,
            target.row_count.unwrap_or_default(),
            target.column_count.unwrap_or_default()
        );
    }

    match output {
        Some(path) => Ok(write_snapshot(&path, &workbook)?),
        None => print_json(&workbook),
    }
}

// ============================================================================
// import / export
// ============================================================================

fn cmd_import(
    config: Option<PathBuf>,
    input: PathBuf,
    sheet_name: String,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let policy = growth_policy(config.as_deref())?;
    let grid = cellmerge_io::csv::import_grid(&input)?;

    let mut sheet = SheetSnapshot::new("sheet-1", sheet_name);
    sheet.cell_data = grid;
    sheet.grow_to_fit(&policy);

    let workbook = WorkbookSnapshot::single_sheet("workbook-1", sheet);
    match output {
        Some(path) => Ok(write_snapshot(&path, &workbook)?),
        None => print_json(&workbook),
    }
}

fn parse_delimiter(s: &str) -> Result<u8, CliError> {
    match s {
        "\\t" | "tab" => Ok(b'\t'),
        _ if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        _ => Err(CliError::args(format!("invalid delimiter {s:?}")).with_hint("use a single ASCII character")),
    }
}

fn cmd_export(snapshot: PathBuf, output: PathBuf, sheet: Option<String>, delimiter: String) -> Result<(), CliError> {
    let delimiter = parse_delimiter(&delimiter)?;
    let workbook = read_snapshot(&snapshot)?;
    let sheet = resolve_sheet(&workbook, sheet.as_deref())?;
    cellmerge_io::csv::export_grid(&sheet.cell_data, &output, delimiter)?;
    Ok(())
}

// ============================================================================
// connections
// ============================================================================

fn cmd_connections(config: Option<PathBuf>, test: bool, json: bool) -> Result<(), CliError> {
    let settings = load_settings(config.as_deref())?;
    let executor = FileExecutor::from_settings(&settings);

    let statuses: Vec<Option<Result<(), String>>> = settings
        .connections
        .iter()
        .map(|c| test.then(|| executor.test_connection(&c.id).map_err(|e| e.to_string())))
        .collect();

    if json {
        let entries: Vec<serde_json::Value> = settings
            .connections
            .iter()
            .zip(&statuses)
            .map(|(c, status)| {
                let mut entry = serde_json::json!({
                    "id": c.id,
                    "name": c.display_name(),
                    "kind": c.kind,
                    "path": c.path,
                });
                if let Some(status) = status {
                    entry["ok"] = serde_json::json!(status.is_ok());
                    if let Err(e) = status {
                        entry["error"] = serde_json::json!(e);
                    }
                }
                entry
            })
            .collect();
        print_json(&entries)?;
    } else if settings.connections.is_empty() {
        eprintln!("no connections configured ({})", Settings::config_path().display());
    } else {
        for (c, status) in settings.connections.iter().zip(&statuses) {
            let state = match status {
                None => String::new(),
                Some(Ok(())) => "  ok".to_string(),
                Some(Err(e)) => format!("  FAILED: {e}"),
            };
            println!("{}\t{}\t{}\t{}{}", c.id, c.kind, c.path.display(), c.display_name(), state);
        }
    }

    let failed = statuses.iter().filter(|s| matches!(s, Some(Err(_)))).count();
    if failed > 0 {
        return Err(CliError {
            code: exit_codes::EXIT_UPSTREAM,
            message: format!("{failed} connection(s) unreachable"),
            hint: None,
        });
    }
    Ok(())
}
