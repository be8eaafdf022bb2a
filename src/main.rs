use anyhow::{bail, Context, Result};
use depth_analyzer::config::{AnalyzerConfig, SensitivityConfig, SensitivityLevel};
use depth_analyzer::depth::{DepthAnalyzer, DepthSnapshot};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let options = parse_args(&args)?;

    // Logs go to stderr, stdout carries one JSON result per line
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut config = AnalyzerConfig::from_env().context("Failed to load analyzer configuration")?;
    if !options.notionals.is_empty() {
        config.slippage_notionals = options.notionals.clone();
    }

    let sensitivity = SensitivityConfig::new(
        options.signal_sensitivity.unwrap_or(config.sensitivity.signal_sensitivity),
        options
            .liquidity_sensitivity
            .unwrap_or(config.sensitivity.liquidity_sensitivity),
    );

    let snapshots = load_snapshots(&options.snapshot_path)?;
    let mut analyzer = DepthAnalyzer::new(config)?;
    if let Some(symbol) = &options.symbol {
        analyzer = analyzer.with_symbol(symbol.to_uppercase());
    }

    tracing::info!(
        snapshots = snapshots.len(),
        symbol = analyzer.symbol().unwrap_or("-"),
        depth = analyzer.config().analysis_depth,
        notionals = analyzer.config().slippage_notionals.len(),
        signal_sensitivity = %sensitivity.signal_sensitivity,
        liquidity_sensitivity = %sensitivity.liquidity_sensitivity,
        "Replaying depth snapshots"
    );

    let mut discarded = 0usize;
    for (index, snapshot) in snapshots.iter().enumerate() {
        match analyzer.analyze(snapshot, &sensitivity) {
            Ok(result) => {
                let line = if options.pretty {
                    serde_json::to_string_pretty(&result)?
                } else {
                    serde_json::to_string(&result)?
                };
                println!("{}", line);
            }
            Err(e) => {
                discarded += 1;
                tracing::warn!(index, error = %e, kind = e.error_type(), "No analysis for snapshot");
            }
        }
    }

    tracing::info!(
        analyzed = snapshots.len() - discarded,
        discarded,
        history_len = analyzer.history().len(),
        "Done"
    );

    Ok(())
}

/// Parsed command-line options
#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    snapshot_path: String,
    symbol: Option<String>,
    signal_sensitivity: Option<SensitivityLevel>,
    liquidity_sensitivity: Option<SensitivityLevel>,
    notionals: Vec<Decimal>,
    pretty: bool,
}

/// Parse command-line arguments
fn parse_args(args: &[String]) -> Result<CliOptions> {
    let mut options = CliOptions::default();
    let mut snapshot_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--snapshot" => snapshot_path = Some(next_value(args, &mut i)?.to_string()),
            "--symbol" => options.symbol = Some(next_value(args, &mut i)?.to_string()),
            "--signal-sensitivity" => {
                options.signal_sensitivity = Some(parse_level(next_value(args, &mut i)?)?)
            }
            "--liquidity-sensitivity" => {
                options.liquidity_sensitivity = Some(parse_level(next_value(args, &mut i)?)?)
            }
            "--notional" => {
                let raw = next_value(args, &mut i)?;
                let notional = Decimal::from_str(raw)
                    .with_context(|| format!("Invalid --notional value: {}", raw))?;
                options.notionals.push(notional);
            }
            "--pretty" => options.pretty = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                print_usage();
                bail!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    match snapshot_path {
        Some(path) => options.snapshot_path = path,
        None => {
            print_usage();
            bail!("--snapshot is required");
        }
    }

    Ok(options)
}

fn next_value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .with_context(|| format!("{} requires a value", flag))
}

fn parse_level(raw: &str) -> Result<SensitivityLevel> {
    let value: u8 = raw
        .parse()
        .with_context(|| format!("Sensitivity must be a number between 1 and 5, got {}", raw))?;
    Ok(SensitivityLevel::try_from(value)?)
}

/// Snapshot file content: a single snapshot or an ordered list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotInput {
    Many(Vec<DepthSnapshot>),
    One(DepthSnapshot),
}

/// Load and normalize snapshots from a JSON file, or stdin when `path` is "-"
fn load_snapshots(path: &str) -> Result<Vec<DepthSnapshot>> {
    let raw = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read snapshots from stdin")?;
        buf
    } else {
        std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("Failed to read snapshot file {}", path))?
    };

    parse_snapshots(&raw)
}

fn parse_snapshots(raw: &str) -> Result<Vec<DepthSnapshot>> {
    let input: SnapshotInput =
        serde_json::from_str(raw).context("Snapshot JSON is neither a snapshot nor a list of snapshots")?;

    let snapshots = match input {
        SnapshotInput::Many(list) => list,
        SnapshotInput::One(snapshot) => vec![snapshot],
    };

    Ok(snapshots.into_iter().map(DepthSnapshot::normalized).collect())
}

/// Print usage information
fn print_usage() {
    println!("depth-analyzer - order book microstructure analysis over depth snapshots");
    println!();
    println!("USAGE:");
    println!("    depth-analyzer --snapshot <FILE> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --snapshot <FILE>                JSON snapshot or array of snapshots (\"-\" for stdin)");
    println!("    --symbol <SYMBOL>                Symbol to tag results with");
    println!("    --signal-sensitivity <1-5>       Signal strictness (default: 3)");
    println!("    --liquidity-sensitivity <1-5>    Minimum liquidity strictness (default: 3)");
    println!("    --notional <AMOUNT>              Slippage notional, repeatable (default: 10000 25000 50000)");
    println!("    --pretty                         Pretty-print JSON output");
    println!("    --help, -h                       Print this help message");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    ANALYZER_DEPTH_LEVELS              Levels per side analyzed (default: 20)");
    println!("    ANALYZER_WALL_MULTIPLIER           Wall threshold vs average level size (default: 4.0)");
    println!("    ANALYZER_MAX_WALLS                 Walls reported per side (default: 3)");
    println!("    ANALYZER_HISTORY_WINDOW_SECS       Rolling history window (default: 300)");
    println!("    ANALYZER_HISTORY_MIN_SPACING_SECS  Minimum gap between history entries (default: 2)");
    println!("    ANALYZER_SLIPPAGE_NOTIONALS        Comma-separated notionals (default: 10000,25000,50000)");
    println!("    ANALYZER_SIGNAL_SENSITIVITY        Default signal sensitivity (default: 3)");
    println!("    ANALYZER_LIQUIDITY_SENSITIVITY     Default liquidity sensitivity (default: 3)");
    println!("    RUST_LOG                           Logging level (default: info)");
}
