//! Multi-day, multi-security run driver.
//!
//! `qrsdp_run --seed N --days N [--seconds N] [--p0 ticks] [--output dir]
//!     [--start-date YYYY-MM-DD] [--chunk-size N] [--depth N] [--levels N]
//!     [--securities SYM:P0,...] [--model simple|curve] [--curve-table PATH]
//!     [--realtime] [--speed F]`

use anyhow::{bail, Context, Result};
use clap::Parser;
use qrsdp::types::{ModelChoice, RunConfig, SecurityConfig, TradingSession};
use qrsdp::SessionRunner;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "qrsdp_run", about = "Generate a multi-day synthetic market-data run")]
struct Args {
    #[arg(long)]
    seed: u64,
    #[arg(long)]
    days: u32,
    #[arg(long, default_value_t = 23_400)]
    seconds: u32,
    #[arg(long, default_value_t = 10_000)]
    p0: i32,
    #[arg(long, default_value = "./out")]
    output: PathBuf,
    #[arg(long = "start-date")]
    start_date: String,
    #[arg(long = "chunk-size", default_value_t = 4096)]
    chunk_size: u32,
    #[arg(long, default_value_t = 5)]
    depth: u32,
    #[arg(long, default_value_t = 5)]
    levels: u32,
    #[arg(long, default_value_t = 100)]
    tick_size: u32,
    /// Comma-separated `SYMBOL:P0_TICKS` pairs; defaults to a single
    /// `SIM0` security at `--p0` if omitted.
    #[arg(long)]
    securities: Option<String>,
    /// Intensity model every security uses: `simple` or `curve`.
    #[arg(long, default_value = "simple")]
    model: String,
    /// Curve table JSON, used only when `--model curve`. Falls back to
    /// `CurveIntensity::defaults` when omitted.
    #[arg(long = "curve-table")]
    curve_table: Option<PathBuf>,
    /// Curve table depth cutoff, used only when `--curve-table` is omitted.
    #[arg(long, default_value_t = 50)]
    n_max: usize,
    #[arg(long, default_value_t = false)]
    realtime: bool,
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
}

fn parse_model_choice(name: &str, curve_table: Option<PathBuf>, n_max: usize) -> Result<ModelChoice> {
    match name {
        "simple" => Ok(ModelChoice::SimpleImbalance),
        "curve" => Ok(ModelChoice::CurveIntensity {
            curve_table_path: curve_table,
            n_max,
        }),
        other => bail!("unknown --model '{other}', expected 'simple' or 'curve'"),
    }
}

fn parse_securities(
    spec: &str,
    default_template: &TradingSession,
    model: &ModelChoice,
) -> Result<Vec<SecurityConfig>> {
    let mut out = Vec::new();
    for entry in spec.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (symbol, p0_str) = entry
            .split_once(':')
            .with_context(|| format!("security entry '{entry}' must be SYMBOL:P0_TICKS"))?;
        let p0_ticks: i32 = p0_str
            .parse()
            .with_context(|| format!("invalid p0 ticks in security entry '{entry}'"))?;
        out.push(SecurityConfig {
            symbol: symbol.to_string(),
            template: TradingSession {
                p0_ticks,
                ..default_template.clone()
            },
            model: model.clone(),
        });
    }
    if out.is_empty() {
        bail!("--securities must name at least one SYMBOL:P0_TICKS pair");
    }
    Ok(out)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let template = TradingSession {
        seed: args.seed,
        p0_ticks: args.p0,
        session_seconds: args.seconds,
        levels_per_side: args.levels,
        tick_size: args.tick_size,
        initial_depth: args.depth,
        chunk_capacity: args.chunk_size,
        ..TradingSession::default()
    };

    let model_choice = parse_model_choice(&args.model, args.curve_table.clone(), args.n_max)?;

    let securities = match &args.securities {
        Some(spec) => parse_securities(spec, &template, &model_choice)?,
        None => vec![SecurityConfig {
            symbol: "SIM0".to_string(),
            template: template.clone(),
            model: model_choice,
        }],
    };

    let cfg = RunConfig {
        base_seed: args.seed,
        output_dir: args.output.clone(),
        start_date: args.start_date,
        num_days: args.days,
        tick_size: args.tick_size,
        p0_ticks: args.p0,
        securities,
        realtime: args.realtime,
        speed_multiplier: args.speed,
    };

    let cancel = AtomicBool::new(false);
    let manifest = SessionRunner::run(&cfg, &cancel).context("running session batch")?;

    info!(
        sessions = manifest.sessions.len(),
        format_version = %manifest.format_version,
        output = %args.output.display(),
        "run complete"
    );
    Ok(())
}
