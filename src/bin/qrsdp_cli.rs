//! Single-session generator: `qrsdp_cli <seed> <seconds> [output.qrsdp]`.

use anyhow::{Context, Result};
use clap::Parser;
use qrsdp::model;
use qrsdp::sink::BinaryFileSink;
use qrsdp::types::{ModelChoice, TradingSession};
use qrsdp::Producer;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "qrsdp_cli", about = "Generate one synthetic trading session")]
struct Args {
    /// RNG seed for this session.
    seed: u64,
    /// Session length in seconds.
    seconds: u32,
    /// Output `.qrsdp` path.
    #[arg(default_value = "session.qrsdp")]
    output: PathBuf,
    #[arg(long, default_value_t = 10_000)]
    p0: i32,
    #[arg(long, default_value_t = 5)]
    levels: u32,
    #[arg(long, default_value_t = 5)]
    depth: u32,
    /// Intensity model: `simple` or `curve`.
    #[arg(long, default_value = "simple")]
    model: String,
    /// Curve table JSON, used only when `--model curve`. Falls back to
    /// `CurveIntensity::defaults` when omitted.
    #[arg(long = "curve-table")]
    curve_table: Option<PathBuf>,
    /// Curve table depth cutoff, used only when `--curve-table` is omitted.
    #[arg(long, default_value_t = 50)]
    n_max: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let session = TradingSession {
        seed: args.seed,
        p0_ticks: args.p0,
        session_seconds: args.seconds,
        levels_per_side: args.levels,
        initial_depth: args.depth,
        ..TradingSession::default()
    };

    let model_choice = match args.model.as_str() {
        "simple" => ModelChoice::SimpleImbalance,
        "curve" => ModelChoice::CurveIntensity {
            curve_table_path: args.curve_table.clone(),
            n_max: args.n_max,
        },
        other => anyhow::bail!("unknown --model '{other}', expected 'simple' or 'curve'"),
    };
    let intensity_model = model::build(&model_choice, session.levels_per_side).context("building intensity model")?;

    let mut sink = BinaryFileSink::create(&args.output, &session)
        .with_context(|| format!("creating output file {}", args.output.display()))?;

    let result = Producer::run_session(session, intensity_model, &mut sink).context("running session")?;
    sink.close().context("closing output file")?;

    info!(
        events_written = result.events_written,
        close_ticks = result.close_ticks,
        output = %args.output.display(),
        "session complete"
    );
    Ok(())
}
