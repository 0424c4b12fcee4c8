//! Inspects a `.qrsdp` file: `qrsdp_log_info <file.qrsdp> [num_samples]`.

use anyhow::{Context, Result};
use clap::Parser;
use qrsdp::sink::EventLogReader;
use qrsdp::types::{EventType, Side};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "qrsdp_log_info", about = "Print header and sample records from a .qrsdp file")]
struct Args {
    file: PathBuf,
    #[arg(default_value_t = 5)]
    num_samples: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut reader = EventLogReader::open(&args.file).with_context(|| format!("opening {}", args.file.display()))?;

    println!("file: {}", args.file.display());
    println!("version: {}.{}", reader.header.version_major, reader.header.version_minor);
    println!("seed: {}", reader.header.seed);
    println!("p0_ticks: {}", reader.header.p0_ticks);
    println!("tick_size: {}", reader.header.tick_size);
    println!("session_seconds: {}", reader.header.session_seconds);
    println!("levels_per_side: {}", reader.header.levels_per_side);
    println!("initial_spread_ticks: {}", reader.header.initial_spread_ticks);
    println!("initial_depth: {}", reader.header.initial_depth);
    println!("chunk_capacity: {}", reader.header.chunk_capacity);
    println!("has_index: {}", reader.header.has_index());
    if let Some(n) = reader.chunk_count() {
        println!("chunk_count: {n}");
    } else {
        println!("chunk_count: unknown (no footer, falling back to sequential scan)");
    }

    let records = reader.read_all().context("reading records")?;
    println!("total_records: {}", records.len());

    for r in records.iter().take(args.num_samples) {
        let event_type = EventType::from_disk_byte(r.event_type)
            .map(|t| t.to_string())
            .unwrap_or_else(|| format!("unknown({})", r.event_type));
        let side = match Side::from_disk_byte(r.side) {
            Some(Side::Bid) => "BID",
            Some(Side::Ask) => "ASK",
            Some(Side::Na) => "NA",
            None => "unknown",
        };
        println!(
            "  ts_ns={} event_type={} side={} price_ticks={} qty={} order_id={}",
            r.ts_ns, event_type, side, r.price_ticks, r.qty, r.order_id
        );
    }
    Ok(())
}
