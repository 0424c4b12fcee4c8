//! C11: `SessionRunner` — orchestrates multi-day, multi-security runs:
//! business-day sequencing, per-security seed derivation, continuous
//! price-chaining across days, sink composition, and manifest writing.

use crate::calendar::{next_business_day, Date};
use crate::error::{QrsdpError, Result};
use crate::manifest::{Manifest, SecuritySummary, SessionEntry};
use crate::model;
use crate::producer::Producer;
use crate::sink::{BinaryFileSink, EventSink};
use crate::types::{RunConfig, SecurityConfig, TradingSession};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Per-security seed stride for multi-security runs, keeping each
/// security's per-day seed sequence from overlapping another's.
const SECURITY_SEED_STRIDE: u64 = 1024;

pub struct SessionRunner;

impl SessionRunner {
    /// Runs every security's full day sequence. Securities run in parallel
    /// (`std::thread::scope`); within a security, days run sequentially
    /// because each day's opening price is the previous day's close.
    pub fn run(cfg: &RunConfig, cancel: &AtomicBool) -> Result<Manifest> {
        std::fs::create_dir_all(&cfg.output_dir)?;

        let results: Vec<Result<Vec<SessionEntry>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = cfg
                .securities
                .iter()
                .enumerate()
                .map(|(idx, security)| {
                    scope.spawn(move || Self::run_security(cfg, security, idx, cancel))
                })
                .collect();
            handles.into_iter().map(|h| h.join().expect("security thread panicked")).collect()
        });

        let mut sessions = Vec::new();
        for r in results {
            sessions.extend(r?);
        }

        let run_id = format!("qrsdp-{}-{}", cfg.base_seed, cfg.start_date);
        let manifest = if cfg.securities.len() == 1 {
            Manifest::single_security(run_id, cfg.base_seed, cfg.tick_size, cfg.p0_ticks, sessions)
        } else {
            let securities = cfg
                .securities
                .iter()
                .map(|s| SecuritySummary {
                    symbol: s.symbol.clone(),
                    p0_ticks: s.template.p0_ticks,
                })
                .collect();
            Manifest::multi_security(run_id, cfg.base_seed, cfg.tick_size, cfg.p0_ticks, securities, sessions)
        };

        let manifest_path = cfg.output_dir.join("manifest.json");
        manifest.write_to_file(&manifest_path)?;
        Ok(manifest)
    }

    fn run_security(
        cfg: &RunConfig,
        security: &SecurityConfig,
        security_index: usize,
        cancel: &AtomicBool,
    ) -> Result<Vec<SessionEntry>> {
        let multi_security = cfg.securities.len() > 1;
        let security_dir = cfg.output_dir.join(&security.symbol);
        std::fs::create_dir_all(&security_dir)?;

        let seed_base = if multi_security {
            cfg.base_seed + security_index as u64 * SECURITY_SEED_STRIDE
        } else {
            cfg.base_seed
        };

        let mut date = Date::parse(&cfg.start_date)?;
        let mut p0_ticks = security.template.p0_ticks;
        let mut sessions = Vec::with_capacity(cfg.num_days as usize);

        for d in 0..cfg.num_days {
            if cancel.load(Ordering::Relaxed) {
                info!(symbol = %security.symbol, day = d, "cancellation observed, stopping security run early");
                break;
            }

            let seed = seed_base + d as u64;
            let session = TradingSession {
                seed,
                p0_ticks,
                ..security.template.clone()
            };

            let file_name = format!("{}.qrsdp", date.to_iso());
            let file_path = security_dir.join(&file_name);

            let mut sink: Box<dyn EventSink> = Box::new(BinaryFileSink::create(&file_path, &session)?);
            let intensity_model = model::build(&security.model, session.levels_per_side)?;

            let result = if cfg.realtime {
                Self::run_realtime(session.clone(), intensity_model, sink.as_mut(), cfg.speed_multiplier, cancel)?
            } else {
                Self::run_batch(session.clone(), intensity_model, sink.as_mut())?
            };
            sink.close()?;

            sessions.push(SessionEntry {
                symbol: multi_security.then(|| security.symbol.clone()),
                date: date.to_iso(),
                seed,
                filename: if multi_security {
                    format!("{}/{}", security.symbol, file_name)
                } else {
                    file_name.clone()
                },
                events: result.events_written,
                open_ticks: p0_ticks,
                close_ticks: result.close_ticks,
            });

            p0_ticks = result.close_ticks;
            date = next_business_day(date);
        }

        Ok(sessions)
    }

    fn run_batch(
        session: TradingSession,
        model: Box<dyn crate::model::IntensityModel>,
        sink: &mut dyn EventSink,
    ) -> Result<crate::producer::SessionResult> {
        Producer::run_session(session, model, sink)
    }

    /// Paces event emission to wall-clock time, scaled by `speed_multiplier`
    /// (1.0 = real time, higher = faster-than-real-time), checking `cancel`
    /// between events so a run can be interrupted mid-day.
    fn run_realtime(
        session: TradingSession,
        model: Box<dyn crate::model::IntensityModel>,
        sink: &mut dyn EventSink,
        speed_multiplier: f64,
        cancel: &AtomicBool,
    ) -> Result<crate::producer::SessionResult> {
        if speed_multiplier <= 0.0 {
            return Err(QrsdpError::Configuration("speed_multiplier must be positive".into()));
        }
        let mut producer = Producer::start_session(session, model);
        let wall_start = std::time::Instant::now();
        while producer.step_one_event(sink)? {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            let target_wall = producer.elapsed_seconds() / speed_multiplier;
            let elapsed = wall_start.elapsed().as_secs_f64();
            if target_wall > elapsed {
                std::thread::sleep(std::time::Duration::from_secs_f64(target_wall - elapsed));
            }
        }
        sink.flush()?;
        Ok(crate::producer::SessionResult {
            close_ticks: producer.close_ticks(),
            events_written: producer.events_written(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelChoice;

    fn base_security(symbol: &str) -> SecurityConfig {
        SecurityConfig {
            symbol: symbol.to_string(),
            template: TradingSession {
                seed: 0,
                p0_ticks: 10_000,
                session_seconds: 5,
                levels_per_side: 3,
                tick_size: 100,
                initial_spread_ticks: 2,
                initial_depth: 5,
                market_open_ns: 0,
                chunk_capacity: 64,
            },
            model: ModelChoice::SimpleImbalance,
        }
    }

    #[test]
    fn single_security_run_writes_manifest_and_chains_prices() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RunConfig {
            base_seed: 1,
            output_dir: dir.path().to_path_buf(),
            start_date: "2026-01-02".to_string(),
            num_days: 3,
            tick_size: 100,
            p0_ticks: 10_000,
            securities: vec![base_security("AAPL")],
            realtime: false,
            speed_multiplier: 1.0,
        };
        let cancel = AtomicBool::new(false);
        let manifest = SessionRunner::run(&cfg, &cancel).unwrap();
        assert_eq!(manifest.format_version, "1.0");
        assert!(manifest.securities.is_none());
        assert_eq!(manifest.sessions.len(), 3);
        // business days from 2026-01-02 (Fri): next is Mon 01-05, then Tue 01-06.
        assert_eq!(manifest.sessions[0].date, "2026-01-02");
        assert_eq!(manifest.sessions[1].date, "2026-01-05");
        assert_eq!(manifest.sessions[2].date, "2026-01-06");
        assert_eq!(manifest.sessions[0].filename, "2026-01-02.qrsdp");
        assert!(manifest.sessions[0].symbol.is_none());
        // price chaining: each day's open equals the previous day's close.
        assert_eq!(manifest.sessions[1].open_ticks, manifest.sessions[0].close_ticks);
        assert_eq!(manifest.sessions[2].open_ticks, manifest.sessions[1].close_ticks);
        assert!(dir.path().join("manifest.json").exists());
        assert!(dir.path().join("AAPL/2026-01-02.qrsdp").exists());
    }

    #[test]
    fn multi_security_run_uses_strided_seeds_and_version_1_1() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RunConfig {
            base_seed: 100,
            output_dir: dir.path().to_path_buf(),
            start_date: "2026-01-02".to_string(),
            num_days: 1,
            tick_size: 100,
            p0_ticks: 10_000,
            securities: vec![base_security("AAPL"), base_security("MSFT")],
            realtime: false,
            speed_multiplier: 1.0,
        };
        let cancel = AtomicBool::new(false);
        let manifest = SessionRunner::run(&cfg, &cancel).unwrap();
        assert_eq!(manifest.format_version, "1.1");
        let securities = manifest.securities.as_ref().unwrap();
        assert_eq!(securities.len(), 2);
        assert_eq!(manifest.sessions.len(), 2);
        let aapl = manifest.sessions.iter().find(|s| s.symbol.as_deref() == Some("AAPL")).unwrap();
        let msft = manifest.sessions.iter().find(|s| s.symbol.as_deref() == Some("MSFT")).unwrap();
        assert_eq!(aapl.seed, 100);
        assert_eq!(msft.seed, 100 + SECURITY_SEED_STRIDE);
        assert_eq!(aapl.filename, "AAPL/2026-01-02.qrsdp");

        let json = manifest.to_json_pretty().unwrap();
        let securities_pos = json.find("\"securities\"").unwrap();
        let sessions_pos = json.find("\"sessions\"").unwrap();
        assert!(securities_pos < sessions_pos);
    }

    #[test]
    fn cancellation_stops_remaining_days_early() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RunConfig {
            base_seed: 1,
            output_dir: dir.path().to_path_buf(),
            start_date: "2026-01-02".to_string(),
            num_days: 5,
            tick_size: 100,
            p0_ticks: 10_000,
            securities: vec![base_security("AAPL")],
            realtime: false,
            speed_multiplier: 1.0,
        };
        let cancel = AtomicBool::new(true);
        let manifest = SessionRunner::run(&cfg, &cancel).unwrap();
        assert_eq!(manifest.sessions.len(), 0);
    }

    #[test]
    fn rejects_non_positive_speed_multiplier_in_realtime_mode() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RunConfig {
            base_seed: 1,
            output_dir: dir.path().to_path_buf(),
            start_date: "2026-01-02".to_string(),
            num_days: 1,
            tick_size: 100,
            p0_ticks: 10_000,
            securities: vec![base_security("AAPL")],
            realtime: true,
            speed_multiplier: 0.0,
        };
        let cancel = AtomicBool::new(false);
        assert!(SessionRunner::run(&cfg, &cancel).is_err());
    }
}
