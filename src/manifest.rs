//! JSON manifest written alongside each run's `.qrsdp` files. `format_version
//! "1.0"` covers a single security with no `securities` array; `"1.1"` adds a
//! `securities` summary array, positioned before `sessions`, for
//! multi-security runs.

use serde::{Deserialize, Serialize};

/// One security's headline parameters, for v1.1 manifests only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySummary {
    pub symbol: String,
    pub p0_ticks: i32,
}

/// One simulated trading day. `symbol` is only present in multi-security
/// manifests, in which case `filename` is `<symbol>/<date>.qrsdp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub date: String,
    pub seed: u64,
    pub filename: String,
    pub events: u64,
    pub open_ticks: i32,
    pub close_ticks: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: String,
    pub run_id: String,
    pub producer: String,
    pub base_seed: u64,
    pub seed_strategy: String,
    pub tick_size: u32,
    pub p0_ticks: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub securities: Option<Vec<SecuritySummary>>,
    pub sessions: Vec<SessionEntry>,
}

impl Manifest {
    pub fn single_security(
        run_id: String,
        base_seed: u64,
        tick_size: u32,
        p0_ticks: i32,
        sessions: Vec<SessionEntry>,
    ) -> Self {
        Manifest {
            format_version: "1.0".to_string(),
            run_id,
            producer: "qrsdp".to_string(),
            base_seed,
            seed_strategy: "sequential".to_string(),
            tick_size,
            p0_ticks,
            securities: None,
            sessions,
        }
    }

    pub fn multi_security(
        run_id: String,
        base_seed: u64,
        tick_size: u32,
        p0_ticks: i32,
        securities: Vec<SecuritySummary>,
        sessions: Vec<SessionEntry>,
    ) -> Self {
        Manifest {
            format_version: "1.1".to_string(),
            run_id,
            producer: "qrsdp".to_string(),
            base_seed,
            seed_strategy: "sequential".to_string(),
            tick_size,
            p0_ticks,
            securities: Some(securities),
            sessions,
        }
    }

    pub fn to_json_pretty(&self) -> crate::error::Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::error::QrsdpError::Configuration(format!("manifest serialize failed: {e}")))
    }

    pub fn write_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
