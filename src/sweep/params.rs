//! Parameter space: sweep inputs → concrete run descriptors.
//!
//! Everything here is pure. A sweep either resolves into a full list of
//! [`RunSpec`]s or fails with a configuration error before any process is
//! started.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{RunSpec, SweepConfig};
use crate::error::AppError;

/// Built-in generation times in milliseconds, matching the simulator's units.
const BUILTIN_PROTOCOLS: &[(&str, u64)] = &[("bitcoin", 600_000), ("ethereum", 15_000)];

/// One row of the protocol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolProfile {
    pub name: String,
    /// Expected mean time between blocks, in milliseconds.
    pub generation_time: u64,
}

/// Data-driven protocol → generation time lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolTable {
    profiles: Vec<ProtocolProfile>,
}

impl Default for ProtocolTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProtocolTable {
    pub fn builtin() -> Self {
        Self {
            profiles: BUILTIN_PROTOCOLS
                .iter()
                .map(|&(name, generation_time)| ProtocolProfile {
                    name: name.to_string(),
                    generation_time,
                })
                .collect(),
        }
    }

    /// Parse a JSON array of `{ "name": ..., "generation_time": ... }` rows.
    pub fn from_json(text: &str) -> Result<Self, AppError> {
        let profiles: Vec<ProtocolProfile> = serde_json::from_str(text)
            .map_err(|e| AppError::config(format!("Invalid protocol table JSON: {e}")))?;

        for p in &profiles {
            if p.name.trim().is_empty() {
                return Err(AppError::config("Protocol table row has an empty `name`."));
            }
            if p.generation_time == 0 {
                return Err(AppError::config(format!(
                    "Protocol `{}` has generation_time 0 (must be > 0).",
                    p.name
                )));
            }
        }

        Ok(Self {
            profiles: profiles
                .into_iter()
                .map(|p| ProtocolProfile {
                    name: normalize_protocol(&p.name),
                    generation_time: p.generation_time,
                })
                .collect(),
        })
    }

    /// Merge `other` into this table. Rows in `other` replace rows with the same name.
    pub fn extend(&mut self, other: ProtocolTable) {
        for row in other.profiles {
            match self.profiles.iter_mut().find(|p| p.name == row.name) {
                Some(existing) => existing.generation_time = row.generation_time,
                None => self.profiles.push(row),
            }
        }
    }

    pub fn generation_time(&self, protocol: &str) -> Option<u64> {
        let key = normalize_protocol(protocol);
        self.profiles
            .iter()
            .find(|p| p.name == key)
            .map(|p| p.generation_time)
    }

    /// Resolve the generation time for `protocol`, preferring `override_ms`.
    pub fn resolve(&self, protocol: &str, override_ms: Option<u64>) -> Result<u64, AppError> {
        if let Some(ms) = override_ms {
            if ms == 0 {
                return Err(AppError::config("`--generation-time` must be > 0."));
            }
            return Ok(ms);
        }

        self.generation_time(protocol).ok_or_else(|| {
            AppError::config(format!(
                "Unknown protocol `{protocol}` and no `--generation-time` override. Known protocols: {}.",
                self.names().join(", ")
            ))
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }
}

fn normalize_protocol(tag: &str) -> String {
    tag.trim().to_ascii_lowercase()
}

/// `trunc(delta_t * generation_time)`.
///
/// Truncation toward zero is deliberate and must not become rounding.
pub fn compute_delay(delta_t: f64, generation_time: u64) -> Result<u64, AppError> {
    if !(delta_t.is_finite() && delta_t > 0.0) {
        return Err(AppError::config(format!(
            "Invalid Δ/T value {delta_t} (must be finite and > 0)."
        )));
    }

    let product = delta_t * generation_time as f64;
    if !product.is_finite() || product >= u64::MAX as f64 {
        return Err(AppError::config(format!(
            "Δ/T {delta_t} × generation time {generation_time} does not fit a delay."
        )));
    }

    Ok(product.trunc() as u64)
}

/// Lossless text form of a Δ/T value, as used in artifact names.
///
/// Rust's float `Display` is the shortest string that parses back to the same
/// value and never switches to exponent notation.
pub fn format_delta(delta_t: f64) -> String {
    format!("{delta_t}")
}

/// Deterministic artifact path for one `(protocol, delta_t)` pair.
///
/// An empty protocol gives the unprefixed `<delta_t>.csv` layout. Sweeps
/// never produce it since they reject empty protocols.
pub fn artifact_path(output_dir: &Path, protocol: &str, delta_t: f64) -> PathBuf {
    let protocol = normalize_protocol(protocol);
    let delta = format_delta(delta_t);
    if protocol.is_empty() {
        output_dir.join(format!("{delta}.csv"))
    } else {
        output_dir.join(format!("{protocol}-{delta}.csv"))
    }
}

/// Build one [`RunSpec`] per Δ/T value, in input order.
pub fn build_run_specs(config: &SweepConfig, table: &ProtocolTable) -> Result<Vec<RunSpec>, AppError> {
    if config.delta_values.is_empty() {
        return Err(AppError::config("At least one Δ/T value is required."));
    }
    if config.num_nodes == 0 {
        return Err(AppError::config("`--num-nodes` must be > 0."));
    }
    if config.end_round == 0 {
        return Err(AppError::config("`--end-round` must be > 0."));
    }

    let protocol = normalize_protocol(&config.protocol);
    if protocol.is_empty() {
        return Err(AppError::config("`--protocol` must not be empty."));
    }
    let generation_time = table.resolve(&protocol, config.generation_time)?;

    let mut seen = HashSet::new();
    let mut specs = Vec::with_capacity(config.delta_values.len());

    for &delta_t in &config.delta_values {
        let delay = compute_delay(delta_t, generation_time)?;
        let output_path = artifact_path(&config.output_dir, &protocol, delta_t);

        if !seen.insert(output_path.clone()) {
            return Err(AppError::config(format!(
                "Duplicate Δ/T value {delta_t}: output '{}' would be written twice.",
                output_path.display()
            )));
        }

        specs.push(RunSpec {
            protocol: protocol.clone(),
            delta_t,
            delay,
            generation_time,
            num_nodes: config.num_nodes,
            end_round: config.end_round,
            output_path,
        });
    }

    Ok(specs)
}

/// Parse a comma-separated Δ/T list (`"0.001, 0.01,0.1"`).
pub fn parse_delta_list(text: &str) -> Result<Vec<f64>, String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|e| format!("Invalid Δ/T value '{s}': {e}"))
        })
        .collect()
}
