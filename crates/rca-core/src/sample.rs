//! Sample lines: `key=value` pairs separated by commas, e.g.
//! `t_e=2,t_s=1,HW=1,DG=0,P=false,`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{TIME_ENV_KEY, TIME_SYS_KEY};
use crate::error::SampleError;
use crate::signature::{Signature, Value};

/// Key names and renames used to read a sample line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleFormat {
    pub time_env_key: String,
    pub time_sys_key: String,
    /// Variable name to the key it is read from, for logs whose keys differ
    /// from the contract's names.
    pub variable_map: BTreeMap<String, String>,
}

impl Default for SampleFormat {
    fn default() -> Self {
        Self {
            time_env_key: TIME_ENV_KEY.to_string(),
            time_sys_key: TIME_SYS_KEY.to_string(),
            variable_map: BTreeMap::new(),
        }
    }
}

impl SampleFormat {
    fn key_for<'a>(&'a self, name: &'a str) -> &'a str {
        self.variable_map.get(name).map_or(name, String::as_str)
    }
}

/// One observation: elapsed time of both phases plus a typed valuation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub delta_env: u64,
    pub delta_sys: u64,
    pub values: BTreeMap<String, Value>,
}

impl Sample {
    pub fn new(delta_env: u64, delta_sys: u64) -> Self {
        Self {
            delta_env,
            delta_sys,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    /// Parse one line against `signature`. Keys not named by the signature
    /// or the format are ignored.
    pub fn parse(line: &str, signature: &Signature, format: &SampleFormat) -> Result<Self, SampleError> {
        let pairs = parse_pairs(line)?;
        let delta = |key: &str| -> Result<u64, SampleError> {
            let raw = pairs
                .get(key)
                .ok_or_else(|| SampleError::MissingTime(key.to_string()))?;
            raw.parse().map_err(|_| SampleError::InvalidValue {
                name: key.to_string(),
                raw: raw.to_string(),
            })
        };
        let mut sample = Sample::new(delta(&format.time_env_key)?, delta(&format.time_sys_key)?);
        for var in signature.observed() {
            let raw = pairs
                .get(format.key_for(&var.name))
                .ok_or_else(|| SampleError::MissingVariable(var.name.clone()))?;
            let value = var.ty.parse(raw).ok_or_else(|| SampleError::InvalidValue {
                name: var.name.clone(),
                raw: raw.to_string(),
            })?;
            sample.values.insert(var.name.clone(), value);
        }
        Ok(sample)
    }

    /// Render back to the line form, time keys first.
    pub fn to_line(&self, format: &SampleFormat) -> String {
        let mut line = format!(
            "{}={},{}={},",
            format.time_env_key, self.delta_env, format.time_sys_key, self.delta_sys
        );
        for (name, value) in &self.values {
            line.push_str(&format!("{}={value},", format.key_for(name)));
        }
        line
    }
}

/// Split a line into its `key=value` pairs. Empty fragments (trailing comma,
/// blank line) are skipped.
pub fn parse_pairs(line: &str) -> Result<BTreeMap<&str, &str>, SampleError> {
    let mut pairs = BTreeMap::new();
    for part in line.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| SampleError::Malformed(part.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(SampleError::Malformed(part.to_string()));
        }
        pairs.insert(key, value.trim());
    }
    Ok(pairs)
}
