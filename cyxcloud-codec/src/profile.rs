//! Codec profiles
//!
//! A `Profile` is the string key/value map handed over by the configuration
//! layer. `CodecConfig::from_profile` reads it once and validates it; the codec
//! never keeps the profile itself.

use crate::error::InitError;
use crate::gf::FIELD_SIZE;
use crate::{
    DEFAULT_CHUNK_ALIGNMENT, DEFAULT_CODING_CHUNKS, DEFAULT_DATA_CHUNKS, MAX_CHUNK_ALIGNMENT,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

pub const KEY_K: &str = "k";
pub const KEY_M: &str = "m";
pub const KEY_PLUGIN: &str = "plugin";
pub const KEY_FAILURE_DOMAIN: &str = "ruleset-failure-domain";
pub const KEY_CHUNK_ALIGNMENT: &str = "chunk-alignment";

/// Key/value codec profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(BTreeMap<String, String>);

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Profile {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Validated codec configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Number of data chunks (k)
    pub data_chunks: usize,
    /// Number of coding chunks (m)
    pub coding_chunks: usize,
    /// Per-chunk payload sizes are rounded up to a multiple of this
    pub chunk_alignment: usize,
    /// Plugin name, informational only
    pub plugin: Option<String>,
    /// Failure domain, forwarded to placement and unused by the codec
    pub failure_domain: Option<String>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            data_chunks: DEFAULT_DATA_CHUNKS,
            coding_chunks: DEFAULT_CODING_CHUNKS,
            chunk_alignment: DEFAULT_CHUNK_ALIGNMENT,
            plugin: None,
            failure_domain: None,
        }
    }
}

impl CodecConfig {
    /// Create a config with the default alignment
    pub fn new(data_chunks: usize, coding_chunks: usize) -> Result<Self, InitError> {
        let config = Self {
            data_chunks,
            coding_chunks,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a profile.
    ///
    /// On failure a one-line explanation is written to `diagnostics`.
    pub fn from_profile(
        profile: &Profile,
        diagnostics: &mut dyn fmt::Write,
    ) -> Result<Self, InitError> {
        let result = Self::parse(profile).and_then(|config| {
            config.validate()?;
            Ok(config)
        });

        if let Err(InitError::InvalidConfig(ref msg)) = result {
            tracing::warn!(reason = %msg, "Rejected codec profile");
            // The sink is best effort; the error is returned either way.
            let _ = writeln!(diagnostics, "{}", msg);
        }
        result
    }

    fn parse(profile: &Profile) -> Result<Self, InitError> {
        let k = parse_int(profile, KEY_K)?.ok_or_else(|| missing(KEY_K))?;
        let m = parse_int(profile, KEY_M)?.ok_or_else(|| missing(KEY_M))?;
        let alignment = parse_int(profile, KEY_CHUNK_ALIGNMENT)?
            .unwrap_or(DEFAULT_CHUNK_ALIGNMENT as i64);

        if k <= 0 {
            return Err(InitError::InvalidConfig(format!(
                "{}={} must be a positive integer",
                KEY_K, k
            )));
        }
        if m < 0 {
            return Err(InitError::InvalidConfig(format!(
                "{}={} must be a non-negative integer",
                KEY_M, m
            )));
        }
        if alignment <= 0 {
            return Err(InitError::InvalidConfig(format!(
                "{}={} must be a positive integer",
                KEY_CHUNK_ALIGNMENT, alignment
            )));
        }

        Ok(Self {
            data_chunks: to_usize(k, KEY_K)?,
            coding_chunks: to_usize(m, KEY_M)?,
            chunk_alignment: to_usize(alignment, KEY_CHUNK_ALIGNMENT)?,
            plugin: profile.get(KEY_PLUGIN).map(str::to_string),
            failure_domain: profile.get(KEY_FAILURE_DOMAIN).map(str::to_string),
        })
    }

    /// Check the structural limits: `k > 0`, alignment a power of two up to
    /// `MAX_CHUNK_ALIGNMENT`, `k + m <= 256`.
    pub fn validate(&self) -> Result<(), InitError> {
        if self.data_chunks == 0 {
            return Err(InitError::InvalidConfig(
                "data chunk count must be > 0".to_string(),
            ));
        }
        let alignment = self.chunk_alignment;
        if !alignment.is_power_of_two() || alignment > MAX_CHUNK_ALIGNMENT {
            return Err(InitError::InvalidConfig(format!(
                "chunk alignment {} must be a power of two no larger than {}",
                alignment, MAX_CHUNK_ALIGNMENT
            )));
        }
        let total = self.data_chunks.saturating_add(self.coding_chunks);
        if total > FIELD_SIZE {
            return Err(InitError::InvalidConfig(format!(
                "k + m = {} exceeds the GF(256) limit of {} chunks",
                total, FIELD_SIZE
            )));
        }
        Ok(())
    }

    /// Total number of chunks (k + m)
    pub fn chunk_count(&self) -> usize {
        self.data_chunks + self.coding_chunks
    }

    /// Storage overhead ratio (m / k)
    pub fn overhead_ratio(&self) -> f64 {
        self.coding_chunks as f64 / self.data_chunks as f64
    }

    /// Maximum number of lost chunks that can be tolerated
    pub fn max_failures(&self) -> usize {
        self.coding_chunks
    }
}

fn missing(key: &str) -> InitError {
    InitError::InvalidConfig(format!("missing required profile key '{}'", key))
}

fn parse_int(profile: &Profile, key: &str) -> Result<Option<i64>, InitError> {
    match profile.get(key).map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse::<i64>().map(Some).map_err(|e| {
            InitError::InvalidConfig(format!("could not convert {}={} to int: {}", key, raw, e))
        }),
    }
}

fn to_usize(value: i64, key: &str) -> Result<usize, InitError> {
    usize::try_from(value)
        .map_err(|_| InitError::InvalidConfig(format!("{}={} is out of range", key, value)))
}
