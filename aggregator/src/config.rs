//! Round configuration.
//!
//! Loaded from JSON, then optionally overridden from the environment:
//!
//! | variable                 | field                |
//! |--------------------------|----------------------|
//! | `AGG_CLIENTS`            | `clients`            |
//! | `AGG_CORRUPTED`          | `corrupted`          |
//! | `AGG_SECURITY_PARAMETER` | `security_parameter` |
//! | `AGG_MAX_SAMPLED_PROOFS` | `max_sampled_proofs` |

use crate::errors::AggregatorError;
use serde::{Deserialize, Serialize};
use shuffle_proofs::constants::{DEFAULT_MAX_SAMPLED_PROOFS, DEFAULT_SECURITY_PARAMETER};
use shuffle_proofs::padding::dummy_count;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Variant {
    /// Each client proves its secret is at most `threshold`; the server learns the sum.
    Sum { threshold: u64, shares_per_client: usize },
    /// Each client submits a ranking; the server learns the pairwise tally.
    Vote { candidates: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub clients: usize,
    #[serde(default)]
    pub corrupted: usize,
    #[serde(default = "default_security_parameter")]
    pub security_parameter: u64,
    #[serde(default = "default_max_sampled_proofs")]
    pub max_sampled_proofs: usize,
    /// Skips the dummy bound when set.
    #[serde(default)]
    pub dummies_per_client: Option<usize>,
    pub variant: Variant,
    /// Directory for cached proving/verifying keys. In-memory only when unset.
    #[serde(default)]
    pub key_dir: Option<PathBuf>,
}

fn default_security_parameter() -> u64 {
    DEFAULT_SECURITY_PARAMETER
}

fn default_max_sampled_proofs() -> usize {
    DEFAULT_MAX_SAMPLED_PROOFS
}

impl ProtocolConfig {
    pub fn new(clients: usize, variant: Variant) -> Self {
        Self {
            clients,
            corrupted: 0,
            security_parameter: DEFAULT_SECURITY_PARAMETER,
            max_sampled_proofs: DEFAULT_MAX_SAMPLED_PROOFS,
            dummies_per_client: None,
            variant,
            key_dir: None,
        }
    }

    pub fn sum(clients: usize, threshold: u64, shares_per_client: usize) -> Self {
        Self::new(clients, Variant::Sum { threshold, shares_per_client })
    }

    pub fn vote(clients: usize, candidates: usize) -> Self {
        Self::new(clients, Variant::Vote { candidates })
    }

    pub fn with_corrupted(mut self, corrupted: usize) -> Self {
        self.corrupted = corrupted;
        self
    }

    pub fn with_dummies_per_client(mut self, dummies: usize) -> Self {
        self.dummies_per_client = Some(dummies);
        self
    }

    pub fn with_max_sampled_proofs(mut self, max: usize) -> Self {
        self.max_sampled_proofs = max;
        self
    }

    pub fn with_key_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.key_dir = Some(dir.into());
        self
    }

    pub fn from_json(json: &str) -> Result<Self, AggregatorError> {
        serde_json::from_str(json)
            .map_err(|e| AggregatorError::MalformedInput(format!("invalid config: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AggregatorError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Apply `AGG_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, AggregatorError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AggregatorError> {
        if let Some(v) = parse_override(&lookup, "AGG_CLIENTS")? {
            self.clients = v;
        }
        if let Some(v) = parse_override(&lookup, "AGG_CORRUPTED")? {
            self.corrupted = v;
        }
        if let Some(v) = parse_override(&lookup, "AGG_SECURITY_PARAMETER")? {
            self.security_parameter = v;
        }
        if let Some(v) = parse_override(&lookup, "AGG_MAX_SAMPLED_PROOFS")? {
            self.max_sampled_proofs = v;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), AggregatorError> {
        let bad = |m: String| Err(AggregatorError::MalformedInput(m));

        if self.clients == 0 {
            return bad("at least one client is required".into());
        }
        if self.corrupted >= self.clients {
            return bad(format!(
                "corrupted clients ({}) must be fewer than clients ({})",
                self.corrupted, self.clients
            ));
        }
        if self.max_sampled_proofs == 0 {
            return bad("max_sampled_proofs must be at least 1".into());
        }
        // Any candidate count is valid; with C <= 1 every ballot is an empty pair list.
        if let Variant::Sum { shares_per_client, .. } = self.variant {
            if shares_per_client < 2 {
                return bad(format!("shares_per_client must be at least 2, got {shares_per_client}"));
            }
        }
        self.dummies_per_client()?;
        Ok(())
    }

    /// Explicit dummy count, or the bound for `(security_parameter, clients, corrupted)`.
    pub fn dummies_per_client(&self) -> Result<usize, AggregatorError> {
        match self.dummies_per_client {
            Some(d) => Ok(d),
            None => Ok(dummy_count(self.security_parameter, self.clients, self.corrupted)?),
        }
    }

    /// Number of clients asked for a proof each round.
    pub fn sample_size(&self) -> usize {
        self.max_sampled_proofs.min(self.clients)
    }
}

fn parse_override<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, AggregatorError>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AggregatorError::MalformedInput(format!("{key}={raw:?}: {e}"))),
    }
}
