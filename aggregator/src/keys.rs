//! Proving and verifying keys, generated once per circuit shape.
//!
//! Keys can be cached under `<dir>/keys/` so later servers skip the setup.

use crate::config::Variant;
use crate::errors::AggregatorError;
use rand::rngs::OsRng;
use shuffle_proofs::circuit::{RankedVoteCircuit, ThresholdSumCircuit};
use shuffle_proofs::proof_system::{from_bytes, to_bytes, ProofSystem};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Circuit shape a key pair is generated for. Keys are only valid for one shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CircuitShape {
    ThresholdSum { shares: usize },
    RankedVote { candidates: usize },
}

impl CircuitShape {
    fn file_stem(&self) -> String {
        match self {
            CircuitShape::ThresholdSum { shares } => format!("sum_k{shares}"),
            CircuitShape::RankedVote { candidates } => format!("vote_c{candidates}"),
        }
    }
}

impl From<&Variant> for CircuitShape {
    fn from(variant: &Variant) -> Self {
        match variant {
            Variant::Sum { shares_per_client, .. } => {
                CircuitShape::ThresholdSum { shares: *shares_per_client }
            }
            Variant::Vote { candidates } => CircuitShape::RankedVote { candidates: *candidates },
        }
    }
}

pub struct Keys<P: ProofSystem> {
    pub pk: Arc<P::ProvingKey>,
    pub vk: Arc<P::VerifyingKey>,
}

impl<P: ProofSystem> Clone for Keys<P> {
    fn clone(&self) -> Self {
        Self { pk: self.pk.clone(), vk: self.vk.clone() }
    }
}

/// Lazily generated key pair for one circuit shape, optionally cached on disk.
pub struct KeyStore<P: ProofSystem> {
    shape: CircuitShape,
    dir: Option<PathBuf>,
    keys: Arc<OnceCell<Keys<P>>>,
}

impl<P: ProofSystem> KeyStore<P> {
    pub fn new(shape: CircuitShape, dir: Option<PathBuf>) -> Self {
        Self { shape, dir, keys: Arc::new(OnceCell::new()) }
    }

    pub fn shape(&self) -> CircuitShape {
        self.shape
    }

    /// Run the trusted setup on first use, or load the keys from `<dir>/keys/`.
    pub async fn ensure_keys(&self) -> Result<Keys<P>, AggregatorError> {
        let shape = self.shape;
        let dir = self.dir.clone();

        self.keys
            .get_or_try_init(|| async move {
                tokio::task::spawn_blocking(move || load_or_generate::<P>(shape, dir)).await?
            })
            .await
            .cloned()
    }
}

fn load_or_generate<P: ProofSystem>(
    shape: CircuitShape,
    dir: Option<PathBuf>,
) -> Result<Keys<P>, AggregatorError> {
    let paths = match &dir {
        Some(dir) => {
            let keys_dir = dir.join("keys");
            std::fs::create_dir_all(&keys_dir)?;
            let stem = format!("{}_{}", P::NAME, shape.file_stem());
            Some((keys_dir.join(format!("{stem}_pk.bin")), keys_dir.join(format!("{stem}_vk.bin"))))
        }
        None => None,
    };

    if let Some((pk_path, vk_path)) = &paths {
        if pk_path.exists() && vk_path.exists() {
            let pk: P::ProvingKey = from_bytes(&std::fs::read(pk_path)?)?;
            let vk: P::VerifyingKey = from_bytes(&std::fs::read(vk_path)?)?;
            tracing::info!(?shape, path = %pk_path.display(), "loaded cached keys");
            return Ok(Keys { pk: Arc::new(pk), vk: Arc::new(vk) });
        }
    }

    // Trusted setup randomness. A deployment would use an MPC ceremony.
    let mut rng = OsRng;
    let (pk, vk) = match shape {
        CircuitShape::ThresholdSum { shares } => P::setup(ThresholdSumCircuit::blank(shares), &mut rng)?,
        CircuitShape::RankedVote { candidates } => {
            P::setup(RankedVoteCircuit::blank(candidates), &mut rng)?
        }
    };
    tracing::info!(?shape, backend = P::NAME, pk_bytes = P::proving_key_size(&pk), "generated keys");

    if let Some((pk_path, vk_path)) = &paths {
        std::fs::write(pk_path, to_bytes(&pk)?)?;
        std::fs::write(vk_path, to_bytes(&vk)?)?;
    }

    Ok(Keys { pk: Arc::new(pk), vk: Arc::new(vk) })
}
