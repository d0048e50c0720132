//! Ranked-ballot encoding.
//!
//! A ranking is a permutation of `0..C` (index = rank, value = candidate). It is encoded
//! as the `C(C-1)/2` ordered comparisons it implies. For the ranking `[1, 0, 2, 3]`:
//!
//! ```text
//! (1, 0), (1, 2), (1, 3)
//! (0, 2), (0, 3)
//! (2, 3)
//! ```
//!
//! Each comparison is packed into one field element as `winner * C + loser`.

use crate::error::ZkError;
use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

pub type CandidateId = usize;

/// A strict total order over candidates, best first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking(Vec<CandidateId>);

impl Ranking {
    /// Wrap a ranking after checking it is a permutation of `0..len`.
    pub fn new(order: Vec<CandidateId>) -> Result<Self, ZkError> {
        verify_permutation(&order)?;
        Ok(Self(order))
    }

    pub fn candidates(&self) -> usize {
        self.0.len()
    }

    pub fn order(&self) -> &[CandidateId] {
        &self.0
    }

    pub fn as_field_elements(&self) -> Vec<Fr> {
        self.0.iter().map(|c| Fr::from(*c as u64)).collect()
    }
}

/// One comparison: `winner` is ranked above `loser`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidatePair {
    pub winner: CandidateId,
    pub loser: CandidateId,
}

impl CandidatePair {
    pub fn new(winner: CandidateId, loser: CandidateId) -> Self {
        Self { winner, loser }
    }

    /// Packed field encoding `winner * C + loser`.
    pub fn process(&self, candidates: usize) -> Fr {
        process_pair(self.winner, self.loser, candidates)
    }
}

impl From<(CandidateId, CandidateId)> for CandidatePair {
    fn from((winner, loser): (CandidateId, CandidateId)) -> Self {
        Self { winner, loser }
    }
}

/// Number of comparisons implied by a ranking of `candidates`.
pub fn pair_count(candidates: usize) -> usize {
    candidates * candidates.saturating_sub(1) / 2
}

/// Check that `order` is a permutation of `0..order.len()`.
///
/// Inside the circuit the same property is enforced by fingerprint equality with the
/// canonical sequence; this native check lets a client fail before a round starts.
pub fn verify_permutation(order: &[CandidateId]) -> Result<(), ZkError> {
    let c = order.len();
    let mut seen = vec![false; c];
    for &candidate in order {
        if candidate >= c {
            return Err(ZkError::malformed(format!(
                "candidate {candidate} out of range for {c} candidates"
            )));
        }
        if seen[candidate] {
            return Err(ZkError::malformed(format!("candidate {candidate} ranked twice")));
        }
        seen[candidate] = true;
    }
    Ok(())
}

/// Deterministic pair list of a ranking. `C <= 1` yields no pairs.
pub fn encode(ranking: &Ranking) -> Vec<CandidatePair> {
    let order = ranking.order();
    let c = order.len();
    let mut pairs = Vec::with_capacity(pair_count(c));
    for i in 0..c {
        for j in 0..c - i - 1 {
            pairs.push(CandidatePair::new(order[i], order[i + j + 1]));
        }
    }
    pairs
}

/// Reconstruct the ranking implied by a pair list.
///
/// The candidate at rank `i` wins exactly `C - 1 - i` comparisons. The list is rejected
/// unless it is precisely the encoding of the reconstructed ranking.
pub fn decode(pairs: &[CandidatePair], candidates: usize) -> Result<Ranking, ZkError> {
    if pairs.len() != pair_count(candidates) {
        return Err(ZkError::malformed(format!(
            "expected {} pairs for {candidates} candidates, got {}",
            pair_count(candidates),
            pairs.len()
        )));
    }

    let mut wins = vec![0usize; candidates];
    for p in pairs {
        if p.winner >= candidates || p.loser >= candidates || p.winner == p.loser {
            return Err(ZkError::malformed(format!("invalid pair ({}, {})", p.winner, p.loser)));
        }
        wins[p.winner] += 1;
    }

    let mut order = vec![usize::MAX; candidates];
    for (candidate, w) in wins.into_iter().enumerate() {
        let rank = candidates - 1 - w.min(candidates - 1);
        if order[rank] != usize::MAX {
            return Err(ZkError::malformed("pair list is not consistent with a single ranking"));
        }
        order[rank] = candidate;
    }

    let ranking = Ranking::new(order)?;
    if encode(&ranking) != pairs {
        return Err(ZkError::malformed("pair list is not in canonical order"));
    }
    Ok(ranking)
}

/// Packed field encoding of one comparison.
pub fn process_pair(winner: CandidateId, loser: CandidateId, candidates: usize) -> Fr {
    Fr::from(winner as u64) * Fr::from(candidates as u64) + Fr::from(loser as u64)
}

pub fn process_pairs(pairs: &[CandidatePair], candidates: usize) -> Vec<Fr> {
    pairs.iter().map(|p| p.process(candidates)).collect()
}
