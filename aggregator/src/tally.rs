//! Pairwise tally and Condorcet sole-winner extraction.

use crate::errors::{AggregatorError, ProtocolViolation};
use serde::{Deserialize, Serialize};
use shuffle_proofs::rank::{CandidateId, CandidatePair};

/// `counts[i][j]` = number of ballots ranking `i` above `j`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyMatrix {
    candidates: usize,
    counts: Vec<Vec<u64>>,
}

impl TallyMatrix {
    pub fn new(candidates: usize) -> Self {
        Self { candidates, counts: vec![vec![0; candidates]; candidates] }
    }

    /// Tally shuffled pairs. Pairs naming unknown candidates, or a candidate against
    /// itself, make the batch malformed.
    pub fn from_pairs(pairs: &[CandidatePair], candidates: usize) -> Result<Self, AggregatorError> {
        let mut tally = Self::new(candidates);
        for p in pairs {
            if p.winner >= candidates || p.loser >= candidates || p.winner == p.loser {
                return Err(ProtocolViolation::MalformedBatch(format!(
                    "pair ({}, {}) is invalid for {candidates} candidates",
                    p.winner, p.loser
                ))
                .into());
            }
            tally.counts[p.winner][p.loser] += 1;
        }
        Ok(tally)
    }

    pub fn candidates(&self) -> usize {
        self.candidates
    }

    pub fn get(&self, winner: CandidateId, loser: CandidateId) -> u64 {
        self.counts[winner][loser]
    }

    pub fn rows(&self) -> &[Vec<u64>] {
        &self.counts
    }

    /// Unordered pairs `(i, j)`, `i < j`, whose comparisons do not add up to `voters`.
    pub fn inconsistent_pairs(&self, voters: u64) -> Vec<(CandidateId, CandidateId)> {
        let mut out = Vec::new();
        for i in 0..self.candidates {
            for j in i + 1..self.candidates {
                if self.counts[i][j] + self.counts[j][i] != voters {
                    out.push((i, j));
                }
            }
        }
        out
    }

    /// The candidate beating every other candidate head to head, if any.
    ///
    /// A win additionally requires that every ballot compared the two candidates.
    pub fn sole_winner(&self, voters: u64) -> Option<CandidateId> {
        (0..self.candidates).find(|&i| {
            (0..self.candidates).filter(|&j| j != i).all(|j| {
                self.counts[i][j] > self.counts[j][i]
                    && self.counts[i][j] + self.counts[j][i] == voters
            })
        })
    }
}
