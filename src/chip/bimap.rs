//! Mapping between binary decisions and concrete cluster ids.
//!
//! The ensemble decides in `{+1, -1}`; which cluster each side stands for is only
//! known after training. [`ClusterIdBimap::calibrate`] classifies a handful of
//! reference vertices per cluster with the uncalibrated decision and assigns each
//! polarity to the cluster that votes for it most decisively.

use std::collections::BTreeMap;

use rand::prelude::*;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::dataset::{ClusterId, Dataset, VertexId};
use super::geometry::sign;
use crate::error::{Error, Result};

/// One side of the binary decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// `+1`
    Positive,
    /// `-1`
    Negative,
}

impl Polarity {
    /// Polarity of a decision value. An exact zero resolves to [`Polarity::Positive`].
    pub fn from_decision(value: f64) -> Self {
        if sign(value) < 0 {
            Self::Negative
        } else {
            Self::Positive
        }
    }

}

/// Reference-vertex votes collected for one cluster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoteTally {
    /// Votes for `+1`.
    pub positive: usize,
    /// Votes for `-1`.
    pub negative: usize,
}

impl VoteTally {
    /// Record one vote.
    pub fn add(&mut self, polarity: Polarity) {
        match polarity {
            Polarity::Positive => self.positive += 1,
            Polarity::Negative => self.negative += 1,
        }
    }

    /// Total votes.
    pub fn total(&self) -> usize {
        self.positive + self.negative
    }

    /// Votes for `polarity`.
    pub fn count(&self, polarity: Polarity) -> usize {
        match polarity {
            Polarity::Positive => self.positive,
            Polarity::Negative => self.negative,
        }
    }

    /// Fraction of votes for `polarity` (0 with no votes).
    pub fn share(&self, polarity: Polarity) -> f64 {
        match self.total() {
            0 => 0.0,
            n => self.count(polarity) as f64 / n as f64,
        }
    }

    /// Majority polarity; an even split goes to [`Polarity::Positive`].
    pub fn majority(&self) -> Option<Polarity> {
        if self.total() == 0 {
            None
        } else if self.positive >= self.negative {
            Some(Polarity::Positive)
        } else {
            Some(Polarity::Negative)
        }
    }
}

/// Strict bijection between `{+1, -1}` and two cluster ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBimap")]
pub struct ClusterIdBimap {
    positive: ClusterId,
    negative: ClusterId,
}

#[derive(Deserialize)]
struct RawBimap {
    positive: ClusterId,
    negative: ClusterId,
}

impl TryFrom<RawBimap> for ClusterIdBimap {
    type Error = Error;

    fn try_from(raw: RawBimap) -> Result<Self> {
        Self::new(raw.positive, raw.negative)
    }
}

impl ClusterIdBimap {
    /// Pair two distinct cluster ids with `+1` and `-1`.
    pub fn new(positive: ClusterId, negative: ClusterId) -> Result<Self> {
        if positive == negative {
            return Err(Error::NotBijective(format!(
                "cluster {positive} mapped to both polarities"
            )));
        }
        Ok(Self { positive, negative })
    }

    /// Cluster id for a polarity.
    pub fn get(&self, polarity: Polarity) -> &ClusterId {
        match polarity {
            Polarity::Positive => &self.positive,
            Polarity::Negative => &self.negative,
        }
    }

    /// Polarity for a cluster id, if it is one of the two.
    pub fn polarity_of(&self, id: &ClusterId) -> Option<Polarity> {
        if *id == self.positive {
            Some(Polarity::Positive)
        } else if *id == self.negative {
            Some(Polarity::Negative)
        } else {
            None
        }
    }

    /// Both entries, `+1` first.
    pub fn entries(&self) -> [(Polarity, &ClusterId); 2] {
        [
            (Polarity::Positive, &self.positive),
            (Polarity::Negative, &self.negative),
        ]
    }

    /// Number of entries; always 2.
    pub fn len(&self) -> usize {
        2
    }

    /// Always `false`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Resolve per-cluster vote tallies into a bimap.
    ///
    /// Each polarity goes to the cluster whose majority is that polarity with the
    /// largest vote share (ties: more votes, then lower id). A polarity nobody claims
    /// goes to the strongest remaining cluster. Fails unless two distinct clusters
    /// end up mapped.
    pub fn from_votes(tallies: &BTreeMap<ClusterId, VoteTally>) -> Result<Self> {
        let voted: Vec<(&ClusterId, &VoteTally)> =
            tallies.iter().filter(|(_, t)| t.total() > 0).collect();
        if voted.len() < 2 {
            return Err(Error::NotBijective(format!(
                "need votes from two clusters, got {}",
                voted.len()
            )));
        }

        let claim = |polarity: Polarity| {
            strongest(
                voted
                    .iter()
                    .copied()
                    .filter(|(_, t)| t.majority() == Some(polarity)),
                polarity,
            )
        };
        let mut positive = claim(Polarity::Positive);
        let mut negative = claim(Polarity::Negative);

        if positive.is_none() {
            positive = strongest(
                voted.iter().copied().filter(|(id, _)| Some(*id) != negative),
                Polarity::Positive,
            );
            warn!(cluster = ?positive, "no cluster voted +1; assigned to the remaining cluster");
        }
        if negative.is_none() {
            negative = strongest(
                voted.iter().copied().filter(|(id, _)| Some(*id) != positive),
                Polarity::Negative,
            );
            warn!(cluster = ?negative, "no cluster voted -1; assigned to the remaining cluster");
        }

        match (positive, negative) {
            (Some(p), Some(n)) => Self::new(p.clone(), n.clone()),
            _ => Err(Error::NotBijective(
                "could not assign both polarities".to_string(),
            )),
        }
    }

    /// Build the bimap by voting with reference vertices.
    ///
    /// Up to `reference_vertices` surviving vertices are drawn from each cluster
    /// (all of them if the cluster is small enough, otherwise a random sample seeded
    /// by `seed`) and classified with `decide`.
    pub fn calibrate<F>(
        dataset: &Dataset,
        reference_vertices: usize,
        seed: Option<u64>,
        mut decide: F,
    ) -> Result<Self>
    where
        F: FnMut(&[f32]) -> Result<Polarity>,
    {
        if reference_vertices == 0 {
            return Err(Error::InvalidParameter {
                name: "reference_vertices",
                message: "must be at least 1",
            });
        }

        let mut rng: Box<dyn RngCore> = match seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };

        let mut tallies = BTreeMap::new();
        for (id, cluster) in dataset.clusters() {
            let members: Vec<VertexId> = cluster.members().iter().copied().collect();
            let picked: Vec<VertexId> = if members.len() <= reference_vertices {
                members
            } else {
                let mut idx = index::sample(&mut rng, members.len(), reference_vertices).into_vec();
                idx.sort_unstable();
                idx.into_iter().map(|i| members[i]).collect()
            };

            let mut tally = VoteTally::default();
            for vid in picked {
                if let Some(v) = dataset.vertex(vid) {
                    tally.add(decide(v.coordinates())?);
                }
            }
            tallies.insert(id.clone(), tally);
        }

        let bimap = Self::from_votes(&tallies)?;
        debug!(
            positive = %bimap.positive,
            negative = %bimap.negative,
            clusters = tallies.len(),
            "calibrated cluster id bimap"
        );
        Ok(bimap)
    }
}

fn strongest<'a>(
    candidates: impl Iterator<Item = (&'a ClusterId, &'a VoteTally)>,
    polarity: Polarity,
) -> Option<&'a ClusterId> {
    candidates
        .min_by(|(ia, ta), (ib, tb)| {
            tb.share(polarity)
                .total_cmp(&ta.share(polarity))
                .then_with(|| tb.count(polarity).cmp(&ta.count(polarity)))
                .then_with(|| ia.cmp(ib))
        })
        .map(|(id, _)| id)
}
