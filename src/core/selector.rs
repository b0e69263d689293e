/// Weighted selection — the draw primitives every node of the tree uses.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashSet;

use crate::core::sequence::Sequencer;
use crate::schema::group::SelectionMode;
use crate::schema::tag::WeightedTag;

/// Tokens visible to conditional tags while a prompt buffer is being filled.
pub type TagContext = FxHashSet<String>;

/// How a tag's `conditions` are matched against the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionPolicy {
    /// Every condition must be present.
    #[default]
    All,
    /// At least one condition must be present.
    Any,
}

impl ConditionPolicy {
    pub fn admits(&self, conditions: &[String], context: &TagContext) -> bool {
        if conditions.is_empty() {
            return true;
        }
        match self {
            Self::All => conditions.iter().all(|c| context.contains(c)),
            Self::Any => conditions.iter().any(|c| context.contains(c)),
        }
    }
}

/// Draw cardinality for one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionSpec {
    pub mode: SelectionMode,
    /// Number of draws for `multiple_num`.
    pub count: usize,
    /// Shuffle the output of `all` and `multiple_prob`.
    pub shuffle: bool,
}

impl SelectionSpec {
    pub fn new(mode: SelectionMode, count: usize, shuffle: bool) -> Self {
        Self {
            mode,
            count,
            shuffle,
        }
    }
}

/// Anything a selector can draw.
pub trait Candidate {
    /// Relative weight for weighted draws. Zero is never drawn.
    fn weight(&self) -> u32;
    /// Chance of being kept under `multiple_prob`.
    fn inclusion_chance(&self) -> f64;
}

impl Candidate for WeightedTag {
    fn weight(&self) -> u32 {
        self.weight
    }

    /// Weight read as a percentage, saturating at 100.
    fn inclusion_chance(&self) -> f64 {
        f64::from(self.weight.min(100)) / 100.0
    }
}

/// Bernoulli gate. Certain outcomes consume no randomness.
pub fn roll(rng: &mut StdRng, probability: f64) -> bool {
    if probability >= 1.0 {
        true
    } else if probability <= 0.0 || probability.is_nan() {
        false
    } else {
        rng.gen_bool(probability)
    }
}

/// One weighted draw over `weights`; `None` when the total weight is zero.
///
/// Weights are summed as `u64` so any list of `u32` weights is drawable.
pub fn pick_weighted(weights: &[u32], rng: &mut StdRng) -> Option<usize> {
    let dist = WeightedIndex::new(weights.iter().map(|&w| u64::from(w))).ok()?;
    Some(dist.sample(rng))
}

/// Select from `pool` according to `spec`.
///
/// An empty pool, or one whose weights are all zero, yields an empty
/// selection. Only `sequential` touches the sequence store.
pub fn select<'a, T: Candidate>(
    pool: &[&'a T],
    spec: &SelectionSpec,
    sequencer: &Sequencer<'_>,
    rng: &mut StdRng,
) -> Vec<&'a T> {
    if pool.is_empty() {
        return Vec::new();
    }

    match spec.mode {
        SelectionMode::Single => {
            let weights: Vec<u32> = pool.iter().map(|c| c.weight()).collect();
            pick_weighted(&weights, rng)
                .map(|i| vec![pool[i]])
                .unwrap_or_default()
        }
        SelectionMode::MultipleNum => {
            let mut remaining: Vec<&'a T> = pool.to_vec();
            let mut picked = Vec::with_capacity(spec.count.min(pool.len()));
            while picked.len() < spec.count && !remaining.is_empty() {
                let weights: Vec<u32> = remaining.iter().map(|c| c.weight()).collect();
                match pick_weighted(&weights, rng) {
                    Some(i) => picked.push(remaining.remove(i)),
                    None => break,
                }
            }
            picked
        }
        SelectionMode::MultipleProb => {
            let mut picked: Vec<&'a T> = pool
                .iter()
                .copied()
                .filter(|c| roll(rng, c.inclusion_chance()))
                .collect();
            if spec.shuffle {
                picked.shuffle(rng);
            }
            picked
        }
        SelectionMode::All => {
            let mut picked = pool.to_vec();
            if spec.shuffle {
                picked.shuffle(rng);
            }
            picked
        }
        SelectionMode::Sequential => {
            let index = sequencer.next(pool.len());
            vec![pool[index.min(pool.len() - 1)]]
        }
    }
}

/// Select tag strings from `items`, dropping disabled tags and tags whose
/// conditions the context does not satisfy.
pub fn select_tags(
    items: &[WeightedTag],
    spec: &SelectionSpec,
    context: &TagContext,
    policy: ConditionPolicy,
    sequencer: &Sequencer<'_>,
    rng: &mut StdRng,
) -> Vec<String> {
    let pool: Vec<&WeightedTag> = items
        .iter()
        .filter(|t| t.enabled && policy.admits(&t.conditions, context))
        .collect();

    let picked = select(&pool, spec, sequencer, rng);
    tracing::trace!(
        mode = ?spec.mode,
        eligible = pool.len(),
        picked = picked.len(),
        "selected tags"
    );
    picked.into_iter().map(|t| t.tag.clone()).collect()
}
