use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Placement policy for the allocator. A small closed set, dispatched
/// exhaustively; switching the strategy never touches block state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AllocationStrategy {
    #[serde(alias = "first_fit")]
    FirstFit,
    #[serde(alias = "best_fit")]
    BestFit,
    #[serde(alias = "worst_fit")]
    WorstFit,
}

impl Default for AllocationStrategy {
    fn default() -> Self {
        AllocationStrategy::FirstFit
    }
}

impl AllocationStrategy {
    /// Selects a free block for a request of `required` total bytes.
    ///
    /// The candidates must be supplied in ascending offset order; all three
    /// strategies then resolve ties toward the lowest offset for free.
    ///
    /// # Arguments
    ///
    /// * `candidates`: `(offset, size)` pairs for every free block, ascending by offset
    /// * `required`: total bytes the block must hold, header included
    ///
    /// returns: Option<usize>, the offset of the chosen block
    pub(crate) fn choose(
        self,
        candidates: impl Iterator<Item = (usize, usize)>,
        required: usize,
    ) -> Option<usize> {
        let mut chosen: Option<(usize, usize)> = None;
        for (offset, size) in candidates {
            if size < required {
                continue;
            }
            match self {
                AllocationStrategy::FirstFit => return Some(offset),
                AllocationStrategy::BestFit => {
                    if chosen.map_or(true, |(_, best)| size < best) {
                        chosen = Some((offset, size));
                    }
                }
                AllocationStrategy::WorstFit => {
                    if chosen.map_or(true, |(_, worst)| size > worst) {
                        chosen = Some((offset, size));
                    }
                }
            }
        }
        chosen.map(|(offset, _)| offset)
    }
}

impl FromStr for AllocationStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first_fit" | "firstfit" => Ok(AllocationStrategy::FirstFit),
            "best_fit" | "bestfit" => Ok(AllocationStrategy::BestFit),
            "worst_fit" | "worstfit" => Ok(AllocationStrategy::WorstFit),
            _ => Err(()),
        }
    }
}

impl fmt::Display for AllocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AllocationStrategy::FirstFit => "first_fit",
            AllocationStrategy::BestFit => "best_fit",
            AllocationStrategy::WorstFit => "worst_fit",
        };
        f.write_str(name)
    }
}
