use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::cache::CacheLine;

/// Replacement policy for one cache level. The policy only selects victims;
/// every line carries the full bookkeeping (load time, last access, access
/// count) regardless of which policy is active, so swapping the policy
/// mid-run inherits coherent state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ReplacementPolicy {
    #[serde(alias = "fifo")]
    Fifo,
    #[serde(alias = "lru")]
    Lru,
    #[serde(alias = "lfu")]
    Lfu,
}

impl Default for ReplacementPolicy {
    fn default() -> Self {
        ReplacementPolicy::Fifo
    }
}

impl ReplacementPolicy {
    /// Picks the victim line index in a full set.
    ///
    /// FIFO keys on load time (strict insertion age, stable across
    /// interleaved fills), LRU on last access, LFU on access count. All
    /// three resolve ties toward the lowest line index.
    pub(crate) fn find_victim(self, lines: &[CacheLine]) -> usize {
        match self {
            ReplacementPolicy::Fifo => smallest_by(lines, |line| line.load_time),
            ReplacementPolicy::Lru => smallest_by(lines, |line| line.last_access),
            ReplacementPolicy::Lfu => smallest_by(lines, |line| line.access_count),
        }
    }
}

fn smallest_by(lines: &[CacheLine], key: impl Fn(&CacheLine) -> u64) -> usize {
    let mut min_value = u64::MAX;
    let mut min_index = 0;
    for (index, line) in lines.iter().enumerate() {
        let value = key(line);
        if value < min_value {
            min_value = value;
            min_index = index;
        }
    }
    min_index
}

impl FromStr for ReplacementPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" => Ok(ReplacementPolicy::Fifo),
            "lru" => Ok(ReplacementPolicy::Lru),
            "lfu" => Ok(ReplacementPolicy::Lfu),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReplacementPolicy::Fifo => "fifo",
            ReplacementPolicy::Lru => "lru",
            ReplacementPolicy::Lfu => "lfu",
        };
        f.write_str(name)
    }
}
