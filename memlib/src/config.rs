use serde::Deserialize;

use crate::placement_policies::AllocationStrategy;
use crate::replacement_policies::ReplacementPolicy;

/// Geometry of a single cache level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CacheLevelConfig {
    pub size: u64,
    pub block_size: u64,
    pub associativity: u64,
}

impl CacheLevelConfig {
    /// Default L1: 16 KiB, 64-byte blocks, 4-way.
    pub fn default_l1() -> Self {
        Self {
            size: 16 * 1024,
            block_size: 64,
            associativity: 4,
        }
    }

    /// Default L2: 64 KiB, 64-byte blocks, 8-way.
    pub fn default_l2() -> Self {
        Self {
            size: 64 * 1024,
            block_size: 64,
            associativity: 8,
        }
    }
}

/// A whole simulator session's starting state, usually parsed from JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
    pub memory_size: usize,
    #[serde(default)]
    pub strategy: AllocationStrategy,
    #[serde(default = "CacheLevelConfig::default_l1")]
    pub l1: CacheLevelConfig,
    #[serde(default = "CacheLevelConfig::default_l2")]
    pub l2: CacheLevelConfig,
    #[serde(default)]
    pub policy: ReplacementPolicy,
}
