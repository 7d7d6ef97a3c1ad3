use crate::cache::CacheLevel;
use crate::config::CacheLevelConfig;
use crate::error::ConfigError;
use crate::replacement_policies::ReplacementPolicy;

/// Names one of the two cache levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    L1,
    L2,
}

/// What a single access did at each level, with any eviction notices in
/// the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessReport {
    pub l1_hit: bool,
    pub l2_accessed: bool,
    pub l2_hit: bool,
    pub events: Vec<String>,
}

/// A two-level cache hierarchy with an inclusion-like fill protocol.
///
/// An access probes L1; on a miss it probes L2; whatever level finally
/// supplies the block, the fill propagates back toward L1. Only the two
/// probes count toward statistics; the fills are silent.
pub struct CacheHierarchy {
    l1: CacheLevel,
    l2: CacheLevel,
}

impl CacheHierarchy {
    pub fn new(
        l1: CacheLevelConfig,
        l2: CacheLevelConfig,
        policy: ReplacementPolicy,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            l1: CacheLevel::new(1, l1, policy)?,
            l2: CacheLevel::new(2, l2, policy)?,
        })
    }

    /// Services one read access at the given physical address.
    pub fn access(&mut self, address: u64) -> AccessReport {
        let mut events = Vec::new();

        if self.l1.access(address, true, false, &mut events) {
            return AccessReport {
                l1_hit: true,
                l2_accessed: false,
                l2_hit: false,
                events,
            };
        }

        let l2_hit = self.l2.access(address, true, false, &mut events);
        if l2_hit {
            self.l1.access(address, false, true, &mut events);
        } else {
            // Both missed: memory supplies the block, L2 then L1 install it.
            self.l2.access(address, false, true, &mut events);
            self.l1.access(address, false, true, &mut events);
        }

        AccessReport {
            l1_hit: false,
            l2_accessed: true,
            l2_hit,
            events,
        }
    }

    /// Applies one policy to both levels. Counters and line state stay put.
    pub fn set_policy(&mut self, policy: ReplacementPolicy) {
        self.l1.set_policy(policy);
        self.l2.set_policy(policy);
    }

    /// Overrides the policy at one level only.
    pub fn set_level_policy(&mut self, level: Level, policy: ReplacementPolicy) {
        self.level_mut(level).set_policy(policy);
    }

    pub fn hits(&self, level: Level) -> u64 {
        self.level(level).hits()
    }

    pub fn misses(&self, level: Level) -> u64 {
        self.level(level).misses()
    }

    pub fn evictions(&self, level: Level) -> u64 {
        self.level(level).evictions()
    }

    pub fn hit_ratio(&self, level: Level) -> f64 {
        self.level(level).hit_ratio()
    }

    /// Read-only view of one level.
    pub fn level(&self, level: Level) -> &CacheLevel {
        match level {
            Level::L1 => &self.l1,
            Level::L2 => &self.l2,
        }
    }

    fn level_mut(&mut self, level: Level) -> &mut CacheLevel {
        match level {
            Level::L1 => &mut self.l1,
            Level::L2 => &mut self.l2,
        }
    }
}
