use crate::config::CacheLevelConfig;
use crate::error::ConfigError;
use crate::replacement_policies::ReplacementPolicy;

/// Modelled address width in bits.
pub const ADDRESS_BITS: u32 = 64;

/// One cache line: presence and tag state plus the bookkeeping every
/// replacement policy keys on. No data bytes are modelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheLine {
    pub valid: bool,
    pub tag: u64,
    pub load_time: u64,
    pub last_access: u64,
    pub access_count: u64,
}

/// A fixed-width associative set.
#[derive(Debug, Clone)]
pub struct CacheSet {
    pub lines: Vec<CacheLine>,
}

/// A single set-associative cache level.
///
/// The level services one primitive, `access`, parameterised by two flags:
/// `count` (bump the clock and the hit/miss counters) and `fill` (install
/// the block on miss, evicting a victim from a full set). The two-level
/// hierarchy composes probes and fills out of this primitive; fills never
/// touch the counters, so nothing is double-counted.
pub struct CacheLevel {
    level: u8,
    size: u64,
    block_size: u64,
    associativity: u64,
    num_sets: u64,
    offset_bits: u32,
    index_bits: u32,
    tag_bits: u32,
    policy: ReplacementPolicy,
    sets: Vec<CacheSet>,
    hits: u64,
    misses: u64,
    evictions: u64,
    global_time: u64,
}

fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

fn require_pow2(what: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || !value.is_power_of_two() {
        return Err(ConfigError::BadGeometry {
            reason: format!("{what} must be a positive power of two, got {value}"),
        });
    }
    Ok(())
}

impl CacheLevel {
    /// Builds a level from its geometry, validating that every derived
    /// parameter is well-formed.
    ///
    /// # Arguments
    ///
    /// * `level`: 1 or 2, used in eviction event text
    /// * `config`: total size, block size, and associativity in bytes/ways
    /// * `policy`: initial replacement policy
    ///
    /// returns: Result<CacheLevel, ConfigError>
    pub fn new(
        level: u8,
        config: CacheLevelConfig,
        policy: ReplacementPolicy,
    ) -> Result<Self, ConfigError> {
        let CacheLevelConfig {
            size,
            block_size,
            associativity,
        } = config;
        require_pow2("block_size", block_size)?;
        require_pow2("associativity", associativity)?;
        if size == 0 || size % block_size != 0 {
            return Err(ConfigError::BadGeometry {
                reason: format!("block_size {block_size} must divide cache_size {size}"),
            });
        }
        let set_bytes = block_size.checked_mul(associativity).ok_or_else(|| {
            ConfigError::BadGeometry {
                reason: format!("{associativity}-way sets of {block_size}-byte blocks overflow"),
            }
        })?;
        let num_sets = size / set_bytes;
        require_pow2("num_sets", num_sets)?;

        let offset_bits = block_size.trailing_zeros();
        let index_bits = num_sets.trailing_zeros();
        if offset_bits + index_bits > ADDRESS_BITS {
            return Err(ConfigError::BadGeometry {
                reason: format!(
                    "offset and index fields need {} bits, address width is {ADDRESS_BITS}",
                    offset_bits + index_bits
                ),
            });
        }
        let tag_bits = ADDRESS_BITS - index_bits - offset_bits;

        let sets = vec![
            CacheSet {
                lines: vec![CacheLine::default(); associativity as usize],
            };
            num_sets as usize
        ];
        Ok(Self {
            level,
            size,
            block_size,
            associativity,
            num_sets,
            offset_bits,
            index_bits,
            tag_bits,
            policy,
            sets,
            hits: 0,
            misses: 0,
            evictions: 0,
            global_time: 0,
        })
    }

    /// Splits an address into its (block offset, set index, tag) fields.
    pub fn decode(&self, address: u64) -> (u64, u64, u64) {
        let offset = address & low_mask(self.offset_bits);
        let set_index = (address >> self.offset_bits) & low_mask(self.index_bits);
        let tag = if self.tag_bits == 0 {
            0
        } else {
            (address >> (self.offset_bits + self.index_bits)) & low_mask(self.tag_bits)
        };
        (offset, set_index, tag)
    }

    /// One access against this level, and the only mutation path for its
    /// state.
    ///
    /// With `count` set this is a probe: the clock ticks and the hit or
    /// miss counter moves. With `fill` set a miss installs the block,
    /// choosing any invalid slot first and otherwise asking the policy for
    /// a victim; overwriting a valid line bumps the eviction counter and
    /// appends an event. Bookkeeping fields update only on effective
    /// accesses (a hit or a fill), never on a missing probe.
    ///
    /// returns: bool, true on hit
    pub(crate) fn access(
        &mut self,
        address: u64,
        count: bool,
        fill: bool,
        events: &mut Vec<String>,
    ) -> bool {
        if count {
            self.global_time += 1;
        }
        let (_, set_index, tag) = self.decode(address);
        let time = self.global_time;
        let set = &mut self.sets[set_index as usize];

        for line in set.lines.iter_mut() {
            if line.valid && line.tag == tag {
                if count {
                    self.hits += 1;
                }
                line.last_access = time;
                line.access_count += 1;
                return true;
            }
        }

        if count {
            self.misses += 1;
        }
        if !fill {
            return false;
        }

        let victim_index = match set.lines.iter().position(|line| !line.valid) {
            Some(index) => index,
            None => self.policy.find_victim(&set.lines),
        };
        let line = &mut set.lines[victim_index];
        if line.valid {
            self.evictions += 1;
            events.push(format!(
                "L{} Eviction: Tag 0x{:x} (Set {})",
                self.level, line.tag, set_index
            ));
        }
        line.valid = true;
        line.tag = tag;
        line.load_time = time;
        line.last_access = time;
        line.access_count = 1;
        false
    }

    pub fn set_policy(&mut self, policy: ReplacementPolicy) {
        self.policy = policy;
    }

    pub fn policy(&self) -> ReplacementPolicy {
        self.policy
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Hit percentage over all counting probes, 0 before the first probe.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        (self.hits as f64 / total as f64) * 100.0
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn associativity(&self) -> u64 {
        self.associativity
    }

    pub fn num_sets(&self) -> u64 {
        self.num_sets
    }

    pub fn tag_bits(&self) -> u32 {
        self.tag_bits
    }

    /// Read-only view of the sets, in index order.
    pub fn sets(&self) -> &[CacheSet] {
        &self.sets
    }
}
