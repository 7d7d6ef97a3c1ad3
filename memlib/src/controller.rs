use std::collections::BTreeMap;
use std::io::Read;

use crate::allocator::{Allocation, Allocator, BlockRef};
use crate::config::{CacheLevelConfig, SimulatorConfig};
use crate::error::{ConfigError, ControlError};
use crate::hierarchy::{AccessReport, CacheHierarchy, Level};
use crate::placement_policies::AllocationStrategy;
use crate::replacement_policies::ReplacementPolicy;
use crate::stats::SimulatorStats;
use crate::trace::{self, TraceSummary};

/// Binds one allocator and one cache hierarchy into a session and keeps
/// the bidirectional mapping between the block ids handed to users and the
/// addresses the allocator returned for them.
///
/// A session starts uninitialised; `init_memory` constructs the allocator
/// (installing the default cache geometry if none was configured yet) and
/// every re-initialisation rebuilds from scratch, preserving nothing.
#[derive(Default)]
pub struct Controller {
    allocator: Option<Allocator>,
    cache: Option<CacheHierarchy>,
    id_to_address: BTreeMap<u64, usize>,
    address_to_id: BTreeMap<usize, u64>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a fully initialised session from a parsed configuration.
    pub fn from_config(config: &SimulatorConfig) -> Result<Self, ConfigError> {
        let mut controller = Self::new();
        controller.init_cache(config.l1, config.l2)?;
        controller.init_memory(config.memory_size)?;
        if let Some(allocator) = controller.allocator.as_mut() {
            allocator.set_strategy(config.strategy);
        }
        if let Some(cache) = controller.cache.as_mut() {
            cache.set_policy(config.policy);
        }
        Ok(controller)
    }

    /// (Re)constructs the arena. The id map resets; a previously configured
    /// cache survives, otherwise the default L1/L2 geometry is installed.
    pub fn init_memory(&mut self, size: usize) -> Result<(), ConfigError> {
        self.allocator = Some(Allocator::new(size, AllocationStrategy::default())?);
        self.id_to_address.clear();
        self.address_to_id.clear();
        if self.cache.is_none() {
            self.cache = Some(CacheHierarchy::new(
                CacheLevelConfig::default_l1(),
                CacheLevelConfig::default_l2(),
                ReplacementPolicy::default(),
            )?);
        }
        Ok(())
    }

    /// (Re)constructs the cache hierarchy alone.
    pub fn init_cache(
        &mut self,
        l1: CacheLevelConfig,
        l2: CacheLevelConfig,
    ) -> Result<(), ConfigError> {
        self.cache = Some(CacheHierarchy::new(l1, l2, ReplacementPolicy::default())?);
        Ok(())
    }

    pub fn is_initialised(&self) -> bool {
        self.allocator.is_some()
    }

    pub fn set_strategy(&mut self, strategy: AllocationStrategy) -> Result<(), ControlError> {
        self.allocator_mut()?.set_strategy(strategy);
        Ok(())
    }

    pub fn set_policy(&mut self, policy: ReplacementPolicy) -> Result<(), ControlError> {
        self.require_init()?;
        if let Some(cache) = self.cache.as_mut() {
            cache.set_policy(policy);
        }
        Ok(())
    }

    pub fn set_level_policy(
        &mut self,
        level: Level,
        policy: ReplacementPolicy,
    ) -> Result<(), ControlError> {
        self.require_init()?;
        if let Some(cache) = self.cache.as_mut() {
            cache.set_level_policy(level, policy);
        }
        Ok(())
    }

    /// Allocates and records the id <-> address pair.
    pub fn malloc(&mut self, size: usize) -> Result<Allocation, ControlError> {
        let allocation = self.allocator_mut()?.allocate(size)?;
        self.id_to_address.insert(allocation.id, allocation.address);
        self.address_to_id.insert(allocation.address, allocation.id);
        Ok(allocation)
    }

    /// Frees by id or address and returns the freed block's id. The mapping
    /// entry goes away only when the allocator accepted the free.
    pub fn free(&mut self, reference: BlockRef) -> Result<u64, ControlError> {
        let allocator = match self.allocator.as_mut() {
            Some(allocator) => allocator,
            None => return Err(ControlError::Uninitialised),
        };
        allocator.deallocate(reference)?;
        let id = match reference {
            BlockRef::Id(id) => id,
            BlockRef::Address(address) => {
                self.address_to_id.get(&address).copied().unwrap_or(0)
            }
        };
        if let Some(address) = self.id_to_address.remove(&id) {
            self.address_to_id.remove(&address);
        }
        Ok(id)
    }

    /// One cache access at a physical address.
    pub fn access(&mut self, address: u64) -> Result<AccessReport, ControlError> {
        self.require_init()?;
        match self.cache.as_mut() {
            Some(cache) => Ok(cache.access(address)),
            None => Err(ControlError::Uninitialised),
        }
    }

    /// Replays a whole address trace through the hierarchy.
    pub fn trace<R: Read>(&mut self, reader: R) -> Result<TraceSummary, ControlError> {
        self.require_init()?;
        match self.cache.as_mut() {
            Some(cache) => Ok(trace::replay(reader, cache)?),
            None => Err(ControlError::Uninitialised),
        }
    }

    pub fn dump(&self) -> Result<String, ControlError> {
        Ok(self.allocator_ref()?.dump())
    }

    pub fn stats(&self) -> Result<SimulatorStats, ControlError> {
        let allocator = self.allocator_ref()?;
        match self.cache.as_ref() {
            Some(cache) => Ok(SimulatorStats::collect(allocator, cache)),
            None => Err(ControlError::Uninitialised),
        }
    }

    /// Read-only view of the allocator, for observers.
    pub fn allocator(&self) -> Option<&Allocator> {
        self.allocator.as_ref()
    }

    /// Read-only view of the cache hierarchy, for observers.
    pub fn cache(&self) -> Option<&CacheHierarchy> {
        self.cache.as_ref()
    }

    fn require_init(&self) -> Result<(), ControlError> {
        if self.allocator.is_some() {
            Ok(())
        } else {
            Err(ControlError::Uninitialised)
        }
    }

    fn allocator_ref(&self) -> Result<&Allocator, ControlError> {
        self.allocator.as_ref().ok_or(ControlError::Uninitialised)
    }

    fn allocator_mut(&mut self) -> Result<&mut Allocator, ControlError> {
        self.allocator.as_mut().ok_or(ControlError::Uninitialised)
    }
}
