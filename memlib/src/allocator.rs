use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;

use crate::error::{AllocError, ConfigError, FreeError};
use crate::placement_policies::AllocationStrategy;

/// Per-block overhead charged against usable capacity, matching the size of
/// an embedded header in the modelled machine.
pub const HEADER_SIZE: usize = 32;

/// Minimum usable remainder required to carve a free tail out of an
/// allocation. Anything smaller stays with the block as internal
/// fragmentation.
pub const SPLIT_THRESHOLD: usize = 8;

const FREE_ID: u64 = 0;

/// Metadata for one contiguous span of the arena.
///
/// `size` is the total footprint including the header charge. `id` holds
/// the free-block sentinel `0` until the block is allocated; allocated ids
/// are positive and never reissued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMeta {
    pub size: usize,
    pub free: bool,
    pub id: u64,
    pub requested: usize,
}

/// A block as reported to observers: physical placement plus metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockView {
    pub offset: usize,
    pub size: usize,
    pub free: bool,
    pub id: u64,
    pub usable: usize,
}

/// A successful allocation: the block id and the address of its first
/// usable byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub id: u64,
    pub address: usize,
}

/// Names a live allocation either by its id or by its usable-byte address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRef {
    Id(u64),
    Address(usize),
}

/// A contiguous physical-memory allocator over a fixed arena.
///
/// The arena is modelled as an opaque capacity with a parallel ordered map
/// `offset -> BlockMeta`; the map covers `[0, total_size)` exactly, with no
/// gaps and no overlap, and no two physically adjacent blocks are ever both
/// free. Placement walks free blocks in offset order, allocation splits
/// when the remainder is worth keeping, and deallocation coalesces with
/// both physical neighbours.
#[derive(Debug)]
pub struct Allocator {
    total_size: usize,
    strategy: AllocationStrategy,
    blocks: BTreeMap<usize, BlockMeta>,
    live_ids: HashMap<u64, usize>,
    retired_ids: HashSet<u64>,
    next_id: u64,
    success_count: u64,
    failure_count: u64,
}

impl Allocator {
    /// Creates an allocator whose arena is one free block of `total_size`
    /// bytes. Rejects arenas too small to hold the initial block's header
    /// charge.
    pub fn new(total_size: usize, strategy: AllocationStrategy) -> Result<Self, ConfigError> {
        if total_size < HEADER_SIZE {
            return Err(ConfigError::ArenaTooSmall {
                total: total_size,
                header: HEADER_SIZE,
            });
        }
        let mut blocks = BTreeMap::new();
        blocks.insert(
            0,
            BlockMeta {
                size: total_size,
                free: true,
                id: FREE_ID,
                requested: 0,
            },
        );
        Ok(Self {
            total_size,
            strategy,
            blocks,
            live_ids: HashMap::new(),
            retired_ids: HashSet::new(),
            next_id: 1,
            success_count: 0,
            failure_count: 0,
        })
    }

    /// Services an allocation request of `size` usable bytes.
    ///
    /// The chosen free block is split when the remainder would itself hold a
    /// header plus at least `SPLIT_THRESHOLD` usable bytes; otherwise the
    /// whole block is consumed and the excess shows up as internal
    /// fragmentation. Failures are counted and leave the arena untouched.
    ///
    /// # Arguments
    ///
    /// * `size`: requested usable bytes, must be nonzero
    ///
    /// returns: Result<Allocation, AllocError>
    pub fn allocate(&mut self, size: usize) -> Result<Allocation, AllocError> {
        if size == 0 {
            self.failure_count += 1;
            return Err(AllocError::ZeroSize);
        }
        let required = match size.checked_add(HEADER_SIZE) {
            Some(r) => r,
            None => {
                self.failure_count += 1;
                return Err(AllocError::OutOfMemory { requested: size });
            }
        };

        let free_blocks = self
            .blocks
            .iter()
            .filter(|(_, meta)| meta.free)
            .map(|(offset, meta)| (*offset, meta.size));
        let offset = match self.strategy.choose(free_blocks, required) {
            Some(offset) => offset,
            None => {
                self.failure_count += 1;
                return Err(AllocError::OutOfMemory { requested: size });
            }
        };

        let block = self.blocks[&offset];
        let split = block.size - required >= HEADER_SIZE + SPLIT_THRESHOLD;
        if split {
            self.blocks.insert(
                offset + required,
                BlockMeta {
                    size: block.size - required,
                    free: true,
                    id: FREE_ID,
                    requested: 0,
                },
            );
        }

        let id = self.next_id;
        self.next_id += 1;
        if let Some(meta) = self.blocks.get_mut(&offset) {
            meta.size = if split { required } else { block.size };
            meta.free = false;
            meta.id = id;
            meta.requested = size;
        }
        self.live_ids.insert(id, offset);
        self.success_count += 1;

        Ok(Allocation {
            id,
            address: offset + HEADER_SIZE,
        })
    }

    /// Frees a live allocation named by id or by usable-byte address, then
    /// merges the block with its free physical neighbours.
    ///
    /// A reference to a block that was already freed reports `DoubleFree`;
    /// one that never named an allocation reports `NotFound`. Neither
    /// failure mutates anything.
    pub fn deallocate(&mut self, reference: BlockRef) -> Result<(), FreeError> {
        let offset = self.resolve(reference)?;

        let id = match self.blocks.get_mut(&offset) {
            Some(meta) => {
                let id = meta.id;
                meta.free = true;
                meta.id = FREE_ID;
                meta.requested = 0;
                id
            }
            None => return Err(FreeError::NotFound),
        };
        self.live_ids.remove(&id);
        self.retired_ids.insert(id);

        self.coalesce(offset);
        Ok(())
    }

    /// Switches the placement policy. Block state is untouched; only the
    /// traversal of future `allocate` calls changes.
    pub fn set_strategy(&mut self, strategy: AllocationStrategy) {
        self.strategy = strategy;
    }

    pub fn strategy(&self) -> AllocationStrategy {
        self.strategy
    }

    fn resolve(&self, reference: BlockRef) -> Result<usize, FreeError> {
        match reference {
            BlockRef::Id(id) => match self.live_ids.get(&id) {
                Some(offset) => Ok(*offset),
                None if self.retired_ids.contains(&id) => Err(FreeError::DoubleFree),
                None => Err(FreeError::NotFound),
            },
            BlockRef::Address(address) => {
                let offset = match address.checked_sub(HEADER_SIZE) {
                    Some(offset) => offset,
                    None => return Err(FreeError::NotFound),
                };
                match self.blocks.get(&offset) {
                    Some(meta) if !meta.free => Ok(offset),
                    Some(_) => Err(FreeError::DoubleFree),
                    None => Err(FreeError::NotFound),
                }
            }
        }
    }

    // Merge right first so the left merge absorbs the combined span.
    fn coalesce(&mut self, offset: usize) {
        let block = match self.blocks.get(&offset) {
            Some(meta) => *meta,
            None => return,
        };

        let next_offset = offset + block.size;
        if let Some(next) = self.blocks.get(&next_offset).copied() {
            if next.free {
                self.blocks.remove(&next_offset);
                if let Some(merged) = self.blocks.get_mut(&offset) {
                    merged.size += next.size;
                }
            }
        }

        let prev = self
            .blocks
            .range(..offset)
            .next_back()
            .map(|(prev_offset, meta)| (*prev_offset, *meta));
        if let Some((prev_offset, prev_meta)) = prev {
            if prev_meta.free {
                if let Some(current) = self.blocks.remove(&offset) {
                    if let Some(merged) = self.blocks.get_mut(&prev_offset) {
                        merged.size += current.size;
                    }
                }
            }
        }
    }

    /// All blocks in physical order.
    pub fn blocks(&self) -> Vec<BlockView> {
        self.blocks
            .iter()
            .map(|(offset, meta)| BlockView {
                offset: *offset,
                size: meta.size,
                free: meta.free,
                id: meta.id,
                usable: meta.size - HEADER_SIZE,
            })
            .collect()
    }

    /// Renders the physical layout, one line per block with its inclusive
    /// address range.
    pub fn dump(&self) -> String {
        let mut out = String::from("=== Memory Dump ===\n");
        for (offset, meta) in &self.blocks {
            let last = offset + meta.size - 1;
            let _ = write!(out, "[0x{offset:08x} - 0x{last:08x}] ");
            if meta.free {
                out.push_str("FREE\n");
            } else {
                let _ = writeln!(
                    out,
                    "USED (id={}, size={} bytes)",
                    meta.id,
                    meta.size - HEADER_SIZE
                );
            }
        }
        out.push_str("==================\n");
        out
    }

    /// Wasted-bytes share of all allocated usable space, as a percentage.
    pub fn internal_fragmentation(&self) -> f64 {
        let mut usable = 0usize;
        let mut requested = 0usize;
        for meta in self.blocks.values().filter(|meta| !meta.free) {
            usable += meta.size - HEADER_SIZE;
            requested += meta.requested;
        }
        if usable == 0 {
            return 0.0;
        }
        ((usable - requested) as f64 / usable as f64) * 100.0
    }

    /// Share of free space unusable for a single maximal request, as a
    /// percentage of the whole arena.
    pub fn external_fragmentation(&self) -> f64 {
        let mut total_free_usable = 0usize;
        let mut largest_free_usable = 0usize;
        for meta in self.blocks.values().filter(|meta| meta.free) {
            let usable = meta.size - HEADER_SIZE;
            total_free_usable += usable;
            largest_free_usable = largest_free_usable.max(usable);
        }
        if total_free_usable == 0 {
            return 0.0;
        }
        ((total_free_usable - largest_free_usable) as f64 / self.total_size as f64) * 100.0
    }

    pub fn utilization(&self) -> f64 {
        if self.total_size == 0 {
            return 0.0;
        }
        (self.used_memory() as f64 / self.total_size as f64) * 100.0
    }

    /// Largest usable span a single allocation could still get, 0 when the
    /// arena has no free block.
    pub fn largest_free_block(&self) -> usize {
        self.blocks
            .values()
            .filter(|meta| meta.free)
            .map(|meta| meta.size - HEADER_SIZE)
            .max()
            .unwrap_or(0)
    }

    pub fn total_memory(&self) -> usize {
        self.total_size
    }

    /// Bytes owned by allocated blocks, header charges included.
    pub fn used_memory(&self) -> usize {
        self.blocks
            .values()
            .filter(|meta| !meta.free)
            .map(|meta| meta.size)
            .sum()
    }

    pub fn free_memory(&self) -> usize {
        self.total_size - self.used_memory()
    }

    pub fn success_count(&self) -> u64 {
        self.success_count
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count
    }
}
