use std::fmt::Write as _;

use serde::Serialize;

use crate::allocator::Allocator;
use crate::hierarchy::{CacheHierarchy, Level};

// Latency assumptions behind the AMAT estimate, in cycles.
const L1_LATENCY: f64 = 1.0;
const L2_LATENCY: f64 = 10.0;
const MEM_LATENCY: f64 = 100.0;

/// Counters for one cache level at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_ratio: f64,
}

/// One serialisable snapshot of the whole simulator's statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatorStats {
    pub total_allocations: u64,
    pub successful_allocations: u64,
    pub failed_allocations: u64,
    pub total_memory: usize,
    pub used_memory: usize,
    pub free_memory: usize,
    pub utilization: f64,
    pub internal_fragmentation: f64,
    pub external_fragmentation: f64,
    pub largest_free_block: usize,
    pub l1: LevelStats,
    pub l2: LevelStats,
    pub amat: f64,
}

impl SimulatorStats {
    /// Snapshots the allocator and hierarchy into one record.
    pub fn collect(allocator: &Allocator, cache: &CacheHierarchy) -> Self {
        let l1 = level_stats(cache, Level::L1);
        let l2 = level_stats(cache, Level::L2);
        Self {
            total_allocations: allocator.success_count() + allocator.failure_count(),
            successful_allocations: allocator.success_count(),
            failed_allocations: allocator.failure_count(),
            total_memory: allocator.total_memory(),
            used_memory: allocator.used_memory(),
            free_memory: allocator.free_memory(),
            utilization: allocator.utilization(),
            internal_fragmentation: allocator.internal_fragmentation(),
            external_fragmentation: allocator.external_fragmentation(),
            largest_free_block: allocator.largest_free_block(),
            l1,
            l2,
            amat: amat(l1, l2),
        }
    }

    /// Renders the human-readable report the `stats` command prints.
    pub fn render(&self) -> String {
        let mut out = String::from("=== Simulation Statistics ===\n");

        out.push_str("\nMemory Allocation:\n");
        let _ = writeln!(out, "  Total Allocations: {}", self.total_allocations);
        let _ = writeln!(out, "  Successful: {}", self.successful_allocations);
        let _ = writeln!(out, "  Failed: {}", self.failed_allocations);
        if self.total_allocations > 0 {
            let rate =
                (self.successful_allocations as f64 / self.total_allocations as f64) * 100.0;
            let _ = writeln!(out, "  Success Rate: {rate:.2}%");
        }

        out.push_str("\nMemory Usage:\n");
        let _ = writeln!(out, "  Total Memory: {} bytes", self.total_memory);
        let _ = writeln!(out, "  Used Memory: {} bytes", self.used_memory);
        let _ = writeln!(out, "  Free Memory: {} bytes", self.free_memory);
        let _ = writeln!(out, "  Memory Utilization: {:.2}%", self.utilization);

        out.push_str("\nFragmentation:\n");
        let _ = writeln!(
            out,
            "  Internal Fragmentation: {:.2}%",
            self.internal_fragmentation
        );
        let _ = writeln!(
            out,
            "  External Fragmentation: {:.2}%",
            self.external_fragmentation
        );
        let _ = writeln!(
            out,
            "  Largest Free Block: {} bytes",
            self.largest_free_block
        );

        render_level(&mut out, "L1", self.l1);
        render_level(&mut out, "L2", self.l2);

        out.push_str("\nSystem Performance:\n");
        let _ = writeln!(out, "  Estimated AMAT: {:.2} cycles", self.amat);
        let _ = writeln!(
            out,
            "  (Assumptions: L1={}, L2={}, Mem={})",
            L1_LATENCY as u64, L2_LATENCY as u64, MEM_LATENCY as u64
        );

        out.push_str("============================\n");
        out
    }
}

fn level_stats(cache: &CacheHierarchy, level: Level) -> LevelStats {
    LevelStats {
        hits: cache.hits(level),
        misses: cache.misses(level),
        evictions: cache.evictions(level),
        hit_ratio: cache.hit_ratio(level),
    }
}

fn render_level(out: &mut String, name: &str, stats: LevelStats) {
    let _ = writeln!(out, "\nCache Statistics ({name}):");
    let _ = writeln!(out, "  Hits: {}", stats.hits);
    let _ = writeln!(out, "  Misses: {}", stats.misses);
    let _ = writeln!(out, "  Evictions: {}", stats.evictions);
    if stats.hits + stats.misses > 0 {
        let _ = writeln!(out, "  Hit Ratio: {:.2}%", stats.hit_ratio);
    }
}

fn amat(l1: LevelStats, l2: LevelStats) -> f64 {
    let miss_rate = |stats: LevelStats| {
        let total = stats.hits + stats.misses;
        if total == 0 {
            0.0
        } else {
            stats.misses as f64 / total as f64
        }
    };
    L1_LATENCY + miss_rate(l1) * (L2_LATENCY + miss_rate(l2) * MEM_LATENCY)
}
