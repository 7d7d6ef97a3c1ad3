use crate::allocator::{Allocator, BlockRef, BlockView, HEADER_SIZE, SPLIT_THRESHOLD};
use crate::error::{AllocError, ConfigError, FreeError};
use crate::placement_policies::AllocationStrategy;

fn arena(size: usize, strategy: AllocationStrategy) -> Allocator {
    Allocator::new(size, strategy).unwrap()
}

fn layout(allocator: &Allocator) -> Vec<(usize, usize, bool)> {
    allocator
        .blocks()
        .iter()
        .map(|block| (block.offset, block.size, block.free))
        .collect()
}

#[test]
fn rejects_arena_smaller_than_header() {
    assert_eq!(
        Allocator::new(HEADER_SIZE - 1, AllocationStrategy::FirstFit).unwrap_err(),
        ConfigError::ArenaTooSmall {
            total: HEADER_SIZE - 1,
            header: HEADER_SIZE
        }
    );
    assert!(Allocator::new(HEADER_SIZE, AllocationStrategy::FirstFit).is_ok());
}

#[test]
fn zero_size_request_fails_and_counts() {
    let mut allocator = arena(4096, AllocationStrategy::FirstFit);
    assert_eq!(allocator.allocate(0).unwrap_err(), AllocError::ZeroSize);
    assert_eq!(allocator.failure_count(), 1);
    assert_eq!(layout(&allocator), vec![(0, 4096, true)]);
}

#[test]
fn allocation_returns_first_usable_byte() {
    let mut allocator = arena(4096, AllocationStrategy::FirstFit);
    let allocation = allocator.allocate(100).unwrap();
    assert_eq!(allocation.id, 1);
    assert_eq!(allocation.address, HEADER_SIZE);
    assert_eq!(
        layout(&allocator),
        vec![(0, 132, false), (132, 4096 - 132, true)]
    );
}

#[test]
fn remainder_below_threshold_is_consumed_whole() {
    let mut allocator = arena(1024, AllocationStrategy::FirstFit);
    // Leaves exactly HEADER_SIZE + SPLIT_THRESHOLD - 1 behind: too small to split.
    let request = 1024 - HEADER_SIZE - (HEADER_SIZE + SPLIT_THRESHOLD - 1);
    allocator.allocate(request).unwrap();
    assert_eq!(layout(&allocator), vec![(0, 1024, false)]);

    let blocks = allocator.blocks();
    assert_eq!(blocks[0].usable, 1024 - HEADER_SIZE);
    assert!(blocks[0].usable > request);
}

#[test]
fn remainder_at_threshold_is_split_off() {
    let mut allocator = arena(1024, AllocationStrategy::FirstFit);
    let request = 1024 - HEADER_SIZE - (HEADER_SIZE + SPLIT_THRESHOLD);
    allocator.allocate(request).unwrap();
    assert_eq!(
        layout(&allocator),
        vec![
            (0, request + HEADER_SIZE, false),
            (request + HEADER_SIZE, HEADER_SIZE + SPLIT_THRESHOLD, true),
        ]
    );
}

#[test]
fn whole_arena_allocation_then_oom() {
    let mut allocator = arena(4096, AllocationStrategy::FirstFit);
    allocator.allocate(4096 - HEADER_SIZE).unwrap();
    assert_eq!(layout(&allocator), vec![(0, 4096, false)]);
    assert_eq!(
        allocator.allocate(1).unwrap_err(),
        AllocError::OutOfMemory { requested: 1 }
    );
    assert_eq!(allocator.failure_count(), 1);
    assert_eq!(allocator.success_count(), 1);
}

#[test]
fn free_coalesces_both_neighbours() {
    let mut allocator = arena(4096, AllocationStrategy::FirstFit);
    let a = allocator.allocate(100).unwrap();
    let b = allocator.allocate(100).unwrap();
    let c = allocator.allocate(100).unwrap();

    allocator.deallocate(BlockRef::Id(c.id)).unwrap();
    // c merged right into the tail
    assert_eq!(
        layout(&allocator),
        vec![(0, 132, false), (132, 132, false), (264, 4096 - 264, true)]
    );

    allocator.deallocate(BlockRef::Id(a.id)).unwrap();
    assert_eq!(
        layout(&allocator),
        vec![(0, 132, true), (132, 132, false), (264, 4096 - 264, true)]
    );

    // b merges with the hole on its left and the free span on its right
    allocator.deallocate(BlockRef::Id(b.id)).unwrap();
    assert_eq!(layout(&allocator), vec![(0, 4096, true)]);
}

#[test]
fn double_free_by_id_is_distinguished_from_unknown_id() {
    let mut allocator = arena(4096, AllocationStrategy::FirstFit);
    let a = allocator.allocate(64).unwrap();
    allocator.deallocate(BlockRef::Id(a.id)).unwrap();
    assert_eq!(
        allocator.deallocate(BlockRef::Id(a.id)).unwrap_err(),
        FreeError::DoubleFree
    );
    assert_eq!(
        allocator.deallocate(BlockRef::Id(99)).unwrap_err(),
        FreeError::NotFound
    );
}

#[test]
fn free_by_address() {
    let mut allocator = arena(4096, AllocationStrategy::FirstFit);
    let a = allocator.allocate(64).unwrap();
    allocator.deallocate(BlockRef::Address(a.address)).unwrap();
    assert_eq!(layout(&allocator), vec![(0, 4096, true)]);

    // The arena head is one free block again: its usable address reports a
    // double free, anything else was never handed out.
    assert_eq!(
        allocator
            .deallocate(BlockRef::Address(a.address))
            .unwrap_err(),
        FreeError::DoubleFree
    );
    assert_eq!(
        allocator.deallocate(BlockRef::Address(0)).unwrap_err(),
        FreeError::NotFound
    );
    assert_eq!(
        allocator.deallocate(BlockRef::Address(777)).unwrap_err(),
        FreeError::NotFound
    );
}

#[test]
fn failed_free_mutates_nothing() {
    let mut allocator = arena(4096, AllocationStrategy::FirstFit);
    allocator.allocate(100).unwrap();
    let before = allocator.blocks();
    allocator.deallocate(BlockRef::Id(5)).unwrap_err();
    allocator.deallocate(BlockRef::Address(12345)).unwrap_err();
    assert_eq!(allocator.blocks(), before);
}

#[test]
fn ids_are_never_reused() {
    let mut allocator = arena(4096, AllocationStrategy::FirstFit);
    let a = allocator.allocate(100).unwrap();
    allocator.deallocate(BlockRef::Id(a.id)).unwrap();
    let b = allocator.allocate(100).unwrap();
    assert_eq!(a.id, 1);
    assert_eq!(b.id, 2);
}

#[test]
fn failed_allocation_consumes_no_id() {
    let mut allocator = arena(1024, AllocationStrategy::FirstFit);
    allocator.allocate(900).unwrap();
    allocator.allocate(200).unwrap_err();
    allocator.deallocate(BlockRef::Id(1)).unwrap();
    assert_eq!(allocator.allocate(900).unwrap().id, 2);
}

#[test]
fn best_fit_breaks_ties_toward_lowest_offset() {
    let mut allocator = arena(4096, AllocationStrategy::BestFit);
    let a = allocator.allocate(100).unwrap();
    allocator.allocate(100).unwrap();
    let c = allocator.allocate(100).unwrap();
    allocator.allocate(100).unwrap();
    allocator.deallocate(BlockRef::Id(a.id)).unwrap();
    allocator.deallocate(BlockRef::Id(c.id)).unwrap();

    // Two identical 132-byte holes at offsets 0 and 264; the lower wins.
    let allocation = allocator.allocate(100).unwrap();
    assert_eq!(allocation.address, HEADER_SIZE);
}

#[test]
fn strategy_switch_leaves_blocks_alone() {
    let mut allocator = arena(4096, AllocationStrategy::FirstFit);
    allocator.allocate(100).unwrap();
    allocator.allocate(200).unwrap();
    let before = allocator.blocks();
    allocator.set_strategy(AllocationStrategy::WorstFit);
    assert_eq!(allocator.blocks(), before);
    assert_eq!(allocator.strategy(), AllocationStrategy::WorstFit);
}

#[test]
fn internal_fragmentation_tracks_consumed_excess() {
    let mut allocator = arena(1024, AllocationStrategy::FirstFit);
    assert_eq!(allocator.internal_fragmentation(), 0.0);

    // Consumes the whole arena without splitting: usable 992, requested 953.
    allocator.allocate(953).unwrap();
    let expected = (992.0 - 953.0) / 992.0 * 100.0;
    assert!((allocator.internal_fragmentation() - expected).abs() < 1e-9);
}

#[test]
fn external_fragmentation_counts_unreachable_free_space() {
    let mut allocator = arena(4096, AllocationStrategy::FirstFit);
    let a = allocator.allocate(100).unwrap();
    allocator.allocate(100).unwrap();
    allocator.deallocate(BlockRef::Id(a.id)).unwrap();

    // Free: a 132-byte hole (100 usable) and the 3832-byte tail (3800 usable).
    assert_eq!(allocator.largest_free_block(), 3800);
    let expected = 100.0 / 4096.0 * 100.0;
    assert!((allocator.external_fragmentation() - expected).abs() < 1e-9);

    let used = allocator.used_memory();
    assert_eq!(used, 132);
    assert_eq!(allocator.free_memory(), 4096 - 132);
    let expected_util = 132.0 / 4096.0 * 100.0;
    assert!((allocator.utilization() - expected_util).abs() < 1e-9);
}

#[test]
fn dump_renders_physical_order_with_hex_ranges() {
    let mut allocator = arena(4096, AllocationStrategy::FirstFit);
    allocator.allocate(100).unwrap();
    let dump = allocator.dump();
    assert!(dump.starts_with("=== Memory Dump ===\n"));
    assert!(dump.contains("[0x00000000 - 0x00000083] USED (id=1, size=100 bytes)"));
    assert!(dump.contains("[0x00000084 - 0x00000fff] FREE"));
    assert!(dump.ends_with("==================\n"));
}

#[test]
fn block_views_expose_usable_size() {
    let mut allocator = arena(4096, AllocationStrategy::FirstFit);
    allocator.allocate(100).unwrap();
    let blocks = allocator.blocks();
    assert_eq!(
        blocks[0],
        BlockView {
            offset: 0,
            size: 132,
            free: false,
            id: 1,
            usable: 100,
        }
    );
}

#[test]
fn split_constant_is_the_minimum_useful_remainder() {
    // Pinned: a different threshold re-pins the split boundary tests.
    assert_eq!(SPLIT_THRESHOLD, 8);
    assert_eq!(HEADER_SIZE, 32);
}
