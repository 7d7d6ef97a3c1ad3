use std::io::Read;

use crate::error::TraceError;
use crate::hex::HEX_PAIRS;
use crate::hierarchy::CacheHierarchy;

/// One trace record: 16 hex digits of address plus a terminator byte.
pub const RECORD_SIZE: usize = 17;

const ADDRESS_DIGITS: usize = 16;

/// Aggregate outcome of replaying a trace through a hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceSummary {
    pub accesses: u64,
    pub l1_hits: u64,
    pub l1_misses: u64,
    pub l2_hits: u64,
    pub l2_misses: u64,
    /// Whatever missed the last level went to memory.
    pub main_memory_accesses: u64,
}

/// Replays every record of a trace through the hierarchy.
///
/// The reader is drained fully before parsing; records that are not a
/// whole multiple of `RECORD_SIZE` bytes fail without touching the cache.
pub fn replay<R: Read>(mut reader: R, cache: &mut CacheHierarchy) -> Result<TraceSummary, TraceError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    replay_bytes(&bytes, cache)
}

/// Replays a trace already held in memory.
///
/// The byte layout is not validated beyond framing; garbage hex digits
/// parse as zero, the way the lookup table defines them.
pub fn replay_bytes(bytes: &[u8], cache: &mut CacheHierarchy) -> Result<TraceSummary, TraceError> {
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(TraceError::Truncated {
            len: bytes.len(),
            record_size: RECORD_SIZE,
        });
    }
    let mut summary = TraceSummary::default();
    for record in bytes.chunks_exact(RECORD_SIZE) {
        let address = parse_address((&record[..ADDRESS_DIGITS]).try_into().unwrap());
        let report = cache.access(address);
        summary.accesses += 1;
        if report.l1_hit {
            summary.l1_hits += 1;
        } else {
            summary.l1_misses += 1;
            if report.l2_hit {
                summary.l2_hits += 1;
            } else {
                summary.l2_misses += 1;
            }
        }
    }
    summary.main_memory_accesses = summary.l2_misses;
    Ok(summary)
}

/// Parses a 64-bit address from 16 hexadecimal digits.
///
/// `from_str_radix` dominates the replay profile for small caches, so the
/// digits go through a build-script-generated table that resolves a pair
/// of characters per lookup.
///
/// # Examples
///
/// ```
/// use memlib::trace::parse_address;
/// let address = b"000000000000000A";
/// assert_eq!(parse_address(address), 10);
/// ```
pub fn parse_address(buf: &[u8; 16]) -> u64 {
    let mut result: u64 = 0;
    let mut i = 0;
    while i < 15 {
        result <<= 8;
        result |= HEX_PAIRS[buf[i] as usize][buf[i + 1] as usize] as u64;
        i += 2;
    }
    debug_assert_eq!(
        {
            let as_str = std::str::from_utf8(buf).unwrap();
            u64::from_str_radix(as_str, 16).unwrap()
        },
        result
    );
    result
}
