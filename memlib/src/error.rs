use thiserror::Error;

/// Allocation failures. Both are non-fatal and counted by the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("zero-size allocation request")]
    ZeroSize,
    #[error("out of memory: no free block can service {requested} bytes")]
    OutOfMemory { requested: usize },
}

/// Deallocation failures. Neither mutates allocator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FreeError {
    #[error("no allocated block matches the given reference")]
    NotFound,
    #[error("block was already freed")]
    DoubleFree,
}

/// Construction failures. Fatal for the instance being built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("bad cache geometry: {reason}")]
    BadGeometry { reason: String },
    #[error("arena of {total} bytes cannot hold a {header}-byte block header")]
    ArenaTooSmall { total: usize, header: usize },
}

/// Trace replay failures.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("couldn't read the trace: {0}")]
    Io(#[from] std::io::Error),
    #[error("trace is not a whole number of {record_size}-byte records ({len} bytes)")]
    Truncated { len: usize, record_size: usize },
}

/// Errors surfaced by the controller to the surrounding shell.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("memory not initialised")]
    Uninitialised,
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error(transparent)]
    Free(#[from] FreeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Trace(#[from] TraceError),
}
