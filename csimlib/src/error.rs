use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Problems with a cache configuration, detected before any access is simulated
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required parameter: {0}")]
    Missing(&'static str),
    #[error("{name} must be greater than zero")]
    NotPositive { name: &'static str },
    #[error("{set_bits} set index bits and {block_bits} block offset bits exceed the {max} usable address bits")]
    AddressSpaceExceeded { set_bits: u32, block_bits: u32, max: u32 },
    #[error("a cache with 2^{set_bits} sets of {associativity} lines cannot be allocated")]
    TooLarge { set_bits: u32, associativity: usize },
    #[error("couldn't parse the config file: {0}")]
    Parse(String),
}

/// Reasons a trace line was rejected
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    #[error("unknown access mode '{0}'")]
    UnknownOperation(char),
    #[error("expected \"<op> <hex address>,<size>\"")]
    Unrecognised,
    #[error("address does not fit in 64 bits")]
    AddressOverflow,
    #[error("access size does not fit in 32 bits")]
    SizeOverflow,
}

/// A disagreement between a set's recency list and its tag index. Never caused by a well formed
/// trace, so seeing one means the engine has a bug
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("recency list holds {recency} lines but the tag index holds {index}")]
    ResidencyMismatch { recency: usize, index: usize },
    #[error("set is full but its recency list is empty")]
    EmptyRecencyList,
    #[error("least recently used line (tag {tag:#x}) was not in the tag index")]
    StaleIndexEntry { tag: u64 },
    #[error("tag {tag:#x} was already indexed when it missed")]
    DuplicateTag { tag: u64 },
}

/// Everything that can stop a simulation run
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),
    #[error("unable to open trace file {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read the trace: {0}")]
    TraceRead(#[source] io::Error),
    #[error("malformed trace record on line {line} ({text:?}): {reason}")]
    MalformedRecord {
        line: usize,
        text: String,
        reason: MalformedReason,
    },
    #[error("internal invariant violated in set {set} while accessing tag {tag:#x}: {violation}")]
    InvariantViolation {
        set: u64,
        tag: u64,
        violation: InvariantViolation,
    },
    #[error("failed to write the verbose trace: {0}")]
    Output(#[source] io::Error),
}
