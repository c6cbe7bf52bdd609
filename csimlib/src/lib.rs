//! # CsimLib
//!
//! CsimLib simulates a set associative cache with least recently used replacement against a
//! valgrind memory trace, counting hits, misses and evictions
//!
//! Each set keeps its lines in a fixed pool of slots, with two intrusive structures over the same
//! slots: a recency list to pick the line to evict, and a splay tree to find a line by its tag

/// Splits addresses into set indices and tags
pub mod address;

/// Contains the cache and its sets
pub mod cache;

/// Contains the configuration format, which can be read from JSON or built from the command line
pub mod config;

/// Error types for every stage of a simulation
pub mod error;

/// Opens trace files
pub mod io;

/// The intrusive recency ordered list used for replacement
pub mod recency_list;

/// Contains the simulator used to replay a trace through a cache
pub mod simulator;

/// The intrusive splay tree used to look lines up by tag
pub mod tag_index;

/// Parsing of valgrind lackey traces
pub mod trace;


/// Contains utilities for running tests and benchmarks.
pub mod util;
