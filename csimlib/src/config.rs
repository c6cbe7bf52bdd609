use std::io::Read;
use std::mem::size_of;
use serde::{Deserialize, Serialize};
use crate::cache::CacheLine;
use crate::error::ConfigError;

/// The widest set index plus block offset the simulator accepts
pub const MAX_ADDRESS_BITS: u32 = 63;

/// A simulation configuration, from JSON or the command line
///
/// Every field is optional so that a config file and command line flags can be layered with
/// [`SimulationConfig::merge`]; [`SimulationConfig::geometry`] reports whatever is still missing.
/// The short names used by the command line (`s`, `E`, `b`) are accepted as aliases
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(alias = "s")]
    pub set_bits: Option<u32>,
    #[serde(alias = "E")]
    pub associativity: Option<usize>,
    #[serde(alias = "b")]
    pub block_bits: Option<u32>,
    #[serde(default)]
    pub verbose: bool,
}

impl SimulationConfig {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        serde_json::from_reader(reader).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Layers `overrides` on top of this configuration. Fields set in `overrides` win, verbosity
    /// is enabled if either asks for it
    pub fn merge(self, overrides: SimulationConfig) -> Self {
        Self {
            set_bits: overrides.set_bits.or(self.set_bits),
            associativity: overrides.associativity.or(self.associativity),
            block_bits: overrides.block_bits.or(self.block_bits),
            verbose: self.verbose || overrides.verbose,
        }
    }

    /// Validates the configuration, producing the geometry of the cache to simulate
    pub fn geometry(&self) -> Result<CacheGeometry, ConfigError> {
        let set_bits = self.set_bits.ok_or(ConfigError::Missing("set_bits (-s)"))?;
        let associativity = self.associativity.ok_or(ConfigError::Missing("associativity (-E)"))?;
        let block_bits = self.block_bits.ok_or(ConfigError::Missing("block_bits (-b)"))?;
        if set_bits == 0 {
            return Err(ConfigError::NotPositive { name: "set_bits" });
        }
        if block_bits == 0 {
            return Err(ConfigError::NotPositive { name: "block_bits" });
        }
        CacheGeometry::new(set_bits, block_bits, associativity)
    }
}

/// The validated shape of a cache: `2^set_bits` sets of `associativity` lines, each line
/// covering `2^block_bits` bytes
///
/// Unlike [`SimulationConfig::geometry`] this accepts zero set or block bits, as a fully
/// associative cache or byte sized lines are perfectly well defined for the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheGeometry {
    set_bits: u32,
    block_bits: u32,
    associativity: usize,
}

impl CacheGeometry {
    pub fn new(set_bits: u32, block_bits: u32, associativity: usize) -> Result<Self, ConfigError> {
        if associativity == 0 {
            return Err(ConfigError::NotPositive { name: "associativity" });
        }
        match set_bits.checked_add(block_bits) {
            Some(bits) if bits <= MAX_ADDRESS_BITS => {}
            _ => return Err(ConfigError::AddressSpaceExceeded { set_bits, block_bits, max: MAX_ADDRESS_BITS }),
        }
        let fits = 1usize.checked_shl(set_bits)
            .filter(|sets| sets.leading_zeros() > 0)
            .and_then(|sets| sets.checked_mul(associativity))
            .and_then(|lines| lines.checked_mul(size_of::<CacheLine>()))
            .map_or(false, |bytes| bytes <= isize::MAX as usize);
        if !fits {
            return Err(ConfigError::TooLarge { set_bits, associativity });
        }
        Ok(Self { set_bits, block_bits, associativity })
    }

    pub fn set_bits(&self) -> u32 {
        self.set_bits
    }

    pub fn block_bits(&self) -> u32 {
        self.block_bits
    }

    pub fn associativity(&self) -> usize {
        self.associativity
    }

    pub fn num_sets(&self) -> usize {
        1 << self.set_bits
    }
}
