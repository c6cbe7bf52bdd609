use crate::address::AddressDecoder;
use crate::config::CacheGeometry;
use crate::error::{InvariantViolation, SimulationError};
use crate::recency_list::{ListLink, ListLinks, RecencyList, SlotIndex};
use crate::tag_index::{TagIndex, TreeLink, TreeLinks};

/// One line slot. A claimed slot is linked into both its set's recency list and tag index,
/// never just one of them
#[derive(Debug, Default, Clone)]
pub struct CacheLine {
    tag: u64,
    recency: ListLink,
    index: TreeLink,
}

impl ListLinks for CacheLine {
    fn list_link(&self) -> &ListLink {
        &self.recency
    }

    fn list_link_mut(&mut self) -> &mut ListLink {
        &mut self.recency
    }
}

impl TreeLinks for CacheLine {
    type Key = u64;

    fn key(&self) -> u64 {
        self.tag
    }

    fn tree_link(&self) -> &TreeLink {
        &self.index
    }

    fn tree_link_mut(&mut self) -> &mut TreeLink {
        &mut self.index
    }
}

/// What a single access did to its set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Hit,
    /// Missed, and the line was filled into a slot that had never been used
    ColdMiss,
    /// Missed in a full set, replacing the least recently used line
    Eviction { evicted_tag: u64 },
}

/// A single set: a fixed pool of `associativity` slots, plus a recency list and a tag index over
/// the claimed ones
///
/// Slots are claimed in order and never released, so the claimed slots are always exactly
/// `lines[..claimed]`, and both structures must always hold exactly that many lines
#[derive(Debug)]
pub struct CacheSet {
    lines: Box<[CacheLine]>,
    claimed: usize,
    recency: RecencyList,
    tags: TagIndex,
}

impl CacheSet {
    pub fn new(associativity: usize) -> Self {
        Self {
            lines: vec![CacheLine::default(); associativity].into_boxed_slice(),
            claimed: 0,
            recency: RecencyList::new(),
            tags: TagIndex::new(),
        }
    }

    pub fn associativity(&self) -> usize {
        self.lines.len()
    }

    pub fn resident_count(&self) -> usize {
        self.claimed
    }

    pub fn unclaimed_count(&self) -> usize {
        self.lines.len() - self.claimed
    }

    pub fn is_full(&self) -> bool {
        self.claimed == self.lines.len()
    }

    /// Resident tags from most to least recently used
    pub fn resident_tags(&self) -> Vec<u64> {
        self.recency.iter(&self.lines).map(|slot| self.lines[slot].tag).collect()
    }

    /// Checks that the recency list and tag index agree on how many lines are resident
    pub fn check_residency(&self) -> Result<(), InvariantViolation> {
        let (recency, index) = (self.recency.len(), self.tags.len());
        if recency != index || recency != self.claimed {
            return Err(InvariantViolation::ResidencyMismatch { recency, index });
        }
        Ok(())
    }

    /// Accesses the line holding `tag`, filling it on a miss
    ///
    /// On a hit only the recency order changes. On a miss the line goes into the next unclaimed
    /// slot, or, if the set is full, replaces the least recently used line. Either way the
    /// accessed line ends up most recently used.
    pub fn access(&mut self, tag: u64) -> Result<AccessOutcome, InvariantViolation> {
        self.check_residency()?;
        if let Some(slot) = self.tags.search(&mut self.lines, &tag) {
            self.recency.remove(&mut self.lines, slot);
            self.recency.push_front(&mut self.lines, slot);
            return Ok(AccessOutcome::Hit);
        }
        if !self.is_full() {
            let slot = self.claimed;
            self.claimed += 1;
            self.fill(slot, tag)?;
            return Ok(AccessOutcome::ColdMiss);
        }
        let victim = self.recency.pop_back(&mut self.lines).ok_or(InvariantViolation::EmptyRecencyList)?;
        let evicted_tag = self.lines[victim].tag;
        if !self.tags.remove(&mut self.lines, victim) {
            return Err(InvariantViolation::StaleIndexEntry { tag: evicted_tag });
        }
        self.fill(victim, tag)?;
        Ok(AccessOutcome::Eviction { evicted_tag })
    }

    /// Tags an unlinked slot and links it into both structures
    fn fill(&mut self, slot: SlotIndex, tag: u64) -> Result<(), InvariantViolation> {
        self.lines[slot].tag = tag;
        if !self.tags.insert(&mut self.lines, slot) {
            return Err(InvariantViolation::DuplicateTag { tag });
        }
        self.recency.push_front(&mut self.lines, slot);
        Ok(())
    }
}

/// A set associative cache with least recently used replacement
///
/// The shape is fixed on construction: every set and every line slot is allocated up front
#[derive(Debug)]
pub struct Cache {
    decoder: AddressDecoder,
    sets: Vec<CacheSet>,
}

impl Cache {
    pub fn new(geometry: &CacheGeometry) -> Self {
        Self {
            decoder: AddressDecoder::new(geometry.set_bits(), geometry.block_bits()),
            sets: (0..geometry.num_sets()).map(|_| CacheSet::new(geometry.associativity())).collect(),
        }
    }

    /// Converts an address into a set and a tag
    pub fn address_to_set_and_tag(&self, input: u64) -> (u64, u64) {
        self.decoder.decode(input)
    }

    /// Accesses the line containing `input`, updating the set's replacement state
    ///
    /// Returns the decoded set index alongside the outcome
    pub fn access(&mut self, input: u64) -> Result<(u64, AccessOutcome), SimulationError> {
        let (set, tag) = self.address_to_set_and_tag(input);
        // The decoder masks the set index to the number of sets, so this can't be out of range
        let outcome = self.sets[set as usize]
            .access(tag)
            .map_err(|violation| SimulationError::InvariantViolation { set, tag, violation })?;
        Ok((set, outcome))
    }

    pub fn sets(&self) -> &[CacheSet] {
        &self.sets
    }

    /// Number of line slots never used since the cache was created. Useful for analysing cache
    /// performance or debugging
    pub fn get_unclaimed_line_count(&self) -> usize {
        self.sets.iter().map(CacheSet::unclaimed_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_then_evicts_least_recently_used() {
        let mut set = CacheSet::new(2);
        assert_eq!(set.access(1), Ok(AccessOutcome::ColdMiss));
        assert_eq!(set.access(2), Ok(AccessOutcome::ColdMiss));
        assert!(set.is_full());
        assert_eq!(set.access(1), Ok(AccessOutcome::Hit));
        assert_eq!(set.resident_tags(), vec![1, 2]);
        assert_eq!(set.access(3), Ok(AccessOutcome::Eviction { evicted_tag: 2 }));
        assert_eq!(set.resident_tags(), vec![3, 1]);
        assert_eq!(set.access(2), Ok(AccessOutcome::Eviction { evicted_tag: 1 }));
        assert_eq!(set.resident_tags(), vec![2, 3]);
        assert_eq!(set.resident_count(), 2);
        assert!(set.check_residency().is_ok());
    }

    #[test]
    fn hit_only_reorders() {
        let mut set = CacheSet::new(4);
        for tag in [10, 20, 30] {
            set.access(tag).unwrap();
        }
        assert_eq!(set.access(10), Ok(AccessOutcome::Hit));
        assert_eq!(set.access(10), Ok(AccessOutcome::Hit));
        assert_eq!(set.resident_tags(), vec![10, 30, 20]);
        assert_eq!(set.unclaimed_count(), 1);
    }

    #[test]
    fn direct_mapped_set() {
        let mut set = CacheSet::new(1);
        assert_eq!(set.access(0), Ok(AccessOutcome::ColdMiss));
        assert_eq!(set.access(0), Ok(AccessOutcome::Hit));
        assert_eq!(set.access(7), Ok(AccessOutcome::Eviction { evicted_tag: 0 }));
        assert_eq!(set.resident_tags(), vec![7]);
    }

    #[test]
    fn detects_diverged_structures() {
        let mut set = CacheSet::new(2);
        set.access(1).unwrap();
        // Unlink the line from the recency list only
        set.recency.remove(&mut set.lines, 0);
        assert_eq!(set.access(1), Err(InvariantViolation::ResidencyMismatch { recency: 0, index: 1 }));
    }

    #[test]
    fn cache_routes_addresses_to_sets() {
        let geometry = CacheGeometry::new(1, 0, 1).unwrap();
        let mut cache = Cache::new(&geometry);
        assert_eq!(cache.get_unclaimed_line_count(), 2);
        assert_eq!(cache.access(0x0).unwrap(), (0, AccessOutcome::ColdMiss));
        assert_eq!(cache.access(0x1).unwrap(), (1, AccessOutcome::ColdMiss));
        assert_eq!(cache.access(0x2).unwrap(), (0, AccessOutcome::Eviction { evicted_tag: 0 }));
        assert_eq!(cache.access(0x3).unwrap(), (1, AccessOutcome::Eviction { evicted_tag: 0 }));
        assert_eq!(cache.get_unclaimed_line_count(), 0);
        assert_eq!(cache.sets()[0].resident_tags(), vec![1]);
    }

    #[test]
    fn reports_set_and_tag_on_violation() {
        let geometry = CacheGeometry::new(2, 4, 1).unwrap();
        let mut cache = Cache::new(&geometry);
        cache.access(0x130).unwrap();
        let set = &mut cache.sets[3];
        set.recency.remove(&mut set.lines, 0);
        match cache.access(0x130) {
            Err(SimulationError::InvariantViolation { set, tag, .. }) => {
                assert_eq!(set, 3);
                assert_eq!(tag, 4);
            }
            other => panic!("expected an invariant violation, got {other:?}"),
        }
    }
}
