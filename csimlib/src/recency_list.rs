//! An intrusive doubly linked list ordering slots of a pool from most to least recently used
//!
//! The list does not own its elements. Each element embeds a [`ListLink`] and the list only
//! stores the head, tail and length, with every operation taking the pool the indices refer to.
//! This lets the same slot be a member of other intrusive structures at the same time

/// Index of a slot within the pool a list is built over
pub type SlotIndex = usize;

/// The previous/next pointers embedded in every list element
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListLink {
    prev: Option<SlotIndex>,
    next: Option<SlotIndex>,
}

/// Implemented by pool elements which can be linked into a [`RecencyList`]
pub trait ListLinks {
    fn list_link(&self) -> &ListLink;
    fn list_link_mut(&mut self) -> &mut ListLink;
}

#[derive(Debug, Default, Clone)]
pub struct RecencyList {
    head: Option<SlotIndex>,
    tail: Option<SlotIndex>,
    len: usize,
}

impl RecencyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The most recently used slot
    pub fn front(&self) -> Option<SlotIndex> {
        self.head
    }

    /// The least recently used slot
    pub fn back(&self) -> Option<SlotIndex> {
        self.tail
    }

    /// Links `item` in as the most recently used slot. `item` must not already be in the list
    pub fn push_front<T: ListLinks>(&mut self, pool: &mut [T], item: SlotIndex) {
        let old_head = self.head;
        *pool[item].list_link_mut() = ListLink {
            prev: None,
            next: old_head,
        };
        match old_head {
            Some(head) => pool[head].list_link_mut().prev = Some(item),
            None => self.tail = Some(item),
        }
        self.head = Some(item);
        self.len += 1;
    }

    /// Unlinks and returns the least recently used slot, or None if the list is empty
    pub fn pop_back<T: ListLinks>(&mut self, pool: &mut [T]) -> Option<SlotIndex> {
        let tail = self.tail?;
        self.remove(pool, tail);
        Some(tail)
    }

    /// Unlinks `item` from wherever it is in the list. `item` must currently be linked into this
    /// list, there is no search to check this
    pub fn remove<T: ListLinks>(&mut self, pool: &mut [T], item: SlotIndex) {
        debug_assert!(self.len > 0);
        let ListLink { prev, next } = *pool[item].list_link();
        match prev {
            Some(prev) => pool[prev].list_link_mut().next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => pool[next].list_link_mut().prev = prev,
            None => self.tail = prev,
        }
        *pool[item].list_link_mut() = ListLink::default();
        self.len -= 1;
    }

    /// Walks the list from most to least recently used
    pub fn iter<'a, T: ListLinks>(&self, pool: &'a [T]) -> Iter<'a, T> {
        Iter {
            pool,
            current: self.head,
        }
    }
}

pub struct Iter<'a, T> {
    pool: &'a [T],
    current: Option<SlotIndex>,
}

impl<'a, T: ListLinks> Iterator for Iter<'a, T> {
    type Item = SlotIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.current = self.pool[current].list_link().next;
        Some(current)
    }
}
