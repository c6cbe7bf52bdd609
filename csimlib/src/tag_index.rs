//! An intrusive top-down splay tree over slots of a pool
//!
//! Like the [`RecencyList`](crate::recency_list::RecencyList), the tree owns none of its
//! elements; each element embeds a [`TreeLink`] and reports its own key. Every operation walks
//! from the root towards the key and re-roots the tree at the last node reached, so there are no
//! parent pointers or balance fields, and any access, including a lookup, changes the shape of
//! the tree. Operations are amortised O(log n), though a single one may be O(n).

use std::cmp::Ordering;
use crate::recency_list::SlotIndex;

/// The child pointers embedded in every tree element
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeLink {
    left: Option<SlotIndex>,
    right: Option<SlotIndex>,
}

/// Implemented by pool elements which can be linked into a [`TagIndex`]
pub trait TreeLinks {
    type Key: Ord + Copy;

    fn key(&self) -> Self::Key;
    fn tree_link(&self) -> &TreeLink;
    fn tree_link_mut(&mut self) -> &mut TreeLink;
}

#[derive(Debug, Default, Clone)]
pub struct TagIndex {
    root: Option<SlotIndex>,
    len: usize,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn root(&self) -> Option<SlotIndex> {
        self.root
    }

    /// Inserts `item` keyed by its own key
    ///
    /// Returns false, leaving the set of indexed slots unchanged, if a slot with the same key is
    /// already present. That is not an error, callers decide whether it matters
    pub fn insert<T: TreeLinks>(&mut self, pool: &mut [T], item: SlotIndex) -> bool {
        let key = pool[item].key();
        let Some(root) = self.root else {
            *pool[item].tree_link_mut() = TreeLink::default();
            self.root = Some(item);
            self.len += 1;
            return true;
        };
        let top = splay(pool, root, &key);
        self.root = Some(top);
        let link = match key.cmp(&pool[top].key()) {
            Ordering::Less => {
                let link = TreeLink { left: left(pool, top), right: Some(top) };
                set_left(pool, top, None);
                link
            }
            Ordering::Greater => {
                let link = TreeLink { left: Some(top), right: right(pool, top) };
                set_right(pool, top, None);
                link
            }
            Ordering::Equal => return false,
        };
        *pool[item].tree_link_mut() = link;
        self.root = Some(item);
        self.len += 1;
        true
    }

    /// Removes the slot with `item`'s key, returning whether one was found
    pub fn remove<T: TreeLinks>(&mut self, pool: &mut [T], item: SlotIndex) -> bool {
        let Some(root) = self.root else {
            return false;
        };
        let key = pool[item].key();
        let top = splay(pool, root, &key);
        if pool[top].key() != key {
            self.root = Some(top);
            return false;
        }
        debug_assert_eq!(top, item);
        // Everything on the left is smaller than the key, so splaying for it again brings the
        // largest one up, which then has no right child
        self.root = match left(pool, top) {
            None => right(pool, top),
            Some(left_subtree) => {
                let predecessor = splay(pool, left_subtree, &key);
                set_right(pool, predecessor, right(pool, top));
                Some(predecessor)
            }
        };
        *pool[top].tree_link_mut() = TreeLink::default();
        self.len -= 1;
        true
    }

    /// Finds the slot holding `key`
    ///
    /// The key is splayed towards the root whether or not it is present, so this needs exclusive
    /// access to the tree just like the mutating operations do
    pub fn search<T: TreeLinks>(&mut self, pool: &mut [T], key: &T::Key) -> Option<SlotIndex> {
        let top = splay(pool, self.root?, key);
        self.root = Some(top);
        (pool[top].key() == *key).then_some(top)
    }
}

#[inline]
fn left<T: TreeLinks>(pool: &[T], node: SlotIndex) -> Option<SlotIndex> {
    pool[node].tree_link().left
}

#[inline]
fn right<T: TreeLinks>(pool: &[T], node: SlotIndex) -> Option<SlotIndex> {
    pool[node].tree_link().right
}

#[inline]
fn set_left<T: TreeLinks>(pool: &mut [T], node: SlotIndex, child: Option<SlotIndex>) {
    pool[node].tree_link_mut().left = child;
}

#[inline]
fn set_right<T: TreeLinks>(pool: &mut [T], node: SlotIndex, child: Option<SlotIndex>) {
    pool[node].tree_link_mut().right = child;
}

/// Top-down splay of the subtree rooted at `root`, returning the new root
///
/// Nodes passed on the way down are hung off two side trees: everything smaller than the key
/// under `left_max`, everything larger under `right_min`. Two steps in the same direction rotate
/// first. The node the walk stops at (the key itself, or the last node before the walk fell off
/// the tree) becomes the root with the side trees reattached as its children.
fn splay<T: TreeLinks>(pool: &mut [T], root: SlotIndex, key: &T::Key) -> SlotIndex {
    let mut node = root;
    let (mut left_root, mut left_max) = (None, None);
    let (mut right_root, mut right_min) = (None, None);
    loop {
        match key.cmp(&pool[node].key()) {
            Ordering::Less => {
                let Some(mut child) = left(pool, node) else {
                    break;
                };
                if *key < pool[child].key() {
                    // rotate right
                    set_left(pool, node, right(pool, child));
                    set_right(pool, child, Some(node));
                    node = child;
                    match left(pool, node) {
                        Some(next) => child = next,
                        None => break,
                    }
                }
                match right_min {
                    Some(min) => set_left(pool, min, Some(node)),
                    None => right_root = Some(node),
                }
                right_min = Some(node);
                node = child;
            }
            Ordering::Greater => {
                let Some(mut child) = right(pool, node) else {
                    break;
                };
                if *key > pool[child].key() {
                    // rotate left
                    set_right(pool, node, left(pool, child));
                    set_left(pool, child, Some(node));
                    node = child;
                    match right(pool, node) {
                        Some(next) => child = next,
                        None => break,
                    }
                }
                match left_max {
                    Some(max) => set_right(pool, max, Some(node)),
                    None => left_root = Some(node),
                }
                left_max = Some(node);
                node = child;
            }
            Ordering::Equal => break,
        }
    }
    let (node_left, node_right) = (left(pool, node), right(pool, node));
    match left_max {
        Some(max) => set_right(pool, max, node_left),
        None => left_root = node_left,
    }
    match right_min {
        Some(min) => set_left(pool, min, node_right),
        None => right_root = node_right,
    }
    set_left(pool, node, left_root);
    set_right(pool, node, right_root);
    node
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use proptest::prelude::*;
    use super::*;

    #[derive(Debug, Default, Clone)]
    struct Node {
        key: u64,
        link: TreeLink,
    }

    impl TreeLinks for Node {
        type Key = u64;

        fn key(&self) -> u64 {
            self.key
        }

        fn tree_link(&self) -> &TreeLink {
            &self.link
        }

        fn tree_link_mut(&mut self) -> &mut TreeLink {
            &mut self.link
        }
    }

    fn pool(keys: impl IntoIterator<Item = u64>) -> Vec<Node> {
        keys.into_iter().map(|key| Node { key, link: TreeLink::default() }).collect()
    }

    fn in_order(tree: &TagIndex, pool: &[Node]) -> Vec<u64> {
        fn walk(pool: &[Node], node: Option<SlotIndex>, out: &mut Vec<u64>) {
            if let Some(node) = node {
                walk(pool, left(pool, node), out);
                out.push(pool[node].key);
                walk(pool, right(pool, node), out);
            }
        }
        let mut out = Vec::new();
        walk(pool, tree.root(), &mut out);
        out
    }

    fn depth(pool: &[Node], node: Option<SlotIndex>) -> usize {
        match node {
            None => 0,
            Some(node) => 1 + depth(pool, left(pool, node)).max(depth(pool, right(pool, node))),
        }
    }

    #[test]
    fn insert_keeps_order_and_roots_new_node() {
        let mut nodes = pool([50, 20, 80, 10, 30, 70, 90]);
        let mut tree = TagIndex::new();
        for i in 0..nodes.len() {
            assert!(tree.insert(&mut nodes, i));
            assert_eq!(tree.root(), Some(i));
        }
        assert_eq!(tree.len(), 7);
        assert_eq!(in_order(&tree, &nodes), vec![10, 20, 30, 50, 70, 80, 90]);
    }

    #[test]
    fn duplicate_insert_is_a_no_op() {
        let mut nodes = pool([5, 7, 5]);
        let mut tree = TagIndex::new();
        assert!(tree.insert(&mut nodes, 0));
        assert!(tree.insert(&mut nodes, 1));
        assert!(!tree.insert(&mut nodes, 2));
        assert_eq!(tree.len(), 2);
        assert_eq!(in_order(&tree, &nodes), vec![5, 7]);
        assert_eq!(tree.search(&mut nodes, &5), Some(0));
    }

    #[test]
    fn search_splays_even_on_miss() {
        let mut nodes = pool(0..8);
        let mut tree = TagIndex::new();
        for i in 0..nodes.len() {
            tree.insert(&mut nodes, i);
        }
        assert_eq!(tree.search(&mut nodes, &3), Some(3));
        assert_eq!(tree.root(), Some(3));
        assert_eq!(tree.search(&mut nodes, &100), None);
        assert_eq!(tree.root(), Some(7));
        assert_eq!(in_order(&tree, &nodes), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn search_on_empty_tree() {
        let mut nodes = pool([1]);
        let mut tree = TagIndex::new();
        assert_eq!(tree.search(&mut nodes, &1), None);
        assert!(!tree.remove(&mut nodes, 0));
        assert!(tree.is_empty());
    }

    #[test]
    fn remove_rejoins_subtrees() {
        let mut nodes = pool([40, 20, 60, 10, 30, 50, 70]);
        let mut tree = TagIndex::new();
        for i in 0..nodes.len() {
            tree.insert(&mut nodes, i);
        }
        assert!(tree.remove(&mut nodes, 0));
        assert_eq!(in_order(&tree, &nodes), vec![10, 20, 30, 50, 60, 70]);
        assert_eq!(tree.search(&mut nodes, &40), None);
        // Smallest key has no left subtree once splayed
        assert!(tree.remove(&mut nodes, 3));
        assert_eq!(in_order(&tree, &nodes), vec![20, 30, 50, 60, 70]);
        assert_eq!(tree.len(), 5);
        assert!(!tree.remove(&mut nodes, 3));
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn removed_slot_can_be_reinserted_with_new_key() {
        let mut nodes = pool([1, 2, 3]);
        let mut tree = TagIndex::new();
        for i in 0..3 {
            tree.insert(&mut nodes, i);
        }
        assert!(tree.remove(&mut nodes, 1));
        nodes[1].key = 9;
        assert!(tree.insert(&mut nodes, 1));
        assert_eq!(in_order(&tree, &nodes), vec![1, 3, 9]);
        assert_eq!(tree.search(&mut nodes, &9), Some(1));
        assert_eq!(tree.search(&mut nodes, &2), None);
    }

    #[test]
    fn accessing_a_sequential_chain_rebalances_it() {
        let mut nodes = pool(0..1024);
        let mut tree = TagIndex::new();
        for i in 0..nodes.len() {
            tree.insert(&mut nodes, i);
        }
        // Ascending inserts leave a left spine
        assert_eq!(depth(&nodes, tree.root()), 1024);
        assert_eq!(tree.search(&mut nodes, &0), Some(0));
        assert!(depth(&nodes, tree.root()) < 600);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(usize),
        Remove(usize),
        Search(u64),
    }

    fn ops() -> impl Strategy<Value = Vec<Op>> {
        let op = prop_oneof![
            (0usize..32).prop_map(Op::Insert),
            (0usize..32).prop_map(Op::Remove),
            (0u64..40).prop_map(Op::Search),
        ];
        prop::collection::vec(op, 1..300)
    }

    proptest! {
        #[test]
        fn matches_btree_set(ops in ops()) {
            // Slot i always holds key 2 * i, searches also probe the odd keys in between
            let mut nodes = pool((0..32).map(|i| 2 * i));
            let mut tree = TagIndex::new();
            let mut model = BTreeSet::new();
            for op in ops {
                match op {
                    Op::Insert(slot) => {
                        let expected = model.insert(2 * slot as u64);
                        prop_assert_eq!(tree.insert(&mut nodes, slot), expected);
                    }
                    Op::Remove(slot) => {
                        let expected = model.remove(&(2 * slot as u64));
                        prop_assert_eq!(tree.remove(&mut nodes, slot), expected);
                    }
                    Op::Search(key) => {
                        let expected = model.contains(&key).then_some(key as usize / 2);
                        prop_assert_eq!(tree.search(&mut nodes, &key), expected);
                    }
                }
                prop_assert_eq!(tree.len(), model.len());
                prop_assert_eq!(in_order(&tree, &nodes), model.iter().copied().collect::<Vec<_>>());
            }
        }
    }
}
