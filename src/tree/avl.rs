//! AVL tree with subtree counts
//!
//! Nodes live in a slab and link to each other by `NodeId`. The rebalancing
//! primitives (`rotate_*`, `fix`, `detach`) mirror the classic intrusive AVL
//! shape; the public methods wrap them with ordering and order statistics.

use std::borrow::Borrow;
use std::cmp::{max, Ordering};

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Stable handle of a tree node, valid until the node is deleted
    pub struct NodeId;
}

#[derive(Debug)]
pub(crate) struct AvlNode<T> {
    pub(crate) value: T,
    pub(crate) height: u32,
    pub(crate) count: u32,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl<T> AvlNode<T> {
    fn leaf(value: T, parent: Option<NodeId>) -> Self {
        Self {
            value,
            height: 1,
            count: 1,
            left: None,
            right: None,
            parent,
        }
    }
}

/// Self-balancing ordered tree with order statistics
///
/// Equal values are allowed; a new value goes to the right of any equal
/// value already present, so in-order iteration is stable.
pub struct AvlTree<T> {
    pub(crate) nodes: SlotMap<NodeId, AvlNode<T>>,
    pub(crate) root: Option<NodeId>,
}

impl<T> AvlTree<T> {
    /// Create an empty tree
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Height of the whole tree (0 when empty)
    pub fn height(&self) -> u32 {
        self.height_of(self.root)
    }

    /// Value stored at `id`, if the node is still in the tree
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id).map(|node| &node.value)
    }

    /// Insert a value and rebalance; returns the new node's handle
    pub fn insert(&mut self, value: T) -> NodeId
    where
        T: Ord,
    {
        let Some(mut cursor) = self.root else {
            let id = self.nodes.insert(AvlNode::leaf(value, None));
            self.root = Some(id);
            return id;
        };

        loop {
            let node = &self.nodes[cursor];
            let go_left = value < node.value;
            let next = if go_left { node.left } else { node.right };

            match next {
                Some(child) => cursor = child,
                None => {
                    let id = self.nodes.insert(AvlNode::leaf(value, Some(cursor)));
                    if go_left {
                        self.nodes[cursor].left = Some(id);
                    } else {
                        self.nodes[cursor].right = Some(id);
                    }
                    self.root = Some(self.fix(id));
                    return id;
                }
            }
        }
    }

    /// Remove a node and return its value; `None` if the handle is stale
    pub fn delete(&mut self, id: NodeId) -> Option<T> {
        if !self.nodes.contains_key(id) {
            return None;
        }
        self.root = self.detach(id);
        self.nodes.remove(id).map(|node| node.value)
    }

    /// Any node whose value equals `probe`
    pub fn find<Q>(&self, probe: &Q) -> Option<NodeId>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cursor = self.root;
        while let Some(id) = cursor {
            let node = &self.nodes[id];
            let value: &Q = node.value.borrow();
            cursor = match probe.cmp(value) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(id),
            };
        }
        None
    }

    /// First node (in order) whose value is `>= probe`
    pub fn lower_bound<Q>(&self, probe: &Q) -> Option<NodeId>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut found = None;
        let mut cursor = self.root;
        while let Some(id) = cursor {
            let node = &self.nodes[id];
            let value: &Q = node.value.borrow();
            if value >= probe {
                found = Some(id);
                cursor = node.left;
            } else {
                cursor = node.right;
            }
        }
        found
    }

    /// Zero-based in-order position of `id`
    pub fn rank(&self, id: NodeId) -> Option<usize> {
        let node = self.nodes.get(id)?;
        let mut rank = self.count_of(node.left);

        let mut cursor = id;
        while let Some(parent) = self.nodes[cursor].parent {
            let p = &self.nodes[parent];
            if p.right == Some(cursor) {
                rank += self.count_of(p.left) + 1;
            }
            cursor = parent;
        }
        Some(rank)
    }

    /// Node at zero-based in-order position `k`
    pub fn select(&self, mut k: usize) -> Option<NodeId> {
        let mut cursor = self.root;
        while let Some(id) = cursor {
            let node = &self.nodes[id];
            let left = self.count_of(node.left);
            match k.cmp(&left) {
                Ordering::Less => cursor = node.left,
                Ordering::Equal => return Some(id),
                Ordering::Greater => {
                    k -= left + 1;
                    cursor = node.right;
                }
            }
        }
        None
    }

    /// Node `delta` positions away from `id` in order
    pub fn offset(&self, id: NodeId, delta: i64) -> Option<NodeId> {
        let rank = i64::try_from(self.rank(id)?).ok()?;
        let target = rank.checked_add(delta)?;
        let target = usize::try_from(target).ok()?;
        self.select(target)
    }

    /// In-order iterator over all values
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            tree: self,
            next: self.root.map(|root| self.leftmost(root)),
        }
    }

    /// In-order iterator starting at `id` (empty for a stale handle)
    pub fn iter_from(&self, id: NodeId) -> Iter<'_, T> {
        Iter {
            tree: self,
            next: self.nodes.contains_key(id).then_some(id),
        }
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    // =========================================================================
    // Node bookkeeping
    // =========================================================================

    fn height_of(&self, id: Option<NodeId>) -> u32 {
        id.and_then(|id| self.nodes.get(id)).map_or(0, |node| node.height)
    }

    fn count_of(&self, id: Option<NodeId>) -> usize {
        id.and_then(|id| self.nodes.get(id))
            .map_or(0, |node| node.count as usize)
    }

    /// Recompute cached height and count from the children
    fn update(&mut self, id: NodeId) {
        let (left, right) = {
            let node = &self.nodes[id];
            (node.left, node.right)
        };
        let height = 1 + max(self.height_of(left), self.height_of(right));
        let count = 1 + self.count_of(left) + self.count_of(right);

        let node = &mut self.nodes[id];
        node.height = height;
        node.count = count as u32;
    }

    /// Point whichever child link of `parent` holds `old` at `new`
    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: Option<NodeId>) {
        let p = &mut self.nodes[parent];
        if p.left == Some(old) {
            p.left = new;
        } else {
            p.right = new;
        }
    }

    fn leftmost(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.nodes[id].left {
            id = left;
        }
        id
    }

    fn successor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(right) = self.nodes[id].right {
            return Some(self.leftmost(right));
        }
        let mut cursor = id;
        while let Some(parent) = self.nodes[cursor].parent {
            if self.nodes[parent].left == Some(cursor) {
                return Some(parent);
            }
            cursor = parent;
        }
        None
    }

    // =========================================================================
    // Rebalancing primitives
    // =========================================================================

    /// Promote the right child of `id`; returns the new subtree root.
    /// The caller re-links the grandparent's slot.
    fn rotate_left(&mut self, id: NodeId) -> NodeId {
        let Some(new_root) = self.nodes[id].right else {
            return id;
        };
        let inner = self.nodes[new_root].left;

        if let Some(inner) = inner {
            self.nodes[inner].parent = Some(id);
        }
        self.nodes[id].right = inner;
        self.nodes[new_root].left = Some(id);

        self.nodes[new_root].parent = self.nodes[id].parent;
        self.nodes[id].parent = Some(new_root);

        self.update(id);
        self.update(new_root);
        new_root
    }

    /// Mirror image of `rotate_left`
    fn rotate_right(&mut self, id: NodeId) -> NodeId {
        let Some(new_root) = self.nodes[id].left else {
            return id;
        };
        let inner = self.nodes[new_root].right;

        if let Some(inner) = inner {
            self.nodes[inner].parent = Some(id);
        }
        self.nodes[id].left = inner;
        self.nodes[new_root].right = Some(id);

        self.nodes[new_root].parent = self.nodes[id].parent;
        self.nodes[id].parent = Some(new_root);

        self.update(id);
        self.update(new_root);
        new_root
    }

    /// Left subtree is two levels deeper
    fn fix_left(&mut self, id: NodeId) -> NodeId {
        if let Some(left) = self.nodes[id].left {
            let l = &self.nodes[left];
            if self.height_of(l.left) < self.height_of(l.right) {
                let promoted = self.rotate_left(left);
                self.nodes[id].left = Some(promoted);
            }
        }
        self.rotate_right(id)
    }

    /// Right subtree is two levels deeper
    fn fix_right(&mut self, id: NodeId) -> NodeId {
        if let Some(right) = self.nodes[id].right {
            let r = &self.nodes[right];
            if self.height_of(r.right) < self.height_of(r.left) {
                let promoted = self.rotate_right(right);
                self.nodes[id].right = Some(promoted);
            }
        }
        self.rotate_left(id)
    }

    /// Restore heights, counts and balance from `id` up to the root.
    /// Returns the (possibly new) root.
    fn fix(&mut self, mut id: NodeId) -> NodeId {
        loop {
            self.update(id);
            let (left, right, parent) = {
                let node = &self.nodes[id];
                (node.left, node.right, node.parent)
            };
            let l = self.height_of(left);
            let r = self.height_of(right);

            let before = id;
            if l == r + 2 {
                id = self.fix_left(id);
            } else if r == l + 2 {
                id = self.fix_right(id);
            }

            match parent {
                None => return id,
                Some(parent) => {
                    if before != id {
                        self.replace_child(parent, before, Some(id));
                    }
                    id = parent;
                }
            }
        }
    }

    /// Unlink `id` from the tree structure (its slot stays allocated).
    /// Returns the new root.
    fn detach(&mut self, id: NodeId) -> Option<NodeId> {
        let (left, right, parent) = {
            let node = &self.nodes[id];
            (node.left, node.right, node.parent)
        };

        let (Some(_), Some(right)) = (left, right) else {
            // At most one child: splice it into our slot.
            let child = left.or(right);
            if let Some(child) = child {
                self.nodes[child].parent = parent;
            }
            return match parent {
                Some(parent) => {
                    self.replace_child(parent, id, child);
                    Some(self.fix(parent))
                }
                None => child,
            };
        };

        // Two children: pull out the in-order successor, then let it take
        // over our position. Rebalancing may have moved us, so re-read.
        let successor = self.leftmost(right);
        let root = self.detach(successor);

        let (left, right, parent, height, count) = {
            let node = &self.nodes[id];
            (node.left, node.right, node.parent, node.height, node.count)
        };
        {
            let s = &mut self.nodes[successor];
            s.left = left;
            s.right = right;
            s.parent = parent;
            s.height = height;
            s.count = count;
        }
        if let Some(left) = left {
            self.nodes[left].parent = Some(successor);
        }
        if let Some(right) = right {
            self.nodes[right].parent = Some(successor);
        }

        match parent {
            Some(parent) => {
                self.replace_child(parent, id, Some(successor));
                root
            }
            None => Some(successor),
        }
    }
}

impl<T> Default for AvlTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-order iterator over an `AvlTree`, driven by parent links
pub struct Iter<'a, T> {
    tree: &'a AvlTree<T>,
    next: Option<NodeId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let id = self.next?;
        self.next = self.tree.successor(id);
        self.tree.get(id)
    }
}
