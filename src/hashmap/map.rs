//! Progressive hash map
//!
//! Two generations plus a migration cursor. Every operation that touches the
//! map first moves a bounded number of entries out of the old generation.

use slotmap::SlotMap;

use super::table::{ChainIds, EntryId, Link, Slot, Table};
use super::{INITIAL_CAPACITY, MAX_LOAD_FACTOR, MIGRATION_WORK};

/// Chained hash map with incremental rehashing
///
/// The map does not hash anything itself: callers pass the precomputed hash
/// code with every call, and an equality closure to tell colliding items
/// apart. Duplicate items are not rejected; callers that want set semantics
/// look up first.
pub struct ProgressiveMap<T> {
    /// Storage for entries of both generations
    slab: SlotMap<EntryId, Slot<T>>,

    /// Generation that receives inserts
    current: Table,

    /// Generation being drained, present only mid-resize
    old: Option<Table>,

    /// Next bucket of `old` to migrate
    migrate_pos: usize,
}

impl<T> ProgressiveMap<T> {
    /// Create an empty map; buckets are allocated on first insert
    pub fn new() -> Self {
        Self {
            slab: SlotMap::with_key(),
            current: Table::default(),
            old: None,
            migrate_pos: 0,
        }
    }

    /// Number of live entries across both generations
    pub fn len(&self) -> usize {
        self.current.size() + self.old.as_ref().map_or(0, Table::size)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a resize is still in flight
    pub fn is_resizing(&self) -> bool {
        self.old.is_some()
    }

    /// Bucket count of the current generation
    pub fn capacity(&self) -> usize {
        self.current.capacity()
    }

    /// Entries still waiting in the old generation
    pub fn pending_migration(&self) -> usize {
        self.old.as_ref().map_or(0, Table::size)
    }

    /// Insert an item under `hcode`
    pub fn insert(&mut self, hcode: u64, item: T) {
        if !self.current.is_allocated() {
            self.current = Table::with_capacity(INITIAL_CAPACITY);
        }

        let id = self.slab.insert(Slot {
            hcode,
            next: None,
            item,
        });
        self.current.insert(&mut self.slab, id);

        if self.old.is_none() {
            let load_factor = self.current.size() / self.current.capacity();
            if load_factor >= MAX_LOAD_FACTOR {
                self.start_resizing();
            }
        }
        self.help_resizing();
    }

    /// Find the item under `hcode` for which `eq` holds
    pub fn lookup<F>(&mut self, hcode: u64, eq: F) -> Option<&T>
    where
        F: FnMut(&T) -> bool,
    {
        let id = self.locate(hcode, eq)?;
        self.slab.get(id).map(|slot| &slot.item)
    }

    /// Like `lookup`, but hands out a mutable reference
    pub fn lookup_mut<F>(&mut self, hcode: u64, eq: F) -> Option<&mut T>
    where
        F: FnMut(&T) -> bool,
    {
        let id = self.locate(hcode, eq)?;
        self.slab.get_mut(id).map(|slot| &mut slot.item)
    }

    /// Remove and return the item under `hcode` for which `eq` holds
    pub fn pop<F>(&mut self, hcode: u64, mut eq: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        self.help_resizing();

        if let Some((link, id)) = self.current.find(&self.slab, hcode, &mut eq) {
            self.current.detach(&mut self.slab, link, id);
            return self.slab.remove(id).map(|slot| slot.item);
        }

        let old = self.old.as_mut()?;
        let (link, id) = old.find(&self.slab, hcode, &mut eq)?;
        old.detach(&mut self.slab, link, id);
        self.slab.remove(id).map(|slot| slot.item)
    }

    /// Iterate every live item exactly once, current generation first
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            slab: &self.slab,
            current: self.current.ids(&self.slab),
            old: self.old.as_ref().map(|old| old.ids(&self.slab)),
        }
    }

    /// Drop every entry and both generations
    pub fn clear(&mut self) {
        self.slab.clear();
        self.current = Table::default();
        self.old = None;
        self.migrate_pos = 0;
    }

    fn locate<F>(&mut self, hcode: u64, mut eq: F) -> Option<EntryId>
    where
        F: FnMut(&T) -> bool,
    {
        self.help_resizing();

        if let Some((_, id)) = self.current.find(&self.slab, hcode, &mut eq) {
            return Some(id);
        }
        let old = self.old.as_ref()?;
        old.find(&self.slab, hcode, &mut eq).map(|(_, id)| id)
    }

    fn start_resizing(&mut self) {
        debug_assert!(self.old.is_none());

        let doubled = Table::with_capacity(self.current.capacity() * 2);
        let previous = std::mem::replace(&mut self.current, doubled);
        tracing::trace!(
            entries = previous.size(),
            capacity = self.current.capacity(),
            "hash map resize started"
        );
        self.old = Some(previous);
        self.migrate_pos = 0;
    }

    /// Move up to `MIGRATION_WORK` entries from the old generation
    fn help_resizing(&mut self) {
        let Some(old) = self.old.as_mut() else {
            return;
        };

        let mut moved = 0;
        while moved < MIGRATION_WORK && old.size() > 0 {
            debug_assert!(self.migrate_pos < old.capacity());

            let Some(head) = old.head(self.migrate_pos) else {
                self.migrate_pos += 1;
                continue;
            };

            old.detach(&mut self.slab, Link::Bucket(self.migrate_pos), head);
            self.current.insert(&mut self.slab, head);
            moved += 1;
        }

        if old.size() == 0 {
            tracing::trace!(capacity = self.current.capacity(), "hash map resize finished");
            self.old = None;
            self.migrate_pos = 0;
        }
    }
}

impl<T> Default for ProgressiveMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the items of a `ProgressiveMap`
pub struct Iter<'a, T> {
    slab: &'a SlotMap<EntryId, Slot<T>>,
    current: ChainIds<'a, T>,
    old: Option<ChainIds<'a, T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let id = match self.current.next() {
            Some(id) => id,
            None => self.old.as_mut()?.next()?,
        };
        self.slab.get(id).map(|slot| &slot.item)
    }
}
