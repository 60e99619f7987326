//! A single hash table generation
//!
//! Owns the bucket heads; the entries themselves sit in the map's slab.

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Stable slab key of one hash entry
    pub struct EntryId;
}

/// A hash entry: the caller's item plus its chain link
#[derive(Debug)]
pub(crate) struct Slot<T> {
    pub(crate) hcode: u64,
    pub(crate) next: Option<EntryId>,
    pub(crate) item: T,
}

/// Where the link pointing at a matched entry lives
#[derive(Debug, Clone, Copy)]
pub(crate) enum Link {
    /// The bucket head at this index
    Bucket(usize),
    /// The `next` field of this entry
    After(EntryId),
}

/// One generation: bucket heads, mask and live count
#[derive(Debug, Default)]
pub(crate) struct Table {
    buckets: Vec<Option<EntryId>>,
    mask: usize,
    size: usize,
}

impl Table {
    /// Allocate `capacity` empty buckets (must be a power of two)
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity > 0 && capacity.is_power_of_two());
        Self {
            buckets: vec![None; capacity],
            mask: capacity - 1,
            size: 0,
        }
    }

    pub(crate) fn is_allocated(&self) -> bool {
        !self.buckets.is_empty()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn head(&self, pos: usize) -> Option<EntryId> {
        self.buckets.get(pos).copied().flatten()
    }

    /// Prepend an entry already in the slab to its bucket chain
    pub(crate) fn insert<T>(&mut self, slab: &mut SlotMap<EntryId, Slot<T>>, id: EntryId) {
        let Some(slot) = slab.get_mut(id) else {
            return;
        };
        let pos = (slot.hcode as usize) & self.mask;
        slot.next = self.buckets[pos];
        self.buckets[pos] = Some(id);
        self.size += 1;
    }

    /// Walk the chain for `hcode`, returning the link that points at the match
    pub(crate) fn find<T, F>(
        &self,
        slab: &SlotMap<EntryId, Slot<T>>,
        hcode: u64,
        mut eq: F,
    ) -> Option<(Link, EntryId)>
    where
        F: FnMut(&T) -> bool,
    {
        if !self.is_allocated() {
            return None;
        }

        let pos = (hcode as usize) & self.mask;
        let mut link = Link::Bucket(pos);
        let mut cursor = self.buckets[pos];

        while let Some(id) = cursor {
            let slot = slab.get(id)?;
            if slot.hcode == hcode && eq(&slot.item) {
                return Some((link, id));
            }
            link = Link::After(id);
            cursor = slot.next;
        }
        None
    }

    /// Unlink `id` (which `link` points at) from its chain
    pub(crate) fn detach<T>(&mut self, slab: &mut SlotMap<EntryId, Slot<T>>, link: Link, id: EntryId) {
        let next = slab.get_mut(id).and_then(|slot| slot.next.take());
        match link {
            Link::Bucket(pos) => self.buckets[pos] = next,
            Link::After(prev) => {
                if let Some(prev) = slab.get_mut(prev) {
                    prev.next = next;
                }
            }
        }
        self.size -= 1;
    }

    /// Iterate every entry id, bucket by bucket
    pub(crate) fn ids<'a, T>(&'a self, slab: &'a SlotMap<EntryId, Slot<T>>) -> ChainIds<'a, T> {
        ChainIds {
            table: self,
            slab,
            bucket: 0,
            cursor: None,
        }
    }
}

/// Iterator over the entry ids of one generation
pub(crate) struct ChainIds<'a, T> {
    table: &'a Table,
    slab: &'a SlotMap<EntryId, Slot<T>>,
    bucket: usize,
    cursor: Option<EntryId>,
}

impl<'a, T> Iterator for ChainIds<'a, T> {
    type Item = EntryId;

    fn next(&mut self) -> Option<EntryId> {
        loop {
            if let Some(id) = self.cursor {
                self.cursor = self.slab.get(id).and_then(|slot| slot.next);
                return Some(id);
            }
            if self.bucket >= self.table.buckets.len() {
                return None;
            }
            self.cursor = self.table.buckets[self.bucket];
            self.bucket += 1;
        }
    }
}
