//! String-keyed hash table with quadratic probing.
//!
//! Keys are hashed with SDBM and placed with open addressing: the probe for
//! attempt `i` lands on `(hash + i²) % capacity`. Once an insert brings the
//! load factor to 0.75 or above, the table doubles its capacity and rehashes
//! every entry into the new slot array.
//!
//! Removed entries leave a tombstone behind so that probe chains running
//! through them stay intact; tombstones are dropped on the next rehash. When
//! live entries plus tombstones reach the threshold but live entries alone do
//! not, the table rehashes at its current capacity instead of growing.

use std::fmt;
use std::mem;
use std::sync::Arc;

/// Capacity used by [`NameTable::new`].
pub const DEFAULT_CAPACITY: usize = 200;

/// Load factor at which the table grows.
pub const LOAD_FACTOR_THRESHOLD: f32 = 0.75;

/// SDBM string hash.
pub fn sdbm_hash(key: &str) -> u64 {
    key.bytes().fold(0u64, |hash, c| {
        u64::from(c)
            .wrapping_add(hash << 6)
            .wrapping_add(hash << 16)
            .wrapping_sub(hash)
    })
}

#[derive(Clone)]
enum Slot<T> {
    Empty,
    Tombstone,
    Occupied(Entry<T>),
}

#[derive(Clone)]
struct Entry<T> {
    key: Arc<str>,
    item: T,
}

/// Outcome of probing for a key.
enum Probe {
    Found(usize),
    Vacant(usize),
    Exhausted,
}

/// Maps names to items.
#[derive(Clone)]
pub struct NameTable<T> {
    slots: Vec<Slot<T>>,
    count: usize,
    tombstones: usize,
}

impl<T> NameTable<T> {
    /// Creates a table with [`DEFAULT_CAPACITY`] slots.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a table with `capacity` slots (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: empty_slots(capacity.max(1)),
            count: 0,
            tombstones: 0,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn load_factor(&self) -> f32 {
        self.count as f32 / self.slots.len() as f32
    }

    /// Inserts an item under `key`.
    ///
    /// Re-inserting an existing key replaces the item in place and returns
    /// the previous one; the entry count is unchanged.
    pub fn insert(&mut self, key: impl Into<Arc<str>>, item: T) -> Option<T> {
        let key = key.into();

        let slot = loop {
            match self.probe(&key) {
                Probe::Found(slot) => {
                    if let Slot::Occupied(entry) = &mut self.slots[slot] {
                        return Some(mem::replace(&mut entry.item, item));
                    }
                    unreachable!("probe reported an occupied slot");
                }
                Probe::Vacant(slot) => break slot,
                // The quadratic sequence does not visit every slot of an
                // arbitrary capacity, so a crowded table can run out of
                // candidates before it reaches the load threshold.
                Probe::Exhausted => self.grow(),
            }
        };

        if let Slot::Tombstone = self.slots[slot] {
            self.tombstones -= 1;
        }
        self.slots[slot] = Slot::Occupied(Entry { key, item });
        self.count += 1;

        if self.load_factor() >= LOAD_FACTOR_THRESHOLD {
            self.grow();
        } else if self.used_factor() >= LOAD_FACTOR_THRESHOLD {
            self.rehash(self.slots.len());
        }

        None
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        match self.find(key)? {
            Slot::Occupied(entry) => Some(&entry.item),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        let slot = self.find_slot(key)?;
        match &mut self.slots[slot] {
            Slot::Occupied(entry) => Some(&mut entry.item),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.find_slot(key).is_some()
    }

    /// Returns the stored key allocation for `key`.
    pub fn key(&self, key: &str) -> Option<&Arc<str>> {
        match self.find(key)? {
            Slot::Occupied(entry) => Some(&entry.key),
            _ => None,
        }
    }

    /// Removes `key`, returning its item.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let slot = self.find_slot(key)?;
        match mem::replace(&mut self.slots[slot], Slot::Tombstone) {
            Slot::Occupied(entry) => {
                self.count -= 1;
                self.tombstones += 1;
                Some(entry.item)
            }
            other => {
                self.slots[slot] = other;
                None
            }
        }
    }

    /// Removes every entry, keeping the current capacity.
    pub fn clear(&mut self) {
        self.slots = empty_slots(self.slots.len());
        self.count = 0;
        self.tombstones = 0;
    }

    /// Iterates entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Occupied(entry) => Some((&*entry.key, &entry.item)),
            _ => None,
        })
    }

    fn find(&self, key: &str) -> Option<&Slot<T>> {
        self.find_slot(key).map(|slot| &self.slots[slot])
    }

    fn find_slot(&self, key: &str) -> Option<usize> {
        match self.probe(key) {
            Probe::Found(slot) => Some(slot),
            Probe::Vacant(_) | Probe::Exhausted => None,
        }
    }

    /// Walks the probe sequence for `key`.
    ///
    /// Stops at the matching entry or at the first empty slot. A vacant
    /// result points at the first reusable slot seen, preferring an earlier
    /// tombstone over the terminating empty slot.
    fn probe(&self, key: &str) -> Probe {
        let capacity = self.slots.len() as u64;
        let hash = sdbm_hash(key);
        let mut reusable = None;

        for i in 0..capacity {
            let slot = (hash.wrapping_add(i * i) % capacity) as usize;
            match &self.slots[slot] {
                Slot::Occupied(entry) if &*entry.key == key => return Probe::Found(slot),
                Slot::Occupied(_) => {}
                Slot::Tombstone => {
                    reusable.get_or_insert(slot);
                }
                Slot::Empty => return Probe::Vacant(reusable.unwrap_or(slot)),
            }
        }

        match reusable {
            Some(slot) => Probe::Vacant(slot),
            None => Probe::Exhausted,
        }
    }

    /// Share of slots that are not empty.
    fn used_factor(&self) -> f32 {
        (self.count + self.tombstones) as f32 / self.slots.len() as f32
    }

    /// Doubles the capacity and rehashes every live entry.
    fn grow(&mut self) {
        let new_capacity = self.slots.len() * 2;
        tracing::trace!("name table grew to {} slots", new_capacity);
        self.rehash(new_capacity);
    }

    /// Moves every live entry into a fresh slot array of `capacity` slots.
    fn rehash(&mut self, capacity: usize) {
        let old = mem::replace(&mut self.slots, empty_slots(capacity));
        self.count = 0;
        self.tombstones = 0;

        for slot in old {
            if let Slot::Occupied(entry) = slot {
                self.reinsert(entry);
            }
        }
    }

    fn reinsert(&mut self, entry: Entry<T>) {
        loop {
            match self.probe(&entry.key) {
                Probe::Vacant(slot) => {
                    self.slots[slot] = Slot::Occupied(entry);
                    self.count += 1;
                    return;
                }
                Probe::Exhausted => self.grow(),
                Probe::Found(_) => unreachable!("keys are unique within a table"),
            }
        }
    }
}

impl<T> Default for NameTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for NameTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T> IntoIterator for NameTable<T> {
    type Item = (Arc<str>, T);
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            slots: self.slots.into_iter(),
        }
    }
}

/// Consuming iterator over the entries of a [`NameTable`].
pub struct IntoIter<T> {
    slots: std::vec::IntoIter<Slot<T>>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = (Arc<str>, T);

    fn next(&mut self) -> Option<Self::Item> {
        self.slots.by_ref().find_map(|slot| match slot {
            Slot::Occupied(entry) => Some((entry.key, entry.item)),
            _ => None,
        })
    }
}

fn empty_slots<T>(capacity: usize) -> Vec<Slot<T>> {
    let mut slots = Vec::with_capacity(capacity);
    slots.resize_with(capacity, || Slot::Empty);
    slots
}
