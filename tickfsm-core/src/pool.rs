//! Pooled machine instances.
//!
//! A pool hands out machines built from one [`MachineBuilder`] and takes them
//! back for reuse. The blueprint is resolved exactly once, into a prototype
//! machine; every slot is a clone of it, so checking a machine out never
//! touches the builder.
//!
//! Slot bookkeeping:
//! - slots below the high-water mark have been handed out at least once;
//! - recycled slots go on a LIFO free list and are reused before any fresh
//!   slot;
//! - when every slot is in use the pool doubles, filling the new slots from
//!   the prototype.
//!
//! Machines are boxed, so a checked-out machine keeps its address while the
//! slot array grows. Recycling resets the current state to the initial one
//! and leaves variables and context as they are.

use crate::builder::MachineBuilder;
use crate::error::CoreError;
use crate::machine::Machine;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Slots allocated at creation (at least one).
    pub initial_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
        }
    }
}

/// Ticket for a checked-out machine.
///
/// Becomes stale when the machine is recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    slot: u32,
    generation: u32,
}

impl PoolHandle {
    pub fn slot(&self) -> usize {
        self.slot as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

struct Slot<C> {
    machine: Box<Machine<C>>,
    generation: u32,
    live: bool,
}

/// A growable set of reusable machines.
pub struct Pool<C = ()> {
    slots: Vec<Slot<C>>,
    free: Vec<usize>,
    high_water: usize,
    in_use: usize,
    prototype: Machine<C>,
}

impl<C: Clone> Pool<C> {
    /// Creates a pool of `capacity` machines, each carrying a clone of
    /// `context`.
    pub fn new(builder: &MachineBuilder<C>, context: C, capacity: usize) -> Result<Self, CoreError> {
        let prototype = builder.build(context)?;
        let capacity = capacity.max(1);

        let mut pool = Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            high_water: 0,
            in_use: 0,
            prototype,
        };
        pool.fill(capacity);

        tracing::debug!("created machine pool with {} slots", capacity);
        Ok(pool)
    }

    pub fn with_config(
        builder: &MachineBuilder<C>,
        context: C,
        config: &PoolConfig,
    ) -> Result<Self, CoreError> {
        Self::new(builder, context, config.initial_capacity)
    }

    /// Checks out a machine: the most recently recycled one if any, else a
    /// fresh slot, growing the pool when none is left.
    pub fn get(&mut self) -> PoolHandle {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                if self.high_water == self.slots.len() {
                    self.grow();
                }
                self.high_water += 1;
                self.high_water - 1
            }
        };

        let entry = &mut self.slots[slot];
        entry.live = true;
        self.in_use += 1;

        tracing::trace!("pool get: slot {} (generation {})", slot, entry.generation);

        PoolHandle {
            slot: slot as u32,
            generation: entry.generation,
        }
    }

    fn grow(&mut self) {
        let old = self.slots.len();
        self.fill(old);
        tracing::debug!("machine pool grew from {} to {} slots", old, self.slots.len());
    }

    fn fill(&mut self, additional: usize) {
        self.slots.reserve(additional);
        for _ in 0..additional {
            self.slots.push(Slot {
                machine: Box::new(self.prototype.clone()),
                generation: 0,
                live: false,
            });
        }
    }
}

impl<C> Pool<C> {
    /// Returns a machine to the pool.
    ///
    /// The machine goes back to its initial state without running hooks;
    /// variables keep their values.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is stale.
    pub fn recycle(&mut self, handle: PoolHandle) {
        let slot = self.live_slot(handle);
        let entry = &mut self.slots[slot];

        entry.machine.reset();
        entry.live = false;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(slot);
        self.in_use -= 1;

        tracing::trace!("pool recycle: slot {}", slot);
    }

    /// # Panics
    ///
    /// Panics if `handle` is stale.
    pub fn machine(&self, handle: PoolHandle) -> &Machine<C> {
        &self.slots[self.live_slot(handle)].machine
    }

    /// # Panics
    ///
    /// Panics if `handle` is stale.
    pub fn machine_mut(&mut self, handle: PoolHandle) -> &mut Machine<C> {
        let slot = self.live_slot(handle);
        &mut self.slots[slot].machine
    }

    /// Returns true if `handle` still refers to a checked-out machine.
    pub fn is_live(&self, handle: PoolHandle) -> bool {
        self.slots
            .get(handle.slot())
            .map(|s| s.live && s.generation == handle.generation)
            .unwrap_or(false)
    }

    fn live_slot(&self, handle: PoolHandle) -> usize {
        if !self.is_live(handle) {
            panic!(
                "stale pool handle: slot {} generation {}",
                handle.slot, handle.generation
            );
        }
        handle.slot()
    }

    /// Visits every checked-out machine.
    pub fn iter_live_mut(&mut self) -> impl Iterator<Item = (PoolHandle, &mut Machine<C>)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, s)| s.live)
            .map(|(i, s)| {
                let handle = PoolHandle {
                    slot: i as u32,
                    generation: s.generation,
                };
                (handle, &mut *s.machine)
            })
    }

    /// Ticks every checked-out machine once; returns how many transitioned.
    pub fn update_all(&mut self) -> usize {
        self.iter_live_mut()
            .map(|(_, m)| m.update())
            .filter(|&moved| moved)
            .count()
    }

    /// Total slots, checked out or not.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// Recycled slots waiting for reuse.
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Slots handed out at least once.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// The machine every slot starts as.
    pub fn prototype(&self) -> &Machine<C> {
        &self.prototype
    }
}

impl<C> Index<PoolHandle> for Pool<C> {
    type Output = Machine<C>;

    fn index(&self, handle: PoolHandle) -> &Machine<C> {
        self.machine(handle)
    }
}

impl<C> IndexMut<PoolHandle> for Pool<C> {
    fn index_mut(&mut self, handle: PoolHandle) -> &mut Machine<C> {
        self.machine_mut(handle)
    }
}
