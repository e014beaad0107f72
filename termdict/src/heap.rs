//! Bump-allocated term heap with copying reclamation.
//!
//! The heap is one growable arena of [`Value`] slots with a monotonically
//! advancing `top`. Allocation never collects on its own: when a request does
//! not fit, [`Heap::reserve`] reports [`InsufficientSpace`] and the caller
//! abandons its attempt. [`with_retry`] then calls [`Heap::reclaim`], which
//! copies everything reachable from the handle table into a fresh arena and
//! advances the epoch, and runs the attempt again from its handles.
//!
//! References are slot offsets. They are only valid within the epoch they
//! were read in; anything that must survive a reclamation lives in a
//! [`Handle`].

use std::collections::HashMap;

use log::{debug, warn};

use crate::{AtomTable, Header, Interrupt, MapError, Value};

// ── Settings ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HeapSettings {
    /// Slots available before the first reclamation.
    pub initial_slots: usize,
    /// Hard upper bound on the arena size, in slots.
    pub max_slots: usize,
}

impl Default for HeapSettings {
    fn default() -> Self {
        Self {
            initial_slots: 4096,
            max_slots: 1 << 24,
        }
    }
}

impl HeapSettings {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.initial_slots == 0 {
            return Err("initial_slots must be > 0");
        }
        if self.max_slots < self.initial_slots {
            return Err("max_slots must be >= initial_slots");
        }
        Ok(())
    }
}

// ── Allocation results ────────────────────────────────────────────────

/// A request did not fit in the space left before `top` hits capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsufficientSpace {
    pub requested: usize,
    pub available: usize,
}

/// Reclamation could not make room without exceeding `max_slots`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfMemory {
    pub requested: usize,
    pub limit: usize,
}

/// A freshly reserved run of slots, valid only in the epoch it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    start: usize,
    len: usize,
    epoch: u64,
}

impl Region {
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

// ── Handles ───────────────────────────────────────────────────────────

/// A GC root. Reclamation rewrites the value behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

/// Position in the handle table, used to drop every handle made after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleMark(usize);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    pub reclaims: usize,
    pub retries: usize,
    pub allocated_slots: usize,
}

// ── Heap ──────────────────────────────────────────────────────────────

pub struct Heap {
    slots: Vec<Value>,
    top: usize,
    epoch: u64,
    settings: HeapSettings,
    handles: Vec<Value>,
    atoms: AtomTable,
    stats: HeapStats,
}

impl Heap {
    pub fn new(settings: HeapSettings) -> Self {
        Self::with_atoms(settings, AtomTable::new())
    }

    pub fn with_atoms(settings: HeapSettings, atoms: AtomTable) -> Self {
        settings.validate().expect("Invalid Heap Settings");
        Self {
            slots: vec![Value::UNBOUND; settings.initial_slots],
            top: 0,
            epoch: 0,
            settings,
            handles: Vec::new(),
            atoms,
            stats: HeapStats::default(),
        }
    }

    #[inline(always)]
    pub fn atoms(&self) -> &AtomTable {
        &self.atoms
    }

    #[inline(always)]
    pub fn settings(&self) -> &HeapSettings {
        &self.settings
    }

    #[inline(always)]
    pub fn stats(&self) -> HeapStats {
        self.stats
    }

    #[inline(always)]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    pub fn used(&self) -> usize {
        self.top
    }

    #[inline(always)]
    pub fn available(&self) -> usize {
        self.capacity() - self.top
    }

    // ── allocation ─────────────────────────────────────────────────

    /// Bump-allocate `n` slots.
    pub fn reserve(&mut self, n: usize) -> Result<Region, InsufficientSpace> {
        let available = self.available();
        if n > available {
            return Err(InsufficientSpace {
                requested: n,
                available,
            });
        }
        let region = Region {
            start: self.top,
            len: n,
            epoch: self.epoch,
        };
        self.top += n;
        self.stats.allocated_slots += n;
        Ok(region)
    }

    #[inline]
    fn check_epoch(&self, region: &Region) {
        assert_eq!(
            region.epoch, self.epoch,
            "region from epoch {} used after reclamation",
            region.epoch
        );
    }

    pub fn region(&self, region: &Region) -> &[Value] {
        self.check_epoch(region);
        &self.slots[region.start..region.start + region.len]
    }

    pub fn region_mut(&mut self, region: &Region) -> &mut [Value] {
        self.check_epoch(region);
        &mut self.slots[region.start..region.start + region.len]
    }

    /// Reference to an object whose header sits at the start of `region`.
    pub fn reference(&self, region: &Region) -> Value {
        self.check_epoch(region);
        debug_assert!(
            Header::from_value(self.slots[region.start]).is_some(),
            "region does not start with an object header"
        );
        Value::from_offset(region.start)
    }

    /// Reference to the object that will start `index` slots into `region`.
    pub(crate) fn reference_into(&self, region: &Region, index: usize) -> Value {
        self.check_epoch(region);
        debug_assert!(index < region.len);
        Value::from_offset(region.start + index)
    }

    /// Allocate an object with the given header and body slots.
    pub fn alloc_object(
        &mut self,
        header: Header,
        body: &[Value],
    ) -> Result<Value, InsufficientSpace> {
        debug_assert_eq!(header.body_len(), body.len());
        let region = self.reserve(1 + body.len())?;
        let slots = self.region_mut(&region);
        slots[0] = header.value();
        slots[1..].copy_from_slice(body);
        Ok(self.reference(&region))
    }

    // ── reading ────────────────────────────────────────────────────

    /// Header of the object `value` refers to, if it refers to one.
    #[inline]
    pub fn header(&self, value: Value) -> Option<Header> {
        let offset = value.offset()?;
        if offset >= self.top {
            return None;
        }
        Header::from_value(self.slots[offset])
    }

    /// Header and body slots of the object `value` refers to.
    #[inline]
    pub fn object(&self, value: Value) -> Option<(Header, &[Value])> {
        let header = self.header(value)?;
        let start = value.offset()? + 1;
        let body = self.slots.get(start..start + header.body_len())?;
        Some((header, body))
    }

    // ── handles ────────────────────────────────────────────────────

    pub fn new_handle(&mut self, value: Value) -> Handle {
        let index = self.handles.len();
        self.handles.push(value);
        Handle(index as u32)
    }

    #[inline(always)]
    pub fn get(&self, handle: Handle) -> Value {
        self.handles[handle.0 as usize]
    }

    /// Value behind `handle`, `None` once a rewind has dropped it.
    #[inline]
    pub fn try_get(&self, handle: Handle) -> Option<Value> {
        self.handles.get(handle.0 as usize).copied()
    }

    #[inline(always)]
    pub fn set(&mut self, handle: Handle, value: Value) {
        self.handles[handle.0 as usize] = value;
    }

    #[inline(always)]
    pub fn mark(&self) -> HandleMark {
        HandleMark(self.handles.len())
    }

    /// Drop every handle created after `mark`.
    pub fn rewind(&mut self, mark: HandleMark) {
        debug_assert!(mark.0 <= self.handles.len(), "rewind past the end");
        self.handles.truncate(mark.0);
    }

    /// Drop every handle created after `mark` except `handle`, which is
    /// re-rooted as the only handle past the mark.
    ///
    /// Chained updates (`m = put_entry(heap, m, ..)`) call this once per step
    /// so earlier versions stop being roots.
    pub fn escape(&mut self, mark: HandleMark, handle: Handle) -> Handle {
        let value = self.get(handle);
        self.rewind(mark);
        self.new_handle(value)
    }

    #[inline(always)]
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    // ── reclamation ────────────────────────────────────────────────

    /// Compact the heap down to what the handles reach and make sure at
    /// least `needed` slots are free afterwards.
    ///
    /// Every reference read before this call is invalid after it, even when
    /// it returns an error.
    pub fn reclaim(&mut self, needed: usize) -> Result<(), OutOfMemory> {
        let old_used = self.top;
        let mut to_space: Vec<Value> = Vec::with_capacity(old_used);
        let mut forwarded: HashMap<usize, usize, ahash::RandomState> =
            HashMap::default();

        for index in 0..self.handles.len() {
            let root = self.handles[index];
            let moved =
                evacuate(&self.slots, &mut to_space, &mut forwarded, root);
            self.handles[index] = moved;
        }

        let mut scan = 0;
        while scan < to_space.len() {
            let header = Header::from_value(to_space[scan])
                .expect("object header in to-space");
            let end = scan + header.object_len();
            for index in scan + 1..end {
                let value = to_space[index];
                let moved =
                    evacuate(&self.slots, &mut to_space, &mut forwarded, value);
                to_space[index] = moved;
            }
            scan = end;
        }

        let live = to_space.len();
        let limit = self.settings.max_slots;
        let mut capacity = self.capacity();
        while capacity < limit
            && (capacity < live + needed || (capacity - live) * 4 < capacity)
        {
            capacity = (capacity * 2).min(limit);
        }

        to_space.resize(capacity.max(live), Value::UNBOUND);
        self.slots = to_space;
        self.top = live;
        self.epoch += 1;
        self.stats.reclaims += 1;

        debug!(
            "reclaimed heap: epoch {} live {} (was {}) capacity {}",
            self.epoch, live, old_used, capacity
        );

        if live + needed > self.capacity() {
            warn!(
                "heap limit reached: {} live + {} needed > {} slots",
                live, needed, limit
            );
            return Err(OutOfMemory {
                requested: live + needed,
                limit,
            });
        }
        Ok(())
    }
}

/// Copy the object `value` refers to into `to_space` unless it was copied
/// already, and return its new reference.
fn evacuate(
    from_space: &[Value],
    to_space: &mut Vec<Value>,
    forwarded: &mut HashMap<usize, usize, ahash::RandomState>,
    value: Value,
) -> Value {
    let Some(offset) = value.offset() else {
        return value;
    };
    if let Some(&moved) = forwarded.get(&offset) {
        return Value::from_offset(moved);
    }
    let header = Header::from_value(from_space[offset])
        .expect("reference to a non-object");
    let moved = to_space.len();
    to_space.extend_from_slice(&from_space[offset..offset + header.object_len()]);
    forwarded.insert(offset, moved);
    Value::from_offset(moved)
}

impl core::fmt::Debug for Heap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Heap")
            .field("epoch", &self.epoch)
            .field("used", &self.top)
            .field("capacity", &self.capacity())
            .field("handles", &self.handles.len())
            .field("stats", &self.stats)
            .finish()
    }
}

// ── Retry protocol ────────────────────────────────────────────────────

/// Run `attempt` until it finishes without running out of space.
///
/// On [`Interrupt::NoSpace`] the handles made by the attempt are dropped, the
/// heap is reclaimed with room for everything the attempt had asked for, and
/// `attempt` starts over. The attempt must therefore read its inputs from
/// handles, never from references captured outside it.
pub fn with_retry<T>(
    heap: &mut Heap,
    mut attempt: impl FnMut(&mut Heap) -> Result<T, Interrupt>,
) -> Result<T, MapError> {
    let mark = heap.mark();
    loop {
        let start = heap.top;
        match attempt(heap) {
            Ok(result) => return Ok(result),
            Err(Interrupt::Fail(err)) => {
                heap.rewind(mark);
                return Err(err);
            }
            Err(Interrupt::NoSpace(short)) => {
                let needed = heap.top - start + short.requested;
                heap.rewind(mark);
                heap.stats.retries += 1;
                debug!(
                    "attempt ran out of space ({} requested, {} available), retrying with {} slots",
                    short.requested, short.available, needed
                );
                heap.reclaim(needed)?;
            }
        }
    }
}
