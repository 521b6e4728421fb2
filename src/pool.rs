//! Generation-checked slot storage used for markers, light tokens and tree nodes.
//!
//! Every value lives in a slot addressed by a [`RawId`], which pairs the slot index with the
//! generation the slot had when the value was stored. Recycling a value bumps the generation, so an
//! id that outlived its value no longer resolves instead of silently aliasing whatever was put into
//! the slot afterwards. Released slots hand their generation on to the slots pushed after them.

use std::fmt;

/// Untyped handle into a [`Pool`]. Callers wrap it into a typed id.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RawId {
    index:      u32,
    generation: u32,
}

impl RawId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value:      Option<T>,
}

/// Slot arena that reuses recycled slots.
///
/// Storage grows on demand up to the largest number of values stored at once. Once the pool is
/// empty again, everything past `capacity` slots is released.
#[derive(Debug)]
pub(crate) struct Pool<T> {
    slots:            Vec<Slot<T>>,
    free:             Vec<u32>,
    capacity:         usize,
    live:             usize,
    /// Generation of newly pushed slots. Above every generation of a released slot.
    fresh_generation: u32,
}

impl<T> Pool<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            capacity,
            live: 0,
            fresh_generation: 0,
        }
    }

    pub(crate) fn alloc(&mut self, value: T) -> RawId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none());
            slot.value = Some(value);
            return RawId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        let generation = self.fresh_generation;
        self.slots.push(Slot {
            generation,
            value: Some(value),
        });
        RawId { index, generation }
    }

    #[inline]
    pub(crate) fn get(&self, id: RawId) -> Option<&T> {
        match self.slots.get(id.index()) {
            Some(slot) if slot.generation == id.generation => slot.value.as_ref(),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: RawId) -> Option<&mut T> {
        match self.slots.get_mut(id.index()) {
            Some(slot) if slot.generation == id.generation => slot.value.as_mut(),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn contains(&self, id: RawId) -> bool {
        self.get(id).is_some()
    }

    /// Takes the value out of its slot and invalidates every id pointing at it.
    /// Returns `None` if `id` was already stale.
    pub(crate) fn recycle(&mut self, id: RawId) -> Option<T> {
        let slot = match self.slots.get_mut(id.index()) {
            Some(slot) if slot.generation == id.generation => slot,
            _ => return None,
        };
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.live -= 1;
        self.free.push(id.index);
        if self.live == 0 && self.slots.len() > self.capacity {
            self.release();
        }
        Some(value)
    }

    /// Drops every slot past `capacity`. The pool must be empty.
    fn release(&mut self) {
        for slot in self.slots.drain(self.capacity..) {
            self.fresh_generation = std::cmp::max(self.fresh_generation, slot.generation);
        }
        self.free.clear();
        self.free.extend((0..self.slots.len() as u32).rev());
    }

    /// Number of values currently stored.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Number of idle slots kept for reuse.
    #[cfg(test)]
    pub(crate) fn idle(&self) -> usize {
        self.free.len()
    }

    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
