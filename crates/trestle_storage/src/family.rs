//! Per-type backing arrays with append-only slot allocation.

use std::sync::Arc;

use trestle_foundation::TrVec;

use crate::entity_data::EntityData;

/// The dense backing array for all entities of one type.
///
/// Slots are allocated by appending and never recycled: a removed entity
/// leaves a vacant slot behind, so stale ids resolve to none instead of
/// aliasing a later, unrelated entity. The slot vector is persistent, so
/// cloning a family is O(1) and derived snapshots share untouched tails.
#[derive(Clone, Debug, Default)]
pub(crate) struct EntityFamily {
    slots: TrVec<Option<Arc<EntityData>>>,
}

impl EntityFamily {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Gets the record in a slot, if the slot is live.
    pub(crate) fn get(&self, slot: u32) -> Option<&Arc<EntityData>> {
        self.slots.get(slot as usize)?.as_ref()
    }

    /// The slot the next [`EntityFamily::add`] will allocate.
    pub(crate) fn next_slot(&self) -> u32 {
        u32::try_from(self.slots.len()).expect("family slot overflow")
    }

    /// Appends a record, returning the allocated slot.
    pub(crate) fn add(&mut self, data: Arc<EntityData>) -> u32 {
        let slot = u32::try_from(self.slots.len()).expect("family slot overflow");
        self.slots = self.slots.push_back(Some(data));
        slot
    }

    /// Replaces the record in a live slot.
    ///
    /// Returns false if the slot is vacant or out of range.
    pub(crate) fn replace(&mut self, slot: u32, data: Arc<EntityData>) -> bool {
        match self.slots.get(slot as usize) {
            Some(Some(_)) => {
                if let Some(next) = self.slots.update(slot as usize, Some(data)) {
                    self.slots = next;
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// Vacates a slot without recycling it.
    ///
    /// Returns the removed record, if the slot was live.
    pub(crate) fn vacate(&mut self, slot: u32) -> Option<Arc<EntityData>> {
        let old = self.slots.get(slot as usize)?.clone()?;
        self.slots = self.slots.update(slot as usize, None)?;
        Some(old)
    }

    /// Restores a record into an explicit slot, growing the array as needed.
    ///
    /// Used when rebuilding a family from persisted data where slot numbers
    /// must be preserved, holes included.
    pub(crate) fn set_slot(&mut self, slot: u32, data: Arc<EntityData>) {
        let index = slot as usize;
        while self.slots.len() <= index {
            self.slots = self.slots.push_back(None);
        }
        if let Some(next) = self.slots.update(index, Some(data)) {
            self.slots = next;
        }
    }

    /// Iterates live records in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<EntityData>> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// The number of live records.
    pub(crate) fn live_count(&self) -> usize {
        self.iter().count()
    }
}
