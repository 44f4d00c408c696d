//! Collider registry.
//!
//! The host fills the registry once per invocation. Slots keep their index
//! for their whole life: removing a collider leaves a hole, and new colliders
//! are always appended after the last slot, so indices quoted in errors and
//! logs stay meaningful to the host.

use geometry::{Aabb, GeometryQuery};

/// A collider slot: a borrowed surface, its world-space box and whether it
/// currently participates.
#[derive(Clone, Copy)]
pub struct ColliderEntry<'a> {
    collider: &'a dyn GeometryQuery,
    bounds: Aabb,
    active: bool,
}

impl<'a> ColliderEntry<'a> {
    /// Active entry using the collider's own bounding box.
    pub fn new(collider: &'a dyn GeometryQuery) -> Self {
        Self {
            collider,
            bounds: collider.bounding_box(),
            active: true,
        }
    }

    /// Replace the bounding box with an authored one.
    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn collider(&self) -> &'a dyn GeometryQuery {
        self.collider
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the entry has a usable box. Empty boxes count as unauthored.
    pub fn has_bounds(&self) -> bool {
        !self.bounds.is_empty()
    }
}

impl std::fmt::Debug for ColliderEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColliderEntry")
            .field("bounds", &self.bounds)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// Ordered collider slots, iterated in index order.
#[derive(Debug, Default, Clone)]
pub struct ColliderRegistry<'a> {
    slots: Vec<Option<ColliderEntry<'a>>>,
}

impl<'a> ColliderRegistry<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a collider with its own bounds. Returns its slot index.
    pub fn add(&mut self, collider: &'a dyn GeometryQuery) -> usize {
        self.add_entry(ColliderEntry::new(collider))
    }

    /// Append a prepared entry. Returns its slot index.
    pub fn add_entry(&mut self, entry: ColliderEntry<'a>) -> usize {
        self.slots.push(Some(entry));
        self.slots.len() - 1
    }

    /// Disconnect the collider at `index`, leaving the slot empty.
    pub fn remove(&mut self, index: usize) -> Option<ColliderEntry<'a>> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Toggle participation. Returns `false` if the slot is empty.
    pub fn set_active(&mut self, index: usize, active: bool) -> bool {
        match self.slots.get_mut(index) {
            Some(Some(entry)) => {
                entry.active = active;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&ColliderEntry<'a>> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Active entries with their slot indices, in slot order.
    pub fn active(&self) -> impl Iterator<Item = (usize, &ColliderEntry<'a>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|entry| (index, entry)))
            .filter(|(_, entry)| entry.active)
    }
}
