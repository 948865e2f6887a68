//! Owning parent/child containment links.

use trestle_foundation::{EntityId, TrMap, TrVec};

/// Tracks owning containment between entities.
///
/// Only owning ("child") references live here; non-owning cross-references
/// are plain [`Value::EntityRef`](trestle_foundation::Value) field values
/// resolved against a storage. Both maps are persistent, so the table is
/// O(1) to clone and shares structure across snapshots.
#[derive(Clone, Debug, Default)]
pub(crate) struct RefsTable {
    children: TrMap<EntityId, TrVec<EntityId>>,
    parents: TrMap<EntityId, EntityId>,
}

impl RefsTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records `child` as owned by `parent`, in attachment order.
    pub(crate) fn attach(&mut self, parent: EntityId, child: EntityId) {
        let siblings = self
            .children
            .get(&parent)
            .cloned()
            .unwrap_or_default()
            .push_back(child);
        self.children = self.children.insert(parent, siblings);
        self.parents = self.parents.insert(child, parent);
    }

    /// Detaches `child` from its parent, if it has one.
    pub(crate) fn detach(&mut self, child: EntityId) {
        let Some(parent) = self.parents.get(&child).copied() else {
            return;
        };
        if let Some(siblings) = self.children.get(&parent) {
            let remaining: TrVec<EntityId> =
                siblings.iter().copied().filter(|c| *c != child).collect();
            self.children = if remaining.is_empty() {
                self.children.remove(&parent)
            } else {
                self.children.insert(parent, remaining)
            };
        }
        self.parents = self.parents.remove(&child);
    }

    /// Drops all links in which `id` participates as a parent.
    ///
    /// Callers cascade-removing a subtree detach each entity individually,
    /// so this only clears the (now empty) children entry.
    pub(crate) fn drop_parent_entry(&mut self, id: EntityId) {
        self.children = self.children.remove(&id);
    }

    /// The owner of `child`, if any.
    pub(crate) fn parent_of(&self, child: EntityId) -> Option<EntityId> {
        self.parents.get(&child).copied()
    }

    /// All (parent, children) groupings, in no particular parent order.
    #[cfg(feature = "persist")]
    pub(crate) fn all_children(&self) -> impl Iterator<Item = (&EntityId, &TrVec<EntityId>)> {
        self.children.iter()
    }

    /// The owned children of `parent`, in attachment order.
    pub(crate) fn children_of(&self, parent: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.children
            .get(&parent)
            .into_iter()
            .flat_map(|c| c.iter().copied())
    }
}
