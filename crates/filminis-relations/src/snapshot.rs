//! Association sets, relation snapshots and per-type diffs.

use crate::relation_type::{EntityId, RelationType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// Association Set
// ============================================================================

/// The ids linked to one central entity under one relation type.
///
/// Set semantics: inserting an id twice is a no-op. Iteration is ascending,
/// which fixes the order in which writes are issued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssociationSet(BTreeSet<EntityId>);

impl AssociationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the id was already present.
    pub fn insert(&mut self, id: EntityId) -> bool {
        self.0.insert(id)
    }

    pub fn remove(&mut self, id: EntityId) -> bool {
        self.0.remove(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.0.iter().copied()
    }

    /// Ids in `self` but not in `other`, ascending.
    pub fn difference(&self, other: &AssociationSet) -> Vec<EntityId> {
        self.0.difference(&other.0).copied().collect()
    }

    pub fn to_vec(&self) -> Vec<EntityId> {
        self.iter().collect()
    }
}

impl FromIterator<EntityId> for AssociationSet {
    fn from_iter<I: IntoIterator<Item = EntityId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for AssociationSet {
    type Item = EntityId;
    type IntoIter = std::collections::btree_set::IntoIter<EntityId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<const N: usize> From<[EntityId; N]> for AssociationSet {
    fn from(ids: [EntityId; N]) -> Self {
        ids.into_iter().collect()
    }
}

impl From<Vec<EntityId>> for AssociationSet {
    fn from(ids: Vec<EntityId>) -> Self {
        ids.into_iter().collect()
    }
}

// ============================================================================
// Relations Snapshot
// ============================================================================

/// Association sets of one central entity for every [`RelationType`].
///
/// All six types are always present. On the wire this is a JSON object keyed
/// by relation type name; a missing key reads as an empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<RelationType, AssociationSet>",
    into = "BTreeMap<RelationType, AssociationSet>"
)]
pub struct RelationsSnapshot {
    sets: [AssociationSet; 6],
}

impl RelationsSnapshot {
    /// A snapshot with every relation type empty.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, relation: RelationType) -> &AssociationSet {
        &self.sets[relation.index()]
    }

    pub fn get_mut(&mut self, relation: RelationType) -> &mut AssociationSet {
        &mut self.sets[relation.index()]
    }

    pub fn set(&mut self, relation: RelationType, ids: AssociationSet) {
        self.sets[relation.index()] = ids;
    }

    /// Builder-style variant of [`RelationsSnapshot::set`].
    pub fn with(mut self, relation: RelationType, ids: impl IntoIterator<Item = EntityId>) -> Self {
        self.set(relation, ids.into_iter().collect());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (RelationType, &AssociationSet)> {
        RelationType::ALL.into_iter().map(move |t| (t, self.get(t)))
    }

    /// Total number of associations across all types.
    pub fn total(&self) -> usize {
        self.sets.iter().map(AssociationSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl From<BTreeMap<RelationType, AssociationSet>> for RelationsSnapshot {
    fn from(mut map: BTreeMap<RelationType, AssociationSet>) -> Self {
        Self {
            sets: RelationType::ALL.map(|t| map.remove(&t).unwrap_or_default()),
        }
    }
}

impl From<RelationsSnapshot> for BTreeMap<RelationType, AssociationSet> {
    fn from(snapshot: RelationsSnapshot) -> Self {
        RelationType::ALL.into_iter().zip(snapshot.sets).collect()
    }
}

// ============================================================================
// Diff
// ============================================================================

/// Writes needed to move one relation type from `current` to `desired`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub relation: RelationType,
    pub to_remove: Vec<EntityId>,
    pub to_add: Vec<EntityId>,
}

impl Diff {
    pub fn compute(
        relation: RelationType,
        current: &AssociationSet,
        desired: &AssociationSet,
    ) -> Self {
        Self {
            relation,
            to_remove: current.difference(desired),
            to_add: desired.difference(current),
        }
    }

    /// One diff per relation type, in [`RelationType::ALL`] order.
    pub fn all(current: &RelationsSnapshot, desired: &RelationsSnapshot) -> Vec<Diff> {
        RelationType::ALL
            .into_iter()
            .map(|t| Diff::compute(t, current.get(t), desired.get(t)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }

    /// Number of write calls this diff costs.
    pub fn operation_count(&self) -> usize {
        self.to_remove.len() + self.to_add.len()
    }
}
