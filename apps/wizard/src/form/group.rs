//! Repeating field groups (experience, education, certifications).
//!
//! Entries are keyed by a synthetic [`EntryId`] handed out once per entry and
//! never reused, so an entry keeps its identity when siblings are removed.
//! Each entry caches its last validation result; mutating an entry drops only
//! that entry's cache.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::form::rules::RuleContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Field errors for one entry, keyed by the entry's own field enum.
pub type EntryErrors<F> = BTreeMap<F, String>;

/// A structured record that can live in a [`RepeatingGroup`].
pub trait GroupItem: Clone + Default {
    /// Partial form of the record; `None` fields keep the default.
    type Patch: Default;
    type Field: Copy + Ord + fmt::Debug;

    fn merge(&mut self, patch: Self::Patch);

    fn check(&self, ctx: &RuleContext) -> EntryErrors<Self::Field>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Any,
    AtLeastOne,
}

/// Ordered collection of entries with stable ids.
#[derive(Debug, Clone)]
pub struct RepeatingGroup<T: GroupItem> {
    entries: Vec<Slot<T>>,
    cardinality: Cardinality,
    next_id: u64,
    seeded: bool,
}

#[derive(Debug, Clone)]
struct Slot<T: GroupItem> {
    id: EntryId,
    value: T,
    cached: Option<EntryErrors<T::Field>>,
}

impl<T: GroupItem> RepeatingGroup<T> {
    pub fn new(cardinality: Cardinality) -> Self {
        Self {
            entries: Vec::new(),
            cardinality,
            next_id: 1,
            seeded: false,
        }
    }

    pub fn from_values(cardinality: Cardinality, values: impl IntoIterator<Item = T>) -> Self {
        let mut group = Self::new(cardinality);
        for value in values {
            group.push(value);
        }
        group
    }

    /// Appends one default entry to an empty at-least-one group. Runs at
    /// most once per group lifetime; later calls are no-ops.
    pub fn ensure_seeded(&mut self) -> bool {
        if self.seeded || self.cardinality != Cardinality::AtLeastOne {
            return false;
        }
        self.seeded = true;
        if self.entries.is_empty() {
            self.push(T::default());
            return true;
        }
        false
    }

    pub fn append(&mut self, initial: T::Patch) -> EntryId {
        let mut value = T::default();
        value.merge(initial);
        self.push(value)
    }

    /// Removes the entry. Refuses to empty an at-least-one group.
    pub fn remove(&mut self, id: EntryId) -> bool {
        if self.cardinality == Cardinality::AtLeastOne && self.entries.len() <= 1 {
            return false;
        }
        let before = self.entries.len();
        self.entries.retain(|slot| slot.id != id);
        self.entries.len() != before
    }

    /// Mutates one entry in place and drops its cached validation.
    pub fn update<R>(&mut self, id: EntryId, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let slot = self.entries.iter_mut().find(|slot| slot.id == id)?;
        slot.cached = None;
        Some(f(&mut slot.value))
    }

    pub fn get(&self, id: EntryId) -> Option<&T> {
        self.entries
            .iter()
            .find(|slot| slot.id == id)
            .map(|slot| &slot.value)
    }

    pub fn first_id(&self) -> Option<EntryId> {
        self.entries.first().map(|slot| slot.id)
    }

    pub fn ids(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.entries.iter().map(|slot| slot.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().map(|slot| &slot.value)
    }

    /// Snapshot of the entries in display order.
    pub fn values(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Validates one entry, reusing its cached result when the entry has not
    /// changed since the last check.
    pub fn check_entry(&mut self, id: EntryId, ctx: &RuleContext) -> Option<EntryErrors<T::Field>> {
        let slot = self.entries.iter_mut().find(|slot| slot.id == id)?;
        Some(
            slot.cached
                .get_or_insert_with(|| slot.value.check(ctx))
                .clone(),
        )
    }

    /// Validates every entry, in display order.
    pub fn check_all(&mut self, ctx: &RuleContext) -> Vec<(EntryId, EntryErrors<T::Field>)> {
        self.entries
            .iter_mut()
            .map(|slot| {
                let errors = slot
                    .cached
                    .get_or_insert_with(|| slot.value.check(ctx))
                    .clone();
                (slot.id, errors)
            })
            .collect()
    }

    #[cfg(test)]
    fn is_cached(&self, id: EntryId) -> bool {
        self.entries
            .iter()
            .any(|slot| slot.id == id && slot.cached.is_some())
    }

    fn push(&mut self, value: T) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.push(Slot {
            id,
            value,
            cached: None,
        });
        id
    }
}

impl<T: GroupItem + Serialize> Serialize for RepeatingGroup<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct View<'a, T> {
            id: EntryId,
            #[serde(flatten)]
            value: &'a T,
        }

        serializer.collect_seq(self.entries.iter().map(|slot| View {
            id: slot.id,
            value: &slot.value,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    struct Item {
        label: String,
    }

    #[derive(Default)]
    struct ItemPatch {
        label: Option<String>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum ItemField {
        Label,
    }

    impl GroupItem for Item {
        type Patch = ItemPatch;
        type Field = ItemField;

        fn merge(&mut self, patch: ItemPatch) {
            if let Some(label) = patch.label {
                self.label = label;
            }
        }

        fn check(&self, _ctx: &RuleContext) -> EntryErrors<ItemField> {
            let mut errors = EntryErrors::new();
            if self.label.is_empty() {
                errors.insert(ItemField::Label, "Label is required".to_string());
            }
            errors
        }
    }

    const CTX: RuleContext = RuleContext { current_year: 2026 };

    fn labelled(label: &str) -> ItemPatch {
        ItemPatch {
            label: Some(label.to_string()),
        }
    }

    #[test]
    fn test_append_merges_patch_over_defaults() {
        let mut group = RepeatingGroup::<Item>::new(Cardinality::Any);
        let a = group.append(ItemPatch::default());
        let b = group.append(labelled("b"));
        assert_ne!(a, b);
        assert_eq!(group.get(a).unwrap().label, "");
        assert_eq!(group.get(b).unwrap().label, "b");
    }

    #[test]
    fn test_ids_are_stable_across_removal() {
        let mut group = RepeatingGroup::<Item>::new(Cardinality::Any);
        let a = group.append(labelled("a"));
        let b = group.append(labelled("b"));
        let c = group.append(labelled("c"));

        assert!(group.remove(b));
        assert_eq!(group.ids().collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(group.get(c).unwrap().label, "c");

        let d = group.append(labelled("d"));
        assert!(d != b && d != a && d != c);
    }

    #[test]
    fn test_at_least_one_group_never_empties() {
        let mut group = RepeatingGroup::<Item>::new(Cardinality::AtLeastOne);
        group.ensure_seeded();
        let only = group.first_id().unwrap();
        assert!(!group.remove(only));
        assert_eq!(group.len(), 1);

        let extra = group.append(ItemPatch::default());
        assert!(group.remove(only));
        assert!(!group.remove(extra));
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn test_any_group_can_empty() {
        let mut group = RepeatingGroup::<Item>::new(Cardinality::Any);
        let id = group.append(ItemPatch::default());
        assert!(group.remove(id));
        assert!(group.is_empty());
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut group = RepeatingGroup::<Item>::new(Cardinality::Any);
        group.append(ItemPatch::default());
        assert!(!group.remove(EntryId(99)));
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn test_seeding_happens_once() {
        let mut group = RepeatingGroup::<Item>::new(Cardinality::AtLeastOne);
        assert!(group.ensure_seeded());
        assert!(!group.ensure_seeded());
        assert_eq!(group.len(), 1);

        let mut any = RepeatingGroup::<Item>::new(Cardinality::Any);
        assert!(!any.ensure_seeded());
        assert!(any.is_empty());
    }

    #[test]
    fn test_seeding_skips_populated_group() {
        let mut group =
            RepeatingGroup::from_values(Cardinality::AtLeastOne, vec![Item::default()]);
        assert!(!group.ensure_seeded());
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn test_update_invalidates_only_that_entry() {
        let mut group = RepeatingGroup::<Item>::new(Cardinality::Any);
        let a = group.append(ItemPatch::default());
        let b = group.append(ItemPatch::default());

        let results = group.check_all(&CTX);
        assert_eq!(results.len(), 2);
        assert!(group.is_cached(a) && group.is_cached(b));

        group.update(a, |item| item.label = "fixed".to_string());
        assert!(!group.is_cached(a));
        assert!(group.is_cached(b));

        let errors = group.check_entry(a, &CTX).unwrap();
        assert!(errors.is_empty());
        assert!(group.check_entry(b, &CTX).unwrap().contains_key(&ItemField::Label));
    }

    #[test]
    fn test_values_in_display_order() {
        let group = RepeatingGroup::from_values(
            Cardinality::Any,
            vec![
                Item { label: "x".into() },
                Item { label: "y".into() },
            ],
        );
        let labels: Vec<_> = group.values().into_iter().map(|i| i.label).collect();
        assert_eq!(labels, vec!["x", "y"]);
    }

    #[test]
    fn test_serializes_with_ids() {
        let group = RepeatingGroup::from_values(Cardinality::Any, vec![Item { label: "x".into() }]);
        let value = serde_json::to_value(&group).unwrap();
        assert_eq!(value, serde_json::json!([{ "id": 1, "label": "x" }]));
    }
}
