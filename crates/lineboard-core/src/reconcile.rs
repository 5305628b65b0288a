use crate::{Banner, Snapshot, StatusItem, SyncLabel};
use std::collections::{HashMap, HashSet};

/// Ordered, id-keyed set of status items owned by the sync client.
///
/// Lookup goes through `items`; presentation order lives in `order`. Both
/// always hold the same ids.
#[derive(Debug, Clone, Default)]
pub struct HeldCollection {
    items: HashMap<String, StatusItem>,
    order: Vec<String>,
}

impl HeldCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&StatusItem> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|held| held == id)
    }

    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusItem> + '_ {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    pub fn to_vec(&self) -> Vec<StatusItem> {
        self.iter().cloned().collect()
    }

    /// First position whose held label does not sort before `label`.
    fn insertion_index(&self, label: &str) -> usize {
        self.order
            .iter()
            .position(|id| {
                self.items
                    .get(id)
                    .map(|held| label <= held.line_en.as_str())
                    .unwrap_or(false)
            })
            .unwrap_or(self.order.len())
    }

    fn insert(&mut self, item: StatusItem) -> usize {
        let index = self.insertion_index(&item.line_en);
        self.order.insert(index, item.id.clone());
        self.items.insert(item.id.clone(), item);
        index
    }

    /// Returns `None` when `incoming.id` is not held, otherwise whether any
    /// field changed. Position is never touched.
    fn update_in_place(&mut self, incoming: &StatusItem) -> Option<bool> {
        let held = self.items.get_mut(&incoming.id)?;
        let changed = held.status_en != incoming.status_en
            || held.reason != incoming.reason
            || held.severe != incoming.severe;
        if changed {
            held.status_en.clone_from(&incoming.status_en);
            held.reason.clone_from(&incoming.reason);
            held.severe = incoming.severe;
        }
        Some(changed)
    }

    fn retain_seen(&mut self, seen: &HashSet<String>) -> Vec<String> {
        let (kept, removed): (Vec<String>, Vec<String>) =
            self.order.drain(..).partition(|id| seen.contains(id));
        self.order = kept;
        for id in &removed {
            self.items.remove(id);
        }
        removed
    }

    fn clear(&mut self) -> Vec<String> {
        self.items.clear();
        std::mem::take(&mut self.order)
    }
}

/// Structural change applied to the held collection, in application order.
///
/// `Inserted::index` is the position at the moment of insertion, so changes
/// must be replayed in sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemChange {
    Inserted { id: String, index: usize },
    Updated { id: String },
    Removed { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub changes: Vec<ItemChange>,
    pub banner: Banner,
    pub sync_label: SyncLabel,
    pub live: bool,
}

impl ReconcileReport {
    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Merges `snapshot` into `held`.
///
/// An empty snapshot resets the view and raises a banner. Otherwise known ids
/// are updated where they stand, new ids are placed by `line_en`, and ids the
/// snapshot no longer mentions are removed.
pub fn reconcile(held: &mut HeldCollection, snapshot: Snapshot) -> ReconcileReport {
    let Snapshot {
        lines,
        updated,
        live,
    } = snapshot;
    let sync_label = SyncLabel::Updated(updated);

    if lines.is_empty() {
        let banner = if live {
            Banner::AllClear
        } else {
            Banner::Disconnected
        };
        let changes = held
            .clear()
            .into_iter()
            .map(|id| ItemChange::Removed { id })
            .collect();
        return ReconcileReport {
            changes,
            banner,
            sync_label,
            live,
        };
    }

    let mut changes = Vec::new();
    let mut seen = HashSet::with_capacity(lines.len());
    for item in lines {
        seen.insert(item.id.clone());
        match held.update_in_place(&item) {
            Some(true) => changes.push(ItemChange::Updated { id: item.id }),
            Some(false) => {}
            None => {
                let id = item.id.clone();
                let index = held.insert(item);
                changes.push(ItemChange::Inserted { id, index });
            }
        }
    }
    changes.extend(
        held.retain_seen(&seen)
            .into_iter()
            .map(|id| ItemChange::Removed { id }),
    );

    ReconcileReport {
        changes,
        banner: Banner::Hidden,
        sync_label,
        live,
    }
}
