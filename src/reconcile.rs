//! Merge-by-identity for the node and folder collections of the config.

use std::cmp::Ordering;

use crate::rest::{FolderConfig, NodeConfig};

/// An entity with a unique identity and a derived sort key.
pub trait Keyed {
    fn identity(&self) -> &str;
    fn sort_key(&self) -> &str;
}

impl Keyed for NodeConfig {
    fn identity(&self) -> &str {
        &self.node_id
    }

    /// Name when present, identity otherwise. Deriving one key per entity keeps
    /// the order total when named and unnamed nodes are mixed.
    fn sort_key(&self) -> &str {
        if self.name.is_empty() {
            &self.node_id
        } else {
            &self.name
        }
    }
}

impl Keyed for FolderConfig {
    fn identity(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> &str {
        &self.directory
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Replaced,
    Inserted,
}

/// Replace the entity with the same identity in place, or append it, then
/// re-sort.
pub fn upsert<T: Keyed>(items: &mut Vec<T>, item: T) -> Upsert {
    let outcome = match items
        .iter()
        .position(|existing| existing.identity() == item.identity())
    {
        Some(idx) => {
            items[idx] = item;
            Upsert::Replaced
        }
        None => {
            items.push(item);
            Upsert::Inserted
        }
    };
    sort(items);
    outcome
}

/// Drop every entity with the given identity. Returns how many were removed.
pub fn remove<T: Keyed>(items: &mut Vec<T>, identity: &str) -> usize {
    let before = items.len();
    items.retain(|item| item.identity() != identity);
    before - items.len()
}

pub fn sort<T: Keyed>(items: &mut [T]) {
    items.sort_by(compare);
}

pub fn compare<T: Keyed>(a: &T, b: &T) -> Ordering {
    a.sort_key()
        .cmp(b.sort_key())
        .then_with(|| a.identity().cmp(b.identity()))
}

pub fn find<'a, T: Keyed>(items: &'a [T], identity: &str) -> Option<&'a T> {
    items.iter().find(|item| item.identity() == identity)
}
