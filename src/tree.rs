//! Label-reversed trie over owner names (spec §4.1). Each level is a
//! `DashMap` keyed by a single label, giving concurrent
//! get-or-insert/lookup without a global lock; writers to unrelated
//! subtrees never contend.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::name::OwnerName;
use crate::zone::CacheZone;

struct TrieNode {
    zone: RwLock<Option<Arc<CacheZone>>>,
    children: DashMap<String, Arc<TrieNode>>,
}

impl TrieNode {
    fn new() -> Self {
        Self {
            zone: RwLock::new(None),
            children: DashMap::new(),
        }
    }
}

/// Result of a longest-prefix lookup (spec §4.1).
pub struct ZoneLookup {
    /// The zone at the exact queried name, if one exists.
    pub exact: Option<Arc<CacheZone>>,
    /// The deepest zone traversed on the path that has any records.
    pub closest: Option<Arc<CacheZone>>,
    /// The deepest zone on the path carrying a live NS set
    /// (Invariant 6 excludes the root).
    pub delegation: Option<Arc<CacheZone>>,
}

pub struct CacheTree {
    root: Arc<TrieNode>,
}

impl Default for CacheTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheTree {
    pub fn new() -> Self {
        Self {
            root: Arc::new(TrieNode::new()),
        }
    }

    /// Atomic get-or-insert; `factory` runs at most once per created zone.
    pub fn get_or_add(&self, name: &OwnerName, factory: impl FnOnce() -> CacheZone) -> Arc<CacheZone> {
        let labels = name.labels_authority_order();
        let mut current = self.root.clone();
        for label in labels {
            let next = current
                .children
                .entry(label.to_string())
                .or_insert_with(|| Arc::new(TrieNode::new()))
                .clone();
            current = next;
        }
        let mut slot = current.zone.write();
        if let Some(existing) = slot.as_ref() {
            return existing.clone();
        }
        let zone = Arc::new(factory());
        *slot = Some(zone.clone());
        zone
    }

    pub fn try_get(&self, name: &OwnerName) -> Option<Arc<CacheZone>> {
        self.descend(&name.labels_authority_order())
            .and_then(|node| node.zone.read().clone())
    }

    /// Longest-prefix lookup: exact zone (if any), the deepest
    /// non-empty zone on the path, and the deepest zone carrying a
    /// live NS set usable as a delegation referral.
    pub fn find_zone(&self, name: &OwnerName, now: Instant, serve_stale: bool) -> ZoneLookup {
        let labels = name.labels_authority_order();
        let mut current = self.root.clone();
        let mut closest = None;
        let mut delegation = None;
        let mut exact = None;
        let mut consumed_all = true;

        if let Some(root_zone) = current.zone.read().clone() {
            if !root_zone.is_empty(now, serve_stale) {
                closest = Some(root_zone.clone());
            }
        }

        for label in &labels {
            let Some(next) = current.children.get(*label).map(|n| n.clone()) else {
                consumed_all = false;
                break;
            };
            current = next;
            if let Some(zone) = current.zone.read().clone() {
                if !zone.is_empty(now, serve_stale) {
                    closest = Some(zone.clone());
                }
                if zone.has_live_delegation_ns(now) {
                    delegation = Some(zone.clone());
                }
            }
        }

        if consumed_all {
            exact = current.zone.read().clone();
        }

        ZoneLookup {
            exact,
            closest,
            delegation,
        }
    }

    pub fn try_remove(&self, name: &OwnerName) -> Option<Arc<CacheZone>> {
        let labels = name.labels_authority_order();
        if labels.is_empty() {
            let mut slot = self.root.zone.write();
            return slot.take();
        }
        let (parent, last_label, node) = self.descend_with_parent(&labels)?;
        let removed = {
            let mut slot = node.zone.write();
            slot.take()
        };
        if node.children.is_empty() {
            parent.children.remove(&last_label);
        }
        removed
    }

    /// Remove the zone at `name` and its entire subtree, returning the
    /// total number of live entries that were removed.
    pub fn try_remove_tree(&self, name: &OwnerName, now: Instant, serve_stale: bool) -> usize {
        let labels = name.labels_authority_order();
        if labels.is_empty() {
            let count = Self::count_subtree(&self.root, now, serve_stale);
            *self.root.zone.write() = None;
            self.root.children.clear();
            return count;
        }
        let Some((parent, last_label, node)) = self.descend_with_parent(&labels) else {
            return 0;
        };
        let count = Self::count_subtree(&node, now, serve_stale);
        parent.children.remove(&last_label);
        count
    }

    fn count_subtree(node: &Arc<TrieNode>, now: Instant, serve_stale: bool) -> usize {
        let mut total = node
            .zone
            .read()
            .as_ref()
            .map(|z| z.total_entries(now, serve_stale))
            .unwrap_or(0);
        for child in node.children.iter() {
            total += Self::count_subtree(child.value(), now, serve_stale);
        }
        total
    }

    /// Weakly consistent snapshot of every live zone (spec §4.1:
    /// "enumeration tolerates concurrent mutation; removed zones may
    /// or may not appear; a zone never appears twice").
    pub fn enumerate(&self) -> Vec<Arc<CacheZone>> {
        let mut out = Vec::new();
        Self::collect(&self.root, &mut out);
        out
    }

    /// Enumerate only zones whose owner is `domain` or a descendant of it.
    pub fn enumerate_subtree(&self, domain: &OwnerName) -> Vec<Arc<CacheZone>> {
        let labels = domain.labels_authority_order();
        let Some(node) = self.descend(&labels) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        Self::collect(&node, &mut out);
        out
    }

    fn collect(node: &Arc<TrieNode>, out: &mut Vec<Arc<CacheZone>>) {
        if let Some(zone) = node.zone.read().clone() {
            out.push(zone);
        }
        for child in node.children.iter() {
            Self::collect(child.value(), out);
        }
    }

    fn descend(&self, labels: &[&str]) -> Option<Arc<TrieNode>> {
        let mut current = self.root.clone();
        for label in labels {
            let next = current.children.get(*label)?.clone();
            current = next;
        }
        Some(current)
    }

    fn descend_with_parent(&self, labels: &[&str]) -> Option<(Arc<TrieNode>, String, Arc<TrieNode>)> {
        if labels.is_empty() {
            return None;
        }
        let mut parent = self.root.clone();
        for label in &labels[..labels.len() - 1] {
            let next = parent.children.get(*label)?.clone();
            parent = next;
        }
        let last = labels[labels.len() - 1].to_string();
        let node = parent.children.get(&last)?.clone();
        Some((parent, last, node))
    }
}
