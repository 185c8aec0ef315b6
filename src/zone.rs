//! Per-owner zone storage (spec §4.2): a map from record type to its
//! entry set, with concurrent reads and per-type serialized writes.

use std::net::IpAddr;
use std::time::Instant;

use dashmap::DashMap;

use crate::entry::EntrySet;
use crate::name::OwnerName;
use crate::record::envelope::Record;
use crate::record::rtype::RecordType;
use crate::scope::ScopeKey;

#[derive(Debug)]
pub struct CacheZone {
    pub owner: OwnerName,
    types: DashMap<RecordType, EntrySet>,
}

impl CacheZone {
    pub fn new(owner: OwnerName) -> Self {
        Self {
            owner,
            types: DashMap::new(),
        }
    }

    /// Replace the scoped variant for `rtype`, returning `true` iff a
    /// brand new variant was created (spec §4.3.1 step 5: used to
    /// account `total_entries`).
    pub fn set_records(&self, rtype: RecordType, scope_key: ScopeKey, records: Vec<Record>) -> bool {
        let mut entry = self.types.entry(rtype).or_insert_with(EntrySet::new);
        entry.set_records(scope_key, records)
    }

    /// Select and return the best-scope record list for `rtype`.
    /// Falls back to the special-cache sentinel bucket when
    /// `allow_special` is set and no direct-type answer exists (spec
    /// §4.2: "the pseudo-type used for special cache sentinels
    /// matches any question type when allow_special is true").
    pub fn query_records(
        &self,
        rtype: RecordType,
        serve_stale: bool,
        allow_special: bool,
        ecs_address: Option<IpAddr>,
    ) -> Option<Vec<Record>> {
        self.query_and_touch(rtype, serve_stale, allow_special, ecs_address, |_| {})
    }

    /// Same selection as `query_records`, but gives `on_select` a
    /// mutable handle to the stored records before they are cloned out.
    /// Used by the manager to apply the one-shot stale-serve expiry
    /// reset (spec §4.4) so it persists for subsequent queries.
    pub fn query_and_touch(
        &self,
        rtype: RecordType,
        serve_stale: bool,
        allow_special: bool,
        ecs_address: Option<IpAddr>,
        mut on_select: impl FnMut(&mut Vec<Record>),
    ) -> Option<Vec<Record>> {
        if let Some(mut entry) = self.types.get_mut(&rtype) {
            if let Some(variant) = entry.query_records(serve_stale, ecs_address) {
                on_select(&mut variant.records);
                return Some(variant.records.clone());
            }
        }
        if allow_special && rtype != RecordType::Special {
            if let Some(mut entry) = self.types.get_mut(&RecordType::Special) {
                if let Some(variant) = entry.query_records(serve_stale, ecs_address) {
                    on_select(&mut variant.records);
                    return Some(variant.records.clone());
                }
            }
        }
        None
    }

    /// True iff this zone carries at least one live NS record and is
    /// not the root (Invariant 6: root-owned NS is never a delegation).
    pub fn has_live_delegation_ns(&self, now: Instant) -> bool {
        if self.owner.is_root() {
            return false;
        }
        self.types
            .get(&RecordType::NS)
            .map(|entry| entry.all_records().any(|r| !r.is_fully_expired(now)))
            .unwrap_or(false)
    }

    /// All NS records across every scope variant, for referral
    /// assembly (spec §4.3.2, §4.3.6). DNSSEC-disabled filtering is
    /// left to the caller.
    pub fn ns_records(&self, now: Instant) -> Vec<Record> {
        self.types
            .get(&RecordType::NS)
            .map(|entry| {
                entry
                    .all_records()
                    .filter(|r| !r.is_fully_expired(now))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn remove_expired_records(&self, serve_stale: bool) -> usize {
        let mut removed = 0;
        for mut entry in self.types.iter_mut() {
            removed += entry.remove_expired(serve_stale);
        }
        self.types.retain(|_, entry| !entry.is_empty());
        removed
    }

    pub fn remove_least_used_records(&self, cutoff: Instant) -> usize {
        let mut removed = 0;
        for mut entry in self.types.iter_mut() {
            removed += entry.remove_least_used(cutoff);
        }
        self.types.retain(|_, entry| !entry.is_empty());
        removed
    }

    pub fn delete_ecs_data(&self) -> usize {
        let mut removed = 0;
        for mut entry in self.types.iter_mut() {
            removed += entry.delete_ecs_data();
        }
        removed
    }

    pub fn list_all_records(&self, out: &mut Vec<Record>) {
        for entry in self.types.iter() {
            out.extend(entry.all_records().cloned());
        }
    }

    /// Invariant 3: live, non-fully-expired entry sets for this zone.
    pub fn total_entries(&self, now: Instant, serve_stale: bool) -> usize {
        self.types
            .iter()
            .map(|entry| entry.live_variant_count(now, serve_stale))
            .sum()
    }

    pub fn is_empty(&self, now: Instant, serve_stale: bool) -> bool {
        self.total_entries(now, serve_stale) == 0
    }

    pub fn record_types(&self) -> Vec<RecordType> {
        self.types.iter().map(|e| *e.key()).collect()
    }

    pub fn oldest_last_used(&self) -> Option<Instant> {
        self.types.iter().filter_map(|e| e.oldest_last_used()).min()
    }

    /// Iterate every (type, scope, records) tuple for snapshot save.
    pub fn for_each_variant(&self, mut f: impl FnMut(RecordType, &crate::entry::ScopedVariant)) {
        for entry in self.types.iter() {
            for variant in entry.variants() {
                f(*entry.key(), variant);
            }
        }
    }

    /// Used by snapshot load to repopulate a freshly created zone.
    pub fn insert_loaded_variant(&self, rtype: RecordType, scope_key: ScopeKey, records: Vec<Record>) {
        self.types.entry(rtype).or_insert_with(EntrySet::new).set_records(scope_key, records);
    }
}
