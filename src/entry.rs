//! Per-(owner, type) entry sets: an ordered list of ECS-scoped
//! variants (spec §3, §4.2).

use std::net::IpAddr;
use std::time::Instant;

use crate::record::envelope::Record;
use crate::scope::ScopeKey;

/// One scope's record list for a given (owner, type).
#[derive(Clone, Debug)]
pub struct ScopedVariant {
    pub scope_key: ScopeKey,
    pub records: Vec<Record>,
    pub last_used: Instant,
}

impl ScopedVariant {
    fn new(scope_key: ScopeKey, records: Vec<Record>) -> Self {
        Self {
            scope_key,
            records,
            last_used: Instant::now(),
        }
    }

    /// True iff every record in this variant is fully expired (beyond
    /// the serve-stale window, or beyond natural expiry when
    /// `serve_stale` is off).
    fn is_removable(&self, now: Instant, serve_stale: bool) -> bool {
        self.records.iter().all(|r| {
            if serve_stale {
                r.is_fully_expired(now)
            } else {
                r.is_stale(now)
            }
        })
    }

    fn head_usable(&self, now: Instant, serve_stale: bool) -> bool {
        match self.records.first() {
            None => false,
            Some(head) => {
                if serve_stale {
                    !head.is_fully_expired(now)
                } else {
                    !head.is_stale(now)
                }
            }
        }
    }
}

/// Invariant 2: at most one variant per scope-key within an entry set.
#[derive(Clone, Debug, Default)]
pub struct EntrySet {
    variants: Vec<ScopedVariant>,
}

impl EntrySet {
    pub fn new() -> Self {
        Self { variants: Vec::new() }
    }

    /// Replace the variant for this record batch's scope, returning
    /// `true` iff a brand new variant was created (used by the
    /// manager to account `total_entries`, spec §4.3.1 step 5).
    pub fn set_records(&mut self, scope_key: ScopeKey, records: Vec<Record>) -> bool {
        if let Some(existing) = self.variants.iter_mut().find(|v| v.scope_key == scope_key) {
            existing.records = records;
            existing.last_used = Instant::now();
            false
        } else {
            self.variants.push(ScopedVariant::new(scope_key, records));
            true
        }
    }

    /// Select the best-scope variant: longest ECS prefix match, else
    /// the global variant. Returns the chosen variant's records if
    /// its head is usable (fresh, or stale-and-serve_stale-eligible).
    pub fn query_records(
        &mut self,
        serve_stale: bool,
        ecs_address: Option<IpAddr>,
    ) -> Option<&mut ScopedVariant> {
        let chosen_index = self.select_variant_index(ecs_address)?;
        let now = Instant::now();
        let variant = &self.variants[chosen_index];
        if !variant.head_usable(now, serve_stale) {
            return None;
        }
        let variant = &mut self.variants[chosen_index];
        variant.last_used = now;
        Some(variant)
    }

    fn select_variant_index(&self, ecs_address: Option<IpAddr>) -> Option<usize> {
        if let Some(addr) = ecs_address {
            let mut best: Option<(usize, u8)> = None;
            for (idx, variant) in self.variants.iter().enumerate() {
                if let Some(prefix) = variant.scope_key.matching_prefix_len(&addr) {
                    if best.map(|(_, p)| prefix > p).unwrap_or(true) {
                        best = Some((idx, prefix));
                    }
                }
            }
            if let Some((idx, _)) = best {
                return Some(idx);
            }
        }
        self.variants
            .iter()
            .position(|v| matches!(v.scope_key, ScopeKey::Global))
    }

    pub fn remove_expired(&mut self, serve_stale: bool) -> usize {
        let now = Instant::now();
        let before = self.variants.len();
        self.variants.retain(|v| !v.is_removable(now, serve_stale));
        before - self.variants.len()
    }

    pub fn remove_least_used(&mut self, cutoff: Instant) -> usize {
        let before = self.variants.len();
        self.variants.retain(|v| v.last_used >= cutoff);
        before - self.variants.len()
    }

    pub fn delete_ecs_data(&mut self) -> usize {
        let before = self.variants.len();
        self.variants.retain(|v| matches!(v.scope_key, ScopeKey::Global));
        before - self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    /// Live variants: at least one record not fully expired.
    pub fn live_variant_count(&self, now: Instant, serve_stale: bool) -> usize {
        self.variants
            .iter()
            .filter(|v| !v.is_removable(now, serve_stale))
            .count()
    }

    pub fn oldest_last_used(&self) -> Option<Instant> {
        self.variants.iter().map(|v| v.last_used).min()
    }

    pub fn all_records(&self) -> impl Iterator<Item = &Record> {
        self.variants.iter().flat_map(|v| v.records.iter())
    }

    pub fn variants(&self) -> &[ScopedVariant] {
        &self.variants
    }

    pub fn variants_mut(&mut self) -> &mut [ScopedVariant] {
        &mut self.variants
    }
}
