//! The cache manager: ingest, query assembly, eviction and snapshot
//! wiring (spec §4.3). This is the only type most callers touch
//! directly; the tree/zone/entry layers underneath are implementation
//! detail.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::collaborators::{AuthorityZones, CacheLogger, DnsServerSettings};
use crate::constants::MAX_CNAME_HOPS;
use crate::edns::{ClientSubnetOption, ExtendedDnsError, ExtendedDnsErrorCode};
use crate::error::{CacheError, Result};
use crate::name::OwnerName;
use crate::record::{DnssecStatus, Record, RecordClass, RecordData, RecordType};
use crate::request::CacheRequest;
use crate::response::{self, CacheResponse};
use crate::scope::EcsScope;
use crate::snapshot;
use crate::stats::{CacheStats, CacheStatsSnapshot};
use crate::tree::{CacheTree, ZoneLookup};
use crate::zone::CacheZone;

/// Point-in-time view of the cache's size and hit/miss counters (spec
/// §6 admin surface; counters are the SPEC_FULL ambient-observability
/// supplement mirroring `heimdall::cache::mod::CacheStats`).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub total_entries: i64,
    pub maximum_entries: i64,
    pub zone_count: usize,
    pub counters: CacheStatsSnapshot,
}

pub struct CacheManager {
    tree: CacheTree,
    total_entries: AtomicI64,
    maximum_entries: AtomicI64,
    settings: DnsServerSettings,
    authority: Arc<dyn AuthorityZones>,
    logger: Arc<dyn CacheLogger>,
    stats: CacheStats,
}

impl CacheManager {
    pub fn new(settings: DnsServerSettings, authority: Arc<dyn AuthorityZones>, logger: Arc<dyn CacheLogger>) -> Self {
        Self {
            tree: CacheTree::new(),
            total_entries: AtomicI64::new(0),
            maximum_entries: AtomicI64::new(0),
            settings,
            authority,
            logger,
            stats: CacheStats::new(),
        }
    }

    pub fn maximum_entries(&self) -> i64 {
        self.maximum_entries.load(Ordering::Relaxed)
    }

    /// `0` disables capacity-based eviction entirely (spec §6).
    pub fn set_maximum_entries(&self, value: i64) -> Result<()> {
        if value < 0 {
            return Err(CacheError::invalid_input("maximum_entries must not be negative"));
        }
        self.maximum_entries.store(value, Ordering::Relaxed);
        Ok(())
    }

    pub fn total_entries(&self) -> i64 {
        self.total_entries.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> CacheStatistics {
        CacheStatistics {
            total_entries: self.total_entries(),
            maximum_entries: self.maximum_entries(),
            zone_count: self.tree.enumerate().len(),
            counters: self.stats.snapshot(),
        }
    }

    fn decrement_total_entries(&self, n: usize) {
        if n == 0 {
            return;
        }
        let prev = self.total_entries.fetch_sub(n as i64, Ordering::Relaxed);
        let new_value = prev - n as i64;
        if new_value < 0 {
            self.total_entries.fetch_add(-new_value, Ordering::Relaxed);
        }
    }

    // ---- ingest (spec §4.3.1) -------------------------------------------------

    pub fn cache_records(&self, mut records: Vec<Record>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        propagate_companion_rrsigs(&mut records);

        let dname_owners: Vec<OwnerName> = records
            .iter()
            .filter(|r| r.rtype == RecordType::DNAME)
            .map(|r| r.owner.clone())
            .collect();

        let mut created = 0usize;
        if records.len() == 1 {
            let record = records.into_iter().next().unwrap();
            created += self.store_group(record.owner.clone(), record.rtype, vec![record]);
        } else {
            let mut groups: std::collections::HashMap<(OwnerName, RecordType), Vec<Record>> =
                std::collections::HashMap::new();
            for record in records {
                groups.entry((record.owner.clone(), record.rtype)).or_default().push(record);
            }
            for ((owner, rtype), group) in groups {
                if dname_owners.iter().any(|d| owner.is_subdomain_of(d)) {
                    continue;
                }
                created += self.store_group(owner, rtype, group);
            }
        }

        if created > 0 {
            self.total_entries.fetch_add(created as i64, Ordering::Relaxed);
        }
        Ok(())
    }

    fn store_group(&self, owner: OwnerName, rtype: RecordType, group: Vec<Record>) -> usize {
        let scope_key = crate::scope::ScopeKey::from_record_info(
            group[0].info.ecs_scope,
            group[0].info.conditional_forwarding,
        );
        let zone = self.tree.get_or_add(&owner, || CacheZone::new(owner.clone()));
        if zone.set_records(rtype, scope_key, group) {
            1
        } else {
            0
        }
    }

    // ---- query (spec §4.3.2) ---------------------------------------------------

    pub fn query(
        &self,
        request: &CacheRequest,
        serve_stale_and_reset_expiry: bool,
        find_closest_name_servers: bool,
    ) -> Option<CacheResponse> {
        let now = Instant::now();
        let question = &request.question;
        let lookup = self.tree.find_zone(&question.name, now, self.settings.serve_stale);

        if let Some(zone) = lookup.exact.clone() {
            if let Some(response) = self.answer_from_zone(&zone, request, serve_stale_and_reset_expiry, now) {
                self.stats.record_hit();
                self.record_stale_hit_if_marked(&response);
                return Some(response);
            }
        }

        if let Some(response) = self.try_dname_synthesis(&lookup, request, serve_stale_and_reset_expiry, now) {
            self.stats.record_hit();
            self.record_stale_hit_if_marked(&response);
            return Some(response);
        }

        if find_closest_name_servers {
            if let Some(response) = self.referral_response(&question.name, question.qtype, request.dnssec_ok, now) {
                self.stats.record_hit();
                return Some(response);
            }
        }

        self.stats.record_miss();
        None
    }

    fn record_stale_hit_if_marked(&self, response: &CacheResponse) {
        if response
            .edns_options
            .iter()
            .any(|o| matches!(o.code, crate::edns::EdnsOptionCode::ExtendedError))
        {
            self.stats.record_stale_hit();
        }
    }

    pub fn query_closest_delegation(&self, request: &CacheRequest) -> Option<CacheResponse> {
        let now = Instant::now();
        self.referral_response(&request.question.name, request.question.qtype, request.dnssec_ok, now)
    }

    fn answer_from_zone(
        &self,
        zone: &CacheZone,
        request: &CacheRequest,
        serve_stale_and_reset_expiry: bool,
        now: Instant,
    ) -> Option<CacheResponse> {
        let question = &request.question;
        let ecs_address = request.ecs_address();

        let mut records = zone.query_and_touch(question.qtype, self.settings.serve_stale, true, ecs_address, |recs| {
            reset_stale(recs, serve_stale_and_reset_expiry, now)
        });
        if records.is_none() && question.qtype != RecordType::CNAME {
            records = zone.query_and_touch(RecordType::CNAME, self.settings.serve_stale, false, ecs_address, |recs| {
                reset_stale(recs, serve_stale_and_reset_expiry, now)
            });
        }
        let records = records?;
        let head = records.first()?;

        if head.rdata.is_special() {
            self.answer_from_special(head, request)
        } else {
            self.answer_from_records(records, request, now)
        }
    }

    fn answer_from_special(&self, head: &Record, request: &CacheRequest) -> Option<CacheResponse> {
        let special = head.rdata.as_special()?;
        if matches!(special.kind, crate::record::SpecialCacheKind::NegativeCache) {
            self.stats.record_negative_cache_hit();
        }

        if request.dnssec_ok
            && special
                .original_authority
                .iter()
                .any(|r| r.dnssec_status == DnssecStatus::Disabled)
        {
            return None;
        }

        let was_reset = head.was_expiry_reset
            || special.original_answer.iter().any(|r| r.was_expiry_reset)
            || special.original_authority.iter().any(|r| r.was_expiry_reset);

        let mut edns_options = special.cached_edns_options.clone();
        if was_reset {
            let code = if special.original_rcode == response::rcode::NX_DOMAIN {
                ExtendedDnsErrorCode::StaleNxDomainAnswer
            } else {
                ExtendedDnsErrorCode::StaleAnswer
            };
            edns_options.push(ExtendedDnsError::new(code).into_edns_option());
        }
        if let (Some(subnet), Some(scope)) = (request.client_subnet, head.info.ecs_scope) {
            edns_options.push(client_subnet_response_option(subnet, scope));
        }

        let authority = if request.dnssec_ok {
            special.original_authority.clone()
        } else {
            special.no_dnssec_authority.clone()
        };
        let authentic_data =
            request.dnssec_ok && matches!(special.kind, crate::record::SpecialCacheKind::NegativeCache);

        Some(CacheResponse {
            rcode: special.original_rcode,
            answer: special.original_answer.clone(),
            authority,
            additional: special.original_additional.clone(),
            authentic_data,
            edns_options,
        })
    }

    fn answer_from_records(&self, mut answer: Vec<Record>, request: &CacheRequest, now: Instant) -> Option<CacheResponse> {
        let question = &request.question;
        let ecs_address = request.ecs_address();

        if answer.last().map(|r| r.rtype) == Some(RecordType::CNAME)
            && question.qtype != RecordType::CNAME
            && question.qtype != RecordType::ANY
        {
            answer = self.chase_cnames(answer, question.qtype, ecs_address, now);
        }

        if request.dnssec_ok && answer.iter().any(|r| r.dnssec_status == DnssecStatus::Disabled) {
            return None;
        }

        let mut authority = Vec::new();
        if request.dnssec_ok {
            let mut with_sigs = Vec::with_capacity(answer.len() * 2);
            for record in &answer {
                with_sigs.push(record.clone());
                with_sigs.extend(record.info.rrsigs.iter().cloned());
                if record_is_wildcard_match(record) {
                    authority.extend(record.info.nsec.iter().cloned());
                    for nsec in &record.info.nsec {
                        authority.extend(nsec.info.rrsigs.iter().cloned());
                    }
                }
            }
            answer = with_sigs;
        }

        let additional = if question.qtype.requires_additional_section() {
            self.get_additional_records(&answer, request.dnssec_ok, now)
        } else {
            Vec::new()
        };

        let stale_marked = answer.iter().any(|r| r.was_expiry_reset);
        let mut edns_options = Vec::new();
        if stale_marked {
            edns_options.push(ExtendedDnsError::new(ExtendedDnsErrorCode::StaleAnswer).into_edns_option());
        }
        if let (Some(subnet), Some(scope)) = (request.client_subnet, best_matching_scope(&answer)) {
            edns_options.push(client_subnet_response_option(subnet, scope));
        }

        let authentic_data = answer
            .first()
            .map(|r| r.dnssec_status == DnssecStatus::Secure)
            .unwrap_or(false);

        Some(CacheResponse {
            rcode: response::rcode::NO_ERROR,
            answer,
            authority,
            additional,
            authentic_data,
            edns_options,
        })
    }

    /// Follow a CNAME tail to its final answer (spec §4.3.2), bounded
    /// by `MAX_CNAME_HOPS` and aborting on a self-loop or a repeated
    /// CNAME rdata already present in the accumulated answer.
    fn chase_cnames(&self, mut answer: Vec<Record>, qtype: RecordType, ecs_address: Option<std::net::IpAddr>, now: Instant) -> Vec<Record> {
        let mut hops = 0;
        loop {
            let Some(tail) = answer.last() else { break };
            if tail.rtype != RecordType::CNAME || hops >= MAX_CNAME_HOPS {
                break;
            }
            let Some(target) = tail.rdata.alias_target().cloned() else { break };
            if target == tail.owner {
                break;
            }
            let lookup = self.tree.find_zone(&target, now, self.settings.serve_stale);
            let Some(target_zone) = lookup.exact else { break };
            let Some(next) = self.query_type_or_cname(&target_zone, qtype, ecs_address) else {
                break;
            };
            let Some(next_head) = next.first() else { break };
            let next_is_cname = next_head.rtype == RecordType::CNAME;
            if next_is_cname {
                let cyclical = answer
                    .iter()
                    .any(|r| r.rtype == RecordType::CNAME && r.rdata == next_head.rdata);
                if cyclical {
                    break;
                }
            }
            answer.extend(next);
            hops += 1;
            if !next_is_cname {
                break;
            }
        }
        answer
    }

    /// Query `qtype` at a zone, falling back to a stored CNAME when
    /// `qtype` itself has no answer there (the chain continues).
    fn query_type_or_cname(&self, zone: &CacheZone, qtype: RecordType, ecs_address: Option<std::net::IpAddr>) -> Option<Vec<Record>> {
        zone.query_records(qtype, self.settings.serve_stale, false, ecs_address)
            .or_else(|| zone.query_records(RecordType::CNAME, self.settings.serve_stale, false, ecs_address))
    }

    fn try_dname_synthesis(
        &self,
        lookup: &ZoneLookup,
        request: &CacheRequest,
        serve_stale_and_reset_expiry: bool,
        now: Instant,
    ) -> Option<CacheResponse> {
        let closest = lookup.closest.clone()?;
        let touch = |recs: &mut Vec<Record>| reset_stale(recs, serve_stale_and_reset_expiry, now);
        let dname_records = closest.query_and_touch(RecordType::DNAME, self.settings.serve_stale, false, None, touch)?;
        let dname_record = dname_records.into_iter().next()?;
        let RecordData::Dname(target_suffix) = dname_record.rdata.clone() else {
            return None;
        };

        let question = &request.question;
        let substituted = question.name.substitute_suffix(&closest.owner, &target_suffix);

        let mut answer = vec![dname_record.clone()];
        let rcode = match substituted {
            Some(new_name) => {
                let synthesized = Record::new(
                    question.name.clone(),
                    RecordType::CNAME,
                    RecordClass::IN,
                    dname_record.ttl,
                    RecordData::Cname(new_name.clone()),
                )
                .with_dnssec_status(dname_record.dnssec_status);
                answer.push(synthesized);

                let target_lookup = self.tree.find_zone(&new_name, now, self.settings.serve_stale);
                if let Some(target_zone) = target_lookup.exact {
                    if let Some(records) =
                        self.query_type_or_cname(&target_zone, question.qtype, request.ecs_address())
                    {
                        answer.extend(self.chase_cnames(records, question.qtype, request.ecs_address(), now));
                    }
                }
                response::rcode::NO_ERROR
            }
            None => response::rcode::YX_DOMAIN,
        };

        let stale_marked = answer.iter().any(|r| r.was_expiry_reset);
        let mut edns_options = Vec::new();
        if stale_marked {
            edns_options.push(ExtendedDnsError::new(ExtendedDnsErrorCode::StaleAnswer).into_edns_option());
        }

        Some(CacheResponse {
            rcode,
            answer,
            authority: Vec::new(),
            additional: Vec::new(),
            authentic_data: false,
            edns_options,
        })
    }

    /// Delegation referral shared by the query miss path (§4.3.2) and
    /// `query_closest_delegation` (§4.3.6).
    fn referral_response(&self, name: &OwnerName, qtype: RecordType, dnssec_ok: bool, now: Instant) -> Option<CacheResponse> {
        let start_name = if qtype == RecordType::DS {
            self.authority.parent_zone(name).or_else(|| name.parent())?
        } else {
            name.clone()
        };

        let mut candidate = self.tree.find_zone(&start_name, now, self.settings.serve_stale).delegation;

        loop {
            let zone = candidate.clone()?;
            if zone.owner.is_root() {
                return None;
            }
            let ns_records = zone.ns_records(now);
            if ns_records.is_empty() {
                return None;
            }
            if dnssec_ok && ns_records.iter().all(|r| r.dnssec_status == DnssecStatus::Disabled) {
                candidate = zone
                    .owner
                    .parent()
                    .and_then(|parent| self.tree.find_zone(&parent, now, self.settings.serve_stale).delegation);
                continue;
            }

            let mut authority = ns_records.clone();
            self.add_ds_records_to(&mut authority, &zone, &ns_records, dnssec_ok);
            let additional = self.get_additional_records(&ns_records, dnssec_ok, now);

            return Some(CacheResponse {
                rcode: response::rcode::NO_ERROR,
                answer: Vec::new(),
                authority,
                additional,
                authentic_data: false,
                edns_options: Vec::new(),
            });
        }
    }

    /// DS attachment at a delegation point (spec §4.3.4).
    fn add_ds_records_to(&self, authority: &mut Vec<Record>, zone: &CacheZone, ns_records: &[Record], dnssec_ok: bool) {
        if !dnssec_ok {
            return;
        }
        if let Some(ds_records) = zone.query_records(RecordType::DS, self.settings.serve_stale, false, None) {
            authority.extend(ds_records);
        } else if let Some(first_ns) = ns_records.first() {
            authority.extend(first_ns.info.nsec.iter().cloned());
        }
    }

    /// Additional-section glue synthesis (spec §4.3.3).
    fn get_additional_records(&self, records: &[Record], dnssec_ok: bool, now: Instant) -> Vec<Record> {
        let mut additional = Vec::new();
        for record in records {
            if !record.rtype.requires_additional_section() {
                continue;
            }
            if !record.info.glue.is_empty() {
                let usable: Vec<_> = record.info.glue.iter().filter(|g| !g.is_stale(now)).cloned().collect();
                if !usable.is_empty() {
                    for glue in &usable {
                        additional.push(glue.clone());
                        if dnssec_ok {
                            additional.extend(glue.info.rrsigs.iter().cloned());
                        }
                    }
                    continue;
                }
            }
            self.resolve_additional_target(record, dnssec_ok, now, &mut additional);
        }
        additional
    }

    fn resolve_additional_target(&self, record: &Record, dnssec_ok: bool, now: Instant, out: &mut Vec<Record>) {
        match record.rtype {
            RecordType::SVCB | RecordType::HTTPS => self.resolve_svcb_chain(record, dnssec_ok, now, out),
            _ => {
                if let Some(target) = record.rdata.alias_target() {
                    self.append_address_records(target, dnssec_ok, now, out);
                }
            }
        }
    }

    fn resolve_svcb_chain(&self, record: &Record, dnssec_ok: bool, now: Instant, out: &mut Vec<Record>) {
        let (priority, mut target) = match &record.rdata {
            RecordData::Svcb { priority, target, .. } | RecordData::Https { priority, target, .. } => {
                (*priority, target.clone())
            }
            _ => return,
        };

        if priority > 0 {
            let effective_target = if target.is_root() { record.owner.clone() } else { target };
            self.append_address_records(&effective_target, dnssec_ok, now, out);
            return;
        }

        let mut seen = vec![record.rdata.clone()];
        let mut hops = 0;
        loop {
            if target.is_root() || target == record.owner {
                return;
            }
            if hops >= MAX_CNAME_HOPS {
                return;
            }
            let lookup = self.tree.find_zone(&target, now, self.settings.serve_stale);
            let Some(zone) = lookup.exact else { return };
            let Some(next) = zone.query_records(record.rtype, self.settings.serve_stale, false, None) else {
                return;
            };
            let Some(next_head) = next.first() else { return };
            if seen.contains(&next_head.rdata) {
                return;
            }
            seen.push(next_head.rdata.clone());
            match &next_head.rdata {
                RecordData::Svcb { priority: p, target: t, .. } | RecordData::Https { priority: p, target: t, .. } => {
                    if *p == 0 {
                        target = t.clone();
                        hops += 1;
                    } else {
                        let effective_target = if t.is_root() { next_head.owner.clone() } else { t.clone() };
                        self.append_address_records(&effective_target, dnssec_ok, now, out);
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    fn append_address_records(&self, target: &OwnerName, dnssec_ok: bool, now: Instant, out: &mut Vec<Record>) {
        let lookup = self.tree.find_zone(target, now, self.settings.serve_stale);
        let Some(zone) = lookup.exact else { return };
        for rtype in [RecordType::A, RecordType::AAAA] {
            if let Some(records) = zone.query_records(rtype, self.settings.serve_stale, false, None) {
                for record in &records {
                    out.push(record.clone());
                    if dnssec_ok {
                        out.extend(record.info.rrsigs.iter().cloned());
                    }
                }
            }
        }
    }

    // ---- eviction (spec §4.3.5) -------------------------------------------------

    pub fn remove_expired_records(&self) -> usize {
        let serve_stale = self.settings.serve_stale;
        let maximum = self.maximum_entries();
        let mut removed_total = 0usize;

        let phase1: usize = self.tree.enumerate().iter().map(|z| z.remove_expired_records(serve_stale)).sum();
        removed_total += phase1;
        self.decrement_total_entries(phase1);
        self.stats.record_expired_evictions(phase1 as u64);
        self.prune_empty_zones(serve_stale);

        if maximum == 0 || self.total_entries() <= maximum {
            return removed_total;
        }

        if serve_stale {
            let phase2: usize = self
                .tree
                .enumerate()
                .iter()
                .map(|z| z.remove_expired_records(false))
                .sum();
            removed_total += phase2;
            self.decrement_total_entries(phase2);
            self.stats.record_expired_evictions(phase2 as u64);
            self.prune_empty_zones(false);
        }

        if self.total_entries() <= maximum {
            return removed_total;
        }

        let mut cutoff_seconds: u64 = 86_400;
        while cutoff_seconds >= 1 {
            let cutoff = Instant::now() - Duration::from_secs(cutoff_seconds);
            for zone in self.tree.enumerate() {
                let removed = zone.remove_least_used_records(cutoff);
                if removed > 0 {
                    removed_total += removed;
                    self.decrement_total_entries(removed);
                    self.stats.record_evictions(removed as u64);
                }
                if self.total_entries() <= maximum {
                    break;
                }
            }
            self.prune_empty_zones(serve_stale);
            if self.total_entries() <= maximum || cutoff_seconds == 1 {
                break;
            }
            cutoff_seconds /= 2;
        }

        removed_total
    }

    fn prune_empty_zones(&self, serve_stale: bool) {
        let now = Instant::now();
        for zone in self.tree.enumerate() {
            if zone.is_empty(now, serve_stale) {
                self.tree.try_remove(&zone.owner);
            }
        }
    }

    // ---- admin surface (spec §6) -------------------------------------------------

    pub fn flush(&self) {
        self.tree.try_remove_tree(&OwnerName::root(), Instant::now(), true);
        self.total_entries.store(0, Ordering::Relaxed);
    }

    pub fn delete_zone(&self, domain: &OwnerName) -> usize {
        let removed = self.tree.try_remove_tree(domain, Instant::now(), self.settings.serve_stale);
        self.decrement_total_entries(removed);
        removed
    }

    pub fn delete_edns_client_subnet_data(&self) -> usize {
        let removed: usize = self.tree.enumerate().iter().map(|z| z.delete_ecs_data()).sum();
        self.decrement_total_entries(removed);
        removed
    }

    pub fn list_sub_domains(&self, domain: &OwnerName, out: &mut Vec<OwnerName>) {
        for zone in self.tree.enumerate_subtree(domain) {
            if &zone.owner != domain {
                out.push(zone.owner.clone());
            }
        }
    }

    pub fn list_all_records(&self, domain: &OwnerName, out: &mut Vec<Record>) {
        for zone in self.tree.enumerate_subtree(domain) {
            zone.list_all_records(out);
        }
    }

    /// JSON rendering of [`Self::list_all_records`] for an admin endpoint.
    pub fn list_all_records_json(&self, domain: &OwnerName) -> serde_json::Result<String> {
        let mut records = Vec::new();
        self.list_all_records(domain, &mut records);
        crate::listing::records_to_json(&records)
    }

    /// JSON rendering of [`Self::list_sub_domains`] for an admin endpoint.
    pub fn list_sub_domains_json(&self, domain: &OwnerName) -> serde_json::Result<String> {
        let mut names = Vec::new();
        self.list_sub_domains(domain, &mut names);
        crate::listing::subdomains_to_json(&names)
    }

    // ---- snapshot I/O (spec §6) -------------------------------------------------

    pub async fn save_snapshot(&self) -> Result<()> {
        let mut buffer = Vec::new();
        let written = snapshot::save(&self.tree, &mut buffer, self.settings.serve_stale)?;
        tokio::fs::write(self.settings.snapshot_path(), &buffer).await?;
        self.logger.write(&format!("cache snapshot saved: {written} zones"));
        Ok(())
    }

    pub async fn load_snapshot(&self) -> Result<()> {
        let path = self.settings.snapshot_path();
        let bytes = tokio::fs::read(&path).await?;
        let mut cursor = std::io::Cursor::new(bytes);
        let loaded = snapshot::load(&self.tree, &mut cursor)?;
        self.total_entries.fetch_add(loaded as i64, Ordering::Relaxed);
        self.logger.write(&format!("cache snapshot loaded: {loaded} entries"));
        Ok(())
    }
}

fn reset_stale(records: &mut [Record], serve_stale_and_reset_expiry: bool, now: Instant) {
    if !serve_stale_and_reset_expiry {
        return;
    }
    for record in records.iter_mut() {
        if record.is_stale(now) {
            record.reset_expiry(now);
        }
        if let Some(special) = record.rdata.as_special_mut() {
            for nested in special
                .original_answer
                .iter_mut()
                .chain(special.original_authority.iter_mut())
                .chain(special.original_additional.iter_mut())
            {
                if nested.is_stale(now) {
                    nested.reset_expiry(now);
                }
            }
        }
    }
}

fn propagate_companion_rrsigs(records: &mut [Record]) {
    for index in 0..records.len() {
        if records[index].info.rrsigs.is_empty() {
            continue;
        }
        let rrsigs = records[index].info.rrsigs.clone();
        for glue in records[index].info.glue.iter_mut() {
            if glue.info.rrsigs.is_empty() {
                glue.info.rrsigs = rrsigs.clone();
            }
        }
        for nsec in records[index].info.nsec.iter_mut() {
            if nsec.info.rrsigs.is_empty() {
                nsec.info.rrsigs = rrsigs.clone();
            }
        }
    }
}

/// An RRSIG whose `labels` count is lower than its covered record's
/// actual label count was synthesized over a wildcard match (spec
/// §4.3.2), which requires an NSEC/NSEC3 "no closer match" proof.
fn record_is_wildcard_match(record: &Record) -> bool {
    record.info.rrsigs.iter().any(|rrsig| match &rrsig.rdata {
        RecordData::Rrsig { labels, .. } => (*labels as usize) < record.owner.label_count(),
        _ => false,
    })
}

fn best_matching_scope(records: &[Record]) -> Option<EcsScope> {
    records.iter().filter_map(|r| r.info.ecs_scope).max_by_key(|s| s.prefix_len)
}

fn client_subnet_response_option(subnet: crate::request::RequestClientSubnet, scope: EcsScope) -> crate::edns::EdnsOption {
    ClientSubnetOption {
        address: subnet.address,
        source_prefix_len: subnet.source_prefix_len,
        scope_prefix_len: scope.prefix_len,
    }
    .into_edns_option()
}
