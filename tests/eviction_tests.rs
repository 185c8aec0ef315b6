use std::net::Ipv4Addr;
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use heimdall_cache::collaborators::{DnsServerSettings, NoAuthorityZones, TracingLogger};
use heimdall_cache::manager::CacheManager;
use heimdall_cache::name::OwnerName;
use heimdall_cache::record::envelope::Record;
use heimdall_cache::record::rdata::RecordData;
use heimdall_cache::record::rtype::{RecordClass, RecordType};

fn a_record(owner: &str, addr: Ipv4Addr) -> Record {
    Record::new(OwnerName::new(owner), RecordType::A, RecordClass::IN, 300, RecordData::A(addr))
}

/// Scenario (g): with a capacity of 2 and three fresh entries, eviction
/// drops the one with the oldest last-used timestamp once the LRU
/// cutoff sweep reaches it (spec §4.3.5 step 3).
#[test]
fn capacity_eviction_drops_oldest_last_used_entry() {
    let mgr = CacheManager::new(DnsServerSettings::default(), Arc::new(NoAuthorityZones), Arc::new(TracingLogger));
    mgr.set_maximum_entries(2).unwrap();

    mgr.cache_records(vec![a_record("oldest.test", Ipv4Addr::new(1, 1, 1, 1))]).unwrap();
    // The LRU sweep's cutoffs halve down to a 1-second floor (spec
    // §4.3.5); this gap needs to exceed that floor so "oldest.test" is
    // distinguishable as older than the other two entries.
    sleep(Duration::from_millis(1100));
    mgr.cache_records(vec![a_record("middle.test", Ipv4Addr::new(2, 2, 2, 2))]).unwrap();
    mgr.cache_records(vec![a_record("newest.test", Ipv4Addr::new(3, 3, 3, 3))]).unwrap();
    assert_eq!(mgr.total_entries(), 3);

    mgr.remove_expired_records();
    assert_eq!(mgr.total_entries(), 2);

    let mut all = Vec::new();
    mgr.list_all_records(&OwnerName::new("oldest.test"), &mut all);
    assert!(all.is_empty(), "oldest entry should have been evicted first");

    let mut remaining = Vec::new();
    mgr.list_all_records(&OwnerName::new("middle.test"), &mut remaining);
    assert_eq!(remaining.len(), 1);
}

#[test]
fn zero_maximum_entries_disables_capacity_eviction() {
    let mgr = CacheManager::new(DnsServerSettings::default(), Arc::new(NoAuthorityZones), Arc::new(TracingLogger));
    assert_eq!(mgr.maximum_entries(), 0);
    for i in 0..5 {
        mgr.cache_records(vec![a_record(&format!("host{i}.test"), Ipv4Addr::new(10, 0, 0, i))]).unwrap();
    }
    mgr.remove_expired_records();
    assert_eq!(mgr.total_entries(), 5);
}

#[test]
fn flush_clears_everything() {
    let mgr = CacheManager::new(DnsServerSettings::default(), Arc::new(NoAuthorityZones), Arc::new(TracingLogger));
    mgr.cache_records(vec![a_record("gone.test", Ipv4Addr::new(4, 4, 4, 4))]).unwrap();
    assert_eq!(mgr.total_entries(), 1);
    mgr.flush();
    assert_eq!(mgr.total_entries(), 0);
    let mut all = Vec::new();
    mgr.list_all_records(&OwnerName::new("gone.test"), &mut all);
    assert!(all.is_empty());
}

#[test]
fn delete_zone_removes_subtree_only() {
    let mgr = CacheManager::new(DnsServerSettings::default(), Arc::new(NoAuthorityZones), Arc::new(TracingLogger));
    mgr.cache_records(vec![a_record("keep.test", Ipv4Addr::new(5, 5, 5, 5))]).unwrap();
    mgr.cache_records(vec![a_record("host.drop.test", Ipv4Addr::new(6, 6, 6, 6))]).unwrap();

    let removed = mgr.delete_zone(&OwnerName::new("drop.test"));
    assert_eq!(removed, 1);

    let mut kept = Vec::new();
    mgr.list_all_records(&OwnerName::new("keep.test"), &mut kept);
    assert_eq!(kept.len(), 1);

    let mut dropped = Vec::new();
    mgr.list_all_records(&OwnerName::new("host.drop.test"), &mut dropped);
    assert!(dropped.is_empty());
}
