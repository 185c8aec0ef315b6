use std::net::Ipv4Addr;
use std::sync::Arc;

use heimdall_cache::collaborators::{DnsServerSettings, NoAuthorityZones, TracingLogger};
use heimdall_cache::manager::CacheManager;
use heimdall_cache::name::OwnerName;
use heimdall_cache::record::envelope::{CacheRecordInfo, Record};
use heimdall_cache::record::rdata::RecordData;
use heimdall_cache::record::rtype::{RecordClass, RecordType};
use heimdall_cache::request::{CacheRequest, Question, RequestClientSubnet};
use heimdall_cache::scope::EcsScope;

fn cache() -> CacheManager {
    CacheManager::new(DnsServerSettings::default(), Arc::new(NoAuthorityZones), Arc::new(TracingLogger))
}

/// Invariant 5: queries for `EXAMPLE.COM` and `example.com` are the
/// same owner and return identical responses.
#[test]
fn case_insensitive_query_matches_lowercased_entry() {
    let mgr = cache();
    mgr.cache_records(vec![Record::new(
        OwnerName::new("EXAMPLE.com"),
        RecordType::A,
        RecordClass::IN,
        60,
        RecordData::A(Ipv4Addr::new(1, 2, 3, 4)),
    )])
    .unwrap();

    let upper = mgr.query(&CacheRequest::new(Question::new("EXAMPLE.COM", RecordType::A)), false, false);
    let lower = mgr.query(&CacheRequest::new(Question::new("example.com", RecordType::A)), false, false);
    assert_eq!(upper.unwrap().answer, lower.unwrap().answer);
}

/// Invariant 3 / property 3: a CNAME chain is bounded by
/// `MAX_CNAME_HOPS` and terminates instead of hanging, even when every
/// hop is a genuinely distinct owner (so the cycle-detection check
/// never fires).
#[test]
fn cname_chase_stops_at_max_hops() {
    let mgr = cache();
    const HOPS: usize = 20;
    for i in 0..HOPS {
        let target = if i + 1 == HOPS {
            "terminal.test".to_string()
        } else {
            format!("hop{}.test", i + 1)
        };
        mgr.cache_records(vec![Record::new(
            OwnerName::new(&format!("hop{i}.test")),
            RecordType::CNAME,
            RecordClass::IN,
            60,
            RecordData::Cname(OwnerName::new(&target)),
        )])
        .unwrap();
    }
    mgr.cache_records(vec![Record::new(
        OwnerName::new("terminal.test"),
        RecordType::A,
        RecordClass::IN,
        60,
        RecordData::A(Ipv4Addr::new(9, 9, 9, 9)),
    )])
    .unwrap();

    let request = CacheRequest::new(Question::new("hop0.test", RecordType::A));
    let response = mgr.query(&request, false, false).unwrap();
    assert!(response.answer.len() <= heimdall_cache::constants::MAX_CNAME_HOPS + 1);
    // With 20 real hops and a cap of 16, the chain must not reach the A record.
    assert!(response.answer.iter().all(|r| r.rtype == RecordType::CNAME));
}

#[test]
fn longest_prefix_ecs_scope_wins_over_shorter_scope() {
    let mgr = cache();
    let broad = EcsScope::new("203.0.0.0".parse().unwrap(), 16);
    let narrow = EcsScope::new("203.0.113.0".parse().unwrap(), 24);

    let mut broad_record = Record::new(OwnerName::new("scoped.test"), RecordType::A, RecordClass::IN, 60, RecordData::A(Ipv4Addr::new(1, 1, 1, 1)));
    broad_record.info = CacheRecordInfo {
        ecs_scope: Some(broad),
        ..Default::default()
    };
    let mut narrow_record = Record::new(OwnerName::new("scoped.test"), RecordType::A, RecordClass::IN, 60, RecordData::A(Ipv4Addr::new(2, 2, 2, 2)));
    narrow_record.info = CacheRecordInfo {
        ecs_scope: Some(narrow),
        ..Default::default()
    };
    mgr.cache_records(vec![broad_record]).unwrap();
    mgr.cache_records(vec![narrow_record]).unwrap();

    let request = CacheRequest::new(Question::new("scoped.test", RecordType::A)).with_client_subnet(RequestClientSubnet {
        address: "203.0.113.42".parse().unwrap(),
        source_prefix_len: 24,
    });
    let response = mgr.query(&request, false, false).unwrap();
    assert_eq!(response.answer[0].rdata, RecordData::A(Ipv4Addr::new(2, 2, 2, 2)));
}

#[test]
fn delete_edns_client_subnet_data_keeps_global_variant() {
    let mgr = cache();
    let scope = EcsScope::new("198.51.100.0".parse().unwrap(), 24);
    let mut scoped = Record::new(OwnerName::new("ecs.test"), RecordType::A, RecordClass::IN, 60, RecordData::A(Ipv4Addr::new(3, 3, 3, 3)));
    scoped.info.ecs_scope = Some(scope);
    mgr.cache_records(vec![scoped]).unwrap();
    mgr.cache_records(vec![Record::new(OwnerName::new("ecs.test"), RecordType::A, RecordClass::IN, 60, RecordData::A(Ipv4Addr::new(4, 4, 4, 4)))])
        .unwrap();
    assert_eq!(mgr.total_entries(), 2);

    let removed = mgr.delete_edns_client_subnet_data();
    assert_eq!(removed, 1);
    assert_eq!(mgr.total_entries(), 1);

    let request = CacheRequest::new(Question::new("ecs.test", RecordType::A));
    let response = mgr.query(&request, false, false).unwrap();
    assert_eq!(response.answer[0].rdata, RecordData::A(Ipv4Addr::new(4, 4, 4, 4)));
}
