use std::net::Ipv4Addr;
use std::sync::Arc;

use heimdall_cache::collaborators::{AuthorityZones, DnsServerSettings, NoAuthorityZones, TracingLogger};
use heimdall_cache::manager::CacheManager;
use heimdall_cache::name::OwnerName;
use heimdall_cache::record::envelope::Record;
use heimdall_cache::record::rdata::RecordData;
use heimdall_cache::record::rtype::{RecordClass, RecordType};
use heimdall_cache::request::{CacheRequest, Question};

fn cache() -> CacheManager {
    CacheManager::new(DnsServerSettings::default(), Arc::new(NoAuthorityZones), Arc::new(TracingLogger))
}

fn ns(owner: &str, target: &str) -> Record {
    Record::new(OwnerName::new(owner), RecordType::NS, RecordClass::IN, 3600, RecordData::Ns(OwnerName::new(target)))
}

#[test]
fn ns_referral_includes_glue_in_additional_section() {
    let mgr = cache();
    let mut record = ns("com", "a.gtld-servers.net");
    record.info.glue = vec![Record::new(
        OwnerName::new("a.gtld-servers.net"),
        RecordType::A,
        RecordClass::IN,
        3600,
        RecordData::A(Ipv4Addr::new(192, 5, 6, 30)),
    )];
    mgr.cache_records(vec![record]).unwrap();

    let request = CacheRequest::new(Question::new("example.com", RecordType::A));
    let response = mgr.query(&request, false, true).unwrap();
    assert!(response.answer.is_empty());
    assert_eq!(response.authority.len(), 1);
    assert_eq!(response.additional.len(), 1);
    assert_eq!(response.additional[0].rdata, RecordData::A(Ipv4Addr::new(192, 5, 6, 30)));
}

struct StaticParent(OwnerName, OwnerName);

impl AuthorityZones for StaticParent {
    fn parent_zone(&self, name: &OwnerName) -> Option<OwnerName> {
        if name == &self.0 { Some(self.1.clone()) } else { None }
    }
}

#[test]
fn ds_query_reparents_to_authority_zone_parent() {
    let authority = Arc::new(StaticParent(OwnerName::new("child.test"), OwnerName::new("test")));
    let mgr = CacheManager::new(DnsServerSettings::default(), authority, Arc::new(TracingLogger));

    mgr.cache_records(vec![ns("test", "ns1.test")]).unwrap();
    mgr.cache_records(vec![Record::new(
        OwnerName::new("test"),
        RecordType::DS,
        RecordClass::IN,
        3600,
        RecordData::Ds {
            key_tag: 12345,
            algorithm: 8,
            digest_type: 2,
            digest: vec![1, 2, 3, 4],
        },
    )])
    .unwrap();

    let request = CacheRequest::new(Question::new("child.test", RecordType::DS)).with_dnssec_ok(true);
    let response = mgr.query_closest_delegation(&request).unwrap();
    assert_eq!(response.authority.len(), 2);
    assert!(response.authority.iter().any(|r| r.rtype == RecordType::NS));
    assert!(response.authority.iter().any(|r| r.rtype == RecordType::DS));
}

#[test]
fn ds_query_with_no_authority_parent_and_no_local_parent_misses() {
    let mgr = cache();
    let request = CacheRequest::new(Question::new("child.test", RecordType::DS)).with_dnssec_ok(true);
    // `child.test`'s parent is `test`, which holds nothing: no delegation.
    assert!(mgr.query_closest_delegation(&request).is_none());
}

#[test]
fn svcb_alias_mode_chases_to_service_mode_addresses() {
    let mgr = cache();
    mgr.cache_records(vec![Record::new(
        OwnerName::new("alias.test"),
        RecordType::HTTPS,
        RecordClass::IN,
        300,
        RecordData::Https {
            priority: 0,
            target: OwnerName::new("svc.test"),
            params: Vec::new(),
        },
    )])
    .unwrap();
    mgr.cache_records(vec![Record::new(
        OwnerName::new("svc.test"),
        RecordType::HTTPS,
        RecordClass::IN,
        300,
        RecordData::Https {
            priority: 1,
            target: OwnerName::root(),
            params: Vec::new(),
        },
    )])
    .unwrap();
    mgr.cache_records(vec![Record::new(
        OwnerName::new("svc.test"),
        RecordType::A,
        RecordClass::IN,
        300,
        RecordData::A(Ipv4Addr::new(203, 0, 113, 9)),
    )])
    .unwrap();

    let request = CacheRequest::new(Question::new("alias.test", RecordType::HTTPS));
    let response = mgr.query(&request, false, false).unwrap();
    assert_eq!(response.answer.len(), 1);
    assert_eq!(response.additional.len(), 1);
    assert_eq!(response.additional[0].rdata, RecordData::A(Ipv4Addr::new(203, 0, 113, 9)));
}

#[test]
fn svcb_alias_mode_self_target_is_unavailable() {
    let mgr = cache();
    mgr.cache_records(vec![Record::new(
        OwnerName::new("dead.test"),
        RecordType::SVCB,
        RecordClass::IN,
        300,
        RecordData::Svcb {
            priority: 0,
            target: OwnerName::new("dead.test"),
            params: Vec::new(),
        },
    )])
    .unwrap();

    let request = CacheRequest::new(Question::new("dead.test", RecordType::SVCB));
    let response = mgr.query(&request, false, false).unwrap();
    assert!(response.additional.is_empty());
}
