use std::sync::Arc;
use std::time::{Duration, Instant};

use heimdall_cache::collaborators::{DnsServerSettings, NoAuthorityZones, TracingLogger};
use heimdall_cache::edns::EdnsOptionCode;
use heimdall_cache::manager::CacheManager;
use heimdall_cache::name::OwnerName;
use heimdall_cache::record::envelope::Record;
use heimdall_cache::record::rdata::RecordData;
use heimdall_cache::record::rtype::{RecordClass, RecordType};
use heimdall_cache::record::special::{SpecialCacheKind, SpecialCacheRecordData};
use heimdall_cache::request::{CacheRequest, Question};
use heimdall_cache::response::rcode;

fn cache() -> CacheManager {
    let mut settings = DnsServerSettings::default();
    settings.serve_stale = true;
    CacheManager::new(settings, Arc::new(NoAuthorityZones), Arc::new(TracingLogger))
}

fn soa(owner: &str) -> Record {
    Record::new(
        OwnerName::new(owner),
        RecordType::SOA,
        RecordClass::IN,
        300,
        RecordData::Soa {
            mname: OwnerName::new(format!("ns1.{owner}")),
            rname: OwnerName::new(format!("hostmaster.{owner}")),
            serial: 2024010100,
            refresh: 3600,
            retry: 600,
            expire: 86400,
            minimum: 300,
        },
    )
}

fn sentinel(owner: &str, kind: SpecialCacheKind, rcode: u16) -> Record {
    let mut special = SpecialCacheRecordData::new(kind, rcode, rcode);
    special.original_authority = vec![soa(owner)];
    special.no_dnssec_authority = vec![soa(owner)];
    Record::new(OwnerName::new(owner), RecordType::Special, RecordClass::IN, 300, RecordData::Special(special))
}

#[test]
fn negative_cache_hides_dnssec_authority_without_dnssec_ok() {
    let mgr = cache();
    mgr.cache_records(vec![sentinel("nx.test", SpecialCacheKind::NegativeCache, rcode::NX_DOMAIN)])
        .unwrap();

    let request = CacheRequest::new(Question::new("nx.test", RecordType::A));
    let response = mgr.query(&request, false, false).unwrap();
    assert_eq!(response.rcode, rcode::NX_DOMAIN);
    assert!(!response.authentic_data);
    assert_eq!(response.authority.len(), 1);
}

#[test]
fn failure_cache_is_not_authentic_data() {
    let mgr = cache();
    mgr.cache_records(vec![sentinel("timeout.test", SpecialCacheKind::FailureCache, 2)])
        .unwrap();

    let request = CacheRequest::new(Question::new("timeout.test", RecordType::A)).with_dnssec_ok(true);
    let response = mgr.query(&request, false, false).unwrap();
    assert_eq!(response.rcode, 2);
    assert!(!response.authentic_data);
}

#[test]
fn stale_negative_cache_reports_stale_nxdomain_error() {
    let mgr = cache();
    let mut record = sentinel("expired-nx.test", SpecialCacheKind::NegativeCache, rcode::NX_DOMAIN);
    record.received_at = Instant::now() - Duration::from_secs(600);
    mgr.cache_records(vec![record]).unwrap();

    let request = CacheRequest::new(Question::new("expired-nx.test", RecordType::A));
    let response = mgr.query(&request, true, false).unwrap();
    assert_eq!(response.rcode, rcode::NX_DOMAIN);
    let has_stale_nxdomain = response
        .edns_options
        .iter()
        .any(|o| matches!(o.code, EdnsOptionCode::ExtendedError) && o.data.get(0..2) == Some(&4u16.to_be_bytes()[..]));
    assert!(has_stale_nxdomain, "expected StaleNxDomainAnswer info-code 4, got {:?}", response.edns_options);
}

#[test]
fn dnssec_disabled_authority_falls_through_to_delegation() {
    let mgr = cache();
    mgr.cache_records(vec![Record::new(
        OwnerName::new("test"),
        RecordType::NS,
        RecordClass::IN,
        3600,
        RecordData::Ns(OwnerName::new("ns1.test")),
    )])
    .unwrap();

    let mut special = SpecialCacheRecordData::new(SpecialCacheKind::NegativeCache, rcode::NX_DOMAIN, rcode::NX_DOMAIN);
    let mut disabled_soa = soa("nx.test");
    disabled_soa.dnssec_status = heimdall_cache::record::DnssecStatus::Disabled;
    special.original_authority = vec![disabled_soa];
    let sentinel = Record::new(OwnerName::new("nx.test"), RecordType::Special, RecordClass::IN, 300, RecordData::Special(special));
    mgr.cache_records(vec![sentinel]).unwrap();

    let request = CacheRequest::new(Question::new("nx.test", RecordType::A)).with_dnssec_ok(true);
    let response = mgr.query(&request, false, true).unwrap();
    // Falls through past the sentinel to the `test` NS delegation referral.
    assert!(response.answer.is_empty());
    assert_eq!(response.authority.len(), 1);
    assert_eq!(response.authority[0].rtype, RecordType::NS);
}
