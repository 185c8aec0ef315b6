//! JSON admin-listing views for `CacheManager::list_all_records`/
//! `list_sub_domains` (spec §6 admin surface). The cache's internal
//! types are deliberately not `Serialize` end-to-end (companion
//! metadata carries `Instant`s, which don't serialize); this module
//! is the flattened, externally-observable projection an admin
//! endpoint would render, matching the teacher's broad use of
//! `serde`/`serde_json` for any outward-facing view.

use serde::Serialize;
use std::time::Instant;

use crate::name::OwnerName;
use crate::record::envelope::{DnssecStatus, Record};
use crate::record::rtype::RecordType;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecordListingEntry {
    pub owner: String,
    pub rtype: u16,
    pub remaining_ttl: u32,
    pub dnssec_status: &'static str,
    pub is_stale: bool,
    pub rdata: String,
}

impl RecordListingEntry {
    pub fn from_record(record: &Record, now: Instant) -> Self {
        Self {
            owner: record.owner.to_string(),
            rtype: record.rtype.to_u16(),
            remaining_ttl: record.remaining_ttl(now),
            dnssec_status: dnssec_status_label(record.dnssec_status),
            is_stale: record.is_stale(now),
            rdata: format!("{:?}", record.rdata),
        }
    }
}

fn dnssec_status_label(status: DnssecStatus) -> &'static str {
    match status {
        DnssecStatus::Unknown => "unknown",
        DnssecStatus::Disabled => "disabled",
        DnssecStatus::Insecure => "insecure",
        DnssecStatus::Secure => "secure",
        DnssecStatus::Bogus => "bogus",
    }
}

/// Serialize a record list the way an admin endpoint would hand it
/// back over HTTP.
pub fn records_to_json(records: &[Record]) -> serde_json::Result<String> {
    let now = Instant::now();
    let entries: Vec<RecordListingEntry> = records.iter().map(|r| RecordListingEntry::from_record(r, now)).collect();
    serde_json::to_string(&entries)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubdomainListing {
    pub names: Vec<String>,
}

pub fn subdomains_to_json(names: &[OwnerName]) -> serde_json::Result<String> {
    let listing = SubdomainListing {
        names: names.iter().map(|n| n.to_string()).collect(),
    };
    serde_json::to_string(&listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::rdata::RecordData;
    use crate::record::rtype::RecordClass;
    use std::net::Ipv4Addr;

    #[test]
    fn record_entry_serializes_to_json() {
        let record = Record::new(
            OwnerName::new("example.com"),
            RecordType::A,
            RecordClass::IN,
            60,
            RecordData::A(Ipv4Addr::new(1, 2, 3, 4)),
        );
        let json = records_to_json(std::slice::from_ref(&record)).unwrap();
        assert!(json.contains("\"owner\":\"example.com\""));
        assert!(json.contains("\"rtype\":1"));
    }

    #[test]
    fn subdomain_listing_serializes() {
        let names = vec![OwnerName::new("a.test"), OwnerName::new("b.test")];
        let json = subdomains_to_json(&names).unwrap();
        assert!(json.contains("a.test"));
        assert!(json.contains("b.test"));
    }
}
