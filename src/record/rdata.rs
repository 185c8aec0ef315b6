//! Typed rdata. The cache never decodes or encodes wire format (that
//! is the resolver/codec's job, out of scope per spec §1); it only
//! needs enough structure to chase CNAMEs, substitute DNAME targets,
//! and resolve SVCB/HTTPS/NS/MX/SRV glue targets.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::name::OwnerName;
use crate::record::special::SpecialCacheRecordData;

#[derive(Clone, Debug, PartialEq)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ns(OwnerName),
    Cname(OwnerName),
    Dname(OwnerName),
    Soa {
        mname: OwnerName,
        rname: OwnerName,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    Mx {
        preference: u16,
        exchange: OwnerName,
    },
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: OwnerName,
    },
    Txt(Vec<Vec<u8>>),
    /// SVCB/HTTPS share a wire format; `SvcPriority == 0` is AliasMode,
    /// `> 0` is ServiceMode (spec §4.3.3).
    Svcb {
        priority: u16,
        target: OwnerName,
        params: Vec<(u16, Vec<u8>)>,
    },
    Https {
        priority: u16,
        target: OwnerName,
        params: Vec<(u16, Vec<u8>)>,
    },
    Ds {
        key_tag: u16,
        algorithm: u8,
        digest_type: u8,
        digest: Vec<u8>,
    },
    Rrsig {
        type_covered: u16,
        algorithm: u8,
        /// Number of labels in the original owner name; used to
        /// detect wildcard expansion (spec §4.3.2).
        labels: u8,
        original_ttl: u32,
        signature_expiration: u32,
        signature_inception: u32,
        key_tag: u16,
        signer_name: OwnerName,
        signature: Vec<u8>,
    },
    Nsec {
        next_domain: OwnerName,
        type_bitmap: Vec<u8>,
    },
    Nsec3 {
        hash_algorithm: u8,
        flags: u8,
        iterations: u16,
        salt: Vec<u8>,
        next_hashed_owner: Vec<u8>,
        type_bitmap: Vec<u8>,
    },
    /// Sentinel rdata standing in for a cached negative/failure/blocked
    /// response (spec §3).
    Special(SpecialCacheRecordData),
    /// Anything the cache does not need to interpret structurally.
    Raw(Vec<u8>),
}

impl RecordData {
    /// The owner-name target this record's data points at, for
    /// CNAME/DNAME chase and glue resolution. SVCB/HTTPS ServiceMode
    /// with `TargetName == "."` resolves against the record's own
    /// owner, which callers must supply separately.
    pub fn alias_target(&self) -> Option<&OwnerName> {
        match self {
            RecordData::Cname(target) => Some(target),
            RecordData::Dname(target) => Some(target),
            RecordData::Ns(target) => Some(target),
            RecordData::Mx { exchange, .. } => Some(exchange),
            RecordData::Srv { target, .. } => Some(target),
            RecordData::Svcb { target, .. } => Some(target),
            RecordData::Https { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn is_special(&self) -> bool {
        matches!(self, RecordData::Special(_))
    }

    pub fn as_special(&self) -> Option<&SpecialCacheRecordData> {
        match self {
            RecordData::Special(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_special_mut(&mut self) -> Option<&mut SpecialCacheRecordData> {
        match self {
            RecordData::Special(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_soa_minimum(&self) -> Option<u32> {
        match self {
            RecordData::Soa { minimum, .. } => Some(*minimum),
            _ => None,
        }
    }
}
