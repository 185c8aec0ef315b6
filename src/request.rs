//! The query the resolver hands the cache (spec §4.3.2, §6).

use std::net::IpAddr;

use crate::name::OwnerName;
use crate::record::rtype::{RecordClass, RecordType};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    pub name: OwnerName,
    pub qtype: RecordType,
    pub qclass: RecordClass,
}

impl Question {
    pub fn new(name: impl Into<OwnerName>, qtype: RecordType) -> Self {
        Self {
            name: name.into(),
            qtype,
            qclass: RecordClass::IN,
        }
    }
}

/// An incoming ECS option on the request (source prefix + client
/// address; the scope prefix is filled in by the responder).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestClientSubnet {
    pub address: IpAddr,
    pub source_prefix_len: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheRequest {
    pub question: Question,
    pub dnssec_ok: bool,
    pub checking_disabled: bool,
    pub client_subnet: Option<RequestClientSubnet>,
}

impl CacheRequest {
    pub fn new(question: Question) -> Self {
        Self {
            question,
            dnssec_ok: false,
            checking_disabled: false,
            client_subnet: None,
        }
    }

    pub fn with_dnssec_ok(mut self, dnssec_ok: bool) -> Self {
        self.dnssec_ok = dnssec_ok;
        self
    }

    pub fn with_checking_disabled(mut self, cd: bool) -> Self {
        self.checking_disabled = cd;
        self
    }

    pub fn with_client_subnet(mut self, subnet: RequestClientSubnet) -> Self {
        self.client_subnet = Some(subnet);
        self
    }

    pub fn ecs_address(&self) -> Option<IpAddr> {
        self.client_subnet.map(|s| s.address)
    }
}
