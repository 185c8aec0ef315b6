//! EDNS option plumbing the cache needs to read and synthesize:
//! Client Subnet (RFC 7871) and Extended DNS Error (RFC 8914).
//!
//! Modeled after `heimdall::dns::edns::{EdnsOpt, EdnsOption}`; the
//! cache only ever builds the option *list* attached to a response.
//! Wire encoding of the OPT pseudo-RR itself belongs to the codec.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdnsOptionCode {
    ClientSubnet,
    ExtendedError,
    Other(u16),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdnsOption {
    pub code: EdnsOptionCode,
    pub data: Vec<u8>,
}

/// EDNS Client Subnet option, request or response form (RFC 7871).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSubnetOption {
    pub address: IpAddr,
    pub source_prefix_len: u8,
    pub scope_prefix_len: u8,
}

impl ClientSubnetOption {
    pub fn into_edns_option(self) -> EdnsOption {
        let mut data = Vec::with_capacity(8 + 16);
        let family: u16 = if self.address.is_ipv4() { 1 } else { 2 };
        data.extend_from_slice(&family.to_be_bytes());
        data.push(self.source_prefix_len);
        data.push(self.scope_prefix_len);
        match self.address {
            IpAddr::V4(v4) => data.extend_from_slice(&v4.octets()),
            IpAddr::V6(v6) => data.extend_from_slice(&v6.octets()),
        }
        EdnsOption {
            code: EdnsOptionCode::ClientSubnet,
            data,
        }
    }
}

/// Extended DNS Error info-codes the cache can synthesize on stale or
/// already-stale-served answers (RFC 8914 §4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtendedDnsErrorCode {
    StaleAnswer,
    StaleNxDomainAnswer,
}

impl ExtendedDnsErrorCode {
    fn info_code(self) -> u16 {
        match self {
            ExtendedDnsErrorCode::StaleAnswer => 3,
            ExtendedDnsErrorCode::StaleNxDomainAnswer => 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedDnsError {
    pub code: ExtendedDnsErrorCode,
    pub extra_text: String,
}

impl ExtendedDnsError {
    pub fn new(code: ExtendedDnsErrorCode) -> Self {
        Self {
            code,
            extra_text: String::new(),
        }
    }

    pub fn into_edns_option(self) -> EdnsOption {
        let mut data = Vec::with_capacity(2 + self.extra_text.len());
        data.extend_from_slice(&self.code.info_code().to_be_bytes());
        data.extend_from_slice(self.extra_text.as_bytes());
        EdnsOption {
            code: EdnsOptionCode::ExtendedError,
            data,
        }
    }
}
