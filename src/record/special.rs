//! The special cache record: a sentinel rdata variant standing in for
//! a cached negative, failure, or blocked response (spec §3).

use crate::edns::EdnsOption;
use crate::record::envelope::Record;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecialCacheKind {
    NegativeCache,
    FailureCache,
    BlockedCache,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpecialCacheRecordData {
    pub kind: SpecialCacheKind,
    pub rcode: u16,
    pub original_rcode: u16,
    pub original_answer: Vec<Record>,
    pub original_authority: Vec<Record>,
    pub original_additional: Vec<Record>,
    /// The authority view to hand back when the query is not
    /// DNSSEC-OK: RRSIG/NSEC/NSEC3/DS records stripped out.
    pub no_dnssec_authority: Vec<Record>,
    pub cached_edns_options: Vec<EdnsOption>,
}

impl SpecialCacheRecordData {
    pub fn new(kind: SpecialCacheKind, rcode: u16, original_rcode: u16) -> Self {
        Self {
            kind,
            rcode,
            original_rcode,
            original_answer: Vec::new(),
            original_authority: Vec::new(),
            original_additional: Vec::new(),
            no_dnssec_authority: Vec::new(),
            cached_edns_options: Vec::new(),
        }
    }
}
