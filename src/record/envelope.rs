//! The record envelope: a DNS record plus cache metadata (spec §3).

use std::time::{Duration, Instant};

use crate::constants::{
    FAILURE_RECORD_TTL, MAXIMUM_RECORD_TTL, MINIMUM_RECORD_TTL, NEGATIVE_RECORD_TTL, SERVE_STALE_TTL,
    STALE_EXPIRY_RESET_SECONDS,
};
use crate::name::OwnerName;
use crate::record::rdata::RecordData;
use crate::record::rtype::{RecordClass, RecordType};
use crate::record::special::SpecialCacheRecordData;
use crate::scope::EcsScope;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DnssecStatus {
    #[default]
    Unknown,
    Disabled,
    Insecure,
    Secure,
    Bogus,
}

/// Companion metadata attached to each envelope (spec §3). Glue,
/// RRSIGs and NSEC/NSEC3 proofs are owned by the envelope they ride
/// along with; there is no shared-handle aliasing (spec §9).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CacheRecordInfo {
    pub glue: Vec<Record>,
    pub rrsigs: Vec<Record>,
    pub nsec: Vec<Record>,
    pub ecs_scope: Option<EcsScope>,
    pub conditional_forwarding: bool,
}

impl CacheRecordInfo {
    pub fn is_empty(&self) -> bool {
        self.glue.is_empty()
            && self.rrsigs.is_empty()
            && self.nsec.is_empty()
            && self.ecs_scope.is_none()
            && !self.conditional_forwarding
    }
}

/// A single cached DNS record with cache-management state.
///
/// `received_at`/expiry bookkeeping is monotonic (`Instant`-based);
/// wall-clock timestamps only appear at the snapshot boundary
/// (spec §6).
#[derive(Clone, Debug)]
pub struct Record {
    pub owner: OwnerName,
    pub rtype: RecordType,
    pub rclass: RecordClass,
    /// TTL already clamped to `[MIN_TTL, MAX_TTL]` (Invariant 5).
    pub ttl: u32,
    pub rdata: RecordData,
    pub dnssec_status: DnssecStatus,
    pub received_at: Instant,
    pub info: CacheRecordInfo,
    /// Set by `reset_expiry` the one time a stale answer is served
    /// and its expiry pushed forward (spec §4.4).
    pub was_expiry_reset: bool,
    stale_reset_deadline: Option<Instant>,
}

impl Record {
    pub fn new(owner: OwnerName, rtype: RecordType, rclass: RecordClass, ttl: u32, rdata: RecordData) -> Self {
        Self {
            owner,
            rtype,
            rclass,
            ttl: clamp_ttl(ttl),
            rdata,
            dnssec_status: DnssecStatus::Unknown,
            received_at: Instant::now(),
            info: CacheRecordInfo::default(),
            was_expiry_reset: false,
            stale_reset_deadline: None,
        }
    }

    /// A negative-cache (NXDOMAIN/NODATA) sentinel, TTL'd from the
    /// answer's SOA minimum when known, falling back to
    /// `NEGATIVE_RECORD_TTL` otherwise (spec Invariant 5).
    pub fn new_negative_cache(owner: OwnerName, data: SpecialCacheRecordData, soa_minimum: Option<u32>) -> Self {
        let ttl = soa_minimum.unwrap_or(NEGATIVE_RECORD_TTL);
        Self::new(owner, RecordType::Special, RecordClass::IN, ttl, RecordData::Special(data))
    }

    /// A failure-cache (upstream timeout/SERVFAIL) sentinel, always
    /// TTL'd at the fixed `FAILURE_RECORD_TTL` (spec Invariant 5).
    pub fn new_failure_cache(owner: OwnerName, data: SpecialCacheRecordData) -> Self {
        Self::new(owner, RecordType::Special, RecordClass::IN, FAILURE_RECORD_TTL, RecordData::Special(data))
    }

    pub fn with_dnssec_status(mut self, status: DnssecStatus) -> Self {
        self.dnssec_status = status;
        self
    }

    pub fn with_info(mut self, info: CacheRecordInfo) -> Self {
        self.info = info;
        self
    }

    pub fn natural_expires_at(&self) -> Instant {
        self.received_at + Duration::from_secs(self.ttl as u64)
    }

    /// The expiry actually in effect, accounting for a one-shot
    /// stale-serve reset.
    pub fn expires_at(&self) -> Instant {
        match self.stale_reset_deadline {
            Some(deadline) if deadline > self.natural_expires_at() => deadline,
            _ => self.natural_expires_at(),
        }
    }

    pub fn is_stale(&self, now: Instant) -> bool {
        now > self.expires_at()
    }

    pub fn is_fully_expired(&self, now: Instant) -> bool {
        now > self.expires_at() + Duration::from_secs(SERVE_STALE_TTL as u64)
    }

    pub fn is_within_serve_stale_window(&self, now: Instant) -> bool {
        self.is_stale(now) && !self.is_fully_expired(now)
    }

    pub fn remaining_ttl(&self, now: Instant) -> u32 {
        self.expires_at()
            .checked_duration_since(now)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0)
    }

    /// Extend a stale record's expiry by `STALE_EXPIRY_RESET_SECONDS`,
    /// exactly once (spec §4.4: Stale -> Fresh transition happens at
    /// most once per record; re-staling afterwards is permitted but
    /// is not reset again).
    pub fn reset_expiry(&mut self, now: Instant) -> bool {
        if self.was_expiry_reset {
            return false;
        }
        self.stale_reset_deadline = Some(now + Duration::from_secs(STALE_EXPIRY_RESET_SECONDS));
        self.was_expiry_reset = true;
        true
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner
            && self.rtype == other.rtype
            && self.rclass == other.rclass
            && self.rdata == other.rdata
    }
}

/// Clamp an incoming TTL to `[MIN_TTL, MAX_TTL]` (Invariant 5).
pub fn clamp_ttl(ttl: u32) -> u32 {
    ttl.clamp(MINIMUM_RECORD_TTL, MAXIMUM_RECORD_TTL)
}
