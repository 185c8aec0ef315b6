//! Fixed cache timing and bounding constants (spec §6).

/// TTL applied to cached upstream failures when no better signal is available.
pub const FAILURE_RECORD_TTL: u32 = 60;

/// TTL applied to cached negative (NXDOMAIN/NODATA) responses without a usable SOA minimum.
pub const NEGATIVE_RECORD_TTL: u32 = 300;

/// Floor every incoming TTL is clamped to.
pub const MINIMUM_RECORD_TTL: u32 = 10;

/// Ceiling every incoming TTL is clamped to.
pub const MAXIMUM_RECORD_TTL: u32 = 604_800;

/// How far past expiry a record may still be served stale (RFC 8767), in seconds.
pub const SERVE_STALE_TTL: u32 = 259_200;

/// Maximum CNAME (and SVCB/HTTPS alias) hops chased before giving up.
pub const MAX_CNAME_HOPS: usize = 16;

/// One-shot expiry extension applied when a stale record is served.
pub const STALE_EXPIRY_RESET_SECONDS: u64 = 30;

/// Snapshot file magic bytes (`"CZ"`).
pub const SNAPSHOT_MAGIC: [u8; 2] = *b"CZ";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u8 = 1;
