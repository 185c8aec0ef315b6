//! Stand-ins for the external collaborators named in spec §6
//! ("Downward collaborators"). The cache only needs the shape of
//! these, not their implementations: the real authoritative zone
//! manager, DNS server config, and logger all live outside this
//! crate's scope.

use std::path::PathBuf;

use crate::name::OwnerName;

/// `auth_zone_manager.parent_zone(name)` (a pure function); the cache
/// never mutates or enumerates authoritative zones through this.
pub trait AuthorityZones: Send + Sync {
    fn parent_zone(&self, name: &OwnerName) -> Option<OwnerName>;
}

/// Default collaborator for callers (and tests) with no authoritative
/// zones configured: every name's parent-zone lookup simply fails,
/// so DS-reparenting for delegation falls through to "no delegation".
#[derive(Default)]
pub struct NoAuthorityZones;

impl AuthorityZones for NoAuthorityZones {
    fn parent_zone(&self, _name: &OwnerName) -> Option<OwnerName> {
        None
    }
}

/// `log_manager.write(message)`: informational only, never on a
/// correctness path. The default simply forwards to `tracing`, which
/// is how every other heimdall subsystem logs.
pub trait CacheLogger: Send + Sync {
    fn write(&self, message: &str);
}

#[derive(Default)]
pub struct TracingLogger;

impl CacheLogger for TracingLogger {
    fn write(&self, message: &str) {
        tracing::info!("{message}");
    }
}

/// `dns_server.{serve_stale, udp_payload_size, config_folder}`.
#[derive(Clone, Debug)]
pub struct DnsServerSettings {
    pub serve_stale: bool,
    pub udp_payload_size: u16,
    pub config_folder: PathBuf,
}

impl Default for DnsServerSettings {
    fn default() -> Self {
        Self {
            serve_stale: true,
            udp_payload_size: 1232,
            config_folder: PathBuf::from("."),
        }
    }
}

impl DnsServerSettings {
    pub fn snapshot_path(&self) -> PathBuf {
        self.config_folder.join("cache.bin")
    }
}
