//! EDNS Client Subnet scoping (spec §3, §4.2).

use std::net::IpAddr;

/// A single ECS scope: the address/prefix an upstream answer was
/// scoped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EcsScope {
    pub address: IpAddr,
    pub prefix_len: u8,
}

impl EcsScope {
    pub fn new(address: IpAddr, prefix_len: u8) -> Self {
        Self { address, prefix_len }
    }

    /// True iff `addr` falls within this scope's prefix.
    pub fn contains(&self, addr: &IpAddr) -> bool {
        match (self.address, addr) {
            (IpAddr::V4(a), IpAddr::V4(b)) => {
                let mask = prefix_mask_32(self.prefix_len.min(32));
                (u32::from(a) & mask) == (u32::from(*b) & mask)
            }
            (IpAddr::V6(a), IpAddr::V6(b)) => {
                let mask = prefix_mask_128(self.prefix_len.min(128));
                (u128::from(a) & mask) == (u128::from(*b) & mask)
            }
            _ => false,
        }
    }
}

fn prefix_mask_32(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix as u32)
    }
}

fn prefix_mask_128(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - prefix as u32)
    }
}

/// Identifies which scoped variant of an entry set a record belongs
/// to (spec §3: "Scope-key is either 'global' or (ECS address/prefix,
/// conditional-forwarding flag)").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKey {
    Global,
    Scoped {
        scope: EcsScope,
        conditional_forwarding: bool,
    },
}

impl ScopeKey {
    pub fn from_record_info(ecs_scope: Option<EcsScope>, conditional_forwarding: bool) -> Self {
        match ecs_scope {
            Some(scope) => ScopeKey::Scoped {
                scope,
                conditional_forwarding,
            },
            None => ScopeKey::Global,
        }
    }

    pub fn matching_prefix_len(&self, addr: &IpAddr) -> Option<u8> {
        match self {
            ScopeKey::Global => None,
            ScopeKey::Scoped { scope, .. } => {
                if scope.contains(addr) {
                    Some(scope.prefix_len)
                } else {
                    None
                }
            }
        }
    }
}
