//! On-disk snapshot codec (spec §6): `"CZ"` magic, a version byte, then
//! zone records until EOF. Each zone writes its own entry sets in an
//! internal binary form; nothing here is DNS wire format, it only has
//! to round-trip what this cache itself produced.

use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::constants::{SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
use crate::error::{CacheError, Result};
use crate::name::OwnerName;
use crate::record::envelope::{CacheRecordInfo, DnssecStatus, Record};
use crate::record::rdata::RecordData;
use crate::record::rtype::{RecordClass, RecordType};
use crate::record::special::{SpecialCacheKind, SpecialCacheRecordData};
use crate::scope::{EcsScope, ScopeKey};
use crate::tree::CacheTree;
use crate::zone::CacheZone;

fn write_u8(w: &mut impl Write, v: u8) -> Result<()> {
    Ok(w.write_all(&[v])?)
}

fn write_u16(w: &mut impl Write, v: u16) -> Result<()> {
    Ok(w.write_all(&v.to_be_bytes())?)
}

fn write_u32(w: &mut impl Write, v: u32) -> Result<()> {
    Ok(w.write_all(&v.to_be_bytes())?)
}

fn write_bytes(w: &mut impl Write, data: &[u8]) -> Result<()> {
    write_u32(w, data.len() as u32)?;
    Ok(w.write_all(data)?)
}

fn write_str(w: &mut impl Write, s: &str) -> Result<()> {
    write_bytes(w, s.as_bytes())
}

fn write_name(w: &mut impl Write, name: &OwnerName) -> Result<()> {
    write_str(w, name.as_str())
}

fn read_u8(r: &mut impl Read) -> Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u16(r: &mut impl Read) -> Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

fn read_u32(r: &mut impl Read) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_bytes(r: &mut impl Read) -> Result<Vec<u8>> {
    let len = read_u32(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_str(r: &mut impl Read) -> Result<String> {
    String::from_utf8(read_bytes(r)?).map_err(|e| CacheError::corrupt(e.to_string()))
}

fn read_name(r: &mut impl Read) -> Result<OwnerName> {
    Ok(OwnerName::from(read_str(r)?))
}

fn write_dnssec_status(w: &mut impl Write, status: DnssecStatus) -> Result<()> {
    write_u8(
        w,
        match status {
            DnssecStatus::Unknown => 0,
            DnssecStatus::Disabled => 1,
            DnssecStatus::Insecure => 2,
            DnssecStatus::Secure => 3,
            DnssecStatus::Bogus => 4,
        },
    )
}

fn read_dnssec_status(r: &mut impl Read) -> Result<DnssecStatus> {
    Ok(match read_u8(r)? {
        0 => DnssecStatus::Unknown,
        1 => DnssecStatus::Disabled,
        2 => DnssecStatus::Insecure,
        3 => DnssecStatus::Secure,
        4 => DnssecStatus::Bogus,
        other => return Err(CacheError::corrupt(format!("unknown dnssec status tag {other}"))),
    })
}

fn write_rdata(w: &mut impl Write, rdata: &RecordData) -> Result<()> {
    match rdata {
        RecordData::A(addr) => {
            write_u8(w, 1)?;
            w.write_all(&addr.octets())?;
        }
        RecordData::Aaaa(addr) => {
            write_u8(w, 2)?;
            w.write_all(&addr.octets())?;
        }
        RecordData::Ns(target) => {
            write_u8(w, 3)?;
            write_name(w, target)?;
        }
        RecordData::Cname(target) => {
            write_u8(w, 4)?;
            write_name(w, target)?;
        }
        RecordData::Dname(target) => {
            write_u8(w, 5)?;
            write_name(w, target)?;
        }
        RecordData::Soa {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        } => {
            write_u8(w, 6)?;
            write_name(w, mname)?;
            write_name(w, rname)?;
            write_u32(w, *serial)?;
            write_u32(w, *refresh)?;
            write_u32(w, *retry)?;
            write_u32(w, *expire)?;
            write_u32(w, *minimum)?;
        }
        RecordData::Mx { preference, exchange } => {
            write_u8(w, 7)?;
            write_u16(w, *preference)?;
            write_name(w, exchange)?;
        }
        RecordData::Srv {
            priority,
            weight,
            port,
            target,
        } => {
            write_u8(w, 8)?;
            write_u16(w, *priority)?;
            write_u16(w, *weight)?;
            write_u16(w, *port)?;
            write_name(w, target)?;
        }
        RecordData::Txt(chunks) => {
            write_u8(w, 9)?;
            write_u32(w, chunks.len() as u32)?;
            for chunk in chunks {
                write_bytes(w, chunk)?;
            }
        }
        RecordData::Svcb { priority, target, params } => {
            write_u8(w, 10)?;
            write_svcb_params(w, *priority, target, params)?;
        }
        RecordData::Https { priority, target, params } => {
            write_u8(w, 11)?;
            write_svcb_params(w, *priority, target, params)?;
        }
        RecordData::Ds {
            key_tag,
            algorithm,
            digest_type,
            digest,
        } => {
            write_u8(w, 12)?;
            write_u16(w, *key_tag)?;
            write_u8(w, *algorithm)?;
            write_u8(w, *digest_type)?;
            write_bytes(w, digest)?;
        }
        RecordData::Rrsig {
            type_covered,
            algorithm,
            labels,
            original_ttl,
            signature_expiration,
            signature_inception,
            key_tag,
            signer_name,
            signature,
        } => {
            write_u8(w, 13)?;
            write_u16(w, *type_covered)?;
            write_u8(w, *algorithm)?;
            write_u8(w, *labels)?;
            write_u32(w, *original_ttl)?;
            write_u32(w, *signature_expiration)?;
            write_u32(w, *signature_inception)?;
            write_u16(w, *key_tag)?;
            write_name(w, signer_name)?;
            write_bytes(w, signature)?;
        }
        RecordData::Nsec { next_domain, type_bitmap } => {
            write_u8(w, 14)?;
            write_name(w, next_domain)?;
            write_bytes(w, type_bitmap)?;
        }
        RecordData::Nsec3 {
            hash_algorithm,
            flags,
            iterations,
            salt,
            next_hashed_owner,
            type_bitmap,
        } => {
            write_u8(w, 15)?;
            write_u8(w, *hash_algorithm)?;
            write_u8(w, *flags)?;
            write_u16(w, *iterations)?;
            write_bytes(w, salt)?;
            write_bytes(w, next_hashed_owner)?;
            write_bytes(w, type_bitmap)?;
        }
        RecordData::Special(special) => {
            write_u8(w, 16)?;
            write_special(w, special)?;
        }
        RecordData::Raw(data) => {
            write_u8(w, 17)?;
            write_bytes(w, data)?;
        }
    }
    Ok(())
}

fn write_svcb_params(w: &mut impl Write, priority: u16, target: &OwnerName, params: &[(u16, Vec<u8>)]) -> Result<()> {
    write_u16(w, priority)?;
    write_name(w, target)?;
    write_u32(w, params.len() as u32)?;
    for (key, value) in params {
        write_u16(w, *key)?;
        write_bytes(w, value)?;
    }
    Ok(())
}

fn read_svcb_params(r: &mut impl Read) -> Result<(u16, OwnerName, Vec<(u16, Vec<u8>)>)> {
    let priority = read_u16(r)?;
    let target = read_name(r)?;
    let count = read_u32(r)? as usize;
    let mut params = Vec::with_capacity(count);
    for _ in 0..count {
        let key = read_u16(r)?;
        let value = read_bytes(r)?;
        params.push((key, value));
    }
    Ok((priority, target, params))
}

fn read_rdata(r: &mut impl Read) -> Result<RecordData> {
    Ok(match read_u8(r)? {
        1 => {
            let mut buf = [0u8; 4];
            r.read_exact(&mut buf)?;
            RecordData::A(Ipv4Addr::from(buf))
        }
        2 => {
            let mut buf = [0u8; 16];
            r.read_exact(&mut buf)?;
            RecordData::Aaaa(Ipv6Addr::from(buf))
        }
        3 => RecordData::Ns(read_name(r)?),
        4 => RecordData::Cname(read_name(r)?),
        5 => RecordData::Dname(read_name(r)?),
        6 => RecordData::Soa {
            mname: read_name(r)?,
            rname: read_name(r)?,
            serial: read_u32(r)?,
            refresh: read_u32(r)?,
            retry: read_u32(r)?,
            expire: read_u32(r)?,
            minimum: read_u32(r)?,
        },
        7 => RecordData::Mx {
            preference: read_u16(r)?,
            exchange: read_name(r)?,
        },
        8 => RecordData::Srv {
            priority: read_u16(r)?,
            weight: read_u16(r)?,
            port: read_u16(r)?,
            target: read_name(r)?,
        },
        9 => {
            let count = read_u32(r)? as usize;
            let mut chunks = Vec::with_capacity(count);
            for _ in 0..count {
                chunks.push(read_bytes(r)?);
            }
            RecordData::Txt(chunks)
        }
        10 => {
            let (priority, target, params) = read_svcb_params(r)?;
            RecordData::Svcb { priority, target, params }
        }
        11 => {
            let (priority, target, params) = read_svcb_params(r)?;
            RecordData::Https { priority, target, params }
        }
        12 => RecordData::Ds {
            key_tag: read_u16(r)?,
            algorithm: read_u8(r)?,
            digest_type: read_u8(r)?,
            digest: read_bytes(r)?,
        },
        13 => RecordData::Rrsig {
            type_covered: read_u16(r)?,
            algorithm: read_u8(r)?,
            labels: read_u8(r)?,
            original_ttl: read_u32(r)?,
            signature_expiration: read_u32(r)?,
            signature_inception: read_u32(r)?,
            key_tag: read_u16(r)?,
            signer_name: read_name(r)?,
            signature: read_bytes(r)?,
        },
        14 => RecordData::Nsec {
            next_domain: read_name(r)?,
            type_bitmap: read_bytes(r)?,
        },
        15 => RecordData::Nsec3 {
            hash_algorithm: read_u8(r)?,
            flags: read_u8(r)?,
            iterations: read_u16(r)?,
            salt: read_bytes(r)?,
            next_hashed_owner: read_bytes(r)?,
            type_bitmap: read_bytes(r)?,
        },
        16 => RecordData::Special(read_special(r)?),
        17 => RecordData::Raw(read_bytes(r)?),
        other => return Err(CacheError::corrupt(format!("unknown rdata tag {other}"))),
    })
}

fn write_special(w: &mut impl Write, special: &SpecialCacheRecordData) -> Result<()> {
    write_u8(
        w,
        match special.kind {
            SpecialCacheKind::NegativeCache => 0,
            SpecialCacheKind::FailureCache => 1,
            SpecialCacheKind::BlockedCache => 2,
        },
    )?;
    write_u16(w, special.rcode)?;
    write_u16(w, special.original_rcode)?;
    write_record_list(w, &special.original_answer)?;
    write_record_list(w, &special.original_authority)?;
    write_record_list(w, &special.original_additional)?;
    write_record_list(w, &special.no_dnssec_authority)?;
    // EDNS options attached to a sentinel are query-assembly hints, not
    // cache content; they are not round-tripped through the snapshot.
    Ok(())
}

fn read_special(r: &mut impl Read) -> Result<SpecialCacheRecordData> {
    let kind = match read_u8(r)? {
        0 => SpecialCacheKind::NegativeCache,
        1 => SpecialCacheKind::FailureCache,
        2 => SpecialCacheKind::BlockedCache,
        other => return Err(CacheError::corrupt(format!("unknown special-cache kind {other}"))),
    };
    let rcode = read_u16(r)?;
    let original_rcode = read_u16(r)?;
    let mut special = SpecialCacheRecordData::new(kind, rcode, original_rcode);
    special.original_answer = read_record_list(r)?;
    special.original_authority = read_record_list(r)?;
    special.original_additional = read_record_list(r)?;
    special.no_dnssec_authority = read_record_list(r)?;
    Ok(special)
}

fn write_scope_key(w: &mut impl Write, scope_key: ScopeKey) -> Result<()> {
    match scope_key {
        ScopeKey::Global => write_u8(w, 0),
        ScopeKey::Scoped { scope, conditional_forwarding } => {
            write_u8(w, 1)?;
            match scope.address {
                IpAddr::V4(addr) => {
                    write_u8(w, 4)?;
                    w.write_all(&addr.octets())?;
                }
                IpAddr::V6(addr) => {
                    write_u8(w, 6)?;
                    w.write_all(&addr.octets())?;
                }
            }
            write_u8(w, scope.prefix_len)?;
            write_u8(w, conditional_forwarding as u8)
        }
    }
}

fn read_scope_key(r: &mut impl Read) -> Result<ScopeKey> {
    match read_u8(r)? {
        0 => Ok(ScopeKey::Global),
        1 => {
            let address = match read_u8(r)? {
                4 => {
                    let mut buf = [0u8; 4];
                    r.read_exact(&mut buf)?;
                    IpAddr::V4(Ipv4Addr::from(buf))
                }
                6 => {
                    let mut buf = [0u8; 16];
                    r.read_exact(&mut buf)?;
                    IpAddr::V6(Ipv6Addr::from(buf))
                }
                other => return Err(CacheError::corrupt(format!("unknown address family {other}"))),
            };
            let prefix_len = read_u8(r)?;
            let conditional_forwarding = read_u8(r)? != 0;
            Ok(ScopeKey::Scoped {
                scope: EcsScope::new(address, prefix_len),
                conditional_forwarding,
            })
        }
        other => Err(CacheError::corrupt(format!("unknown scope-key tag {other}"))),
    }
}

fn write_record(w: &mut impl Write, record: &Record, now: Instant, wall_now: SystemTime) -> Result<()> {
    write_name(w, &record.owner)?;
    write_u16(w, record.rtype.to_u16())?;
    write_u16(w, record.rclass.into())?;
    write_u32(w, record.remaining_ttl(now))?;
    write_dnssec_status(w, record.dnssec_status)?;
    let age = wall_now
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    write_u32(w, age as u32)?;
    write_rdata(w, &record.rdata)?;
    write_record_list(w, &record.info.glue)?;
    write_record_list(w, &record.info.rrsigs)?;
    write_record_list(w, &record.info.nsec)?;
    Ok(())
}

fn read_record(r: &mut impl Read) -> Result<Record> {
    let owner = read_name(r)?;
    let rtype = RecordType::from_u16(read_u16(r)?);
    let rclass = RecordClass::from(read_u16(r)?);
    let ttl = read_u32(r)?;
    let dnssec_status = read_dnssec_status(r)?;
    let _snapshot_age_seconds = read_u32(r)?;
    let rdata = read_rdata(r)?;
    let glue = read_record_list(r)?;
    let rrsigs = read_record_list(r)?;
    let nsec = read_record_list(r)?;
    let mut record = Record::new(owner, rtype, rclass, ttl, rdata).with_dnssec_status(dnssec_status);
    record.info = CacheRecordInfo {
        glue,
        rrsigs,
        nsec,
        ecs_scope: None,
        conditional_forwarding: false,
    };
    Ok(record)
}

fn write_record_list(w: &mut impl Write, records: &[Record]) -> Result<()> {
    write_u32(w, records.len() as u32)?;
    let now = Instant::now();
    let wall_now = SystemTime::now();
    for record in records {
        write_record(w, record, now, wall_now)?;
    }
    Ok(())
}

fn read_record_list(r: &mut impl Read) -> Result<Vec<Record>> {
    let count = read_u32(r)? as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(read_record(r)?);
    }
    Ok(out)
}

/// Write one zone's record, skipping it entirely if empty (spec §6:
/// "empty zones are skipped on save").
fn write_zone(w: &mut impl Write, zone: &CacheZone, now: Instant, serve_stale: bool) -> Result<bool> {
    if zone.is_empty(now, serve_stale) {
        return Ok(false);
    }
    write_name(w, &zone.owner)?;
    let mut variant_records = Vec::new();
    zone.for_each_variant(|rtype, variant| {
        variant_records.push((rtype, variant.scope_key, variant.records.clone()));
    });
    write_u32(w, variant_records.len() as u32)?;
    let wall_now = SystemTime::now();
    for (rtype, scope_key, records) in variant_records {
        write_u16(w, rtype.to_u16())?;
        write_scope_key(w, scope_key)?;
        write_u32(w, records.len() as u32)?;
        for record in &records {
            write_record(w, record, now, wall_now)?;
        }
    }
    Ok(true)
}

/// Reads a zone's owner-name length, returning `None` at a clean EOF
/// (the boundary between the last zone and end of file) and `Some` in
/// every other case, including a length read that is then cut short
/// (which surfaces as a corrupt-payload I/O error from the caller).
fn read_zone_name_len_or_eof(r: &mut impl Read) -> Result<Option<u32>> {
    let mut buf = [0u8; 4];
    let n = r.read(&mut buf[..1])?;
    if n == 0 {
        return Ok(None);
    }
    r.read_exact(&mut buf[1..])?;
    Ok(Some(u32::from_be_bytes(buf)))
}

fn read_zone_body(r: &mut impl Read, name_len: u32) -> Result<(OwnerName, Vec<(RecordType, ScopeKey, Vec<Record>)>)> {
    let mut name_buf = vec![0u8; name_len as usize];
    r.read_exact(&mut name_buf)?;
    let owner = OwnerName::from(String::from_utf8(name_buf).map_err(|e| CacheError::corrupt(e.to_string()))?);

    let variant_count = read_u32(r)? as usize;
    let mut variants = Vec::with_capacity(variant_count);
    for _ in 0..variant_count {
        let rtype = RecordType::from_u16(read_u16(r)?);
        let scope_key = read_scope_key(r)?;
        let record_count = read_u32(r)? as usize;
        let mut records = Vec::with_capacity(record_count);
        for _ in 0..record_count {
            records.push(read_record(r)?);
        }
        variants.push((rtype, scope_key, records));
    }
    Ok((owner, variants))
}

/// Serialize the whole tree to `writer` (spec §6). Returns the number
/// of zones actually written (empty zones are skipped).
pub fn save(tree: &CacheTree, writer: &mut impl Write, serve_stale: bool) -> Result<usize> {
    writer.write_all(&SNAPSHOT_MAGIC)?;
    write_u8(writer, SNAPSHOT_VERSION)?;
    let now = Instant::now();
    let mut written = 0;
    for zone in tree.enumerate() {
        if write_zone(writer, &zone, now, serve_stale)? {
            written += 1;
        }
    }
    Ok(written)
}

/// Load zones from `reader` into `tree`, returning the number of
/// scoped variants loaded (used to re-seed `total_entries`, which
/// counts variants, not individual records). A corrupt payload fails
/// without mutating any zone beyond what was already merged.
pub fn load(tree: &CacheTree, reader: &mut impl Read) -> Result<usize> {
    let mut magic = [0u8; 2];
    reader.read_exact(&mut magic)?;
    if magic != SNAPSHOT_MAGIC {
        return Err(CacheError::corrupt("bad magic bytes"));
    }
    let version = read_u8(reader)?;
    if version != SNAPSHOT_VERSION {
        return Err(CacheError::corrupt(format!("unsupported snapshot version {version}")));
    }

    let mut loaded = 0;
    loop {
        let Some(name_len) = read_zone_name_len_or_eof(reader)? else {
            break;
        };
        let (owner, variants) = read_zone_body(reader, name_len)?;
        if variants.is_empty() {
            continue;
        }
        let zone = tree.get_or_add(&owner, || CacheZone::new(owner.clone()));
        for (rtype, scope_key, records) in variants {
            loaded += 1;
            zone.insert_loaded_variant(rtype, scope_key, records);
        }
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::rtype::{RecordClass, RecordType};
    use std::io::Cursor;

    #[test]
    fn round_trips_a_record_through_a_zone() {
        let tree = CacheTree::new();
        let owner = OwnerName::new("example.com");
        let zone = tree.get_or_add(&owner, || CacheZone::new(owner.clone()));
        zone.set_records(
            RecordType::A,
            ScopeKey::Global,
            vec![Record::new(
                owner.clone(),
                RecordType::A,
                RecordClass::IN,
                300,
                RecordData::A(std::net::Ipv4Addr::new(9, 9, 9, 9)),
            )],
        );

        let mut buf = Vec::new();
        let written = save(&tree, &mut buf, false).unwrap();
        assert_eq!(written, 1);

        let restored = CacheTree::new();
        let mut cursor = Cursor::new(buf);
        let loaded = load(&restored, &mut cursor).unwrap();
        assert_eq!(loaded, 1);

        let restored_zone = restored.try_get(&owner).unwrap();
        let records = restored_zone.query_records(RecordType::A, false, false, None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rdata, RecordData::A(std::net::Ipv4Addr::new(9, 9, 9, 9)));
    }

    #[test]
    fn rejects_bad_magic() {
        let tree = CacheTree::new();
        let mut cursor = Cursor::new(vec![0u8, 0u8, 1u8]);
        assert!(load(&tree, &mut cursor).is_err());
    }

    #[test]
    fn empty_zones_are_skipped_on_save() {
        let tree = CacheTree::new();
        let owner = OwnerName::new("empty.test");
        tree.get_or_add(&owner, || CacheZone::new(owner.clone()));
        let mut buf = Vec::new();
        let written = save(&tree, &mut buf, false).unwrap();
        assert_eq!(written, 0);
    }
}
