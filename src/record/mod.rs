pub mod envelope;
pub mod rdata;
pub mod rtype;
pub mod special;

pub use envelope::{CacheRecordInfo, DnssecStatus, Record};
pub use rdata::RecordData;
pub use rtype::{RecordClass, RecordType};
pub use special::{SpecialCacheKind, SpecialCacheRecordData};
