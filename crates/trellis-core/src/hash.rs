//! Deterministic content hashing for cube identity.
//!
//! Cube tables are content-addressed: two identical creation queries -- across
//! clients or across sessions -- hash to the same table name and share the
//! materialization. The hash is the standard FNV-1a 32-bit variant over UTF-8
//! bytes, chosen for stability across runs and platforms; it is an identity
//! for a cache, not an integrity check.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a 32-bit hash of the given bytes.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Content id of a SQL text: FNV-1a 32-bit, lowercase hex, no padding.
pub fn content_id(text: &str) -> String {
    format!("{:x}", fnv1a_32(text.as_bytes()))
}
