//! Stable fingerprints and content hashes.
//!
//! These identifiers are for dedup and audit linkage only — never for
//! access control or uniqueness enforcement, which is the store's job
//! via unique constraints.
use dlb_core::Id;
use sha2::Digest;

/// A 16-character lowercase hex tag derived from a truncated SHA-256
/// digest. Not a security primitive: collisions are merely unlikely,
/// not cryptographically infeasible to find deliberately.
pub fn fingerprint(namespace: &str, seed: uuid::Uuid) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(seed.as_bytes());
    let digest = hasher.finalize();
    digest.iter().take(8).map(|b| format!("{:02x}", b)).collect()
}

/// Audit tag for a newly created entity, derived from its own ID.
/// Two entities created with the same `Id` (impossible in practice,
/// since `Id::default()` mints a fresh UUIDv7) would share a tag; the
/// tag is a convenience for log correlation, not a second identifier.
pub fn tag<T>(namespace: &str, id: Id<T>) -> String {
    fingerprint(namespace, id.inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_is_sixteen_hex_chars() {
        let seed = uuid::Uuid::now_v7();
        let t = fingerprint("cell", seed);
        assert_eq!(t.len(), 16);
        assert!(t.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn same_input_is_deterministic() {
        let seed = uuid::Uuid::now_v7();
        assert_eq!(fingerprint("batch", seed), fingerprint("batch", seed));
    }

    #[test]
    fn different_namespace_changes_tag() {
        let seed = uuid::Uuid::now_v7();
        assert_ne!(fingerprint("cell", seed), fingerprint("batch", seed));
    }
}
