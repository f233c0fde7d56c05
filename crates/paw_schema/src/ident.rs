//! Name-derived identities.
//!
//! Type identity is derived from the type's **string name** using the FNV-1a
//! 64-bit hash, so the same schema always produces the same keys no matter
//! the order in which files were loaded.

use serde::{Deserialize, Serialize};

/// FNV-1a 64-bit offset basis.
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a 64-bit prime.
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Hash a name with FNV-1a 64-bit.
///
/// ```text
/// hash = 0xcbf29ce484222325
/// for each byte in name.as_bytes():
///     hash = hash XOR byte
///     hash = hash * 0x00000100000001b3
/// ```
#[must_use]
pub const fn fnv1a_64(name: &str) -> u64 {
    let bytes = name.as_bytes();
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Identity of a schema type, the FNV-1a hash of its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeKey(pub u64);

impl TypeKey {
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        Self(fnv1a_64(name))
    }
}

impl std::fmt::Display for TypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_known_vector() {
        // FNV-1a of the empty string is the offset basis itself.
        assert_eq!(fnv1a_64(""), FNV_OFFSET_BASIS);
        assert_eq!(fnv1a_64("a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_type_key_is_stable_and_distinct() {
        assert_eq!(TypeKey::from_name("entity"), TypeKey::from_name("entity"));
        assert_ne!(TypeKey::from_name("entity"), TypeKey::from_name("component"));
    }
}
