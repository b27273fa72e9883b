//! Destination naming and hash derivation.
//!
//! A destination identifies a named endpoint. Its hash is derived from the
//! dotted name ("app_name.aspect1.aspect2") and, for SINGLE destinations,
//! the owning identity's hash:
//!
//! ```text
//! name_hash        = SHA-256(base_name)[:10]
//! destination_hash = SHA-256(name_hash || identity_hash)[:16]
//! ```

use rns_crypto::sha::sha256;

use crate::constants::DestinationType;
use crate::types::{DestinationHash, IdentityHash, NameHash};

/// Compute the 10-byte name hash for a dotted destination name.
pub fn name_hash(app_name: &str, aspects: &[&str]) -> NameHash {
    let base_name = build_base_name(app_name, aspects);
    let hash = sha256(base_name.as_bytes());
    let mut result = [0u8; 10];
    result.copy_from_slice(&hash[..10]);
    NameHash::new(result)
}

/// Compute the destination hash for an identity-bound (SINGLE) destination.
pub fn destination_hash(name_hash: &NameHash, identity_hash: &IdentityHash) -> DestinationHash {
    let mut material = Vec::with_capacity(26);
    material.extend_from_slice(name_hash.as_ref());
    material.extend_from_slice(identity_hash.as_ref());
    let hash = sha256(&material);
    let mut result = [0u8; 16];
    result.copy_from_slice(&hash[..16]);
    DestinationHash::new(result)
}

/// Compute the destination hash for an identity-less (PLAIN or GROUP)
/// destination.
pub fn plain_destination_hash(name_hash: &NameHash) -> DestinationHash {
    let hash = sha256(name_hash.as_ref());
    let mut result = [0u8; 16];
    result.copy_from_slice(&hash[..16]);
    DestinationHash::new(result)
}

/// A named endpoint with its derived hashes.
#[must_use]
pub struct Destination {
    pub identity_hash: Option<IdentityHash>,
    pub app_name: String,
    pub aspects: Vec<String>,
    pub dtype: DestinationType,
    name_hash: NameHash,
    dest_hash: DestinationHash,
}

impl Destination {
    /// Create a SINGLE destination bound to an identity.
    pub fn single(identity_hash: IdentityHash, app_name: &str, aspects: &[&str]) -> Self {
        let nh = name_hash(app_name, aspects);
        let dh = destination_hash(&nh, &identity_hash);
        Destination {
            identity_hash: Some(identity_hash),
            app_name: String::from(app_name),
            aspects: aspects.iter().map(|s| String::from(*s)).collect(),
            dtype: DestinationType::Single,
            name_hash: nh,
            dest_hash: dh,
        }
    }

    /// Create a PLAIN destination (unencrypted, no identity binding).
    pub fn plain(app_name: &str, aspects: &[&str]) -> Self {
        Self::identityless(app_name, aspects, DestinationType::Plain)
    }

    /// Create a GROUP destination. The pre-shared group key lives with the
    /// host, not here; only the addressing is identity-less.
    pub fn group(app_name: &str, aspects: &[&str]) -> Self {
        Self::identityless(app_name, aspects, DestinationType::Group)
    }

    fn identityless(app_name: &str, aspects: &[&str], dtype: DestinationType) -> Self {
        let nh = name_hash(app_name, aspects);
        let dh = plain_destination_hash(&nh);
        Destination {
            identity_hash: None,
            app_name: String::from(app_name),
            aspects: aspects.iter().map(|s| String::from(*s)).collect(),
            dtype,
            name_hash: nh,
            dest_hash: dh,
        }
    }

    pub fn name_hash(&self) -> &NameHash {
        &self.name_hash
    }

    pub fn hash(&self) -> &DestinationHash {
        &self.dest_hash
    }
}

fn build_base_name(app_name: &str, aspects: &[&str]) -> String {
    let mut name = String::from(app_name);
    for aspect in aspects {
        name.push('.');
        name.push_str(aspect);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    #[test]
    fn name_hash_is_dotted_name_digest_prefix() {
        let nh = name_hash("chat", &["alpha"]);
        let expected = sha256(b"chat.alpha");
        assert_eq!(nh.as_ref(), &expected[..10]);
    }

    #[test]
    fn destination_hash_is_deterministic() {
        let identity = Identity::generate();
        let a = Destination::single(*identity.hash(), "chat", &["alpha"]);
        let b = Destination::single(*identity.hash(), "chat", &["alpha"]);
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().as_ref().len(), 16);
    }

    #[test]
    fn aspects_change_the_hash() {
        let identity = Identity::generate();
        let a = Destination::single(*identity.hash(), "chat", &["alpha"]);
        let b = Destination::single(*identity.hash(), "chat", &["beta"]);
        assert_ne!(a.hash(), b.hash());
        assert_ne!(a.name_hash(), b.name_hash());
    }

    #[test]
    fn identities_change_the_hash() {
        let a = Destination::single(*Identity::generate().hash(), "chat", &["alpha"]);
        let b = Destination::single(*Identity::generate().hash(), "chat", &["alpha"]);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn plain_and_group_share_derivation_but_not_type() {
        let p = Destination::plain("broadcast", &["public"]);
        let g = Destination::group("broadcast", &["public"]);
        assert_eq!(p.hash(), g.hash());
        assert_eq!(p.dtype, DestinationType::Plain);
        assert_eq!(g.dtype, DestinationType::Group);
        assert!(p.identity_hash.is_none());
    }

    #[test]
    fn dotted_name_concatenation_is_unambiguous_per_segment() {
        // "a.bc" vs "ab.c" must hash differently because the dot is part of
        // the hashed base name.
        let a = name_hash("a", &["bc"]);
        let b = name_hash("ab", &["c"]);
        assert_ne!(a, b);
    }
}
