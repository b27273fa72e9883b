//! SHA-256 and SHA-512 hashing.
//!
//! One-shot hash functions plus the 128-bit truncated SHA-256 used for all
//! wire addressing (identity hashes, destination hashes, link ids).

use sha2::{Digest, Sha256, Sha512};

/// Compute the SHA-256 hash of `data`.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute the SHA-512 hash of `data`.
#[must_use]
pub fn sha512(data: &[u8]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// First 16 bytes (128 bits) of SHA-256. This is the address-sized hash used
/// throughout the wire format.
#[must_use]
pub fn truncated_hash(data: &[u8]) -> [u8; 16] {
    let full = sha256(data);
    let mut result = [0u8; 16];
    result.copy_from_slice(&full[..16]);
    result
}

/// A streaming SHA-256 hasher for incrementally fed data.
pub struct Sha256Hasher {
    inner: Sha256,
}

impl Sha256Hasher {
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    /// Feed more data into the hasher.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Consume the hasher and return the final digest.
    #[must_use]
    pub fn finalize(self) -> [u8; 32] {
        self.inner.finalize().into()
    }
}

impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_digests() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn sha512_known_digests() {
        assert_eq!(
            hex::encode(sha512(b"abc")),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
             2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
    }

    #[test]
    fn truncated_hash_is_sha256_prefix() {
        let data = b"truncation test input";
        let full = sha256(data);
        let truncated = truncated_hash(data);
        assert_eq!(truncated.len(), 16);
        assert_eq!(&full[..16], &truncated[..]);
    }

    #[test]
    fn streaming_matches_one_shot() {
        let input = b"streaming hasher input, fed in two pieces";
        let mid = input.len() / 2;
        let mut hasher = Sha256Hasher::new();
        hasher.update(&input[..mid]);
        hasher.update(&input[mid..]);
        assert_eq!(hasher.finalize(), sha256(input));
    }
}
