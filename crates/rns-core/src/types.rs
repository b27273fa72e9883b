//! Newtype wrappers for protocol byte-array fields.
//!
//! Distinct types for hashes that share a byte width, so a destination hash
//! cannot be handed to an API expecting a link id.

use core::fmt;

/// Error for fallible slice conversions into fixed-width hash types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLength {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for InvalidLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid length: expected {}, got {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for InvalidLength {}

fn fmt_hex(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for byte in bytes {
        write!(f, "{byte:02x}")?;
    }
    Ok(())
}

macro_rules! hash_newtype {
    ($(#[$doc:meta])* $name:ident, $len:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[must_use]
        pub struct $name(pub(crate) [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = InvalidLength;

            fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
                let arr: [u8; $len] = bytes.try_into().map_err(|_| InvalidLength {
                    expected: $len,
                    actual: bytes.len(),
                })?;
                Ok(Self(arr))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt_hex(&self.0, f)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "("))?;
                fmt_hex(&self.0[..4], f)?;
                write!(f, "..)")
            }
        }
    };
}

hash_newtype!(
    /// A 16-byte truncated hash (first 128 bits of SHA-256), the generic
    /// address-sized hash.
    TruncatedHash,
    16
);

hash_newtype!(
    /// The 16-byte hash of a named endpoint.
    DestinationHash,
    16
);

hash_newtype!(
    /// The 16-byte hash of an identity's combined public key.
    IdentityHash,
    16
);

hash_newtype!(
    /// The 16-byte id of a link, derived from its request packet hash.
    LinkId,
    16
);

hash_newtype!(
    /// A 10-byte name-component hash (first 80 bits of SHA-256).
    NameHash,
    10
);

hash_newtype!(
    /// The full 32-byte SHA-256 hash of a packet's hashable part.
    PacketHash,
    32
);

impl PacketHash {
    /// The 16-byte wire-visible truncation of the packet hash, used as the
    /// dedup key, proof subject, and link-id input.
    pub fn truncated(&self) -> TruncatedHash {
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&self.0[..16]);
        TruncatedHash::new(bytes)
    }
}

impl From<TruncatedHash> for DestinationHash {
    fn from(h: TruncatedHash) -> Self {
        Self(h.0)
    }
}

impl From<DestinationHash> for TruncatedHash {
    fn from(h: DestinationHash) -> Self {
        Self(h.0)
    }
}

impl From<IdentityHash> for TruncatedHash {
    fn from(h: IdentityHash) -> Self {
        Self(h.0)
    }
}
