//! Identity and known-destination persistence.
//!
//! The identity file is the raw 64-byte private key,
//! `x25519_priv(32) || ed25519_priv(32)`. Known destinations are a JSON
//! map keyed by the hex destination hash. Writes go through a `.tmp`
//! rename so a crash never leaves a torn file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use rns_core::identity::Identity;
use rns_core::types::DestinationHash;

const IDENTITY_FILE: &str = "identity";
const KNOWN_DESTINATIONS_FILE: &str = "known_destinations.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid identity file: expected 64 bytes, got {0}")]
    InvalidIdentityLength(usize),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("invalid stored field: {0}")]
    InvalidField(&'static str),
}

/// A cached remote destination, learned from validated announces.
#[derive(Debug, Clone)]
pub struct KnownDestination {
    pub public_key: [u8; 64],
    pub last_seen: u64,
    pub app_data: Option<Vec<u8>>,
    pub ratchet: Option<[u8; 32]>,
}

/// On-disk form; fixed-width byte fields travel as hex strings.
#[derive(Debug, Serialize, Deserialize)]
struct StorableDestination {
    public_key: String,
    last_seen: u64,
    app_data: Option<String>,
    ratchet: Option<String>,
}

impl StorableDestination {
    fn from_known(known: &KnownDestination) -> Self {
        Self {
            public_key: hex::encode(known.public_key),
            last_seen: known.last_seen,
            app_data: known.app_data.as_ref().map(hex::encode),
            ratchet: known.ratchet.as_ref().map(hex::encode),
        }
    }

    fn into_known(self) -> Result<KnownDestination, StorageError> {
        let public_key: [u8; 64] = hex::decode(&self.public_key)
            .map_err(|_| StorageError::InvalidField("public_key"))?
            .try_into()
            .map_err(|_| StorageError::InvalidField("public_key"))?;
        let app_data = self
            .app_data
            .map(|d| hex::decode(d).map_err(|_| StorageError::InvalidField("app_data")))
            .transpose()?;
        let ratchet = self
            .ratchet
            .map(|r| {
                hex::decode(r)
                    .map_err(|_| StorageError::InvalidField("ratchet"))
                    .and_then(|b| {
                        <[u8; 32]>::try_from(b.as_slice())
                            .map_err(|_| StorageError::InvalidField("ratchet"))
                    })
            })
            .transpose()?;
        Ok(KnownDestination {
            public_key,
            last_seen: self.last_seen,
            app_data,
            ratchet,
        })
    }
}

/// File-backed node state.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Load the node identity, creating and persisting a fresh one when the
    /// identity file does not exist yet.
    pub async fn load_or_create_identity(&self) -> Result<Identity, StorageError> {
        let path = self.dir.join(IDENTITY_FILE);
        match fs::read(&path).await {
            Ok(bytes) => {
                let raw: [u8; 64] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StorageError::InvalidIdentityLength(bytes.len()))?;
                let identity = Identity::from_private_bytes(&raw);
                debug!(hash = %identity.hash(), "identity loaded");
                Ok(identity)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let identity = Identity::generate();
                let raw = identity
                    .private_key_bytes()
                    .expect("generated identity has private keys");
                write_atomic(&path, &raw).await?;
                info!(hash = %identity.hash(), "new identity created");
                Ok(identity)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the known-destination cache.
    pub async fn save_known_destinations(
        &self,
        known: &HashMap<DestinationHash, KnownDestination>,
    ) -> Result<(), StorageError> {
        let storable: HashMap<String, StorableDestination> = known
            .iter()
            .map(|(hash, dest)| (hash.to_string(), StorableDestination::from_known(dest)))
            .collect();
        let json = serde_json::to_vec_pretty(&storable)
            .map_err(|e| StorageError::Serialize(e.to_string()))?;
        write_atomic(&self.dir.join(KNOWN_DESTINATIONS_FILE), &json).await?;
        debug!(count = known.len(), "known destinations persisted");
        Ok(())
    }

    /// Load the known-destination cache; an absent file is an empty cache.
    pub async fn load_known_destinations(
        &self,
    ) -> Result<HashMap<DestinationHash, KnownDestination>, StorageError> {
        let path = self.dir.join(KNOWN_DESTINATIONS_FILE);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        let storable: HashMap<String, StorableDestination> = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::Deserialize(e.to_string()))?;

        storable
            .into_iter()
            .map(|(hash_hex, dest)| {
                let hash_bytes: [u8; 16] = hex::decode(&hash_hex)
                    .map_err(|_| StorageError::InvalidField("destination hash"))?
                    .try_into()
                    .map_err(|_| StorageError::InvalidField("destination hash"))?;
                Ok((DestinationHash::new(hash_bytes), dest.into_known()?))
            })
            .collect()
    }
}

/// Write via tmp file + rename.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "rns-storage-test-{tag}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn identity_persists_across_loads() {
        let dir = temp_dir("identity");
        let storage = Storage::new(&dir);
        storage.ensure_dir().await.unwrap();

        let first = storage.load_or_create_identity().await.unwrap();
        let second = storage.load_or_create_identity().await.unwrap();
        assert_eq!(first.hash(), second.hash());

        // The identity file is exactly the 64 raw private bytes.
        let raw = std::fs::read(dir.join(IDENTITY_FILE)).unwrap();
        assert_eq!(raw.len(), 64);
        assert_eq!(raw, first.private_key_bytes().unwrap());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn corrupt_identity_file_is_an_error() {
        let dir = temp_dir("corrupt");
        let storage = Storage::new(&dir);
        storage.ensure_dir().await.unwrap();
        std::fs::write(dir.join(IDENTITY_FILE), [0u8; 63]).unwrap();

        assert!(matches!(
            storage.load_or_create_identity().await,
            Err(StorageError::InvalidIdentityLength(63))
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn known_destinations_roundtrip() {
        let dir = temp_dir("known");
        let storage = Storage::new(&dir);
        storage.ensure_dir().await.unwrap();

        let mut known = HashMap::new();
        known.insert(
            DestinationHash::new([0xAB; 16]),
            KnownDestination {
                public_key: [0x11; 64],
                last_seen: 1_700_000_000,
                app_data: Some(b"node-1".to_vec()),
                ratchet: Some([0x22; 32]),
            },
        );
        known.insert(
            DestinationHash::new([0xCD; 16]),
            KnownDestination {
                public_key: [0x33; 64],
                last_seen: 1_700_000_100,
                app_data: None,
                ratchet: None,
            },
        );

        storage.save_known_destinations(&known).await.unwrap();
        let loaded = storage.load_known_destinations().await.unwrap();
        assert_eq!(loaded.len(), 2);

        let entry = &loaded[&DestinationHash::new([0xAB; 16])];
        assert_eq!(entry.public_key, [0x11; 64]);
        assert_eq!(entry.last_seen, 1_700_000_000);
        assert_eq!(entry.app_data.as_deref(), Some(&b"node-1"[..]));
        assert_eq!(entry.ratchet, Some([0x22; 32]));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn missing_cache_is_empty() {
        let dir = temp_dir("missing");
        let storage = Storage::new(&dir);
        storage.ensure_dir().await.unwrap();
        assert!(storage.load_known_destinations().await.unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
