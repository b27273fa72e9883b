//! Resource control payloads: advertisement and acknowledgement.
//!
//! Both are msgpack maps with single-character keys, sealed into in-link
//! packets by the caller.

use std::io::Cursor;

use rmpv::Value;

use crate::error::ResourceError;

/// Flag bit: payload was bzip2-compressed before segmentation.
pub const FLAG_COMPRESSED: u8 = 0x01;

/// The first message of a resource transfer, describing what is coming.
///
/// Keys: `i` resource id, `d` original data size, `t` transfer size,
/// `n` part count, `h` expected hash, `f` flags.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ResourceAdvertisement {
    pub resource_id: [u8; 16],
    /// Size of the original payload before compression.
    pub data_size: u64,
    /// Size of the byte string actually transferred.
    pub transfer_size: u64,
    pub num_parts: u32,
    /// SHA-256 of the transferred byte string.
    pub expected_hash: [u8; 32],
    pub flags: u8,
}

impl ResourceAdvertisement {
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }

    pub fn to_msgpack(&self) -> Vec<u8> {
        let map = Value::Map(vec![
            (Value::from("i"), Value::Binary(self.resource_id.to_vec())),
            (Value::from("d"), Value::from(self.data_size)),
            (Value::from("t"), Value::from(self.transfer_size)),
            (Value::from("n"), Value::from(u64::from(self.num_parts))),
            (Value::from("h"), Value::Binary(self.expected_hash.to_vec())),
            (Value::from("f"), Value::from(u64::from(self.flags))),
        ]);
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &map).expect("msgpack encoding to Vec never fails");
        buf
    }

    pub fn from_msgpack(data: &[u8]) -> Result<Self, ResourceError> {
        let map = decode_map(data)?;

        Ok(Self {
            resource_id: get_bytes::<16>(&map, "i")?,
            data_size: get_u64(&map, "d")?,
            transfer_size: get_u64(&map, "t")?,
            num_parts: u32::try_from(get_u64(&map, "n")?)
                .map_err(|_| ResourceError::InvalidAdvertisement("part count".into()))?,
            expected_hash: get_bytes::<32>(&map, "h")?,
            flags: get_u64(&map, "f")? as u8,
        })
    }
}

/// Receiver → sender acknowledgement.
///
/// `highest` is the highest part index received (`None` before anything
/// arrived); `missing` lists every unreceived index at or below `highest`.
/// Everything else at or below `highest` has been received.
///
/// Keys: `i` resource id, `x` highest (nil when none), `m` missing list.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct PartAck {
    pub resource_id: [u8; 16],
    pub highest: Option<u32>,
    pub missing: Vec<u32>,
}

impl PartAck {
    pub fn to_msgpack(&self) -> Vec<u8> {
        let highest = match self.highest {
            Some(h) => Value::from(u64::from(h)),
            None => Value::Nil,
        };
        let missing = Value::Array(
            self.missing
                .iter()
                .map(|&m| Value::from(u64::from(m)))
                .collect(),
        );
        let map = Value::Map(vec![
            (Value::from("i"), Value::Binary(self.resource_id.to_vec())),
            (Value::from("x"), highest),
            (Value::from("m"), missing),
        ]);
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &map).expect("msgpack encoding to Vec never fails");
        buf
    }

    pub fn from_msgpack(data: &[u8]) -> Result<Self, ResourceError> {
        let map = decode_map(data)?;

        let highest = match find(&map, "x")? {
            Value::Nil => None,
            other => Some(
                u32::try_from(
                    other
                        .as_u64()
                        .ok_or_else(|| ResourceError::InvalidAck("highest".into()))?,
                )
                .map_err(|_| ResourceError::InvalidAck("highest".into()))?,
            ),
        };

        let missing = match find(&map, "m")? {
            Value::Array(items) => items
                .iter()
                .map(|v| {
                    v.as_u64()
                        .and_then(|u| u32::try_from(u).ok())
                        .ok_or_else(|| ResourceError::InvalidAck("missing index".into()))
                })
                .collect::<Result<Vec<u32>, _>>()?,
            _ => return Err(ResourceError::InvalidAck("missing list".into())),
        };

        let resource_id = match find(&map, "i")? {
            Value::Binary(bytes) => bytes
                .as_slice()
                .try_into()
                .map_err(|_| ResourceError::InvalidAck("resource id".into()))?,
            _ => return Err(ResourceError::InvalidAck("resource id".into())),
        };

        Ok(Self {
            resource_id,
            highest,
            missing,
        })
    }
}

// ------------------------------------------------------------------ //
// msgpack map helpers
// ------------------------------------------------------------------ //

fn decode_map(data: &[u8]) -> Result<Vec<(Value, Value)>, ResourceError> {
    let mut cursor = Cursor::new(data);
    match rmpv::decode::read_value(&mut cursor) {
        Ok(Value::Map(entries)) => Ok(entries),
        Ok(_) => Err(ResourceError::InvalidAdvertisement("not a map".into())),
        Err(e) => Err(ResourceError::InvalidAdvertisement(e.to_string())),
    }
}

fn find<'a>(map: &'a [(Value, Value)], key: &str) -> Result<&'a Value, ResourceError> {
    map.iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
        .ok_or_else(|| ResourceError::InvalidAdvertisement(format!("missing key '{key}'")))
}

fn get_u64(map: &[(Value, Value)], key: &str) -> Result<u64, ResourceError> {
    find(map, key)?
        .as_u64()
        .ok_or_else(|| ResourceError::InvalidAdvertisement(format!("key '{key}' not an integer")))
}

fn get_bytes<const N: usize>(map: &[(Value, Value)], key: &str) -> Result<[u8; N], ResourceError> {
    match find(map, key)? {
        Value::Binary(bytes) => bytes
            .as_slice()
            .try_into()
            .map_err(|_| ResourceError::InvalidAdvertisement(format!("key '{key}' wrong length"))),
        _ => Err(ResourceError::InvalidAdvertisement(format!(
            "key '{key}' not binary"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advertisement_roundtrip() {
        let adv = ResourceAdvertisement {
            resource_id: [0xAB; 16],
            data_size: 1_048_576,
            transfer_size: 524_288,
            num_parts: 1296,
            expected_hash: [0xCD; 32],
            flags: FLAG_COMPRESSED,
        };
        let encoded = adv.to_msgpack();
        let decoded = ResourceAdvertisement::from_msgpack(&encoded).unwrap();
        assert_eq!(decoded, adv);
        assert!(decoded.is_compressed());
    }

    #[test]
    fn advertisement_rejects_garbage() {
        assert!(ResourceAdvertisement::from_msgpack(&[0xFF, 0x00]).is_err());
        assert!(ResourceAdvertisement::from_msgpack(&[]).is_err());
        // An array is valid msgpack but not an advertisement.
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &Value::Array(vec![Value::from(1u64)])).unwrap();
        assert!(ResourceAdvertisement::from_msgpack(&buf).is_err());
    }

    #[test]
    fn ack_roundtrip_with_missing() {
        let ack = PartAck {
            resource_id: [0x11; 16],
            highest: Some(42),
            missing: vec![3, 17, 40],
        };
        let decoded = PartAck::from_msgpack(&ack.to_msgpack()).unwrap();
        assert_eq!(decoded, ack);
    }

    #[test]
    fn ack_roundtrip_empty() {
        let ack = PartAck {
            resource_id: [0x22; 16],
            highest: None,
            missing: Vec::new(),
        };
        let decoded = PartAck::from_msgpack(&ack.to_msgpack()).unwrap();
        assert_eq!(decoded, ack);
    }
}
