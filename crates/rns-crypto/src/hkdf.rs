//! HKDF-SHA256 key derivation.
//!
//! Implemented directly over [`crate::hmac::hmac_sha256`] rather than the
//! `hkdf` crate so the empty-salt and counter-wrap behavior is explicit:
//!
//! - A `None` or empty salt is replaced by 32 zero bytes.
//! - The expand counter byte is `(i + 1) % 256`.
//! - Extract is `HMAC(salt, ikm)`: the salt keys the HMAC.

use crate::hmac::hmac_sha256;

const HASH_LEN: usize = 32;

/// HKDF-SHA256 extract step: `PRK = HMAC-SHA256(salt, ikm)`.
pub fn hkdf_extract(salt: Option<&[u8]>, ikm: &[u8]) -> [u8; 32] {
    let effective_salt: &[u8] = match salt {
        Some(s) if !s.is_empty() => s,
        _ => &[0u8; HASH_LEN],
    };
    hmac_sha256(effective_salt, ikm)
}

/// HKDF-SHA256 expand step: derive `length` bytes from `prk` and `info`.
pub fn hkdf_expand(prk: &[u8; 32], info: &[u8], length: usize) -> Vec<u8> {
    let num_blocks = length.div_ceil(HASH_LEN);
    let mut derived = Vec::with_capacity(num_blocks * HASH_LEN);
    let mut block: Vec<u8> = Vec::new();

    for i in 0..num_blocks {
        // T(i+1) = HMAC(PRK, T(i) || info || counter_byte)
        let counter = ((i + 1) % 256) as u8;
        let mut input = Vec::with_capacity(block.len() + info.len() + 1);
        input.extend_from_slice(&block);
        input.extend_from_slice(info);
        input.push(counter);

        let output = hmac_sha256(prk, &input);
        block = output.to_vec();
        derived.extend_from_slice(&output);
    }

    derived.truncate(length);
    derived
}

/// All-in-one HKDF-SHA256: extract then expand `length` bytes.
pub fn hkdf(
    length: usize,
    derive_from: &[u8],
    salt: Option<&[u8]>,
    context: Option<&[u8]>,
) -> Vec<u8> {
    let prk = hkdf_extract(salt, derive_from);
    let info = context.unwrap_or(b"");
    hkdf_expand(&prk, info, length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc5869_case_1() {
        let ikm = [0x0bu8; 22];
        let salt: Vec<u8> = (0x00..=0x0c).collect();
        let info: Vec<u8> = (0xf0..=0xf9).collect();

        let prk = hkdf_extract(Some(&salt), &ikm);
        assert_eq!(
            hex::encode(prk),
            "077709362c2e32df0ddc3f0dc47bba6390b6c73bb50f9c3122ec844ad7c2b3e5"
        );

        let okm = hkdf_expand(&prk, &info, 42);
        assert_eq!(
            hex::encode(&okm),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf\
             34007208d5b887185865"
        );

        let all_in_one = hkdf(42, &ikm, Some(&salt), Some(&info));
        assert_eq!(all_in_one, okm);
    }

    #[test]
    fn none_salt_equals_empty_salt() {
        let ikm = b"input keying material";
        let info = b"context";
        let a = hkdf(64, ikm, None, Some(info));
        let b = hkdf(64, ikm, Some(&[]), Some(info));
        assert_eq!(a, b);
    }

    #[test]
    fn counter_wraps_past_256_blocks() {
        // 257 blocks exercises the (i + 1) % 256 wrap.
        let out = hkdf(257 * 32, b"wrap test", None, None);
        assert_eq!(out.len(), 257 * 32);
        assert_eq!(out, hkdf(257 * 32, b"wrap test", None, None));
    }

    #[test]
    fn zero_length_output() {
        assert!(hkdf(0, b"zero", None, None).is_empty());
    }
}
