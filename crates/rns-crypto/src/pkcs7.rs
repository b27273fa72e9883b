//! PKCS#7 padding and unpadding for block ciphers.

use crate::CryptoError;

/// Pad `data` to a multiple of `block_size` using PKCS#7.
///
/// Already-aligned input gets a full block of padding, so there is always at
/// least one byte of padding.
///
/// # Panics
///
/// Panics if `block_size` is 0 or greater than 255.
#[must_use]
pub fn pkcs7_pad(data: &[u8], block_size: usize) -> Vec<u8> {
    assert!(
        (1..=255).contains(&block_size),
        "PKCS7 block_size must be in 1..=255, got {block_size}"
    );

    let pad_len = block_size - (data.len() % block_size);
    let pad_byte = pad_len as u8;

    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    out.resize(data.len() + pad_len, pad_byte);
    out
}

/// Remove PKCS#7 padding, returning a slice of the unpadded content.
///
/// Returns `CryptoError::InvalidPadding` if the data is empty, the indicated
/// padding length is zero or exceeds the data length, or any padding byte
/// does not match.
pub fn pkcs7_unpad(data: &[u8]) -> Result<&[u8], CryptoError> {
    if data.is_empty() {
        return Err(CryptoError::InvalidPadding);
    }

    let pad_byte = data[data.len() - 1];
    let pad_len = pad_byte as usize;

    if pad_len == 0 || pad_len > data.len() {
        return Err(CryptoError::InvalidPadding);
    }

    let content_len = data.len() - pad_len;
    for &b in &data[content_len..] {
        if b != pad_byte {
            return Err(CryptoError::InvalidPadding);
        }
    }

    Ok(&data[..content_len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_roundtrip_all_remainders() {
        for len in 0..=48 {
            let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let padded = pkcs7_pad(&data, 16);
            assert_eq!(padded.len() % 16, 0);
            assert!(padded.len() > data.len());
            let unpadded = pkcs7_unpad(&padded).expect("roundtrip should unpad");
            assert_eq!(unpadded, data.as_slice());
        }
    }

    #[test]
    fn aligned_input_gets_full_block() {
        let data = [0xAAu8; 16];
        let padded = pkcs7_pad(&data, 16);
        assert_eq!(padded.len(), 32);
        assert_eq!(&padded[16..], &[16u8; 16]);
    }

    #[test]
    fn unpad_rejects_empty() {
        assert_eq!(pkcs7_unpad(&[]), Err(CryptoError::InvalidPadding));
    }

    #[test]
    fn unpad_rejects_zero_pad_byte() {
        assert_eq!(
            pkcs7_unpad(&[1, 2, 3, 0]),
            Err(CryptoError::InvalidPadding)
        );
    }

    #[test]
    fn unpad_rejects_overlong_pad() {
        assert_eq!(pkcs7_unpad(&[5, 5, 5]), Err(CryptoError::InvalidPadding));
    }

    #[test]
    fn unpad_rejects_inconsistent_pad_bytes() {
        assert_eq!(
            pkcs7_unpad(&[1, 2, 3, 2, 4, 3, 3]),
            Err(CryptoError::InvalidPadding)
        );
    }
}
