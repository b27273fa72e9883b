//! Authenticated encrypted token.
//!
//! A Fernet-style construction without the version and timestamp fields:
//!
//! ```text
//! [IV: 16 bytes] || [AES-256-CBC ciphertext] || [HMAC-SHA256: 32 bytes]
//! ```
//!
//! The 64-byte key splits into `signing_key = key[0..32]` (HMAC) and
//! `encryption_key = key[32..64]` (AES-256-CBC). The HMAC covers
//! `IV || ciphertext` and is verified before any decryption is attempted.

use crate::CryptoError;

/// Size of the non-ciphertext portion of a token: IV(16) + HMAC(32).
pub const TOKEN_OVERHEAD: usize = 48;

/// Authenticated symmetric encryption with a split 64-byte key.
pub struct Token {
    signing_key: [u8; 32],
    encryption_key: [u8; 32],
}

impl Token {
    /// Create a `Token` from a 64-byte key: `signing(32) || encryption(32)`.
    pub fn new(key: &[u8; 64]) -> Self {
        let mut signing_key = [0u8; 32];
        let mut encryption_key = [0u8; 32];
        signing_key.copy_from_slice(&key[..32]);
        encryption_key.copy_from_slice(&key[32..]);
        Self {
            signing_key,
            encryption_key,
        }
    }

    /// Encrypt `plaintext` with a randomly generated IV.
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        use rand::Rng;
        let mut iv = [0u8; 16];
        rand::rngs::OsRng.fill(&mut iv);
        self.encrypt_with_iv(plaintext, &iv)
    }

    /// Encrypt `plaintext` with a caller-supplied IV (deterministic testing).
    pub fn encrypt_with_iv(&self, plaintext: &[u8], iv: &[u8; 16]) -> Vec<u8> {
        let ciphertext = crate::aes_cbc::aes256_cbc_encrypt(&self.encryption_key, iv, plaintext);

        let mut signed_parts = Vec::with_capacity(16 + ciphertext.len());
        signed_parts.extend_from_slice(iv);
        signed_parts.extend_from_slice(&ciphertext);

        let hmac = crate::hmac::hmac_sha256(&self.signing_key, &signed_parts);

        let mut token = signed_parts;
        token.extend_from_slice(&hmac);
        token
    }

    /// Decrypt a token, verifying the HMAC first.
    ///
    /// # Errors
    ///
    /// `CryptoError::InvalidLength` if the token is shorter than the fixed
    /// overhead, `CryptoError::InvalidHmac` on authentication failure, or a
    /// decryption/padding error from the AES-CBC layer.
    pub fn decrypt(&self, token_data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if token_data.len() < TOKEN_OVERHEAD {
            return Err(CryptoError::InvalidLength {
                reason: "token too short: need at least 48 bytes (16 IV + 32 HMAC)",
            });
        }

        let len = token_data.len();
        let signed_parts = &token_data[..len - 32];
        let received_hmac: &[u8; 32] = token_data[len - 32..]
            .try_into()
            .expect("slice is exactly 32 bytes");

        crate::hmac::hmac_sha256_verify(&self.signing_key, signed_parts, received_hmac)?;

        let iv: [u8; 16] = signed_parts[..16]
            .try_into()
            .expect("signed_parts is at least 16 bytes");
        let ciphertext = &signed_parts[16..];

        crate::aes_cbc::aes256_cbc_decrypt(&self.encryption_key, &iv, ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_across_sizes() {
        let key = [0x55u8; 64];
        let token = Token::new(&key);

        for size in [0usize, 1, 7, 15, 16, 17, 31, 32, 33, 100, 255, 256] {
            let data: Vec<u8> = (0..size).map(|i| (i & 0xFF) as u8).collect();
            let encrypted = token.encrypt(&data);
            assert!(
                encrypted.len() >= 64,
                "token too short for size {size}: {} bytes",
                encrypted.len()
            );
            let decrypted = token.decrypt(&encrypted).expect("roundtrip decrypt");
            assert_eq!(decrypted, data, "roundtrip mismatch for size {size}");
        }
    }

    #[test]
    fn deterministic_with_fixed_iv() {
        let key = [0x0Fu8; 64];
        let token = Token::new(&key);
        let iv = [0x33u8; 16];
        let a = token.encrypt_with_iv(b"fixed iv payload", &iv);
        let b = token.encrypt_with_iv(b"fixed iv payload", &iv);
        assert_eq!(a, b);
        assert_eq!(&a[..16], &iv);
    }

    #[test]
    fn ciphertext_bit_flip_fails_hmac() {
        let key = [0xCCu8; 64];
        let token = Token::new(&key);
        let encrypted = token.encrypt(b"authenticity test payload");

        // Any bit-flip in the IV or ciphertext portion must trip the HMAC.
        for offset in [0, 8, 16, encrypted.len() - 33] {
            let mut corrupted = encrypted.clone();
            corrupted[offset] ^= 0x01;
            assert_eq!(
                token.decrypt(&corrupted),
                Err(CryptoError::InvalidHmac),
                "flip at offset {offset} should fail HMAC verification"
            );
        }
    }

    #[test]
    fn hmac_bit_flip_fails() {
        let key = [0xCCu8; 64];
        let token = Token::new(&key);
        let encrypted = token.encrypt(b"hmac corruption test");
        let len = encrypted.len();

        for &offset in &[0usize, 15, 31] {
            let mut corrupted = encrypted.clone();
            corrupted[len - 32 + offset] ^= 0x01;
            assert_eq!(token.decrypt(&corrupted), Err(CryptoError::InvalidHmac));
        }
    }

    #[test]
    fn undersized_token_rejected() {
        let token = Token::new(&[0xAAu8; 64]);
        assert!(matches!(
            token.decrypt(&[0u8; 47]),
            Err(CryptoError::InvalidLength { .. })
        ));
    }

    #[test]
    fn valid_hmac_empty_ciphertext_fails_decrypt() {
        // 48-byte token: IV + valid HMAC over the IV, zero ciphertext bytes.
        let key = [0xBBu8; 64];
        let token = Token::new(&key);
        let iv = [0x11u8; 16];
        let hmac = crate::hmac::hmac_sha256(&key[..32], &iv);
        let mut data = Vec::with_capacity(48);
        data.extend_from_slice(&iv);
        data.extend_from_slice(&hmac);
        assert_eq!(token.decrypt(&data), Err(CryptoError::DecryptionFailed));
    }

    #[test]
    fn wrong_key_fails_hmac() {
        let token_a = Token::new(&[0x01u8; 64]);
        let token_b = Token::new(&[0x02u8; 64]);
        let encrypted = token_a.encrypt(b"key isolation");
        assert_eq!(token_b.decrypt(&encrypted), Err(CryptoError::InvalidHmac));
    }
}
