//! AES-256-CBC encryption and decryption.
//!
//! PKCS#7 padding is applied/removed via [`crate::pkcs7`]. The IV is passed
//! explicitly and is not prepended to the ciphertext; the token layer owns
//! IV placement.

use aes::Aes256;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Encrypt `plaintext` with AES-256-CBC under `key` and `iv`.
///
/// The plaintext is PKCS#7-padded before encryption.
#[must_use]
pub fn aes256_cbc_encrypt(key: &[u8; 32], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    let padded = crate::pkcs7::pkcs7_pad(plaintext, 16);
    let encryptor = Aes256CbcEnc::new(key.into(), iv.into());

    let mut out = vec![0u8; padded.len()];
    encryptor
        .encrypt_padded_b2b_mut::<NoPadding>(&padded, &mut out)
        .expect("output buffer is block-aligned and same size as padded input");
    out
}

/// Decrypt `ciphertext` with AES-256-CBC under `key` and `iv`, removing the
/// PKCS#7 padding.
///
/// # Errors
///
/// `CryptoError::DecryptionFailed` if the ciphertext is empty or not
/// block-aligned, `CryptoError::InvalidPadding` if the padding is malformed.
pub fn aes256_cbc_decrypt(
    key: &[u8; 32],
    iv: &[u8; 16],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return Err(CryptoError::DecryptionFailed);
    }

    let decryptor = Aes256CbcDec::new(key.into(), iv.into());

    let mut buf = ciphertext.to_vec();
    let decrypted = decryptor
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    let unpadded = crate::pkcs7::pkcs7_unpad(decrypted)?;
    Ok(unpadded.to_vec())
}
