//! AES-CFB payload decoding
//!
//! Request tokens are `iv || AES-CFB(base64(payload))`. The IV is one cipher
//! block; the key length selects AES-128, AES-192 or AES-256.

use aes::{Aes128, Aes192, Aes256};
use base64::{Engine, engine::general_purpose::STANDARD};
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use rand::RngCore;
use std::fmt;
use thiserror::Error;

/// AES block size, also the IV length
pub const BLOCK_SIZE: usize = 16;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid key length: expected 16, 24 or 32, got {0}")]
    InvalidKeyLength(usize),

    #[error("Ciphertext too short: {0} bytes, need at least {BLOCK_SIZE}")]
    CiphertextTooShort(usize),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Whether `len` is a usable AES key length
pub fn is_valid_key_length(len: usize) -> bool {
    matches!(len, 16 | 24 | 32)
}

/// Turns an inbound request token into the plaintext command payload
#[derive(Clone)]
pub enum PayloadDecoder {
    /// No key configured: the request bytes are the payload
    Insecure,
    /// Shared AES key
    Aes { key: Vec<u8> },
}

impl PayloadDecoder {
    /// Build a decoder from an optional key. An absent or empty key selects
    /// insecure mode.
    pub fn from_key(key: Option<&[u8]>) -> Self {
        match key {
            Some(key) if !key.is_empty() => Self::Aes { key: key.to_vec() },
            _ => Self::Insecure,
        }
    }

    pub fn is_insecure(&self) -> bool {
        matches!(self, Self::Insecure)
    }

    /// Decode a request token
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
        match self {
            Self::Insecure => Ok(data.to_vec()),
            Self::Aes { key } => open(key, data),
        }
    }
}

impl fmt::Debug for PayloadDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insecure => f.write_str("PayloadDecoder::Insecure"),
            Self::Aes { key } => write!(f, "PayloadDecoder::Aes({} byte key)", key.len()),
        }
    }
}

/// Decrypt `iv || ciphertext` and base64-decode the result
pub fn open(key: &[u8], data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if !is_valid_key_length(key.len()) {
        return Err(DecodeError::InvalidKeyLength(key.len()));
    }
    if data.len() < BLOCK_SIZE {
        return Err(DecodeError::CiphertextTooShort(data.len()));
    }

    let (iv, body) = data.split_at(BLOCK_SIZE);
    let mut text = body.to_vec();
    cfb_decrypt(key, iv, &mut text)?;

    Ok(STANDARD.decode(&text)?)
}

/// Client-side inverse of [`open`] with a random IV
pub fn seal(key: &[u8], payload: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut iv = [0u8; BLOCK_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    seal_with_iv(key, &iv, payload)
}

/// Seal with a specific IV
pub fn seal_with_iv(
    key: &[u8],
    iv: &[u8; BLOCK_SIZE],
    payload: &[u8],
) -> Result<Vec<u8>, DecodeError> {
    if !is_valid_key_length(key.len()) {
        return Err(DecodeError::InvalidKeyLength(key.len()));
    }

    let mut text = STANDARD.encode(payload).into_bytes();
    cfb_encrypt(key, iv, &mut text)?;

    let mut result = Vec::with_capacity(BLOCK_SIZE + text.len());
    result.extend_from_slice(iv);
    result.extend_from_slice(&text);
    Ok(result)
}

fn cfb_decrypt(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<(), DecodeError> {
    let bad_key = |_| DecodeError::InvalidKeyLength(key.len());
    match key.len() {
        16 => cfb_mode::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(bad_key)?
            .decrypt(buf),
        24 => cfb_mode::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(bad_key)?
            .decrypt(buf),
        32 => cfb_mode::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(bad_key)?
            .decrypt(buf),
        n => return Err(DecodeError::InvalidKeyLength(n)),
    }
    Ok(())
}

fn cfb_encrypt(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<(), DecodeError> {
    let bad_key = |_| DecodeError::InvalidKeyLength(key.len());
    match key.len() {
        16 => cfb_mode::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(bad_key)?
            .encrypt(buf),
        24 => cfb_mode::Encryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(bad_key)?
            .encrypt(buf),
        32 => cfb_mode::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(bad_key)?
            .encrypt(buf),
        n => return Err(DecodeError::InvalidKeyLength(n)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8; 32] = b"0123456789abcdef0123456789abcdef";
    const PAYLOAD: &[u8] = b"valid=9999999999&sendNumber=555&sendMsg=hello";

    fn unhex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn iv() -> [u8; BLOCK_SIZE] {
        core::array::from_fn(|i| i as u8)
    }

    #[test]
    fn test_known_vector() {
        // AES-256-CFB128 over base64(PAYLOAD), IV = 00 01 .. 0f
        let body = unhex(
            "37309a86f798675d4e68ec78caddd01428487b59c17fad851ae4bbc8ca4855af\
             b54cef6b64c8f06e648ac3e71483fc3cf6edf9233f1015526416c9b6",
        );
        let mut token = iv().to_vec();
        token.extend_from_slice(&body);

        let decoder = PayloadDecoder::from_key(Some(KEY));
        assert_eq!(decoder.decode(&token).unwrap(), PAYLOAD);

        assert_eq!(seal_with_iv(KEY, &iv(), PAYLOAD).unwrap(), token);
    }

    #[test]
    fn test_known_vector_aes128() {
        let key = b"0123456789abcdef";
        let body = unhex(
            "c414df8383e8ef2fb6c1f8dccbf02282b9ee7b292407d7a36020800d6ee36a82\
             5bfcc95a5e780368fc9783911b535deb8afad2ca81a7f24a9adaea52",
        );
        let mut token = iv().to_vec();
        token.extend_from_slice(&body);

        assert_eq!(open(key, &token).unwrap(), PAYLOAD);
    }

    #[test]
    fn test_seal_open() {
        for len in [16, 24, 32] {
            let key = vec![7u8; len];
            let sealed = seal(&key, PAYLOAD).unwrap();
            assert_eq!(open(&key, &sealed).unwrap(), PAYLOAD);
        }
    }

    #[test]
    fn test_decode_is_deterministic() {
        let token = seal(KEY, PAYLOAD).unwrap();
        let decoder = PayloadDecoder::from_key(Some(KEY));
        assert_eq!(decoder.decode(&token).unwrap(), decoder.decode(&token).unwrap());
    }

    #[test]
    fn test_invalid_key_length() {
        let result = open(b"short", &[0u8; 64]);
        assert!(matches!(result, Err(DecodeError::InvalidKeyLength(5))));
    }

    #[test]
    fn test_ciphertext_too_short() {
        let result = open(KEY, &[0u8; BLOCK_SIZE - 1]);
        assert!(matches!(result, Err(DecodeError::CiphertextTooShort(15))));
    }

    #[test]
    fn test_wrong_key_fails_base64() {
        let token = seal(KEY, PAYLOAD).unwrap();
        let other = [1u8; 32];
        // Garbage plaintext is overwhelmingly unlikely to be valid base64
        assert!(matches!(open(&other, &token), Err(DecodeError::Base64(_))));
    }

    #[test]
    fn test_insecure_passthrough() {
        let decoder = PayloadDecoder::from_key(None);
        assert!(decoder.is_insecure());
        assert_eq!(decoder.decode(PAYLOAD).unwrap(), PAYLOAD);

        assert!(PayloadDecoder::from_key(Some(b"")).is_insecure());
    }

    #[test]
    fn test_debug_hides_key() {
        let decoder = PayloadDecoder::from_key(Some(KEY));
        let printed = format!("{:?}", decoder);
        assert!(!printed.contains("0123"));
        assert!(printed.contains("32 byte key"));
    }
}
