//! smsgate Crypto - Request token decryption and replay protection
//!
//! This crate provides:
//! - AES-CFB decryption of base64 command payloads (AES-128/192/256)
//! - The matching client-side sealing operation
//! - An expiring replay cache keyed by decoded payloads

mod cipher;
mod replay;

pub use cipher::*;
pub use replay::*;
