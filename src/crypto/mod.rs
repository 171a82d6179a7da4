//! Key generation and OpenSSH encoding.
//!
//! This module provides:
//! - CSPRNG-backed ed25519 keypair generation
//! - Byte-exact OpenSSH public and private key encoding
//! - Parsing of the private key files it produces

mod keypair;
pub mod openssh;
mod record;

pub use keypair::KeyPair;
pub use openssh::EncodeError;
pub use record::{DecodeError, DecodedKey};
