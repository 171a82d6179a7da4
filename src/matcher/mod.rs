//! Search conditions for OpenSSH public keys.
//!
//! A candidate is the standard base64 encoding of the public key blob, the
//! same text that appears in the middle of a `.pub` file.

mod condition;

pub use condition::SearchCondition;
