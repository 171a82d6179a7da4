//! Regular expression matching against candidate public keys.

use std::fmt;

use regex::Regex;

use crate::crypto::openssh::public_key_base64;

/// A compiled search condition, shared read-only between workers.
#[derive(Debug, Clone)]
pub struct SearchCondition {
    regex: Regex,
}

impl SearchCondition {
    /// Compiles a search condition.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// Returns the source pattern.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Encodes a public key into the string the condition is tested against.
    #[inline]
    pub fn candidate(public_key: &[u8; 32]) -> String {
        public_key_base64(public_key)
    }

    /// Tests a public key, returning its candidate string on a match.
    #[inline]
    pub fn test(&self, public_key: &[u8; 32]) -> Option<String> {
        let candidate = Self::candidate(public_key);
        self.regex.is_match(&candidate).then_some(candidate)
    }
}

impl fmt::Display for SearchCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
