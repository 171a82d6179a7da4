//! Parsing of unencrypted OpenSSH ed25519 private keys.

use std::io::{self, Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};

use super::openssh::{padding_len, public_key_blob, AUTH_MAGIC, BLOCK_SIZE, KEY_TYPE, NONE, PEM_TAG};
use super::KeyPair;

/// Error while reading a private key file.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("not PEM: {0}")]
    Pem(#[from] pem::PemError),
    #[error("unexpected PEM label {0:?}")]
    Label(String),
    #[error("missing openssh-key-v1 magic")]
    Magic,
    #[error("unsupported {field} {value:?}")]
    Unsupported { field: &'static str, value: String },
    #[error("expected exactly one key, found {0}")]
    KeyCount(u32),
    #[error("{field} has length {len}, expected {expected}")]
    Length { field: &'static str, len: usize, expected: usize },
    #[error("check values differ")]
    Check,
    #[error("private record is not padded correctly")]
    Padding,
    #[error("public key list does not match private record")]
    PublicKeyMismatch,
    #[error("comment is not UTF-8")]
    Comment,
    #[error("truncated key data")]
    Truncated(#[from] io::Error),
}

/// Key material recovered from a private key payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKey {
    pub public_key: [u8; 32],
    pub private_key: [u8; 64],
    pub comment: String,
    pub check: u32,
}

fn read_string<R: Read>(input: &mut R) -> Result<Vec<u8>, DecodeError> {
    let len = input.read_u32::<BigEndian>()? as usize;
    let mut bytes = Vec::new();
    input.by_ref().take(len as u64).read_to_end(&mut bytes)?;
    if bytes.len() != len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    Ok(bytes)
}

fn read_fixed<R: Read, const N: usize>(input: &mut R, field: &'static str) -> Result<[u8; N], DecodeError> {
    let bytes = read_string(input)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| DecodeError::Length { field, len, expected: N })
}

fn expect_name<R: Read>(input: &mut R, field: &'static str, expected: &str) -> Result<(), DecodeError> {
    let value = read_string(input)?;
    if value != expected.as_bytes() {
        return Err(DecodeError::Unsupported {
            field,
            value: String::from_utf8_lossy(&value).into_owned(),
        });
    }
    Ok(())
}

impl DecodedKey {
    /// Parses PEM text labelled `OPENSSH PRIVATE KEY`.
    pub fn from_pem(text: &str) -> Result<Self, DecodeError> {
        let pem = pem::parse(text)?;
        if pem.tag() != PEM_TAG {
            return Err(DecodeError::Label(pem.tag().to_string()));
        }
        Self::from_payload(pem.contents())
    }

    /// Parses a raw private key payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut input = Cursor::new(payload);

        let mut magic = [0u8; 15];
        input.read_exact(&mut magic)?;
        if &magic[..14] != AUTH_MAGIC || magic[14] != 0 {
            return Err(DecodeError::Magic);
        }
        expect_name(&mut input, "cipher", NONE)?;
        expect_name(&mut input, "kdf", NONE)?;
        let kdf_options = read_string(&mut input)?;
        if !kdf_options.is_empty() {
            return Err(DecodeError::Length { field: "kdf options", len: kdf_options.len(), expected: 0 });
        }
        let count = input.read_u32::<BigEndian>()?;
        if count != 1 {
            return Err(DecodeError::KeyCount(count));
        }
        let listed_blob = read_string(&mut input)?;
        let record = read_string(&mut input)?;
        if record.len() % BLOCK_SIZE != 0 {
            return Err(DecodeError::Padding);
        }

        let mut record = Cursor::new(record.as_slice());
        let check = record.read_u32::<BigEndian>()?;
        if record.read_u32::<BigEndian>()? != check {
            return Err(DecodeError::Check);
        }
        expect_name(&mut record, "key type", KEY_TYPE)?;
        let public_key = read_fixed::<_, 32>(&mut record, "public key")?;
        let private_key = read_fixed::<_, 64>(&mut record, "private key")?;
        let comment = String::from_utf8(read_string(&mut record)?).map_err(|_| DecodeError::Comment)?;

        let consumed = record.position() as usize;
        let padding = &record.get_ref()[consumed..];
        if padding.len() != padding_len(consumed)
            || !padding.iter().enumerate().all(|(i, &b)| b as usize == i + 1)
        {
            return Err(DecodeError::Padding);
        }
        if listed_blob != public_key_blob(&public_key) {
            return Err(DecodeError::PublicKeyMismatch);
        }

        Ok(Self {
            public_key,
            private_key,
            comment,
            check,
        })
    }

    /// Rebuilds the keypair, checking that the stored public key belongs to the seed.
    pub fn to_keypair(&self) -> Result<KeyPair, DecodeError> {
        KeyPair::from_private_key(&self.private_key)
            .filter(|keypair| keypair.public_key() == self.public_key)
            .ok_or(DecodeError::PublicKeyMismatch)
    }
}
