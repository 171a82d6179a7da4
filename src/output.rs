//! Key file output.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::crypto::openssh::{encode_private_key, public_key_line};
use crate::crypto::KeyPair;
use crate::error::SearchError;

/// Paths of one written key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFiles {
    pub private_path: PathBuf,
    pub public_path: PathBuf,
}

/// Writes key pairs as `id_ed25519_NN` and `id_ed25519_NN.pub`.
#[derive(Debug, Clone)]
pub struct KeyFileWriter {
    dir: PathBuf,
}

impl KeyFileWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File name of the private key with the given index.
    pub fn basename(index: usize) -> String {
        format!("id_ed25519_{:02}", index)
    }

    /// Encodes and writes one key pair.
    ///
    /// The private key file is only readable by the owner on Unix.
    pub fn write(&self, index: usize, keypair: &KeyPair, comment: &str) -> Result<KeyFiles, SearchError> {
        let private_path = self.dir.join(Self::basename(index));
        let public_path = self.dir.join(format!("{}.pub", Self::basename(index)));

        let private_pem = encode_private_key(keypair, comment)?;
        let public_line = public_key_line(&keypair.public_key(), comment);

        write_file(&private_path, private_pem.as_bytes(), 0o600)?;
        write_file(&public_path, public_line.as_bytes(), 0o644)?;

        Ok(KeyFiles {
            private_path,
            public_path,
        })
    }
}

#[cfg_attr(not(unix), allow(unused_variables))]
fn write_file(path: &Path, contents: &[u8], mode: u32) -> Result<(), SearchError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }

    options
        .open(path)
        .and_then(|mut file| file.write_all(contents))
        .map_err(|source| SearchError::FileSystem {
            path: path.to_path_buf(),
            source,
        })
}
