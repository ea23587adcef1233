//! On-disk cache of precompiled script bytecode
//!
//! Entry layout:
//!
//! | bytes  | content                                  |
//! |--------|------------------------------------------|
//! | 0..4   | magic `JSBC`                             |
//! | 4..8   | format version, u32 little endian        |
//! | 8..40  | SHA-256 of source label, script and mode |
//! | 40..72 | SHA-256 of the bytecode                  |
//! | 72..   | engine bytecode                          |
//!
//! An entry is only reused when its key matches the script being evaluated and
//! the bytecode still hashes to the stored digest. The engine's bytecode reader
//! does not validate its input, so nothing unverified reaches it.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

const MAGIC: &[u8; 4] = b"JSBC";
const FORMAT_VERSION: u32 = 2;
const KEY_LEN: usize = 32;
const KEY_START: usize = MAGIC.len() + 4;
const DIGEST_START: usize = KEY_START + KEY_LEN;
const HEADER_LEN: usize = DIGEST_START + KEY_LEN;

/// Identity of a script as far as the cache is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheKey([u8; KEY_LEN]);

impl CacheKey {
    pub fn new(source: &str, script: &str, strict: bool) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update([0u8]);
        hasher.update(script.as_bytes());
        hasher.update([strict as u8]);
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

/// A single cache file holding bytecode for one script
#[derive(Debug, Clone)]
pub struct BytecodeCache {
    path: PathBuf,
}

impl BytecodeCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached bytecode for `key`
    ///
    /// Returns `Ok(None)` when there is no entry, or the entry is stale or malformed.
    pub fn load(&self, key: &CacheKey) -> io::Result<Option<Vec<u8>>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        if data.len() <= HEADER_LEN || &data[..4] != MAGIC {
            debug!("Ignoring malformed bytecode cache '{}'", self.path.display());
            return Ok(None);
        }

        let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        if version != FORMAT_VERSION {
            debug!("Ignoring bytecode cache '{}' with format version {}", self.path.display(), version);
            return Ok(None);
        }

        if &data[KEY_START..DIGEST_START] != key.as_bytes() {
            debug!("Bytecode cache '{}' is stale", self.path.display());
            return Ok(None);
        }

        let payload = &data[HEADER_LEN..];
        if data[DIGEST_START..HEADER_LEN] != payload_digest(payload) {
            debug!("Bytecode cache '{}' failed its checksum", self.path.display());
            return Ok(None);
        }

        Ok(Some(payload.to_vec()))
    }

    /// Write `bytecode` for `key`, replacing any previous entry
    ///
    /// The entry is written to a sibling temp file and renamed into place.
    pub fn store(&self, key: &CacheKey, bytecode: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut data = Vec::with_capacity(HEADER_LEN + bytecode.len());
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        data.extend_from_slice(key.as_bytes());
        data.extend_from_slice(&payload_digest(bytecode));
        data.extend_from_slice(bytecode);

        let mut tmp_name = self.path.file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        fs::write(&tmp_path, &data)?;
        fs::rename(&tmp_path, &self.path)
    }
}

fn payload_digest(bytecode: &[u8]) -> [u8; KEY_LEN] {
    Sha256::digest(bytecode).into()
}
