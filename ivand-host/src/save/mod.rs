//! The persisted value.
//!
//! The guest's storage imports address exactly one logical slot: a 4-byte
//! little-endian integer (the high score). Path arguments on the ABI are
//! accepted and ignored, so there is no namespace to manage here.
//!
//! The slot can optionally be backed by a file. Loading happens once at
//! construction; every write rewrites the file best-effort, and I/O failures
//! are logged and otherwise ignored.

use std::fs;
use std::path::PathBuf;

use tracing::warn;

use crate::abi::SAVE_LEN;

/// The single persisted 4-byte slot.
#[derive(Debug)]
pub struct SaveSlot {
    value: u32,
    path: Option<PathBuf>,
}

impl SaveSlot {
    /// A slot with no backing file. Contents are lost when the host exits.
    pub fn in_memory() -> Self {
        Self {
            value: 0,
            path: None,
        }
    }

    /// A slot backed by `path`.
    ///
    /// If the file exists and holds at least 4 bytes, the slot starts with
    /// that value; otherwise it starts at zero.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let value = match fs::read(&path) {
            Ok(bytes) if bytes.len() >= SAVE_LEN => {
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
            }
            Ok(_) => 0,
            Err(_) => 0,
        };
        Self {
            value,
            path: Some(path),
        }
    }

    pub fn get(&self) -> u32 {
        self.value
    }

    /// The slot contents in wire order (little-endian).
    pub fn bytes(&self) -> [u8; SAVE_LEN] {
        self.value.to_le_bytes()
    }

    /// Replace the slot contents and rewrite the backing file, if any.
    pub fn set_bytes(&mut self, bytes: [u8; SAVE_LEN]) {
        self.value = u32::from_le_bytes(bytes);
        self.persist();
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(err) = fs::write(path, self.bytes()) {
            warn!(path = %path.display(), %err, "failed to persist save slot");
        }
    }
}
