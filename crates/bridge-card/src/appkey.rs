//! AppKey persistence: small opaque blobs keyed by a 4-byte identifier.
//!
//! Request layout in the command buffer:
//!
//! ```text
//! read:  id[0..4]
//! write: id[0..4] | len_lo | len_hi | payload[len]
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::buffer::CommandBuffer;
use crate::error::StoreError;

/// Offset of the little-endian payload length in a write request.
const WRITE_LEN_OFFSET: usize = 4;
/// Offset of the payload in a write request.
const WRITE_PAYLOAD_OFFSET: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppKeyId(pub [u8; 4]);

impl AppKeyId {
    /// Take the id from the first four bytes of buffer storage.
    ///
    /// Storage past the filled length is always zero, so a short request still yields a
    /// well-defined id.
    pub fn from_buffer(buf: &CommandBuffer) -> Self {
        let s = buf.storage();
        Self([s[0], s[1], s[2], s[3]])
    }

    /// Eight uppercase hex digits, one pair per id byte.
    pub fn storage_key(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl fmt::Display for AppKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// Backing store for AppKey blobs.
///
/// `get` distinguishes a missing blob (`Ok(None)`) from an empty one, even though the register
/// protocol cannot.
pub trait AppKeyStore {
    fn get(&mut self, id: AppKeyId) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store `value` under `id`, fully replacing any previous blob.
    fn put(&mut self, id: AppKeyId, value: &[u8]) -> Result<(), StoreError>;
}

/// One file per blob, named `ak_<storage key>.txt`, under a root directory.
#[derive(Debug, Clone)]
pub struct FsAppKeyStore {
    root: PathBuf,
}

impl FsAppKeyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: AppKeyId) -> PathBuf {
        self.root.join(format!("ak_{}.txt", id.storage_key()))
    }
}

impl AppKeyStore for FsAppKeyStore {
    fn get(&mut self, id: AppKeyId) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.path_for(id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn put(&mut self, id: AppKeyId, value: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(id);
        // Write a sibling then rename so readers never see a partially written blob.
        let tmp = path.with_extension("txt.tmp");
        fs::write(&tmp, value)?;
        if let Err(err) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }
}

/// In-memory store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryAppKeyStore {
    blobs: Rc<RefCell<HashMap<AppKeyId, Vec<u8>>>>,
    offline: Rc<Cell<bool>>,
}

impl MemoryAppKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blob(&self, id: AppKeyId) -> Option<Vec<u8>> {
        self.blobs.borrow().get(&id).cloned()
    }

    pub fn insert(&self, id: AppKeyId, value: impl Into<Vec<u8>>) {
        self.blobs.borrow_mut().insert(id, value.into());
    }

    pub fn len(&self) -> usize {
        self.blobs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.borrow().is_empty()
    }

    /// Make every subsequent operation fail with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.get() {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

impl AppKeyStore for MemoryAppKeyStore {
    fn get(&mut self, id: AppKeyId) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_online()?;
        Ok(self.blob(id))
    }

    fn put(&mut self, id: AppKeyId, value: &[u8]) -> Result<(), StoreError> {
        self.check_online()?;
        self.insert(id, value);
        Ok(())
    }
}

/// Handle `READ_APPKEY`: replace the buffer with the blob stored under the request's id.
///
/// Missing blobs and store failures both leave the buffer empty.
pub fn read_app_key(store: &mut dyn AppKeyStore, buf: &mut CommandBuffer) {
    let id = AppKeyId::from_buffer(buf);
    buf.reset();

    match store.get(id) {
        Ok(Some(blob)) => {
            let kept = buf.fill(&blob);
            if kept < blob.len() {
                tracing::debug!(key = %id, len = blob.len(), kept, "appkey truncated to buffer");
            }
            tracing::debug!(key = %id, len = kept, "appkey read");
        }
        Ok(None) => tracing::debug!(key = %id, "appkey not found"),
        Err(err) => tracing::warn!(key = %id, error = %err, "appkey read failed"),
    }
}

/// Handle `WRITE_APPKEY`: persist the request payload under the request's id.
///
/// A declared length running past the filled part of the buffer is truncated to the bytes
/// actually present. The buffer itself is left as is.
pub fn write_app_key(store: &mut dyn AppKeyStore, buf: &CommandBuffer) {
    let id = AppKeyId::from_buffer(buf);
    let storage = buf.storage();
    let declared = usize::from(u16::from_le_bytes([
        storage[WRITE_LEN_OFFSET],
        storage[WRITE_LEN_OFFSET + 1],
    ]));

    let available = buf.as_slice().get(WRITE_PAYLOAD_OFFSET..).unwrap_or(&[]);
    let payload = &available[..declared.min(available.len())];
    if payload.len() < declared {
        tracing::debug!(
            key = %id,
            declared,
            available = payload.len(),
            "appkey write payload truncated"
        );
    }

    match store.put(id, payload) {
        Ok(()) => tracing::debug!(key = %id, len = payload.len(), "appkey written"),
        Err(err) => tracing::warn!(key = %id, error = %err, "appkey write failed"),
    }
}
