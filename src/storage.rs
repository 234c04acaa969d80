//! Key-value persistence collaborator.
//!
//! The engine treats storage as a dumb string-blob store: one JSON document
//! per key, replaced wholesale on write. `FileStore` is the on-device
//! implementation; `MemoryStore` backs tests and the demo binary.

use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::{fs, io};

use anyhow::Context;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}

// --- key layout ---

pub fn score_key(user: &str) -> String {
    format!("score:{user}")
}

pub fn interactions_key(user: &str) -> String {
    format!("interactions:{user}")
}

pub fn chat_key(user: &str) -> String {
    format!("chat:{user}")
}

/// Single global slot shared by all profiles on the device.
pub const RESOURCES_KEY: &str = "resources";

/// Short anonymized form of a storage key for diagnostics. Raw user ids never
/// reach the logs.
pub fn anon_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

// --- file-backed store ---

/// One JSON file per key under a root directory. Writes go through a temp
/// file and rename so a crash never leaves a half-written blob behind.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let _ = fs::create_dir_all(&root); // best-effort
        Self { root }
    }

    /// Keys contain user ids and separators; hash them into portable names.
    fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = hasher.finalize();
        let mut name = String::with_capacity(16);
        for b in digest.iter().take(8) {
            use std::fmt::Write as _;
            let _ = write!(&mut name, "{:02x}", b);
        }
        self.root.join(format!("{name}.json"))
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading key {}", anon_key(key))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        write_atomic(&tmp, &path, value)
            .with_context(|| format!("writing key {}", anon_key(key)))
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing key {}", anon_key(key))),
        }
    }
}

fn write_atomic(tmp: &Path, path: &Path, value: &str) -> io::Result<()> {
    let mut f = fs::File::create(tmp)?;
    f.write_all(value.as_bytes())?;
    fs::rename(tmp, path)?;
    Ok(())
}

// --- in-memory store ---

/// Hash-map store for tests and the demo binary.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        Ok(map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.remove(key);
        Ok(())
    }
}
