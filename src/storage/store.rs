use std::{
    collections::HashMap,
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Result};
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

/// Interface for the durable medium user state is kept in. Values are opaque strings.
pub trait KeyValueStore {
    /// Returns `None` if nothing was stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>>;

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<()>>;
}

impl<T: Deref> KeyValueStore for T
where
    T::Target: KeyValueStore,
{
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> {
        self.deref().get(key)
    }

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<()>> {
        self.deref().set(key, value)
    }
}

/// Stores every key as its own json file inside a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    /// Keys may contain user supplied ids, so anything outside a safe charset is replaced.
    fn path_for(&self, key: &str) -> PathBuf {
        let file_name = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect::<String>();
        self.dir.join(format!("{file_name}.json"))
    }

    async fn read(path: &Path) -> Result<String, std::io::Error> {
        let mut file = File::open(path).await?;
        file.lock_shared()?;
        let mut content = String::new();
        let result = file.read_to_string(&mut content).await;
        file.unlock_async().await?;
        result.map(|_| content)
    }

    async fn write(path: &Path, value: &[u8]) -> Result<(), std::io::Error> {
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .await?;

        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = async {
            file.set_len(0).await?;
            file.write_all(value).await?;
            file.flush().await
        }
        .await;
        file.unlock_async().await?;
        result
    }
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        debug!("Reading {path:?}");
        match Self::read(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key);
        debug!("Writing {path:?}");
        Self::write(&path, value.as_bytes()).await?;
        Ok(())
    }
}

/// Volatile store. Useful for hosts that persist elsewhere, and for tests.
#[derive(Default, Clone)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.values
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?
            .insert(key.to_string(), value);
        Ok(())
    }
}
