use crate::error::StorageError;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// 本地键值存储 (对应浏览器 localStorage): 整个文档按 key 读写
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// 共享存储句柄
pub type SharedStore = Arc<dyn KeyValueStore>;

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// 单个 JSON 文件存储: `{ key: value, ... }`, 每次写入整体落盘
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// 打开 (或新建) 存储文件
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Storage file {} is malformed, starting empty: {}", path.display(), e);
                    BTreeMap::new()
                }
            }
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            BTreeMap::new()
        };

        tracing::info!("Storage opened at {} ({} keys)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Backend("storage lock poisoned".to_string()))
    }

    /// 先写临时文件再替换, 避免写一半
    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(entries).map_err(|source| StorageError::Encode {
            key: self.path.display().to_string(),
            source,
        })?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        tracing::debug!("Storage flushed to {}", self.path.display());
        Ok(())
    }

    /// 在副本上修改并落盘, 成功后才替换内存中的内容
    fn update(&self, op: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<(), StorageError> {
        let mut entries = self.lock()?;
        let mut next = entries.clone();
        if !op(&mut next) {
            return Ok(());
        }
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value);
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| entries.remove(key).is_some())
    }
}

/// 打开文件存储并包装为共享句柄
pub fn open_file_store(path: impl AsRef<Path>) -> Result<SharedStore, StorageError> {
    Ok(Arc::new(JsonFileStore::open(path)?))
}
