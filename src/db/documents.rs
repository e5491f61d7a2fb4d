//! 持久化文档的读写
//!
//! 每个 key 存一个完整 JSON 文档, 外层包一层版本信息:
//! `{"version": 1, "data": ...}`。没有版本包装的旧文档按版本 1 读取;
//! 缺失或格式错误的文档按默认值处理, 不报错。

use crate::db::store::KeyValueStore;
use crate::error::StorageError;
use crate::models::{CustomerTypes, FolderTree, SavedInvoice, ZoneData};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub const FOLDERS_KEY: &str = "invoiceFolders";
pub const CUSTOMER_TYPES_KEY: &str = "customerTypes";
pub const SAVED_INVOICES_KEY: &str = "savedInvoices";
pub const ZONE_DATA_KEY: &str = "zoneData";

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct Envelope<'a, T> {
    version: u32,
    data: &'a T,
}

/// 去掉版本包装, 返回数据部分
fn unwrap_envelope(key: &str, value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("version") && map.contains_key("data") => {
            let version = map.get("version").and_then(Value::as_u64);
            if version != Some(SCHEMA_VERSION as u64) {
                tracing::warn!("Document {} has version {:?}, reading as v{}", key, version, SCHEMA_VERSION);
            }
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// 读取结果: 区分缺失和无法解析
enum Loaded<T> {
    Missing,
    Parsed(T),
    Malformed,
}

fn load_document<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Loaded<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        tracing::debug!("Document {} not found", key);
        return Ok(Loaded::Missing);
    };
    let value = match serde_json::from_str::<Value>(&raw) {
        Ok(value) => unwrap_envelope(key, value),
        Err(e) => {
            tracing::warn!("Document {} is not valid JSON: {}", key, e);
            return Ok(Loaded::Malformed);
        }
    };
    match serde_json::from_value::<T>(value) {
        Ok(doc) => Ok(Loaded::Parsed(doc)),
        Err(e) => {
            tracing::warn!("Document {} is malformed: {}", key, e);
            Ok(Loaded::Malformed)
        }
    }
}

/// 只读场景: 缺失或无法解析时用默认值
fn load_or_default<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> Result<T, StorageError> {
    Ok(match load_document(store, key)? {
        Loaded::Parsed(doc) => doc,
        Loaded::Missing | Loaded::Malformed => T::default(),
    })
}

/// 修改场景: 无法解析的文档不能被覆盖
fn load_for_update<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> Result<T, StorageError> {
    match load_document(store, key)? {
        Loaded::Parsed(doc) => Ok(doc),
        Loaded::Missing => Ok(T::default()),
        Loaded::Malformed => Err(StorageError::Malformed { key: key.to_string() }),
    }
}

fn save_typed<T: Serialize>(store: &dyn KeyValueStore, key: &str, data: &T) -> Result<(), StorageError> {
    let envelope = Envelope {
        version: SCHEMA_VERSION,
        data,
    };
    let raw = serde_json::to_string(&envelope).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    tracing::debug!("Writing document {} ({} bytes)", key, raw.len());
    store.set(key, raw)
}

/// 读取文件夹目录
pub fn load_folders(store: &dyn KeyValueStore) -> Result<FolderTree, StorageError> {
    load_or_default(store, FOLDERS_KEY)
}

pub fn load_folders_for_update(store: &dyn KeyValueStore) -> Result<FolderTree, StorageError> {
    load_for_update(store, FOLDERS_KEY)
}

pub fn save_folders(store: &dyn KeyValueStore, folders: &FolderTree) -> Result<(), StorageError> {
    save_typed(store, FOLDERS_KEY, folders)
}

pub fn load_customer_types(store: &dyn KeyValueStore) -> Result<CustomerTypes, StorageError> {
    load_or_default(store, CUSTOMER_TYPES_KEY)
}

pub fn load_customer_types_for_update(store: &dyn KeyValueStore) -> Result<CustomerTypes, StorageError> {
    load_for_update(store, CUSTOMER_TYPES_KEY)
}

pub fn save_customer_types(store: &dyn KeyValueStore, types: &CustomerTypes) -> Result<(), StorageError> {
    save_typed(store, CUSTOMER_TYPES_KEY, types)
}

/// `savedInvoices` 文档
///
/// 单条记录格式错误时跳过, 但原样保留在 `unreadable` 中,
/// 写回时追加在末尾, 不会因为一次保存/删除而丢失。
#[derive(Debug, Clone, Default)]
pub struct InvoiceDocument {
    pub invoices: Vec<SavedInvoice>,
    unreadable: Vec<Value>,
}

impl InvoiceDocument {
    pub fn unreadable_count(&self) -> usize {
        self.unreadable.len()
    }

    fn is_empty(&self) -> bool {
        self.invoices.is_empty() && self.unreadable.is_empty()
    }
}

fn load_invoice_records(store: &dyn KeyValueStore) -> Result<Loaded<InvoiceDocument>, StorageError> {
    let records = match load_document::<Vec<Value>>(store, SAVED_INVOICES_KEY)? {
        Loaded::Parsed(records) => records,
        Loaded::Missing => return Ok(Loaded::Missing),
        Loaded::Malformed => return Ok(Loaded::Malformed),
    };

    let mut doc = InvoiceDocument::default();
    for record in records {
        match serde_json::from_value::<SavedInvoice>(record.clone()) {
            Ok(invoice) => doc.invoices.push(invoice),
            Err(e) => {
                tracing::warn!("Skipping malformed saved invoice: {}", e);
                doc.unreadable.push(record);
            }
        }
    }
    if !doc.unreadable.is_empty() {
        tracing::warn!(
            "Loaded {}/{} saved invoices",
            doc.invoices.len(),
            doc.invoices.len() + doc.unreadable.len()
        );
    }
    Ok(Loaded::Parsed(doc))
}

/// 读取已保存发票 (只读); 无法解析的记录不返回
pub fn load_saved_invoices(store: &dyn KeyValueStore) -> Result<Vec<SavedInvoice>, StorageError> {
    Ok(match load_invoice_records(store)? {
        Loaded::Parsed(doc) => doc.invoices,
        Loaded::Missing | Loaded::Malformed => Vec::new(),
    })
}

/// 读取发票文档用于修改; 整个文档无法解析时拒绝
pub fn load_invoice_document(store: &dyn KeyValueStore) -> Result<InvoiceDocument, StorageError> {
    match load_invoice_records(store)? {
        Loaded::Parsed(doc) => Ok(doc),
        Loaded::Missing => Ok(InvoiceDocument::default()),
        Loaded::Malformed => Err(StorageError::Malformed {
            key: SAVED_INVOICES_KEY.to_string(),
        }),
    }
}

/// 写回发票文档; 没有任何记录时删除该键
pub fn save_invoice_document(store: &dyn KeyValueStore, doc: &InvoiceDocument) -> Result<(), StorageError> {
    if doc.is_empty() {
        tracing::debug!("Removing empty document {}", SAVED_INVOICES_KEY);
        return store.remove(SAVED_INVOICES_KEY);
    }

    let mut records = Vec::with_capacity(doc.invoices.len() + doc.unreadable.len());
    for invoice in &doc.invoices {
        let record = serde_json::to_value(invoice).map_err(|source| StorageError::Encode {
            key: SAVED_INVOICES_KEY.to_string(),
            source,
        })?;
        records.push(record);
    }
    records.extend(doc.unreadable.iter().cloned());
    save_typed(store, SAVED_INVOICES_KEY, &records)
}

/// 读取旧版区域表; 未保存过 (或无法解析) 时为 None, 由调用方决定默认值
pub fn load_zone_data(store: &dyn KeyValueStore) -> Result<Option<ZoneData>, StorageError> {
    Ok(match load_document(store, ZONE_DATA_KEY)? {
        Loaded::Parsed(zones) => Some(zones),
        Loaded::Missing | Loaded::Malformed => None,
    })
}

pub fn load_zone_data_for_update(store: &dyn KeyValueStore) -> Result<Option<ZoneData>, StorageError> {
    match load_document(store, ZONE_DATA_KEY)? {
        Loaded::Parsed(zones) => Ok(Some(zones)),
        Loaded::Missing => Ok(None),
        Loaded::Malformed => Err(StorageError::Malformed {
            key: ZONE_DATA_KEY.to_string(),
        }),
    }
}

pub fn save_zone_data(store: &dyn KeyValueStore, zones: &ZoneData) -> Result<(), StorageError> {
    save_typed(store, ZONE_DATA_KEY, zones)
}
