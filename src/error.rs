use thiserror::Error;

/// 统一错误类型
#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T, E = InvoiceError> = std::result::Result<T, E>;

/// 名称所属层级 (用于错误提示)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Folder,
    Zone,
    Agent,
    CustomerType,
    Invoice,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EntryKind::Folder => "folder",
            EntryKind::Zone => "zone",
            EntryKind::Agent => "agent",
            EntryKind::CustomerType => "customer type",
            EntryKind::Invoice => "invoice",
        };
        f.write_str(label)
    }
}

/// 校验错误: 操作中止, 状态不变
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("enter {0} name")]
    EmptyName(EntryKind),

    #[error("{kind} already exists: {name}")]
    DuplicateName { kind: EntryKind, name: String },

    #[error("{kind} name unchanged: {name}")]
    Unchanged { kind: EntryKind, name: String },

    #[error("{kind} not found: {name}")]
    NotFound { kind: EntryKind, name: String },

    #[error("select a folder first")]
    NoFolderSelected,

    #[error("select a zone first")]
    NoZoneSelected,

    /// 保存发票时缺少的字段 (folder / zone / agent / customerType)
    #[error("please select {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

/// 渲染错误 (快照图片 / PDF)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("error capturing invoice snapshot: {0}")]
    Snapshot(String),

    #[error("error downloading PDF: {0}")]
    Pdf(String),

    #[error("error exporting CSV: {0}")]
    Csv(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot encode document {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// 已存储的文档无法解析, 拒绝覆盖
    #[error("document {key} is malformed, refusing to overwrite it")]
    Malformed { key: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}
