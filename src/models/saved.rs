use crate::error::ValidationError;
use crate::models::{amount, LineItem};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// 保存发票所需的归属信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub folder: String,
    pub zone: String,
    pub agent: String,
    pub customer_type: String,
}

impl Assignment {
    pub fn new(
        folder: impl Into<String>,
        zone: impl Into<String>,
        agent: impl Into<String>,
        customer_type: impl Into<String>,
    ) -> Self {
        Self {
            folder: folder.into(),
            zone: zone.into(),
            agent: agent.into(),
            customer_type: customer_type.into(),
        }
    }

    /// 四个字段均须非空, 返回去除空白后的副本
    pub fn validated(&self) -> Result<Assignment, ValidationError> {
        let fields = [
            ("folder", self.folder.trim()),
            ("zone", self.zone.trim()),
            ("agent", self.agent.trim()),
            ("customerType", self.customer_type.trim()),
        ];
        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }
        Ok(Assignment::new(fields[0].1, fields[1].1, fields[2].1, fields[3].1))
    }
}

/// 已保存发票 (持久化键 `savedInvoices` 的元素), 创建后不可修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedInvoice {
    /// 创建时间戳 (毫秒)
    pub id: i64,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub order_number: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default, with = "amount::or_zero")]
    pub delivery_fee: BigDecimal,
    #[serde(default, with = "amount::or_zero")]
    pub total_amount: BigDecimal,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub customer_type: String,
    /// YYYY-MM-DD
    #[serde(default)]
    pub saved_date: String,
    #[serde(default)]
    pub saved_time: String,
    /// 快照图片 data URL
    #[serde(default)]
    pub invoice_image: String,
}

/// 文件夹筛选: 全部 / 指定
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FolderFilter {
    #[default]
    All,
    Named(String),
}

impl From<&str> for FolderFilter {
    fn from(value: &str) -> Self {
        if value.is_empty() || value == "all" {
            FolderFilter::All
        } else {
            FolderFilter::Named(value.to_string())
        }
    }
}

/// 已保存发票的查询条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceFilter {
    pub folder: FolderFilter,
    /// savedDate 前缀, 如 "2026-10" 或 "2026-10-19"
    pub date_prefix: String,
}

impl InvoiceFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn folder(mut self, folder: impl Into<FolderFilter>) -> Self {
        self.folder = folder.into();
        self
    }

    pub fn date_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.date_prefix = prefix.into();
        self
    }

    pub fn matches(&self, invoice: &SavedInvoice) -> bool {
        let date_ok = self.date_prefix.is_empty() || invoice.saved_date.starts_with(&self.date_prefix);
        let folder_ok = match &self.folder {
            FolderFilter::All => true,
            FolderFilter::Named(name) => invoice.folder == *name,
        };
        date_ok && folder_ok
    }
}
