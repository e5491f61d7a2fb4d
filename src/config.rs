use crate::service::PdfOptions;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub export: ExportConfig,
    pub invoice: InvoiceConfig,
    pub pdf: PdfOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 键值存储文件
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// CSV 输出目录
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceConfig {
    pub currency: String,
    pub default_customer_type: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/invoice-store.json"),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("exports"),
        }
    }
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            currency: "EGP".to_string(),
            default_customer_type: "regular".to_string(),
        }
    }
}

impl AppConfig {
    /// 加载顺序: 默认值 -> invoice.toml (可选) -> 环境变量 INVOICE__*
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(File::with_name("invoice").required(false))
    }

    /// 从指定文件加载 (文件不存在时使用默认值)
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::build(File::from(path).required(false))
    }

    fn build<S>(file: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let defaults = Self::default();
        Config::builder()
            .set_default("storage.path", defaults.storage.path.to_string_lossy().to_string())?
            .set_default("export.dir", defaults.export.dir.to_string_lossy().to_string())?
            .set_default("invoice.currency", defaults.invoice.currency)?
            .set_default("invoice.default_customer_type", defaults.invoice.default_customer_type)?
            .add_source(file)
            .add_source(Environment::with_prefix("INVOICE").separator("__"))
            .build()?
            .try_deserialize()
    }
}
