use crate::error::ExportError;
use crate::service::preview::{InvoicePreview, PdfOptions};
use chrono::{DateTime, Local};
use futures::future::BoxFuture;

/// 发票快照渲染 (返回 PNG data URL)
pub trait SnapshotRenderer: Send + Sync {
    fn render_snapshot<'a>(&'a self, preview: &'a InvoicePreview) -> BoxFuture<'a, Result<String, ExportError>>;
}

/// PDF 导出并触发下载
pub trait PdfExporter: Send + Sync {
    fn export_pdf<'a>(
        &'a self,
        preview: &'a InvoicePreview,
        options: &'a PdfOptions,
    ) -> BoxFuture<'a, Result<(), ExportError>>;
}

/// 时钟 (生成 id / 保存日期)
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// 固定时间, 用于测试
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}
