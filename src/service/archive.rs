use crate::db::{documents, export_to_csv, write_csv, SharedStore};
use crate::error::{EntryKind, ExportError, InvoiceError, Result, ValidationError};
use crate::models::{Assignment, InvoiceDraft, InvoiceFilter, SavedInvoice};
use crate::service::preview::InvoicePreview;
use crate::service::render::{Clock, SnapshotRenderer, SystemClock};
use crate::service::totals::grand_total;
use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use indexmap::IndexSet;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// 删除结果
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted(SavedInvoice),
    /// 用户取消
    Cancelled,
}

/// 存档统计
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveSummary {
    /// 符合筛选条件的发票数
    pub invoice_count: usize,
    /// 符合筛选条件的金额合计 (全精度)
    pub total_amount: BigDecimal,
    /// 存档中的文件夹数 (不受筛选影响)
    pub folder_count: usize,
}

impl ArchiveSummary {
    /// 两位小数
    pub fn total_display(&self) -> String {
        self.total_amount.round(2).with_scale(2).to_string()
    }
}

/// 已保存发票存档 (只追加, 记录不可修改, 只能删除)
#[derive(Clone)]
pub struct InvoiceArchive {
    store: SharedStore,
    clock: Arc<dyn Clock>,
    currency: String,
}

impl InvoiceArchive {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            currency: "EGP".to_string(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// 保存发票
    ///
    /// 1. 校验 folder/zone/agent/customerType 均非空
    /// 2. 计算总额
    /// 3. 渲染快照 (异步, 失败则不写入)
    /// 4. 重新读取列表, 追加新记录, 整体写回
    ///
    /// 渲染期间不持锁; 并发保存时各自追加。
    pub async fn save(
        &self,
        draft: &InvoiceDraft,
        assignment: &Assignment,
        renderer: &dyn SnapshotRenderer,
    ) -> Result<SavedInvoice> {
        let assignment = match assignment.validated() {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!("Save rejected: {}", e);
                return Err(e.into());
            }
        };

        let total_amount = grand_total(draft);
        let now = self.clock.now();
        let preview = InvoicePreview::build(draft, &assignment, now.date_naive(), &self.currency);

        let invoice_image = match renderer.render_snapshot(&preview).await {
            Ok(image) => image,
            Err(e) => {
                tracing::error!("Snapshot rendering failed for order {}: {}", draft.order_number, e);
                return Err(e.into());
            }
        };

        let mut doc = documents::load_invoice_document(self.store.as_ref())?;
        let mut id = now.timestamp_millis();
        if let Some(max_id) = doc.invoices.iter().map(|i| i.id).max() {
            if id <= max_id {
                id = max_id + 1;
            }
        }

        let record = SavedInvoice {
            id,
            folder: assignment.folder,
            order_number: draft.order_number.clone(),
            customer_name: draft.customer_name.clone(),
            customer_phone: draft.customer_phone.clone(),
            delivery_address: draft.delivery_address.clone(),
            items: draft.items().to_vec(),
            delivery_fee: draft.delivery_fee.clone(),
            total_amount,
            agent: assignment.agent,
            zone: assignment.zone,
            customer_type: assignment.customer_type,
            saved_date: now.with_timezone(&Utc).format("%Y-%m-%d").to_string(),
            saved_time: now.format("%-I:%M:%S %p").to_string(),
            invoice_image,
        };

        doc.invoices.push(record.clone());
        documents::save_invoice_document(self.store.as_ref(), &doc)?;

        tracing::info!(
            "Invoice saved: id={}, folder={}, zone={}, agent={}, total={}",
            record.id, record.folder, record.zone, record.agent, record.total_amount
        );
        Ok(record)
    }

    pub fn list(&self, filter: &InvoiceFilter) -> Result<Vec<SavedInvoice>> {
        let invoices = documents::load_saved_invoices(self.store.as_ref())?;
        Ok(invoices.into_iter().filter(|i| filter.matches(i)).collect())
    }

    pub fn get(&self, id: i64) -> Result<Option<SavedInvoice>> {
        let invoices = documents::load_saved_invoices(self.store.as_ref())?;
        Ok(invoices.into_iter().find(|i| i.id == id))
    }

    /// 存档中出现过的文件夹 (去重保序)
    pub fn folders(&self) -> Result<Vec<String>> {
        let invoices = documents::load_saved_invoices(self.store.as_ref())?;
        let folders: IndexSet<String> = invoices
            .into_iter()
            .map(|i| i.folder)
            .filter(|f| !f.is_empty())
            .collect();
        Ok(folders.into_iter().collect())
    }

    /// 筛选结果的统计: 发票数, 金额合计, 文件夹数
    pub fn summary(&self, filter: &InvoiceFilter) -> Result<ArchiveSummary> {
        let invoices = self.list(filter)?;
        let total_amount = invoices
            .iter()
            .fold(BigDecimal::zero(), |sum, invoice| sum + &invoice.total_amount);
        Ok(ArchiveSummary {
            invoice_count: invoices.len(),
            total_amount,
            folder_count: self.folders()?.len(),
        })
    }

    /// 删除记录 (需用户确认), 其余记录不变
    pub fn delete(&self, id: i64, confirm: impl FnOnce(&SavedInvoice) -> bool) -> Result<DeleteOutcome> {
        let mut doc = documents::load_invoice_document(self.store.as_ref())?;
        let Some(index) = doc.invoices.iter().position(|i| i.id == id) else {
            return Err(ValidationError::NotFound {
                kind: EntryKind::Invoice,
                name: id.to_string(),
            }
            .into());
        };

        if !confirm(&doc.invoices[index]) {
            tracing::info!("Delete of invoice {} cancelled", id);
            return Ok(DeleteOutcome::Cancelled);
        }

        let removed = doc.invoices.remove(index);
        documents::save_invoice_document(self.store.as_ref(), &doc)?;
        tracing::info!("Invoice deleted: id={}, {} remaining", id, doc.invoices.len());
        Ok(DeleteOutcome::Deleted(removed))
    }

    /// 按筛选条件导出 CSV
    pub fn export_csv<W: Write>(&self, filter: &InvoiceFilter, writer: W) -> Result<usize> {
        let invoices = self.list(filter)?;
        write_csv(&invoices, writer).map_err(csv_error)?;
        Ok(invoices.len())
    }

    pub fn export_csv_file(&self, filter: &InvoiceFilter, output_path: &Path) -> Result<usize> {
        let invoices = self.list(filter)?;
        export_to_csv(&invoices, output_path).map_err(csv_error)?;
        Ok(invoices.len())
    }
}

fn csv_error(e: csv::Error) -> InvoiceError {
    tracing::error!("CSV export failed: {}", e);
    ExportError::Csv(e.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{KeyValueStore, MemoryStore};
    use crate::error::StorageError;
    use crate::models::ItemField;
    use crate::service::render::FixedClock;
    use chrono::{Local, TimeZone};
    use std::str::FromStr;
    use futures::future::BoxFuture;
    use futures::FutureExt;

    struct StaticRenderer;

    impl SnapshotRenderer for StaticRenderer {
        fn render_snapshot<'a>(&'a self, preview: &'a InvoicePreview) -> BoxFuture<'a, Result<String, ExportError>> {
            let image = format!("data:image/png;base64,{}", preview.total);
            async move { Ok(image) }.boxed()
        }
    }

    struct FailingRenderer;

    impl SnapshotRenderer for FailingRenderer {
        fn render_snapshot<'a>(&'a self, _preview: &'a InvoicePreview) -> BoxFuture<'a, Result<String, ExportError>> {
            async { Err(ExportError::Snapshot("canvas unavailable".into())) }.boxed()
        }
    }

    fn archive() -> InvoiceArchive {
        let now = Local.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        InvoiceArchive::new(MemoryStore::shared()).with_clock(Arc::new(FixedClock(now)))
    }

    fn draft() -> InvoiceDraft {
        let mut draft = InvoiceDraft::new();
        draft.order_number = "1001".into();
        draft.update_item(1, ItemField::Quantity("2".into()));
        draft.update_item(1, ItemField::OriginalPrice("10".into()));
        draft.set_delivery_fee("5");
        draft
    }

    fn assignment(folder: &str) -> Assignment {
        Assignment::new(folder, "Z", "X", "regular")
    }

    #[tokio::test]
    async fn save_appends_record_with_total() {
        let archive = archive();
        let saved = archive.save(&draft(), &assignment("A"), &StaticRenderer).await.unwrap();

        assert_eq!(saved.total_amount, BigDecimal::from(25));
        assert_eq!(saved.saved_date, archive.clock().now().with_timezone(&Utc).format("%Y-%m-%d").to_string());
        assert_eq!(saved.invoice_image, "data:image/png;base64,25");
        assert_eq!(archive.list(&InvoiceFilter::all()).unwrap(), vec![saved]);
    }

    #[tokio::test]
    async fn save_with_missing_fields_is_rejected() {
        let archive = archive();
        let err = archive
            .save(&draft(), &Assignment::new("A", "Z", "", "regular"), &StaticRenderer)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InvoiceError::Validation(ValidationError::MissingFields(ref f)) if f == &vec!["agent"]
        ));
        assert!(archive.list(&InvoiceFilter::all()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn renderer_failure_leaves_archive_unchanged() {
        let archive = archive();
        let err = archive.save(&draft(), &assignment("A"), &FailingRenderer).await.unwrap_err();
        assert!(matches!(err, InvoiceError::Export(ExportError::Snapshot(_))));
        assert!(archive.list(&InvoiceFilter::all()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn ids_stay_unique_within_same_millisecond() {
        let archive = archive();
        let first = archive.save(&draft(), &assignment("A"), &StaticRenderer).await.unwrap();
        let second = archive.save(&draft(), &assignment("B"), &StaticRenderer).await.unwrap();
        assert_eq!(second.id, first.id + 1);
    }

    #[tokio::test]
    async fn overlapping_saves_both_append() {
        let archive = archive();
        let d = draft();
        let a = assignment("A");
        let b = assignment("B");
        let (first, second) = tokio::join!(
            archive.save(&d, &a, &StaticRenderer),
            archive.save(&d, &b, &StaticRenderer)
        );
        first.unwrap();
        second.unwrap();
        assert_eq!(archive.list(&InvoiceFilter::all()).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn filter_folders_and_delete() {
        let archive = archive();
        let a = archive.save(&draft(), &assignment("A"), &StaticRenderer).await.unwrap();
        let b = archive.save(&draft(), &assignment("B"), &StaticRenderer).await.unwrap();
        archive.save(&draft(), &assignment("A"), &StaticRenderer).await.unwrap();

        assert_eq!(archive.folders().unwrap(), vec!["A", "B"]);
        assert_eq!(archive.list(&InvoiceFilter::all().folder("A")).unwrap().len(), 2);
        assert_eq!(archive.list(&InvoiceFilter::all().date_prefix("2026-10")).unwrap().len(), 3);
        assert!(archive.list(&InvoiceFilter::all().date_prefix("2025")).unwrap().is_empty());

        assert_eq!(archive.delete(a.id, |_| false).unwrap(), DeleteOutcome::Cancelled);
        assert_eq!(archive.list(&InvoiceFilter::all()).unwrap().len(), 3);

        assert_eq!(archive.delete(b.id, |_| true).unwrap(), DeleteOutcome::Deleted(b.clone()));
        assert_eq!(archive.folders().unwrap(), vec!["A"]);
        assert!(archive.get(b.id).unwrap().is_none());
        assert!(archive.get(a.id).unwrap().is_some());
        assert!(archive.delete(b.id, |_| true).is_err());
    }

    #[tokio::test]
    async fn summary_counts_filtered_invoices() {
        let archive = archive();
        archive.save(&draft(), &assignment("A"), &StaticRenderer).await.unwrap();
        archive.save(&draft(), &assignment("A"), &StaticRenderer).await.unwrap();
        let mut cheap = draft();
        cheap.update_item(1, ItemField::OriginalPrice("0.25".into()));
        archive.save(&cheap, &assignment("B"), &StaticRenderer).await.unwrap();

        let all = archive.summary(&InvoiceFilter::all()).unwrap();
        assert_eq!(all.invoice_count, 3);
        assert_eq!(all.total_amount, BigDecimal::from_str("55.5").unwrap());
        assert_eq!(all.total_display(), "55.50");
        assert_eq!(all.folder_count, 2);

        let only_a = archive.summary(&InvoiceFilter::all().folder("A")).unwrap();
        assert_eq!(only_a.invoice_count, 2);
        assert_eq!(only_a.total_amount, BigDecimal::from(50));
        assert_eq!(only_a.folder_count, 2);

        let none = archive.summary(&InvoiceFilter::all().date_prefix("1999")).unwrap();
        assert_eq!(none.invoice_count, 0);
        assert_eq!(none.total_display(), "0.00");
    }

    #[tokio::test]
    async fn unreadable_records_are_kept_across_save_and_delete() {
        let store = MemoryStore::shared();
        store
            .set(documents::SAVED_INVOICES_KEY, r#"[{"folder": "legacy", "totalAmount": 10}]"#.into())
            .unwrap();
        let now = Local.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let archive = InvoiceArchive::new(store.clone()).with_clock(Arc::new(FixedClock(now)));

        let saved = archive.save(&draft(), &assignment("A"), &StaticRenderer).await.unwrap();
        archive.delete(saved.id, |_| true).unwrap();

        assert!(archive.list(&InvoiceFilter::all()).unwrap().is_empty());
        let raw = store.get(documents::SAVED_INVOICES_KEY).unwrap().unwrap();
        assert!(raw.contains("legacy"));
    }

    #[tokio::test]
    async fn unparsable_archive_rejects_save() {
        let store = MemoryStore::shared();
        store.set(documents::SAVED_INVOICES_KEY, "not json".into()).unwrap();
        let archive = InvoiceArchive::new(store.clone());

        let err = archive.save(&draft(), &assignment("A"), &StaticRenderer).await.unwrap_err();
        assert!(matches!(err, InvoiceError::Storage(StorageError::Malformed { .. })));
        assert_eq!(store.get(documents::SAVED_INVOICES_KEY).unwrap().as_deref(), Some("not json"));
    }

    #[tokio::test]
    async fn export_csv_uses_filter() {
        let archive = archive();
        archive.save(&draft(), &assignment("A"), &StaticRenderer).await.unwrap();
        archive.save(&draft(), &assignment("B"), &StaticRenderer).await.unwrap();

        let mut out = Vec::new();
        let count = archive.export_csv(&InvoiceFilter::all().folder("B"), &mut out).unwrap();
        assert_eq!(count, 1);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
    }
}
