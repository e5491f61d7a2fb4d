use bigdecimal::BigDecimal;
use chrono::{Local, TimeZone, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use invoice_builder_rust::db::{self, KeyValueStore, MemoryStore};
use invoice_builder_rust::error::{ExportError, InvoiceError, ValidationError};
use invoice_builder_rust::models::{InvoiceDraft, InvoiceFilter, ItemField, LineItem};
use invoice_builder_rust::service::{
    FixedClock, InvoiceArchive, InvoicePreview, InvoiceSession, PdfExporter, PdfOptions, SnapshotRenderer,
    TaxonomyStore,
};
use std::sync::{Arc, Mutex};

struct PngRenderer;

impl SnapshotRenderer for PngRenderer {
    fn render_snapshot<'a>(&'a self, _preview: &'a InvoicePreview) -> BoxFuture<'a, Result<String, ExportError>> {
        async { Ok("data:image/png;base64,iVBORw0KGgo=".to_string()) }.boxed()
    }
}

struct BrokenRenderer;

impl SnapshotRenderer for BrokenRenderer {
    fn render_snapshot<'a>(&'a self, _preview: &'a InvoicePreview) -> BoxFuture<'a, Result<String, ExportError>> {
        async { Err(ExportError::Snapshot("no canvas".into())) }.boxed()
    }
}

/// 记录导出的文件名
#[derive(Default)]
struct RecordingExporter {
    files: Mutex<Vec<String>>,
    fail: bool,
}

impl PdfExporter for RecordingExporter {
    fn export_pdf<'a>(
        &'a self,
        _preview: &'a InvoicePreview,
        options: &'a PdfOptions,
    ) -> BoxFuture<'a, Result<(), ExportError>> {
        async move {
            if self.fail {
                return Err(ExportError::Pdf("worker crashed".into()));
            }
            self.files.lock().unwrap().push(options.filename.clone());
            Ok(())
        }
        .boxed()
    }
}

fn session_with(store: db::SharedStore) -> InvoiceSession {
    let now = Local.with_ymd_and_hms(2026, 10, 19, 15, 30, 0).unwrap();
    let archive = InvoiceArchive::new(store.clone()).with_clock(Arc::new(FixedClock(now)));
    InvoiceSession::new(TaxonomyStore::new(store), archive).with_default_customer_type("regular")
}

fn fill_scenario_draft(session: &mut InvoiceSession) {
    session.set_order_number("1001");
    session.set_customer_name("Mona");
    session.update_item(1, ItemField::Quantity("2".into()));
    session.update_item(1, ItemField::OriginalPrice("10".into()));
    session.update_item(1, ItemField::DiscountedPrice("0".into()));
    session.set_delivery_fee("5");
}

fn select_a_z_x(session: &mut InvoiceSession) {
    session.add_folder("A").unwrap();
    session.add_zone("Z").unwrap();
    session.add_agent("X").unwrap();
}

#[test]
fn totals_for_single_undiscounted_item() {
    let mut session = session_with(MemoryStore::shared());
    fill_scenario_draft(&mut session);

    let totals = session.totals();
    assert_eq!(totals.subtotal, BigDecimal::from(20));
    assert_eq!(totals.total, BigDecimal::from(25));
}

#[test]
fn new_item_id_follows_highest_existing_id() {
    let mut draft = InvoiceDraft::from(vec![LineItem::empty(1), LineItem::empty(3)]);
    assert_eq!(draft.add_item(), 4);
}

#[test]
fn deleting_zone_drops_its_agents() {
    let store = MemoryStore::shared();
    let mut session = session_with(store.clone());
    select_a_z_x(&mut session);

    session.delete_zone("Z").unwrap();
    let taxonomy = TaxonomyStore::new(store);
    assert!(taxonomy.list_agents("A", "Z").unwrap().is_empty());
    assert!(taxonomy.list_zones("A").unwrap().is_empty());
}

#[tokio::test]
async fn save_appends_one_record_and_resets_draft() {
    let store = MemoryStore::shared();
    let mut session = session_with(store.clone());
    select_a_z_x(&mut session);
    fill_scenario_draft(&mut session);

    let saved = session.save(&PngRenderer).await.unwrap();

    let archived = session.archive().list(&InvoiceFilter::all()).unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0], saved);
    assert_eq!(saved.total_amount, BigDecimal::from(25));
    assert_eq!(saved.customer_type, "regular");
    let expected_date = Local.with_ymd_and_hms(2026, 10, 19, 15, 30, 0).unwrap().with_timezone(&Utc);
    assert_eq!(saved.saved_date, expected_date.format("%Y-%m-%d").to_string());

    assert!(session.draft().is_blank());
    assert_eq!(session.draft().items().len(), 1);
    assert_eq!(session.selection().agent, "X");

    // 客户类型在保存时登记
    assert_eq!(session.taxonomy().list_customer_types().unwrap(), vec!["regular"]);
    assert!(store.get(db::SAVED_INVOICES_KEY).unwrap().is_some());
}

#[tokio::test]
async fn save_without_agent_is_rejected() {
    let mut session = session_with(MemoryStore::shared());
    session.add_folder("A").unwrap();
    session.add_zone("Z").unwrap();
    fill_scenario_draft(&mut session);

    let err = session.save(&PngRenderer).await.unwrap_err();
    assert!(matches!(err, InvoiceError::Validation(ValidationError::MissingFields(_))));
    assert!(session.archive().list(&InvoiceFilter::all()).unwrap().is_empty());
    assert!(!session.draft().is_blank());
}

#[tokio::test]
async fn renderer_failure_keeps_draft_and_archive() {
    let mut session = session_with(MemoryStore::shared());
    select_a_z_x(&mut session);
    fill_scenario_draft(&mut session);

    let err = session.save(&BrokenRenderer).await.unwrap_err();
    assert!(matches!(err, InvoiceError::Export(ExportError::Snapshot(_))));
    assert!(session.archive().list(&InvoiceFilter::all()).unwrap().is_empty());
    assert_eq!(session.totals().total, BigDecimal::from(25));
}

#[tokio::test]
async fn pdf_download_names_file_after_order() {
    let mut session = session_with(MemoryStore::shared());
    fill_scenario_draft(&mut session);

    let exporter = RecordingExporter::default();
    let options = session.download_pdf(&exporter).await.unwrap();
    assert_eq!(options.filename, "فاتورة-1001-2026-10-19.pdf");
    assert_eq!(*exporter.files.lock().unwrap(), vec![options.filename.clone()]);

    let failing = RecordingExporter {
        fail: true,
        ..RecordingExporter::default()
    };
    let err = session.download_pdf(&failing).await.unwrap_err();
    assert!(matches!(err, InvoiceError::Export(ExportError::Pdf(_))));
    assert!(!session.draft().is_blank());
}

#[test]
fn malformed_store_documents_load_as_defaults() {
    let store = MemoryStore::shared();
    store.set(db::FOLDERS_KEY, "{not json".to_string()).unwrap();
    store.set(db::SAVED_INVOICES_KEY, "42".to_string()).unwrap();

    let session = session_with(store);
    assert!(session.taxonomy().list_folders().unwrap().is_empty());
    assert!(session.archive().list(&InvoiceFilter::all()).unwrap().is_empty());
}

#[tokio::test]
async fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    {
        let mut session = session_with(db::open_file_store(&path).unwrap());
        select_a_z_x(&mut session);
        fill_scenario_draft(&mut session);
        session.save(&PngRenderer).await.unwrap();
    }

    let session = session_with(db::open_file_store(&path).unwrap());
    assert_eq!(session.taxonomy().list_agents("A", "Z").unwrap(), vec!["X"]);
    let archived = session.archive().list(&InvoiceFilter::all().folder("A")).unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].order_number, "1001");
}
