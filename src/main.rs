use chrono::Local;
use invoice_builder_rust::db::csv_file_name;
use invoice_builder_rust::models::InvoiceFilter;
use invoice_builder_rust::{open_file_store, AppConfig, InvoiceArchive, TaxonomyStore};
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting with config: {:?}", config);

    // 打开本地存储
    let store = open_file_store(&config.storage.path)?;
    info!("Store opened: {}", config.storage.path.display());

    let taxonomy = TaxonomyStore::new(store.clone());
    let archive = InvoiceArchive::new(store).with_currency(config.invoice.currency.clone());

    info!(
        "Taxonomy: {} folders, {} customer types",
        taxonomy.list_folders()?.len(),
        taxonomy.list_customer_types()?.len()
    );

    // 存档统计, 以及每个文件夹的明细
    let summary = archive.summary(&InvoiceFilter::all())?;
    info!(
        "Archive: {} invoices, {} {}, {} folders",
        summary.invoice_count,
        summary.total_display(),
        archive.currency(),
        summary.folder_count
    );
    for folder in archive.folders()? {
        let per_folder = archive.summary(&InvoiceFilter::all().folder(folder.as_str()))?;
        info!(
            "  {:<20} {:>5} invoices  {} {}",
            folder,
            per_folder.invoice_count,
            per_folder.total_display(),
            archive.currency()
        );
    }

    // 导出 CSV
    let output = config.export.dir.join(csv_file_name(Local::now().date_naive()));
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let exported = archive.export_csv_file(&InvoiceFilter::all(), &output)?;
    info!("Exported {} invoices to {}", exported, output.display());

    let invoices = archive.list(&InvoiceFilter::all())?;
    if let Some(latest) = invoices.iter().max_by_key(|i| i.id) {
        info!("Latest: order {} saved {} {}", latest.order_number, latest.saved_date, latest.saved_time);
    }

    Ok(())
}
