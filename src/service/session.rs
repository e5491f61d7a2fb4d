use crate::error::{Result, ValidationError};
use crate::models::{Assignment, InvoiceDraft, ItemField, SavedInvoice};
use crate::service::archive::InvoiceArchive;
use crate::service::preview::{InvoicePreview, PdfOptions};
use crate::service::render::{PdfExporter, SnapshotRenderer};
use crate::service::taxonomy::TaxonomyStore;
use crate::service::totals::InvoiceTotals;

/// 当前选中的 文件夹/区域/代理人/客户类型
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub folder: String,
    pub zone: String,
    pub agent: String,
    pub customer_type: String,
}

impl Selection {
    pub fn assignment(&self) -> Assignment {
        Assignment::new(&self.folder, &self.zone, &self.agent, &self.customer_type)
    }
}

/// 一次编辑会话: 草稿 + 选中项, 调度目录和存档
pub struct InvoiceSession {
    taxonomy: TaxonomyStore,
    archive: InvoiceArchive,
    pdf_options: PdfOptions,
    draft: InvoiceDraft,
    selection: Selection,
}

impl InvoiceSession {
    pub fn new(taxonomy: TaxonomyStore, archive: InvoiceArchive) -> Self {
        Self {
            taxonomy,
            archive,
            pdf_options: PdfOptions::default(),
            draft: InvoiceDraft::new(),
            selection: Selection::default(),
        }
    }

    pub fn with_pdf_options(mut self, options: PdfOptions) -> Self {
        self.pdf_options = options;
        self
    }

    pub fn with_default_customer_type(mut self, customer_type: impl Into<String>) -> Self {
        self.selection.customer_type = customer_type.into();
        self
    }

    pub fn taxonomy(&self) -> &TaxonomyStore {
        &self.taxonomy
    }

    pub fn archive(&self) -> &InvoiceArchive {
        &self.archive
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    // ---------- 草稿 ----------

    pub fn draft(&self) -> &InvoiceDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut InvoiceDraft {
        &mut self.draft
    }

    pub fn set_customer_name(&mut self, value: &str) {
        self.draft.customer_name = value.to_string();
    }

    pub fn set_customer_phone(&mut self, value: &str) {
        self.draft.customer_phone = value.to_string();
    }

    pub fn set_delivery_address(&mut self, value: &str) {
        self.draft.delivery_address = value.to_string();
    }

    pub fn set_order_number(&mut self, value: &str) {
        self.draft.order_number = value.to_string();
    }

    pub fn add_item(&mut self) -> u32 {
        self.draft.add_item()
    }

    pub fn remove_item(&mut self, id: u32) -> bool {
        self.draft.remove_item(id)
    }

    pub fn update_item(&mut self, id: u32, field: ItemField) -> bool {
        self.draft.update_item(id, field)
    }

    pub fn set_delivery_fee(&mut self, raw: &str) {
        self.draft.set_delivery_fee(raw)
    }

    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals::of(&self.draft)
    }

    pub fn preview(&self) -> InvoicePreview {
        let today = self.archive.clock().now().date_naive();
        InvoicePreview::build(&self.draft, &self.selection.assignment(), today, self.archive.currency())
    }

    // ---------- 选择 ----------

    /// 切换文件夹时清空区域和代理人
    pub fn select_folder(&mut self, folder: &str) {
        self.selection.folder = folder.to_string();
        self.selection.zone.clear();
        self.selection.agent.clear();
    }

    pub fn select_zone(&mut self, zone: &str) {
        self.selection.zone = zone.to_string();
        self.selection.agent.clear();
    }

    pub fn select_agent(&mut self, agent: &str) {
        self.selection.agent = agent.to_string();
    }

    pub fn select_customer_type(&mut self, customer_type: &str) {
        self.selection.customer_type = customer_type.to_string();
    }

    fn require_folder(&self) -> Result<String> {
        if self.selection.folder.is_empty() {
            tracing::warn!("No folder selected");
            return Err(ValidationError::NoFolderSelected.into());
        }
        Ok(self.selection.folder.clone())
    }

    fn require_zone(&self) -> Result<(String, String)> {
        let folder = self.require_folder()?;
        if self.selection.zone.is_empty() {
            tracing::warn!("No zone selected");
            return Err(ValidationError::NoZoneSelected.into());
        }
        Ok((folder, self.selection.zone.clone()))
    }

    // ---------- 目录操作 (作用于当前选中范围) ----------

    /// 新建文件夹并选中
    pub fn add_folder(&mut self, name: &str) -> Result<String> {
        let name = self.taxonomy.add_folder(name)?;
        self.select_folder(&name);
        Ok(name)
    }

    pub fn add_zone(&mut self, name: &str) -> Result<String> {
        let folder = self.require_folder()?;
        let name = self.taxonomy.add_zone(&folder, name)?;
        self.select_zone(&name);
        Ok(name)
    }

    pub fn add_agent(&mut self, name: &str) -> Result<String> {
        let (folder, zone) = self.require_zone()?;
        let name = self.taxonomy.add_agent(&folder, &zone, name)?;
        self.select_agent(&name);
        Ok(name)
    }

    pub fn add_customer_type(&mut self, name: &str) -> Result<String> {
        self.taxonomy.add_customer_type(name)
    }

    pub fn rename_folder(&mut self, old: &str, new: &str) -> Result<String> {
        let name = self.taxonomy.rename_folder(old, new)?;
        if self.selection.folder == old {
            self.selection.folder = name.clone();
        }
        Ok(name)
    }

    pub fn rename_zone(&mut self, old: &str, new: &str) -> Result<String> {
        let folder = self.require_folder()?;
        let name = self.taxonomy.rename_zone(&folder, old, new)?;
        if self.selection.zone == old {
            self.selection.zone = name.clone();
        }
        Ok(name)
    }

    pub fn rename_agent(&mut self, old: &str, new: &str) -> Result<String> {
        let (folder, zone) = self.require_zone()?;
        let name = self.taxonomy.rename_agent(&folder, &zone, old, new)?;
        if self.selection.agent == old {
            self.selection.agent = name.clone();
        }
        Ok(name)
    }

    pub fn rename_customer_type(&mut self, old: &str, new: &str) -> Result<String> {
        let name = self.taxonomy.rename_customer_type(old, new)?;
        if self.selection.customer_type == old {
            self.selection.customer_type = name.clone();
        }
        Ok(name)
    }

    pub fn delete_folder(&mut self, name: &str) -> Result<()> {
        self.taxonomy.delete_folder(name)?;
        if self.selection.folder == name {
            self.select_folder("");
        }
        Ok(())
    }

    pub fn delete_zone(&mut self, name: &str) -> Result<()> {
        let folder = self.require_folder()?;
        self.taxonomy.delete_zone(&folder, name)?;
        if self.selection.zone == name {
            self.select_zone("");
        }
        Ok(())
    }

    pub fn delete_agent(&mut self, name: &str) -> Result<()> {
        let (folder, zone) = self.require_zone()?;
        self.taxonomy.delete_agent(&folder, &zone, name)?;
        if self.selection.agent == name {
            self.selection.agent.clear();
        }
        Ok(())
    }

    pub fn delete_customer_type(&mut self, name: &str) -> Result<()> {
        self.taxonomy.delete_customer_type(name)?;
        if self.selection.customer_type == name {
            self.selection.customer_type.clear();
        }
        Ok(())
    }

    // ---------- 保存 / 导出 ----------

    /// 保存当前草稿; 成功后登记名称并重置草稿 (选中项保留)
    ///
    /// 发票一旦写入存档即视为保存成功, 登记名称失败只记录日志。
    pub async fn save(&mut self, renderer: &dyn SnapshotRenderer) -> Result<SavedInvoice> {
        let assignment = self.selection.assignment();
        let saved = self.archive.save(&self.draft, &assignment, renderer).await?;

        if let Err(e) = self
            .taxonomy
            .register_assignment(&saved.folder, &saved.zone, &saved.agent, &saved.customer_type)
        {
            tracing::error!("Invoice {} saved but names were not registered: {}", saved.id, e);
        }
        self.draft.reset();
        Ok(saved)
    }

    /// 导出 PDF; 失败时草稿和存档均不变
    pub async fn download_pdf(&self, exporter: &dyn PdfExporter) -> Result<PdfOptions> {
        let preview = self.preview();
        let today = self.archive.clock().now().date_naive();
        let options = self.pdf_options.for_invoice(&self.draft.order_number, today);

        match exporter.export_pdf(&preview, &options).await {
            Ok(()) => {
                tracing::info!("PDF exported: {}", options.filename);
                Ok(options)
            }
            Err(e) => {
                tracing::error!("Error generating PDF: {}", e);
                Err(e.into())
            }
        }
    }
}
