use crate::models::{Assignment, InvoiceDraft};
use crate::service::totals::{display_amount, effective_price, has_discount, line_total, InvoiceTotals};
use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 预览中的一行明细 (均为显示文本)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewLine {
    pub description: String,
    pub quantity: u32,
    /// 有折扣时显示划线原价
    pub struck_price: Option<String>,
    pub price: String,
    pub line_total: String,
}

/// 可打印/导出的发票视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoicePreview {
    pub order_number: String,
    pub date: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub folder: String,
    pub zone: String,
    pub agent: String,
    pub lines: Vec<PreviewLine>,
    pub subtotal: String,
    /// 运费为 0 时显示 "Free"
    pub delivery_fee: String,
    pub total: String,
    pub currency: String,
}

impl InvoicePreview {
    pub fn build(draft: &InvoiceDraft, assignment: &Assignment, date: NaiveDate, currency: &str) -> Self {
        let totals = InvoiceTotals::of(draft);

        let lines = draft
            .items()
            .iter()
            .map(|item| PreviewLine {
                description: item.description.clone(),
                quantity: item.quantity,
                struck_price: has_discount(item)
                    .then(|| display_amount(&item.original_price.clone().unwrap_or_else(BigDecimal::zero))),
                price: display_amount(&effective_price(item)),
                line_total: display_amount(&line_total(item)),
            })
            .collect();

        let delivery_fee = if totals.delivery_fee.is_zero() {
            "Free".to_string()
        } else {
            display_amount(&totals.delivery_fee)
        };

        Self {
            order_number: draft.order_number.clone(),
            date: date.format("%B %-d, %Y").to_string(),
            customer_name: draft.customer_name.clone(),
            customer_phone: draft.customer_phone.clone(),
            delivery_address: draft.delivery_address.clone(),
            folder: assignment.folder.clone(),
            zone: assignment.zone.clone(),
            agent: assignment.agent.clone(),
            lines,
            subtotal: totals.subtotal_display(),
            delivery_fee,
            total: totals.total_display(),
            currency: currency.to_string(),
        }
    }

    pub fn total_label(&self) -> String {
        format!("{} {}", self.total, self.currency)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    Portrait,
    Landscape,
}

/// PDF 导出参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfOptions {
    pub margin_mm: f32,
    pub format: String,
    pub orientation: PageOrientation,
    pub image_type: String,
    pub image_quality: f32,
    pub render_scale: f32,
    pub pagebreak_modes: Vec<String>,
    /// 为空时按订单号和日期生成
    pub filename: String,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            margin_mm: 10.0,
            format: "a4".to_string(),
            orientation: PageOrientation::Portrait,
            image_type: "jpeg".to_string(),
            image_quality: 0.98,
            render_scale: 2.0,
            pagebreak_modes: vec!["avoid-all".to_string(), "css".to_string(), "legacy".to_string()],
            filename: String::new(),
        }
    }
}

impl PdfOptions {
    /// 补全文件名: فاتورة-{订单号}-{YYYY-MM-DD}.pdf
    pub fn for_invoice(&self, order_number: &str, date: NaiveDate) -> Self {
        let mut options = self.clone();
        if options.filename.is_empty() {
            options.filename = format!("فاتورة-{}-{}.pdf", order_number, date.format("%Y-%m-%d"));
        }
        options
    }
}
