use crate::models::amount::plain_amount;
use crate::models::SavedInvoice;
use chrono::NaiveDate;
use csv::{QuoteStyle, WriterBuilder};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// 双语表头 (阿拉伯语 / 英语 成对出现)
pub const CSV_HEADERS: [&str; 14] = [
    "المجلد",
    "Folder",
    "رقم الفاتورة",
    "Order #",
    "التاريخ",
    "Date",
    "المندوب",
    "Agent",
    "المنطقة",
    "Zone",
    "العميل",
    "Customer",
    "المبلغ النهائي",
    "Total Amount",
];

/// 空文本显示为 "-"
fn or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn csv_row(invoice: &SavedInvoice) -> Vec<String> {
    let cells = [
        or_dash(&invoice.folder),
        or_dash(&invoice.order_number),
        invoice.saved_date.clone(),
        or_dash(&invoice.agent),
        or_dash(&invoice.zone),
        or_dash(&invoice.customer_name),
        plain_amount(&invoice.total_amount),
    ];
    // 每个值对应两列 (阿/英)
    cells.into_iter().flat_map(|c| [c.clone(), c]).collect()
}

/// 导出 CSV (所有单元格加引号)
pub fn write_csv<W: Write>(invoices: &[SavedInvoice], writer: W) -> Result<(), csv::Error> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    writer.write_record(CSV_HEADERS)?;
    for invoice in invoices {
        writer.write_record(csv_row(invoice))?;
    }

    writer.flush()?;
    Ok(())
}

/// 默认导出文件名: invoices-YYYY-MM-DD.csv
pub fn csv_file_name(date: NaiveDate) -> String {
    format!("invoices-{}.csv", date.format("%Y-%m-%d"))
}

/// 导出到文件
pub fn export_to_csv(invoices: &[SavedInvoice], output_path: &Path) -> Result<(), csv::Error> {
    let file = File::create(output_path)?;
    write_csv(invoices, file)?;
    tracing::info!("Exported {} invoices to {}", invoices.len(), output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn invoice() -> SavedInvoice {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "folder": "A",
            "orderNumber": "1001",
            "customerName": "Mona",
            "agent": "X",
            "zone": "",
            "savedDate": "2026-10-19",
        }))
        .unwrap()
    }

    #[test]
    fn writes_bilingual_headers_and_doubled_cells() {
        let mut inv = invoice();
        inv.total_amount = BigDecimal::from_str("25.5").unwrap();

        let mut out = Vec::new();
        write_csv(&[inv], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("\"المجلد\",\"Folder\""));
        assert_eq!(
            lines[1],
            "\"A\",\"A\",\"1001\",\"1001\",\"2026-10-19\",\"2026-10-19\",\"X\",\"X\",\"-\",\"-\",\"Mona\",\"Mona\",\"25.5\",\"25.5\""
        );
    }

    #[test]
    fn total_text_does_not_depend_on_input_scale() {
        let mut inv = invoice();
        inv.total_amount = BigDecimal::from_str("20.00").unwrap();

        let mut out = Vec::new();
        write_csv(&[inv], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with("\"20\",\"20\""));
    }

    #[test]
    fn zero_total_is_written_as_zero() {
        let mut out = Vec::new();
        write_csv(&[invoice()], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with("\"0\",\"0\""));
    }

    #[test]
    fn file_name_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(csv_file_name(date), "invoices-2026-10-19.csv");
    }
}
