use crate::models::{InvoiceDraft, LineItem};
use bigdecimal::{BigDecimal, Zero};

/// 单价: 有折后价 (> 0) 取折后价, 否则取原价, 缺失按 0
pub fn effective_price(item: &LineItem) -> BigDecimal {
    match &item.discounted_price {
        Some(discounted) if *discounted > BigDecimal::zero() => discounted.clone(),
        _ => item.original_price.clone().unwrap_or_else(BigDecimal::zero),
    }
}

pub fn has_discount(item: &LineItem) -> bool {
    matches!(&item.discounted_price, Some(d) if *d > BigDecimal::zero())
}

pub fn line_total(item: &LineItem) -> BigDecimal {
    BigDecimal::from(item.quantity) * effective_price(item)
}

pub fn subtotal(items: &[LineItem]) -> BigDecimal {
    let mut sum = BigDecimal::zero();
    for item in items {
        sum += line_total(item);
    }
    sum
}

/// 显示用金额: 截断为整数
pub fn display_amount(value: &BigDecimal) -> String {
    value.with_scale(0).to_string()
}

/// 发票金额汇总 (内部保持全精度)
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceTotals {
    pub subtotal: BigDecimal,
    pub delivery_fee: BigDecimal,
    pub total: BigDecimal,
}

impl InvoiceTotals {
    pub fn of(draft: &InvoiceDraft) -> Self {
        let subtotal = subtotal(draft.items());
        let delivery_fee = draft.delivery_fee.clone();
        let total = &subtotal + &delivery_fee;
        Self {
            subtotal,
            delivery_fee,
            total,
        }
    }

    pub fn subtotal_display(&self) -> String {
        display_amount(&self.subtotal)
    }

    pub fn total_display(&self) -> String {
        display_amount(&self.total)
    }
}

/// 总额 = 小计 + 运费
pub fn grand_total(draft: &InvoiceDraft) -> BigDecimal {
    InvoiceTotals::of(draft).total
}
