use crate::models::amount;
use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

/// 发票明细行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_quantity", with = "amount::quantity")]
    pub quantity: u32,
    #[serde(default, with = "amount::optional")]
    pub original_price: Option<BigDecimal>,
    /// 折后价; 缺失或为 0 表示无折扣
    #[serde(default, with = "amount::optional")]
    pub discounted_price: Option<BigDecimal>,
}

fn default_quantity() -> u32 {
    1
}

impl LineItem {
    pub fn empty(id: u32) -> Self {
        Self {
            id,
            description: String::new(),
            quantity: 1,
            original_price: None,
            discounted_price: None,
        }
    }
}

/// 明细行的可编辑字段 (原始输入文本)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemField {
    Description(String),
    Quantity(String),
    OriginalPrice(String),
    DiscountedPrice(String),
}

/// 当前编辑中的发票草稿
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub order_number: String,
    #[serde(default, with = "amount::or_zero")]
    pub delivery_fee: BigDecimal,
    #[serde(default = "blank_items", deserialize_with = "non_empty_items")]
    items: Vec<LineItem>,
}

fn blank_items() -> Vec<LineItem> {
    vec![LineItem::empty(1)]
}

fn non_empty_items<'de, D>(deserializer: D) -> Result<Vec<LineItem>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let items = Vec::<LineItem>::deserialize(deserializer)?;
    Ok(if items.is_empty() { blank_items() } else { items })
}

impl Default for InvoiceDraft {
    fn default() -> Self {
        Self {
            customer_name: String::new(),
            customer_phone: String::new(),
            delivery_address: String::new(),
            order_number: String::new(),
            delivery_fee: BigDecimal::zero(),
            items: blank_items(),
        }
    }
}

impl InvoiceDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item(&self, id: u32) -> Option<&LineItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// 追加空明细行, id = 当前最大 id + 1
    pub fn add_item(&mut self) -> u32 {
        let id = self.next_item_id();
        self.items.push(LineItem::empty(id));
        id
    }

    fn next_item_id(&self) -> u32 {
        let max = self.items.iter().map(|i| i.id).max().unwrap_or(0);
        if let Some(id) = max.checked_add(1) {
            return id;
        }
        // 最大 id 已到 u32::MAX, 取最小的未使用 id
        let mut id = 1;
        while self.items.iter().any(|i| i.id == id) {
            id += 1;
        }
        id
    }

    /// 删除明细行; 仅剩一行时不删除, 返回是否删除
    pub fn remove_item(&mut self, id: u32) -> bool {
        if self.items.len() <= 1 {
            return false;
        }
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        self.items.len() != before
    }

    /// 按原始输入更新明细字段, 返回是否找到该行
    pub fn update_item(&mut self, id: u32, field: ItemField) -> bool {
        let Some(item) = self.items.iter_mut().find(|i| i.id == id) else {
            return false;
        };
        match field {
            ItemField::Description(text) => item.description = text,
            ItemField::Quantity(raw) => item.quantity = amount::parse_quantity(&raw),
            ItemField::OriginalPrice(raw) => item.original_price = amount::parse_non_negative(&raw),
            ItemField::DiscountedPrice(raw) => item.discounted_price = amount::parse_non_negative(&raw),
        }
        true
    }

    /// 运费输入, 无法解析按 0
    pub fn set_delivery_fee(&mut self, raw: &str) {
        self.delivery_fee = amount::parse_non_negative(raw).unwrap_or_else(BigDecimal::zero);
    }

    /// 恢复为只含一行空明细的初始状态
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }
}

impl From<Vec<LineItem>> for InvoiceDraft {
    /// 用给定明细构建草稿; 空列表时补一行空明细
    fn from(items: Vec<LineItem>) -> Self {
        let items = if items.is_empty() { blank_items() } else { items };
        Self {
            items,
            ..Self::default()
        }
    }
}
