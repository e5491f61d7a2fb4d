//! 表单数值的宽松解析
//!
//! 价格/运费/数量来自用户输入, 可能是数字、数字字符串、带后缀的字符串或空串。
//! 能解析出前缀数字的取前缀, 其余视为缺失。

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;
use std::str::FromStr;

/// 截取开头的数字部分 ("12.5kg" -> "12.5")
fn numeric_prefix(raw: &str) -> Option<&str> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        // "12." 视为 "12"
        if frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }
    Some(&s[..end])
}

/// 解析金额; 无法解析返回 None
pub fn parse_amount(raw: &str) -> Option<BigDecimal> {
    let prefix = numeric_prefix(raw)?;
    let (sign, rest) = match prefix.as_bytes().first() {
        Some(b'-') => ("-", &prefix[1..]),
        Some(b'+') => ("", &prefix[1..]),
        _ => ("", prefix),
    };
    let text = if rest.starts_with('.') {
        format!("{}0{}", sign, rest)
    } else {
        format!("{}{}", sign, rest)
    };
    BigDecimal::from_str(&text).ok()
}

/// 解析非负金额 (负数截为 0)
pub fn parse_non_negative(raw: &str) -> Option<BigDecimal> {
    parse_amount(raw).map(clamp_non_negative)
}

pub fn clamp_non_negative(value: BigDecimal) -> BigDecimal {
    if value < BigDecimal::zero() {
        BigDecimal::zero()
    } else {
        value
    }
}

/// 解析数量: 取整数部分, 至少为 1
pub fn parse_quantity(raw: &str) -> u32 {
    numeric_prefix(raw)
        .and_then(|p| p.split('.').next())
        .and_then(|p| p.parse::<i64>().ok())
        .map(|q| q.clamp(1, u32::MAX as i64) as u32)
        .unwrap_or(1)
}

/// 不带多余零的十进制文本 ("20.00" -> "20", "10.50" -> "10.5")
pub fn plain_amount(value: &BigDecimal) -> String {
    let int = value.with_scale(0);
    if int == *value {
        return int.to_string();
    }
    // 有小数部分, 文本中必有小数点
    value.to_string().trim_end_matches('0').to_string()
}

/// 金额写作 JSON 数字; 超出 f64 表示范围时退回字符串
fn serialize_amount<S>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let text = plain_amount(value);
    if let Ok(int) = text.parse::<i64>() {
        return serializer.serialize_i64(int);
    }
    match text.parse::<f64>() {
        Ok(float) if float.is_finite() => serializer.serialize_f64(float),
        _ => serializer.serialize_str(&text),
    }
}

fn value_to_amount(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// serde helper: `Option<BigDecimal>` 读作宽松数值, 写作 JSON 数字
pub mod optional {
    use super::*;

    pub fn serialize<S>(value: &Option<BigDecimal>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serialize_amount(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<BigDecimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value
            .as_ref()
            .and_then(value_to_amount)
            .map(clamp_non_negative))
    }
}

/// serde helper: 缺失按 0 处理
pub mod or_zero {
    use super::*;

    pub fn serialize<S>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_amount(value, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value
            .as_ref()
            .and_then(value_to_amount)
            .map(clamp_non_negative)
            .unwrap_or_else(BigDecimal::zero))
    }
}

/// serde helper: 数量, 缺失或非法按 1 处理
pub mod quantity {
    use super::*;

    pub fn serialize<S>(value: &u32, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(*value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Number(n)) => parse_quantity(&n.to_string()),
            Some(Value::String(s)) => parse_quantity(&s),
            _ => 1,
        })
    }
}
