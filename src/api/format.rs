use serde::Deserialize;

pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Reads a money amount typed by a person: everything but digits and the
/// decimal point is dropped, so `"$2,632"` is 2632.
pub fn parse_currency(raw: &str) -> Option<f64> {
    let normalized: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn format_money(value: f64) -> String {
    if !value.is_finite() {
        return "--".to_string();
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn format_currency(value: f64) -> String {
    format!("${}", format_money(value))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v).filter(|v| v.is_finite()),
            FieldValue::Text(text) => parse_number(text),
        }
    }

    pub fn currency(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v).filter(|v| v.is_finite()),
            FieldValue::Text(text) => parse_currency(text),
        }
    }

    pub fn whole_number(&self) -> Option<u32> {
        self.number()
            .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= u32::MAX as f64)
            .map(|v| v as u32)
    }
}
