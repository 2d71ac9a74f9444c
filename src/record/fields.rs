//! Template variable resolution.
//!
//! Resolution order, first match wins:
//!
//! 1. Computed variables (`price`, `description`, `make`, `model`, `year`,
//!    `title`) with their own formatting rules.
//! 2. `texts[name]` overrides, verbatim.
//! 3. Dotted-path lookup into the record, stringified by type.
//!
//! Nothing here fails: an unknown variable resolves to `None` and the text
//! layer bound to it simply draws nothing.

use serde_json::Value;

use super::Record;
use super::format::{format_grouped, stringify_value};
use crate::config::RenderConfig;

/// Locale-ish formatting settings for resolved values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFormat {
    pub currency_prefix: String,
    pub date_format: String,
}

impl Default for FieldFormat {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

impl FieldFormat {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            currency_prefix: config.currency_prefix.clone(),
            date_format: config.date_format.clone(),
        }
    }
}

/// A computed variable: pure function of the record.
type Handler = fn(&FieldFormat, &Record) -> Option<String>;

/// Computed variables in priority order.
const COMPUTED: &[(&str, Handler)] = &[
    ("price", price),
    ("description", description),
    ("make", make),
    ("model", model),
    ("year", year),
    ("title", title),
];

/// Numeric view of a field: numbers, or strings that parse as numbers.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }
}

/// Plain (ungrouped) string form of a scalar; JS-style falsy values are `None`.
fn plain(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(plain_number(n)),
        _ => None,
    }
}

/// Integral floats print without a fraction (`2020.0` → `2020`).
fn plain_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}

fn price(format: &FieldFormat, record: &Record) -> Option<String> {
    if let Some(amount) = record.field("price").and_then(numeric) {
        return Some(format!("{}{}", format.currency_prefix, format_grouped(amount)));
    }
    if let Some(text) = record.text_override("price") {
        return Some(text.to_string());
    }
    Some(format!("{}0", format.currency_prefix))
}

fn description(_: &FieldFormat, record: &Record) -> Option<String> {
    let text = record
        .field("fullDescription")
        .and_then(plain)
        .or_else(|| record.text_override("description").map(str::to_string))
        .unwrap_or_default();
    Some(text)
}

fn make(_: &FieldFormat, record: &Record) -> Option<String> {
    Some(record.field("make").and_then(plain).unwrap_or_default())
}

fn model(_: &FieldFormat, record: &Record) -> Option<String> {
    Some(record.field("model").and_then(plain).unwrap_or_default())
}

fn year(_: &FieldFormat, record: &Record) -> Option<String> {
    Some(record.field("year").and_then(plain).unwrap_or_default())
}

fn title(_: &FieldFormat, record: &Record) -> Option<String> {
    let parts: Vec<String> = ["year", "make", "model", "variant"]
        .iter()
        .filter_map(|key| record.field(key).and_then(plain))
        .collect();
    Some(parts.join(" "))
}

/// Resolves template variables against records.
///
/// ```
/// use cartel::record::{FieldResolver, Record};
/// use serde_json::json;
///
/// let record = Record::new(json!({"year": 2020, "make": "Toyota", "model": "Corolla"}));
/// let fields = FieldResolver::default();
/// assert_eq!(fields.resolve(&record, "title").as_deref(), Some("2020 Toyota Corolla"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldResolver {
    format: FieldFormat,
}

impl FieldResolver {
    pub fn new(format: FieldFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> &FieldFormat {
        &self.format
    }

    /// Resolve `name` against `record`.
    pub fn resolve(&self, record: &Record, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        if let Some((_, handler)) = COMPUTED.iter().find(|(key, _)| *key == name) {
            return handler(&self.format, record);
        }

        if let Some(text) = record.text_override(name) {
            return Some(text.to_string());
        }

        record
            .lookup(name)
            .and_then(|value| stringify_value(value, &self.format.date_format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn resolve(record: Value, name: &str) -> Option<String> {
        FieldResolver::default().resolve(&Record::new(record), name)
    }

    #[test]
    fn test_price_numeric_wins_over_override() {
        let record = json!({"price": 250000, "texts": {"price": "POA"}});
        assert_eq!(resolve(record, "price"), Some("R250,000".into()));
    }

    #[test]
    fn test_price_override_when_numeric_absent() {
        let record = json!({"texts": {"price": "POA"}});
        assert_eq!(resolve(record, "price"), Some("POA".into()));
    }

    #[test]
    fn test_price_zero_value_when_absent() {
        assert_eq!(resolve(json!({}), "price"), Some("R0".into()));
        assert_eq!(resolve(json!({"price": null}), "price"), Some("R0".into()));
    }

    #[test]
    fn test_price_numeric_string_and_prefix() {
        let fields = FieldResolver::new(FieldFormat {
            currency_prefix: "$".into(),
            date_format: "%Y".into(),
        });
        let record = Record::new(json!({"price": "1999.99"}));
        assert_eq!(fields.resolve(&record, "price"), Some("$1,999.99".into()));
    }

    #[test]
    fn test_description_fallbacks() {
        assert_eq!(
            resolve(json!({"fullDescription": "Full", "texts": {"description": "Short"}}), "description"),
            Some("Full".into())
        );
        assert_eq!(
            resolve(json!({"texts": {"description": "Short"}}), "description"),
            Some("Short".into())
        );
        assert_eq!(resolve(json!({}), "description"), Some("".into()));
    }

    #[test]
    fn test_scalar_fields() {
        let record = json!({"make": "Toyota", "year": 2020});
        assert_eq!(resolve(record.clone(), "make"), Some("Toyota".into()));
        assert_eq!(resolve(record.clone(), "model"), Some("".into()));
        assert_eq!(resolve(record, "year"), Some("2020".into()));
    }

    #[test]
    fn test_integral_float_year() {
        assert_eq!(resolve(json!({"year": 2020.0}), "year"), Some("2020".into()));
        assert_eq!(
            resolve(json!({"year": 2020.0, "make": "Toyota", "model": "Corolla"}), "title"),
            Some("2020 Toyota Corolla".into())
        );
        assert_eq!(resolve(json!({"year": 2020.5}), "year"), Some("2020.5".into()));
    }

    #[test]
    fn test_title_composition() {
        assert_eq!(
            resolve(json!({"year": 2020, "make": "Toyota", "model": "Corolla"}), "title"),
            Some("2020 Toyota Corolla".into())
        );
        assert_eq!(
            resolve(
                json!({"year": 2019, "make": "", "model": "Polo", "variant": "1.0 TSI"}),
                "title"
            ),
            Some("2019 Polo 1.0 TSI".into())
        );
        assert_eq!(resolve(json!({}), "title"), Some("".into()));
    }

    #[test]
    fn test_texts_override_beats_path() {
        let record = json!({"colour": "Red", "texts": {"colour": "Flame Red"}});
        assert_eq!(resolve(record, "colour"), Some("Flame Red".into()));
    }

    #[test]
    fn test_computed_beats_texts() {
        let record = json!({"make": "Toyota", "texts": {"make": "TOYOTA!"}});
        assert_eq!(resolve(record, "make"), Some("Toyota".into()));
    }

    #[test]
    fn test_dotted_path() {
        let record = json!({"organization": {"registeredName": "Acme Motors (Pty) Ltd"}});
        assert_eq!(
            resolve(record.clone(), "organization.registeredName"),
            Some("Acme Motors (Pty) Ltd".into())
        );
        assert_eq!(resolve(record.clone(), "organization.tradingName"), None);
        assert_eq!(resolve(record, "branch.registeredName"), None);
    }

    #[test]
    fn test_typed_path_values() {
        let record = json!({
            "mileage": 45000,
            "serviceHistory": true,
            "accident": false,
            "listedAt": "2024-01-15T10:30:00Z",
            "blank": ""
        });
        assert_eq!(resolve(record.clone(), "mileage"), Some("45,000".into()));
        assert_eq!(resolve(record.clone(), "serviceHistory"), Some("Yes".into()));
        assert_eq!(resolve(record.clone(), "accident"), Some("No".into()));
        assert_eq!(resolve(record.clone(), "listedAt"), Some("1/15/2024".into()));
        assert_eq!(resolve(record.clone(), "blank"), None);
        assert_eq!(resolve(record, "  "), None);
    }
}
