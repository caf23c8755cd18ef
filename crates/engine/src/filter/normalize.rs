//! Normalization of raw posted filter values into typed field filters.
//!
//! Every `(kind, field, raw value)` triple goes through [`FieldFilter::normalize`]
//! exactly once before dispatch. That is where dotted-field unwrapping,
//! sentinel values (`"all"`, `""`, empty lists) and locale number formats are
//! dealt with, so the predicate builders only ever see well-formed input.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use sea_query::Value;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

use super::types::{FilterKind, FilterSpec, TextOperator};

/// A scalar filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    /// Convert a JSON scalar. Null, arrays and objects have no scalar form.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(s) => Some(Scalar::Text(s.clone())),
            JsonValue::Bool(b) => Some(Scalar::Bool(*b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Some(Scalar::Integer(i)),
                None => n.as_f64().map(Scalar::Float),
            },
            JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }

    /// Whether the value constrains anything. Blank strings do not.
    pub fn is_filled(&self) -> bool {
        match self {
            Scalar::Text(s) => !s.trim().is_empty(),
            _ => true,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Scalar::Text(s) => s.clone(),
            Scalar::Integer(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(true) => "1".to_string(),
            Scalar::Bool(false) => String::new(),
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Text(s) => s.into(),
            Scalar::Integer(i) => i.into(),
            Scalar::Float(f) => f.into(),
            Scalar::Bool(b) => b.into(),
        }
    }
}

/// One end of a numeric range.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberBound {
    Numeric(f64),
    /// Normalized text that did not parse as a number.
    Text(String),
}

impl From<NumberBound> for Value {
    fn from(bound: NumberBound) -> Self {
        match bound {
            NumberBound::Numeric(n) => n.into(),
            NumberBound::Text(s) => s.into(),
        }
    }
}

/// A numeric constraint. Which variant applies depends on which bounds were
/// posted.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberRange {
    /// `field >= bound`
    AtLeast(f64),
    /// `field <= bound`
    AtMost(f64),
    /// `field BETWEEN lo AND hi`
    Between(NumberBound, NumberBound),
}

/// A posted filter after normalization. Field names are final (dotted when
/// the raw value named a sub-field).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFilter {
    DateRange {
        field: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    MultiSelect {
        field: String,
        values: Vec<Scalar>,
    },
    Select {
        field: String,
        value: Scalar,
    },
    Boolean {
        field: String,
        value: bool,
    },
    InputText {
        field: String,
        operator: TextOperator,
        value: String,
    },
    Number {
        field: String,
        range: NumberRange,
    },
}

impl FieldFilter {
    /// Normalize one posted value. `None` means the value does not constrain
    /// anything (missing bound, sentinel, blank) or could not be read.
    pub fn normalize(
        kind: FilterKind,
        field: &str,
        raw: &JsonValue,
        spec: &FilterSpec,
    ) -> Option<Self> {
        match kind {
            FilterKind::DatePicker => date_range(field, raw),
            FilterKind::MultiSelect => multi_select(field, raw),
            FilterKind::Select => select(field, raw),
            FilterKind::Boolean => boolean(field, raw),
            FilterKind::InputText => input_text(field, raw, spec),
            FilterKind::Number => number(field, raw),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            FieldFilter::DateRange { field, .. }
            | FieldFilter::MultiSelect { field, .. }
            | FieldFilter::Select { field, .. }
            | FieldFilter::Boolean { field, .. }
            | FieldFilter::InputText { field, .. }
            | FieldFilter::Number { field, .. } => field,
        }
    }
}

/// `{sub: value}` names the sub-field `field.sub`; anything else is taken as is.
fn unwrap_dotted<'v>(field: &str, raw: &'v JsonValue) -> (String, &'v JsonValue) {
    match raw.as_object().and_then(|map| map.iter().next()) {
        Some((sub, value)) => (format!("{field}.{sub}"), value),
        None => (field.to_string(), raw),
    }
}

fn date_range(field: &str, raw: &JsonValue) -> Option<FieldFilter> {
    let Some(bounds) = raw.as_array() else {
        debug!(field, "date range is not a list; skipped");
        return None;
    };

    let start = date_bound(field, bounds.first())?;
    let end = date_bound(field, bounds.get(1))?;

    Some(FieldFilter::DateRange {
        field: field.to_string(),
        start,
        end,
    })
}

fn date_bound(field: &str, raw: Option<&JsonValue>) -> Option<NaiveDateTime> {
    let text = raw?.as_str().map(str::trim).filter(|s| !s.is_empty())?;
    let parsed = parse_datetime(text);
    if parsed.is_none() {
        warn!(field, value = text, "unparseable date bound; date filter skipped");
    }
    parsed
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse the date-time formats date pickers post. An offset, when present,
/// is dropped and the wall-clock time kept.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn multi_select(field: &str, raw: &JsonValue) -> Option<FieldFilter> {
    let Some(map) = raw.as_object() else {
        debug!(field, "multi select value is not a map; skipped");
        return None;
    };

    let is_direct = map.get("id").and_then(JsonValue::as_str) == Some(field);
    let (field, map): (String, &Map<String, JsonValue>) = if is_direct {
        (field.to_string(), map)
    } else {
        let (sub, nested) = map.iter().next()?;
        (format!("{field}.{sub}"), nested.as_object()?)
    };

    let values = map.get("values")?.as_array()?;
    if values.is_empty() {
        return None;
    }
    if values.iter().any(|v| v.as_str() == Some("")) {
        debug!(field = %field, "multi select holds the unset sentinel; skipped");
        return None;
    }

    let values: Vec<Scalar> = values.iter().filter_map(Scalar::from_json).collect();
    if values.is_empty() {
        return None;
    }
    Some(FieldFilter::MultiSelect { field, values })
}

fn select(field: &str, raw: &JsonValue) -> Option<FieldFilter> {
    let (field, raw) = unwrap_dotted(field, raw);
    let value = Scalar::from_json(raw).filter(Scalar::is_filled)?;
    Some(FieldFilter::Select { field, value })
}

fn boolean(field: &str, raw: &JsonValue) -> Option<FieldFilter> {
    let (field, raw) = unwrap_dotted(field, raw);
    let value = match raw {
        JsonValue::String(s) if s == "all" => return None,
        JsonValue::String(s) => s == "true",
        JsonValue::Bool(b) => *b,
        _ => false,
    };
    Some(FieldFilter::Boolean { field, value })
}

fn input_text(field: &str, raw: &JsonValue, spec: &FilterSpec) -> Option<FieldFilter> {
    let (field, raw) = unwrap_dotted(field, raw);
    let value = Scalar::from_json(raw)
        .map(|s| s.to_text())
        .unwrap_or_default();

    let operator = match spec.text_option(&field) {
        None => TextOperator::default(),
        Some(name) => TextOperator::from_name(name).unwrap_or_else(|| {
            warn!(field = %field, operator = name, "unknown text operator; using contains");
            TextOperator::default()
        }),
    };

    Some(FieldFilter::InputText {
        field,
        operator,
        value,
    })
}

fn number(field: &str, raw: &JsonValue) -> Option<FieldFilter> {
    let Some(map) = raw.as_object() else {
        debug!(field, "number value is not a map; skipped");
        return None;
    };

    let thousands = map.get("thousands").and_then(JsonValue::as_str).unwrap_or("");
    let decimal = map.get("decimal").and_then(JsonValue::as_str).unwrap_or(".");
    let bound = |key: &str| {
        map.get(key)
            .and_then(Scalar::from_json)
            .filter(Scalar::is_filled)
            .map(|s| match s {
                Scalar::Text(text) => normalize_number(&text, thousands, decimal),
                typed => typed.to_text(),
            })
    };

    let range = match (bound("start"), bound("end")) {
        (Some(start), None) => NumberRange::AtLeast(parse_number(field, &start)?),
        (None, Some(end)) => NumberRange::AtMost(parse_number(field, &end)?),
        (Some(start), Some(end)) => match (finite(&start), finite(&end)) {
            (Some(lo), Some(hi)) => {
                NumberRange::Between(NumberBound::Numeric(lo), NumberBound::Numeric(hi))
            }
            _ => NumberRange::Between(NumberBound::Text(start), NumberBound::Text(end)),
        },
        (None, None) => return None,
    };

    Some(FieldFilter::Number {
        field: field.to_string(),
        range,
    })
}

/// Strip the thousands separator and turn the decimal separator into `.`.
pub fn normalize_number(text: &str, thousands: &str, decimal: &str) -> String {
    let stripped = if thousands.is_empty() {
        text.trim().to_string()
    } else {
        text.trim().replace(thousands, "")
    };
    if decimal.is_empty() || decimal == "." {
        stripped
    } else {
        stripped.replace(decimal, ".")
    }
}

fn parse_number(field: &str, text: &str) -> Option<f64> {
    let parsed = finite(text);
    if parsed.is_none() {
        warn!(field, value = text, "unparseable number bound; number filter skipped");
    }
    parsed
}

/// `inf`, `NaN` and overflowing literals have no SQL rendering.
fn finite(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(kind: FilterKind, field: &str, raw: JsonValue) -> Option<FieldFilter> {
        FieldFilter::normalize(kind, field, &raw, &FilterSpec::new())
    }

    #[test]
    fn date_range_needs_both_bounds() {
        assert!(normalize(FilterKind::DatePicker, "created_at", json!(["2024-01-01"])).is_none());
        for raw in [json!([null, "2024-01-01"]), json!(["", "2024-01-01"])] {
            assert!(normalize(FilterKind::DatePicker, "created_at", raw).is_none());
        }

        let filter = normalize(
            FilterKind::DatePicker,
            "created_at",
            json!(["2024-01-01", "2024-01-31 23:59:59"]),
        )
        .unwrap();
        let FieldFilter::DateRange { start, end, .. } = filter else {
            panic!("expected date range");
        };
        assert_eq!(start.to_string(), "2024-01-01 00:00:00");
        assert_eq!(end.to_string(), "2024-01-31 23:59:59");
    }

    #[test]
    fn date_range_with_garbage_is_skipped() {
        let raw = json!(["yesterday", "2024-01-01"]);
        assert!(normalize(FilterKind::DatePicker, "d", raw).is_none());
    }

    #[test]
    fn parse_datetime_formats() {
        assert_eq!(
            parse_datetime("2024-03-05T10:20:30+02:00").unwrap().to_string(),
            "2024-03-05 10:20:30"
        );
        assert_eq!(
            parse_datetime("2024-03-05T10:20").unwrap().to_string(),
            "2024-03-05 10:20:00"
        );
        assert!(parse_datetime("05/03/2024").is_none());
    }

    #[test]
    fn multi_select_direct_shape() {
        let filter = normalize(
            FilterKind::MultiSelect,
            "status",
            json!({"id": "status", "values": ["a", "b"]}),
        )
        .unwrap();
        assert_eq!(
            filter,
            FieldFilter::MultiSelect {
                field: "status".to_string(),
                values: vec![Scalar::Text("a".to_string()), Scalar::Text("b".to_string())],
            }
        );
    }

    #[test]
    fn multi_select_nested_shape_builds_dotted_field() {
        let filter = normalize(
            FilterKind::MultiSelect,
            "category",
            json!({"name": {"id": "category", "values": [1, 2]}}),
        )
        .unwrap();
        assert_eq!(filter.field(), "category.name");
    }

    #[test]
    fn multi_select_sentinels() {
        let raw = json!({"id": "s", "values": []});
        assert!(normalize(FilterKind::MultiSelect, "s", raw).is_none());
        let raw = json!({"id": "s", "values": ["a", ""]});
        assert!(normalize(FilterKind::MultiSelect, "s", raw).is_none());
        assert!(normalize(FilterKind::MultiSelect, "s", json!({"id": "s"})).is_none());
        assert!(normalize(FilterKind::MultiSelect, "s", json!("a")).is_none());
    }

    #[test]
    fn select_unwraps_and_ignores_blank() {
        assert_eq!(
            normalize(FilterKind::Select, "dish", json!({"category": 3})),
            Some(FieldFilter::Select {
                field: "dish.category".to_string(),
                value: Scalar::Integer(3),
            })
        );
        assert!(normalize(FilterKind::Select, "status", json!("  ")).is_none());
        assert!(normalize(FilterKind::Select, "status", json!(null)).is_none());
    }

    #[test]
    fn boolean_sentinel_and_coercion() {
        assert!(normalize(FilterKind::Boolean, "active", json!("all")).is_none());
        assert_eq!(
            normalize(FilterKind::Boolean, "active", json!("true")),
            Some(FieldFilter::Boolean {
                field: "active".to_string(),
                value: true,
            })
        );
        assert_eq!(
            normalize(FilterKind::Boolean, "active", json!({"flag": "no"})),
            Some(FieldFilter::Boolean {
                field: "active.flag".to_string(),
                value: false,
            })
        );
    }

    #[test]
    fn input_text_operator_override_uses_dotted_field() {
        let spec = FilterSpec::new().with_text_option("user.name", "Starts_With");
        let filter =
            FieldFilter::normalize(FilterKind::InputText, "user", &json!({"name": "jo"}), &spec)
                .unwrap();
        assert_eq!(
            filter,
            FieldFilter::InputText {
                field: "user.name".to_string(),
                operator: TextOperator::StartsWith,
                value: "jo".to_string(),
            }
        );
    }

    #[test]
    fn input_text_unknown_operator_falls_back_to_contains() {
        let spec = FilterSpec::new().with_text_option("name", "sounds_like");
        let filter =
            FieldFilter::normalize(FilterKind::InputText, "name", &json!("jo"), &spec).unwrap();
        assert!(matches!(
            filter,
            FieldFilter::InputText {
                operator: TextOperator::Contains,
                ..
            }
        ));
    }

    #[test]
    fn number_locale_normalization() {
        assert_eq!(normalize_number("1.234,56", ".", ","), "1234.56");
        assert_eq!(normalize_number("1,234.56", ",", "."), "1234.56");
        assert_eq!(normalize_number("1234", "", ""), "1234");
    }

    #[test]
    fn number_ranges() {
        let at_least = normalize(
            FilterKind::Number,
            "amount",
            json!({"start": "1.234,56", "end": "", "thousands": ".", "decimal": ","}),
        );
        assert_eq!(
            at_least,
            Some(FieldFilter::Number {
                field: "amount".to_string(),
                range: NumberRange::AtLeast(1234.56),
            })
        );

        let at_most = normalize(FilterKind::Number, "amount", json!({"end": "10"}));
        assert!(matches!(
            at_most,
            Some(FieldFilter::Number {
                range: NumberRange::AtMost(n),
                ..
            }) if n == 10.0
        ));

        let between = normalize(FilterKind::Number, "amount", json!({"start": "1", "end": "2"}));
        assert!(matches!(
            between,
            Some(FieldFilter::Number {
                range: NumberRange::Between(NumberBound::Numeric(_), NumberBound::Numeric(_)),
                ..
            })
        ));

        assert!(normalize(FilterKind::Number, "amount", json!({"thousands": "."})).is_none());
    }

    #[test]
    fn number_between_keeps_text_when_unparseable() {
        let between = normalize(FilterKind::Number, "code", json!({"start": "A1", "end": "B2"}));
        assert_eq!(
            between,
            Some(FieldFilter::Number {
                field: "code".to_string(),
                range: NumberRange::Between(
                    NumberBound::Text("A1".to_string()),
                    NumberBound::Text("B2".to_string()),
                ),
            })
        );
    }

    #[test]
    fn number_single_bound_garbage_is_skipped() {
        assert!(normalize(FilterKind::Number, "amount", json!({"start": "abc"})).is_none());
    }

    #[test]
    fn number_non_finite_bounds_are_not_numeric() {
        for value in ["inf", "-infinity", "NaN", "1e999"] {
            assert!(
                normalize(FilterKind::Number, "amount", json!({"start": value})).is_none(),
                "{value}"
            );
            assert!(
                normalize(FilterKind::Number, "amount", json!({"end": value})).is_none(),
                "{value}"
            );
        }

        let between = normalize(FilterKind::Number, "amount", json!({"start": "1", "end": "inf"}));
        assert_eq!(
            between,
            Some(FieldFilter::Number {
                field: "amount".to_string(),
                range: NumberRange::Between(
                    NumberBound::Text("1".to_string()),
                    NumberBound::Text("inf".to_string()),
                ),
            })
        );
    }

    #[test]
    fn number_json_numbers_skip_locale_rewrite() {
        let between = normalize(
            FilterKind::Number,
            "amount",
            json!({"start": 1.5, "end": 1000, "thousands": ".", "decimal": ","}),
        );
        assert_eq!(
            between,
            Some(FieldFilter::Number {
                field: "amount".to_string(),
                range: NumberRange::Between(
                    NumberBound::Numeric(1.5),
                    NumberBound::Numeric(1000.0),
                ),
            })
        );
    }
}
