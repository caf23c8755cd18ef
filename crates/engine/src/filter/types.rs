//! Filter engine input types.
//!
//! Provides type definitions for what a data grid posts back:
//! - FilterKind / TextOperator: closed sets of filter kinds and text operators
//! - FilterSpec: per-kind field → raw value maps plus text operator overrides
//! - Column: searchable column descriptors
//! - RelationSearchMap: related tables that take part in free-text search

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::error::{FilterError, FilterResult};

/// Key under which per-field text operator overrides are posted.
pub const INPUT_TEXT_OPTIONS_KEY: &str = "input_text_options";

/// The six kinds of filter a grid can post.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// `[start, end]` date-time range.
    DatePicker,
    /// `{id, values}` list, matched with IN.
    MultiSelect,
    /// Single value, matched with equality.
    Select,
    /// `"true"`, `"false"` or `"all"`.
    Boolean,
    /// Free text, matched with a [`TextOperator`].
    InputText,
    /// `{start, end, thousands, decimal}` numeric range.
    Number,
}

impl FilterKind {
    pub const ALL: [FilterKind; 6] = [
        FilterKind::DatePicker,
        FilterKind::MultiSelect,
        FilterKind::Select,
        FilterKind::Boolean,
        FilterKind::InputText,
        FilterKind::Number,
    ];

    /// Wire name, e.g. `"multi_select"`.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterKind::DatePicker => "date_picker",
            FilterKind::MultiSelect => "multi_select",
            FilterKind::Select => "select",
            FilterKind::Boolean => "boolean",
            FilterKind::InputText => "input_text",
            FilterKind::Number => "number",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == key)
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text matching operators for [`FilterKind::InputText`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TextOperator {
    /// `field = value`
    Is,
    /// `field != value`
    IsNot,
    /// `field LIKE value%`
    StartsWith,
    /// `field LIKE %value`
    EndsWith,
    /// `field LIKE %value%`
    #[default]
    Contains,
    /// `field NOT LIKE %value%`
    ContainsNot,
    /// `field = '' OR field IS NULL`
    IsEmpty,
    /// `field != '' AND field IS NOT NULL`
    IsNotEmpty,
    /// `field IS NULL`
    IsNull,
    /// `field IS NOT NULL`
    IsNotNull,
    /// `field = ''`
    IsBlank,
    /// `field != '' OR field IS NULL`
    IsNotBlank,
}

impl TextOperator {
    pub const ALL: [TextOperator; 12] = [
        TextOperator::Is,
        TextOperator::IsNot,
        TextOperator::StartsWith,
        TextOperator::EndsWith,
        TextOperator::Contains,
        TextOperator::ContainsNot,
        TextOperator::IsEmpty,
        TextOperator::IsNotEmpty,
        TextOperator::IsNull,
        TextOperator::IsNotNull,
        TextOperator::IsBlank,
        TextOperator::IsNotBlank,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TextOperator::Is => "is",
            TextOperator::IsNot => "is_not",
            TextOperator::StartsWith => "starts_with",
            TextOperator::EndsWith => "ends_with",
            TextOperator::Contains => "contains",
            TextOperator::ContainsNot => "contains_not",
            TextOperator::IsEmpty => "is_empty",
            TextOperator::IsNotEmpty => "is_not_empty",
            TextOperator::IsNull => "is_null",
            TextOperator::IsNotNull => "is_not_null",
            TextOperator::IsBlank => "is_blank",
            TextOperator::IsNotBlank => "is_not_blank",
        }
    }

    /// Case-insensitive lookup by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }
}

impl fmt::Display for TextOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All fields filtered by one kind, in posting order.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGroup {
    pub kind: FilterKind,
    pub fields: Vec<(String, JsonValue)>,
}

/// Everything a grid posts for one filter pass.
///
/// Raw values stay as JSON until the engine normalizes them; their shape
/// depends on the kind (see [`FieldFilter`](super::FieldFilter)).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "JsonValue")]
pub struct FilterSpec {
    groups: Vec<FilterGroup>,
    input_text_options: Vec<(String, String)>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the raw value for `field` under `kind`.
    pub fn with_filter(
        mut self,
        kind: FilterKind,
        field: impl Into<String>,
        value: JsonValue,
    ) -> Self {
        let field = field.into();
        let group = match self.groups.iter().position(|g| g.kind == kind) {
            Some(i) => &mut self.groups[i],
            None => {
                self.groups.push(FilterGroup {
                    kind,
                    fields: Vec::new(),
                });
                let last = self.groups.len() - 1;
                &mut self.groups[last]
            }
        };

        match group.fields.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = value,
            None => group.fields.push((field, value)),
        }
        self
    }

    /// Override the text operator used for `field`. The name is matched
    /// case-insensitively when the filter runs.
    pub fn with_text_option(
        mut self,
        field: impl Into<String>,
        operator: impl Into<String>,
    ) -> Self {
        let field = field.into();
        let operator = operator.into();
        match self.input_text_options.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = operator,
            None => self.input_text_options.push((field, operator)),
        }
        self
    }

    pub fn groups(&self) -> &[FilterGroup] {
        &self.groups
    }

    /// Raw operator override posted for `field`, if any.
    pub fn text_option(&self, field: &str) -> Option<&str> {
        self.input_text_options
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, op)| op.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.fields.is_empty())
    }

    /// Parse the JSON object a grid posts, e.g.
    /// `{"select": {"status": "active"}, "input_text_options": {"name": "is"}}`.
    ///
    /// Only the outer shape is checked here. Field values are interpreted
    /// when the filter runs.
    pub fn from_json(value: &JsonValue) -> FilterResult<Self> {
        let object = value.as_object().ok_or(FilterError::InvalidShape {
            what: "filter spec",
            expected: "an object keyed by filter kind",
        })?;

        let mut spec = Self::new();
        for (key, fields) in object {
            if key == INPUT_TEXT_OPTIONS_KEY {
                for (field, operator) in expect_object(fields, "input_text_options")? {
                    match operator.as_str() {
                        Some(op) => spec = spec.with_text_option(field.clone(), op),
                        None => {
                            debug!(field = %field, "ignoring non-string text operator override");
                        }
                    }
                }
                continue;
            }

            let kind =
                FilterKind::from_key(key).ok_or_else(|| FilterError::UnknownKind(key.clone()))?;
            for (field, raw) in expect_object(fields, "filter group")? {
                spec = spec.with_filter(kind, field.clone(), raw.clone());
            }
        }
        Ok(spec)
    }

    pub fn from_json_str(input: &str) -> FilterResult<Self> {
        Self::from_json(&serde_json::from_str(input)?)
    }
}

impl TryFrom<JsonValue> for FilterSpec {
    type Error = FilterError;

    fn try_from(value: JsonValue) -> FilterResult<Self> {
        Self::from_json(&value)
    }
}

fn expect_object<'v>(
    value: &'v JsonValue,
    what: &'static str,
) -> FilterResult<&'v Map<String, JsonValue>> {
    value.as_object().ok_or(FilterError::InvalidShape {
        what,
        expected: "an object keyed by field name",
    })
}

/// A grid column as far as free-text search is concerned.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    /// Field name; dotted (`table.column`) for a joined table.
    pub field: String,

    /// Overrides `field` for searching when set and non-empty.
    #[serde(default, alias = "dataField")]
    pub data_field: Option<String>,

    #[serde(default)]
    pub searchable: bool,
}

impl Column {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Default::default()
        }
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn with_data_field(mut self, data_field: impl Into<String>) -> Self {
        self.data_field = Some(data_field.into());
        self
    }

    /// Field used for searching: the data field override, else the field.
    /// `None` when both are empty.
    pub fn search_field(&self) -> Option<&str> {
        self.data_field
            .as_deref()
            .filter(|f| !f.is_empty())
            .or(Some(self.field.as_str()).filter(|f| !f.is_empty()))
    }
}

/// Something searched inside a related table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationTarget {
    /// A column on the related table.
    Column(String),
    /// Columns on a relation of the related table.
    Nested {
        relation: String,
        columns: Vec<String>,
    },
}

/// The value posted for one relation in the search map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationEntry {
    Targets(Vec<RelationTarget>),
    /// Neither a list nor a map. Searching stops at the first one.
    Malformed,
}

/// Related tables taking part in free-text search, in declaration order.
///
/// JSON form: `{"posts": ["title", "body"], "team": {"members": ["name"]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "JsonValue")]
pub struct RelationSearchMap {
    entries: Vec<(String, RelationEntry)>,
}

impl RelationSearchMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search `columns` on the related table reached through `relation`.
    pub fn with_columns<I, S>(self, relation: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let targets = columns
            .into_iter()
            .map(|c| RelationTarget::Column(c.into()))
            .collect();
        self.with_targets(relation, targets)
    }

    /// Search `columns` two levels deep, through `relation` then `nested`.
    pub fn with_nested<I, S>(self, relation: &str, nested: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let target = RelationTarget::Nested {
            relation: nested.to_string(),
            columns: columns.into_iter().map(Into::into).collect(),
        };
        self.with_targets(relation, vec![target])
    }

    /// Append a raw entry.
    pub fn with_entry(mut self, relation: &str, entry: RelationEntry) -> Self {
        self.entries.push((relation.to_string(), entry));
        self
    }

    fn with_targets(mut self, relation: &str, mut targets: Vec<RelationTarget>) -> Self {
        let existing = self.entries.iter_mut().find(|(name, entry)| {
            name == relation && matches!(entry, RelationEntry::Targets(_))
        });
        match existing {
            Some((_, RelationEntry::Targets(current))) => current.append(&mut targets),
            _ => self
                .entries
                .push((relation.to_string(), RelationEntry::Targets(targets))),
        }
        self
    }

    pub fn entries(&self) -> &[(String, RelationEntry)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse the relation-search map.
    ///
    /// A relation whose value is neither a list nor a map is kept as
    /// [`RelationEntry::Malformed`]; non-string column names are dropped.
    pub fn from_json(value: &JsonValue) -> FilterResult<Self> {
        let object = value.as_object().ok_or(FilterError::InvalidShape {
            what: "relation search",
            expected: "an object keyed by relation name",
        })?;

        let entries = object
            .iter()
            .map(|(relation, value)| (relation.clone(), relation_entry(value)))
            .collect();
        Ok(Self { entries })
    }

    pub fn from_json_str(input: &str) -> FilterResult<Self> {
        Self::from_json(&serde_json::from_str(input)?)
    }
}

impl TryFrom<JsonValue> for RelationSearchMap {
    type Error = FilterError;

    fn try_from(value: JsonValue) -> FilterResult<Self> {
        Self::from_json(&value)
    }
}

fn relation_entry(value: &JsonValue) -> RelationEntry {
    match value {
        JsonValue::Array(items) => RelationEntry::Targets(
            items
                .iter()
                .filter_map(JsonValue::as_str)
                .map(|c| RelationTarget::Column(c.to_string()))
                .collect(),
        ),
        JsonValue::Object(map) => RelationEntry::Targets(
            map.iter()
                .filter_map(|(key, value)| match value {
                    JsonValue::Array(columns) => Some(RelationTarget::Nested {
                        relation: key.clone(),
                        columns: columns
                            .iter()
                            .filter_map(JsonValue::as_str)
                            .map(str::to_string)
                            .collect(),
                    }),
                    JsonValue::String(column) => Some(RelationTarget::Column(column.clone())),
                    _ => None,
                })
                .collect(),
        ),
        _ => RelationEntry::Malformed,
    }
}
