//! Form field value objects

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Input format accepted for instant fields
pub const INSTANT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// The static type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Instant,
    Minutes,
    List,
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Instant => "instant",
            Self::Minutes => "minutes",
            Self::List => "list",
        }
    }
}

/// Type-safe field values
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    Instant(DateTime<Utc>),
    Minutes(i64),
    List(Vec<String>),
}

/// Failure to parse user input into a field value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected a date and time as YYYY-MM-DD HH:MM, got {input:?}")]
    Instant { input: String },
    #[error("expected a whole number of minutes, got {input:?}")]
    Minutes { input: String },
}

impl FieldValue {
    /// Blank text and empty lists count as empty
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.iter().all(|i| i.trim().is_empty()),
            FieldValue::Instant(_) | FieldValue::Minutes(_) => false,
        }
    }

    /// Whether this value can be stored in a field of `kind`.
    /// `Empty` fits every kind.
    pub fn fits(&self, kind: FieldKind) -> bool {
        matches!(
            (self, kind),
            (FieldValue::Empty, _)
                | (FieldValue::Text(_), FieldKind::Text)
                | (FieldValue::Instant(_), FieldKind::Instant)
                | (FieldValue::Minutes(_), FieldKind::Minutes)
                | (FieldValue::List(_), FieldKind::List)
        )
    }

    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Instant(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_minutes(&self) -> Option<i64> {
        match self {
            FieldValue::Minutes(m) => Some(*m),
            _ => None,
        }
    }

    pub fn as_text(&self) -> &str {
        match self {
            FieldValue::Text(s) => s,
            _ => "",
        }
    }

    pub fn as_list(&self) -> &[String] {
        match self {
            FieldValue::List(items) => items,
            _ => &[],
        }
    }

    pub fn instant(t: DateTime<Utc>) -> Self {
        FieldValue::Instant(t)
    }

    pub fn minutes(m: i64) -> Self {
        FieldValue::Minutes(m)
    }

    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    /// Parse raw user input for a field of the given kind.
    ///
    /// Blank input always parses to `Empty`. Lists are comma separated.
    pub fn parse(kind: FieldKind, input: &str) -> Result<Self, ParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(FieldValue::Empty);
        }
        match kind {
            FieldKind::Text => Ok(FieldValue::Text(trimmed.to_string())),
            FieldKind::Minutes => trimmed
                .trim_end_matches("min")
                .trim_end()
                .parse::<i64>()
                .map(FieldValue::Minutes)
                .map_err(|_| ParseError::Minutes {
                    input: input.to_string(),
                }),
            FieldKind::Instant => parse_instant(trimmed)
                .map(FieldValue::Instant)
                .ok_or_else(|| ParseError::Instant {
                    input: input.to_string(),
                }),
            FieldKind::List => Ok(FieldValue::List(
                trimmed
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
        }
    }

    /// Get the display value for rendering
    pub fn display_value(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Instant(t) => t.format(INSTANT_FORMAT).to_string(),
            FieldValue::Minutes(m) => format!("{m} min"),
            FieldValue::List(items) => items.join(", "),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_value())
    }
}

fn parse_instant(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, INSTANT_FORMAT) {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(input) {
        return Some(t.with_timezone(&Utc));
    }
    // A bare date means midnight
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Whole minutes between two instants, `later - earlier`
pub fn minutes_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_minutes()
}

/// `start + minutes`, or `None` when the result leaves chrono's range
pub fn shift_minutes(start: DateTime<Utc>, minutes: i64) -> Option<DateTime<Utc>> {
    TimeDelta::try_minutes(minutes).and_then(|delta| start.checked_add_signed(delta))
}

/// Who wrote a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// An explicit user edit
    User,
    /// A derived or loaded write
    System,
}

/// Represents a single form field with its configuration and live state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub value: FieldValue,
    pub touched_by_user: bool,
    pub enabled: bool,
    /// Required regardless of exclusivity group state
    pub required: bool,
    pub required_now: bool,
}

impl Field {
    pub fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            value: FieldValue::Empty,
            touched_by_user: false,
            enabled: true,
            required: false,
            required_now: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.required_now = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Clear the field value
    pub fn clear(&mut self) {
        self.value = FieldValue::Empty;
    }
}

/// The fields of one session, in declaration order
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    items: Vec<Field>,
    index: HashMap<String, usize>,
}

impl FieldSet {
    /// Returns `false` if a field with the same name already exists
    pub fn insert(&mut self, field: Field) -> bool {
        if self.index.contains_key(&field.name) {
            return false;
        }
        self.index.insert(field.name.clone(), self.items.len());
        self.items.push(field);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&i| &self.items[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Field> {
        match self.index.get(name) {
            Some(&i) => self.items.get_mut(i),
            None => None,
        }
    }

    /// Declaration position, used to order errors
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// The value of `name`, `Empty` for unknown fields
    pub fn value(&self, name: &str) -> &FieldValue {
        const EMPTY: &FieldValue = &FieldValue::Empty;
        self.get(name).map(|f| &f.value).unwrap_or(EMPTY)
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.get(name).is_some_and(|f| f.touched_by_user)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Field> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
