use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Length of the random part of every resource identifier.
pub const ID_SUFFIX_LEN: usize = 24;
pub const IBAN_MIN_LEN: usize = 15;
pub const IBAN_MAX_LEN: usize = 34;
pub const CURRENCY_CODE_LEN: usize = 3;

/// A single broken field rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", describe(.field, .rule))]
pub struct Violation {
    pub field: String,
    pub rule: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule: rule.into(),
        }
    }

    /// Re-anchor the violation under a parent path, e.g. `[2]` + `iban` -> `[2].iban`.
    #[must_use]
    pub fn nested_under(mut self, parent: &str) -> Self {
        self.field = if self.field.is_empty() {
            parent.to_string()
        } else {
            format!("{}.{}", parent, self.field)
        };
        self
    }
}

fn describe(field: &str, rule: &str) -> String {
    if field.is_empty() {
        rule.to_string()
    } else {
        format!("{}: {}", field, rule)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    if violations.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = violations.iter().map(ToString::to_string).collect();
    format!(": {}", parts.join("; "))
}

/// Every rule a response item broke, grouped under the schema it was checked against.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {schema}{}", join_violations(.violations))]
pub struct ValidationError {
    schema: &'static str,
    violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(schema: &'static str, violations: Vec<Violation>) -> Self {
        Self { schema, violations }
    }

    pub fn schema(&self) -> &'static str {
        self.schema
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Whether any violation concerns `field` (exact path match).
    pub fn mentions(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

pub fn resource_id(field: &str, value: &str, prefix: &str) -> Result<String, Violation> {
    let valid = value
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|suffix| {
            suffix.len() == ID_SUFFIX_LEN && suffix.chars().all(|c| c.is_ascii_alphanumeric())
        });

    if valid {
        Ok(value.to_string())
    } else {
        Err(Violation::new(
            field,
            format!(
                "must match {}_ followed by {} alphanumeric characters",
                prefix, ID_SUFFIX_LEN
            ),
        ))
    }
}

/// Whitespace is significant: `" "` is a valid non-empty string.
pub fn non_empty(field: &str, value: &str) -> Result<String, Violation> {
    if value.is_empty() {
        Err(Violation::new(field, "must not be empty"))
    } else {
        Ok(value.to_string())
    }
}

pub fn currency_code(field: &str, value: &str) -> Result<String, Violation> {
    if value.chars().count() == CURRENCY_CODE_LEN {
        Ok(value.to_string())
    } else {
        Err(Violation::new(
            field,
            format!("must be exactly {} characters", CURRENCY_CODE_LEN),
        ))
    }
}

/// The only normalizing validator: a valid IBAN comes back uppercased.
pub fn iban(field: &str, value: &str) -> Result<String, Violation> {
    let len = value.chars().count();
    if !(IBAN_MIN_LEN..=IBAN_MAX_LEN).contains(&len) {
        return Err(Violation::new(
            field,
            format!(
                "length must be between {} and {} characters, got {}",
                IBAN_MIN_LEN, IBAN_MAX_LEN, len
            ),
        ));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Violation::new(field, "must be alphanumeric"));
    }
    Ok(value.to_ascii_uppercase())
}

/// Closed set of wire codes (account type, balance type, ...).
pub trait Code: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn as_code(self) -> &'static str;

    fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_code() == code)
    }
}

pub fn code<T: Code>(field: &str, value: &str) -> Result<T, Violation> {
    T::from_code(value).ok_or_else(|| {
        let allowed: Vec<&str> = T::ALL.iter().map(|c| c.as_code()).collect();
        Violation::new(
            field,
            format!("unknown code '{}', expected one of {}", value, allowed.join("|")),
        )
    })
}

pub fn date(field: &str, value: &str) -> Result<NaiveDate, Violation> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| Violation::new(field, format!("invalid date '{}': {}", value, e)))
}

/// RFC 3339 first; naive ISO-8601 date-times (seconds optional) are taken as UTC.
pub fn timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, Violation> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Violation::new(field, format!("invalid timestamp '{}'", value)))
}

/// Pulls typed fields out of a JSON object, recording every violation instead of
/// stopping at the first one.
///
/// Each accessor returns `None` exactly when it recorded a violation, so a schema
/// can build itself once every accessor returned `Some`.
pub struct FieldReader<'a> {
    schema: &'static str,
    fields: &'a Map<String, Value>,
    violations: Vec<Violation>,
}

impl<'a> FieldReader<'a> {
    pub fn new(schema: &'static str, value: &'a Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(fields) => Ok(Self {
                schema,
                fields,
                violations: Vec::new(),
            }),
            other => Err(ValidationError::new(
                schema,
                vec![Violation::new(
                    "",
                    format!("expected a JSON object, got {}", json_type(other)),
                )],
            )),
        }
    }

    fn record<T>(&mut self, result: Result<T, Violation>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(violation) => {
                self.violations.push(violation);
                None
            }
        }
    }

    fn str_field(&mut self, field: &str) -> Option<&'a str> {
        let fields = self.fields;
        let result = match fields.get(field) {
            None => Err(Violation::new(field, "field required")),
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(other) => Err(Violation::new(
                field,
                format!("expected a string, got {}", json_type(other)),
            )),
        };
        self.record(result)
    }

    /// Missing and `null` both mean absent.
    fn optional_str_field(&mut self, field: &str) -> Option<Option<&'a str>> {
        let fields = self.fields;
        let result = match fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(Violation::new(
                field,
                format!("expected a string or null, got {}", json_type(other)),
            )),
        };
        self.record(result)
    }

    fn with_str<T>(
        &mut self,
        field: &str,
        rule: impl FnOnce(&str, &str) -> Result<T, Violation>,
    ) -> Option<T> {
        let raw = self.str_field(field)?;
        self.record(rule(field, raw))
    }

    fn with_optional_str<T>(
        &mut self,
        field: &str,
        rule: impl FnOnce(&str, &str) -> Result<T, Violation>,
    ) -> Option<Option<T>> {
        match self.optional_str_field(field)? {
            None => Some(None),
            Some(raw) => self.record(rule(field, raw)).map(Some),
        }
    }

    pub fn id(&mut self, field: &str, prefix: &str) -> Option<String> {
        self.with_str(field, |f, v| resource_id(f, v, prefix))
    }

    pub fn non_empty(&mut self, field: &str) -> Option<String> {
        self.with_str(field, non_empty)
    }

    pub fn currency(&mut self, field: &str) -> Option<String> {
        self.with_str(field, currency_code)
    }

    pub fn optional_currency(&mut self, field: &str) -> Option<Option<String>> {
        self.with_optional_str(field, currency_code)
    }

    pub fn iban(&mut self, field: &str) -> Option<String> {
        self.with_str(field, iban)
    }

    pub fn code<T: Code>(&mut self, field: &str) -> Option<T> {
        self.with_str(field, code::<T>)
    }

    pub fn date(&mut self, field: &str) -> Option<NaiveDate> {
        self.with_str(field, date)
    }

    pub fn timestamp(&mut self, field: &str) -> Option<DateTime<Utc>> {
        self.with_str(field, timestamp)
    }

    pub fn optional_timestamp(&mut self, field: &str) -> Option<Option<DateTime<Utc>>> {
        self.with_optional_str(field, timestamp)
    }

    /// Amounts are integral minor units; floats and numeric strings are rejected.
    pub fn integer(&mut self, field: &str) -> Option<i64> {
        let result = match self.fields.get(field) {
            None => Err(Violation::new(field, "field required")),
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| Violation::new(field, format!("expected an integer, got {}", n))),
            Some(other) => Err(Violation::new(
                field,
                format!("expected an integer, got {}", json_type(other)),
            )),
        };
        self.record(result)
    }

    pub fn into_error(self) -> ValidationError {
        ValidationError::new(self.schema, self.violations)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// What to do with list items that fail their schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListPolicy {
    /// One bad item fails the whole list.
    #[default]
    FailFast,
    /// Bad items are logged and dropped; the rest are returned.
    SkipInvalid,
}

/// Validate every element of a JSON array with `parse`.
///
/// Violations are reported against `[index].field` so a caller can tell which
/// element broke which rule.
pub fn validate_list<T>(
    schema: &'static str,
    value: &Value,
    policy: ListPolicy,
    parse: impl Fn(&Value) -> Result<T, ValidationError>,
) -> Result<Vec<T>, ValidationError> {
    let Value::Array(items) = value else {
        return Err(ValidationError::new(
            schema,
            vec![Violation::new(
                "",
                format!("expected a JSON array, got {}", json_type(value)),
            )],
        ));
    };

    let mut parsed = Vec::with_capacity(items.len());
    let mut violations = Vec::new();

    for (index, item) in items.iter().enumerate() {
        match parse(item) {
            Ok(entry) => parsed.push(entry),
            Err(err) => match policy {
                ListPolicy::FailFast => {
                    let parent = format!("[{}]", index);
                    violations.extend(
                        err.violations
                            .into_iter()
                            .map(|v| v.nested_under(&parent)),
                    );
                }
                ListPolicy::SkipInvalid => {
                    tracing::warn!(schema, index, error = %err, "Skipping invalid list item");
                }
            },
        }
    }

    if violations.is_empty() {
        Ok(parsed)
    } else {
        Err(ValidationError::new(schema, violations))
    }
}
