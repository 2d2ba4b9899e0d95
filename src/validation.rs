//! Declarative field validation for request types.
//!
//! Each request type lists its fields together with the constraints that
//! apply to them by implementing [Validate]. [validate] then checks every
//! field and collects all violations instead of stopping at the first one.
//!
//! Empty optional values are skipped unless the field is [Constraint::Required].

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

/// A rule that a field value must satisfy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    /// Text must be present and not blank, numbers must be present.
    Required,
    /// Text must not be longer than this many characters.
    MaxChars(usize),
    /// Numbers must be finite and no smaller than this.
    Min(f64),
    /// Numbers must be finite and no larger than this.
    Max(f64),
    /// Text must be a hyphenated or simple UUID.
    Uuid,
    /// Text must be an RFC 3339 date-time, e.g. "2024-03-15T10:00:00Z".
    Rfc3339,
    /// Text must be exactly one of the listed values.
    OneOf(&'static [&'static str]),
}

/// The value of a field to be checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(Option<&'a str>),
    Number(Option<f64>),
}

impl FieldValue<'_> {
    fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.is_none_or(|text| text.trim().is_empty()),
            FieldValue::Number(number) => number.is_none(),
        }
    }
}

/// A field name, its value and the constraints it must satisfy.
#[derive(Debug, Clone, Copy)]
pub struct Field<'a> {
    pub name: &'static str,
    pub value: FieldValue<'a>,
    pub constraints: &'static [Constraint],
}

impl<'a> Field<'a> {
    pub fn text(name: &'static str, value: &'a str, constraints: &'static [Constraint]) -> Self {
        Self {
            name,
            value: FieldValue::Text(Some(value)),
            constraints,
        }
    }

    pub fn optional_text(
        name: &'static str,
        value: Option<&'a str>,
        constraints: &'static [Constraint],
    ) -> Self {
        Self {
            name,
            value: FieldValue::Text(value),
            constraints,
        }
    }

    pub fn number(name: &'static str, value: f64, constraints: &'static [Constraint]) -> Self {
        Self {
            name,
            value: FieldValue::Number(Some(value)),
            constraints,
        }
    }

    pub fn optional_number(
        name: &'static str,
        value: Option<f64>,
        constraints: &'static [Constraint],
    ) -> Self {
        Self {
            name,
            value: FieldValue::Number(value),
            constraints,
        }
    }
}

/// Implemented by request types that can be checked with [validate].
pub trait Validate {
    /// The fields of the type and the constraints on each of them.
    fn fields(&self) -> Vec<Field<'_>>;
}

/// A single failed constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_owned(),
            message: message.to_owned(),
        }
    }
}

/// Every violation found while validating a value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(Vec<FieldViolation>);

impl ValidationErrors {
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self(violations)
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<FieldViolation> {
        self.0
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self
            .0
            .iter()
            .map(|violation| format!("{} {}", violation.field, violation.message))
            .collect();

        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Check every field of `input` against its constraints.
///
/// # Errors
/// Returns all the violations if at least one constraint failed.
pub fn validate<T: Validate>(input: &T) -> Result<(), ValidationErrors> {
    let mut violations = Vec::new();

    for field in input.fields() {
        if field.value.is_empty() {
            if field.constraints.contains(&Constraint::Required) {
                violations.push(FieldViolation::new(field.name, "is required"));
            }
            continue;
        }

        violations.extend(
            field
                .constraints
                .iter()
                .filter_map(|constraint| check(constraint, field.value))
                .map(|message| FieldViolation::new(field.name, &message)),
        );
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(violations))
    }
}

/// Returns the violation message if `value` does not satisfy `constraint`.
fn check(constraint: &Constraint, value: FieldValue) -> Option<String> {
    match (constraint, value) {
        (Constraint::Required, _) => None,
        (Constraint::MaxChars(max), FieldValue::Text(Some(text))) => (text.chars().count() > *max)
            .then(|| format!("must be at most {max} characters")),
        (Constraint::Min(min), FieldValue::Number(Some(number))) => {
            (!number.is_finite() || number < *min).then(|| format!("must be at least {min}"))
        }
        (Constraint::Max(max), FieldValue::Number(Some(number))) => {
            (!number.is_finite() || number > *max).then(|| format!("must be at most {max}"))
        }
        (Constraint::Uuid, FieldValue::Text(Some(text))) => Uuid::parse_str(text)
            .is_err()
            .then(|| "must be a valid UUID".to_owned()),
        (Constraint::Rfc3339, FieldValue::Text(Some(text))) => OffsetDateTime::parse(text, &Rfc3339)
            .is_err()
            .then(|| "must be an RFC 3339 date-time".to_owned()),
        (Constraint::OneOf(options), FieldValue::Text(Some(text))) => {
            (!options.iter().any(|option| *option == text))
                .then(|| format!("must be one of: {}", options.join(", ")))
        }
        // Constraints that do not apply to the kind of value never fail.
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Constraint, Field, FieldViolation, Validate, validate};

    struct Request {
        name: String,
        amount: f64,
        kind: Option<String>,
        when: Option<String>,
        owner: String,
        page: Option<u64>,
    }

    impl Validate for Request {
        fn fields(&self) -> Vec<Field<'_>> {
            vec![
                Field::text(
                    "name",
                    &self.name,
                    &[Constraint::Required, Constraint::MaxChars(5)],
                ),
                Field::number("amount", self.amount, &[Constraint::Min(0.0)]),
                Field::optional_text(
                    "kind",
                    self.kind.as_deref(),
                    &[Constraint::OneOf(&["daily", "weekly"])],
                ),
                Field::optional_text("when", self.when.as_deref(), &[Constraint::Rfc3339]),
                Field::text("owner", &self.owner, &[Constraint::Uuid]),
                Field::optional_number(
                    "page",
                    self.page.map(|page| page as f64),
                    &[Constraint::Min(1.0), Constraint::Max(50.0)],
                ),
            ]
        }
    }

    fn valid_request() -> Request {
        Request {
            name: "food".to_owned(),
            amount: 12.5,
            kind: Some("daily".to_owned()),
            when: Some("2024-03-15T10:00:00Z".to_owned()),
            owner: "67e55044-10b1-426f-9247-bb680e5fe0c8".to_owned(),
            page: Some(1),
        }
    }

    #[test]
    fn valid_input_passes() {
        assert_eq!(validate(&valid_request()), Ok(()));
    }

    #[test]
    fn optional_fields_may_be_empty() {
        let request = Request {
            kind: None,
            when: Some("".to_owned()),
            page: None,
            ..valid_request()
        };

        assert_eq!(validate(&request), Ok(()));
    }

    #[test]
    fn collects_every_violation() {
        let request = Request {
            name: "   ".to_owned(),
            amount: -1.0,
            kind: Some("hourly".to_owned()),
            when: Some("yesterday".to_owned()),
            owner: "not-a-uuid".to_owned(),
            page: Some(51),
        };

        let errors = validate(&request).unwrap_err();

        assert_eq!(
            errors.violations(),
            [
                FieldViolation::new("name", "is required"),
                FieldViolation::new("amount", "must be at least 0"),
                FieldViolation::new("kind", "must be one of: daily, weekly"),
                FieldViolation::new("when", "must be an RFC 3339 date-time"),
                FieldViolation::new("owner", "must be a valid UUID"),
                FieldViolation::new("page", "must be at most 50"),
            ]
        );
    }

    #[test]
    fn max_chars_counts_characters_not_bytes() {
        let request = Request {
            name: "🔥🔥🔥🔥🔥".to_owned(),
            ..valid_request()
        };

        assert_eq!(validate(&request), Ok(()));
    }

    #[test]
    fn nan_is_rejected() {
        let request = Request {
            amount: f64::NAN,
            ..valid_request()
        };

        let errors = validate(&request).unwrap_err();

        assert_eq!(
            errors.violations(),
            [FieldViolation::new("amount", "must be at least 0")]
        );
    }
}
