//! Explicit entity schema.
//!
//! Field names, types and validation rules are declared as plain data in
//! [`USER_INPUT_SCHEMA`]. The same table drives input validation in the
//! service and the column definitions of the `users` table.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// `local@domain.tld`: one `@`, no whitespace, a dot in the domain.
static EMAIL_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Non-empty after trimming.
    Required,
    /// At most this many characters.
    MaxLength(usize),
    /// Syntactically valid email address.
    Email,
    /// No control characters (NUL, newline, tab and the like).
    NoControlChars,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub rules: &'static [FieldRule],
}

impl FieldSpec {
    /// Longest value the field accepts, if bounded.
    pub fn max_length(&self) -> Option<usize> {
        self.rules.iter().find_map(|rule| match rule {
            FieldRule::MaxLength(n) => Some(*n),
            _ => None,
        })
    }

    /// Check `value` against every rule, in declaration order.
    pub fn check(&self, value: &str) -> Result<(), ValidationError> {
        for rule in self.rules {
            match rule {
                FieldRule::Required if value.trim().is_empty() => {
                    return Err(ValidationError::new(self.name, "must not be empty"));
                }
                FieldRule::MaxLength(max) if value.chars().count() > *max => {
                    return Err(ValidationError::new(
                        self.name,
                        format!("must be at most {max} characters"),
                    ));
                }
                FieldRule::Email if !is_valid_email(value) => {
                    return Err(ValidationError::new(
                        self.name,
                        "must be a valid email address",
                    ));
                }
                FieldRule::NoControlChars if value.chars().any(char::is_control) => {
                    return Err(ValidationError::new(
                        self.name,
                        "must not contain control characters",
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EntitySchema {
    pub entity: &'static str,
    pub table: &'static str,
    pub fields: &'static [FieldSpec],
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate `(field, value)` pairs. Reports the first violation in field
    /// declaration order; a declared field missing from `values` counts as empty.
    pub fn validate(&self, values: &[(&str, &str)]) -> Result<(), ValidationError> {
        for spec in self.fields {
            let value = values
                .iter()
                .find(|(name, _)| *name == spec.name)
                .map(|(_, v)| *v)
                .unwrap_or("");
            spec.check(value)?;
        }
        for (name, _) in values {
            if self.field(name).is_none() {
                return Err(ValidationError::new(
                    *name,
                    format!("is not a field of {}", self.entity),
                ));
            }
        }
        Ok(())
    }
}

pub const USER_INPUT_SCHEMA: EntitySchema = EntitySchema {
    entity: "User",
    table: "users",
    fields: &[
        FieldSpec {
            name: "name",
            ty: FieldType::String,
            rules: &[
                FieldRule::Required,
                FieldRule::NoControlChars,
                FieldRule::MaxLength(255),
            ],
        },
        FieldSpec {
            name: "email",
            ty: FieldType::String,
            rules: &[
                FieldRule::Required,
                FieldRule::NoControlChars,
                FieldRule::MaxLength(320),
                FieldRule::Email,
            ],
        },
    ],
};

fn is_valid_email(value: &str) -> bool {
    match EMAIL_PATTERN.as_ref() {
        Some(pattern) => pattern.is_match(value),
        None => false,
    }
}

/// Input failed a field rule. Never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}
