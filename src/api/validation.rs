//! Validation Gate.
//!
//! Each write operation declares the body fields it accepts and the rule each
//! field must satisfy. [`validate`] checks a raw JSON body against that
//! declaration and returns the normalized object, or every violation found in
//! declaration order. [`Validated`] runs the gate as an axum extractor, so a
//! rejected body never reaches the handler.

use super::error::ApiError;
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;
use utoipa::ToSchema;

pub const NAME_MAX_LENGTH: usize = 100;
pub const PASSWORD_MIN_LENGTH: usize = 6;
pub const PASSWORD_MAX_LENGTH: usize = 32;
/// bcrypt ignores everything past this many bytes.
pub const PASSWORD_MAX_BYTES: usize = 72;

/// Operations guarded by a body schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateUser,
    UpdateUser,
    PatchPassword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    /// Trimmed text with a bounded length.
    Name { min: usize, max: usize },
    /// Trimmed, lowercased address.
    Email,
    /// Taken verbatim.
    Password { min: usize, max: usize },
}

#[derive(Debug, Clone, Copy)]
struct FieldSpec {
    key: &'static str,
    rule: Rule,
    required: bool,
}

const fn name(key: &'static str) -> FieldSpec {
    FieldSpec {
        key,
        rule: Rule::Name {
            min: 1,
            max: NAME_MAX_LENGTH,
        },
        required: true,
    }
}

const fn email(key: &'static str) -> FieldSpec {
    FieldSpec {
        key,
        rule: Rule::Email,
        required: true,
    }
}

const fn password(key: &'static str, required: bool) -> FieldSpec {
    FieldSpec {
        key,
        rule: Rule::Password {
            min: PASSWORD_MIN_LENGTH,
            max: PASSWORD_MAX_LENGTH,
        },
        required,
    }
}

const CREATE_USER: &[FieldSpec] = &[
    name("name"),
    email("email"),
    password("password", true),
    password("confirmPassword", true),
];

const UPDATE_USER: &[FieldSpec] = &[
    name("name"),
    email("email"),
    password("password", false),
    password("confirmPassword", false),
];

const PATCH_PASSWORD: &[FieldSpec] = &[
    password("oldPassword", true),
    password("newPassword", true),
    password("confirmNewPassword", true),
];

impl Operation {
    const fn fields(self) -> &'static [FieldSpec] {
        match self {
            Self::CreateUser => CREATE_USER,
            Self::UpdateUser => UPDATE_USER,
            Self::PatchPassword => PATCH_PASSWORD,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateUser => "create",
            Self::UpdateUser => "update",
            Self::PatchPassword => "patch-password",
        }
    }
}

/// One violated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldViolation {
    pub field: String,
    /// Machine-readable reason: `required`, `invalid_type`, `empty`,
    /// `too_short`, `too_long`, `invalid_format`, `unknown_field`.
    #[schema(value_type = String)]
    pub code: &'static str,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &str, code: &'static str, message: String) -> Self {
        Self {
            field: field.to_string(),
            code,
            message,
        }
    }
}

/// Non-empty list of violations. Displays as the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    violations: Vec<FieldViolation>,
}

impl ValidationFailure {
    /// Failure not tied to a single field (unreadable body).
    #[must_use]
    pub fn body(message: impl Into<String>) -> Self {
        Self {
            violations: vec![FieldViolation {
                field: String::new(),
                code: "invalid_body",
                message: message.into(),
            }],
        }
    }

    #[must_use]
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    #[must_use]
    pub fn into_violations(self) -> Vec<FieldViolation> {
        self.violations
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.violations.first() {
            Some(violation) => f.write_str(&violation.message),
            None => f.write_str("Invalid request"),
        }
    }
}

impl std::error::Error for ValidationFailure {}

/// Lightweight email sanity check: one `@`, a dotted domain, no whitespace.
#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

fn check_length(key: &str, value: &str, min: usize, max: usize) -> Option<FieldViolation> {
    let length = value.chars().count();
    if length == 0 {
        Some(FieldViolation::new(
            key,
            "empty",
            format!("\"{key}\" is not allowed to be empty"),
        ))
    } else if length < min {
        Some(FieldViolation::new(
            key,
            "too_short",
            format!("\"{key}\" length must be at least {min} characters long"),
        ))
    } else if length > max {
        Some(FieldViolation::new(
            key,
            "too_long",
            format!("\"{key}\" length must be less than or equal to {max} characters long"),
        ))
    } else {
        None
    }
}

impl Rule {
    fn normalize(self, value: &str) -> String {
        match self {
            Self::Name { .. } => value.trim().to_string(),
            Self::Email => value.trim().to_lowercase(),
            Self::Password { .. } => value.to_string(),
        }
    }

    fn check(self, key: &str, value: &str) -> Option<FieldViolation> {
        match self {
            Self::Name { min, max } => check_length(key, value, min, max),
            Self::Password { min, max } => check_length(key, value, min, max).or_else(|| {
                (value.len() > PASSWORD_MAX_BYTES).then(|| {
                    FieldViolation::new(
                        key,
                        "too_long",
                        format!("\"{key}\" must be at most {PASSWORD_MAX_BYTES} bytes long"),
                    )
                })
            }),
            Self::Email if value.is_empty() => Some(FieldViolation::new(
                key,
                "empty",
                format!("\"{key}\" is not allowed to be empty"),
            )),
            Self::Email if !valid_email(value) => Some(FieldViolation::new(
                key,
                "invalid_format",
                format!("\"{key}\" must be a valid email"),
            )),
            Self::Email => None,
        }
    }
}

/// Check `body` against the schema of `operation`.
///
/// # Errors
/// Returns every violation, in field declaration order followed by unknown
/// keys, when the body does not satisfy the schema.
pub fn validate(operation: Operation, body: Value) -> Result<Map<String, Value>, ValidationFailure> {
    let Value::Object(mut body) = body else {
        return Err(ValidationFailure::body("\"value\" must be of type object"));
    };

    let fields = operation.fields();
    let mut violations = Vec::new();
    let mut normalized = Map::new();

    for field in fields {
        match body.remove(field.key) {
            None | Some(Value::Null) if field.required => violations.push(FieldViolation::new(
                field.key,
                "required",
                format!("\"{}\" is required", field.key),
            )),
            None | Some(Value::Null) => {}
            Some(Value::String(raw)) => {
                let value = field.rule.normalize(&raw);
                match field.rule.check(field.key, &value) {
                    Some(violation) => violations.push(violation),
                    None => {
                        normalized.insert(field.key.to_string(), Value::String(value));
                    }
                }
            }
            Some(_) => violations.push(FieldViolation::new(
                field.key,
                "invalid_type",
                format!("\"{}\" must be a string", field.key),
            )),
        }
    }

    // Whatever is left was not declared by the schema.
    for key in body.keys() {
        violations.push(FieldViolation::new(
            key,
            "unknown_field",
            format!("\"{key}\" is not allowed"),
        ));
    }

    if violations.is_empty() {
        Ok(normalized)
    } else {
        Err(ValidationFailure { violations })
    }
}

/// Request body bound to an operation schema.
pub trait Schema: DeserializeOwned {
    const OPERATION: Operation;
}

/// Extractor that only yields bodies accepted by `T::OPERATION`'s schema.
#[derive(Debug)]
pub struct Validated<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Validated<T>
where
    S: Send + Sync,
    T: Schema,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| ValidationFailure::body(rejection.body_text()))?;

        let normalized = validate(T::OPERATION, body).inspect_err(|failure| {
            debug!(
                operation = T::OPERATION.as_str(),
                violations = failure.violations().len(),
                "request body rejected"
            );
        })?;

        let payload = serde_json::from_value(Value::Object(normalized))
            .map_err(|err| ValidationFailure::body(err.to_string()))?;

        Ok(Self(payload))
    }
}
