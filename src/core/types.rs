use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::DomainSet;

pub const KEY_CERTBOT_SERVER: &str = "certbot_server";
pub const KEY_DOMAINS: &str = "domains";
pub const KEY_EMAIL: &str = "email";
pub const KEY_S3_BUCKET: &str = "s3_bucket";

/// Input validation failures. These are never retried.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum JobError {
    #[error("event must be a JSON object")]
    NotAnObject,
    #[error("missing required key: {0}")]
    MissingKey(String),
    #[error("Key has an empty value: {0}")]
    EmptyValue(String),
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Batch job handed from the ventilator to the workflow engine, and from the
/// workflow engine to each runner invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub certbot_server: String,
    pub domains: Vec<String>,
    pub email: String,
    pub s3_bucket: String,
}

/// Validated ventilator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VentilatorRequest {
    pub certbot_server: String,
    pub email: String,
    pub s3_bucket: String,
}

impl VentilatorRequest {
    pub fn from_event(event: &Value) -> Result<Self, JobError> {
        let fields = event.as_object().ok_or(JobError::NotAnObject)?;
        Ok(Self {
            certbot_server: required_string(fields, KEY_CERTBOT_SERVER)?,
            email: required_string(fields, KEY_EMAIL)?,
            s3_bucket: required_string(fields, KEY_S3_BUCKET)?,
        })
    }

    pub fn into_job(self, domains: Vec<String>) -> JobDescriptor {
        JobDescriptor {
            certbot_server: self.certbot_server,
            domains,
            email: self.email,
            s3_bucket: self.s3_bucket,
        }
    }
}

/// Validated runner input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionJob {
    pub server: String,
    pub domains: DomainSet,
    pub email: String,
    pub bucket: String,
}

impl ProvisionJob {
    /// Parses a runner event. Every key must be present, and no key in the
    /// event (required or not) may carry an empty value.
    pub fn from_event(event: &Value) -> Result<Self, JobError> {
        let fields = event.as_object().ok_or(JobError::NotAnObject)?;
        for key in [KEY_CERTBOT_SERVER, KEY_DOMAINS, KEY_EMAIL, KEY_S3_BUCKET] {
            if !fields.contains_key(key) {
                return Err(JobError::MissingKey(key.to_string()));
            }
        }
        if let Some((key, _)) = fields.iter().find(|(_, value)| is_empty_value(value)) {
            return Err(JobError::EmptyValue(key.clone()));
        }

        Ok(Self {
            server: required_string(fields, KEY_CERTBOT_SERVER)?,
            domains: parse_domains(&fields[KEY_DOMAINS])?,
            email: required_string(fields, KEY_EMAIL)?,
            bucket: required_string(fields, KEY_S3_BUCKET)?,
        })
    }

    pub fn from_descriptor(job: &JobDescriptor) -> Result<Self, JobError> {
        let event = serde_json::to_value(job).map_err(|err| JobError::InvalidValue {
            key: KEY_DOMAINS.to_string(),
            reason: err.to_string(),
        })?;
        Self::from_event(&event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerResponse {
    pub message: String,
    pub status: ResponseStatus,
}

impl RunnerResponse {
    pub fn success(message: String) -> Self {
        Self {
            message,
            status: ResponseStatus::Success,
        }
    }
}

/// Body printed by the binaries when an invocation fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn required_string(fields: &Map<String, Value>, key: &str) -> Result<String, JobError> {
    match fields.get(key) {
        None => Err(JobError::MissingKey(key.to_string())),
        Some(value) if is_empty_value(value) => Err(JobError::EmptyValue(key.to_string())),
        Some(Value::String(value)) if value.trim().is_empty() => {
            Err(JobError::EmptyValue(key.to_string()))
        }
        Some(Value::String(value)) => Ok(value.trim().to_string()),
        Some(other) => Err(JobError::InvalidValue {
            key: key.to_string(),
            reason: format!("expected a string, found {other}"),
        }),
    }
}

fn parse_domains(value: &Value) -> Result<DomainSet, JobError> {
    let invalid = |reason: String| JobError::InvalidValue {
        key: KEY_DOMAINS.to_string(),
        reason,
    };
    match value {
        Value::String(raw) => DomainSet::parse_list(raw).map_err(|err| invalid(err.to_string())),
        Value::Array(items) => {
            let mut names = Vec::with_capacity(items.len());
            for item in items {
                let name = item
                    .as_str()
                    .ok_or_else(|| invalid(format!("expected a string entry, found {item}")))?;
                names.push(name);
            }
            DomainSet::new(names).map_err(|err| invalid(err.to_string()))
        }
        other => Err(invalid(format!(
            "expected a list or comma-separated string, found {other}"
        ))),
    }
}

/// Falsy values count as empty: `false` and zero are rejected along with
/// null and empty strings, lists and objects.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
