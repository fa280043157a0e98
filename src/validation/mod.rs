//! Field validation for catalog resources.
//!
//! Every validator is a pure function from an object (or a new/old pair) to an [`ErrorList`].
//! An empty list means the object is valid. Errors are reported in field order so callers
//! get a stable message.

mod binding;
mod broker;
mod class;
mod instance;
mod plan;

pub use binding::*;
pub use broker::*;
pub use class::*;
pub use instance::*;
pub use plan::*;

use std::fmt::Display;
use std::sync::LazyLock;

use itertools::Itertools;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use regex::Regex;
use serde_json::Value;

use crate::apis::ParametersFromSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    Required,
    Invalid,
    Forbidden,
    Duplicate,
}

impl Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ErrorType::Required => "Required value",
            ErrorType::Invalid => "Invalid value",
            ErrorType::Forbidden => "Forbidden",
            ErrorType::Duplicate => "Duplicate value",
        })
    }
}

/// A single invalid field, rendered the way the apiserver renders field errors,
/// e.g. `spec.url: Required value`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{field}: {}", describe(.kind, .bad_value, .detail))]
pub struct FieldError {
    pub kind: ErrorType,
    pub field: String,
    pub bad_value: Option<Value>,
    pub detail: String,
}

fn describe(kind: &ErrorType, bad_value: &Option<Value>, detail: &str) -> String {
    let mut out = match (kind, bad_value) {
        (ErrorType::Required | ErrorType::Forbidden, _) | (_, None) => {
            kind.to_string()
        }
        (_, Some(value)) => format!("{kind}: {value}"),
    };
    if !detail.is_empty() {
        out.push_str(": ");
        out.push_str(detail);
    }
    out
}

impl FieldError {
    pub fn required(field: &Path, detail: impl Into<String>) -> Self {
        Self::new(ErrorType::Required, field, None, detail)
    }

    pub fn invalid(field: &Path, value: impl Into<Value>, detail: impl Into<String>) -> Self {
        Self::new(ErrorType::Invalid, field, Some(value.into()), detail)
    }

    pub fn forbidden(field: &Path, detail: impl Into<String>) -> Self {
        Self::new(ErrorType::Forbidden, field, None, detail)
    }

    pub fn duplicate(field: &Path, value: impl Into<Value>) -> Self {
        Self::new(ErrorType::Duplicate, field, Some(value.into()), "")
    }

    fn new(kind: ErrorType, field: &Path, bad_value: Option<Value>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.to_string(),
            bad_value,
            detail: detail.into(),
        }
    }
}

pub type ErrorList = Vec<FieldError>;

/// Joins a list of errors into one message, `[a, b]` when there is more than one.
pub fn aggregate(errs: &[FieldError]) -> String {
    match errs {
        [] => String::new(),
        [one] => one.to_string(),
        many => format!("[{}]", many.iter().join(", ")),
    }
}

/// A dotted JSON field path such as `spec.authInfo.basic` or `status.conditions[0]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path(String);

impl Path {
    pub fn new(root: &str) -> Self {
        Self(root.to_string())
    }

    pub fn child(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(name.to_string())
        } else {
            Self(format!("{}.{name}", self.0))
        }
    }

    pub fn index(&self, i: usize) -> Self {
        Self(format!("{}[{i}]", self.0))
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;
const GUID_NAME_MAX_LENGTH: usize = 63;

static DNS1123_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("static regex")
});

// Classes and plans are named after broker GUIDs, which may carry upper case letters.
static GUID_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]([-a-zA-Z0-9.]*[a-zA-Z0-9])?$").expect("static regex"));

static EXTERNAL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9]+$").expect("static regex"));

static SHA256_HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{64}$").expect("static regex"));

/// Returns the reasons `name` is not a DNS-1123 subdomain; empty when it is one.
pub fn is_dns1123_subdomain(name: &str) -> Vec<String> {
    let mut msgs = Vec::new();
    if name.len() > DNS1123_SUBDOMAIN_MAX_LENGTH {
        msgs.push(format!("must be no more than {DNS1123_SUBDOMAIN_MAX_LENGTH} characters"));
    }
    if !DNS1123_SUBDOMAIN.is_match(name) {
        msgs.push(
            "a DNS-1123 subdomain must consist of lower case alphanumeric characters, '-' or '.', \
             and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    msgs
}

/// Names of classes and plans, which mirror the broker supplied IDs.
pub fn is_guid_name(name: &str) -> Vec<String> {
    let mut msgs = Vec::new();
    if name.len() > GUID_NAME_MAX_LENGTH {
        msgs.push(format!("must be no more than {GUID_NAME_MAX_LENGTH} characters"));
    }
    if !GUID_NAME.is_match(name) {
        msgs.push(
            "must consist of alphanumeric characters, '-' or '.', and must start and end with \
             an alphanumeric character"
                .to_string(),
        );
    }
    msgs
}

/// Names the broker exposes for classes and plans.
pub fn is_external_name(name: &str) -> Vec<String> {
    if EXTERNAL_NAME.is_match(name) {
        Vec::new()
    } else {
        vec!["must consist of only alphanumeric characters and '-'".to_string()]
    }
}

type NameFn = fn(&str) -> Vec<String>;

/// Validates name and namespace of an object. `namespaced` selects whether a namespace is
/// required or forbidden.
pub fn validate_object_meta(meta: &ObjectMeta, namespaced: bool, name_fn: NameFn) -> ErrorList {
    let path = Path::new("metadata");
    let mut errs = ErrorList::new();

    match meta.name.as_deref() {
        None | Some("") => {
            if meta.generate_name.as_deref().unwrap_or_default().is_empty() {
                errs.push(FieldError::required(&path.child("name"), "name or generateName is required"));
            }
        }
        Some(name) => {
            for msg in name_fn(name) {
                errs.push(FieldError::invalid(&path.child("name"), name, msg));
            }
        }
    }

    match (namespaced, meta.namespace.as_deref()) {
        (true, None | Some("")) => errs.push(FieldError::required(&path.child("namespace"), "")),
        (true, Some(ns)) => {
            for msg in is_dns1123_subdomain(ns) {
                errs.push(FieldError::invalid(&path.child("namespace"), ns, msg));
            }
        }
        (false, Some(ns)) if !ns.is_empty() => errs.push(FieldError::forbidden(
            &path.child("namespace"),
            "not allowed on this type",
        )),
        (false, _) => {}
    }

    if meta.generation.is_some_and(|g| g < 0) {
        errs.push(FieldError::invalid(
            &path.child("generation"),
            meta.generation,
            "must be greater than or equal to 0",
        ));
    }
    errs
}

/// Name and namespace cannot change once the object exists.
pub fn validate_object_meta_update(new: &ObjectMeta, old: &ObjectMeta) -> ErrorList {
    let path = Path::new("metadata");
    let mut errs = ErrorList::new();
    errs.extend(validate_immutable_field(&new.name, &old.name, &path.child("name")));
    errs.extend(validate_immutable_field(
        &new.namespace,
        &old.namespace,
        &path.child("namespace"),
    ));
    errs
}

pub fn validate_immutable_field<T: PartialEq + serde::Serialize>(new: &T, old: &T, path: &Path) -> ErrorList {
    if new == old {
        return ErrorList::new();
    }
    let value = serde_json::to_value(new).unwrap_or(Value::Null);
    vec![FieldError::invalid(path, value, "field is immutable")]
}

/// Parameters sent to a broker must be a JSON object.
pub fn validate_parameters(parameters: Option<&Value>, path: &Path) -> ErrorList {
    match parameters {
        None | Some(Value::Object(_)) => ErrorList::new(),
        Some(other) => vec![FieldError::invalid(
            path,
            other.clone(),
            "parameters must be a JSON object",
        )],
    }
}

pub fn validate_parameters_from(sources: &[ParametersFromSource], path: &Path) -> ErrorList {
    let mut errs = ErrorList::new();
    for (i, source) in sources.iter().enumerate() {
        let path = path.index(i);
        let Some(secret) = &source.secret_key_ref else {
            errs.push(FieldError::required(
                &path,
                "source must have exactly one of secretKeyRef",
            ));
            continue;
        };
        let path = path.child("secretKeyRef");
        if secret.name.is_empty() {
            errs.push(FieldError::required(&path.child("name"), "name is required"));
        }
        if secret.key.is_empty() {
            errs.push(FieldError::required(&path.child("key"), "key is required"));
        }
    }
    errs
}

/// Parameters and their checksum travel together; the checksum is a hex SHA-256.
pub fn validate_properties_parameters(
    parameters: Option<&Value>,
    checksum: Option<&str>,
    path: &Path,
) -> ErrorList {
    let mut errs = ErrorList::new();
    let checksum = checksum.filter(|c| !c.is_empty());
    match (parameters, checksum) {
        (Some(_), None) => errs.push(FieldError::required(
            &path.child("parameterChecksum"),
            "parameterChecksum must be set when there are parameters",
        )),
        (None, Some(_)) => errs.push(FieldError::forbidden(
            &path.child("parameterChecksum"),
            "parameterChecksum must be empty when there are no parameters",
        )),
        _ => {}
    }
    if let Some(parameters) = parameters {
        if !parameters.is_object() {
            errs.push(FieldError::invalid(
                &path.child("parameters"),
                parameters.clone(),
                "parameters must be a JSON object",
            ));
        }
    }
    if let Some(checksum) = checksum {
        if !SHA256_HEX.is_match(checksum) {
            errs.push(FieldError::invalid(
                &path.child("parameterChecksum"),
                checksum,
                "parameterChecksum must be a 64 character hex encoded SHA-256 sum",
            ));
        }
    }
    errs
}

/// Checks an optional RFC 3339 timestamp.
pub fn validate_timestamp(value: Option<&str>, path: &Path) -> ErrorList {
    match value {
        Some(ts) if chrono::DateTime::parse_from_rfc3339(ts).is_err() => {
            vec![FieldError::invalid(path, ts, "must be an RFC 3339 timestamp")]
        }
        _ => ErrorList::new(),
    }
}

/// Conditions are keyed by type, so each type may appear once.
pub fn validate_condition_types<T: PartialEq + serde::Serialize>(types: &[T], path: &Path) -> ErrorList {
    types
        .iter()
        .enumerate()
        .filter(|&(i, t)| types[..i].contains(t))
        .map(|(i, t)| {
            let value = serde_json::to_value(t).unwrap_or(Value::Null);
            FieldError::duplicate(&path.index(i).child("type"), value)
        })
        .collect()
}

/// `reconciledGeneration` never runs ahead of the object's generation.
pub fn validate_reconciled_generation(reconciled: i64, generation: Option<i64>, path: &Path) -> ErrorList {
    let mut errs = ErrorList::new();
    if reconciled < 0 {
        errs.push(FieldError::invalid(path, reconciled, "must be greater than or equal to 0"));
    } else if reconciled > generation.unwrap_or_default() {
        errs.push(FieldError::invalid(
            path,
            reconciled,
            "reconciledGeneration must not be greater than generation",
        ));
    }
    errs
}
