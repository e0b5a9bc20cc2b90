//! Field access and shape checks over untyped YAML mappings.

use super::StructuralError;
use crate::model::{fields, EnvMap, EnvValue, FreeMap};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

pub(crate) const STRING: &str = "string";
pub(crate) const MAPPING: &str = "mapping";
pub(crate) const BOOLEAN: &str = "boolean";
pub(crate) const NON_NEGATIVE_INTEGER: &str = "non-negative integer";
pub(crate) const STEP_LIST: &str = "list of steps";
pub(crate) const STRING_OR_LIST: &str = "string or list of strings";
pub(crate) const RUNNER: &str = "non-empty string or non-empty list of strings";
pub(crate) const STRING_OR_MAPPING: &str = "string or mapping";
pub(crate) const TRIGGER: &str = "event name, list of event names, or mapping of events";
pub(crate) const PERMISSIONS: &str = "permission mode string or mapping of scope to level";
pub(crate) const ENV_MAP: &str = "mapping of string, number or boolean values";
pub(crate) const STRING_MAP: &str = "mapping of string values";
pub(crate) const SCALAR_KEY: &str = "scalar key";
pub(crate) const UNIQUE_JOB_ID: &str = "unique job id";

/// Result of looking a field up under both of its spellings.
pub(crate) enum Slot<'a> {
    Absent,
    Null,
    Present(&'a Value),
    /// Both spellings set with different values; already reported.
    Conflict,
}

/// A mapping being validated, plus the dotted path it lives at.
pub(crate) struct Fields<'a> {
    map: &'a Mapping,
    prefix: String,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(map: &'a Mapping, prefix: impl Into<String>) -> Self {
        Self {
            map,
            prefix: prefix.into(),
        }
    }

    pub(crate) fn path(&self, field: &str) -> String {
        if self.prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", self.prefix, field)
        }
    }

    /// Look up `field` by its external spelling and, when aliased, its internal one.
    pub(crate) fn slot(&self, field: &'static str, errors: &mut Vec<StructuralError>) -> Slot<'a> {
        let external = self.map.get(field);
        let internal = fields::internal_name(field).and_then(|name| self.map.get(name));
        let value = match (external, internal) {
            (None, None) => return Slot::Absent,
            (Some(value), None) | (None, Some(value)) => value,
            (Some(value), Some(other)) if value == other => value,
            (Some(_), Some(_)) => {
                errors.push(StructuralError::Ambiguous {
                    path: self.path(field),
                    external: field,
                    internal: fields::internal_name(field).unwrap_or(field),
                });
                return Slot::Conflict;
            }
        };
        if value.is_null() {
            Slot::Null
        } else {
            Slot::Present(value)
        }
    }

    /// Parse an optional field; `null` counts as absent.
    pub(crate) fn optional<T>(
        &self,
        field: &'static str,
        expected: &'static str,
        errors: &mut Vec<StructuralError>,
        parse: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Option<T> {
        match self.slot(field, errors) {
            Slot::Absent | Slot::Null | Slot::Conflict => None,
            Slot::Present(value) => self.parse_present(field, expected, value, errors, parse),
        }
    }

    /// Parse a required field, reporting it as missing when absent.
    pub(crate) fn required<T>(
        &self,
        field: &'static str,
        expected: &'static str,
        errors: &mut Vec<StructuralError>,
        parse: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Option<T> {
        match self.slot(field, errors) {
            Slot::Absent => {
                errors.push(StructuralError::Missing {
                    path: self.path(field),
                });
                None
            }
            Slot::Null => {
                errors.push(StructuralError::WrongShape {
                    path: self.path(field),
                    expected,
                    found: kind_name(&Value::Null),
                });
                None
            }
            Slot::Conflict => None,
            Slot::Present(value) => self.parse_present(field, expected, value, errors, parse),
        }
    }

    fn parse_present<T>(
        &self,
        field: &'static str,
        expected: &'static str,
        value: &'a Value,
        errors: &mut Vec<StructuralError>,
        parse: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Option<T> {
        let parsed = parse(value);
        if parsed.is_none() {
            errors.push(StructuralError::WrongShape {
                path: self.path(field),
                expected,
                found: kind_name(value),
            });
        }
        parsed
    }
}

pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

pub(crate) fn string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

pub(crate) fn boolean(value: &Value) -> Option<bool> {
    value.as_bool()
}

pub(crate) fn non_negative_integer(value: &Value) -> Option<u64> {
    value.as_u64()
}

pub(crate) fn string_list(value: &Value) -> Option<Vec<String>> {
    value.as_sequence()?.iter().map(string).collect()
}

/// Stringify a scalar mapping key; YAML allows numbers and booleans as keys.
pub(crate) fn key_string(key: &Value) -> Option<String> {
    match key {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Convert an uninterpreted YAML sub-tree into JSON.
pub(crate) fn to_json(value: &Value) -> Option<serde_json::Value> {
    Some(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(flag) => serde_json::Value::Bool(*flag),
        Value::Number(number) => serde_json::Value::Number(json_number(number)?),
        Value::String(text) => serde_json::Value::String(text.clone()),
        Value::Sequence(items) => {
            serde_json::Value::Array(items.iter().map(to_json).collect::<Option<_>>()?)
        }
        Value::Mapping(map) => serde_json::Value::Object(
            map.iter()
                .map(|(key, value)| Some((key_string(key)?, to_json(value)?)))
                .collect::<Option<_>>()?,
        ),
        Value::Tagged(tagged) => to_json(&tagged.value)?,
    })
}

fn json_number(number: &serde_yaml::Number) -> Option<serde_json::Number> {
    if let Some(unsigned) = number.as_u64() {
        return Some(unsigned.into());
    }
    if let Some(signed) = number.as_i64() {
        return Some(signed.into());
    }
    number.as_f64().and_then(serde_json::Number::from_f64)
}

pub(crate) fn free_map(value: &Value) -> Option<FreeMap> {
    value
        .as_mapping()?
        .iter()
        .map(|(key, value)| Some((key_string(key)?, to_json(value)?)))
        .collect()
}

pub(crate) fn string_map(value: &Value) -> Option<IndexMap<String, String>> {
    value
        .as_mapping()?
        .iter()
        .map(|(key, value)| Some((key_string(key)?, string(value)?)))
        .collect()
}

pub(crate) fn env_map(value: &Value) -> Option<EnvMap> {
    value
        .as_mapping()?
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => EnvValue::String(text.clone()),
                Value::Bool(flag) => EnvValue::Bool(*flag),
                Value::Number(number) => EnvValue::Number(json_number(number)?),
                _ => return None,
            };
            Some((key_string(key)?, value))
        })
        .collect()
}
