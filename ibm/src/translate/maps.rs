//! Reading and building the generic maps Terraform state is made of.
//!
//! Nested objects live in one-element lists, the shape Terraform gives a
//! nested block. Null, unknown, missing and empty-string values all read as
//! absent; a present value of the wrong kind is an error.

use std::collections::HashMap;

use tfplug::Dynamic;

use super::TranslateError;

pub type Object = HashMap<String, Dynamic>;

pub fn insert(map: &mut Object, key: &str, value: impl Into<Dynamic>) {
    map.insert(key.to_string(), value.into());
}

/// Inserts `value` only when it is present
pub fn insert_opt<T: Into<Dynamic>>(map: &mut Object, key: &str, value: Option<T>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}

/// Inserts a nested object as a one-element list
pub fn insert_block(map: &mut Object, key: &str, block: Option<Object>) {
    if let Some(block) = block {
        map.insert(key.to_string(), Dynamic::List(vec![Dynamic::Map(block)]));
    }
}

pub fn insert_list(map: &mut Object, key: &str, items: Option<Vec<Object>>) {
    if let Some(items) = items {
        map.insert(
            key.to_string(),
            Dynamic::List(items.into_iter().map(Dynamic::Map).collect()),
        );
    }
}

fn present<'a>(map: &'a Object, key: &str) -> Option<&'a Dynamic> {
    map.get(key).filter(|v| v.is_known())
}

fn invalid(key: &str, expected: &str) -> TranslateError {
    TranslateError::InvalidField {
        field: key.to_string(),
        expected: expected.to_string(),
    }
}

pub fn optional_string(map: &Object, key: &str) -> Result<Option<String>, TranslateError> {
    match present(map, key) {
        None => Ok(None),
        Some(Dynamic::String(s)) if s.is_empty() => Ok(None),
        Some(Dynamic::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(key, "string")),
    }
}

pub fn required_string(map: &Object, key: &str) -> Result<String, TranslateError> {
    optional_string(map, key)?.ok_or_else(|| TranslateError::MissingField(key.to_string()))
}

pub fn optional_bool(map: &Object, key: &str) -> Result<Option<bool>, TranslateError> {
    match present(map, key) {
        None => Ok(None),
        Some(value) => value.as_bool().map(Some).ok_or_else(|| invalid(key, "bool")),
    }
}

pub fn optional_i64(map: &Object, key: &str) -> Result<Option<i64>, TranslateError> {
    match present(map, key) {
        None => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid(key, "whole number")),
    }
}

/// A list of strings; unknown or empty elements are skipped
pub fn optional_strings(map: &Object, key: &str) -> Result<Option<Vec<String>>, TranslateError> {
    let items = match present(map, key) {
        None => return Ok(None),
        Some(value) => value.as_list().ok_or_else(|| invalid(key, "list"))?,
    };

    let mut strings = Vec::with_capacity(items.len());
    for item in items.iter().filter(|i| i.is_known()) {
        match item.as_str() {
            Some("") => {}
            Some(s) => strings.push(s.to_string()),
            None => return Err(invalid(key, "list of strings")),
        }
    }
    Ok(Some(strings))
}

/// The first element of a nested block list. A bare object is accepted as
/// well, and an empty list reads as absent.
pub fn single_block<'a>(map: &'a Object, key: &str) -> Result<Option<&'a Object>, TranslateError> {
    match present(map, key) {
        None => Ok(None),
        Some(Dynamic::Map(block)) => Ok(Some(block)),
        Some(Dynamic::List(items)) => match items.iter().find(|i| i.is_known()) {
            None => Ok(None),
            Some(Dynamic::Map(block)) => Ok(Some(block)),
            Some(_) => Err(invalid(key, "block")),
        },
        Some(_) => Err(invalid(key, "block")),
    }
}
