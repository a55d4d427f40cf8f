//! Terraform type system and its JSON type-constraint encoding

use crate::types::Dynamic;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// AttributeType defines the type system for Terraform attributes
/// This must match Terraform's type system exactly
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),               // Ordered, allows duplicates
    Set(Box<AttributeType>),                // Unordered, no duplicates
    Map(Box<AttributeType>),                // String keys only
    Object(HashMap<String, AttributeType>), // Fixed structure
}

impl AttributeType {
    pub fn list_of(elem: AttributeType) -> Self {
        AttributeType::List(Box::new(elem))
    }

    pub fn set_of(elem: AttributeType) -> Self {
        AttributeType::Set(Box::new(elem))
    }

    pub fn map_of(elem: AttributeType) -> Self {
        AttributeType::Map(Box::new(elem))
    }

    pub fn object<I, K>(attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, AttributeType)>,
        K: Into<String>,
    {
        AttributeType::Object(attrs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// cty JSON type constraint, e.g. `["list","string"]`
    pub fn to_json(&self) -> Value {
        match self {
            AttributeType::String => json!("string"),
            AttributeType::Number => json!("number"),
            AttributeType::Bool => json!("bool"),
            AttributeType::List(elem) => json!(["list", elem.to_json()]),
            AttributeType::Set(elem) => json!(["set", elem.to_json()]),
            AttributeType::Map(elem) => json!(["map", elem.to_json()]),
            AttributeType::Object(attrs) => {
                let mut fields = Map::new();
                for (name, attr_type) in attrs {
                    fields.insert(name.clone(), attr_type.to_json());
                }
                json!(["object", Value::Object(fields)])
            }
        }
    }

    /// Bytes placed in the `type` field of a schema attribute
    pub fn to_type_bytes(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }

    /// Whether a value fits this type; null and unknown fit anything
    pub fn accepts(&self, value: &Dynamic) -> bool {
        match (value, self) {
            (Dynamic::Null, _) | (Dynamic::Unknown, _) => true,
            (Dynamic::String(_), AttributeType::String) => true,
            (Dynamic::Number(_), AttributeType::Number) => true,
            (Dynamic::Bool(_), AttributeType::Bool) => true,
            (Dynamic::List(list), AttributeType::List(elem))
            | (Dynamic::List(list), AttributeType::Set(elem)) => {
                list.iter().all(|item| elem.accepts(item))
            }
            (Dynamic::Map(map), AttributeType::Map(elem)) => {
                map.values().all(|item| elem.accepts(item))
            }
            (Dynamic::Map(map), AttributeType::Object(attrs)) => attrs
                .iter()
                .all(|(name, attr_type)| map.get(name).map_or(true, |v| attr_type.accepts(v))),
            _ => false,
        }
    }

    /// Shapes a value into what msgpack for this type must look like:
    /// objects carry every attribute (missing ones as null), keys the type
    /// does not declare are dropped and numeric strings become numbers.
    pub fn conform(&self, value: Dynamic) -> Dynamic {
        match (self, value) {
            (_, Dynamic::Null) => Dynamic::Null,
            (_, Dynamic::Unknown) => Dynamic::Unknown,
            (AttributeType::Number, Dynamic::String(s)) => match s.parse::<f64>() {
                Ok(n) => Dynamic::Number(n),
                Err(_) => Dynamic::String(s),
            },
            (AttributeType::String, Dynamic::Number(n)) => Dynamic::String(n.to_string()),
            (AttributeType::String, Dynamic::Bool(b)) => Dynamic::String(b.to_string()),
            (AttributeType::List(elem), Dynamic::List(items))
            | (AttributeType::Set(elem), Dynamic::List(items)) => {
                Dynamic::List(items.into_iter().map(|item| elem.conform(item)).collect())
            }
            (AttributeType::Map(elem), Dynamic::Map(map)) => Dynamic::Map(
                map.into_iter()
                    .map(|(k, v)| (k, elem.conform(v)))
                    .collect(),
            ),
            (AttributeType::Object(attrs), Dynamic::Map(mut map)) => Dynamic::Map(
                attrs
                    .iter()
                    .map(|(name, attr_type)| {
                        let value = map.remove(name).unwrap_or(Dynamic::Null);
                        (name.clone(), attr_type.conform(value))
                    })
                    .collect(),
            ),
            (_, other) => other,
        }
    }
}
