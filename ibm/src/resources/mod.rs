pub mod pipeline;
pub mod trigger;
pub mod trigger_property;

pub use pipeline::PipelineResource;
pub use trigger::TriggerResource;
pub use trigger_property::TriggerPropertyResource;

use std::collections::HashMap;

use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, Block};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringRegexLengthValidator;

use crate::api::ApiError;
use crate::translate::maps::Object;
use crate::translate::{with_context_failed, TranslateError};

/// Pipeline and trigger IDs are 36 characters of lowercase hex and dashes
const RESOURCE_ID_PATTERN: &str = "^[-0-9a-z]+$";
const RESOURCE_ID_LENGTH: usize = 36;

/// Required, force-new reference to a pipeline or trigger
pub(crate) fn resource_id_attribute(name: &str, description: &str) -> Attribute {
    let builder = AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .required()
        .plan_modifier(RequiresReplace);
    match StringRegexLengthValidator::new(RESOURCE_ID_PATTERN, RESOURCE_ID_LENGTH, RESOURCE_ID_LENGTH)
    {
        Ok(validator) => builder.validator(validator).build(),
        Err(e) => {
            tracing::error!("Invalid ID pattern for {}: {}", name, e);
            builder.build()
        }
    }
}

pub(crate) fn computed_id_attribute() -> Attribute {
    AttributeBuilder::new("id", AttributeType::String)
        .description("The unique identifier of the resource.")
        .computed()
        .plan_modifier(UseStateForUnknown)
        .build()
}

pub(crate) fn computed(name: &str, attr_type: AttributeType, description: &str) -> Attribute {
    AttributeBuilder::new(name, attr_type)
        .description(description)
        .computed()
        .build()
}

/// Non-empty string at a top-level attribute
pub(crate) fn string_at(value: &DynamicValue, name: &str) -> Option<String> {
    value
        .get(&AttributePath::new(name))
        .and_then(Dynamic::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Whether the value at `path` differs between prior state and plan.
/// Null and missing are the same thing here.
pub(crate) fn has_change(prior: &DynamicValue, planned: &DynamicValue, path: &AttributePath) -> bool {
    let before = prior.get(path).cloned().map(without_nulls);
    let after = planned.get(path).cloned().map(without_nulls);
    match (before, after) {
        (None, None) => false,
        (Some(a), Some(b)) => a != b,
        (Some(v), None) | (None, Some(v)) => !v.is_null(),
    }
}

fn without_nulls(value: Dynamic) -> Dynamic {
    match value {
        Dynamic::Map(map) => Dynamic::Map(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, without_nulls(v)))
                .collect(),
        ),
        Dynamic::List(items) => Dynamic::List(items.into_iter().map(without_nulls).collect()),
        other => other,
    }
}

/// Replaces every unknown inside `value` with null
pub(crate) fn clear_unknowns(value: Dynamic) -> Dynamic {
    match value {
        Dynamic::Unknown => Dynamic::Null,
        Dynamic::Map(map) => Dynamic::Map(
            map.into_iter()
                .map(|(k, v)| (k, clear_unknowns(v)))
                .collect(),
        ),
        Dynamic::List(items) => Dynamic::List(items.into_iter().map(clear_unknowns).collect()),
        other => other,
    }
}

/// Lays freshly read values over a base state. Values the API did not
/// return keep their base value; single nested blocks are merged field by
/// field, anything else is replaced.
pub(crate) fn overlay(base: Dynamic, fresh: Object) -> Dynamic {
    let mut merged: HashMap<String, Dynamic> = match clear_unknowns(base) {
        Dynamic::Map(map) => map,
        _ => HashMap::new(),
    };
    for (key, value) in fresh {
        let value = match (merged.remove(&key), value) {
            (Some(Dynamic::List(mut old)), Dynamic::List(mut new))
                if old.len() == 1 && new.len() == 1 =>
            {
                match (old.remove(0), new.remove(0)) {
                    (old @ Dynamic::Map(_), Dynamic::Map(new)) => {
                        Dynamic::List(vec![overlay(old, new)])
                    }
                    (_, new) => Dynamic::List(vec![new]),
                }
            }
            (_, value) => value,
        };
        merged.insert(key, value);
    }
    Dynamic::Map(merged)
}

/// Drops fresh values for attributes Terraform expects to stay null: those
/// the base leaves null and that are not computed. Single nested blocks
/// present on both sides are handled the same way.
pub(crate) fn retain_unset(block: &Block, base: &Object, fresh: &mut Object) {
    for attribute in &block.attributes {
        let unset = base.get(&attribute.name).map_or(true, Dynamic::is_null);
        if unset && !attribute.computed {
            fresh.remove(&attribute.name);
        }
    }
    for nested in &block.block_types {
        let base_item = base
            .get(&nested.type_name)
            .and_then(Dynamic::as_list)
            .and_then(|items| items.first())
            .and_then(Dynamic::as_map);
        let fresh_item = match fresh.get_mut(&nested.type_name) {
            Some(Dynamic::List(items)) => match items.first_mut() {
                Some(Dynamic::Map(map)) => Some(map),
                _ => None,
            },
            _ => None,
        };
        if let (Some(base_item), Some(fresh_item)) = (base_item, fresh_item) {
            retain_unset(&nested.block, base_item, fresh_item);
        }
    }
}

pub(crate) fn api_error(operation: &str, err: &ApiError) -> Diagnostic {
    Diagnostic::error(with_context_failed(operation, err), "")
}

pub(crate) fn translate_error(err: TranslateError) -> Diagnostic {
    Diagnostic::error(err.to_string(), "")
}

/// Update was asked to change an attribute that forces replacement
pub(crate) fn force_new_error(attribute: &str) -> Diagnostic {
    Diagnostic::error(
        format!(
            "Cannot update resource property \"{}\" with the ForceNew annotation. \
             The resource must be re-created to update this property.",
            attribute
        ),
        "",
    )
    .with_attribute(AttributePath::new(attribute))
}
