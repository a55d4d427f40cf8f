//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, DynamicValue};

/// Sets the import ID to a specific attribute in state
///
/// This is useful for simple resources where the import ID maps directly to
/// a single attribute in the resource state.
///
/// Example: ID "94619026-912b-4d92-8f51-6c74f0692d90" -> state.id = "94619026-..."
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::object();

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!("Could not set attribute '{}' to value '{}'", attr_path, request.id),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
    });
}

/// Imports a resource whose ID joins several parts with `/`
///
/// The whole ID goes to `id` and each part to the matching attribute, so a
/// following read has everything it needs.
///
/// Example: ID "pipe/trig" with ["pipeline_id", "trigger_id"]
/// -> state.id = "pipe/trig", state.pipeline_id = "pipe", state.trigger_id = "trig"
pub fn import_state_with_parts(
    _ctx: &Context,
    attributes: &[&str],
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let parts: Vec<&str> = request.id.split('/').collect();
    if parts.len() != attributes.len() || parts.iter().any(|p| p.is_empty()) {
        response.diagnostics.push(Diagnostic::error(
            "Unexpected Import Identifier",
            format!(
                "Expected import identifier with format: {}. Got: {}",
                attributes.join("/"),
                request.id
            ),
        ));
        return;
    }

    let mut state = DynamicValue::object();
    let assignments = std::iter::once(("id", request.id.as_str()))
        .chain(attributes.iter().copied().zip(parts.iter().copied()));
    for (attr, value) in assignments {
        if let Err(e) = state.set_string(&AttributePath::new(attr), value.to_string()) {
            response.diagnostics.push(Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!("Could not set attribute '{}' to value '{}'", attr, value),
            ));
            return;
        }
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
    });
}
