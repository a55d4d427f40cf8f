//! Pipeline state shared by the pipeline resource and data source

use chrono::{DateTime, SecondsFormat, Utc};

use super::maps::{insert, insert_block, insert_list, insert_opt, Object};
use super::trigger::{trigger_to_map, worker_to_map};
use crate::api::tekton::{Definition, Property, TektonPipeline, Toolchain};

/// Every attribute the API reports for a pipeline, keyed as in state.
/// `id` and `pipeline_id` both carry the pipeline ID.
pub fn pipeline_to_state(pipeline: &TektonPipeline) -> Object {
    let mut map = Object::new();
    insert(&mut map, "id", pipeline.id.as_str());
    insert(&mut map, "pipeline_id", pipeline.id.as_str());
    insert_opt(&mut map, "name", pipeline.name.as_deref());
    insert_opt(&mut map, "status", pipeline.status.as_deref());
    insert_opt(
        &mut map,
        "resource_group_id",
        pipeline.resource_group.as_ref().and_then(|g| g.id.as_deref()),
    );
    insert_block(&mut map, "toolchain", pipeline.toolchain.as_ref().map(toolchain_to_map));
    insert_list(
        &mut map,
        "definitions",
        pipeline
            .definitions
            .as_ref()
            .map(|defs| defs.iter().map(definition_to_map).collect()),
    );
    insert_list(
        &mut map,
        "properties",
        pipeline
            .properties
            .as_ref()
            .map(|props| props.iter().map(property_to_map).collect()),
    );
    insert_opt(&mut map, "updated_at", pipeline.updated_at.as_ref().map(timestamp));
    insert_opt(&mut map, "created_at", pipeline.created_at.as_ref().map(timestamp));
    insert_list(
        &mut map,
        "triggers",
        pipeline
            .triggers
            .as_ref()
            .map(|triggers| triggers.iter().map(trigger_to_map).collect()),
    );
    insert_block(&mut map, "worker", pipeline.worker.as_ref().map(worker_to_map));
    insert_opt(&mut map, "runs_url", pipeline.runs_url.as_deref());
    insert_opt(&mut map, "build_number", pipeline.build_number);
    insert_opt(&mut map, "enable_slack_notifications", pipeline.enable_slack_notifications);
    insert_opt(&mut map, "enable_partial_cloning", pipeline.enable_partial_cloning);
    insert_opt(&mut map, "enabled", pipeline.enabled);
    map
}

/// Pipeline-level property; `href` is not kept in pipeline state
pub fn property_to_map(property: &Property) -> Object {
    let mut map = super::trigger::property_to_map(property);
    map.remove("href");
    map
}

fn toolchain_to_map(toolchain: &Toolchain) -> Object {
    let mut map = Object::new();
    insert(&mut map, "id", toolchain.id.as_str());
    insert(&mut map, "crn", toolchain.crn.as_str());
    map
}

fn definition_to_map(definition: &Definition) -> Object {
    let source = &definition.scm_source;
    let mut scm_source = Object::new();
    insert(&mut scm_source, "url", source.url.as_str());
    insert_opt(&mut scm_source, "branch", source.branch.as_deref());
    insert_opt(&mut scm_source, "tag", source.tag.as_deref());
    insert(&mut scm_source, "path", source.path.as_str());
    insert_opt(&mut scm_source, "service_instance_id", source.service_instance_id.as_deref());

    let mut map = Object::new();
    insert_block(&mut map, "scm_source", Some(scm_source));
    insert_opt(&mut map, "id", definition.id.as_deref());
    map
}

/// RFC 3339 with milliseconds, UTC
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
