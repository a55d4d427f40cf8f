//! Tekton pipeline resource

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import_state_with_parts;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{
    Attribute, AttributeBuilder, AttributeType, NestedBlockBuilder, Schema, SchemaBuilder,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use super::{
    api_error, computed, computed_id_attribute, has_change, overlay, resource_id_attribute,
    string_at, translate_error,
};
use crate::api::tekton::{CreateTektonPipelineRequest, TektonPipeline, TektonPipelinePatch, Worker};
use crate::api::Client;
use crate::provider_data::{not_configured, IbmProviderData};
use crate::translate::maps::{single_block, Object};
use crate::translate::pipeline::pipeline_to_state;
use crate::translate::trigger::map_to_worker;

pub const TYPE_NAME: &str = "ibm_cd_tekton_pipeline";

/// Attributes only the API sets; refreshed wholesale on every read
const COMPUTED_ATTRIBUTES: &[&str] = &[
    "name",
    "status",
    "resource_group_id",
    "toolchain",
    "definitions",
    "properties",
    "updated_at",
    "created_at",
    "triggers",
    "runs_url",
    "build_number",
    "enabled",
];

#[derive(Default)]
pub struct PipelineResource {
    provider_data: Option<IbmProviderData>,
}

impl PipelineResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pipeline_schema() -> Schema {
        let mut builder = SchemaBuilder::new()
            .version(0)
            .description("Manages a Tekton pipeline in IBM Cloud Continuous Delivery.")
            .attribute(computed_id_attribute())
            .attribute(resource_id_attribute(
                "pipeline_id",
                "ID of the pipeline tool in your toolchain.",
            ))
            .attribute(
                AttributeBuilder::new("enable_slack_notifications", AttributeType::Bool)
                    .description(
                        "Flag whether to enable slack notifications for this tekton pipeline. \
                         When enabled, pipeline run events will be published on all slack \
                         integration specified channels in the parent toolchain.",
                    )
                    .optional()
                    .computed()
                    .default(false)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enable_partial_cloning", AttributeType::Bool)
                    .description(
                        "Flag whether to enable partial cloning for this tekton pipeline. \
                         When partial clone is enabled, only the files contained within the \
                         paths specified in definition repositories will be read and cloned. \
                         This means symbolic links may not work.",
                    )
                    .optional()
                    .computed()
                    .default(false)
                    .build(),
            )
            .block(
                NestedBlockBuilder::single_list("worker")
                    .description("Worker object containing worker ID only. If omitted the IBM Managed shared workers are used by default.")
                    .attribute(
                        AttributeBuilder::new("name", AttributeType::String)
                            .description("Name of the worker. Computed based on the worker ID.")
                            .optional()
                            .computed()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("type", AttributeType::String)
                            .description("Type of the worker. Computed based on the worker ID.")
                            .optional()
                            .computed()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("id", AttributeType::String)
                            .description("ID of the worker.")
                            .required()
                            .build(),
                    )
                    .build(),
            );
        for attribute in computed_pipeline_attributes() {
            builder = builder.attribute(attribute);
        }
        builder.build()
    }

    fn create_request(planned: &DynamicValue) -> Result<CreateTektonPipelineRequest, Diagnostic> {
        let id = string_at(planned, "pipeline_id").ok_or_else(|| {
            Diagnostic::error("Missing pipeline_id", "pipeline_id is required")
                .with_attribute(AttributePath::new("pipeline_id"))
        })?;

        Ok(CreateTektonPipelineRequest {
            id,
            enable_slack_notifications: bool_at(planned, "enable_slack_notifications"),
            enable_partial_cloning: bool_at(planned, "enable_partial_cloning"),
            worker: worker_at(planned)?,
        })
    }

    /// Patch carrying only what changed between prior state and plan
    fn patch(prior: &DynamicValue, planned: &DynamicValue) -> Result<TektonPipelinePatch, Diagnostic> {
        let changed = |name: &str| has_change(prior, planned, &AttributePath::new(name));

        let mut patch = TektonPipelinePatch::default();
        if changed("enable_slack_notifications") {
            patch.enable_slack_notifications = bool_at(planned, "enable_slack_notifications");
        }
        if changed("enable_partial_cloning") {
            patch.enable_partial_cloning = bool_at(planned, "enable_partial_cloning");
        }
        if changed("worker") {
            patch.worker = worker_at(planned)?;
        }
        Ok(patch)
    }

    /// Fetches the pipeline and lays it over `base`. None when it is gone.
    async fn read_state(
        ctx: &Context,
        client: &Client,
        id: &str,
        base: &DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        match client.tekton().pipelines().get(ctx, id).await {
            Ok(pipeline) => Ok(Some(Self::state_from(base, &pipeline))),
            Err(e) if e.is_not_found() => {
                tracing::warn!(pipeline_id = %id, "Tekton pipeline not found, removing from state");
                Ok(None)
            }
            Err(e) => Err(api_error("GetTektonPipeline", &e)),
        }
    }

    fn state_from(base: &DynamicValue, pipeline: &TektonPipeline) -> DynamicValue {
        let mut base = match &base.value {
            Dynamic::Map(map) => map.clone(),
            _ => Object::new(),
        };
        for name in COMPUTED_ATTRIBUTES {
            base.remove(*name);
        }

        let mut fresh = pipeline_to_state(pipeline);
        // Only track the worker when configuration manages one
        let manages_worker = base
            .get("worker")
            .and_then(Dynamic::as_list)
            .is_some_and(|items| !items.is_empty());
        if !manages_worker {
            fresh.remove("worker");
        }

        DynamicValue::new(overlay(Dynamic::Map(base), fresh))
    }
}

fn bool_at(value: &DynamicValue, name: &str) -> Option<bool> {
    value.get(&AttributePath::new(name)).and_then(Dynamic::as_bool)
}

fn worker_at(value: &DynamicValue) -> Result<Option<Worker>, Diagnostic> {
    let map = match &value.value {
        Dynamic::Map(map) => map,
        _ => return Ok(None),
    };
    single_block(map, "worker")
        .and_then(|block| block.map(map_to_worker).transpose())
        .map_err(translate_error)
}

pub(crate) fn toolchain_type() -> AttributeType {
    AttributeType::object([
        ("id", AttributeType::String),
        ("crn", AttributeType::String),
    ])
}

pub(crate) fn definition_type() -> AttributeType {
    AttributeType::object([
        (
            "scm_source",
            AttributeType::list_of(AttributeType::object([
                ("url", AttributeType::String),
                ("branch", AttributeType::String),
                ("tag", AttributeType::String),
                ("path", AttributeType::String),
                ("service_instance_id", AttributeType::String),
            ])),
        ),
        ("id", AttributeType::String),
    ])
}

fn property_attributes() -> Vec<(&'static str, AttributeType)> {
    vec![
        ("name", AttributeType::String),
        ("value", AttributeType::String),
        ("enum", AttributeType::list_of(AttributeType::String)),
        ("type", AttributeType::String),
        ("path", AttributeType::String),
    ]
}

pub(crate) fn worker_type() -> AttributeType {
    AttributeType::object([
        ("name", AttributeType::String),
        ("type", AttributeType::String),
        ("id", AttributeType::String),
    ])
}

pub(crate) fn trigger_type() -> AttributeType {
    let mut trigger_property = property_attributes();
    trigger_property.push(("href", AttributeType::String));

    AttributeType::object([
        ("type", AttributeType::String),
        ("name", AttributeType::String),
        ("href", AttributeType::String),
        ("event_listener", AttributeType::String),
        ("id", AttributeType::String),
        (
            "properties",
            AttributeType::list_of(AttributeType::object(trigger_property)),
        ),
        ("tags", AttributeType::list_of(AttributeType::String)),
        ("worker", AttributeType::list_of(worker_type())),
        ("max_concurrent_runs", AttributeType::Number),
        ("disabled", AttributeType::Bool),
        (
            "scm_source",
            AttributeType::list_of(AttributeType::object([
                ("url", AttributeType::String),
                ("branch", AttributeType::String),
                ("pattern", AttributeType::String),
                ("blind_connection", AttributeType::Bool),
                ("hook_id", AttributeType::String),
                ("service_instance_id", AttributeType::String),
            ])),
        ),
        (
            "events",
            AttributeType::list_of(AttributeType::object([
                ("push", AttributeType::Bool),
                ("pull_request_closed", AttributeType::Bool),
                ("pull_request", AttributeType::Bool),
            ])),
        ),
        ("cron", AttributeType::String),
        ("timezone", AttributeType::String),
        (
            "secret",
            AttributeType::list_of(AttributeType::object([
                ("type", AttributeType::String),
                ("value", AttributeType::String),
                ("source", AttributeType::String),
                ("key_name", AttributeType::String),
                ("algorithm", AttributeType::String),
            ])),
        ),
        ("webhook_url", AttributeType::String),
    ])
}

/// Read-only pipeline attributes shared with the data source
pub(crate) fn computed_pipeline_attributes() -> Vec<Attribute> {
    vec![
        computed("name", AttributeType::String, "String."),
        computed("status", AttributeType::String, "Pipeline status."),
        computed("resource_group_id", AttributeType::String, "ID."),
        computed(
            "toolchain",
            AttributeType::list_of(toolchain_type()),
            "Toolchain object.",
        ),
        computed(
            "definitions",
            AttributeType::list_of(definition_type()),
            "Definition list.",
        ),
        computed(
            "properties",
            AttributeType::list_of(AttributeType::object(property_attributes())),
            "Tekton pipeline's environment properties.",
        ),
        computed("updated_at", AttributeType::String, "Standard RFC 3339 Date Time String."),
        computed("created_at", AttributeType::String, "Standard RFC 3339 Date Time String."),
        computed(
            "triggers",
            AttributeType::list_of(trigger_type()),
            "Tekton pipeline triggers list.",
        ),
        computed("runs_url", AttributeType::String, "URL for this pipeline showing the list of pipeline runs."),
        computed("build_number", AttributeType::Number, "The latest pipeline run build number. If this property is absent, the pipeline hasn't had any pipeline runs."),
        computed("enabled", AttributeType::Bool, "Flag whether this pipeline is enabled."),
    ]
}

#[async_trait]
impl Resource for PipelineResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::pipeline_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        if let Err(diag) = worker_at(&request.config) {
            diagnostics.push(diag.with_attribute(AttributePath::new("worker")));
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let data = match &self.provider_data {
            Some(data) => data,
            None => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![not_configured()],
                }
            }
        };

        let body = match Self::create_request(&request.planned_state) {
            Ok(body) => body,
            Err(diag) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let pipeline = match data.tekton.tekton().pipelines().create(&ctx, &body).await {
            Ok(pipeline) => pipeline,
            Err(e) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![api_error("CreateTektonPipeline", &e)],
                }
            }
        };
        tracing::info!(pipeline_id = %pipeline.id, "created Tekton pipeline");

        let mut planned = request.planned_state;
        if let Err(e) = planned.set_string(&AttributePath::new("id"), pipeline.id.clone()) {
            tracing::debug!("Could not set id in planned state: {}", e);
        }

        match Self::read_state(&ctx, &data.tekton, &pipeline.id, &planned).await {
            Ok(Some(state)) => CreateResourceResponse {
                new_state: state,
                private: vec![],
                diagnostics: vec![],
            },
            Ok(None) => CreateResourceResponse {
                new_state: Self::state_from(&planned, &pipeline),
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Tekton pipeline not found after create",
                    format!("Pipeline {} was created but could not be read back", pipeline.id),
                )],
            },
            Err(diag) => CreateResourceResponse {
                new_state: Self::state_from(&planned, &pipeline),
                private: vec![],
                diagnostics: vec![diag],
            },
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let data = match &self.provider_data {
            Some(data) => data,
            None => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![not_configured()],
                    private: request.private,
                    deferred: None,
                }
            }
        };

        let id = match string_at(&request.current_state, "id")
            .or_else(|| string_at(&request.current_state, "pipeline_id"))
        {
            Some(id) => id,
            None => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![Diagnostic::error(
                        "Missing pipeline ID",
                        "The resource state carries neither id nor pipeline_id",
                    )],
                    private: request.private,
                    deferred: None,
                }
            }
        };

        match Self::read_state(&ctx, &data.tekton, &id, &request.current_state).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
                private: request.private,
                deferred: None,
            },
            Err(diag) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![diag],
                private: request.private,
                deferred: None,
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let data = match &self.provider_data {
            Some(data) => data,
            None => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![not_configured()],
                }
            }
        };

        let id = string_at(&request.prior_state, "id").unwrap_or_default();
        let patch = match Self::patch(&request.prior_state, &request.planned_state) {
            Ok(patch) => patch,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        if !patch.is_empty() {
            if let Err(e) = data.tekton.tekton().pipelines().update(&ctx, &id, &patch).await {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![api_error("UpdateTektonPipeline", &e)],
                };
            }
            tracing::info!(pipeline_id = %id, "updated Tekton pipeline");
        }

        match Self::read_state(&ctx, &data.tekton, &id, &request.planned_state).await {
            Ok(Some(state)) => UpdateResourceResponse {
                new_state: state,
                private: vec![],
                diagnostics: vec![],
            },
            Ok(None) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Tekton pipeline not found",
                    format!("Pipeline {} disappeared during update", id),
                )],
            },
            Err(diag) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![diag],
            },
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let data = match &self.provider_data {
            Some(data) => data,
            None => {
                return DeleteResourceResponse {
                    diagnostics: vec![not_configured()],
                }
            }
        };

        let id = string_at(&request.prior_state, "id").unwrap_or_default();
        let mut diagnostics = vec![];
        if let Err(e) = data.tekton.tekton().pipelines().delete(&ctx, &id).await {
            diagnostics.push(api_error("DeleteTektonPipeline", &e));
        }
        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for PipelineResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match IbmProviderData::from_provider_data(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for PipelineResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };
        import_state_with_parts(&ctx, &["pipeline_id"], &request, &mut response);
        response
    }
}

#[cfg(test)]
#[path = "./pipeline_test.rs"]
mod pipeline_test;
