//! Tekton pipeline trigger resource

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ImportedResource,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use super::{
    api_error, computed_id_attribute, force_new_error, has_change, overlay,
    resource_id_attribute, retain_unset, string_at, translate_error,
};
use crate::api::tekton::{Trigger, TriggerPatch};
use crate::api::Client;
use crate::provider_data::{not_configured, IbmProviderData};
use crate::translate::composite_id;
use crate::translate::maps::{
    insert, insert_block, optional_bool, optional_i64, optional_string, optional_strings,
    single_block, Object,
};
use crate::translate::trigger::{
    map_to_events, map_to_scm_source, map_to_secret, map_to_trigger, map_to_worker,
    trigger_block, trigger_to_map,
};
use crate::translate::TranslateError;

pub const TYPE_NAME: &str = "ibm_cd_tekton_pipeline_trigger";

const NESTED_BLOCKS: &[&str] = &["worker", "scm_source", "events", "secret"];

#[derive(Default)]
pub struct TriggerResource {
    provider_data: Option<IbmProviderData>,
}

fn trigger_path(name: &str) -> AttributePath {
    AttributePath::new("trigger").index(0).attribute(name)
}

fn object_of(value: &DynamicValue) -> Object {
    match &value.value {
        Dynamic::Map(map) => map.clone(),
        _ => Object::new(),
    }
}

impl TriggerResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger_schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a trigger of a Tekton pipeline.")
            .attribute(computed_id_attribute())
            .attribute(resource_id_attribute("pipeline_id", "The Tekton pipeline ID."))
            .block(
                NestedBlockBuilder::single_list("trigger")
                    .description("Tekton pipeline trigger.")
                    .min_items(1)
                    .attribute(
                        AttributeBuilder::new("source_trigger_id", AttributeType::String)
                            .description("ID of the trigger to duplicate. Only needed when duplicating a trigger.")
                            .optional()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("name", AttributeType::String)
                            .description("Trigger name.")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("type", AttributeType::String)
                            .description("Trigger type.")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("href", AttributeType::String)
                            .description("API URL for interacting with the trigger.")
                            .optional()
                            .computed()
                            .plan_modifier(UseStateForUnknown)
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("event_listener", AttributeType::String)
                            .description("Event listener name. The name of the event listener to which the trigger is associated. The event listeners are defined in the definition repositories of the Tekton pipeline.")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("id", AttributeType::String)
                            .description("ID.")
                            .optional()
                            .computed()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("tags", AttributeType::list_of(AttributeType::String))
                            .description("Trigger tags array.")
                            .optional()
                            .computed()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("max_concurrent_runs", AttributeType::Number)
                            .description("Defines the maximum number of concurrent runs for this trigger. Omit this property to disable the concurrency limit.")
                            .optional()
                            .computed()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("disabled", AttributeType::Bool)
                            .description("Flag whether the trigger is disabled. If omitted the trigger is enabled by default.")
                            .optional()
                            .computed()
                            .default(false)
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("cron", AttributeType::String)
                            .description("Only needed for timer triggers. Cron expression for timer trigger. Maximum frequency is every 5 minutes.")
                            .optional()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("timezone", AttributeType::String)
                            .description("Only needed for timer triggers. Timezone for timer trigger.")
                            .optional()
                            .build(),
                    )
                    .block(
                        NestedBlockBuilder::single_list("worker")
                            .description("Worker used to run the trigger. If not specified the trigger will use the default pipeline worker.")
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
                                    .plan_modifier(RequiresReplace)
                                    .build(),
                            )
                            .build(),
                    )
                    .block(
                        NestedBlockBuilder::single_list("scm_source")
                            .description("SCM source repository for a Git trigger. Only needed for Git triggers.")
                            .attribute(
                                AttributeBuilder::new("url", AttributeType::String)
                                    .description("URL of the repository to which the trigger is listening.")
                                    .required()
                                    .plan_modifier(RequiresReplace)
                                    .build(),
                            )
                            .attribute(
                                AttributeBuilder::new("branch", AttributeType::String)
                                    .description("Name of a branch from the repo. One of branch or tag must be specified, but only one or the other.")
                                    .optional()
                                    .build(),
                            )
                            .attribute(
                                AttributeBuilder::new("pattern", AttributeType::String)
                                    .description("Git branch or tag pattern to listen to. Please refer to https://github.com/micromatch/micromatch for pattern syntax.")
                                    .optional()
                                    .build(),
                            )
                            .attribute(
                                AttributeBuilder::new("blind_connection", AttributeType::Bool)
                                    .description("Set this boolean to true if the server is not addressable on the public internet. IBM Cloud will not be able to validate the connection details you provide. False by default.")
                                    .optional()
                                    .build(),
                            )
                            .attribute(
                                AttributeBuilder::new("hook_id", AttributeType::String)
                                    .description("ID of the webhook from the repo. Computed upon creation of the trigger.")
                                    .computed()
                                    .build(),
                            )
                            .attribute(
                                AttributeBuilder::new("service_instance_id", AttributeType::String)
                                    .description("ID of the repository service instance.")
                                    .computed()
                                    .build(),
                            )
                            .build(),
                    )
                    .block(
                        NestedBlockBuilder::single_list("events")
                            .description("Only needed for Git triggers. Events object defines the events to which this Git trigger listens.")
                            .attribute(
                                AttributeBuilder::new("push", AttributeType::Bool)
                                    .description("If true, the trigger listens for 'push' Git webhook events.")
                                    .optional()
                                    .build(),
                            )
                            .attribute(
                                AttributeBuilder::new("pull_request_closed", AttributeType::Bool)
                                    .description("If true, the trigger listens for 'close pull request' Git webhook events.")
                                    .optional()
                                    .build(),
                            )
                            .attribute(
                                AttributeBuilder::new("pull_request", AttributeType::Bool)
                                    .description("If true, the trigger listens for 'open pull request' or 'update pull request' Git webhook events.")
                                    .optional()
                                    .build(),
                            )
                            .build(),
                    )
                    .block(
                        NestedBlockBuilder::single_list("secret")
                            .description("Only needed for generic webhook trigger type. Secret used to start generic webhook trigger.")
                            .attribute(
                                AttributeBuilder::new("type", AttributeType::String)
                                    .description("Secret type.")
                                    .required()
                                    .build(),
                            )
                            .attribute(
                                AttributeBuilder::new("value", AttributeType::String)
                                    .description("Secret value, not needed if secret type is `internal_validation`.")
                                    .optional()
                                    .sensitive()
                                    .build(),
                            )
                            .attribute(
                                AttributeBuilder::new("source", AttributeType::String)
                                    .description("Secret location, not needed if secret type is `internal_validation`.")
                                    .optional()
                                    .build(),
                            )
                            .attribute(
                                AttributeBuilder::new("key_name", AttributeType::String)
                                    .description("Secret name, not needed if type is `internal_validation`.")
                                    .optional()
                                    .build(),
                            )
                            .attribute(
                                AttributeBuilder::new("algorithm", AttributeType::String)
                                    .description("Algorithm used for `digest_matches` secret type. Only needed for `digest_matches` secret type.")
                                    .optional()
                                    .build(),
                            )
                            .build(),
                    )
                    .build(),
            )
            .build()
    }

    /// The trigger described by the `trigger` block of a plan or config
    fn trigger_from(value: &DynamicValue) -> Result<Trigger, Diagnostic> {
        let block = value
            .get(&AttributePath::new("trigger"))
            .and_then(trigger_block)
            .ok_or_else(|| {
                Diagnostic::error("Missing trigger block", "Exactly one trigger block is required")
                    .with_attribute(AttributePath::new("trigger"))
            })?;
        map_to_trigger(block).map_err(translate_error)
    }

    /// Merge patch of the `trigger` fields that differ between prior
    /// state and plan. Cleared scalars are sent as empty values.
    fn patch(prior: &DynamicValue, planned: &DynamicValue) -> Result<TriggerPatch, TranslateError> {
        let block = planned
            .get(&AttributePath::new("trigger"))
            .and_then(trigger_block)
            .cloned()
            .unwrap_or_default();
        // Unknown means computed and unconfigured: the API keeps its value
        let changed = |name: &str| {
            let path = trigger_path(name);
            !planned.get(&path).is_some_and(Dynamic::is_unknown) && has_change(prior, planned, &path)
        };

        let mut patch = TriggerPatch::default();
        if changed("name") {
            patch.name = Some(optional_string(&block, "name")?.unwrap_or_default());
        }
        if changed("events") {
            patch.events = single_block(&block, "events")?.map(map_to_events).transpose()?;
        }
        if changed("event_listener") {
            patch.event_listener = Some(optional_string(&block, "event_listener")?.unwrap_or_default());
        }
        if changed("tags") {
            patch.tags = Some(optional_strings(&block, "tags")?.unwrap_or_default());
        }
        if changed("worker") {
            patch.worker = single_block(&block, "worker")?.map(map_to_worker).transpose()?;
        }
        if changed("max_concurrent_runs") {
            patch.max_concurrent_runs = Some(optional_i64(&block, "max_concurrent_runs")?.unwrap_or(0));
        }
        if changed("secret") {
            patch.secret = single_block(&block, "secret")?.map(map_to_secret).transpose()?;
        }
        if changed("scm_source") {
            patch.scm_source = single_block(&block, "scm_source")?
                .map(map_to_scm_source)
                .transpose()?;
        }
        if changed("cron") {
            patch.cron = Some(optional_string(&block, "cron")?.unwrap_or_default());
        }
        if changed("timezone") {
            patch.timezone = Some(optional_string(&block, "timezone")?.unwrap_or_default());
        }
        if changed("disabled") {
            patch.disabled = Some(optional_bool(&block, "disabled")?.unwrap_or(false));
        }
        Ok(patch)
    }

    fn parse_id(value: &DynamicValue) -> Result<(String, String), Diagnostic> {
        let id = string_at(value, "id").unwrap_or_default();
        let mut parts = composite_id::parse(&id, 2).map_err(translate_error)?;
        let trigger_id = parts.pop().unwrap_or_default();
        let pipeline_id = parts.pop().unwrap_or_default();
        Ok((pipeline_id, trigger_id))
    }

    async fn read_state(
        ctx: &Context,
        client: &Client,
        pipeline_id: &str,
        trigger_id: &str,
        base: &DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        match client.tekton().triggers(pipeline_id).get(ctx, trigger_id).await {
            Ok(trigger) => Ok(Some(Self::state_from(base, pipeline_id, trigger_id, &trigger))),
            Err(e) if e.is_not_found() => {
                tracing::warn!(%pipeline_id, %trigger_id, "Tekton trigger not found, removing from state");
                Ok(None)
            }
            Err(e) => Err(api_error("GetTektonPipelineTrigger", &e)),
        }
    }

    fn state_from(
        base: &DynamicValue,
        pipeline_id: &str,
        trigger_id: &str,
        trigger: &Trigger,
    ) -> DynamicValue {
        let base = object_of(base);
        let base_block = base.get("trigger").and_then(trigger_block);

        let mut fresh_block = trigger_to_map(trigger);
        fresh_block.remove("properties");
        fresh_block.remove("webhook_url");
        // Nested blocks and optional values the configuration leaves out stay out of state
        if let Some(base_block) = base_block {
            for name in NESTED_BLOCKS {
                let configured = single_block(base_block, name).ok().flatten().is_some();
                if !configured {
                    fresh_block.remove(*name);
                }
            }
            if let Some(block) = Self::trigger_schema().block.block_type("trigger") {
                retain_unset(&block.block, base_block, &mut fresh_block);
            }
        }

        let mut fresh = Object::new();
        insert(&mut fresh, "id", composite_id::join(&[pipeline_id, trigger_id]));
        insert(&mut fresh, "pipeline_id", pipeline_id);
        insert_block(&mut fresh, "trigger", Some(fresh_block));
        DynamicValue::new(overlay(Dynamic::Map(base), fresh))
    }
}

#[async_trait]
impl Resource for TriggerResource {
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
            schema: Self::trigger_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
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

        let pipeline_id = string_at(&request.planned_state, "pipeline_id").unwrap_or_default();
        let trigger = match Self::trigger_from(&request.planned_state) {
            Ok(trigger) => trigger,
            Err(diag) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let created = match data.tekton.tekton().triggers(&pipeline_id).create(&ctx, &trigger).await {
            Ok(created) => created,
            Err(e) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![api_error("CreateTektonPipelineTrigger", &e)],
                }
            }
        };
        let trigger_id = match created.id() {
            Some(id) => id.to_string(),
            None => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![Diagnostic::error(
                        "Trigger created without an ID",
                        "The API response did not include the new trigger's ID",
                    )],
                }
            }
        };
        tracing::info!(%pipeline_id, %trigger_id, "created Tekton pipeline trigger");

        let fallback = Self::state_from(&request.planned_state, &pipeline_id, &trigger_id, &created);
        match Self::read_state(&ctx, &data.tekton, &pipeline_id, &trigger_id, &request.planned_state).await {
            Ok(Some(state)) => CreateResourceResponse {
                new_state: state,
                private: vec![],
                diagnostics: vec![],
            },
            Ok(None) => CreateResourceResponse {
                new_state: fallback,
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Tekton pipeline trigger not found after create",
                    format!("Trigger {} was created but could not be read back", trigger_id),
                )],
            },
            Err(diag) => CreateResourceResponse {
                new_state: fallback,
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

        let (pipeline_id, trigger_id) = match Self::parse_id(&request.current_state) {
            Ok(parts) => parts,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                    private: request.private,
                    deferred: None,
                }
            }
        };

        match Self::read_state(&ctx, &data.tekton, &pipeline_id, &trigger_id, &request.current_state).await {
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

        if has_change(
            &request.prior_state,
            &request.planned_state,
            &AttributePath::new("pipeline_id"),
        ) {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![force_new_error("pipeline_id")],
            };
        }

        let (pipeline_id, trigger_id) = match Self::parse_id(&request.prior_state) {
            Ok(parts) => parts,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let patch = match Self::patch(&request.prior_state, &request.planned_state) {
            Ok(patch) => patch,
            Err(e) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![translate_error(e)],
                }
            }
        };

        if !patch.is_empty() {
            let triggers = data.tekton.tekton().triggers(&pipeline_id);
            if let Err(e) = triggers.update(&ctx, &trigger_id, &patch).await {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![api_error("UpdateTektonPipelineTrigger", &e)],
                };
            }
            tracing::info!(%pipeline_id, %trigger_id, "updated Tekton pipeline trigger");
        }

        match Self::read_state(&ctx, &data.tekton, &pipeline_id, &trigger_id, &request.planned_state).await {
            Ok(Some(state)) => UpdateResourceResponse {
                new_state: state,
                private: vec![],
                diagnostics: vec![],
            },
            Ok(None) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Tekton pipeline trigger not found",
                    format!("Trigger {} disappeared during update", trigger_id),
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

        let (pipeline_id, trigger_id) = match Self::parse_id(&request.prior_state) {
            Ok(parts) => parts,
            Err(diag) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diag],
                }
            }
        };

        let mut diagnostics = vec![];
        if let Err(e) = data
            .tekton
            .tekton()
            .triggers(&pipeline_id)
            .delete(&ctx, &trigger_id)
            .await
        {
            diagnostics.push(api_error("DeleteTektonPipelineTrigger", &e));
        }
        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for TriggerResource {
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
impl ResourceWithImportState for TriggerResource {
    /// Accepts `pipeline_id/trigger_id`
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
            deferred: None,
        };

        let parts = match composite_id::parse(&request.id, 2) {
            Ok(parts) => parts,
            Err(e) => {
                response.diagnostics.push(Diagnostic::error(
                    "Unexpected Import Identifier",
                    format!("{}. Expected pipeline_id/trigger_id", e),
                ));
                return response;
            }
        };

        let mut state = Object::new();
        insert(&mut state, "id", request.id.as_str());
        insert(&mut state, "pipeline_id", parts[0].as_str());
        response.imported_resources.push(ImportedResource {
            type_name: request.type_name,
            state: DynamicValue::new(Dynamic::Map(state)),
            private: vec![],
        });
        response
    }
}

#[cfg(test)]
#[path = "./trigger_test.rs"]
mod trigger_test;
