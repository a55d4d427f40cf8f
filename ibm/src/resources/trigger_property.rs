//! Property of a Tekton pipeline trigger

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import_state_with_parts;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use super::{
    api_error, computed_id_attribute, force_new_error, has_change, overlay,
    resource_id_attribute, retain_unset, string_at, translate_error,
};
use crate::api::tekton::Property;
use crate::api::Client;
use crate::provider_data::{not_configured, IbmProviderData};
use crate::translate::composite_id;
use crate::translate::maps::{optional_string, optional_strings, required_string, Object};
use crate::translate::trigger::property_to_map;
use crate::translate::TranslateError;

pub const TYPE_NAME: &str = "ibm_cd_tekton_pipeline_trigger_property";

#[derive(Default)]
pub struct TriggerPropertyResource {
    provider_data: Option<IbmProviderData>,
}

/// pipeline_id, trigger_id and property name of a composite ID
struct PropertyId {
    pipeline_id: String,
    trigger_id: String,
    name: String,
}

impl PropertyId {
    fn parse(id: &str) -> Result<Self, TranslateError> {
        let mut parts = composite_id::parse(id, 3)?.into_iter();
        let mut next = || parts.next().unwrap_or_default();
        Ok(Self {
            pipeline_id: next(),
            trigger_id: next(),
            name: next(),
        })
    }

    fn join(&self) -> String {
        composite_id::join(&[self.pipeline_id.as_str(), self.trigger_id.as_str(), self.name.as_str()])
    }
}

impl TriggerPropertyResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property_schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a property of a Tekton pipeline trigger.")
            .attribute(computed_id_attribute())
            .attribute(resource_id_attribute("pipeline_id", "The Tekton pipeline ID."))
            .attribute(resource_id_attribute("trigger_id", "The trigger ID."))
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Property name.")
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .description("Property type.")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("value", AttributeType::String)
                    .description("Property value. Any string value is valid.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enum", AttributeType::list_of(AttributeType::String))
                    .description("Options for `single_select` property type. Only needed for `single_select` property type.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("path", AttributeType::String)
                    .description("A dot notation path for `integration` type properties only, that selects a value from the tool integration. If left blank the full tool integration data will be used.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("href", AttributeType::String)
                    .description("API URL for interacting with the trigger property.")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .build()
    }

    fn property_from(value: &DynamicValue) -> Result<Property, TranslateError> {
        let map = match &value.value {
            Dynamic::Map(map) => map.clone(),
            _ => Object::new(),
        };
        Ok(Property {
            name: required_string(&map, "name")?,
            value: optional_string(&map, "value")?,
            enum_values: optional_strings(&map, "enum")?,
            property_type: required_string(&map, "type")?,
            path: optional_string(&map, "path")?,
            href: None,
        })
    }

    async fn read_state(
        ctx: &Context,
        client: &Client,
        id: &PropertyId,
        base: &DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let properties = client
            .tekton()
            .trigger_properties(&id.pipeline_id, &id.trigger_id);
        match properties.get(ctx, &id.name).await {
            Ok(property) => Ok(Some(Self::state_from(base, id, &property))),
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    pipeline_id = %id.pipeline_id,
                    trigger_id = %id.trigger_id,
                    name = %id.name,
                    "trigger property not found, removing from state"
                );
                Ok(None)
            }
            Err(e) => Err(api_error("GetTektonPipelineTriggerProperty", &e)),
        }
    }

    fn state_from(base: &DynamicValue, id: &PropertyId, property: &Property) -> DynamicValue {
        let mut fresh = property_to_map(property);
        // An imported state has no type yet and takes everything the API returns
        if let Dynamic::Map(base) = &base.value {
            if base.get("type").is_some_and(Dynamic::is_known) {
                retain_unset(&Self::property_schema().block, base, &mut fresh);
            }
        }
        fresh.insert("id".to_string(), Dynamic::from(id.join()));
        fresh.insert("pipeline_id".to_string(), Dynamic::from(id.pipeline_id.as_str()));
        fresh.insert("trigger_id".to_string(), Dynamic::from(id.trigger_id.as_str()));
        DynamicValue::new(overlay(base.value.clone(), fresh))
    }
}

#[async_trait]
impl Resource for TriggerPropertyResource {
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
            schema: Self::property_schema(),
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

        let property = match Self::property_from(&request.planned_state) {
            Ok(property) => property,
            Err(e) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![translate_error(e)],
                }
            }
        };
        let id = PropertyId {
            pipeline_id: string_at(&request.planned_state, "pipeline_id").unwrap_or_default(),
            trigger_id: string_at(&request.planned_state, "trigger_id").unwrap_or_default(),
            name: property.name.clone(),
        };

        let created = match data
            .tekton
            .tekton()
            .trigger_properties(&id.pipeline_id, &id.trigger_id)
            .create(&ctx, &property)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics: vec![api_error("CreateTektonPipelineTriggerProperties", &e)],
                }
            }
        };
        tracing::info!(id = %id.join(), "created trigger property");

        let fallback = Self::state_from(&request.planned_state, &id, &created);
        match Self::read_state(&ctx, &data.tekton, &id, &request.planned_state).await {
            Ok(Some(state)) => CreateResourceResponse {
                new_state: state,
                private: vec![],
                diagnostics: vec![],
            },
            Ok(None) => CreateResourceResponse {
                new_state: fallback,
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Trigger property not found after create",
                    format!("Property {} was created but could not be read back", id.name),
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

        let id = match PropertyId::parse(&string_at(&request.current_state, "id").unwrap_or_default()) {
            Ok(id) => id,
            Err(e) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![translate_error(e)],
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

        for attribute in ["pipeline_id", "trigger_id"] {
            if has_change(
                &request.prior_state,
                &request.planned_state,
                &AttributePath::new(attribute),
            ) {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![force_new_error(attribute)],
                };
            }
        }

        let id = match PropertyId::parse(&string_at(&request.prior_state, "id").unwrap_or_default()) {
            Ok(id) => id,
            Err(e) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![translate_error(e)],
                }
            }
        };
        let property = match Self::property_from(&request.planned_state) {
            Ok(property) => property,
            Err(e) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![translate_error(e)],
                }
            }
        };

        let replaced = match data
            .tekton
            .tekton()
            .trigger_properties(&id.pipeline_id, &id.trigger_id)
            .replace(&ctx, &id.name, &property)
            .await
        {
            Ok(replaced) => replaced,
            Err(e) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![api_error("ReplaceTektonPipelineTriggerProperty", &e)],
                }
            }
        };
        tracing::info!(id = %id.join(), "replaced trigger property");

        match Self::read_state(&ctx, &data.tekton, &id, &request.planned_state).await {
            Ok(Some(state)) => UpdateResourceResponse {
                new_state: state,
                private: vec![],
                diagnostics: vec![],
            },
            Ok(None) => UpdateResourceResponse {
                new_state: Self::state_from(&request.planned_state, &id, &replaced),
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Trigger property not found",
                    format!("Property {} disappeared during update", id.name),
                )],
            },
            Err(diag) => UpdateResourceResponse {
                new_state: Self::state_from(&request.planned_state, &id, &replaced),
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

        let id = match PropertyId::parse(&string_at(&request.prior_state, "id").unwrap_or_default()) {
            Ok(id) => id,
            Err(e) => {
                return DeleteResourceResponse {
                    diagnostics: vec![translate_error(e)],
                }
            }
        };

        let mut diagnostics = vec![];
        if let Err(e) = data
            .tekton
            .tekton()
            .trigger_properties(&id.pipeline_id, &id.trigger_id)
            .delete(&ctx, &id.name)
            .await
        {
            diagnostics.push(api_error("DeleteTektonPipelineTriggerProperty", &e));
        }
        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for TriggerPropertyResource {
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
impl ResourceWithImportState for TriggerPropertyResource {
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
        import_state_with_parts(
            &ctx,
            &["pipeline_id", "trigger_id", "name"],
            &request,
            &mut response,
        );
        response
    }
}
