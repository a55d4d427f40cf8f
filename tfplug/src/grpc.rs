//! gRPC service implementation
//!
//! Adapts the Provider/Resource/DataSource traits to Terraform Plugin
//! Protocol 6. Resources and data sources are created from the provider's
//! factories for every call and configured with the data the provider
//! returned from ConfigureProvider.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceSchemaRequest, DataSourceWithConfigure,
    ReadDataSourceRequest, ValidateDataSourceConfigRequest,
};
use crate::error::TfplugError;
use crate::plan::plan_resource_change;
use crate::proto::{self, attribute_path::step::Selector, ProviderService};
use crate::provider::{
    ConfigureProviderRequest, DataSourceFactory, Provider, ProviderMetaSchemaRequest,
    ProviderMetadataRequest, ProviderSchemaRequest, ResourceFactory, StopProviderRequest,
    ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, ResourceSchemaRequest,
    ResourceWithConfigure, UpdateResourceRequest, ValidateResourceConfigRequest,
};
use crate::schema::{Block, NestingMode, Schema, StringKind};
use crate::types::{
    has_errors, AttributePath, AttributePathStep, ClientCapabilities, Deferred, DeferredReason,
    Diagnostic, DiagnosticSeverity, DynamicValue, ServerCapabilities,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};

type ProviderData = Option<Arc<dyn Any + Send + Sync>>;

pub struct GrpcProviderServer<P: Provider> {
    provider: Arc<RwLock<P>>,
    provider_data: Arc<RwLock<ProviderData>>,
    resources: HashMap<String, ResourceFactory>,
    data_sources: HashMap<String, DataSourceFactory>,
}

impl<P: Provider + 'static> GrpcProviderServer<P> {
    pub fn new(provider: P) -> Self {
        let resources = provider.resources();
        let data_sources = provider.data_sources();
        Self {
            provider: Arc::new(RwLock::new(provider)),
            provider_data: Arc::new(RwLock::new(None)),
            resources,
            data_sources,
        }
    }

    #[allow(clippy::result_large_err)]
    fn new_resource(&self, type_name: &str) -> Result<Box<dyn ResourceWithConfigure>, Status> {
        self.resources
            .get(type_name)
            .map(|factory| factory())
            .ok_or_else(|| not_found(TfplugError::ResourceNotFound(type_name.to_string())))
    }

    #[allow(clippy::result_large_err)]
    fn new_data_source(&self, type_name: &str) -> Result<Box<dyn DataSourceWithConfigure>, Status> {
        self.data_sources
            .get(type_name)
            .map(|factory| factory())
            .ok_or_else(|| not_found(TfplugError::DataSourceNotFound(type_name.to_string())))
    }

    async fn resource_schema(&self, ctx: &Context, type_name: &str) -> Result<Schema, Status> {
        let resource = self.new_resource(type_name)?;
        Ok(resource
            .schema(ctx.clone(), ResourceSchemaRequest)
            .await
            .schema)
    }

    async fn configured_resource(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> Result<(Box<dyn ResourceWithConfigure>, Vec<Diagnostic>), Status> {
        let mut resource = self.new_resource(type_name)?;
        let provider_data = self.provider_data.read().await.clone();
        let response = resource
            .configure(ctx.clone(), ConfigureResourceRequest { provider_data })
            .await;
        Ok((resource, response.diagnostics))
    }

    async fn configured_data_source(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> Result<(Box<dyn DataSourceWithConfigure>, Vec<Diagnostic>), Status> {
        let mut data_source = self.new_data_source(type_name)?;
        let provider_data = self.provider_data.read().await.clone();
        let response = data_source
            .configure(ctx.clone(), ConfigureDataSourceRequest { provider_data })
            .await;
        Ok((data_source, response.diagnostics))
    }
}

#[tonic::async_trait]
impl<P: Provider + 'static> ProviderService for GrpcProviderServer<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> Result<Response<proto::get_metadata::Response>, Status> {
        let ctx = Context::new();
        let metadata = self
            .provider
            .read()
            .await
            .metadata(ctx, ProviderMetadataRequest)
            .await;

        let mut resources: Vec<_> = self.resources.keys().cloned().collect();
        resources.sort();
        let mut data_sources: Vec<_> = self.data_sources.keys().cloned().collect();
        data_sources.sort();

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(server_capabilities_to_proto(
                &metadata.server_capabilities,
            )),
            diagnostics: vec![],
            data_sources: data_sources
                .into_iter()
                .map(|type_name| proto::get_metadata::DataSourceMetadata { type_name })
                .collect(),
            resources: resources
                .into_iter()
                .map(|type_name| proto::get_metadata::ResourceMetadata { type_name })
                .collect(),
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> Result<Response<proto::get_provider_schema::Response>, Status> {
        let ctx = Context::new();
        let provider = self.provider.read().await;
        let metadata = provider
            .metadata(ctx.clone(), ProviderMetadataRequest)
            .await;
        let provider_schema = provider.schema(ctx.clone(), ProviderSchemaRequest).await;
        let meta_schema = provider
            .meta_schema(ctx.clone(), ProviderMetaSchemaRequest)
            .await;

        let mut diagnostics = provider_schema.diagnostics;
        diagnostics.extend(meta_schema.diagnostics);

        let mut resource_schemas = HashMap::new();
        for (name, factory) in &self.resources {
            let response = factory().schema(ctx.clone(), ResourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            resource_schemas.insert(name.clone(), schema_to_proto(&response.schema));
        }

        let mut data_source_schemas = HashMap::new();
        for (name, factory) in &self.data_sources {
            let response = factory()
                .schema(ctx.clone(), DataSourceSchemaRequest)
                .await;
            diagnostics.extend(response.diagnostics);
            data_source_schemas.insert(name.clone(), schema_to_proto(&response.schema));
        }

        tracing::debug!(
            resources = resource_schemas.len(),
            data_sources = data_source_schemas.len(),
            "serving provider schema"
        );

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(schema_to_proto(&provider_schema.schema)),
            resource_schemas,
            data_source_schemas,
            diagnostics: diagnostics_to_proto(diagnostics),
            provider_meta: meta_schema.schema.as_ref().map(schema_to_proto),
            server_capabilities: Some(server_capabilities_to_proto(
                &metadata.server_capabilities,
            )),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> Result<Response<proto::validate_provider_config::Response>, Status> {
        let req = request.into_inner();
        let ctx = Context::new();
        let config = decode_dynamic_value(req.config)?;

        let provider = self.provider.read().await;
        let schema = provider
            .schema(ctx.clone(), ProviderSchemaRequest)
            .await
            .schema;
        let mut diagnostics = schema.validate(&config);
        let response = provider
            .validate(ctx, ValidateProviderConfigRequest { config })
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> Result<Response<proto::validate_resource_config::Response>, Status> {
        let req = request.into_inner();
        let ctx = Context::new();
        let config = decode_dynamic_value(req.config)?;
        let resource = self.new_resource(&req.type_name)?;

        let schema = resource
            .schema(ctx.clone(), ResourceSchemaRequest)
            .await
            .schema;
        let mut diagnostics = schema.validate(&config);
        let response = resource
            .validate(
                ctx,
                ValidateResourceConfigRequest {
                    type_name: req.type_name,
                    config,
                    client_capabilities: client_capabilities_from_proto(req.client_capabilities),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::validate_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> Result<Response<proto::validate_data_resource_config::Response>, Status> {
        let req = request.into_inner();
        let ctx = Context::new();
        let config = decode_dynamic_value(req.config)?;
        let data_source = self.new_data_source(&req.type_name)?;

        let schema = data_source
            .schema(ctx.clone(), DataSourceSchemaRequest)
            .await
            .schema;
        let mut diagnostics = schema.validate(&config);
        let response = data_source
            .validate(
                ctx,
                ValidateDataSourceConfigRequest {
                    type_name: req.type_name,
                    config,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::validate_data_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> Result<Response<proto::upgrade_resource_state::Response>, Status> {
        let req = request.into_inner();
        let ctx = Context::new();
        let schema = self.resource_schema(&ctx, &req.type_name).await?;
        let raw_state = req.raw_state.unwrap_or_default();

        let mut diagnostics = Vec::new();
        if req.version > schema.version {
            diagnostics.push(Diagnostic::error(
                "Unsupported state version",
                format!(
                    "Stored state for {} has version {}, newer than the provider's schema version {}.",
                    req.type_name, req.version, schema.version
                ),
            ));
        }

        // Schemas have never changed shape, so stored JSON is used as-is
        let state = if !raw_state.json.is_empty() {
            DynamicValue::decode_json(&raw_state.json)
                .map_err(|e| Status::invalid_argument(e.to_string()))?
        } else {
            if !raw_state.flatmap.is_empty() {
                diagnostics.push(Diagnostic::error(
                    "Unsupported state format",
                    "Legacy flatmap state cannot be upgraded by this provider.",
                ));
            }
            DynamicValue::null()
        };

        Ok(Response::new(proto::upgrade_resource_state::Response {
            upgraded_state: Some(encode_dynamic_value(state, &schema)?),
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> Result<Response<proto::configure_provider::Response>, Status> {
        let req = request.into_inner();
        let ctx = Context::new();
        let config = decode_dynamic_value(req.config)?;

        tracing::info!(
            terraform_version = %req.terraform_version,
            "configuring provider"
        );

        let response = self
            .provider
            .write()
            .await
            .configure(
                ctx,
                ConfigureProviderRequest {
                    terraform_version: req.terraform_version,
                    config,
                    client_capabilities: client_capabilities_from_proto(req.client_capabilities),
                },
            )
            .await;

        if !has_errors(&response.diagnostics) {
            *self.provider_data.write().await = response.provider_data;
        }

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: diagnostics_to_proto(response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> Result<Response<proto::read_resource::Response>, Status> {
        let req = request.into_inner();
        let ctx = Context::new();
        let schema = self.resource_schema(&ctx, &req.type_name).await?;
        let current_state = decode_dynamic_value(req.current_state)?;
        let provider_meta = decode_optional(req.provider_meta)?;

        let (resource, diagnostics) = self.configured_resource(&ctx, &req.type_name).await?;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::read_resource::Response {
                new_state: Some(encode_dynamic_value(current_state, &schema)?),
                diagnostics: diagnostics_to_proto(diagnostics),
                private: req.private,
                deferred: None,
            }));
        }

        let response = resource
            .read(
                ctx,
                ReadResourceRequest {
                    type_name: req.type_name,
                    current_state,
                    private: req.private,
                    provider_meta,
                    client_capabilities: client_capabilities_from_proto(req.client_capabilities),
                },
            )
            .await;

        let new_state = response.new_state.unwrap_or_else(DynamicValue::null);
        let mut all = diagnostics;
        all.extend(response.diagnostics);

        Ok(Response::new(proto::read_resource::Response {
            new_state: Some(encode_dynamic_value(new_state, &schema)?),
            diagnostics: diagnostics_to_proto(all),
            private: response.private,
            deferred: deferred_to_proto(response.deferred),
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> Result<Response<proto::plan_resource_change::Response>, Status> {
        let req = request.into_inner();
        let ctx = Context::new();
        let schema = self.resource_schema(&ctx, &req.type_name).await?;
        let prior_state = decode_dynamic_value(req.prior_state)?;
        let proposed_new_state = decode_dynamic_value(req.proposed_new_state)?;
        let config = decode_dynamic_value(req.config)?;

        let planned = plan_resource_change(&schema, &prior_state, &proposed_new_state, &config);

        tracing::debug!(
            type_name = %req.type_name,
            requires_replace = planned.requires_replace.len(),
            "planned resource change"
        );

        Ok(Response::new(proto::plan_resource_change::Response {
            planned_state: Some(encode_dynamic_value(planned.planned_state, &schema)?),
            requires_replace: planned.requires_replace.iter().map(path_to_proto).collect(),
            planned_private: req.prior_private,
            diagnostics: diagnostics_to_proto(planned.diagnostics),
            legacy_type_system: false,
            deferred: None,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> Result<Response<proto::apply_resource_change::Response>, Status> {
        let req = request.into_inner();
        let ctx = Context::new();
        let schema = self.resource_schema(&ctx, &req.type_name).await?;
        let prior_state = decode_dynamic_value(req.prior_state)?;
        let planned_state = decode_dynamic_value(req.planned_state)?;
        let config = decode_dynamic_value(req.config)?;
        let provider_meta = decode_optional(req.provider_meta)?;

        let (resource, mut diagnostics) = self.configured_resource(&ctx, &req.type_name).await?;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::apply_resource_change::Response {
                new_state: Some(encode_dynamic_value(prior_state, &schema)?),
                private: req.planned_private,
                diagnostics: diagnostics_to_proto(diagnostics),
                legacy_type_system: false,
            }));
        }

        let (new_state, private) = if planned_state.is_null() {
            tracing::info!(type_name = %req.type_name, "deleting resource");
            let kept = prior_state.clone();
            let response = resource
                .delete(
                    ctx,
                    DeleteResourceRequest {
                        type_name: req.type_name,
                        prior_state,
                        planned_private: req.planned_private.clone(),
                        provider_meta,
                    },
                )
                .await;
            let failed = has_errors(&response.diagnostics);
            diagnostics.extend(response.diagnostics);
            // A failed delete leaves the resource in state
            if failed {
                (kept, req.planned_private)
            } else {
                (DynamicValue::null(), Vec::new())
            }
        } else if prior_state.is_null() {
            tracing::info!(type_name = %req.type_name, "creating resource");
            let response = resource
                .create(
                    ctx,
                    CreateResourceRequest {
                        type_name: req.type_name,
                        planned_state,
                        config,
                        planned_private: req.planned_private,
                        provider_meta,
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);
            (response.new_state, response.private)
        } else {
            tracing::info!(type_name = %req.type_name, "updating resource");
            let response = resource
                .update(
                    ctx,
                    UpdateResourceRequest {
                        type_name: req.type_name,
                        prior_state,
                        planned_state,
                        config,
                        planned_private: req.planned_private,
                        provider_meta,
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);
            (response.new_state, response.private)
        };

        Ok(Response::new(proto::apply_resource_change::Response {
            new_state: Some(encode_dynamic_value(new_state, &schema)?),
            private,
            diagnostics: diagnostics_to_proto(diagnostics),
            legacy_type_system: false,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> Result<Response<proto::import_resource_state::Response>, Status> {
        let req = request.into_inner();
        let ctx = Context::new();
        let schema = self.resource_schema(&ctx, &req.type_name).await?;
        let (resource, mut diagnostics) = self.configured_resource(&ctx, &req.type_name).await?;

        let importer = match resource.as_import_state() {
            Some(importer) if !has_errors(&diagnostics) => importer,
            Some(_) => {
                return Ok(Response::new(proto::import_resource_state::Response {
                    imported_resources: vec![],
                    diagnostics: diagnostics_to_proto(diagnostics),
                    deferred: None,
                }))
            }
            None => {
                diagnostics.push(Diagnostic::error(
                    "Resource Import Not Implemented",
                    format!(
                        "Import is not supported by resource type {}.",
                        req.type_name
                    ),
                ));
                return Ok(Response::new(proto::import_resource_state::Response {
                    imported_resources: vec![],
                    diagnostics: diagnostics_to_proto(diagnostics),
                    deferred: None,
                }));
            }
        };

        let response = importer
            .import_state(
                ctx,
                ImportResourceStateRequest {
                    type_name: req.type_name,
                    id: req.id,
                    client_capabilities: client_capabilities_from_proto(req.client_capabilities),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        let mut imported_resources = Vec::with_capacity(response.imported_resources.len());
        for imported in response.imported_resources {
            imported_resources.push(proto::import_resource_state::ImportedResource {
                type_name: imported.type_name,
                state: Some(encode_dynamic_value(imported.state, &schema)?),
                private: imported.private,
            });
        }

        Ok(Response::new(proto::import_resource_state::Response {
            imported_resources,
            diagnostics: diagnostics_to_proto(diagnostics),
            deferred: deferred_to_proto(response.deferred),
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> Result<Response<proto::read_data_source::Response>, Status> {
        let req = request.into_inner();
        let ctx = Context::new();
        let config = decode_dynamic_value(req.config)?;
        let provider_meta = decode_optional(req.provider_meta)?;

        let (data_source, mut diagnostics) =
            self.configured_data_source(&ctx, &req.type_name).await?;
        let schema = data_source
            .schema(ctx.clone(), DataSourceSchemaRequest)
            .await
            .schema;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::read_data_source::Response {
                state: Some(encode_dynamic_value(DynamicValue::null(), &schema)?),
                diagnostics: diagnostics_to_proto(diagnostics),
                deferred: None,
            }));
        }

        let response = data_source
            .read(
                ctx,
                ReadDataSourceRequest {
                    type_name: req.type_name,
                    config,
                    provider_meta,
                    client_capabilities: client_capabilities_from_proto(req.client_capabilities),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::read_data_source::Response {
            state: Some(encode_dynamic_value(response.state, &schema)?),
            diagnostics: diagnostics_to_proto(diagnostics),
            deferred: deferred_to_proto(response.deferred),
        }))
    }

    async fn get_functions(
        &self,
        _request: Request<proto::get_functions::Request>,
    ) -> Result<Response<proto::get_functions::Response>, Status> {
        Ok(Response::new(proto::get_functions::Response {
            functions: HashMap::new(),
            diagnostics: vec![],
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> Result<Response<proto::stop_provider::Response>, Status> {
        let response = self
            .provider
            .read()
            .await
            .stop(Context::new(), StopProviderRequest)
            .await;
        Ok(Response::new(proto::stop_provider::Response {
            error: response.error.unwrap_or_default(),
        }))
    }
}

// Helper functions

fn not_found(err: TfplugError) -> Status {
    Status::not_found(err.to_string())
}

#[allow(clippy::result_large_err)]
fn decode_dynamic_value(value: Option<proto::DynamicValue>) -> Result<DynamicValue, Status> {
    let value = match value {
        Some(v) => v,
        None => return Ok(DynamicValue::null()),
    };

    if !value.msgpack.is_empty() {
        DynamicValue::decode_msgpack(&value.msgpack)
            .map_err(|e| Status::invalid_argument(e.to_string()))
    } else if !value.json.is_empty() {
        DynamicValue::decode_json(&value.json).map_err(|e| Status::invalid_argument(e.to_string()))
    } else {
        Ok(DynamicValue::null())
    }
}

#[allow(clippy::result_large_err)]
fn decode_optional(value: Option<proto::DynamicValue>) -> Result<Option<DynamicValue>, Status> {
    value.map(|v| decode_dynamic_value(Some(v))).transpose()
}

/// Terraform decodes msgpack against the schema type, so every attribute
/// has to be present
#[allow(clippy::result_large_err)]
fn encode_dynamic_value(value: DynamicValue, schema: &Schema) -> Result<proto::DynamicValue, Status> {
    let msgpack = schema
        .conform(value)
        .encode_msgpack()
        .map_err(|e| Status::internal(e.to_string()))?;
    Ok(proto::DynamicValue {
        msgpack,
        json: vec![],
    })
}

fn schema_to_proto(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(block_to_proto(&schema.block)),
    }
}

fn block_to_proto(block: &Block) -> proto::schema::Block {
    proto::schema::Block {
        version: block.version,
        attributes: block
            .attributes
            .iter()
            .map(|attr| proto::schema::Attribute {
                name: attr.name.clone(),
                r#type: attr.r#type.to_type_bytes(),
                description: attr.description.clone(),
                required: attr.required,
                optional: attr.optional,
                computed: attr.computed,
                sensitive: attr.sensitive,
                description_kind: string_kind_to_proto(block.description_kind),
                deprecated: attr.deprecated,
                write_only: false,
            })
            .collect(),
        block_types: block
            .block_types
            .iter()
            .map(|nested| proto::schema::NestedBlock {
                type_name: nested.type_name.clone(),
                block: Some(block_to_proto(&nested.block)),
                nesting: nesting_to_proto(nested.nesting),
                min_items: nested.min_items,
                max_items: nested.max_items,
            })
            .collect(),
        description: block.description.clone(),
        description_kind: string_kind_to_proto(block.description_kind),
        deprecated: block.deprecated,
    }
}

fn string_kind_to_proto(kind: StringKind) -> i32 {
    match kind {
        StringKind::Plain => proto::StringKind::Plain as i32,
        StringKind::Markdown => proto::StringKind::Markdown as i32,
    }
}

fn nesting_to_proto(nesting: NestingMode) -> i32 {
    use proto::schema::nested_block::NestingMode as Proto;
    let mode = match nesting {
        NestingMode::Invalid => Proto::Invalid,
        NestingMode::Single => Proto::Single,
        NestingMode::List => Proto::List,
        NestingMode::Set => Proto::Set,
        NestingMode::Map => Proto::Map,
        NestingMode::Group => Proto::Group,
    };
    mode as i32
}

fn path_to_proto(path: &AttributePath) -> proto::AttributePath {
    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| proto::attribute_path::Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => Selector::AttributeName(name.clone()),
                    AttributePathStep::ElementKeyString(key) => {
                        Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => Selector::ElementKeyInt(*idx),
                }),
            })
            .collect(),
    }
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<proto::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|diag| {
            let severity = match diag.severity {
                DiagnosticSeverity::Invalid => proto::diagnostic::Severity::Invalid,
                DiagnosticSeverity::Error => proto::diagnostic::Severity::Error,
                DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning,
            };
            proto::Diagnostic {
                severity: severity as i32,
                summary: diag.summary,
                detail: diag.detail,
                attribute: diag
                    .attribute
                    .filter(|path| !path.steps.is_empty())
                    .as_ref()
                    .map(path_to_proto),
            }
        })
        .collect()
}

fn client_capabilities_from_proto(caps: Option<proto::ClientCapabilities>) -> ClientCapabilities {
    caps.map(|c| ClientCapabilities {
        deferral_allowed: c.deferral_allowed,
        write_only_attributes_allowed: c.write_only_attributes_allowed,
    })
    .unwrap_or_default()
}

fn server_capabilities_to_proto(caps: &ServerCapabilities) -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: caps.plan_destroy,
        get_provider_schema_optional: caps.get_provider_schema_optional,
        move_resource_state: caps.move_resource_state,
    }
}

fn deferred_to_proto(deferred: Option<Deferred>) -> Option<proto::Deferred> {
    deferred.map(|d| {
        let reason = match d.reason {
            DeferredReason::Unknown => proto::deferred::Reason::Unknown,
            DeferredReason::ResourceConfigUnknown => proto::deferred::Reason::ResourceConfigUnknown,
            DeferredReason::ProviderConfigUnknown => proto::deferred::Reason::ProviderConfigUnknown,
            DeferredReason::AbsentPrereq => proto::deferred::Reason::AbsentPrereq,
        };
        proto::Deferred {
            reason: reason as i32,
        }
    })
}
