//! Tekton pipeline data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::provider_data::{not_configured, IbmProviderData};
use crate::resources::pipeline::{computed_pipeline_attributes, worker_type};
use crate::resources::{api_error, computed, resource_id_attribute, string_at};
use crate::translate::pipeline::pipeline_to_state;

pub const TYPE_NAME: &str = "ibm_cd_tekton_pipeline";

#[derive(Default)]
pub struct PipelineDataSource {
    provider_data: Option<IbmProviderData>,
}

impl PipelineDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pipeline_schema() -> Schema {
        let mut builder = SchemaBuilder::new()
            .version(0)
            .description("Reads a Tekton pipeline.")
            .attribute(computed("id", AttributeType::String, "The pipeline ID."))
            .attribute(resource_id_attribute("pipeline_id", "ID of current instance."))
            .attribute(computed(
                "worker",
                AttributeType::list_of(worker_type()),
                "Details of the worker used to run the pipeline.",
            ))
            .attribute(computed(
                "enable_slack_notifications",
                AttributeType::Bool,
                "Flag whether to enable slack notifications for this tekton pipeline.",
            ))
            .attribute(computed(
                "enable_partial_cloning",
                AttributeType::Bool,
                "Flag whether to enable partial cloning for this tekton pipeline.",
            ));
        for attribute in computed_pipeline_attributes() {
            builder = builder.attribute(attribute);
        }
        builder.build()
    }
}

#[async_trait]
impl DataSource for PipelineDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::pipeline_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let data = match &self.provider_data {
            Some(data) => data,
            None => {
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics: vec![not_configured()],
                    deferred: None,
                }
            }
        };

        let pipeline_id = match string_at(&request.config, "pipeline_id") {
            Some(id) => id,
            None => {
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics: vec![Diagnostic::error(
                        "Missing pipeline_id",
                        "pipeline_id must be set to read a Tekton pipeline",
                    )
                    .with_attribute(AttributePath::new("pipeline_id"))],
                    deferred: None,
                }
            }
        };

        tracing::debug!(%pipeline_id, "reading Tekton pipeline data source");
        match data.tekton.tekton().pipelines().get(&ctx, &pipeline_id).await {
            Ok(pipeline) => ReadDataSourceResponse {
                state: DynamicValue::new(Dynamic::Map(pipeline_to_state(&pipeline))),
                diagnostics: vec![],
                deferred: None,
            },
            Err(e) => ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics: vec![api_error("GetTektonPipeline", &e)],
                deferred: None,
            },
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for PipelineDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        match IbmProviderData::from_provider_data(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }
        ConfigureDataSourceResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::Server;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tfplug::types::ClientCapabilities;

    const PIPELINE_ID: &str = "94619026-912b-4d92-8f51-6c74f0692d90";

    async fn configured(url: &str) -> PipelineDataSource {
        let mut data_source = PipelineDataSource::new();
        let data = IbmProviderData::new(create_test_client(url), create_test_client(url));
        let response = data_source
            .configure(
                Context::new(),
                ConfigureDataSourceRequest {
                    provider_data: Some(Arc::new(data)),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        data_source
    }

    fn read_request() -> ReadDataSourceRequest {
        let config = HashMap::from([("pipeline_id".to_string(), Dynamic::from(PIPELINE_ID))]);
        ReadDataSourceRequest {
            type_name: TYPE_NAME.to_string(),
            config: PipelineDataSource::pipeline_schema()
                .conform(DynamicValue::new(Dynamic::Map(config))),
            provider_meta: None,
            client_capabilities: ClientCapabilities::default(),
        }
    }

    #[test]
    fn everything_but_pipeline_id_is_computed() {
        let schema = PipelineDataSource::pipeline_schema();
        for attribute in &schema.block.attributes {
            if attribute.name == "pipeline_id" {
                assert!(attribute.required);
            } else {
                assert!(attribute.computed, "{} should be computed", attribute.name);
            }
        }
        assert!(schema.block.attribute("triggers").is_some());
    }

    #[tokio::test]
    async fn read_returns_the_full_pipeline() {
        let mut server = Server::new_async().await;
        let get = server
            .mock("GET", format!("/tekton_pipelines/{}", PIPELINE_ID).as_str())
            .with_body(
                json!({
                    "id": PIPELINE_ID,
                    "name": "build",
                    "status": "configured",
                    "resource_group": {"id": "rg-1"},
                    "toolchain": {"id": "tc-1", "crn": "crn:v1:tc-1"},
                    "definitions": [],
                    "properties": [{"name": "env", "type": "text", "value": "dev", "href": "h"}],
                    "triggers": [{
                        "type": "manual",
                        "id": "trig-1",
                        "name": "deploy",
                        "event_listener": "listener",
                        "disabled": false
                    }],
                    "worker": {"id": "public", "name": "IBM Managed workers", "type": "public"},
                    "runs_url": "https://cloud.ibm.com/devops/pipelines/tekton/94619026",
                    "build_number": 7,
                    "enable_notifications": true,
                    "enable_partial_cloning": false,
                    "enabled": true
                })
                .to_string(),
            )
            .create_async()
            .await;
        let data_source = configured(&server.url()).await;

        let response = data_source.read(Context::new(), read_request()).await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), PIPELINE_ID);
        assert_eq!(
            state.get_string(&AttributePath::new("resource_group_id")).unwrap(),
            "rg-1"
        );
        assert!(state.get_bool(&AttributePath::new("enable_slack_notifications")).unwrap());
        let trigger_name = AttributePath::new("triggers").index(0).attribute("name");
        assert_eq!(state.get_string(&trigger_name).unwrap(), "deploy");
        let worker_id = AttributePath::new("worker").index(0).attribute("id");
        assert_eq!(state.get_string(&worker_id).unwrap(), "public");
        get.assert_async().await;
    }

    #[tokio::test]
    async fn read_error_is_wrapped() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", format!("/tekton_pipelines/{}", PIPELINE_ID).as_str())
            .with_status(404)
            .with_body(r#"{"errors":[{"code":"not_found","message":"Pipeline not found"}]}"#)
            .create_async()
            .await;
        let data_source = configured(&server.url()).await;

        let response = data_source.read(Context::new(), read_request()).await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .summary
            .starts_with("GetTektonPipelineWithContext failed Pipeline not found"));
    }

    #[tokio::test]
    async fn unconfigured_read_fails() {
        let response = PipelineDataSource::new()
            .read(Context::new(), read_request())
            .await;
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }
}
