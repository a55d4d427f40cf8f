//! The `ibm` provider: configuration, credentials and resource registration

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory, StopProviderRequest, StopProviderResponse,
    ValidateProviderConfigRequest, ValidateProviderConfigResponse,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue, ServerCapabilities};

use crate::api::auth::DEFAULT_IAM_ENDPOINT;
use crate::api::pool::{ConnectionPoolConfig, ConnectionPoolManager};
use crate::api::tekton::endpoint_for_region;
use crate::api::usage_reports::DEFAULT_URL as USAGE_REPORTS_DEFAULT_URL;
use crate::api::{Authenticator, Client, RetryConfig};
use crate::data_sources::PipelineDataSource;
use crate::provider_data::IbmProviderData;
use crate::resources::{pipeline, trigger, trigger_property};
use crate::resources::{PipelineResource, TriggerPropertyResource, TriggerResource};

pub const DEFAULT_REGION: &str = "us-south";
pub const DEFAULT_MAX_RETRIES: u32 = 10;
pub const DEFAULT_MAX_RETRY_INTERVAL: u64 = 30;

pub struct IbmProvider;

impl Default for IbmProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IbmProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn provider_schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("IBM Cloud provider")
            .attribute(
                AttributeBuilder::new("ibmcloud_api_key", AttributeType::String)
                    .description("The IBM Cloud API Key")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("iam_token", AttributeType::String)
                    .description("IAM Authentication token")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .description("The IBM cloud Region (for example 'us-south').")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_retries", AttributeType::Number)
                    .description("The retry count to set for API calls.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_retry_interval", AttributeType::Number)
                    .description("Upper bound in seconds of the wait between retries.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("iam_endpoint", AttributeType::String)
                    .description("IAM token endpoint used to exchange the API key.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cd_tekton_pipeline_endpoint", AttributeType::String)
                    .description("Override for the Continuous Delivery Tekton pipeline API endpoint.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enterprise_usage_reports_endpoint", AttributeType::String)
                    .description("Override for the enterprise usage reports API endpoint.")
                    .optional()
                    .build(),
            )
            .build()
    }
}

/// Provider block values after environment fallbacks and defaults
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub iam_token: Option<String>,
    pub region: String,
    pub max_retries: u32,
    pub max_retry_interval: u64,
    pub iam_endpoint: String,
    pub tekton_endpoint: String,
    pub usage_reports_endpoint: String,
}

fn config_string(config: &DynamicValue, name: &str) -> Option<String> {
    config
        .get(&AttributePath::new(name))
        .and_then(Dynamic::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn config_number(config: &DynamicValue, name: &str) -> Option<i64> {
    config.get(&AttributePath::new(name)).and_then(Dynamic::as_i64)
}

/// First non-empty variable among `names`
fn env_string(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_string(&[name])?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a number", name, raw);
            None
        }
    }
}

impl ProviderSettings {
    pub fn resolve(config: &DynamicValue) -> Self {
        let region = config_string(config, "region")
            .or_else(|| env_string(&["IC_REGION", "IBMCLOUD_REGION"]))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let max_retries = config_number(config, "max_retries")
            .and_then(|n| u32::try_from(n).ok())
            .or_else(|| env_number("MAX_RETRIES"))
            .unwrap_or(DEFAULT_MAX_RETRIES);
        let max_retry_interval = config_number(config, "max_retry_interval")
            .and_then(|n| u64::try_from(n).ok())
            .or_else(|| env_number("MAX_RETRY_INTERVAL"))
            .unwrap_or(DEFAULT_MAX_RETRY_INTERVAL);

        let tekton_endpoint = config_string(config, "cd_tekton_pipeline_endpoint")
            .or_else(|| env_string(&["IBMCLOUD_CD_TEKTON_PIPELINE_API_ENDPOINT"]))
            .unwrap_or_else(|| endpoint_for_region(&region));

        Self {
            api_key: config_string(config, "ibmcloud_api_key")
                .or_else(|| env_string(&["IC_API_KEY", "IBMCLOUD_API_KEY"])),
            iam_token: config_string(config, "iam_token")
                .or_else(|| env_string(&["IC_IAM_TOKEN", "IBMCLOUD_IAM_TOKEN"])),
            max_retries,
            max_retry_interval,
            iam_endpoint: config_string(config, "iam_endpoint")
                .or_else(|| env_string(&["IBMCLOUD_IAM_API_ENDPOINT"]))
                .unwrap_or_else(|| DEFAULT_IAM_ENDPOINT.to_string()),
            tekton_endpoint,
            usage_reports_endpoint: config_string(config, "enterprise_usage_reports_endpoint")
                .or_else(|| env_string(&["IBMCLOUD_ENTERPRISE_USAGE_REPORTS_API_ENDPOINT"]))
                .unwrap_or_else(|| USAGE_REPORTS_DEFAULT_URL.to_string()),
            region,
        }
    }

    /// API key exchange wins over a static token
    fn authenticator(&self) -> Result<Authenticator, Diagnostic> {
        if let Some(api_key) = &self.api_key {
            let http = ConnectionPoolManager::new(ConnectionPoolConfig::default())
                .build_client()
                .map_err(|e| {
                    Diagnostic::error("Failed to create IAM HTTP client", e.to_string())
                })?;
            return Ok(Authenticator::iam(api_key, &self.iam_endpoint, http));
        }
        if let Some(token) = &self.iam_token {
            return Ok(Authenticator::bearer(token));
        }
        Err(Diagnostic::error(
            "Missing credentials",
            "ibmcloud_api_key or iam_token is required (set in provider config or \
             IC_API_KEY / IC_IAM_TOKEN env vars)",
        ))
    }

    pub fn provider_data(&self) -> Result<IbmProviderData, Diagnostic> {
        let auth = self.authenticator()?;
        let retry = RetryConfig::from_settings(self.max_retries, self.max_retry_interval);
        let client = |endpoint: &str, name: &str| {
            Client::with_config(endpoint, auth.clone(), retry.clone()).map_err(|e| {
                Diagnostic::error(
                    format!("Failed to create {} client", name),
                    format!("{}: {}", endpoint, e),
                )
            })
        };
        Ok(IbmProviderData::new(
            client(&self.tekton_endpoint, "Tekton pipeline")?,
            client(&self.usage_reports_endpoint, "usage reports")?,
        ))
    }
}

#[async_trait]
impl Provider for IbmProvider {
    fn type_name(&self) -> &str {
        "ibm"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: Self::provider_schema(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let settings = ProviderSettings::resolve(&request.config);
        tracing::debug!(
            region = %settings.region,
            tekton_endpoint = %settings.tekton_endpoint,
            usage_reports_endpoint = %settings.usage_reports_endpoint,
            max_retries = settings.max_retries,
            "configuring ibm provider"
        );

        match settings.provider_data() {
            Ok(data) => ConfigureProviderResponse {
                diagnostics: vec![],
                provider_data: Some(Arc::new(data)),
            },
            Err(diag) => {
                tracing::error!("Provider configuration failed: {}", diag.summary);
                ConfigureProviderResponse {
                    diagnostics: vec![diag],
                    provider_data: None,
                }
            }
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut diagnostics = vec![];
        for name in ["max_retries", "max_retry_interval"] {
            let value = request.config.get(&AttributePath::new(name));
            if let Some(Dynamic::Number(n)) = value {
                if *n < 0.0 || n.fract() != 0.0 {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("Invalid {}", name),
                            format!("{} must be a non-negative whole number, got {}", name, n),
                        )
                        .with_attribute(AttributePath::new(name)),
                    );
                }
            }
        }
        if config_string(&request.config, "ibmcloud_api_key").is_some()
            && config_string(&request.config, "iam_token").is_some()
        {
            diagnostics.push(Diagnostic::warning(
                "Both ibmcloud_api_key and iam_token are set",
                "The API key is used and iam_token is ignored",
            ));
        }
        ValidateProviderConfigResponse { diagnostics }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        tracing::info!("ibm provider stopping");
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            pipeline::TYPE_NAME.to_string(),
            Box::new(|| Box::new(PipelineResource::new()) as Box<dyn ResourceWithConfigure>),
        );
        factories.insert(
            trigger::TYPE_NAME.to_string(),
            Box::new(|| Box::new(TriggerResource::new()) as Box<dyn ResourceWithConfigure>),
        );
        factories.insert(
            trigger_property::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(TriggerPropertyResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            crate::data_sources::pipeline::TYPE_NAME.to_string(),
            Box::new(|| Box::new(PipelineDataSource::new()) as Box<dyn DataSourceWithConfigure>),
        );
        factories
    }
}
