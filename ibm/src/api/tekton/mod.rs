//! Continuous Delivery Tekton pipeline API (v2)

pub mod models;
mod pipelines;
mod properties;
mod triggers;

pub use models::*;
pub use pipelines::PipelinesApi;
pub use properties::TriggerPropertiesApi;
pub use triggers::TriggersApi;

use crate::api::client::Client;

/// Regional endpoint, `{region}` is replaced by the configured region
pub const DEFAULT_URL_TEMPLATE: &str = "https://api.{region}.devops.cloud.ibm.com/pipeline/v2";

pub fn endpoint_for_region(region: &str) -> String {
    DEFAULT_URL_TEMPLATE.replace("{region}", region)
}

pub struct TektonApi<'a> {
    client: &'a Client,
}

impl<'a> TektonApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn pipelines(&self) -> PipelinesApi<'a> {
        PipelinesApi::new(self.client)
    }

    pub fn triggers(&self, pipeline_id: &str) -> TriggersApi<'a> {
        TriggersApi::new(self.client, pipeline_id)
    }

    pub fn trigger_properties(&self, pipeline_id: &str, trigger_id: &str) -> TriggerPropertiesApi<'a> {
        TriggerPropertiesApi::new(self.client, pipeline_id, trigger_id)
    }
}
