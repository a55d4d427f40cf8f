use tfplug::Context;

use super::models::Property;
use crate::api::client::Client;
use crate::api::common::segment;
use crate::api::error::ApiError;

/// Properties of one trigger
pub struct TriggerPropertiesApi<'a> {
    client: &'a Client,
    pipeline_id: String,
    trigger_id: String,
}

impl<'a> TriggerPropertiesApi<'a> {
    pub fn new(client: &'a Client, pipeline_id: &str, trigger_id: &str) -> Self {
        Self {
            client,
            pipeline_id: pipeline_id.to_string(),
            trigger_id: trigger_id.to_string(),
        }
    }

    fn base_path(&self) -> String {
        format!(
            "/tekton_pipelines/{}/triggers/{}/properties",
            segment(&self.pipeline_id),
            segment(&self.trigger_id)
        )
    }

    fn path(&self, name: &str) -> String {
        format!("{}/{}", self.base_path(), segment(name))
    }

    pub async fn create(&self, ctx: &Context, property: &Property) -> Result<Property, ApiError> {
        self.client.post(ctx, &self.base_path(), property).await
    }

    pub async fn get(&self, ctx: &Context, name: &str) -> Result<Property, ApiError> {
        self.client.get(ctx, &self.path(name)).await
    }

    /// Replaces the whole property (PUT)
    pub async fn replace(
        &self,
        ctx: &Context,
        name: &str,
        property: &Property,
    ) -> Result<Property, ApiError> {
        self.client.put(ctx, &self.path(name), property).await
    }

    pub async fn delete(&self, ctx: &Context, name: &str) -> Result<(), ApiError> {
        self.client.delete(ctx, &self.path(name)).await
    }
}
