use tfplug::Context;

use super::models::{Trigger, TriggerPatch};
use crate::api::client::Client;
use crate::api::common::segment;
use crate::api::error::ApiError;

/// Triggers of one pipeline
pub struct TriggersApi<'a> {
    client: &'a Client,
    pipeline_id: String,
}

impl<'a> TriggersApi<'a> {
    pub fn new(client: &'a Client, pipeline_id: &str) -> Self {
        Self {
            client,
            pipeline_id: pipeline_id.to_string(),
        }
    }

    fn base_path(&self) -> String {
        format!("/tekton_pipelines/{}/triggers", segment(&self.pipeline_id))
    }

    fn path(&self, trigger_id: &str) -> String {
        format!("{}/{}", self.base_path(), segment(trigger_id))
    }

    /// Creates a trigger, or duplicates one when given [`Trigger::Duplicate`]
    pub async fn create(&self, ctx: &Context, trigger: &Trigger) -> Result<Trigger, ApiError> {
        self.client.post(ctx, &self.base_path(), trigger).await
    }

    pub async fn get(&self, ctx: &Context, trigger_id: &str) -> Result<Trigger, ApiError> {
        self.client.get(ctx, &self.path(trigger_id)).await
    }

    pub async fn update(
        &self,
        ctx: &Context,
        trigger_id: &str,
        patch: &TriggerPatch,
    ) -> Result<Trigger, ApiError> {
        self.client.patch(ctx, &self.path(trigger_id), patch).await
    }

    pub async fn delete(&self, ctx: &Context, trigger_id: &str) -> Result<(), ApiError> {
        self.client.delete(ctx, &self.path(trigger_id)).await
    }
}
