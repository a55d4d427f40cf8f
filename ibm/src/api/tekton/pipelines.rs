use tfplug::Context;

use super::models::{CreateTektonPipelineRequest, TektonPipeline, TektonPipelinePatch};
use crate::api::client::Client;
use crate::api::common::segment;
use crate::api::error::ApiError;

pub struct PipelinesApi<'a> {
    client: &'a Client,
}

impl<'a> PipelinesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn path(id: &str) -> String {
        format!("/tekton_pipelines/{}", segment(id))
    }

    /// Attaches a Tekton pipeline to an existing toolchain pipeline ID
    pub async fn create(
        &self,
        ctx: &Context,
        request: &CreateTektonPipelineRequest,
    ) -> Result<TektonPipeline, ApiError> {
        self.client.post(ctx, "/tekton_pipelines", request).await
    }

    pub async fn get(&self, ctx: &Context, id: &str) -> Result<TektonPipeline, ApiError> {
        self.client.get(ctx, &Self::path(id)).await
    }

    pub async fn update(
        &self,
        ctx: &Context,
        id: &str,
        patch: &TektonPipelinePatch,
    ) -> Result<TektonPipeline, ApiError> {
        self.client.patch(ctx, &Self::path(id), patch).await
    }

    pub async fn delete(&self, ctx: &Context, id: &str) -> Result<(), ApiError> {
        self.client.delete(ctx, &Self::path(id)).await
    }
}
