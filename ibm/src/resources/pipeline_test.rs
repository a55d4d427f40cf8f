use super::*;
use crate::api::test_helpers::create_test_client;
use mockito::{Matcher, Server};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::plan::plan_resource_change;
use tfplug::types::ClientCapabilities;

const PIPELINE_ID: &str = "94619026-912b-4d92-8f51-6c74f0692d90";

fn pipeline_body() -> serde_json::Value {
    json!({
        "id": PIPELINE_ID,
        "name": "build",
        "status": "configured",
        "resource_group": {"id": "rg-1"},
        "toolchain": {"id": "tc-1", "crn": "crn:v1:tc-1"},
        "definitions": [],
        "properties": [],
        "triggers": [],
        "worker": {"id": "public", "name": "IBM Managed workers", "type": "public"},
        "runs_url": "https://cloud.ibm.com/devops/pipelines/tekton/94619026",
        "created_at": "2024-01-02T03:04:05.678Z",
        "updated_at": "2024-01-02T03:04:05.678Z",
        "build_number": 3,
        "enable_notifications": false,
        "enable_partial_cloning": false,
        "enabled": true
    })
}

async fn configured(url: &str) -> PipelineResource {
    let mut resource = PipelineResource::new();
    let data = IbmProviderData::new(create_test_client(url), create_test_client(url));
    let response = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: Some(Arc::new(data)),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    resource
}

fn config(values: &[(&str, Dynamic)]) -> DynamicValue {
    let map: HashMap<String, Dynamic> = values
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    PipelineResource::pipeline_schema().conform(DynamicValue::new(Dynamic::Map(map)))
}

fn plan_create(config: &DynamicValue) -> DynamicValue {
    plan_resource_change(
        &PipelineResource::pipeline_schema(),
        &DynamicValue::null(),
        config,
        config,
    )
    .planned_state
}

fn read_request(state: DynamicValue) -> ReadResourceRequest {
    ReadResourceRequest {
        type_name: TYPE_NAME.to_string(),
        current_state: state,
        private: vec![],
        provider_meta: None,
        client_capabilities: ClientCapabilities::default(),
    }
}

fn stored_state() -> DynamicValue {
    let pipeline: TektonPipeline = serde_json::from_value(pipeline_body()).unwrap();
    PipelineResource::state_from(&config(&[("pipeline_id", Dynamic::from(PIPELINE_ID))]), &pipeline)
}

#[tokio::test]
async fn schema_marks_pipeline_id_force_new() {
    let schema = PipelineResource::new()
        .schema(Context::new(), ResourceSchemaRequest)
        .await
        .schema;
    let pipeline_id = schema.block.attribute("pipeline_id").unwrap();
    assert!(pipeline_id.required);
    assert_eq!(pipeline_id.validators.len(), 1);
    assert!(schema.block.attribute("triggers").unwrap().computed);
    assert_eq!(schema.block.block_type("worker").unwrap().max_items, 1);
}

#[test]
fn pipeline_id_must_be_36_characters() {
    let schema = PipelineResource::pipeline_schema();
    assert!(schema
        .validate(&config(&[("pipeline_id", Dynamic::from(PIPELINE_ID))]))
        .is_empty());
    assert_eq!(
        schema
            .validate(&config(&[("pipeline_id", Dynamic::from("Not-A-Pipeline"))]))
            .len(),
        1
    );
}

#[tokio::test]
async fn create_posts_then_reads_back() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/tekton_pipelines")
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::Json(json!({
            "id": PIPELINE_ID,
            "enable_slack_notifications": false,
            "enable_partial_cloning": false
        })))
        .with_status(201)
        .with_body(pipeline_body().to_string())
        .create_async()
        .await;
    let get = server
        .mock("GET", format!("/tekton_pipelines/{}", PIPELINE_ID).as_str())
        .with_body(pipeline_body().to_string())
        .create_async()
        .await;
    let resource = configured(&server.url()).await;

    let config = config(&[("pipeline_id", Dynamic::from(PIPELINE_ID))]);
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: TYPE_NAME.to_string(),
                planned_state: plan_create(&config),
                config,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let state = response.new_state;
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), PIPELINE_ID);
    assert_eq!(state.get_string(&AttributePath::new("name")).unwrap(), "build");
    assert_eq!(state.get_number(&AttributePath::new("build_number")).unwrap(), 3.0);
    assert_eq!(
        state.get_string(&AttributePath::new("created_at")).unwrap(),
        "2024-01-02T03:04:05.678Z"
    );
    // worker is not managed by this configuration
    assert!(state
        .get(&AttributePath::new("worker"))
        .map_or(true, |w| w.is_null()));
    create.assert_async().await;
    get.assert_async().await;
}

#[tokio::test]
async fn create_failure_wraps_the_api_error() {
    let mut server = Server::new_async().await;
    let _create = server
        .mock("POST", "/tekton_pipelines")
        .with_status(400)
        .with_body(r#"{"errors":[{"code":"bad_request","message":"Invalid pipeline ID"}]}"#)
        .create_async()
        .await;
    let resource = configured(&server.url()).await;

    let config = config(&[("pipeline_id", Dynamic::from(PIPELINE_ID))]);
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: TYPE_NAME.to_string(),
                planned_state: plan_create(&config),
                config,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    let summary = &response.diagnostics[0].summary;
    assert!(summary.starts_with("CreateTektonPipelineWithContext failed "));
    assert!(summary.contains("Response status code: 400"));
}

#[tokio::test]
async fn read_of_missing_pipeline_clears_state() {
    let mut server = Server::new_async().await;
    let _get = server
        .mock("GET", format!("/tekton_pipelines/{}", PIPELINE_ID).as_str())
        .with_status(404)
        .with_body(r#"{"errors":[{"code":"not_found","message":"Pipeline not found"}]}"#)
        .create_async()
        .await;
    let resource = configured(&server.url()).await;

    let response = resource.read(Context::new(), read_request(stored_state())).await;

    assert!(response.diagnostics.is_empty());
    assert!(response.new_state.is_none());
}

#[tokio::test]
async fn read_server_error_keeps_state() {
    let mut server = Server::new_async().await;
    let _get = server
        .mock("GET", format!("/tekton_pipelines/{}", PIPELINE_ID).as_str())
        .with_status(403)
        .with_body(r#"{"errors":[{"code":"forbidden","message":"Forbidden"}]}"#)
        .create_async()
        .await;
    let resource = configured(&server.url()).await;

    let response = resource.read(Context::new(), read_request(stored_state())).await;

    assert!(response.new_state.is_some());
    assert!(response.diagnostics[0]
        .summary
        .starts_with("GetTektonPipelineWithContext failed Forbidden"));
}

#[tokio::test]
async fn update_patches_only_changed_flags() {
    let mut server = Server::new_async().await;
    let patch = server
        .mock("PATCH", format!("/tekton_pipelines/{}", PIPELINE_ID).as_str())
        .match_header("content-type", "application/merge-patch+json")
        .match_body(Matcher::Json(json!({"enable_partial_cloning": true})))
        .with_body(pipeline_body().to_string())
        .create_async()
        .await;
    let mut updated = pipeline_body();
    updated["enable_partial_cloning"] = json!(true);
    let _get = server
        .mock("GET", format!("/tekton_pipelines/{}", PIPELINE_ID).as_str())
        .with_body(updated.to_string())
        .create_async()
        .await;
    let resource = configured(&server.url()).await;

    let prior = stored_state();
    let mut planned = prior.clone();
    planned
        .set_bool(&AttributePath::new("enable_partial_cloning"), true)
        .unwrap();
    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: TYPE_NAME.to_string(),
                prior_state: prior,
                planned_state: planned.clone(),
                config: planned,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert!(response
        .new_state
        .get_bool(&AttributePath::new("enable_partial_cloning"))
        .unwrap());
    patch.assert_async().await;
}

#[tokio::test]
async fn update_without_changes_skips_the_patch() {
    let mut server = Server::new_async().await;
    let patch = server
        .mock("PATCH", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let _get = server
        .mock("GET", format!("/tekton_pipelines/{}", PIPELINE_ID).as_str())
        .with_body(pipeline_body().to_string())
        .create_async()
        .await;
    let resource = configured(&server.url()).await;

    let state = stored_state();
    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: TYPE_NAME.to_string(),
                prior_state: state.clone(),
                planned_state: state.clone(),
                config: state,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    patch.assert_async().await;
}

#[tokio::test]
async fn worker_change_is_patched() {
    let prior = stored_state();
    let mut planned = prior.clone();
    planned
        .set(
            &AttributePath::new("worker"),
            Dynamic::List(vec![Dynamic::Map(HashMap::from([(
                "id".to_string(),
                Dynamic::from("private-worker"),
            )]))]),
        )
        .unwrap();

    let patch = PipelineResource::patch(&prior, &planned).unwrap();
    assert_eq!(patch.worker, Some(Worker::with_id("private-worker")));
    assert_eq!(patch.enable_slack_notifications, None);
}

#[tokio::test]
async fn delete_issues_delete() {
    let mut server = Server::new_async().await;
    let delete = server
        .mock("DELETE", format!("/tekton_pipelines/{}", PIPELINE_ID).as_str())
        .with_status(204)
        .create_async()
        .await;
    let resource = configured(&server.url()).await;

    let response = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: TYPE_NAME.to_string(),
                prior_state: stored_state(),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    delete.assert_async().await;
}

#[tokio::test]
async fn import_sets_id_and_pipeline_id() {
    let resource = PipelineResource::new();
    let response = resource
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: TYPE_NAME.to_string(),
                id: PIPELINE_ID.to_string(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    let state = &response.imported_resources[0].state;
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), PIPELINE_ID);
    assert_eq!(
        state.get_string(&AttributePath::new("pipeline_id")).unwrap(),
        PIPELINE_ID
    );
}

#[tokio::test]
async fn unconfigured_resource_reports_diagnostic() {
    let resource = PipelineResource::new();
    let response = resource.read(Context::new(), read_request(stored_state())).await;
    assert_eq!(response.diagnostics[0].summary, "Provider not configured");
}
