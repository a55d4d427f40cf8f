use super::*;
use crate::api::test_helpers::create_test_client;
use mockito::{Matcher, Server};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::plan::plan_resource_change;
use tfplug::resource::{ResourceWithConfigure, ResourceWithImportState};
use tfplug::types::ClientCapabilities;

const PIPELINE_ID: &str = "94619026-912b-4d92-8f51-6c74f0692d90";
const TRIGGER_ID: &str = "1bb892a1-2e04-4768-a369-b1159eace147";

fn trigger_path_url() -> String {
    format!("/tekton_pipelines/{}/triggers/{}", PIPELINE_ID, TRIGGER_ID)
}

fn timer_body() -> serde_json::Value {
    json!({
        "type": "timer",
        "id": TRIGGER_ID,
        "name": "nightly",
        "href": "https://api.example.com/triggers/1bb892a1",
        "event_listener": "listener",
        "disabled": false,
        "cron": "0 4 * * *",
        "timezone": "UTC",
        "properties": [{"name": "env", "type": "text", "value": "dev", "href": "h"}],
        "worker": {"id": "public", "name": "IBM Managed workers", "type": "public"}
    })
}

async fn configured(url: &str) -> TriggerResource {
    let mut resource = TriggerResource::new();
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

fn block(values: &[(&str, Dynamic)]) -> Dynamic {
    Dynamic::List(vec![Dynamic::Map(
        values
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )])
}

fn config(trigger: Dynamic) -> DynamicValue {
    let map: HashMap<String, Dynamic> = HashMap::from([
        ("pipeline_id".to_string(), Dynamic::from(PIPELINE_ID)),
        ("trigger".to_string(), trigger),
    ]);
    TriggerResource::trigger_schema().conform(DynamicValue::new(Dynamic::Map(map)))
}

fn timer_config() -> DynamicValue {
    config(block(&[
        ("type", Dynamic::from("timer")),
        ("name", Dynamic::from("nightly")),
        ("event_listener", Dynamic::from("listener")),
        ("cron", Dynamic::from("0 4 * * *")),
        ("timezone", Dynamic::from("UTC")),
    ]))
}

fn plan_create(config: &DynamicValue) -> DynamicValue {
    plan_resource_change(
        &TriggerResource::trigger_schema(),
        &DynamicValue::null(),
        config,
        config,
    )
    .planned_state
}

fn stored_state() -> DynamicValue {
    let trigger: Trigger = serde_json::from_value(timer_body()).unwrap();
    TriggerResource::state_from(&plan_create(&timer_config()), PIPELINE_ID, TRIGGER_ID, &trigger)
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

fn update_request(prior: DynamicValue, planned: DynamicValue) -> UpdateResourceRequest {
    UpdateResourceRequest {
        type_name: TYPE_NAME.to_string(),
        prior_state: prior,
        config: planned.clone(),
        planned_state: planned,
        planned_private: vec![],
        provider_meta: None,
    }
}

#[test]
fn schema_shape() {
    let schema = TriggerResource::trigger_schema();
    let trigger = schema.block.block_type("trigger").unwrap();
    assert_eq!(trigger.min_items, 1);
    assert_eq!(trigger.max_items, 1);
    assert!(trigger.block.attribute("name").unwrap().required);
    assert!(trigger.block.attribute("id").unwrap().computed);

    let secret = trigger.block.block_type("secret").unwrap();
    assert!(secret.block.attribute("value").unwrap().sensitive);
    let scm = trigger.block.block_type("scm_source").unwrap();
    assert_eq!(scm.block.attribute("url").unwrap().plan_modifiers.len(), 1);
    assert!(scm.block.attribute("hook_id").unwrap().computed);
}

#[tokio::test]
async fn create_posts_flat_trigger_and_builds_composite_id() {
    let mut server = Server::new_async().await;
    let create = server
        .mock(
            "POST",
            format!("/tekton_pipelines/{}/triggers", PIPELINE_ID).as_str(),
        )
        .match_body(Matcher::Json(json!({
            "type": "timer",
            "name": "nightly",
            "event_listener": "listener",
            "disabled": false,
            "cron": "0 4 * * *",
            "timezone": "UTC"
        })))
        .with_status(201)
        .with_body(timer_body().to_string())
        .create_async()
        .await;
    let get = server
        .mock("GET", trigger_path_url().as_str())
        .with_body(timer_body().to_string())
        .create_async()
        .await;
    let resource = configured(&server.url()).await;

    let config = timer_config();
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
    assert_eq!(
        state.get_string(&AttributePath::new("id")).unwrap(),
        format!("{}/{}", PIPELINE_ID, TRIGGER_ID)
    );
    assert_eq!(
        state.get_string(&trigger_path("id")).unwrap(),
        TRIGGER_ID
    );
    assert_eq!(state.get_string(&trigger_path("cron")).unwrap(), "0 4 * * *");
    // properties belong to the property resource
    assert!(state.get(&trigger_path("properties")).is_none());
    // worker was not configured
    assert!(state.get(&trigger_path("worker")).map_or(true, |w| w.is_null()));
    create.assert_async().await;
    get.assert_async().await;
}

#[tokio::test]
async fn duplicate_create_sends_only_source_and_name() {
    let mut server = Server::new_async().await;
    let create = server
        .mock(
            "POST",
            format!("/tekton_pipelines/{}/triggers", PIPELINE_ID).as_str(),
        )
        .match_body(Matcher::Json(json!({
            "source_trigger_id": "0b9d8a42-2d6c-4c51-8b11-3c5a2ff03c1c",
            "name": "nightly copy"
        })))
        .with_status(201)
        .with_body(timer_body().to_string())
        .create_async()
        .await;
    let _get = server
        .mock("GET", trigger_path_url().as_str())
        .with_body(timer_body().to_string())
        .create_async()
        .await;
    let resource = configured(&server.url()).await;

    let config = config(block(&[
        ("source_trigger_id", Dynamic::from("0b9d8a42-2d6c-4c51-8b11-3c5a2ff03c1c")),
        ("type", Dynamic::from("timer")),
        ("name", Dynamic::from("nightly copy")),
        ("event_listener", Dynamic::from("listener")),
    ]));
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
    assert_eq!(
        response
            .new_state
            .get_string(&trigger_path("source_trigger_id"))
            .unwrap(),
        "0b9d8a42-2d6c-4c51-8b11-3c5a2ff03c1c"
    );
    create.assert_async().await;
}

#[tokio::test]
async fn read_with_malformed_id_fails_cleanly() {
    let resource = configured("http://127.0.0.1:1").await;
    let mut state = stored_state();
    state
        .set_string(&AttributePath::new("id"), "no-separator".to_string())
        .unwrap();

    let response = resource.read(Context::new(), read_request(state)).await;

    assert!(response.new_state.is_some());
    assert_eq!(
        response.diagnostics[0].summary,
        "Unexpected ID format 'no-separator', expected 2 parts separated by '/'"
    );
}

#[tokio::test]
async fn read_of_missing_trigger_clears_state() {
    let mut server = Server::new_async().await;
    let _get = server
        .mock("GET", trigger_path_url().as_str())
        .with_status(404)
        .with_body(r#"{"errors":[{"code":"not_found","message":"Trigger not found"}]}"#)
        .create_async()
        .await;
    let resource = configured(&server.url()).await;

    let response = resource.read(Context::new(), read_request(stored_state())).await;

    assert!(response.diagnostics.is_empty());
    assert!(response.new_state.is_none());
}

#[tokio::test]
async fn read_keeps_secret_value_the_api_omits() {
    let mut server = Server::new_async().await;
    let _get = server
        .mock("GET", trigger_path_url().as_str())
        .with_body(
            json!({
                "type": "generic",
                "id": TRIGGER_ID,
                "name": "hook",
                "event_listener": "listener",
                "disabled": false,
                "secret": {"type": "token_matches", "source": "header", "key_name": "x-token"},
                "webhook_url": "https://hooks.example.com/1bb892a1"
            })
            .to_string(),
        )
        .create_async()
        .await;
    let resource = configured(&server.url()).await;

    let mut state = config(block(&[
        ("type", Dynamic::from("generic")),
        ("name", Dynamic::from("hook")),
        ("event_listener", Dynamic::from("listener")),
        (
            "secret",
            block(&[
                ("type", Dynamic::from("token_matches")),
                ("value", Dynamic::from("s3cr3t")),
                ("source", Dynamic::from("header")),
                ("key_name", Dynamic::from("x-token")),
            ]),
        ),
    ]));
    state
        .set_string(
            &AttributePath::new("id"),
            format!("{}/{}", PIPELINE_ID, TRIGGER_ID),
        )
        .unwrap();

    let response = resource.read(Context::new(), read_request(state)).await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let state = response.new_state.unwrap();
    let value = AttributePath::new("trigger")
        .index(0)
        .attribute("secret")
        .index(0)
        .attribute("value");
    assert_eq!(state.get_string(&value).unwrap(), "s3cr3t");
    assert!(state.get(&trigger_path("webhook_url")).is_none());
}

#[tokio::test]
async fn update_patches_changed_trigger_fields() {
    let mut server = Server::new_async().await;
    let patch = server
        .mock("PATCH", trigger_path_url().as_str())
        .match_header("content-type", "application/merge-patch+json")
        .match_body(Matcher::Json(json!({"cron": "0 6 * * *", "disabled": true})))
        .with_body(timer_body().to_string())
        .create_async()
        .await;
    let mut updated = timer_body();
    updated["cron"] = json!("0 6 * * *");
    updated["disabled"] = json!(true);
    let _get = server
        .mock("GET", trigger_path_url().as_str())
        .with_body(updated.to_string())
        .create_async()
        .await;
    let resource = configured(&server.url()).await;

    let prior = stored_state();
    let mut planned = prior.clone();
    planned
        .set_string(&trigger_path("cron"), "0 6 * * *".to_string())
        .unwrap();
    planned.set_bool(&trigger_path("disabled"), true).unwrap();

    let response = resource
        .update(Context::new(), update_request(prior, planned))
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert!(response.new_state.get_bool(&trigger_path("disabled")).unwrap());
    patch.assert_async().await;
}

#[tokio::test]
async fn update_refuses_to_move_between_pipelines() {
    let resource = configured("http://127.0.0.1:1").await;
    let prior = stored_state();
    let mut planned = prior.clone();
    planned
        .set_string(
            &AttributePath::new("pipeline_id"),
            "00000000-0000-0000-0000-000000000000".to_string(),
        )
        .unwrap();

    let response = resource
        .update(Context::new(), update_request(prior, planned))
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0]
        .summary
        .contains("\"pipeline_id\" with the ForceNew annotation"));
}

#[test]
fn removed_cron_is_cleared_in_the_patch() {
    let prior = stored_state();
    let mut planned = prior.clone();
    planned.set(&trigger_path("cron"), Dynamic::Null).unwrap();

    let patch = TriggerResource::patch(&prior, &planned).unwrap();
    assert_eq!(patch.cron, Some(String::new()));
    assert_eq!(patch.name, None);
    assert_eq!(patch.timezone, None);
}

#[tokio::test]
async fn delete_uses_both_id_parts() {
    let mut server = Server::new_async().await;
    let delete = server
        .mock("DELETE", trigger_path_url().as_str())
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

/// Terraform's apply check: known planned values come back unchanged and
/// unknown ones come back known.
fn assert_matches_plan(planned: &Dynamic, applied: &Dynamic, path: &str) {
    match (planned, applied) {
        (Dynamic::Unknown, applied) => {
            assert!(!applied.is_unknown(), "{} is still unknown after apply", path)
        }
        (Dynamic::Map(planned), Dynamic::Map(applied)) => {
            for (key, value) in planned {
                let applied = applied.get(key).unwrap_or(&Dynamic::Null);
                assert_matches_plan(value, applied, &format!("{}.{}", path, key));
            }
        }
        (Dynamic::List(planned), Dynamic::List(applied)) if planned.len() == applied.len() => {
            for (i, (p, a)) in planned.iter().zip(applied).enumerate() {
                assert_matches_plan(p, a, &format!("{}[{}]", path, i));
            }
        }
        (planned, applied) => assert_eq!(planned, applied, "{} changed during apply", path),
    }
}

#[tokio::test]
async fn create_result_matches_plan() {
    let echoed = json!({
        "type": "scm",
        "id": TRIGGER_ID,
        "name": "on push",
        "href": "https://api.example.com/triggers/1bb892a1",
        "event_listener": "listener",
        "tags": [],
        "max_concurrent_runs": 3,
        "disabled": false,
        "scm_source": {
            "url": "https://github.com/org/repo",
            "branch": "main",
            "blind_connection": false,
            "hook_id": "42",
            "service_instance_id": "b2c1cc7e-5d37-4a0d-9f1e-6a2b0f6c5d10"
        },
        "events": {"push": true, "pull_request": false, "pull_request_closed": false},
        "worker": {"id": "public", "name": "IBM Managed workers", "type": "public"}
    });
    let mut server = Server::new_async().await;
    let _create = server
        .mock(
            "POST",
            format!("/tekton_pipelines/{}/triggers", PIPELINE_ID).as_str(),
        )
        .with_status(201)
        .with_body(echoed.to_string())
        .create_async()
        .await;
    let _get = server
        .mock("GET", trigger_path_url().as_str())
        .with_body(echoed.to_string())
        .create_async()
        .await;
    let resource = configured(&server.url()).await;

    let config = config(block(&[
        ("type", Dynamic::from("scm")),
        ("name", Dynamic::from("on push")),
        ("event_listener", Dynamic::from("listener")),
        (
            "scm_source",
            block(&[
                ("url", Dynamic::from("https://github.com/org/repo")),
                ("branch", Dynamic::from("main")),
            ]),
        ),
        ("events", block(&[("push", Dynamic::from(true))])),
    ]));
    let planned = plan_create(&config);
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: TYPE_NAME.to_string(),
                planned_state: planned.clone(),
                config,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert_matches_plan(&planned.value, &response.new_state.value, "resource");
    assert_eq!(
        response.new_state.get_string(&trigger_path("href")).unwrap(),
        "https://api.example.com/triggers/1bb892a1"
    );
    assert!(!response.new_state.get_bool(&trigger_path("disabled")).unwrap());
}

#[test]
fn omitted_disabled_plans_as_false() {
    let planned = plan_create(&timer_config());
    assert!(!planned.get_bool(&trigger_path("disabled")).unwrap());
    assert!(planned.get(&trigger_path("href")).unwrap().is_unknown());
}

#[test]
fn unknown_computed_fields_are_not_patched() {
    let prior = stored_state();
    let mut planned = prior.clone();
    planned.set(&trigger_path("href"), Dynamic::Unknown).unwrap();
    planned.set(&trigger_path("tags"), Dynamic::Unknown).unwrap();
    planned.set(&trigger_path("max_concurrent_runs"), Dynamic::Unknown).unwrap();

    let patch = TriggerResource::patch(&prior, &planned).unwrap();
    assert!(patch.is_empty());
}

#[tokio::test]
async fn import_splits_pipeline_and_trigger() {
    let resource = TriggerResource::new();
    let id = format!("{}/{}", PIPELINE_ID, TRIGGER_ID);
    let response = resource
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: TYPE_NAME.to_string(),
                id: id.clone(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    let state = &response.imported_resources[0].state;
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), id);
    assert_eq!(
        state.get_string(&AttributePath::new("pipeline_id")).unwrap(),
        PIPELINE_ID
    );

    let bad = resource
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: TYPE_NAME.to_string(),
                id: PIPELINE_ID.to_string(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert_eq!(bad.diagnostics[0].summary, "Unexpected Import Identifier");
}
