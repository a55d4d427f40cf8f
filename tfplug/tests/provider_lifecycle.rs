//! Provider lifecycle through the public traits, without the gRPC layer

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use tfplug::context::Context;
use tfplug::plan::plan_resource_change;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{
    AttributePath, ClientCapabilities, Diagnostic, Dynamic, DynamicValue, ServerCapabilities,
};
use tfplug::{import_state_with_parts, Schema};

type Store = Arc<RwLock<HashMap<String, String>>>;

struct NotesProvider {
    store: Store,
    read_delay: Duration,
}

impl NotesProvider {
    fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            read_delay: Duration::ZERO,
        }
    }
}

#[derive(Clone)]
struct NotesData {
    store: Store,
    read_delay: Duration,
}

#[async_trait]
impl Provider for NotesProvider {
    fn type_name(&self) -> &str {
        "notes"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "notes".to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new().build(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(NotesData {
                store: self.store.clone(),
                read_delay: self.read_delay,
            })),
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "notes_note".to_string(),
            Box::new(|| Box::new(NoteResource { data: None }) as Box<dyn ResourceWithConfigure>),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        HashMap::new()
    }
}

struct NoteResource {
    data: Option<NotesData>,
}

impl NoteResource {
    fn not_configured() -> Diagnostic {
        Diagnostic::error(
            "Provider not configured",
            "The provider must be configured before use",
        )
    }

    fn note_schema() -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("book", AttributeType::String)
                    .required()
                    .plan_modifier(RequiresReplace)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("title", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("body", AttributeType::String)
                    .optional()
                    .build(),
            )
            .build()
    }
}

#[async_trait]
impl Resource for NoteResource {
    fn type_name(&self) -> &str {
        "notes_note"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: "notes_note".to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::note_schema(),
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

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let data = match &self.data {
            Some(data) => data,
            None => {
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    private: vec![],
                    diagnostics: vec![Self::not_configured()],
                }
            }
        };

        let book = request
            .planned_state
            .get_string(&AttributePath::new("book"))
            .unwrap();
        let title = request
            .planned_state
            .get_string(&AttributePath::new("title"))
            .unwrap();
        let id = format!("{}/{}", book, title);
        data.store.write().await.insert(id.clone(), title);

        let mut state = request.planned_state;
        state.set_string(&AttributePath::new("id"), id).unwrap();
        CreateResourceResponse {
            new_state: state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let data = match &self.data {
            Some(data) => data,
            None => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![Self::not_configured()],
                    private: vec![],
                    deferred: None,
                }
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(data.read_delay) => {}
            _ = ctx.cancelled() => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![Diagnostic::error("Read cancelled", "context deadline exceeded")],
                    private: vec![],
                    deferred: None,
                };
            }
        }

        let id = request
            .current_state
            .get_string(&AttributePath::new("id"))
            .unwrap_or_default();
        let new_state = match data.store.read().await.get(&id) {
            Some(title) => {
                let mut state = request.current_state.clone();
                state
                    .set_string(&AttributePath::new("title"), title.clone())
                    .unwrap();
                Some(state)
            }
            None => None,
        };

        ReadResourceResponse {
            new_state,
            diagnostics: vec![],
            private: vec![],
            deferred: None,
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        if let Some(data) = &self.data {
            let id = request
                .prior_state
                .get_string(&AttributePath::new("id"))
                .unwrap();
            let title = request
                .planned_state
                .get_string(&AttributePath::new("title"))
                .unwrap();
            data.store.write().await.insert(id, title);
        }
        UpdateResourceResponse {
            new_state: request.planned_state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        if let Some(data) = &self.data {
            let id = request
                .prior_state
                .get_string(&AttributePath::new("id"))
                .unwrap();
            data.store.write().await.remove(&id);
        }
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for NoteResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match request.provider_data {
            Some(data) => match data.downcast_ref::<NotesData>() {
                Some(notes) => self.data = Some(notes.clone()),
                None => diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Expected NotesData",
                )),
            },
            None => diagnostics.push(Diagnostic::error(
                "No provider data",
                "Provider data was not provided",
            )),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for NoteResource {
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
        import_state_with_parts(&ctx, &["book", "title"], &request, &mut response);
        response
    }
}

async fn configured_note(provider: &mut NotesProvider) -> Box<dyn ResourceWithConfigure> {
    let configured = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config: DynamicValue::object(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert!(configured.diagnostics.is_empty());

    let factories = provider.resources();
    let mut note = factories["notes_note"]();
    let response = note
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: configured.provider_data,
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    note
}

fn note_config(book: &str, title: &str) -> DynamicValue {
    DynamicValue::new(Dynamic::Map(HashMap::from([
        ("id".to_string(), Dynamic::Null),
        ("book".to_string(), Dynamic::from(book)),
        ("title".to_string(), Dynamic::from(title)),
        ("body".to_string(), Dynamic::Null),
    ])))
}

#[tokio::test]
async fn create_read_update_delete_round() {
    let mut provider = NotesProvider::new();
    let note = configured_note(&mut provider).await;
    let schema = NoteResource::note_schema();

    let config = note_config("travel", "packing");
    let plan = plan_resource_change(&schema, &DynamicValue::null(), &config, &config);
    assert!(plan
        .planned_state
        .get(&AttributePath::new("id"))
        .unwrap()
        .is_unknown());

    let created = note
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "notes_note".to_string(),
                planned_state: plan.planned_state,
                config: config.clone(),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert!(created.diagnostics.is_empty());
    let state = created.new_state;
    assert_eq!(
        state.get_string(&AttributePath::new("id")).unwrap(),
        "travel/packing"
    );

    // Title changes in place, book forces replacement
    let mut proposed = state.clone();
    proposed
        .set_string(&AttributePath::new("title"), "unpacking".to_string())
        .unwrap();
    let mut update_config = config.clone();
    update_config
        .set_string(&AttributePath::new("title"), "unpacking".to_string())
        .unwrap();
    let plan = plan_resource_change(&schema, &state, &proposed, &update_config);
    assert!(plan.requires_replace.is_empty());
    assert_eq!(
        plan.planned_state
            .get_string(&AttributePath::new("id"))
            .unwrap(),
        "travel/packing"
    );

    let updated = note
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "notes_note".to_string(),
                prior_state: state.clone(),
                planned_state: plan.planned_state,
                config: update_config,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert!(updated.diagnostics.is_empty());

    let mut moved = updated.new_state.clone();
    moved
        .set_string(&AttributePath::new("book"), "work".to_string())
        .unwrap();
    let plan = plan_resource_change(&schema, &updated.new_state, &moved, &moved);
    assert_eq!(plan.requires_replace, vec![AttributePath::new("book")]);

    note.delete(
        Context::new(),
        DeleteResourceRequest {
            type_name: "notes_note".to_string(),
            prior_state: updated.new_state.clone(),
            planned_private: vec![],
            provider_meta: None,
        },
    )
    .await;

    let read = note
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "notes_note".to_string(),
                current_state: updated.new_state,
                private: vec![],
                provider_meta: None,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert!(read.new_state.is_none());
}

#[tokio::test]
async fn factory_instances_share_configured_store() {
    let mut provider = NotesProvider::new();
    let store = provider.store.clone();
    let configured = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config: DynamicValue::object(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    let factories = Arc::new(provider.resources());

    let mut handles = Vec::new();
    for i in 0..8 {
        let factories = factories.clone();
        let provider_data = configured.provider_data.clone();
        handles.push(tokio::spawn(async move {
            let mut note = factories["notes_note"]();
            note.configure(Context::new(), ConfigureResourceRequest { provider_data })
                .await;
            let config = note_config("shared", &format!("note-{}", i));
            note.create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "notes_note".to_string(),
                    planned_state: config.clone(),
                    config,
                    planned_private: vec![],
                    provider_meta: None,
                },
            )
            .await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().diagnostics.is_empty());
    }
    assert_eq!(store.read().await.len(), 8);
}

#[tokio::test]
async fn unconfigured_resource_reports_diagnostics() {
    let provider = NotesProvider::new();
    let factories = provider.resources();
    let mut note = factories["notes_note"]();

    let response = note
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: None,
            },
        )
        .await;
    assert_eq!(response.diagnostics[0].summary, "No provider data");

    let config = note_config("a", "b");
    let created = note
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "notes_note".to_string(),
                planned_state: config.clone(),
                config,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert_eq!(created.diagnostics[0].summary, "Provider not configured");
    assert!(created.new_state.is_null());
}

#[tokio::test]
async fn import_splits_composite_id() {
    let mut provider = NotesProvider::new();
    let note = configured_note(&mut provider).await;

    let importer = note.as_import_state().expect("notes support import");
    let response = importer
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: "notes_note".to_string(),
                id: "travel/packing".to_string(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;

    let state = &response.imported_resources[0].state;
    assert_eq!(state.get_string(&AttributePath::new("book")).unwrap(), "travel");
    assert_eq!(
        state.get_string(&AttributePath::new("title")).unwrap(),
        "packing"
    );
}

#[tokio::test]
async fn context_deadline_cancels_slow_read() {
    let mut provider = NotesProvider::new();
    provider.read_delay = Duration::from_secs(30);
    let note = configured_note(&mut provider).await;

    let ctx = Context::new().with_timeout(Duration::from_millis(20));
    let read = note
        .read(
            ctx,
            ReadResourceRequest {
                type_name: "notes_note".to_string(),
                current_state: note_config("a", "b"),
                private: vec![],
                provider_meta: None,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;

    assert_eq!(read.diagnostics[0].summary, "Read cancelled");
}
