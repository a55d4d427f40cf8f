//! Tekton pipeline v2 request and response bodies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TRIGGER_TYPE_MANUAL: &str = "manual";
pub const TRIGGER_TYPE_SCM: &str = "scm";
pub const TRIGGER_TYPE_TIMER: &str = "timer";
pub const TRIGGER_TYPE_GENERIC: &str = "generic";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TektonPipeline {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<ResourceGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolchain: Option<Toolchain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definitions: Option<Vec<Definition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<Property>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggers: Option<Vec<Trigger>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<Worker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_number: Option<i64>,
    #[serde(
        default,
        alias = "enable_notifications",
        skip_serializing_if = "Option::is_none"
    )]
    pub enable_slack_notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_partial_cloning: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Toolchain {
    pub id: String,
    pub crn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub scm_source: DefinitionScmSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionScmSource {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_instance_id: Option<String>,
}

/// Pipeline or trigger property. Also the body of property create and
/// replace requests, where `href` is left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub worker_type: Option<String>,
    pub id: String,
}

impl Worker {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerScmSource {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blind_connection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_instance_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Events {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request_closed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericSecret {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub secret_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

/// Fields shared by every discriminated trigger kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerBase {
    pub name: String,
    pub event_listener: String,
    pub href: Option<String>,
    pub id: Option<String>,
    pub properties: Option<Vec<Property>>,
    pub tags: Option<Vec<String>>,
    pub worker: Option<Worker>,
    pub max_concurrent_runs: Option<i64>,
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualTrigger {
    pub base: TriggerBase,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScmTrigger {
    pub base: TriggerBase,
    pub scm_source: Option<TriggerScmSource>,
    pub events: Option<Events>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimerTrigger {
    pub base: TriggerBase,
    pub cron: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericTrigger {
    pub base: TriggerBase,
    pub secret: Option<GenericSecret>,
    pub webhook_url: Option<String>,
}

/// Creates a trigger as a copy of an existing one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicateTrigger {
    pub source_trigger_id: String,
    pub name: String,
}

/// A trigger of any kind.
///
/// On the wire triggers are one flat object discriminated by `type`;
/// [`TriggerFields`] is that flat form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TriggerFields", into = "TriggerFields")]
pub enum Trigger {
    Duplicate(DuplicateTrigger),
    Manual(ManualTrigger),
    Scm(ScmTrigger),
    Timer(TimerTrigger),
    Generic(GenericTrigger),
    /// Not yet discriminated: every field as given
    Other(TriggerFields),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognized TriggerIntf subtype encountered: {0}")]
pub struct UnrecognizedTriggerType(pub String);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_trigger_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_listener: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Vec<Property>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<Worker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_runs: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scm_source: Option<TriggerScmSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Events>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<GenericSecret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

impl Trigger {
    /// Discriminates locally assembled fields. A non-empty
    /// `source_trigger_id` wins, then `type`; anything else stays
    /// [`Trigger::Other`].
    pub fn from_fields(fields: TriggerFields) -> Trigger {
        match Self::discriminate(fields) {
            Ok(trigger) => trigger,
            Err((_, fields)) => Trigger::Other(fields),
        }
    }

    fn discriminate(
        fields: TriggerFields,
    ) -> Result<Trigger, (UnrecognizedTriggerType, TriggerFields)> {
        if let Some(source_trigger_id) = fields.source_trigger_id.clone().filter(|s| !s.is_empty()) {
            return Ok(Trigger::Duplicate(DuplicateTrigger {
                source_trigger_id,
                name: fields.name.unwrap_or_default(),
            }));
        }

        let kind = match fields.trigger_type.clone() {
            None => return Ok(Trigger::Other(fields)),
            Some(kind) => kind,
        };
        let base = TriggerBase {
            name: fields.name.clone().unwrap_or_default(),
            event_listener: fields.event_listener.clone().unwrap_or_default(),
            href: fields.href.clone(),
            id: fields.id.clone(),
            properties: fields.properties.clone(),
            tags: fields.tags.clone(),
            worker: fields.worker.clone(),
            max_concurrent_runs: fields.max_concurrent_runs,
            disabled: fields.disabled.unwrap_or(false),
        };

        match kind.as_str() {
            TRIGGER_TYPE_MANUAL => Ok(Trigger::Manual(ManualTrigger { base })),
            TRIGGER_TYPE_SCM => Ok(Trigger::Scm(ScmTrigger {
                base,
                scm_source: fields.scm_source,
                events: fields.events,
            })),
            TRIGGER_TYPE_TIMER => Ok(Trigger::Timer(TimerTrigger {
                base,
                cron: fields.cron,
                timezone: fields.timezone,
            })),
            TRIGGER_TYPE_GENERIC => Ok(Trigger::Generic(GenericTrigger {
                base,
                secret: fields.secret,
                webhook_url: fields.webhook_url,
            })),
            _ => Err((UnrecognizedTriggerType(kind), fields)),
        }
    }

    /// Wire discriminant, None for duplicates and undiscriminated triggers
    pub fn kind(&self) -> Option<&str> {
        match self {
            Trigger::Manual(_) => Some(TRIGGER_TYPE_MANUAL),
            Trigger::Scm(_) => Some(TRIGGER_TYPE_SCM),
            Trigger::Timer(_) => Some(TRIGGER_TYPE_TIMER),
            Trigger::Generic(_) => Some(TRIGGER_TYPE_GENERIC),
            Trigger::Duplicate(_) | Trigger::Other(_) => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Trigger::Manual(t) => t.base.id.as_deref(),
            Trigger::Scm(t) => t.base.id.as_deref(),
            Trigger::Timer(t) => t.base.id.as_deref(),
            Trigger::Generic(t) => t.base.id.as_deref(),
            Trigger::Other(t) => t.id.as_deref(),
            Trigger::Duplicate(_) => None,
        }
    }
}

impl TryFrom<TriggerFields> for Trigger {
    type Error = UnrecognizedTriggerType;

    fn try_from(fields: TriggerFields) -> Result<Self, Self::Error> {
        Self::discriminate(fields).map_err(|(err, _)| err)
    }
}

impl TriggerBase {
    fn into_fields(self, kind: &str) -> TriggerFields {
        TriggerFields {
            trigger_type: Some(kind.to_string()),
            name: Some(self.name),
            href: self.href,
            event_listener: Some(self.event_listener),
            id: self.id,
            properties: self.properties,
            tags: self.tags,
            worker: self.worker,
            max_concurrent_runs: self.max_concurrent_runs,
            disabled: Some(self.disabled),
            ..TriggerFields::default()
        }
    }
}

impl From<Trigger> for TriggerFields {
    fn from(trigger: Trigger) -> Self {
        match trigger {
            Trigger::Duplicate(t) => TriggerFields {
                source_trigger_id: Some(t.source_trigger_id),
                name: Some(t.name),
                ..TriggerFields::default()
            },
            Trigger::Manual(t) => t.base.into_fields(TRIGGER_TYPE_MANUAL),
            Trigger::Scm(t) => TriggerFields {
                scm_source: t.scm_source,
                events: t.events,
                ..t.base.into_fields(TRIGGER_TYPE_SCM)
            },
            Trigger::Timer(t) => TriggerFields {
                cron: t.cron,
                timezone: t.timezone,
                ..t.base.into_fields(TRIGGER_TYPE_TIMER)
            },
            Trigger::Generic(t) => TriggerFields {
                secret: t.secret,
                webhook_url: t.webhook_url,
                ..t.base.into_fields(TRIGGER_TYPE_GENERIC)
            },
            Trigger::Other(fields) => fields,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateTektonPipelineRequest {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_slack_notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_partial_cloning: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<Worker>,
}

/// Merge patch for a pipeline: unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TektonPipelinePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_slack_notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_partial_cloning: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<Worker>,
}

impl TektonPipelinePatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Merge patch for a trigger: unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TriggerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_listener: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<Worker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_runs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<GenericSecret>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scm_source: Option<TriggerScmSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Events>,
}

impl TriggerPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
