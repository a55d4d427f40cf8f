//! Triggers to and from state maps

use tfplug::Dynamic;

use super::maps::{
    insert, insert_block, insert_list, insert_opt, optional_bool, optional_i64, optional_string,
    optional_strings, single_block, Object,
};
use super::TranslateError;
use crate::api::tekton::{
    Events, GenericSecret, Property, Trigger, TriggerBase, TriggerFields, TriggerScmSource, Worker,
};

/// State map for a trigger of any kind
pub fn trigger_to_map(trigger: &Trigger) -> Object {
    let kind = trigger.kind();
    match trigger {
        Trigger::Duplicate(t) => {
            let mut map = Object::new();
            insert(&mut map, "source_trigger_id", t.source_trigger_id.as_str());
            insert(&mut map, "name", t.name.as_str());
            map
        }
        Trigger::Manual(t) => base_to_map(kind, &t.base),
        Trigger::Scm(t) => {
            let mut map = base_to_map(kind, &t.base);
            insert_block(&mut map, "scm_source", t.scm_source.as_ref().map(scm_source_to_map));
            insert_block(&mut map, "events", t.events.as_ref().map(events_to_map));
            map
        }
        Trigger::Timer(t) => {
            let mut map = base_to_map(kind, &t.base);
            insert_opt(&mut map, "cron", t.cron.as_deref());
            insert_opt(&mut map, "timezone", t.timezone.as_deref());
            map
        }
        Trigger::Generic(t) => {
            let mut map = base_to_map(kind, &t.base);
            insert_block(&mut map, "secret", t.secret.as_ref().map(secret_to_map));
            insert_opt(&mut map, "webhook_url", t.webhook_url.as_deref());
            map
        }
        Trigger::Other(fields) => fields_to_map(fields),
    }
}

fn base_to_map(kind: Option<&str>, base: &TriggerBase) -> Object {
    let mut map = Object::new();
    insert_opt(&mut map, "type", kind);
    insert(&mut map, "name", base.name.as_str());
    insert_opt(&mut map, "href", base.href.as_deref());
    insert(&mut map, "event_listener", base.event_listener.as_str());
    insert_opt(&mut map, "id", base.id.as_deref());
    insert_list(&mut map, "properties", properties_to_maps(base.properties.as_deref()));
    insert_opt(&mut map, "tags", base.tags.clone());
    insert_block(&mut map, "worker", base.worker.as_ref().map(worker_to_map));
    insert_opt(&mut map, "max_concurrent_runs", base.max_concurrent_runs);
    insert(&mut map, "disabled", base.disabled);
    map
}

fn fields_to_map(fields: &TriggerFields) -> Object {
    let mut map = Object::new();
    insert_opt(&mut map, "source_trigger_id", fields.source_trigger_id.as_deref());
    insert_opt(&mut map, "name", fields.name.as_deref());
    insert_opt(&mut map, "type", fields.trigger_type.as_deref());
    insert_opt(&mut map, "href", fields.href.as_deref());
    insert_opt(&mut map, "event_listener", fields.event_listener.as_deref());
    insert_opt(&mut map, "id", fields.id.as_deref());
    insert_list(&mut map, "properties", properties_to_maps(fields.properties.as_deref()));
    insert_opt(&mut map, "tags", fields.tags.clone());
    insert_block(&mut map, "worker", fields.worker.as_ref().map(worker_to_map));
    insert_opt(&mut map, "max_concurrent_runs", fields.max_concurrent_runs);
    insert_opt(&mut map, "disabled", fields.disabled);
    insert_block(&mut map, "scm_source", fields.scm_source.as_ref().map(scm_source_to_map));
    insert_block(&mut map, "events", fields.events.as_ref().map(events_to_map));
    insert_opt(&mut map, "cron", fields.cron.as_deref());
    insert_opt(&mut map, "timezone", fields.timezone.as_deref());
    insert_block(&mut map, "secret", fields.secret.as_ref().map(secret_to_map));
    insert_opt(&mut map, "webhook_url", fields.webhook_url.as_deref());
    map
}

fn properties_to_maps(properties: Option<&[Property]>) -> Option<Vec<Object>> {
    properties.map(|props| props.iter().map(property_to_map).collect())
}

pub fn property_to_map(property: &Property) -> Object {
    let mut map = Object::new();
    insert(&mut map, "name", property.name.as_str());
    insert_opt(&mut map, "value", property.value.as_deref());
    insert_opt(&mut map, "enum", property.enum_values.clone());
    insert(&mut map, "type", property.property_type.as_str());
    insert_opt(&mut map, "path", property.path.as_deref());
    insert_opt(&mut map, "href", property.href.as_deref());
    map
}

pub fn worker_to_map(worker: &Worker) -> Object {
    let mut map = Object::new();
    insert_opt(&mut map, "name", worker.name.as_deref());
    insert_opt(&mut map, "type", worker.worker_type.as_deref());
    insert(&mut map, "id", worker.id.as_str());
    map
}

pub fn scm_source_to_map(source: &TriggerScmSource) -> Object {
    let mut map = Object::new();
    insert(&mut map, "url", source.url.as_str());
    insert_opt(&mut map, "branch", source.branch.as_deref());
    insert_opt(&mut map, "pattern", source.pattern.as_deref());
    insert_opt(&mut map, "blind_connection", source.blind_connection);
    insert_opt(&mut map, "hook_id", source.hook_id.as_deref());
    insert_opt(&mut map, "service_instance_id", source.service_instance_id.as_deref());
    map
}

pub fn events_to_map(events: &Events) -> Object {
    let mut map = Object::new();
    insert_opt(&mut map, "push", events.push);
    insert_opt(&mut map, "pull_request_closed", events.pull_request_closed);
    insert_opt(&mut map, "pull_request", events.pull_request);
    map
}

pub fn secret_to_map(secret: &GenericSecret) -> Object {
    let mut map = Object::new();
    insert_opt(&mut map, "type", secret.secret_type.as_deref());
    insert_opt(&mut map, "value", secret.value.as_deref());
    insert_opt(&mut map, "source", secret.source.as_deref());
    insert_opt(&mut map, "key_name", secret.key_name.as_deref());
    insert_opt(&mut map, "algorithm", secret.algorithm.as_deref());
    map
}

/// Builds a trigger from a `trigger` block of configuration or plan.
///
/// A non-empty `source_trigger_id` makes a duplicate, otherwise `type`
/// picks the kind and an unknown `type` is an error. Empty strings count
/// as unset.
pub fn map_to_trigger(map: &Object) -> Result<Trigger, TranslateError> {
    let fields = TriggerFields {
        source_trigger_id: optional_string(map, "source_trigger_id")?,
        trigger_type: optional_string(map, "type")?,
        name: optional_string(map, "name")?,
        href: optional_string(map, "href")?,
        event_listener: optional_string(map, "event_listener")?,
        id: optional_string(map, "id")?,
        properties: None,
        tags: optional_strings(map, "tags")?,
        worker: single_block(map, "worker")?.map(map_to_worker).transpose()?,
        max_concurrent_runs: optional_i64(map, "max_concurrent_runs")?,
        disabled: optional_bool(map, "disabled")?,
        scm_source: single_block(map, "scm_source")?
            .map(map_to_scm_source)
            .transpose()?,
        events: single_block(map, "events")?.map(map_to_events).transpose()?,
        cron: optional_string(map, "cron")?,
        timezone: optional_string(map, "timezone")?,
        secret: single_block(map, "secret")?.map(map_to_secret).transpose()?,
        webhook_url: None,
    };
    Ok(Trigger::try_from(fields)?)
}

pub fn map_to_worker(map: &Object) -> Result<Worker, TranslateError> {
    Ok(Worker {
        name: optional_string(map, "name")?,
        worker_type: optional_string(map, "type")?,
        id: optional_string(map, "id")?.unwrap_or_default(),
    })
}

pub fn map_to_scm_source(map: &Object) -> Result<TriggerScmSource, TranslateError> {
    Ok(TriggerScmSource {
        url: optional_string(map, "url")?.unwrap_or_default(),
        branch: optional_string(map, "branch")?,
        pattern: optional_string(map, "pattern")?,
        blind_connection: optional_bool(map, "blind_connection")?,
        hook_id: None,
        service_instance_id: optional_string(map, "service_instance_id")?,
    })
}

pub fn map_to_events(map: &Object) -> Result<Events, TranslateError> {
    Ok(Events {
        push: optional_bool(map, "push")?,
        pull_request_closed: optional_bool(map, "pull_request_closed")?,
        pull_request: optional_bool(map, "pull_request")?,
    })
}

pub fn map_to_secret(map: &Object) -> Result<GenericSecret, TranslateError> {
    Ok(GenericSecret {
        secret_type: optional_string(map, "type")?,
        value: optional_string(map, "value")?,
        source: optional_string(map, "source")?,
        key_name: optional_string(map, "key_name")?,
        algorithm: optional_string(map, "algorithm")?,
    })
}

/// The single `trigger` block of a state or plan value
pub fn trigger_block(value: &Dynamic) -> Option<&Object> {
    match value {
        Dynamic::List(items) => items.first().and_then(Dynamic::as_map),
        Dynamic::Map(map) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tekton::{DuplicateTrigger, GenericTrigger, ScmTrigger, TimerTrigger};

    fn base(name: &str) -> TriggerBase {
        TriggerBase {
            name: name.to_string(),
            event_listener: "listener".to_string(),
            id: Some("1bb892a1-2e04-4768-a369-b1159eace147".to_string()),
            worker: Some(Worker::with_id("public")),
            ..TriggerBase::default()
        }
    }

    fn block(map: &Object, key: &str) -> Object {
        single_block(map, key).unwrap().unwrap().clone()
    }

    #[test]
    fn scm_trigger_keeps_present_fields_only() {
        let trigger = Trigger::Scm(ScmTrigger {
            base: base("on push"),
            scm_source: Some(TriggerScmSource {
                url: "https://github.com/org/repo".to_string(),
                branch: Some("main".to_string()),
                hook_id: Some("42".to_string()),
                ..TriggerScmSource::default()
            }),
            events: Some(Events {
                push: Some(true),
                ..Events::default()
            }),
        });

        let map = trigger_to_map(&trigger);
        assert_eq!(map["type"], Dynamic::from("scm"));
        assert_eq!(map["name"], Dynamic::from("on push"));
        assert_eq!(map["disabled"], Dynamic::Bool(false));
        assert!(!map.contains_key("href"));
        assert!(!map.contains_key("tags"));
        assert!(!map.contains_key("cron"));

        let source = block(&map, "scm_source");
        assert_eq!(source["branch"], Dynamic::from("main"));
        assert_eq!(source["hook_id"], Dynamic::from("42"));
        assert!(!source.contains_key("pattern"));

        let events = block(&map, "events");
        assert_eq!(events.len(), 1);
        assert_eq!(events["push"], Dynamic::Bool(true));
    }

    #[test]
    fn duplicate_trigger_maps_source_and_name() {
        let map = trigger_to_map(&Trigger::Duplicate(DuplicateTrigger {
            source_trigger_id: "trig-1".to_string(),
            name: "copy".to_string(),
        }));
        assert_eq!(map.len(), 2);
        assert_eq!(map["source_trigger_id"], Dynamic::from("trig-1"));
    }

    #[test]
    fn generic_trigger_carries_secret_and_webhook() {
        let map = trigger_to_map(&Trigger::Generic(GenericTrigger {
            base: base("hook"),
            secret: Some(GenericSecret {
                secret_type: Some("token_matches".to_string()),
                value: Some("s3cr3t".to_string()),
                source: Some("header".to_string()),
                key_name: Some("x-token".to_string()),
                algorithm: None,
            }),
            webhook_url: Some("https://hooks.example/1".to_string()),
        }));

        let secret = block(&map, "secret");
        assert_eq!(secret["key_name"], Dynamic::from("x-token"));
        assert!(!secret.contains_key("algorithm"));
        assert_eq!(map["webhook_url"], Dynamic::from("https://hooks.example/1"));
        assert_eq!(block(&map, "worker")["id"], Dynamic::from("public"));
    }

    #[test]
    fn map_to_trigger_treats_empty_strings_as_unset() {
        let mut map = Object::new();
        insert(&mut map, "source_trigger_id", "");
        insert(&mut map, "type", "timer");
        insert(&mut map, "name", "nightly");
        insert(&mut map, "event_listener", "listener");
        insert(&mut map, "href", "");
        insert(&mut map, "cron", "0 4 * * *");
        insert(&mut map, "timezone", "");
        insert(&mut map, "max_concurrent_runs", 2i64);
        insert(&mut map, "disabled", true);

        let trigger = map_to_trigger(&map).unwrap();
        assert_eq!(
            trigger,
            Trigger::Timer(TimerTrigger {
                base: TriggerBase {
                    name: "nightly".to_string(),
                    event_listener: "listener".to_string(),
                    max_concurrent_runs: Some(2),
                    disabled: true,
                    ..TriggerBase::default()
                },
                cron: Some("0 4 * * *".to_string()),
                timezone: None,
            })
        );
    }

    #[test]
    fn map_to_trigger_reads_nested_blocks() {
        let mut worker = Object::new();
        insert(&mut worker, "id", "public");
        insert(&mut worker, "name", "");
        let mut source = Object::new();
        insert(&mut source, "url", "https://github.com/org/repo");
        insert(&mut source, "branch", "main");
        insert(&mut source, "pattern", "");
        insert(&mut source, "hook_id", "computed-by-server");
        let mut map = Object::new();
        insert(&mut map, "type", "scm");
        insert(&mut map, "name", "on push");
        insert(&mut map, "event_listener", "listener");
        insert(&mut map, "tags", vec!["ci"]);
        insert_block(&mut map, "worker", Some(worker));
        insert_block(&mut map, "scm_source", Some(source));

        match map_to_trigger(&map).unwrap() {
            Trigger::Scm(scm) => {
                assert_eq!(scm.base.worker, Some(Worker::with_id("public")));
                assert_eq!(scm.base.tags, Some(vec!["ci".to_string()]));
                let source = scm.scm_source.unwrap();
                assert_eq!(source.branch.as_deref(), Some("main"));
                assert_eq!(source.pattern, None);
                assert_eq!(source.hook_id, None);
                assert_eq!(scm.events, None);
            }
            other => panic!("expected scm trigger, got {:?}", other),
        }
    }

    #[test]
    fn source_trigger_id_makes_a_duplicate() {
        let mut map = Object::new();
        insert(&mut map, "source_trigger_id", "trig-1");
        insert(&mut map, "type", "manual");
        insert(&mut map, "name", "copy");
        insert(&mut map, "event_listener", "listener");

        assert!(matches!(
            map_to_trigger(&map).unwrap(),
            Trigger::Duplicate(DuplicateTrigger { ref source_trigger_id, .. }) if source_trigger_id == "trig-1"
        ));
    }

    #[test]
    fn required_fields_survive_a_round_trip() {
        let original = Trigger::Scm(ScmTrigger {
            base: base("on push"),
            scm_source: Some(TriggerScmSource {
                url: "https://github.com/org/repo".to_string(),
                ..TriggerScmSource::default()
            }),
            events: None,
        });
        let back = map_to_trigger(&trigger_to_map(&original)).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn wrongly_shaped_block_is_an_error() {
        let mut map = Object::new();
        insert(&mut map, "type", "manual");
        insert(&mut map, "worker", "public");
        assert!(map_to_trigger(&map).is_err());
    }

    #[test]
    fn unknown_type_names_the_subtype() {
        let mut map = Object::new();
        insert(&mut map, "type", "webhook");
        insert(&mut map, "name", "n");
        let err = map_to_trigger(&map).unwrap_err();
        assert!(matches!(err, TranslateError::Subtype(_)));
        assert!(err.to_string().contains("webhook"));
    }

    #[test]
    fn undiscriminated_fields_map_everything_present() {
        let map = trigger_to_map(&Trigger::Other(TriggerFields {
            trigger_type: Some("webhook".to_string()),
            name: Some("n".to_string()),
            cron: Some("* * * * *".to_string()),
            ..TriggerFields::default()
        }));
        assert_eq!(map.len(), 3);
        assert_eq!(map["type"], Dynamic::from("webhook"));
    }
}
