//! Schema-driven planning for PlanResourceChange
//!
//! Resources do not plan themselves: the server derives the planned state
//! from the proposed new state using the schema. Defaults fill unset
//! attributes, computed attributes without configuration become unknown
//! whenever the resource is created or changed, and plan modifiers get the
//! last word.

use crate::plan_modifier::{values_equal, PlanModifyRequest};
use crate::schema::{Block, NestingMode, Schema};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

struct Planner {
    requires_replace: Vec<AttributePath>,
    diagnostics: Vec<Diagnostic>,
}

pub fn plan_resource_change(
    schema: &Schema,
    prior_state: &DynamicValue,
    proposed_new_state: &DynamicValue,
    config: &DynamicValue,
) -> PlannedChange {
    if proposed_new_state.is_null() {
        return PlannedChange {
            planned_state: DynamicValue::null(),
            requires_replace: Vec::new(),
            diagnostics: Vec::new(),
        };
    }

    let changed = prior_state.is_null()
        || !values_equal(&prior_state.value, &proposed_new_state.value);

    let mut planner = Planner {
        requires_replace: Vec::new(),
        diagnostics: Vec::new(),
    };
    let planned = planner.plan_block(
        &schema.block,
        &prior_state.value,
        proposed_new_state.value.clone(),
        &config.value,
        &AttributePath::root(),
        changed,
    );

    PlannedChange {
        planned_state: DynamicValue::new(planned),
        requires_replace: planner.requires_replace,
        diagnostics: planner.diagnostics,
    }
}

fn field<'a>(value: &'a Dynamic, name: &str) -> &'a Dynamic {
    value
        .as_map()
        .and_then(|m| m.get(name))
        .unwrap_or(&Dynamic::Null)
}

fn element(value: &Dynamic, idx: usize) -> &Dynamic {
    value
        .as_list()
        .and_then(|l| l.get(idx))
        .unwrap_or(&Dynamic::Null)
}

impl Planner {
    fn plan_block(
        &mut self,
        block: &Block,
        prior: &Dynamic,
        proposed: Dynamic,
        config: &Dynamic,
        path: &AttributePath,
        changed: bool,
    ) -> Dynamic {
        let mut values = match proposed {
            Dynamic::Map(values) => values,
            other => return other,
        };

        for attr in &block.attributes {
            let attr_path = path.clone().attribute(&attr.name);
            let config_value = field(config, &attr.name);
            let prior_value = field(prior, &attr.name);
            let mut planned = values.remove(&attr.name).unwrap_or(Dynamic::Null);

            if config_value.is_null() && attr.computed {
                if let Some(default) = &attr.default {
                    planned = default.clone();
                } else if changed {
                    planned = Dynamic::Unknown;
                }
            }

            for modifier in &attr.plan_modifiers {
                let response = modifier.modify_plan(PlanModifyRequest {
                    state: prior_value.clone(),
                    plan: planned,
                    config: config_value.clone(),
                    attribute_path: attr_path.clone(),
                });
                planned = response.plan_value;
                self.diagnostics.extend(response.diagnostics);
                if response.requires_replace && !self.requires_replace.contains(&attr_path) {
                    self.requires_replace.push(attr_path.clone());
                }
            }

            values.insert(attr.name.clone(), planned);
        }

        for nested in &block.block_types {
            let nested_path = path.clone().attribute(&nested.type_name);
            let proposed_value = values.remove(&nested.type_name).unwrap_or(Dynamic::Null);
            let prior_value = field(prior, &nested.type_name);
            let config_value = field(config, &nested.type_name);

            let planned = match (nested.nesting, proposed_value) {
                (NestingMode::List, Dynamic::List(items)) => Dynamic::List(
                    items
                        .into_iter()
                        .enumerate()
                        .map(|(i, item)| {
                            self.plan_block(
                                &nested.block,
                                element(prior_value, i),
                                item,
                                element(config_value, i),
                                &nested_path.clone().index(i as i64),
                                changed,
                            )
                        })
                        .collect(),
                ),
                (NestingMode::Single, item @ Dynamic::Map(_))
                | (NestingMode::Group, item @ Dynamic::Map(_)) => self.plan_block(
                    &nested.block,
                    prior_value,
                    item,
                    config_value,
                    &nested_path,
                    changed,
                ),
                (_, other) => other,
            };

            values.insert(nested.type_name.clone(), planned);
        }

        Dynamic::Map(values)
    }
}
