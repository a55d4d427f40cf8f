//! Schema types and builders for tfplug
//!
//! This module provides the schema system for defining resource and data source
//! schemas, including attribute types, blocks, and validation.

pub use crate::attribute_type::AttributeType;
use crate::plan_modifier::PlanModifier;
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use crate::validator::Validator;
use std::collections::HashMap;
use std::sync::Arc;

/// Schema is returned by providers/resources/data sources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64, // Increment when schema changes require migration
    pub block: Block, // Root block containing all attributes
}

/// Block represents a configuration block
#[derive(Debug, Clone)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

impl Block {
    fn empty() -> Self {
        Self {
            version: 0,
            attributes: Vec::new(),
            block_types: Vec::new(),
            description: String::new(),
            description_kind: StringKind::Plain,
            deprecated: false,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn block_type(&self, name: &str) -> Option<&NestedBlock> {
        self.block_types.iter().find(|b| b.type_name == name)
    }

    /// The object type a value of this block has on the wire
    pub fn value_type(&self) -> AttributeType {
        let mut fields: HashMap<String, AttributeType> = self
            .attributes
            .iter()
            .map(|a| (a.name.clone(), a.r#type.clone()))
            .collect();

        for nested in &self.block_types {
            let object = nested.block.value_type();
            let ty = match nested.nesting {
                NestingMode::Single | NestingMode::Group | NestingMode::Invalid => object,
                NestingMode::List => AttributeType::List(Box::new(object)),
                NestingMode::Set => AttributeType::Set(Box::new(object)),
                NestingMode::Map => AttributeType::Map(Box::new(object)),
            };
            fields.insert(nested.type_name.clone(), ty);
        }

        AttributeType::Object(fields)
    }

    fn validate_value(&self, value: &Dynamic, path: &AttributePath, diags: &mut Vec<Diagnostic>) {
        let map = match value.as_map() {
            Some(map) => map,
            None => return,
        };

        for attr in &self.attributes {
            let attr_path = path.clone().attribute(&attr.name);
            let attr_value = map.get(&attr.name).unwrap_or(&Dynamic::Null);

            if attr_value.is_null() {
                if attr.required {
                    diags.push(
                        Diagnostic::error(
                            "Missing required argument",
                            format!("The argument \"{}\" is required, but no definition was found.", attr.name),
                        )
                        .with_attribute(attr_path),
                    );
                }
                continue;
            }
            if attr_value.is_unknown() {
                continue;
            }

            for validator in &attr.validators {
                validator.validate(attr_value, &attr_path, diags);
            }
        }

        for nested in &self.block_types {
            let nested_path = path.clone().attribute(&nested.type_name);
            let items: Vec<&Dynamic> = match map.get(&nested.type_name) {
                Some(Dynamic::List(items)) => items.iter().collect(),
                Some(Dynamic::Map(items)) if nested.nesting == NestingMode::Map => {
                    items.values().collect()
                }
                Some(Dynamic::Unknown) => continue,
                Some(Dynamic::Null) | None => Vec::new(),
                Some(single) => vec![single],
            };

            let count = items.len() as i64;
            if count < nested.min_items {
                diags.push(
                    Diagnostic::error(
                        "Insufficient blocks",
                        format!(
                            "At least {} \"{}\" blocks are required.",
                            nested.min_items, nested.type_name
                        ),
                    )
                    .with_attribute(nested_path.clone()),
                );
            }
            if nested.max_items > 0 && count > nested.max_items {
                diags.push(
                    Diagnostic::error(
                        "Too many blocks",
                        format!(
                            "No more than {} \"{}\" blocks are allowed.",
                            nested.max_items, nested.type_name
                        ),
                    )
                    .with_attribute(nested_path.clone()),
                );
            }

            for (i, item) in items.into_iter().enumerate() {
                nested
                    .block
                    .validate_value(item, &nested_path.clone().index(i as i64), diags);
            }
        }
    }
}

impl Schema {
    /// The object type of a full resource/data source value
    pub fn value_type(&self) -> AttributeType {
        self.block.value_type()
    }

    /// Shapes a value so that every schema attribute is present
    pub fn conform(&self, value: DynamicValue) -> DynamicValue {
        DynamicValue::new(self.value_type().conform(value.value))
    }

    /// Required attributes, block counts and attribute validators
    pub fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        self.block
            .validate_value(&config.value, &AttributePath::root(), &mut diags);
        diags
    }
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Dynamic>,
    pub deprecated: bool,
}

// Manual Debug implementation since validators/modifiers don't implement Debug
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("description", &self.description)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .field("default", &self.default)
            .field("deprecated", &self.deprecated)
            .finish()
    }
}

/// NestedBlock represents a nested configuration block
#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    pub max_items: i64,
}

/// NestingMode defines how nested blocks are structured
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    Invalid,
    Single,
    List,
    Set,
    Map,
    Group,
}

/// StringKind represents the format of string values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StringKind {
    Plain,
    Markdown,
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    /// Create a new attribute builder
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
                deprecated: false,
            },
        }
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    /// Mark as optional
    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    /// Mark as computed
    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    /// Add validator
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.attribute.validators.push(Arc::new(validator));
        self
    }

    /// Add plan modifier
    pub fn plan_modifier(mut self, modifier: impl PlanModifier + 'static) -> Self {
        self.attribute.plan_modifiers.push(Arc::new(modifier));
        self
    }

    /// Value planned when the configuration leaves the attribute unset.
    /// Only meaningful on optional+computed attributes.
    pub fn default(mut self, value: impl Into<Dynamic>) -> Self {
        self.attribute.default = Some(value.into());
        self
    }

    /// Finalize the attribute
    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// NestedBlockBuilder builds `block_types` entries
pub struct NestedBlockBuilder {
    nested: NestedBlock,
}

impl NestedBlockBuilder {
    pub fn new(type_name: &str, nesting: NestingMode) -> Self {
        Self {
            nested: NestedBlock {
                type_name: type_name.to_string(),
                block: Block::empty(),
                nesting,
                min_items: 0,
                max_items: 0,
            },
        }
    }

    /// Shorthand for a list block holding at most one element
    pub fn single_list(type_name: &str) -> Self {
        Self::new(type_name, NestingMode::List).max_items(1)
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.nested.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.nested.block.block_types.push(block);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.nested.block.description = desc.to_string();
        self
    }

    pub fn min_items(mut self, min: i64) -> Self {
        self.nested.min_items = min;
        self
    }

    pub fn max_items(mut self, max: i64) -> Self {
        self.nested.max_items = max;
        self
    }

    pub fn build(self) -> NestedBlock {
        self.nested
    }
}

/// SchemaBuilder provides fluent API for building schemas
/// ALWAYS use this for consistency
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block::empty(),
            },
        }
    }

    /// Set schema version
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    /// Add attribute
    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    /// Add nested block
    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    /// Set description kind
    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    /// Finalize the schema
    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
