//! Declarative schema description: property descriptors and the interface
//! that groups them.
//!
//! The original dispatches schema reads through dynamic proxies built over
//! a user-declared interface type. This rewrite picks the explicit,
//! declarative alternative: [`PropertyDescriptor`] is a plain struct built
//! with [`PropertyDescriptorBuilder`], the same shape as the declarative
//! pass definitions this crate's sibling modules use for their own
//! configuration.

use std::sync::Arc;

use regex::Regex;

use crate::node::NodeType;
use crate::value::Value;

/// Priority order for merging `required` across constraint sources:
/// `Yes` beats `No` beats `Auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Requiredness {
    Auto,
    No,
    Yes,
}

impl Default for Requiredness {
    fn default() -> Self {
        Requiredness::Auto
    }
}

/// A member of a `TYPE` constraint's allowed set. Distinct from
/// [`NodeType`] only in that it adds `Integer` — a JSON number whose
/// fractional part is zero, per §4.7's `TYPE` validator — which is not one
/// of the six lazy-node variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl AllowedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllowedType::Object => "object",
            AllowedType::Array => "array",
            AllowedType::String => "string",
            AllowedType::Number => "number",
            AllowedType::Integer => "integer",
            AllowedType::Boolean => "boolean",
            AllowedType::Null => "null",
        }
    }

    /// Whether `value` (whose lazy-node variant is `actual`) satisfies this
    /// allowed type.
    pub fn matches(&self, actual: NodeType, value: &Value) -> bool {
        match self {
            AllowedType::Integer => actual == NodeType::Number && value.is_integer(),
            AllowedType::Object => actual == NodeType::Object,
            AllowedType::Array => actual == NodeType::Array,
            AllowedType::String => actual == NodeType::String,
            AllowedType::Number => actual == NodeType::Number,
            AllowedType::Boolean => actual == NodeType::Boolean,
            AllowedType::Null => actual == NodeType::Null,
        }
    }
}

impl std::fmt::Display for AllowedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The constraint set applicable to one property, already merged from
/// every contributing source (see [`merge_constraints`]).
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    pub allowed_types: Option<Vec<AllowedType>>,
    pub enum_values: Option<Vec<Value>>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub patterns: Vec<Arc<Regex>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub unique_items: bool,
    pub min_properties: Option<usize>,
    pub max_properties: Option<usize>,
    pub required: Requiredness,
    pub dependent_required: Vec<(String, Vec<String>)>,
}

/// A merge of two constraint sets failed because the two disagreed on a
/// field where disagreement is not resolvable (enum literal sets).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("cannot merge constraints: conflicting enum sets at priority boundary")]
pub struct ConstraintMergeError;

fn merge_min(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

fn merge_max(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

fn merge_min_f64(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

fn merge_max_f64(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

/// Merges two constraint sets in priority order: `lower_priority` is the
/// base, `higher_priority` wins ties and narrows bounds. Per the merge
/// rule: numeric lower bounds keep the larger, upper bounds keep the
/// smaller, union sets take the union, enum sets must agree exactly, and
/// `required` follows `Yes > No > Auto`.
pub fn merge_constraints(
    lower_priority: &Constraints,
    higher_priority: &Constraints,
) -> Result<Constraints, ConstraintMergeError> {
    let allowed_types = match (&lower_priority.allowed_types, &higher_priority.allowed_types) {
        (Some(a), Some(b)) => {
            let mut union: Vec<AllowedType> = a.clone();
            for t in b {
                if !union.contains(t) {
                    union.push(*t);
                }
            }
            Some(union)
        }
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (None, None) => None,
    };

    let enum_values = match (&lower_priority.enum_values, &higher_priority.enum_values) {
        (Some(a), Some(b)) => {
            if a == b {
                Some(a.clone())
            } else {
                return Err(ConstraintMergeError);
            }
        }
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (None, None) => None,
    };

    let mut patterns = lower_priority.patterns.clone();
    for p in &higher_priority.patterns {
        if !patterns.iter().any(|existing| existing.as_str() == p.as_str()) {
            patterns.push(p.clone());
        }
    }

    Ok(Constraints {
        allowed_types,
        enum_values,
        min_length: merge_min(lower_priority.min_length, higher_priority.min_length),
        max_length: merge_max(lower_priority.max_length, higher_priority.max_length),
        patterns,
        minimum: merge_min_f64(lower_priority.minimum, higher_priority.minimum),
        maximum: merge_max_f64(lower_priority.maximum, higher_priority.maximum),
        exclusive_minimum: merge_min_f64(
            lower_priority.exclusive_minimum,
            higher_priority.exclusive_minimum,
        ),
        exclusive_maximum: merge_max_f64(
            lower_priority.exclusive_maximum,
            higher_priority.exclusive_maximum,
        ),
        multiple_of: higher_priority.multiple_of.or(lower_priority.multiple_of),
        min_items: merge_min(lower_priority.min_items, higher_priority.min_items),
        max_items: merge_max(lower_priority.max_items, higher_priority.max_items),
        unique_items: lower_priority.unique_items || higher_priority.unique_items,
        min_properties: merge_min(lower_priority.min_properties, higher_priority.min_properties),
        max_properties: merge_max(lower_priority.max_properties, higher_priority.max_properties),
        required: lower_priority.required.max(higher_priority.required),
        dependent_required: {
            let mut merged = lower_priority.dependent_required.clone();
            merged.extend(higher_priority.dependent_required.iter().cloned());
            merged
        },
    })
}

/// What a property's value is converted to once fetched.
#[derive(Debug, Clone)]
pub enum ResultType {
    Primitive(crate::tree::TypeTag),
    /// A nested object described by another schema.
    Object(Arc<SchemaInterface>),
    /// A typed list, map, or multimap view over a collection member. The
    /// element spec carries both the element's result type and the
    /// constraints applied to each element — "arrays recurse on their
    /// element-level constraints" per the validation engine's design.
    Collection(crate::tree::TypeTag, Box<ElementSpec>),
}

/// The result type and constraints that apply to each element of a
/// collection-typed property.
#[derive(Debug, Clone)]
pub struct ElementSpec {
    pub result_type: ResultType,
    pub constraints: Constraints,
}

impl ElementSpec {
    pub fn new(result_type: ResultType) -> Self {
        Self {
            result_type,
            constraints: Constraints::default(),
        }
    }

    pub fn with_constraints(result_type: ResultType, constraints: Constraints) -> Self {
        Self {
            result_type,
            constraints,
        }
    }
}

/// One property of a schema-described JSON object: the member it reads,
/// the type it converts to, and the constraints that apply to it.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub json_name: String,
    pub result_type: ResultType,
    pub default: Option<Value>,
    pub constraints: Constraints,
}

pub struct PropertyDescriptorBuilder {
    json_name: String,
    result_type: ResultType,
    default: Option<Value>,
    constraints: Constraints,
}

impl PropertyDescriptorBuilder {
    /// `accessor_name` is run through [`crate::tree::assumed_member_name`]
    /// to derive the JSON member name unless `.named(..)` overrides it.
    pub fn from_accessor_name(accessor_name: &str, result_type: ResultType) -> Self {
        Self {
            json_name: crate::tree::assumed_member_name(accessor_name),
            result_type,
            default: None,
            constraints: Constraints::default(),
        }
    }

    pub fn named(mut self, json_name: impl Into<String>) -> Self {
        self.json_name = json_name.into();
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn required(mut self, required: Requiredness) -> Self {
        self.constraints.required = required;
        self
    }

    pub fn allowed_types(mut self, types: Vec<AllowedType>) -> Self {
        self.constraints.allowed_types = Some(types);
        self
    }

    pub fn enum_values(mut self, values: Vec<Value>) -> Self {
        self.constraints.enum_values = Some(values);
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.constraints.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.constraints.max_length = Some(n);
        self
    }

    pub fn pattern(mut self, regex: Regex) -> Self {
        self.constraints.patterns.push(Arc::new(regex));
        self
    }

    pub fn minimum(mut self, n: f64) -> Self {
        self.constraints.minimum = Some(n);
        self
    }

    pub fn maximum(mut self, n: f64) -> Self {
        self.constraints.maximum = Some(n);
        self
    }

    pub fn exclusive_minimum(mut self, n: f64) -> Self {
        self.constraints.exclusive_minimum = Some(n);
        self
    }

    pub fn exclusive_maximum(mut self, n: f64) -> Self {
        self.constraints.exclusive_maximum = Some(n);
        self
    }

    pub fn multiple_of(mut self, n: f64) -> Self {
        self.constraints.multiple_of = Some(n);
        self
    }

    pub fn min_items(mut self, n: usize) -> Self {
        self.constraints.min_items = Some(n);
        self
    }

    pub fn max_items(mut self, n: usize) -> Self {
        self.constraints.max_items = Some(n);
        self
    }

    pub fn unique_items(mut self) -> Self {
        self.constraints.unique_items = true;
        self
    }

    pub fn build(self) -> PropertyDescriptor {
        PropertyDescriptor {
            json_name: self.json_name,
            result_type: self.result_type,
            default: self.default,
            constraints: self.constraints,
        }
    }
}

/// An ordered group of property descriptors describing one JSON object's
/// shape, plus object-level constraints (property counts, dependent
/// groups).
#[derive(Debug, Clone, Default)]
pub struct SchemaInterface {
    pub properties: Vec<PropertyDescriptor>,
    pub min_properties: Option<usize>,
    pub max_properties: Option<usize>,
    pub dependent_required: Vec<(String, Vec<String>)>,
}

impl SchemaInterface {
    pub fn new(properties: Vec<PropertyDescriptor>) -> Self {
        Self {
            properties,
            min_properties: None,
            max_properties: None,
            dependent_required: Vec::new(),
        }
    }

    pub fn property(&self, json_name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.json_name == json_name)
    }
}

/// A JSON-Schema document could not be ingested into a [`SchemaInterface`].
///
/// Mirrors the teacher's `ConvertError`-per-concern style: one enum, one
/// `#[error(...)]` template per failure shape.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SchemaIngestError {
    #[error("schema at {pointer} is not a JSON object")]
    NotAnObject { pointer: String },
    #[error("schema at {pointer} has unsupported \"type\" value {found}")]
    UnsupportedType { pointer: String, found: String },
    #[error("schema at {pointer} keyword \"{keyword}\" has the wrong shape")]
    MalformedKeyword { pointer: String, keyword: String },
}

/// Parses a standard JSON Schema object (the subset this crate's validator
/// understands: `type`, `properties`, `required`, `items`,
/// `additionalProperties`, and the `TYPE`-adjacent keyword family from
/// §4.7) into a [`SchemaInterface`].
///
/// Only object schemas are accepted at the top level, since a
/// [`SchemaInterface`] always describes one object's member set — the same
/// restriction the validation engine's [`PropertyDescriptor`] recursion
/// imposes on nested `Object` result types.
pub fn from_json_schema(schema: &serde_json::Value) -> Result<SchemaInterface, SchemaIngestError> {
    from_json_schema_at(schema, "#")
}

fn from_json_schema_at(schema: &serde_json::Value, pointer: &str) -> Result<SchemaInterface, SchemaIngestError> {
    let obj = schema.as_object().ok_or_else(|| SchemaIngestError::NotAnObject {
        pointer: pointer.to_string(),
    })?;

    let required: std::collections::HashSet<&str> = obj
        .get("required")
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    let mut properties = Vec::new();
    if let Some(props) = obj.get("properties").and_then(|v| v.as_object()) {
        for (name, prop_schema) in props {
            let child_pointer = format!("{pointer}/properties/{name}");
            let descriptor = property_descriptor_from_schema(
                name,
                prop_schema,
                required.contains(name.as_str()),
                &child_pointer,
            )?;
            properties.push(descriptor);
        }
    }

    let mut interface = SchemaInterface::new(properties);
    interface.min_properties = obj.get("minProperties").and_then(|v| v.as_u64()).map(|n| n as usize);
    interface.max_properties = obj.get("maxProperties").and_then(|v| v.as_u64()).map(|n| n as usize);
    if let Some(dependent) = obj.get("dependentRequired").and_then(|v| v.as_object()) {
        for (trigger, dependents) in dependent {
            let names = dependents
                .as_array()
                .ok_or_else(|| SchemaIngestError::MalformedKeyword {
                    pointer: pointer.to_string(),
                    keyword: "dependentRequired".to_string(),
                })?
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            interface.dependent_required.push((trigger.clone(), names));
        }
    }
    Ok(interface)
}

fn property_descriptor_from_schema(
    json_name: &str,
    schema: &serde_json::Value,
    required: bool,
    pointer: &str,
) -> Result<PropertyDescriptor, SchemaIngestError> {
    let obj = schema.as_object().ok_or_else(|| SchemaIngestError::NotAnObject {
        pointer: pointer.to_string(),
    })?;

    let declared_type = obj.get("type").and_then(|v| v.as_str());
    let result_type = match declared_type {
        Some("object") => ResultType::Object(Arc::new(from_json_schema_at(schema, pointer)?)),
        Some("array") => {
            let items = obj.get("items").ok_or_else(|| SchemaIngestError::MalformedKeyword {
                pointer: pointer.to_string(),
                keyword: "items".to_string(),
            })?;
            let element = element_spec_from_schema(items, &format!("{pointer}/items"))?;
            ResultType::Collection(crate::tree::TypeTag::list(), Box::new(element))
        }
        Some(other) => ResultType::Primitive(primitive_type_tag(other, pointer)?),
        None => ResultType::Primitive(crate::tree::TypeTag::new("any")),
    };

    let mut constraints = constraints_from_schema(obj, pointer)?;
    if required {
        constraints.required = Requiredness::Yes;
    }

    let builder = PropertyDescriptorBuilder::from_accessor_name(json_name, result_type)
        .named(json_name.to_string());
    Ok(PropertyDescriptor {
        constraints,
        ..builder.build()
    })
}

fn element_spec_from_schema(schema: &serde_json::Value, pointer: &str) -> Result<ElementSpec, SchemaIngestError> {
    let obj = schema.as_object().ok_or_else(|| SchemaIngestError::NotAnObject {
        pointer: pointer.to_string(),
    })?;
    let declared_type = obj.get("type").and_then(|v| v.as_str());
    let result_type = match declared_type {
        Some("object") => ResultType::Object(Arc::new(from_json_schema_at(schema, pointer)?)),
        Some("array") => {
            let items = obj.get("items").ok_or_else(|| SchemaIngestError::MalformedKeyword {
                pointer: pointer.to_string(),
                keyword: "items".to_string(),
            })?;
            let nested = element_spec_from_schema(items, &format!("{pointer}/items"))?;
            ResultType::Collection(crate::tree::TypeTag::list(), Box::new(nested))
        }
        Some(other) => ResultType::Primitive(primitive_type_tag(other, pointer)?),
        None => ResultType::Primitive(crate::tree::TypeTag::new("any")),
    };
    let constraints = constraints_from_schema(obj, pointer)?;
    Ok(ElementSpec::with_constraints(result_type, constraints))
}

fn primitive_type_tag(name: &str, pointer: &str) -> Result<crate::tree::TypeTag, SchemaIngestError> {
    match name {
        "string" => Ok(crate::tree::TypeTag::string()),
        "integer" => Ok(crate::tree::TypeTag::int64()),
        "number" => Ok(crate::tree::TypeTag::float64()),
        "boolean" => Ok(crate::tree::TypeTag::boolean()),
        other => Err(SchemaIngestError::UnsupportedType {
            pointer: pointer.to_string(),
            found: other.to_string(),
        }),
    }
}

fn allowed_types_for(declared_type: Option<&str>) -> Option<Vec<AllowedType>> {
    match declared_type {
        Some("string") => Some(vec![AllowedType::String]),
        Some("number") => Some(vec![AllowedType::Number]),
        Some("integer") => Some(vec![AllowedType::Integer]),
        Some("boolean") => Some(vec![AllowedType::Boolean]),
        Some("object") => Some(vec![AllowedType::Object]),
        Some("array") => Some(vec![AllowedType::Array]),
        Some("null") => Some(vec![AllowedType::Null]),
        _ => None,
    }
}

fn constraints_from_schema(
    obj: &serde_json::Map<String, serde_json::Value>,
    pointer: &str,
) -> Result<Constraints, SchemaIngestError> {
    let declared_type = obj.get("type").and_then(|v| v.as_str());
    let mut constraints = Constraints {
        allowed_types: allowed_types_for(declared_type),
        min_length: obj.get("minLength").and_then(|v| v.as_u64()).map(|n| n as usize),
        max_length: obj.get("maxLength").and_then(|v| v.as_u64()).map(|n| n as usize),
        minimum: obj.get("minimum").and_then(|v| v.as_f64()),
        maximum: obj.get("maximum").and_then(|v| v.as_f64()),
        exclusive_minimum: obj.get("exclusiveMinimum").and_then(|v| v.as_f64()),
        exclusive_maximum: obj.get("exclusiveMaximum").and_then(|v| v.as_f64()),
        multiple_of: obj.get("multipleOf").and_then(|v| v.as_f64()),
        min_items: obj.get("minItems").and_then(|v| v.as_u64()).map(|n| n as usize),
        max_items: obj.get("maxItems").and_then(|v| v.as_u64()).map(|n| n as usize),
        unique_items: obj.get("uniqueItems").and_then(|v| v.as_bool()).unwrap_or(false),
        ..Default::default()
    };

    if let Some(pattern) = obj.get("pattern").and_then(|v| v.as_str()) {
        let regex = Regex::new(pattern).map_err(|_| SchemaIngestError::MalformedKeyword {
            pointer: pointer.to_string(),
            keyword: "pattern".to_string(),
        })?;
        constraints.patterns.push(Arc::new(regex));
    }

    if let Some(values) = obj.get("enum").and_then(|v| v.as_array()) {
        constraints.enum_values = Some(values.iter().map(Value::from).collect());
    }

    Ok(constraints)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assumed_getter_name_used_by_default() {
        let d = PropertyDescriptorBuilder::from_accessor_name(
            "getName",
            ResultType::Primitive(crate::tree::TypeTag::string()),
        )
        .build();
        assert_eq!(d.json_name, "name");
    }

    #[test]
    fn named_overrides_assumed_name() {
        let d = PropertyDescriptorBuilder::from_accessor_name(
            "value",
            ResultType::Primitive(crate::tree::TypeTag::string()),
        )
        .named("raw_value")
        .build();
        assert_eq!(d.json_name, "raw_value");
    }

    #[test]
    fn merge_keeps_larger_lower_bound_and_smaller_upper_bound() {
        let base = Constraints {
            minimum: Some(0.0),
            maximum: Some(100.0),
            ..Default::default()
        };
        let narrower = Constraints {
            minimum: Some(10.0),
            maximum: Some(50.0),
            ..Default::default()
        };
        let merged = merge_constraints(&base, &narrower).unwrap();
        assert_eq!(merged.minimum, Some(10.0));
        assert_eq!(merged.maximum, Some(50.0));
    }

    #[test]
    fn merge_required_follows_yes_gt_no_gt_auto() {
        let auto = Constraints::default();
        let yes = Constraints {
            required: Requiredness::Yes,
            ..Default::default()
        };
        let merged = merge_constraints(&auto, &yes).unwrap();
        assert_eq!(merged.required, Requiredness::Yes);
    }

    #[test]
    fn merge_fails_on_conflicting_enum_sets() {
        let a = Constraints {
            enum_values: Some(vec![Value::String("x".into())]),
            ..Default::default()
        };
        let b = Constraints {
            enum_values: Some(vec![Value::String("y".into())]),
            ..Default::default()
        };
        assert!(merge_constraints(&a, &b).is_err());
    }

    #[test]
    fn ingests_flat_object_schema_with_required_and_bounds() {
        let raw = serde_json::json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": {"type": "string", "minLength": 1},
                "age": {"type": "integer", "minimum": 0}
            }
        });
        let schema = from_json_schema(&raw).unwrap();
        let name = schema.property("name").unwrap();
        assert_eq!(name.constraints.required, Requiredness::Yes);
        assert_eq!(name.constraints.min_length, Some(1));
        let age = schema.property("age").unwrap();
        assert_eq!(age.constraints.required, Requiredness::Auto);
        assert_eq!(
            age.constraints.allowed_types,
            Some(vec![AllowedType::Integer])
        );
    }

    #[test]
    fn ingests_array_property_as_list_collection_with_element_constraints() {
        let raw = serde_json::json!({
            "type": "object",
            "properties": {
                "tags": {
                    "type": "array",
                    "items": {"type": "string", "minLength": 2}
                }
            }
        });
        let schema = from_json_schema(&raw).unwrap();
        let tags = schema.property("tags").unwrap();
        match &tags.result_type {
            ResultType::Collection(tag, element) => {
                assert_eq!(*tag, crate::tree::TypeTag::list());
                assert_eq!(element.constraints.min_length, Some(2));
            }
            other => panic!("expected a Collection result type, got {other:?}"),
        }
    }

    #[test]
    fn ingests_nested_object_property_recursively() {
        let raw = serde_json::json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "object",
                    "required": ["city"],
                    "properties": {
                        "city": {"type": "string"}
                    }
                }
            }
        });
        let schema = from_json_schema(&raw).unwrap();
        let address = schema.property("address").unwrap();
        match &address.result_type {
            ResultType::Object(nested) => {
                let city = nested.property("city").unwrap();
                assert_eq!(city.constraints.required, Requiredness::Yes);
            }
            other => panic!("expected an Object result type, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unsupported_primitive_type_name() {
        let raw = serde_json::json!({
            "type": "object",
            "properties": {
                "whatever": {"type": "banana"}
            }
        });
        assert!(from_json_schema(&raw).is_err());
    }
}
