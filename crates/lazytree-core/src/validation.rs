//! Validation engine: walks a virtual value against a [`SchemaInterface`]
//! and accumulates structured errors rather than failing on the first one.

use crate::error::{SchemaViolation, ValidationError};
use crate::node::NodeType;
use crate::schema::{Constraints, ElementSpec, Requiredness, ResultType, SchemaInterface};
use crate::tree::{TypeTag, VirtualTree};
use crate::value::Value;

/// Runs every applicable rule for `constraints` against the value found at
/// `tree`, pushing one [`ValidationError`] per violated rule into `out`.
fn check_value(tree: &VirtualTree, constraints: &Constraints, out: &mut Vec<ValidationError>) {
    let path = tree.path().canonical();

    if tree.is_undefined() {
        if constraints.required == Requiredness::Yes {
            out.push(ValidationError {
                rule: "REQUIRED".to_string(),
                path,
                value: None,
                message: "required property is missing".to_string(),
            });
        }
        return;
    }

    let value = match tree.value() {
        Ok(v) => v,
        Err(e) => {
            out.push(ValidationError {
                rule: "TYPE".to_string(),
                path,
                value: None,
                message: e.to_string(),
            });
            return;
        }
    };
    let value_str = value.to_string();
    let actual_type = node_type_of(&value);

    if let Some(allowed) = &constraints.allowed_types {
        let matches = allowed.iter().any(|t| t.matches(actual_type, &value));
        if !matches {
            out.push(ValidationError {
                rule: "TYPE".to_string(),
                path: path.clone(),
                value: Some(value_str.clone()),
                message: format!(
                    "expected one of {:?}, found {}",
                    allowed.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
                    actual_type
                ),
            });
        }
    }

    if let Some(enum_values) = &constraints.enum_values {
        if !enum_values.contains(&value) {
            out.push(ValidationError {
                rule: "ENUM".to_string(),
                path: path.clone(),
                value: Some(value_str.clone()),
                message: "value is not one of the allowed literals".to_string(),
            });
        }
    }

    match &value {
        Value::String(s) => {
            let len = s.chars().count();
            if let Some(min) = constraints.min_length {
                if len < min {
                    out.push(ValidationError {
                        rule: "MIN_LENGTH".to_string(),
                        path: path.clone(),
                        value: Some(value_str.clone()),
                        message: format!("length {len} is below minimum {min}"),
                    });
                }
            }
            if let Some(max) = constraints.max_length {
                if len > max {
                    out.push(ValidationError {
                        rule: "MAX_LENGTH".to_string(),
                        path: path.clone(),
                        value: Some(value_str.clone()),
                        message: format!("length {len} exceeds maximum {max}"),
                    });
                }
            }
            for pattern in &constraints.patterns {
                if !pattern.is_match(s) {
                    out.push(ValidationError {
                        rule: "PATTERN".to_string(),
                        path: path.clone(),
                        value: Some(value_str.clone()),
                        message: format!("does not match pattern /{}/", pattern.as_str()),
                    });
                }
            }
        }
        Value::Number(n) => {
            if let Some(min) = constraints.minimum {
                if *n < min {
                    out.push(ValidationError {
                        rule: "MINIMUM".to_string(),
                        path: path.clone(),
                        value: Some(value_str.clone()),
                        message: format!("{n} is below minimum {min}"),
                    });
                }
            }
            if let Some(max) = constraints.maximum {
                if *n > max {
                    out.push(ValidationError {
                        rule: "MAXIMUM".to_string(),
                        path: path.clone(),
                        value: Some(value_str.clone()),
                        message: format!("{n} exceeds maximum {max}"),
                    });
                }
            }
            if let Some(min) = constraints.exclusive_minimum {
                if *n <= min {
                    out.push(ValidationError {
                        rule: "EXCLUSIVE_MINIMUM".to_string(),
                        path: path.clone(),
                        value: Some(value_str.clone()),
                        message: format!("{n} is not strictly above {min}"),
                    });
                }
            }
            if let Some(max) = constraints.exclusive_maximum {
                if *n >= max {
                    out.push(ValidationError {
                        rule: "EXCLUSIVE_MAXIMUM".to_string(),
                        path: path.clone(),
                        value: Some(value_str.clone()),
                        message: format!("{n} is not strictly below {max}"),
                    });
                }
            }
            if let Some(m) = constraints.multiple_of {
                if m != 0.0 && (n / m).fract().abs() > f64::EPSILON {
                    out.push(ValidationError {
                        rule: "MULTIPLE_OF".to_string(),
                        path: path.clone(),
                        value: Some(value_str.clone()),
                        message: format!("{n} is not a multiple of {m}"),
                    });
                }
            }
        }
        Value::Array(items) => {
            let len = items.len();
            if let Some(min) = constraints.min_items {
                if len < min {
                    out.push(ValidationError {
                        rule: "MIN_ITEMS".to_string(),
                        path: path.clone(),
                        value: None,
                        message: format!("{len} items is below minimum {min}"),
                    });
                }
            }
            if let Some(max) = constraints.max_items {
                if len > max {
                    out.push(ValidationError {
                        rule: "MAX_ITEMS".to_string(),
                        path: path.clone(),
                        value: None,
                        message: format!("{len} items exceeds maximum {max}"),
                    });
                }
            }
            if constraints.unique_items {
                let declarations: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                let mut seen = std::collections::HashSet::new();
                if !declarations.iter().all(|d| seen.insert(d.clone())) {
                    out.push(ValidationError {
                        rule: "UNIQUE_ITEMS".to_string(),
                        path: path.clone(),
                        value: None,
                        message: "array contains duplicate elements".to_string(),
                    });
                }
            }
        }
        _ => {}
    }
}

/// Applies `element`'s constraints (and, for nested object/collection
/// element types, recurses further) to every element of a collection-typed
/// property — a typed list's items, a typed map's values, or a multimap's
/// per-key lists.
fn validate_collection(
    tree: &VirtualTree,
    tag: &TypeTag,
    element: &ElementSpec,
    errors: &mut Vec<ValidationError>,
) {
    let mut validate_one = |child: &VirtualTree, errors: &mut Vec<ValidationError>| {
        check_value(child, &element.constraints, errors);
        if !child.exists() {
            return;
        }
        match &element.result_type {
            ResultType::Object(nested) => validate_into(child, nested, errors),
            ResultType::Collection(inner_tag, inner_element) => {
                validate_collection(child, inner_tag, inner_element, errors)
            }
            ResultType::Primitive(_) => {}
        }
    };

    if *tag == TypeTag::multimap() {
        let Ok(node) = tree.document().resolve(tree.path()) else {
            return;
        };
        let Ok(keys) = tree.document().keys(&node) else {
            return;
        };
        for key in keys {
            let list = tree.member(&key);
            let Ok(len) = list.size() else { continue };
            for i in 0..len {
                validate_one(&list.element(i), errors);
            }
        }
        return;
    }

    if *tag == TypeTag::map() {
        let Ok(node) = tree.document().resolve(tree.path()) else {
            return;
        };
        let Ok(keys) = tree.document().keys(&node) else {
            return;
        };
        for key in keys {
            validate_one(&tree.member(&key), errors);
        }
        return;
    }

    // List (the default collection shape): elements addressed by index.
    let Ok(len) = tree.size() else { return };
    for i in 0..len {
        validate_one(&tree.element(i), errors);
    }
}

fn node_type_of(value: &Value) -> NodeType {
    match value {
        Value::Null => NodeType::Null,
        Value::Boolean(_) => NodeType::Boolean,
        Value::Number(_) => NodeType::Number,
        Value::String(_) => NodeType::String,
        Value::Array(_) => NodeType::Array,
        Value::Object(_) => NodeType::Object,
    }
}

/// Validates `tree` as an instance of `schema`, recursing into nested
/// object schemas. Returns `Ok(())` iff every descriptor constraint is
/// satisfied; otherwise a [`SchemaViolation`] carrying every error found.
pub fn validate(tree: &VirtualTree, schema: &SchemaInterface) -> Result<(), SchemaViolation> {
    let mut errors = Vec::new();
    validate_into(tree, schema, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(SchemaViolation { errors })
    }
}

fn validate_into(tree: &VirtualTree, schema: &SchemaInterface, errors: &mut Vec<ValidationError>) {
    for descriptor in &schema.properties {
        let child = tree.member(&descriptor.json_name);
        check_value(&child, &descriptor.constraints, errors);
        if !child.exists() {
            continue;
        }
        match &descriptor.result_type {
            ResultType::Object(nested) => validate_into(&child, nested, errors),
            ResultType::Collection(tag, element) => {
                validate_collection(&child, tag, element, errors)
            }
            ResultType::Primitive(_) => {}
        }
    }

    if tree.get_type().is_ok_and(|t| t == NodeType::Object) {
        if let Ok(size) = tree.size() {
            if let Some(min) = schema.min_properties {
                if size < min {
                    errors.push(ValidationError {
                        rule: "MIN_PROPERTIES".to_string(),
                        path: tree.path().canonical(),
                        value: None,
                        message: format!("{size} properties is below minimum {min}"),
                    });
                }
            }
            if let Some(max) = schema.max_properties {
                if size > max {
                    errors.push(ValidationError {
                        rule: "MAX_PROPERTIES".to_string(),
                        path: tree.path().canonical(),
                        value: None,
                        message: format!("{size} properties exceeds maximum {max}"),
                    });
                }
            }
        }
        for (trigger, dependents) in &schema.dependent_required {
            if tree.member(trigger).exists() {
                for dependent in dependents {
                    if !tree.member(dependent).exists() {
                        errors.push(ValidationError {
                            rule: "DEPENDENT_REQUIRED".to_string(),
                            path: tree.path().canonical(),
                            value: None,
                            message: format!(
                                "property \"{trigger}\" requires \"{dependent}\" to also be present"
                            ),
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::schema::{AllowedType, PropertyDescriptorBuilder};
    use crate::tree::TypeTag;

    fn name_age_schema() -> SchemaInterface {
        SchemaInterface::new(vec![
            PropertyDescriptorBuilder::from_accessor_name(
                "name",
                ResultType::Primitive(TypeTag::string()),
            )
            .allowed_types(vec![AllowedType::String])
            .min_length(1)
            .build(),
            PropertyDescriptorBuilder::from_accessor_name(
                "age",
                ResultType::Primitive(TypeTag::int64()),
            )
            .allowed_types(vec![AllowedType::Number])
            .minimum(0.0)
            .required(Requiredness::Yes)
            .build(),
        ])
    }

    #[test]
    fn reports_min_length_and_minimum_but_not_required() {
        let doc = Document::parse(r#"{"name": "", "age": -1}"#).unwrap();
        let tree = VirtualTree::root(doc);
        let err = validate(&tree, &name_age_schema()).unwrap_err();
        let rules: Vec<&str> = err.errors.iter().map(|e| e.rule.as_str()).collect();
        assert_eq!(err.errors.len(), 2);
        assert!(rules.contains(&"MIN_LENGTH"));
        assert!(rules.contains(&"MINIMUM"));
        assert!(!rules.contains(&"REQUIRED"));
    }

    #[test]
    fn missing_required_property_reports_required() {
        let doc = Document::parse(r#"{"name": "ok"}"#).unwrap();
        let tree = VirtualTree::root(doc);
        let err = validate(&tree, &name_age_schema()).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].rule, "REQUIRED");
    }

    #[test]
    fn valid_document_produces_no_errors() {
        let doc = Document::parse(r#"{"name": "ada", "age": 30}"#).unwrap();
        let tree = VirtualTree::root(doc);
        assert!(validate(&tree, &name_age_schema()).is_ok());
    }

    #[test]
    fn recurses_into_nested_object_schema() {
        let nested = SchemaInterface::new(vec![PropertyDescriptorBuilder::from_accessor_name(
            "city",
            ResultType::Primitive(TypeTag::string()),
        )
        .allowed_types(vec![AllowedType::String])
        .min_length(1)
        .build()]);
        let outer = SchemaInterface::new(vec![PropertyDescriptorBuilder::from_accessor_name(
            "address",
            ResultType::Object(std::sync::Arc::new(nested)),
        )
        .build()]);

        let doc = Document::parse(r#"{"address": {"city": ""}}"#).unwrap();
        let tree = VirtualTree::root(doc);
        let err = validate(&tree, &outer).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].path, ".address.city");
    }

    #[test]
    fn recurses_into_list_element_constraints() {
        use crate::schema::ElementSpec;

        let element = ElementSpec::with_constraints(
            ResultType::Primitive(TypeTag::string()),
            Constraints {
                allowed_types: Some(vec![AllowedType::String]),
                min_length: Some(2),
                ..Default::default()
            },
        );
        let schema = SchemaInterface::new(vec![PropertyDescriptorBuilder::from_accessor_name(
            "tags",
            ResultType::Collection(TypeTag::list(), Box::new(element)),
        )
        .build()]);

        let doc = Document::parse(r#"{"tags": ["ok", "x", "fine"]}"#).unwrap();
        let tree = VirtualTree::root(doc);
        let err = validate(&tree, &schema).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].path, ".tags[1]");
        assert_eq!(err.errors[0].rule, "MIN_LENGTH");
    }

    #[test]
    fn recurses_into_multimap_element_constraints() {
        use crate::schema::ElementSpec;

        let element = ElementSpec::with_constraints(
            ResultType::Primitive(TypeTag::int64()),
            Constraints {
                allowed_types: Some(vec![AllowedType::Number]),
                minimum: Some(0.0),
                ..Default::default()
            },
        );
        let schema = SchemaInterface::new(vec![PropertyDescriptorBuilder::from_accessor_name(
            "scores",
            ResultType::Collection(TypeTag::multimap(), Box::new(element)),
        )
        .build()]);

        let doc = Document::parse(r#"{"scores": {"alice": [1, -2], "bob": [3]}}"#).unwrap();
        let tree = VirtualTree::root(doc);
        let err = validate(&tree, &schema).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].path, ".scores.alice[1]");
    }
}
