//! Compilation of schema nodes into reusable validators.
//!
//! Nodes are rendered as Draft 2020-12 JSON Schema and built with `jsonschema`.
//! The resulting [`CompiledValidator`] translates the engine's errors into
//! [`ValidationIssue`]s and restores the declaration order of object properties,
//! which the rendered document cannot carry. It holds no interior mutability and can
//! be shared across threads behind an `Arc`.

use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, Validator};
use log::debug;
use serde_json::Value;

use crate::derive::DerivedQuerySchema;
use crate::errors::{QueryError, ValidationIssue};
use crate::schema::{ObjectSchema, SchemaNode};

/// Reusable validator bound to one schema.
pub struct CompiledValidator {
    entity: Option<String>,
    /// Top-level property names in declaration order; empty when the root is not an object.
    order: Vec<String>,
    validator: Validator,
}

impl fmt::Debug for CompiledValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledValidator")
            .field("entity", &self.entity)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// Compile a derived query schema.
pub fn compile(schema: &DerivedQuerySchema) -> Result<CompiledValidator, QueryError> {
    let started = Instant::now();
    check_object(schema.root(), "")?;
    let validator = build(&schema.to_json_schema())?;
    debug!(
        "compiled validator for '{}' in {:?}",
        schema.entity(),
        started.elapsed()
    );
    Ok(CompiledValidator {
        entity: Some(schema.entity().to_string()),
        order: declared_order(schema.root()),
        validator,
    })
}

/// Compile an arbitrary schema node.
pub fn compile_node(node: &SchemaNode) -> Result<CompiledValidator, QueryError> {
    check_node(node, "")?;
    let order = match node {
        SchemaNode::Object(object) => declared_order(object),
        _ => Vec::new(),
    };
    Ok(CompiledValidator {
        entity: None,
        order,
        validator: build(&node.to_json_schema())?,
    })
}

fn build(document: &Value) -> Result<Validator, QueryError> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(document)
        .map_err(|err| QueryError::SchemaCompilation {
            path: err.instance_path.to_string(),
            message: err.to_string(),
        })
}

fn declared_order(object: &ObjectSchema) -> Vec<String> {
    object.properties.iter().map(|p| p.name.clone()).collect()
}

// Rejects trees whose JSON Schema rendering would be lossy or unsatisfiable.
fn check_node(node: &SchemaNode, path: &str) -> Result<(), QueryError> {
    match node {
        SchemaNode::Integer {
            minimum: Some(min),
            maximum: Some(max),
        } if min > max => Err(QueryError::SchemaCompilation {
            path: path.to_string(),
            message: format!("integer minimum {min} exceeds maximum {max}"),
        }),
        SchemaNode::Union(variants) if variants.is_empty() => Err(QueryError::SchemaCompilation {
            path: path.to_string(),
            message: "union has no variants".to_string(),
        }),
        SchemaNode::Union(variants) => variants
            .iter()
            .enumerate()
            .try_for_each(|(i, variant)| check_node(variant, &format!("{path}/anyOf/{i}"))),
        SchemaNode::Array(items) => check_node(items, &format!("{path}/items")),
        SchemaNode::Object(object) => check_object(object, path),
        _ => Ok(()),
    }
}

fn check_object(object: &ObjectSchema, path: &str) -> Result<(), QueryError> {
    let mut seen = HashSet::with_capacity(object.len());
    for property in &object.properties {
        let property_path = format!("{path}/properties/{}", escape_pointer(&property.name));
        if !seen.insert(property.name.as_str()) {
            return Err(QueryError::SchemaCompilation {
                path: property_path,
                message: format!("duplicate property '{}'", property.name),
            });
        }
        check_node(&property.node, &property_path)?;
    }
    Ok(())
}

impl CompiledValidator {
    /// Entity the validator was compiled for, if it came from a derived schema.
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Returns `true` when the value satisfies the schema.
    pub fn check(&self, value: &Value) -> bool {
        self.validator.is_valid(value)
    }

    /// Every violated constraint, in schema declaration order.
    ///
    /// Issues on declared properties follow the property order, issues on the value
    /// itself come first, and unknown keys of a closed object come last sorted by key.
    pub fn errors(&self, value: &Value) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for error in self.validator.iter_errors(value) {
            let path = error.instance_path.to_string();
            match &error.kind {
                ValidationErrorKind::Required { property } => {
                    let name = property.as_str().map_or_else(|| property.to_string(), str::to_string);
                    issues.push(ValidationIssue::new(
                        format!("{path}/{}", escape_pointer(&name)),
                        "required",
                        error.to_string(),
                    ));
                }
                ValidationErrorKind::AdditionalProperties { unexpected } => {
                    for key in unexpected {
                        issues.push(ValidationIssue::new(
                            format!("{path}/{}", escape_pointer(key)),
                            "unknown_property",
                            format!("Unexpected property '{key}'"),
                        ));
                    }
                }
                kind => issues.push(ValidationIssue::new(path, issue_code(kind), error.to_string())),
            }
        }
        if !self.order.is_empty() {
            issues.sort_by_key(|issue| self.rank(&issue.path));
        }
        issues
    }

    // Stable sort key: (0) the value itself, (1, i) declared property i, (2, key) unknown key.
    fn rank(&self, path: &str) -> (u8, usize, String) {
        let Some(rest) = path.strip_prefix('/') else {
            return (0, 0, String::new());
        };
        let segment = unescape_pointer(rest.split('/').next().unwrap_or_default());
        match self.order.iter().position(|name| *name == segment) {
            Some(index) => (1, index, String::new()),
            None => (2, 0, segment),
        }
    }
}

fn issue_code(kind: &ValidationErrorKind) -> &'static str {
    match kind {
        ValidationErrorKind::Type { .. } => "type",
        ValidationErrorKind::Pattern { .. } => "pattern",
        ValidationErrorKind::Minimum { .. } => "minimum",
        ValidationErrorKind::Maximum { .. } => "maximum",
        ValidationErrorKind::Constant { .. } => "const",
        ValidationErrorKind::Enum { .. } | ValidationErrorKind::AnyOf { .. } => "union",
        _ => "schema",
    }
}

/// Escape a key for use as a JSON pointer segment.
fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape_pointer(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invalid_pattern_fails_compilation() {
        let object = ObjectSchema::new().optional("a_filter", SchemaNode::pattern("(unclosed"));
        let err = compile_node(&SchemaNode::Object(object)).expect_err("bad regex");
        assert!(matches!(err, QueryError::SchemaCompilation { .. }));
    }

    #[test]
    fn empty_union_fails_compilation() {
        let err = compile_node(&SchemaNode::union([])).expect_err("empty union");
        assert!(matches!(err, QueryError::SchemaCompilation { message, .. } if message.contains("no variants")));
    }

    #[test]
    fn duplicate_property_fails_compilation() {
        let object = ObjectSchema::new()
            .optional("a", SchemaNode::string())
            .optional("a", SchemaNode::number());
        let err = compile_node(&SchemaNode::Object(object)).expect_err("duplicate property");
        assert!(
            matches!(err, QueryError::SchemaCompilation { path, message } if path == "/properties/a" && message.contains("duplicate"))
        );
    }

    #[test]
    fn inverted_integer_bounds_fail_compilation() {
        let err = compile_node(&SchemaNode::integer(Some(5), Some(1))).expect_err("min > max");
        assert!(matches!(err, QueryError::SchemaCompilation { .. }));
    }

    #[test]
    fn integer_bounds_are_reported() {
        let validator = compile_node(&SchemaNode::integer(Some(1), None)).expect("compiles");
        assert!(validator.check(&json!(1)));
        assert!(!validator.check(&json!(2.5)));
        assert!(!validator.check(&json!("2")));
        assert_eq!(validator.errors(&json!(0))[0].code, "minimum");
        assert_eq!(validator.errors(&json!("2"))[0].code, "type");
    }

    #[test]
    fn literal_unions_accept_listed_values() {
        let validator = compile_node(&SchemaNode::literal_union([20u64, 100, 500])).expect("compiles");
        assert!(validator.check(&json!(20)));
        assert!(!validator.check(&json!(21)));
        assert!(!validator.check(&json!("20")));
        assert_eq!(validator.errors(&json!(21))[0].code, "union");
    }

    #[test]
    fn array_errors_point_at_elements() {
        let validator = compile_node(&SchemaNode::array(SchemaNode::literal_union(["a", "b"]))).expect("compiles");
        let issues = validator.errors(&json!(["a", "x", "b", "y"]));
        let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["/1", "/3"]);
        assert!(!validator.check(&json!("a")));
    }

    #[test]
    fn issues_follow_declaration_order() {
        let object = ObjectSchema::new()
            .required("zulu", SchemaNode::string())
            .required("alpha", SchemaNode::string())
            .optional("mike", SchemaNode::number());
        let validator = compile_node(&SchemaNode::Object(object)).expect("compiles");
        let issues = validator.errors(&json!({ "mike": "x" }));
        let codes: Vec<(&str, &str)> = issues.iter().map(|i| (i.path.as_str(), i.code.as_str())).collect();
        assert_eq!(
            codes,
            vec![("/zulu", "required"), ("/alpha", "required"), ("/mike", "type")]
        );
    }

    #[test]
    fn closed_object_reports_unknown_keys_last() {
        let object = ObjectSchema::new()
            .required("a", SchemaNode::string())
            .with_additional_properties(false);
        let validator = compile_node(&SchemaNode::Object(object)).expect("compiles");
        let issues = validator.errors(&json!({ "zeta": 1, "alpha": 2 }));
        let codes: Vec<(&str, &str)> = issues.iter().map(|i| (i.path.as_str(), i.code.as_str())).collect();
        assert_eq!(
            codes,
            vec![
                ("/a", "required"),
                ("/alpha", "unknown_property"),
                ("/zeta", "unknown_property"),
            ]
        );
    }

    #[test]
    fn non_object_root_is_a_single_type_issue() {
        let object = ObjectSchema::new().required("a", SchemaNode::string());
        let validator = compile_node(&SchemaNode::Object(object)).expect("compiles");
        let issues = validator.errors(&json!(null));
        assert_eq!(issues.len(), 1);
        assert_eq!((issues[0].path.as_str(), issues[0].code.as_str()), ("", "type"));
    }

    #[test]
    fn required_pointer_segments_are_escaped() {
        let object = ObjectSchema::new().required("a/b~c", SchemaNode::string());
        let validator = compile_node(&SchemaNode::Object(object)).expect("compiles");
        assert_eq!(validator.errors(&json!({}))[0].path, "/a~1b~0c");
    }

    #[test]
    fn validator_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledValidator>();
    }
}
