//! Structural schema nodes.
//!
//! A [`SchemaNode`] tree describes which JSON values are accepted. Trees are built by
//! the deriver and rendered as JSON Schema, which [`crate::compile`] hands to
//! `jsonschema`.

use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// Any string, optionally required to match a regular expression.
    String { pattern: Option<String> },
    /// Any JSON number.
    Number,
    /// An integral JSON number within optional inclusive bounds.
    Integer { minimum: Option<i64>, maximum: Option<i64> },
    /// Exactly this value.
    Literal(Value),
    /// At least one variant must accept the value.
    Union(Vec<SchemaNode>),
    /// An array whose every element matches the item node.
    Array(Box<SchemaNode>),
    Object(ObjectSchema),
}

impl SchemaNode {
    #[inline]
    pub fn string() -> Self {
        Self::String { pattern: None }
    }

    #[inline]
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::String {
            pattern: Some(pattern.into()),
        }
    }

    #[inline]
    pub fn number() -> Self {
        Self::Number
    }

    #[inline]
    pub fn integer(minimum: Option<i64>, maximum: Option<i64>) -> Self {
        Self::Integer { minimum, maximum }
    }

    #[inline]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    #[inline]
    pub fn union(variants: impl IntoIterator<Item = SchemaNode>) -> Self {
        Self::Union(variants.into_iter().collect())
    }

    /// Union of literal values, in the given order.
    pub fn literal_union<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::Union(values.into_iter().map(Self::literal).collect())
    }

    #[inline]
    pub fn array(items: SchemaNode) -> Self {
        Self::Array(Box::new(items))
    }

    /// Short human description of the accepted values.
    pub fn describe(&self) -> String {
        match self {
            Self::String { pattern: None } => "string".to_string(),
            Self::String { pattern: Some(p) } => format!("string matching '{p}'"),
            Self::Number => "number".to_string(),
            Self::Integer { minimum, maximum } => match (minimum, maximum) {
                (Some(min), Some(max)) => format!("integer between {min} and {max}"),
                (Some(min), None) => format!("integer greater or equal to {min}"),
                (None, Some(max)) => format!("integer less or equal to {max}"),
                (None, None) => "integer".to_string(),
            },
            Self::Literal(value) => value.to_string(),
            Self::Union(variants) => {
                let parts: Vec<String> = variants.iter().map(|v| v.describe()).collect();
                format!("one of {}", parts.join(" | "))
            }
            Self::Array(items) => format!("array of {}", items.describe()),
            Self::Object(_) => "object".to_string(),
        }
    }

    /// Render the node as a JSON Schema document fragment.
    pub fn to_json_schema(&self) -> Value {
        match self {
            Self::String { pattern: None } => json!({ "type": "string" }),
            Self::String { pattern: Some(p) } => json!({ "type": "string", "pattern": p }),
            Self::Number => json!({ "type": "number" }),
            Self::Integer { minimum, maximum } => {
                let mut out = Map::new();
                out.insert("type".to_string(), json!("integer"));
                if let Some(min) = minimum {
                    out.insert("minimum".to_string(), json!(min));
                }
                if let Some(max) = maximum {
                    out.insert("maximum".to_string(), json!(max));
                }
                Value::Object(out)
            }
            Self::Literal(value) => json!({ "const": value }),
            Self::Union(variants) => {
                let literals: Option<Vec<&Value>> = variants
                    .iter()
                    .map(|v| match v {
                        Self::Literal(value) => Some(value),
                        _ => None,
                    })
                    .collect();
                match literals {
                    Some(values) if !values.is_empty() => json!({ "enum": values }),
                    _ => json!({ "anyOf": variants.iter().map(|v| v.to_json_schema()).collect::<Vec<_>>() }),
                }
            }
            Self::Array(items) => json!({ "type": "array", "items": items.to_json_schema() }),
            Self::Object(object) => object.to_json_schema(),
        }
    }
}

/// An object node with ordered properties.
///
/// Property order is the order in which issues are reported.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    pub properties: Vec<Property>,
    /// When `false`, keys not listed in `properties` are rejected.
    pub additional_properties: bool,
}

impl Default for ObjectSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self {
            properties: Vec::new(),
            additional_properties: true,
        }
    }

    #[inline]
    pub fn required(mut self, name: impl Into<String>, node: SchemaNode) -> Self {
        self.push(name, node, true);
        self
    }

    #[inline]
    pub fn optional(mut self, name: impl Into<String>, node: SchemaNode) -> Self {
        self.push(name, node, false);
        self
    }

    #[inline]
    pub fn with_additional_properties(mut self, allowed: bool) -> Self {
        self.additional_properties = allowed;
        self
    }

    pub fn push(&mut self, name: impl Into<String>, node: SchemaNode, required: bool) {
        self.properties.push(Property {
            name: name.into(),
            node,
            required,
        });
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for property in &self.properties {
            properties.insert(property.name.clone(), property.node.to_json_schema());
            if property.required {
                required.push(Value::String(property.name.clone()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": self.additional_properties,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub node: SchemaNode,
    pub required: bool,
}
