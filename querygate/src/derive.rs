//! Derivation of list-query schemas from entity schemas.

use log::debug;
use serde_json::Value;

use crate::catalog::{Dialect, FIRST_PAGE, FieldKind, PAGE_SIZES, SortDirection, filter_key};
use crate::errors::QueryError;
use crate::registry::EntitySchema;
use crate::schema::{ObjectSchema, SchemaNode};

pub const SORT_BY: &str = "sort_by";
pub const SORT_DIRECTION: &str = "sort_direction";
pub const TEXT_QUERY: &str = "text_query";
pub const PAGE: &str = "page";
pub const COUNT: &str = "count";
pub const COLUMNS: &str = "columns";

/// Accepted shape of list-query objects for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedQuerySchema {
    entity: String,
    dialect: Dialect,
    fields: Vec<(String, FieldKind)>,
    root: ObjectSchema,
}

impl DerivedQuerySchema {
    #[inline]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    #[inline]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[inline]
    pub fn root(&self) -> &ObjectSchema {
        &self.root
    }

    /// `<field>_filter` keys paired with the kind that selected their grammar.
    pub fn filters(&self) -> impl Iterator<Item = (String, FieldKind)> + '_ {
        self.fields.iter().map(|(name, kind)| (filter_key(name), *kind))
    }

    pub fn filter_keys(&self) -> Vec<String> {
        self.filters().map(|(key, _)| key).collect()
    }

    pub fn to_json_schema(&self) -> Value {
        let mut rendered = self.root.to_json_schema();
        if let Value::Object(map) = &mut rendered {
            map.insert("title".to_string(), Value::String(format!("{} list query", self.entity)));
        }
        rendered
    }
}

/// Build the list-query schema of one entity.
///
/// Properties are laid out as `sort_by`, `sort_direction`, one optional
/// `<field>_filter` per field in registration order, then (extended dialect)
/// `text_query`, `page`, `count` and `columns`. Fails with
/// [`QueryError::EmptyEntity`] when the entity has no fields to sort by.
pub fn derive_query_schema(entity: &EntitySchema, dialect: Dialect) -> Result<DerivedQuerySchema, QueryError> {
    if entity.is_empty() {
        return Err(QueryError::EmptyEntity {
            entity: entity.name().to_string(),
        });
    }

    let field_names = entity.field_names();
    let field_domain = SchemaNode::literal_union(field_names.iter().copied());

    let mut root = ObjectSchema::new()
        .required(SORT_BY, field_domain.clone())
        .required(
            SORT_DIRECTION,
            SchemaNode::literal_union(SortDirection::ALL.iter().map(|d| d.as_str())),
        )
        .with_additional_properties(!entity.denies_unknown_keys());

    let mut fields = Vec::with_capacity(entity.len());
    for (name, descriptor) in entity.fields() {
        root.push(filter_key(name), descriptor.kind.filter_node(dialect), false);
        fields.push((name.to_string(), descriptor.kind));
    }

    if dialect.has_paging() {
        root = root
            .optional(TEXT_QUERY, SchemaNode::string())
            .optional(PAGE, SchemaNode::integer(Some(FIRST_PAGE), None))
            .optional(COUNT, SchemaNode::literal_union(PAGE_SIZES))
            .optional(COLUMNS, SchemaNode::array(field_domain));
    }

    debug!(
        "derived {} query schema for '{}' ({} properties)",
        dialect,
        entity.name(),
        root.len()
    );

    Ok(DerivedQuerySchema {
        entity: entity.name().to_string(),
        dialect,
        fields,
        root,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EXTENDED_DATE_PATTERN, STRICT_DATE_PATTERN};
    use crate::registry::Registry;
    use serde_json::json;

    fn foo() -> EntitySchema {
        Registry::builtin().lookup("foo").expect("foo registered").clone()
    }

    fn property_names(schema: &DerivedQuerySchema) -> Vec<&str> {
        schema.root().properties.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn strict_schema_layout() {
        let schema = derive_query_schema(&foo(), Dialect::Strict).expect("derives");
        assert_eq!(
            property_names(&schema),
            vec![
                "sort_by",
                "sort_direction",
                "date1_filter",
                "text1_filter",
                "number1_filter",
                "number11_filter",
            ]
        );
        let date = schema.root().property("date1_filter").expect("date filter present");
        assert!(!date.required);
        assert_eq!(date.node, SchemaNode::pattern(STRICT_DATE_PATTERN));
        assert_eq!(
            schema.root().property("number1_filter").map(|p| &p.node),
            Some(&SchemaNode::Number)
        );
    }

    #[test]
    fn extended_schema_appends_paging_fields() {
        let schema = derive_query_schema(&foo(), Dialect::Extended).expect("derives");
        let names = property_names(&schema);
        assert_eq!(&names[names.len() - 4..], &["text_query", "page", "count", "columns"]);

        let date = schema.root().property("date1_filter").expect("date filter present");
        assert_eq!(date.node, SchemaNode::pattern(EXTENDED_DATE_PATTERN));

        let count = schema.root().property(COUNT).expect("count present");
        assert_eq!(count.node.to_json_schema(), json!({ "enum": [20, 100, 500] }));

        let columns = schema.root().property(COLUMNS).expect("columns present");
        assert_eq!(
            columns.node.to_json_schema(),
            json!({ "type": "array", "items": { "enum": ["date1", "text1", "number1", "number11"] } })
        );
    }

    #[test]
    fn sort_fields_are_required() {
        let schema = derive_query_schema(&foo(), Dialect::Extended).expect("derives");
        let required: Vec<&str> = schema
            .root()
            .properties
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(required, vec![SORT_BY, SORT_DIRECTION]);
    }

    #[test]
    fn one_filter_per_field() {
        for entity in Registry::builtin().iter() {
            for dialect in [Dialect::Strict, Dialect::Extended] {
                let schema = derive_query_schema(entity, dialect).expect("derives");
                let keys = schema.filter_keys();
                assert_eq!(keys.len(), entity.len());
                for name in entity.field_names() {
                    assert_eq!(keys.iter().filter(|k| **k == format!("{name}_filter")).count(), 1);
                }
            }
        }
    }

    #[test]
    fn derivation_is_deterministic() {
        let first = derive_query_schema(&foo(), Dialect::Extended).expect("derives");
        let second = derive_query_schema(&foo(), Dialect::Extended).expect("derives");
        assert_eq!(first, second);
    }

    #[test]
    fn empty_entity_cannot_be_derived() {
        let err = derive_query_schema(&EntitySchema::new("nothing"), Dialect::Extended).expect_err("no fields");
        assert!(matches!(err, QueryError::EmptyEntity { entity } if entity == "nothing"));
    }

    #[test]
    fn denied_unknown_keys_close_the_object() {
        let entity = foo().deny_unknown_keys(true);
        let schema = derive_query_schema(&entity, Dialect::Strict).expect("derives");
        assert!(!schema.root().additional_properties);
        assert_eq!(schema.to_json_schema()["title"], json!("foo list query"));
    }
}
