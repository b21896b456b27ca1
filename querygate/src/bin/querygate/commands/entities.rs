use anyhow::Result;
use comfy_table::{Cell, Table};
use querygate::{FieldKind, filter_key};
use serde::Serialize;

use crate::context::RegistryContext;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &str = "\
Examples:
  querygate entities                           # Built-in sample registry
  querygate entities --registry entities.toml  # Entities from a registry file
  querygate entities --output json             # Machine-readable listing";

#[derive(Serialize)]
struct EntityListing {
    entities: Vec<EntityRow>,
}

#[derive(Serialize)]
struct EntityRow {
    name: String,
    fields: Vec<FieldRow>,
}

#[derive(Serialize)]
struct FieldRow {
    name: String,
    display: String,
    kind: FieldKind,
    filter_key: String,
}

impl TableDisplay for EntityListing {
    fn to_table(&self, manager: &OutputManager) -> Table {
        let mut table = manager.create_table(&["Entity", "Field", "Display", "Kind", "Filter key"]);
        for entity in &self.entities {
            for (index, field) in entity.fields.iter().enumerate() {
                let owner = if index == 0 { entity.name.as_str() } else { "" };
                table.add_row(vec![
                    Cell::new(owner),
                    Cell::new(&field.name),
                    Cell::new(&field.display),
                    Cell::new(field.kind.as_str()),
                    Cell::new(&field.filter_key),
                ]);
            }
        }
        table
    }

    fn to_compact(&self) -> String {
        self.entities
            .iter()
            .map(|entity| {
                let fields: Vec<String> = entity
                    .fields
                    .iter()
                    .map(|f| format!("{}:{}", f.name, f.kind))
                    .collect();
                format!("{}({})", entity.name, fields.join(","))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn handle_entities(ctx: &RegistryContext, output: &OutputManager) -> Result<()> {
    let registry = ctx.registry();
    if registry.is_empty() {
        output.warning(&format!("No entities registered in {}", ctx.source_label()));
        return Ok(());
    }

    let listing = EntityListing {
        entities: registry
            .iter()
            .map(|entity| EntityRow {
                name: entity.name().to_string(),
                fields: entity
                    .fields()
                    .map(|(name, descriptor)| FieldRow {
                        name: name.to_string(),
                        display: descriptor.display.clone(),
                        kind: descriptor.kind,
                        filter_key: filter_key(name),
                    })
                    .collect(),
            })
            .collect(),
    };

    if !output.is_json() {
        output.heading(&format!("Entities ({})", ctx.source_label()));
    }
    output.display(&listing)
}
