use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use querygate::{DerivedQuerySchema, derive_query_schema};
use serde::{Serialize, Serializer};

use crate::context::RegistryContext;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &str = "\
Examples:
  querygate schema foo                    # Properties accepted for foo
  querygate schema foo --output json      # JSON Schema document
  querygate schema foo --dialect strict   # Plain grammars, no paging fields";

/// Derived schema wrapper; serializes as a JSON Schema document.
struct SchemaView(DerivedQuerySchema);

impl Serialize for SchemaView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.to_json_schema().serialize(serializer)
    }
}

impl TableDisplay for SchemaView {
    fn to_table(&self, manager: &OutputManager) -> Table {
        let mut table = manager.create_table(&["Property", "Required", "Accepts"]);
        for property in &self.0.root().properties {
            table.add_row(vec![
                Cell::new(&property.name),
                Cell::new(if property.required { "yes" } else { "no" }),
                Cell::new(property.node.describe()),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        let names: Vec<String> = self
            .0
            .root()
            .properties
            .iter()
            .map(|p| if p.required { format!("{}!", p.name) } else { p.name.clone() })
            .collect();
        format!("{}: {}", self.0.entity(), names.join(" "))
    }
}

pub fn handle_schema(ctx: &RegistryContext, entity: &str, output: &OutputManager) -> Result<()> {
    let schema = ctx.registry().lookup(entity)?;
    let derived = derive_query_schema(schema, ctx.dialect())
        .with_context(|| format!("Failed to derive query schema for '{entity}'"))?;

    if !output.is_json() {
        output.heading(&format!("{entity} ({} dialect)", derived.dialect()));
    }
    output.display(&SchemaView(derived))
}
