use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use comfy_table::{Cell, Table};
use querygate::Evaluation;
use querygate::derive::{COLUMNS, COUNT, PAGE};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::context::RegistryContext;
use crate::output::{OutputFormat, OutputManager, TableDisplay};

pub const EXAMPLES: &str = r#"Examples:
  querygate check foo sort_by=date1 sort_direction=desc date1_filter='>=2022-03-25'
  querygate check foo sort_by=text1 sort_direction=asc page=2 count=100 columns=text1,date1
  querygate check foo --json '{"sort_by":"date1","sort_direction":"des"}'
  querygate check foo --file query.json --output json"#;

#[derive(Args)]
pub struct CheckArgs {
    /// Entity name
    entity: String,

    /// Query object as inline JSON
    #[arg(long, conflicts_with_all = ["file", "params"])]
    json: Option<String>,

    /// Read the query object from a JSON file
    #[arg(long, conflicts_with = "params")]
    file: Option<PathBuf>,

    /// Query parameters as key=value pairs
    params: Vec<String>,
}

#[derive(Serialize)]
struct CheckReport {
    entity: String,
    #[serde(flatten)]
    evaluation: Evaluation,
}

impl TableDisplay for CheckReport {
    fn to_table(&self, manager: &OutputManager) -> Table {
        let mut table = manager.create_table(&["Path", "Code", "Message"]);
        for issue in &self.evaluation.issues {
            let path = if issue.path.is_empty() { "(root)" } else { issue.path.as_str() };
            table.add_row(vec![Cell::new(path), Cell::new(&issue.code), Cell::new(&issue.message)]);
        }
        table
    }

    fn to_compact(&self) -> String {
        if self.evaluation.valid {
            format!("{}: valid", self.entity)
        } else {
            let issues: Vec<String> = self.evaluation.issues.iter().map(|i| i.to_string()).collect();
            format!("{}: invalid: {}", self.entity, issues.join("; "))
        }
    }
}

/// Evaluates the query and reports the outcome. Returns whether the query was accepted.
pub fn handle_check(ctx: &RegistryContext, args: CheckArgs, output: &OutputManager) -> Result<bool> {
    let query = if let Some(raw) = &args.json {
        serde_json::from_str(raw).context("Failed to parse --json query object")?
    } else if let Some(path) = &args.file {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read query file {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse query file {}", path.display()))?
    } else {
        parse_params(&args.params)?
    };
    output.verbose(&format!("query object: {query}"));

    let evaluation = ctx.validators.evaluate(&args.entity, &query)?;
    let valid = evaluation.valid;
    let report = CheckReport {
        entity: args.entity,
        evaluation,
    };

    if output.is_json() || output.options.output_format == OutputFormat::Compact {
        output.display(&report)?;
        return Ok(valid);
    }

    if valid {
        output.success(&format!("Query is valid for '{}'", report.entity));
    } else {
        output.error(&format!(
            "Query is invalid for '{}' ({} issue(s))",
            report.entity,
            report.evaluation.issues.len()
        ));
        output.display(&report)?;
        for issue in &report.evaluation.issues {
            if issue.code == "required" {
                output.bullet(&format!("add {}", issue.path.trim_start_matches('/')));
            }
        }
        output.info("Run 'querygate schema <entity>' to see accepted values.");
    }

    Ok(valid)
}

/// Decode `key=value` parameters into a query object.
///
/// `page` and `count` become integers when they parse as one, `columns` is split
/// on commas (and accumulates across repeats), every other value stays a string.
/// Values that fail to decode are kept as strings so the validator reports them.
fn parse_params(params: &[String]) -> Result<Value> {
    let mut query = Map::new();
    for param in params {
        let Some((key, value)) = param.split_once('=') else {
            bail!("Invalid parameter '{param}', expected key=value");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Invalid parameter '{param}', key is empty");
        }

        let decoded = match key {
            PAGE | COUNT => value
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(value.to_string())),
            COLUMNS => {
                let mut columns = match query.remove(COLUMNS) {
                    Some(Value::Array(existing)) => existing,
                    _ => Vec::new(),
                };
                columns.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .map(|c| Value::String(c.to_string())),
                );
                Value::Array(columns)
            }
            _ => Value::String(value.to_string()),
        };
        query.insert(key.to_string(), decoded);
    }
    Ok(Value::Object(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::GlobalOptions;
    use querygate::{Dialect, QueryValidators, Registry};
    use serde_json::json;
    use std::sync::Arc;

    fn report(query: Value) -> CheckReport {
        let validators = QueryValidators::new(Arc::new(Registry::builtin()), Dialect::Extended);
        CheckReport {
            entity: "foo".to_string(),
            evaluation: validators.evaluate("foo", &query).expect("foo is registered"),
        }
    }

    fn manager(output_format: OutputFormat) -> OutputManager {
        OutputManager::new(GlobalOptions {
            output_format,
            no_color: true,
            ..Default::default()
        })
    }

    #[test]
    fn rejected_query_renders_every_issue() {
        let report = report(json!({ "sort_by": "date1", "sort_direction": "des", "page": 0 }));

        let table = manager(OutputFormat::Table).render(&report).expect("renders");
        assert!(table.contains("Path"));
        assert!(table.contains("/sort_direction"));
        assert!(table.contains("/page"));

        let compact = manager(OutputFormat::Compact).render(&report).expect("renders");
        assert!(compact.starts_with("foo: invalid: /sort_direction: "));
        assert_eq!(compact.lines().count(), 1);
    }

    #[test]
    fn json_report_flattens_the_evaluation() {
        let report = report(json!({ "sort_by": "date1", "sort_direction": "asc" }));
        let rendered = manager(OutputFormat::Json).render(&report).expect("renders");
        let parsed: Value = serde_json::from_str(&rendered).expect("valid JSON");
        assert_eq!(parsed, json!({ "entity": "foo", "valid": true, "issues": [] }));
        assert_eq!(manager(OutputFormat::Compact).render(&report).expect("renders"), "foo: valid");
    }

    fn params(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn decodes_typed_parameters() {
        let query = parse_params(&params(&[
            "sort_by=date1",
            "sort_direction=desc",
            "date1_filter=>=2022-03-25",
            "page=2",
            "count=100",
            "columns=date1, text1",
            "columns=number1",
        ]))
        .expect("parameters decode");

        assert_eq!(
            query,
            json!({
                "sort_by": "date1",
                "sort_direction": "desc",
                "date1_filter": ">=2022-03-25",
                "page": 2,
                "count": 100,
                "columns": ["date1", "text1", "number1"],
            })
        );
    }

    #[test]
    fn undecodable_numbers_stay_strings() {
        let query = parse_params(&params(&["page=first", "number1_filter=12"])).expect("parameters decode");
        assert_eq!(query, json!({ "page": "first", "number1_filter": "12" }));
    }

    #[test]
    fn rejects_malformed_parameters() {
        assert!(parse_params(&params(&["sort_by"])).is_err());
        assert!(parse_params(&params(&["=date1"])).is_err());
    }
}
