//! Field kinds and their filter-value grammars.
//!
//! | Kind     | Strict                        | Extended                                         |
//! |----------|-------------------------------|--------------------------------------------------|
//! | `date`   | `YYYY-MM-DD` digit grouping   | optional operator + `YYYY-MM-DD`, or `""`         |
//! | `number` | any JSON number               | optional operator + 1-15 digits, or `""`          |
//! | `text`   | any string                    | any string                                       |
//!
//! Operators are `<`, `>`, `<=`, `>=`, `=` and `!=`. The extended date grammar bounds
//! months to 01-12 and days to 01-31 without checking the calendar, so `2022-02-31`
//! is accepted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::SchemaNode;

// Digits are spelled `[0-9]`: `\d` would also admit non-ASCII decimal digits.

/// Original date grammar: four digits, dash, two digits, dash, two digits.
pub const STRICT_DATE_PATTERN: &str = r"^[0-9]{4}-[0-1][0-9]-[0-3][0-9]$";

pub const EXTENDED_DATE_PATTERN: &str =
    r"^((<=|>=|!=|<|>|=)?[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01]))?$";

pub const EXTENDED_NUMBER_PATTERN: &str = r"^((<=|>=|!=|<|>|=)?[0-9]{1,15})?$";

/// Largest bare integer accepted by the extended number grammar (15 digits).
pub const EXTENDED_NUMBER_MAX: i64 = 999_999_999_999_999;

/// Comparison operators accepted in front of extended filter values.
pub const COMPARISON_OPERATORS: [&str; 6] = ["<", ">", "<=", ">=", "=", "!="];

/// Suffix appended to a field name to form its filter key.
pub const FILTER_SUFFIX: &str = "_filter";

/// Returns the query key under which a field's filter value is supplied.
#[inline]
pub fn filter_key(field: &str) -> String {
    format!("{field}{FILTER_SUFFIX}")
}

/// Semantic type of an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Date,
    Number,
    Text,
}

impl FieldKind {
    pub const ALL: [FieldKind; 3] = [FieldKind::Date, FieldKind::Number, FieldKind::Text];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            FieldKind::Date => "date",
            FieldKind::Number => "number",
            FieldKind::Text => "text",
        }
    }

    /// Schema node accepted for this kind's `<field>_filter` value.
    pub fn filter_node(self, dialect: Dialect) -> SchemaNode {
        match (self, dialect) {
            (FieldKind::Date, Dialect::Strict) => SchemaNode::pattern(STRICT_DATE_PATTERN),
            (FieldKind::Date, Dialect::Extended) => SchemaNode::pattern(EXTENDED_DATE_PATTERN),
            (FieldKind::Number, Dialect::Strict) => SchemaNode::number(),
            (FieldKind::Number, Dialect::Extended) => SchemaNode::union([
                SchemaNode::pattern(EXTENDED_NUMBER_PATTERN),
                SchemaNode::integer(Some(0), Some(EXTENDED_NUMBER_MAX)),
            ]),
            (FieldKind::Text, _) => SchemaNode::string(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown field kind '{0}' (expected one of: date, number, text)")]
pub struct ParseFieldKindError(pub String);

impl FromStr for FieldKind {
    type Err = ParseFieldKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date" => Ok(FieldKind::Date),
            "number" => Ok(FieldKind::Number),
            "text" => Ok(FieldKind::Text),
            other => Err(ParseFieldKindError(other.to_string())),
        }
    }
}

/// Grammar family used when deriving query schemas.
///
/// `Strict` reproduces the plain grammars with sorting and filtering only.
/// `Extended` adds operator-prefixed filters plus `text_query`, `page`, `count`
/// and `columns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Strict,
    #[default]
    Extended,
}

impl Dialect {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Dialect::Strict => "strict",
            Dialect::Extended => "extended",
        }
    }

    #[inline]
    pub const fn has_paging(self) -> bool {
        matches!(self, Dialect::Extended)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested ordering of a list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub const ALL: [SortDirection; 2] = [SortDirection::Asc, SortDirection::Desc];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Page sizes a caller may request through `count`.
pub const PAGE_SIZES: [u64; 3] = [20, 100, 500];

/// Lowest page number accepted through `page`.
pub const FIRST_PAGE: i64 = 1;
