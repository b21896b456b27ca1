//! Evaluation of query objects against compiled validators.

use log::trace;
use serde::Serialize;
use serde_json::Value;

use crate::compile::CompiledValidator;
use crate::errors::{ValidationError, ValidationIssue, ValidationResult};

/// Outcome of evaluating one query object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl Evaluation {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Convert into a `Result` so callers can propagate rejected queries with `?`.
    pub fn into_result(self) -> ValidationResult<()> {
        if self.valid {
            Ok(())
        } else {
            Err(ValidationError::new(self.issues))
        }
    }
}

/// Evaluate a query object, collecting every violation.
pub fn evaluate(validator: &CompiledValidator, query: &Value) -> Evaluation {
    let issues = validator.errors(query);
    let valid = issues.is_empty();
    trace!(
        "evaluated query for '{}': valid={valid}, issues={}",
        validator.entity().unwrap_or("<node>"),
        issues.len()
    );
    Evaluation { valid, issues }
}

/// Returns `true` when the query object is accepted.
#[inline]
pub fn check(validator: &CompiledValidator, query: &Value) -> bool {
    validator.check(query)
}

/// Every violation of the query object, in schema declaration order.
#[inline]
pub fn collect_errors(validator: &CompiledValidator, query: &Value) -> Vec<ValidationIssue> {
    validator.errors(query)
}
