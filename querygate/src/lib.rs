//! querygate core library.
//!
//! Derives list-query validation schemas (sorting, per-field filters, paging and
//! column selection) from a registry of typed entities, compiles them into reusable
//! validators, and evaluates untyped query objects against them.
//!
//! ```
//! use querygate::{Dialect, Registry, compile, derive_query_schema, evaluate};
//! use serde_json::json;
//!
//! let registry = Registry::builtin();
//! let foo = registry.lookup("foo").unwrap();
//! let validator = compile(&derive_query_schema(foo, Dialect::Extended).unwrap()).unwrap();
//!
//! let outcome = evaluate(&validator, &json!({
//!     "sort_by": "date1",
//!     "sort_direction": "desc",
//!     "date1_filter": ">=2022-03-25",
//!     "page": 2,
//! }));
//! assert!(outcome.valid);
//! ```

pub mod cache;
pub mod catalog;
pub mod compile;
pub mod derive;
pub mod errors;
pub mod evaluate;
pub mod registry;
pub mod schema;

pub use cache::QueryValidators;
pub use catalog::{Dialect, FieldKind, SortDirection, filter_key};
pub use compile::{CompiledValidator, compile, compile_node};
pub use derive::{DerivedQuerySchema, derive_query_schema};
pub use errors::*;
pub use evaluate::{Evaluation, check, collect_errors, evaluate};
pub use registry::{EntitySchema, FieldDescriptor, Registry};
pub use schema::{ObjectSchema, Property, SchemaNode};
