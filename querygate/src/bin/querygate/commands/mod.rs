pub mod check;
pub mod entities;
pub mod schema;
