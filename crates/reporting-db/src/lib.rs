//! Access to the reporting database: flavor detection, catalog listings,
//! the structured-query compiler and the report executor.
//!
//! Everything here is handed an already-established [`sqlx::PgPool`]; pool
//! construction and caching is the session layer's business.

pub mod catalog;
pub mod error;
pub mod flavor;
pub mod query;
pub mod report;
pub mod rows;

pub use catalog::{ColumnEntry, TableEntry, list_columns, list_tables};
pub use error::DbError;
pub use flavor::{DbFlavor, probe_flavor};
pub use query::{ColumnFilter, JsonQuery, OrderSpec, TableQuery, build_sql};
pub use report::{ReportRequest, ReportResponse, run_report};
pub use rows::rows_to_maps;
