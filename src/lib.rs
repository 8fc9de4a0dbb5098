pub mod config;
pub mod error;
pub mod db;
pub mod store;
pub mod graph;
pub mod schema;
pub mod ingest;

pub use config::Config;
pub use error::{CatalogError, Field, FieldErrors, Result, ValidationError};
pub use graph::derive_endpoints;
pub use ingest::{ingest_upload, UploadedFile};
pub use schema::{build_abstract_model, AbstractModelRequest, ColumnMapping, MappingResolver};
