//! Schema-side operations: resolving upload mappings and building AbstractModels.

mod builder;
mod resolver;

pub use builder::{
    build_abstract_model, AbstractModelRequest, AttributeRequest, LinkRequest, MeasureRequest,
    MAX_FIELD_LEN,
};
pub use resolver::{ColumnMapping, MappingResolver};
