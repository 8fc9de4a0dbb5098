//! Resolves the user's `{column: abstract model id}` mapping text against the store.

use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{CatalogError, Field, FieldErrors, Result, ValidationError};
use crate::store::{abstract_model_exists, EntityId};

/// A validated mapping of CSV column name to an existing AbstractModel id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    columns: BTreeMap<String, EntityId>,
}

impl ColumnMapping {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<EntityId> {
        self.columns.get(column).copied()
    }

    /// Mapped column names
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Column names grouped by the AbstractModel they feed
    pub fn targets(&self) -> BTreeMap<EntityId, Vec<String>> {
        let mut targets: BTreeMap<EntityId, Vec<String>> = BTreeMap::new();
        for (column, abm_id) in &self.columns {
            targets.entry(*abm_id).or_default().push(column.clone());
        }
        targets
    }
}

/// Holds the most recent successfully resolved mapping.
///
/// A failed resolution clears the held mapping; there is never a partially
/// resolved state.
#[derive(Debug, Default)]
pub struct MappingResolver {
    resolved: Option<ColumnMapping>,
}

impl MappingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mapping(&self) -> Option<&ColumnMapping> {
        self.resolved.as_ref()
    }

    /// Parse `text` and check every referenced AbstractModel exists.
    ///
    /// Validation failures come back as `CatalogError::Validation` on the mapping
    /// field; store failures propagate as-is.
    pub fn resolve(&mut self, conn: &Connection, text: &str) -> Result<&ColumnMapping> {
        self.resolved = None;

        let mapping = match resolve_mapping(conn, text)? {
            Ok(mapping) => mapping,
            Err(error) => {
                let mut errors = FieldErrors::new();
                errors.add(Field::Mapping, error);
                return Err(CatalogError::Validation(errors));
            }
        };

        log::debug!("Resolved mapping of {} column(s)", mapping.len());
        Ok(&*self.resolved.insert(mapping))
    }
}

/// Ids are JSON integers or strings holding an integer.
fn parse_id(value: &Value) -> Option<EntityId> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn resolve_mapping(
    conn: &Connection,
    text: &str,
) -> Result<std::result::Result<ColumnMapping, ValidationError>> {
    if text.trim().is_empty() {
        return Ok(Err(ValidationError::Required));
    }

    let parsed: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => return Ok(Err(ValidationError::MalformedMapping(e.to_string()))),
    };

    let Value::Object(entries) = parsed else {
        return Ok(Err(ValidationError::MalformedMapping(
            "Expected a JSON object mapping column names to AbstractModel ids.".to_string(),
        )));
    };

    let mut columns = BTreeMap::new();
    for (column, value) in entries {
        let Some(id) = parse_id(&value) else {
            return Ok(Err(ValidationError::UnknownAbstractModel));
        };
        if !abstract_model_exists(conn, id)? {
            return Ok(Err(ValidationError::UnknownAbstractModel));
        }
        columns.insert(column, id);
    }

    Ok(Ok(ColumnMapping { columns }))
}
