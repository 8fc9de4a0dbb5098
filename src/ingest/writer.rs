use rusqlite::Connection;
use serde_json::Value;
use std::path::Path;

use super::validate::open_reader;
use crate::error::{CatalogError, Result};
use crate::schema::ColumnMapping;
use crate::store::{create_instance, EntityId, Instance, Payload};

/// One Instance per (row, target AbstractModel), in row order.
///
/// Cell text is copied verbatim into the attribute payload; a row shorter than
/// the header yields `null` for its missing cells. All inserts share one
/// transaction, so an unreadable row or a store failure leaves nothing behind.
pub fn create_instances(conn: &mut Connection, csv_path: &Path, mapping: &ColumnMapping) -> Result<Vec<Instance>> {
    let mut reader = open_reader(csv_path)?;
    let headers = reader.headers()?.clone();

    // Later duplicate header names win, matching dict-per-row readers.
    let mut targets: Vec<(EntityId, Vec<(String, usize)>)> = Vec::new();
    for (abm_id, columns) in mapping.targets() {
        let indexed = columns
            .into_iter()
            .map(|column| {
                let index = headers
                    .iter()
                    .enumerate()
                    .filter(|(_, h)| *h == column.as_str())
                    .map(|(i, _)| i)
                    .last()
                    .ok_or_else(|| {
                        CatalogError::InvalidInput(format!("column {} missing from csv header", column))
                    })?;
                Ok((column, index))
            })
            .collect::<Result<Vec<_>>>()?;
        targets.push((abm_id, indexed));
    }

    let tx = conn.transaction()?;
    let mut created = Vec::new();
    let no_measures = Payload::new();

    for record in reader.records() {
        let record = record?;
        for (abm_id, columns) in &targets {
            let attribute: Payload = columns
                .iter()
                .map(|(column, index)| {
                    let value = record
                        .get(*index)
                        .map(|cell| Value::String(cell.to_string()))
                        .unwrap_or(Value::Null);
                    (column.clone(), value)
                })
                .collect();
            created.push(create_instance(&tx, *abm_id, &attribute, &no_measures)?);
        }
    }

    tx.commit()?;
    Ok(created)
}
