//! Schema entities: DataType, Item, Relationship, Attribute, Measure, AMLink and
//! AbstractModel.
//!
//! Get-or-create is an `INSERT .. ON CONFLICT DO NOTHING` followed by a lookup on the
//! same natural key, so concurrent writers racing on one name both end up with the
//! single stored row.

use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};

use super::normalize::{normalize_data_type_name, normalize_item_name};
use super::types::*;
use crate::error::{CatalogError, Result};
use crate::graph::derive_endpoints;

/// Insert unless the natural key already exists, then look the row id up.
/// Both statements bind the same parameters in the same order.
fn upsert_id(
    conn: &Connection,
    insert_sql: &str,
    select_sql: &str,
    params: &[&dyn ToSql],
) -> Result<EntityId> {
    conn.execute(insert_sql, params)?;
    let id = conn.query_row(select_sql, params, |row| row.get(0))?;
    Ok(id)
}

fn require_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CatalogError::InvalidInput(format!("{} name must not be blank", kind)));
    }
    Ok(())
}

pub fn get_or_create_data_type(conn: &Connection, name: &str) -> Result<DataType> {
    require_name("DataType", name)?;
    let name = normalize_data_type_name(name);
    let id = upsert_id(
        conn,
        "INSERT INTO data_types (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        "SELECT id FROM data_types WHERE name = ?1",
        params![name],
    )?;
    Ok(DataType { id, name })
}

pub fn get_or_create_item(conn: &Connection, name: &str) -> Result<Item> {
    require_name("Item", name)?;
    let name = normalize_item_name(name);
    let id = upsert_id(
        conn,
        "INSERT INTO items (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        "SELECT id FROM items WHERE name = ?1",
        params![name],
    )?;
    Ok(Item { id, name })
}

pub fn get_item(conn: &Connection, id: EntityId) -> Result<Item> {
    conn.query_row(
        "SELECT id, name FROM items WHERE id = ?1",
        params![id],
        |row| Ok(Item { id: row.get(0)?, name: row.get(1)? }),
    )
    .optional()?
    .ok_or_else(|| CatalogError::NotFound(format!("item {}", id)))
}

/// Persist a Relationship and link the Items its string names.
///
/// Idempotent: saving the same string again returns the stored row and leaves the
/// Item links as they were. A string without the `(X)...(Y)` shape is stored with
/// no Items.
pub fn save_relationship(conn: &Connection, relationship_str: &str) -> Result<Relationship> {
    if relationship_str.is_empty() {
        return Err(CatalogError::InvalidInput("relationship string must not be empty".to_string()));
    }

    let id = upsert_id(
        conn,
        "INSERT INTO relationships (relationship_str) VALUES (?1) \
         ON CONFLICT(relationship_str) DO NOTHING",
        "SELECT id FROM relationships WHERE relationship_str = ?1",
        params![relationship_str],
    )?;

    if let Some(endpoints) = derive_endpoints(relationship_str) {
        for name in [&endpoints.from, &endpoints.to] {
            let item = get_or_create_item(conn, name)?;
            conn.execute(
                "INSERT OR IGNORE INTO relationship_items (relationship_id, item_id) VALUES (?1, ?2)",
                params![id, item.id],
            )?;
        }
        log::debug!(
            "Relationship {} linked to items {} and {}",
            relationship_str,
            endpoints.from,
            endpoints.to
        );
    }

    Ok(Relationship {
        id,
        relationship_str: relationship_str.to_string(),
    })
}

/// Items linked to a relationship, in creation order
pub fn relationship_items(conn: &Connection, relationship_id: EntityId) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare(
        "SELECT i.id, i.name FROM relationship_items ri \
         JOIN items i ON i.id = ri.item_id \
         WHERE ri.relationship_id = ?1 ORDER BY i.id",
    )?;
    let items = stmt
        .query_map(params![relationship_id], |row| {
            Ok(Item { id: row.get(0)?, name: row.get(1)? })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(items)
}

/// Get or create an Attribute by name.
///
/// Attribute names are unique; asking for an existing name with a different
/// DataType is a `Conflict`.
pub fn get_or_create_attribute(conn: &Connection, name: &str, dtype_name: &str) -> Result<Attribute> {
    require_name("Attribute", name)?;
    let dtype = get_or_create_data_type(conn, dtype_name)?;

    conn.execute(
        "INSERT INTO attributes (name, dtype_id) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
        params![name, dtype.id],
    )?;
    let (id, stored_dtype_id): (EntityId, EntityId) = conn.query_row(
        "SELECT id, dtype_id FROM attributes WHERE name = ?1",
        params![name],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    if stored_dtype_id != dtype.id {
        return Err(CatalogError::Conflict(format!(
            "attribute {} already exists with a different data type than {}",
            name, dtype.name
        )));
    }

    Ok(Attribute {
        id,
        name: name.to_string(),
        dtype,
    })
}

pub fn get_or_create_measure(conn: &Connection, measure: &NewMeasure) -> Result<Measure> {
    require_name("Measure", &measure.name)?;
    let value_dtype = get_or_create_data_type(conn, &measure.value_dtype)?;

    let id = upsert_id(
        conn,
        "INSERT INTO measures (name, measure_type, unit_of_measurement, value_dtype_id, \
             statistic_type, measurement_reference_time, measurement_precision) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) ON CONFLICT DO NOTHING",
        "SELECT id FROM measures WHERE name = ?1 AND measure_type = ?2 \
             AND unit_of_measurement = ?3 AND value_dtype_id = ?4 AND statistic_type = ?5 \
             AND measurement_reference_time = ?6 AND measurement_precision = ?7",
        params![
            measure.name,
            measure.measure_type,
            measure.unit_of_measurement,
            value_dtype.id,
            measure.statistic_type,
            measure.measurement_reference_time,
            measure.measurement_precision,
        ],
    )?;

    Ok(Measure {
        id,
        name: measure.name.clone(),
        measure_type: measure.measure_type.clone(),
        unit_of_measurement: measure.unit_of_measurement.clone(),
        value_dtype,
        statistic_type: measure.statistic_type.clone(),
        measurement_reference_time: measure.measurement_reference_time.clone(),
        measurement_precision: measure.measurement_precision.clone(),
    })
}

pub fn get_or_create_am_link(conn: &Connection, link: &NewAmLink) -> Result<AmLink> {
    let relationship = save_relationship(conn, &link.relationship)?;

    let id = upsert_id(
        conn,
        "INSERT INTO am_links (relationship_id, instances_value_dtype, time_link, \
             link_criteria, link_values) \
         VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT DO NOTHING",
        "SELECT id FROM am_links WHERE relationship_id = ?1 AND instances_value_dtype = ?2 \
             AND time_link = ?3 AND link_criteria = ?4 AND link_values = ?5",
        params![
            relationship.id,
            link.instances_value_dtype,
            link.time_link,
            link.link_criteria,
            link.values,
        ],
    )?;

    Ok(AmLink {
        id,
        relationship,
        instances_value_dtype: link.instances_value_dtype.clone(),
        time_link: link.time_link,
        link_criteria: link.link_criteria.clone(),
        values: link.values.clone(),
    })
}

/// Create an AbstractModel and its many-to-many associations
pub fn create_abstract_model(
    conn: &Connection,
    master_item_id: EntityId,
    attribute_ids: &[EntityId],
    measure_ids: &[EntityId],
    link_ids: &[EntityId],
) -> Result<AbstractModel> {
    conn.execute(
        "INSERT INTO abstract_models (master_item_id) VALUES (?1)",
        params![master_item_id],
    )?;
    let id = conn.last_insert_rowid();

    for attribute_id in attribute_ids {
        conn.execute(
            "INSERT OR IGNORE INTO abstract_model_attributes (abstract_model_id, attribute_id) \
             VALUES (?1, ?2)",
            params![id, attribute_id],
        )?;
    }
    for measure_id in measure_ids {
        conn.execute(
            "INSERT OR IGNORE INTO abstract_model_measures (abstract_model_id, measure_id) \
             VALUES (?1, ?2)",
            params![id, measure_id],
        )?;
    }
    for link_id in link_ids {
        conn.execute(
            "INSERT OR IGNORE INTO abstract_model_links (abstract_model_id, am_link_id) \
             VALUES (?1, ?2)",
            params![id, link_id],
        )?;
    }

    Ok(AbstractModel { id, master_item_id })
}

pub fn abstract_model_exists(conn: &Connection, id: EntityId) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM abstract_models WHERE id = ?1")?;
    Ok(stmt.exists(params![id])?)
}

pub fn list_abstract_models(conn: &Connection) -> Result<Vec<AbstractModel>> {
    let mut stmt = conn.prepare("SELECT id, master_item_id FROM abstract_models ORDER BY id")?;
    let models = stmt
        .query_map([], |row| {
            Ok(AbstractModel { id: row.get(0)?, master_item_id: row.get(1)? })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(models)
}

fn attribute_from_row(row: &Row) -> rusqlite::Result<Attribute> {
    Ok(Attribute {
        id: row.get(0)?,
        name: row.get(1)?,
        dtype: DataType { id: row.get(2)?, name: row.get(3)? },
    })
}

fn measure_from_row(row: &Row) -> rusqlite::Result<Measure> {
    Ok(Measure {
        id: row.get(0)?,
        name: row.get(1)?,
        measure_type: row.get(2)?,
        unit_of_measurement: row.get(3)?,
        value_dtype: DataType { id: row.get(4)?, name: row.get(5)? },
        statistic_type: row.get(6)?,
        measurement_reference_time: row.get(7)?,
        measurement_precision: row.get(8)?,
    })
}

fn am_link_from_row(row: &Row) -> rusqlite::Result<AmLink> {
    Ok(AmLink {
        id: row.get(0)?,
        relationship: Relationship { id: row.get(1)?, relationship_str: row.get(2)? },
        instances_value_dtype: row.get(3)?,
        time_link: row.get(4)?,
        link_criteria: row.get(5)?,
        values: row.get(6)?,
    })
}

/// Load an AbstractModel with its master Item, Attributes, Measures and AMLinks
pub fn get_abstract_model(conn: &Connection, id: EntityId) -> Result<AbstractModelDetail> {
    let master_item_id: EntityId = conn
        .query_row(
            "SELECT master_item_id FROM abstract_models WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| CatalogError::NotFound(format!("abstract model {}", id)))?;
    let master_item = get_item(conn, master_item_id)?;

    let attributes = conn
        .prepare(
            "SELECT a.id, a.name, d.id, d.name FROM abstract_model_attributes ama \
             JOIN attributes a ON a.id = ama.attribute_id \
             JOIN data_types d ON d.id = a.dtype_id \
             WHERE ama.abstract_model_id = ?1 ORDER BY a.id",
        )?
        .query_map(params![id], attribute_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    let measures = conn
        .prepare(
            "SELECT m.id, m.name, m.measure_type, m.unit_of_measurement, d.id, d.name, \
                 m.statistic_type, m.measurement_reference_time, m.measurement_precision \
             FROM abstract_model_measures amm \
             JOIN measures m ON m.id = amm.measure_id \
             JOIN data_types d ON d.id = m.value_dtype_id \
             WHERE amm.abstract_model_id = ?1 ORDER BY m.id",
        )?
        .query_map(params![id], measure_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    let links = conn
        .prepare(
            "SELECT l.id, r.id, r.relationship_str, l.instances_value_dtype, l.time_link, \
                 l.link_criteria, l.link_values \
             FROM abstract_model_links aml \
             JOIN am_links l ON l.id = aml.am_link_id \
             JOIN relationships r ON r.id = l.relationship_id \
             WHERE aml.abstract_model_id = ?1 ORDER BY l.id",
        )?
        .query_map(params![id], am_link_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    Ok(AbstractModelDetail {
        id,
        master_item,
        attributes,
        measures,
        links,
    })
}

/// Delete an AbstractModel. Its Instances and association rows go with it.
/// Returns false when no such model existed.
pub fn delete_abstract_model(conn: &Connection, id: EntityId) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM abstract_models WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}
