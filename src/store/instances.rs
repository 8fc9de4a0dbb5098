//! Instance entities: Instance, InstanceLink, IncomingInteractionLink, plus
//! RankingCluster storage.

use rusqlite::{params, Connection, OptionalExtension};

use super::types::*;
use crate::error::{CatalogError, Result};

/// Create an Instance of `abm_id`. Payloads are stored as JSON text without
/// checking them against the AbstractModel.
pub fn create_instance(
    conn: &Connection,
    abm_id: EntityId,
    attribute: &Payload,
    measure: &Payload,
) -> Result<Instance> {
    conn.execute(
        "INSERT INTO instances (abm_id, attribute, measure) VALUES (?1, ?2, ?3)",
        params![
            abm_id,
            serde_json::to_string(attribute)?,
            serde_json::to_string(measure)?,
        ],
    )?;

    Ok(Instance {
        id: conn.last_insert_rowid(),
        abm_id,
        attribute: attribute.clone(),
        measure: measure.clone(),
    })
}

type InstanceRow = (EntityId, EntityId, String, String);

fn decode_instance((id, abm_id, attribute, measure): InstanceRow) -> Result<Instance> {
    Ok(Instance {
        id,
        abm_id,
        attribute: serde_json::from_str(&attribute)?,
        measure: serde_json::from_str(&measure)?,
    })
}

pub fn get_instance(conn: &Connection, id: EntityId) -> Result<Instance> {
    let row: InstanceRow = conn
        .query_row(
            "SELECT id, abm_id, attribute, measure FROM instances WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?
        .ok_or_else(|| CatalogError::NotFound(format!("instance {}", id)))?;
    decode_instance(row)
}

/// Instances in creation order, optionally restricted to one AbstractModel
pub fn list_instances(conn: &Connection, abm_id: Option<EntityId>) -> Result<Vec<Instance>> {
    let mut stmt = conn.prepare(
        "SELECT id, abm_id, attribute, measure FROM instances \
         WHERE ?1 IS NULL OR abm_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![abm_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<std::result::Result<Vec<InstanceRow>, rusqlite::Error>>()?;

    rows.into_iter().map(decode_instance).collect()
}

pub fn create_instance_link(
    conn: &Connection,
    relationship_id: EntityId,
    landing_instance: &str,
) -> Result<InstanceLink> {
    conn.execute(
        "INSERT INTO instance_links (relationship_id, landing_instance) VALUES (?1, ?2)",
        params![relationship_id, landing_instance],
    )?;
    Ok(InstanceLink {
        id: conn.last_insert_rowid(),
        relationship_id,
        landing_instance: landing_instance.to_string(),
    })
}

pub fn create_incoming_interaction_link(
    conn: &Connection,
    relationship: &str,
    origin_instance: &str,
) -> Result<IncomingInteractionLink> {
    conn.execute(
        "INSERT INTO incoming_interaction_links (relationship, origin_instance) VALUES (?1, ?2)",
        params![relationship, origin_instance],
    )?;
    Ok(IncomingInteractionLink {
        id: conn.last_insert_rowid(),
        relationship: relationship.to_string(),
        origin_instance: origin_instance.to_string(),
    })
}

pub fn attach_instance_link(conn: &Connection, instance_id: EntityId, link_id: EntityId) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO instance_instance_links (instance_id, instance_link_id) VALUES (?1, ?2)",
        params![instance_id, link_id],
    )?;
    Ok(())
}

pub fn attach_incoming_link(conn: &Connection, instance_id: EntityId, iil_id: EntityId) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO instance_iils (instance_id, iil_id) VALUES (?1, ?2)",
        params![instance_id, iil_id],
    )?;
    Ok(())
}

pub fn instance_links(conn: &Connection, instance_id: EntityId) -> Result<Vec<InstanceLink>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.relationship_id, l.landing_instance FROM instance_instance_links il \
         JOIN instance_links l ON l.id = il.instance_link_id \
         WHERE il.instance_id = ?1 ORDER BY l.id",
    )?;
    let links = stmt
        .query_map(params![instance_id], |row| {
            Ok(InstanceLink {
                id: row.get(0)?,
                relationship_id: row.get(1)?,
                landing_instance: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(links)
}

pub fn incoming_links(conn: &Connection, instance_id: EntityId) -> Result<Vec<IncomingInteractionLink>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.relationship, l.origin_instance FROM instance_iils ii \
         JOIN incoming_interaction_links l ON l.id = ii.iil_id \
         WHERE ii.instance_id = ?1 ORDER BY l.id",
    )?;
    let links = stmt
        .query_map(params![instance_id], |row| {
            Ok(IncomingInteractionLink {
                id: row.get(0)?,
                relationship: row.get(1)?,
                origin_instance: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(links)
}

/// Create an empty RankingCluster for a master Item
pub fn create_ranking_cluster(conn: &Connection, master_item_id: EntityId) -> Result<RankingCluster> {
    conn.execute(
        "INSERT INTO ranking_clusters (master_item_id) VALUES (?1)",
        params![master_item_id],
    )?;
    Ok(RankingCluster {
        id: conn.last_insert_rowid(),
        master_item_id,
        ranking_feature: None,
        number_of_instances: None,
        instances_ranking: None,
        links_ranking: None,
    })
}

pub fn ranking_clusters_for_item(conn: &Connection, master_item_id: EntityId) -> Result<Vec<RankingCluster>> {
    let mut stmt = conn.prepare(
        "SELECT id, master_item_id, ranking_feature, number_of_instances, instances_ranking, \
             links_ranking \
         FROM ranking_clusters WHERE master_item_id = ?1 ORDER BY id",
    )?;
    let clusters = stmt
        .query_map(params![master_item_id], |row| {
            Ok(RankingCluster {
                id: row.get(0)?,
                master_item_id: row.get(1)?,
                ranking_feature: row.get(2)?,
                number_of_instances: row.get(3)?,
                instances_ranking: row.get(4)?,
                links_ranking: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(clusters)
}
