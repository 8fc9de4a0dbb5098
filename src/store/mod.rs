//! Entity graph store over SQLite.
//!
//! Operations are synchronous functions over a `&Connection` so that callers can
//! compose several of them inside one transaction. Name normalization and
//! relationship endpoint derivation happen inside the write paths, never in callers.

mod entities;
mod instances;
mod normalize;
mod types;

pub use entities::{
    abstract_model_exists, create_abstract_model, delete_abstract_model, get_abstract_model,
    get_item, get_or_create_am_link, get_or_create_attribute, get_or_create_data_type,
    get_or_create_item, get_or_create_measure, list_abstract_models, relationship_items,
    save_relationship,
};
pub use instances::{
    attach_incoming_link, attach_instance_link, create_incoming_interaction_link,
    create_instance, create_instance_link, create_ranking_cluster, get_instance, incoming_links,
    instance_links, list_instances, ranking_clusters_for_item,
};
pub use normalize::{normalize_data_type_name, normalize_item_name};
pub use types::*;

use crate::db::Db;
use crate::error::Result;

/// Async entry points for callers that hold a [`Db`] rather than a connection.
impl Db {
    /// Relationship persistence hook: stores the relationship and links its Items.
    pub async fn save_relationship(&self, relationship_str: &str) -> Result<Relationship> {
        let relationship_str = relationship_str.to_string();
        self.with_connection(move |conn| save_relationship(conn, &relationship_str))
            .await
    }

    pub async fn get_or_create_item(&self, name: &str) -> Result<Item> {
        let name = name.to_string();
        self.with_connection(move |conn| get_or_create_item(conn, &name)).await
    }

    pub async fn get_or_create_data_type(&self, name: &str) -> Result<DataType> {
        let name = name.to_string();
        self.with_connection(move |conn| get_or_create_data_type(conn, &name)).await
    }

    pub async fn get_abstract_model(&self, id: EntityId) -> Result<AbstractModelDetail> {
        self.with_connection(move |conn| get_abstract_model(conn, id)).await
    }

    pub async fn list_instances(&self, abm_id: Option<EntityId>) -> Result<Vec<Instance>> {
        self.with_connection(move |conn| list_instances(conn, abm_id)).await
    }
}
