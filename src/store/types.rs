use serde::{Deserialize, Serialize};

/// Row id of any catalog entity
pub type EntityId = i64;

/// Opaque key-value blob stored on an Instance (`attribute` / `measure`)
pub type Payload = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataType {
    pub id: EntityId,
    /// Stored upper-case, e.g. `VARCHAR`
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: EntityId,
    /// Stored capitalized, e.g. `Book`
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: EntityId,
    /// e.g. `(Book)<-[WROTE]-(Person)`
    pub relationship_str: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: EntityId,
    pub name: String,
    pub dtype: DataType,
}

/// Fields of a Measure before it is stored; `value_dtype` is a DataType name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMeasure {
    pub name: String,
    pub measure_type: String,
    pub unit_of_measurement: String,
    pub value_dtype: String,
    pub statistic_type: String,
    pub measurement_reference_time: String,
    pub measurement_precision: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub id: EntityId,
    pub name: String,
    pub measure_type: String,
    pub unit_of_measurement: String,
    pub value_dtype: DataType,
    pub statistic_type: String,
    pub measurement_reference_time: String,
    pub measurement_precision: String,
}

/// Fields of an AMLink before it is stored; `relationship` is a relationship string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAmLink {
    pub relationship: String,
    pub instances_value_dtype: String,
    pub time_link: bool,
    pub link_criteria: String,
    pub values: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmLink {
    pub id: EntityId,
    pub relationship: Relationship,
    pub instances_value_dtype: String,
    pub time_link: bool,
    pub link_criteria: String,
    pub values: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractModel {
    pub id: EntityId,
    pub master_item_id: EntityId,
}

/// An AbstractModel with its master Item and every associated schema entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractModelDetail {
    pub id: EntityId,
    pub master_item: Item,
    pub attributes: Vec<Attribute>,
    pub measures: Vec<Measure>,
    pub links: Vec<AmLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: EntityId,
    pub abm_id: EntityId,
    pub attribute: Payload,
    pub measure: Payload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceLink {
    pub id: EntityId,
    pub relationship_id: EntityId,
    pub landing_instance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingInteractionLink {
    pub id: EntityId,
    pub relationship: String,
    pub origin_instance: String,
}

/// Ranking summary for one master Item. Only storage is provided; nothing
/// recomputes the ranking fields yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingCluster {
    pub id: EntityId,
    pub master_item_id: EntityId,
    pub ranking_feature: Option<String>,
    pub number_of_instances: Option<u32>,
    pub instances_ranking: Option<String>,
    pub links_ranking: Option<String>,
}
