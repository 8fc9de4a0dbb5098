//! Builds an AbstractModel and its nested schema entities from one request payload.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::Db;
use crate::error::{Field, FieldErrors, Result, ValidationError};
use crate::store::{
    create_abstract_model, get_abstract_model, get_or_create_am_link, get_or_create_attribute,
    get_or_create_item, get_or_create_measure, AbstractModelDetail, NewAmLink, NewMeasure,
};

/// Longest value accepted for any text field of a schema entity.
pub const MAX_FIELD_LEN: usize = 140;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRequest {
    pub attribute_name: String,
    pub value_dtype: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureRequest {
    pub measure_name: String,
    pub measure_type: String,
    pub unit_of_measurement: String,
    pub value_dtype: String,
    pub statistic_type: String,
    pub measurement_reference_time: String,
    pub measurement_precision: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRequest {
    pub relationship: String,
    pub instances_value_dtype: String,
    pub time_link: bool,
    pub link_criteria: String,
    pub values: String,
}

/// Request payload for a new AbstractModel, e.g.
///
/// ```json
/// {
///   "master_item": "book",
///   "attribute": [{"attribute_name": "title", "value_dtype": "varchar"}],
///   "measure": [],
///   "link": [{"relationship": "(Book)<-[WROTE]-(Person)", "instances_value_dtype": "VARCHAR",
///             "time_link": false, "link_criteria": "author", "values": "name"}]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractModelRequest {
    pub master_item: String,
    #[serde(default)]
    pub attribute: Vec<AttributeRequest>,
    #[serde(default)]
    pub measure: Vec<MeasureRequest>,
    #[serde(default)]
    pub link: Vec<LinkRequest>,
}

fn check_text(errors: &mut FieldErrors, path: String, value: &str) {
    if value.trim().is_empty() {
        errors.add(Field::Path(path), ValidationError::Blank);
    } else if value.chars().count() > MAX_FIELD_LEN {
        errors.add(Field::Path(path), ValidationError::TooLong { max: MAX_FIELD_LEN });
    }
}

impl AbstractModelRequest {
    /// Every field problem in the request, keyed by its path
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        check_text(&mut errors, "master_item".to_string(), &self.master_item);

        for (i, attribute) in self.attribute.iter().enumerate() {
            check_text(&mut errors, format!("attribute[{}].attribute_name", i), &attribute.attribute_name);
            check_text(&mut errors, format!("attribute[{}].value_dtype", i), &attribute.value_dtype);
        }

        for (i, measure) in self.measure.iter().enumerate() {
            let fields = [
                ("measure_name", &measure.measure_name),
                ("measure_type", &measure.measure_type),
                ("unit_of_measurement", &measure.unit_of_measurement),
                ("value_dtype", &measure.value_dtype),
                ("statistic_type", &measure.statistic_type),
                ("measurement_reference_time", &measure.measurement_reference_time),
                ("measurement_precision", &measure.measurement_precision),
            ];
            for (name, value) in fields {
                check_text(&mut errors, format!("measure[{}].{}", i, name), value);
            }
        }

        for (i, link) in self.link.iter().enumerate() {
            let fields = [
                ("relationship", &link.relationship),
                ("instances_value_dtype", &link.instances_value_dtype),
                ("link_criteria", &link.link_criteria),
                ("values", &link.values),
            ];
            for (name, value) in fields {
                check_text(&mut errors, format!("link[{}].{}", i, name), value);
            }
        }

        errors
    }
}

/// Validate the whole request, then get-or-create Item → Attributes → Measures →
/// AMLinks and create the AbstractModel, all in one transaction.
///
/// Any field problem fails the request as a single `CatalogError::Validation`
/// before anything is written.
pub fn build_abstract_model(
    conn: &mut Connection,
    request: &AbstractModelRequest,
) -> Result<AbstractModelDetail> {
    request.validate().into_result()?;

    let tx = conn.transaction()?;

    let item = get_or_create_item(&tx, &request.master_item)?;

    let attribute_ids = request
        .attribute
        .iter()
        .map(|a| get_or_create_attribute(&tx, &a.attribute_name, &a.value_dtype).map(|a| a.id))
        .collect::<Result<Vec<_>>>()?;

    let measure_ids = request
        .measure
        .iter()
        .map(|m| {
            let new_measure = NewMeasure {
                name: m.measure_name.clone(),
                measure_type: m.measure_type.clone(),
                unit_of_measurement: m.unit_of_measurement.clone(),
                value_dtype: m.value_dtype.clone(),
                statistic_type: m.statistic_type.clone(),
                measurement_reference_time: m.measurement_reference_time.clone(),
                measurement_precision: m.measurement_precision.clone(),
            };
            get_or_create_measure(&tx, &new_measure).map(|m| m.id)
        })
        .collect::<Result<Vec<_>>>()?;

    let link_ids = request
        .link
        .iter()
        .map(|l| {
            let new_link = NewAmLink {
                relationship: l.relationship.clone(),
                instances_value_dtype: l.instances_value_dtype.clone(),
                time_link: l.time_link,
                link_criteria: l.link_criteria.clone(),
                values: l.values.clone(),
            };
            get_or_create_am_link(&tx, &new_link).map(|l| l.id)
        })
        .collect::<Result<Vec<_>>>()?;

    let model = create_abstract_model(&tx, item.id, &attribute_ids, &measure_ids, &link_ids)?;
    let detail = get_abstract_model(&tx, model.id)?;
    tx.commit()?;

    log::info!(
        "Created abstract model {} for item {} ({} attributes, {} measures, {} links)",
        detail.id,
        detail.master_item.name,
        detail.attributes.len(),
        detail.measures.len(),
        detail.links.len()
    );

    Ok(detail)
}

impl Db {
    pub async fn build_abstract_model(&self, request: AbstractModelRequest) -> Result<AbstractModelDetail> {
        self.with_connection(move |conn| build_abstract_model(conn, &request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_connection, test_db};
    use crate::error::CatalogError;
    use crate::store::relationship_items;
    use serde_json::json;

    fn request() -> AbstractModelRequest {
        serde_json::from_value(json!({
            "master_item": "book",
            "attribute": [
                {"attribute_name": "title", "value_dtype": "varchar"},
                {"attribute_name": "isbn", "value_dtype": "varchar"}
            ],
            "measure": [{
                "measure_name": "page_count",
                "measure_type": "count",
                "unit_of_measurement": "pages",
                "value_dtype": "int",
                "statistic_type": "total",
                "measurement_reference_time": "publication",
                "measurement_precision": "1"
            }],
            "link": [{
                "relationship": "(Book)<-[WROTE]-(Person)",
                "instances_value_dtype": "VARCHAR",
                "time_link": false,
                "link_criteria": "author",
                "values": "name"
            }]
        }))
        .unwrap()
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_build_full_model() {
        let (mut conn, _dir) = test_connection();
        let detail = build_abstract_model(&mut conn, &request()).unwrap();

        assert_eq!(detail.master_item.name, "Book");
        let attribute_names: Vec<_> = detail.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(attribute_names, vec!["title", "isbn"]);
        assert!(detail.attributes.iter().all(|a| a.dtype.name == "VARCHAR"));
        assert_eq!(detail.measures[0].value_dtype.name, "INT");
        assert_eq!(detail.links.len(), 1);

        let items = relationship_items(&conn, detail.links[0].relationship.id).unwrap();
        assert_eq!(items.len(), 2);
        // "Book" from the master item is reused by the relationship
        assert_eq!(count(&conn, "items"), 2);
    }

    #[test]
    fn test_build_twice_reuses_schema_entities() {
        let (mut conn, _dir) = test_connection();
        let first = build_abstract_model(&mut conn, &request()).unwrap();
        let second = build_abstract_model(&mut conn, &request()).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.attributes, second.attributes);
        assert_eq!(count(&conn, "attributes"), 2);
        assert_eq!(count(&conn, "measures"), 1);
        assert_eq!(count(&conn, "am_links"), 1);
        assert_eq!(count(&conn, "data_types"), 2);
    }

    #[test]
    fn test_build_collects_all_field_errors_without_writing() {
        let (mut conn, _dir) = test_connection();
        let mut bad = request();
        bad.master_item = " ".to_string();
        bad.attribute[1].value_dtype = String::new();
        bad.link[0].values = "x".repeat(MAX_FIELD_LEN + 1);

        let err = build_abstract_model(&mut conn, &bad).unwrap_err();
        let CatalogError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.message_count(), 3);
        assert_eq!(errors.messages(&Field::Path("master_item".into())), ["This field may not be blank."]);
        assert_eq!(errors.messages(&Field::Path("attribute[1].value_dtype".into())).len(), 1);
        assert_eq!(
            errors.messages(&Field::Path("link[0].values".into())),
            ["Ensure this field has no more than 140 characters."]
        );
        assert_eq!(count(&conn, "items"), 0);
        assert_eq!(count(&conn, "abstract_models"), 0);
    }

    #[test]
    fn test_build_conflict_rolls_back() {
        let (mut conn, _dir) = test_connection();
        build_abstract_model(&mut conn, &request()).unwrap();

        let mut conflicting = request();
        conflicting.master_item = "magazine".to_string();
        conflicting.attribute[0].value_dtype = "int".to_string();

        let err = build_abstract_model(&mut conn, &conflicting).unwrap_err();
        assert!(matches!(err, CatalogError::Conflict(_)));
        assert_eq!(count(&conn, "abstract_models"), 1);
        assert_eq!(count(&conn, "items"), 2);
    }

    #[test]
    fn test_request_defaults_empty_lists() {
        let request: AbstractModelRequest = serde_json::from_str(r#"{"master_item": "person"}"#).unwrap();
        assert!(request.attribute.is_empty());
        assert!(request.validate().is_empty());
    }

    #[tokio::test]
    async fn test_build_through_db() {
        let (db, _dir) = test_db().await;
        let detail = db.build_abstract_model(request()).await.unwrap();
        let loaded = db.get_abstract_model(detail.id).await.unwrap();
        assert_eq!(detail, loaded);
    }
}
