//! CSV upload ingestion.
//!
//! Orchestrates the full pipeline: store upload → resolve mapping → validate file
//! and headers → create Instances. Validation failures are reported together per
//! field and leave the store untouched.

pub mod upload;
pub mod validate;
pub mod writer;

pub use upload::{validate_file_name, TempUpload, UploadedFile};
pub use validate::{check_extension, missing_columns, read_headers};
pub use writer::create_instances;

use rusqlite::Connection;
use std::path::Path;

use crate::config::UploadConfig;
use crate::db::Db;
use crate::error::{CatalogError, Field, FieldErrors, Result, ValidationError};
use crate::schema::MappingResolver;
use crate::store::Instance;

/// Ingest one upload: `mapping_text` maps CSV column names to AbstractModel ids.
///
/// Returns the created Instances in creation order, or
/// `CatalogError::Validation` with every field error found. The temporary copy
/// of the upload is removed before this returns, whatever the outcome.
pub async fn ingest_upload(
    db: &Db,
    config: &UploadConfig,
    mapping_text: &str,
    upload: UploadedFile,
) -> Result<Vec<Instance>> {
    let mut errors = FieldErrors::new();

    let temp = match validate_file_name(&upload.name, config.max_filename_len) {
        Ok(file_name) => Some(TempUpload::create(&config.temp_files_dir, &file_name, &upload.bytes)?),
        Err(e) => {
            errors.add(Field::File, e);
            None
        }
    };

    let csv_path = temp.as_ref().map(|t| t.path().to_path_buf());
    let mapping_text = mapping_text.to_string();
    let result = db
        .with_connection(move |conn| validate_and_ingest(conn, &mapping_text, csv_path.as_deref(), errors))
        .await;

    drop(temp);

    match &result {
        Ok(instances) => log::info!(
            "{} new Instance entries added from {}",
            instances.len(),
            upload.name
        ),
        Err(CatalogError::Validation(errors)) => log::warn!(
            "Upload {} rejected with {} error(s)",
            upload.name,
            errors.message_count()
        ),
        Err(e) => log::error!("Upload {} failed: {}", upload.name, e),
    }

    result
}

/// Validate and ingest a CSV already on disk.
pub fn ingest_file(conn: &mut Connection, mapping_text: &str, csv_path: &Path) -> Result<Vec<Instance>> {
    validate_and_ingest(conn, mapping_text, Some(csv_path), FieldErrors::new())
}

fn validate_and_ingest(
    conn: &mut Connection,
    mapping_text: &str,
    csv_path: Option<&Path>,
    mut errors: FieldErrors,
) -> Result<Vec<Instance>> {
    let mut resolver = MappingResolver::new();
    match resolver.resolve(conn, mapping_text) {
        Ok(_) => {}
        Err(CatalogError::Validation(mapping_errors)) => errors.merge(mapping_errors),
        Err(e) => return Err(e),
    }

    let file_name = csv_path
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut is_csv = false;
    if csv_path.is_some() {
        match check_extension(&file_name) {
            Some(e) => errors.add(Field::File, e),
            None => is_csv = true,
        }
    }

    if let (Some(mapping), Some(path), true) = (resolver.mapping(), csv_path, is_csv) {
        match read_headers(path) {
            Ok(headers) => {
                for e in missing_columns(&headers, mapping, &file_name) {
                    errors.add(Field::File, e);
                }
            }
            Err(e) => errors.add(
                Field::File,
                ValidationError::UnreadableCsv {
                    file: file_name.clone(),
                    reason: e.to_string(),
                },
            ),
        }
    }

    errors.into_result()?;

    let (Some(mapping), Some(path)) = (resolver.mapping(), csv_path) else {
        return Err(CatalogError::InvalidInput("upload passed validation without a mapping and file".to_string()));
    };
    create_instances(conn, path, mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::store::{create_abstract_model, get_or_create_item, EntityId};
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixture {
        db: Db,
        config: UploadConfig,
        _db_dir: TempDir,
        upload_dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let (db, db_dir) = test_db().await;
        let upload_dir = TempDir::new().unwrap();
        let config = UploadConfig {
            temp_files_dir: upload_dir.path().to_path_buf(),
            max_filename_len: 50,
        };
        Fixture { db, config, _db_dir: db_dir, upload_dir }
    }

    impl Fixture {
        async fn model(&self, item: &str) -> EntityId {
            let item = item.to_string();
            self.db
                .with_connection(move |conn| {
                    let item = get_or_create_item(conn, &item)?;
                    Ok(create_abstract_model(conn, item.id, &[], &[], &[])?.id)
                })
                .await
                .unwrap()
        }

        async fn ingest(&self, mapping: &str, name: &str, content: &str) -> Result<Vec<Instance>> {
            ingest_upload(&self.db, &self.config, mapping, UploadedFile::new(name, content)).await
        }

        fn leftover_uploads(&self) -> usize {
            std::fs::read_dir(self.upload_dir.path()).unwrap().count()
        }
    }

    fn field_messages(result: Result<Vec<Instance>>, field: Field) -> Vec<String> {
        match result {
            Err(CatalogError::Validation(errors)) => errors.messages(&field).to_vec(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    const BOOKS_CSV: &str = "title,isbn,author,year\nDune,111,Herbert,1965\nEmma,,Austen,1815\n";

    #[tokio::test]
    async fn test_single_model_ingest() {
        let f = fixture().await;
        let books = f.model("book").await;

        let created = f
            .ingest(&format!(r#"{{"title": {0}, "isbn": {0}}}"#, books), "books.csv", BOOKS_CSV)
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|i| i.abm_id == books && i.attribute.len() == 2));
        assert_eq!(created[0].attribute["title"], json!("Dune"));
        assert_eq!(created[1].attribute["isbn"], json!(""));
        assert_eq!(f.leftover_uploads(), 0);
    }

    #[tokio::test]
    async fn test_two_models_double_the_instances() {
        let f = fixture().await;
        let books = f.model("book").await;
        let people = f.model("person").await;

        let mapping = format!(r#"{{"title": {}, "author": {}}}"#, books, people);
        let created = f.ingest(&mapping, "books.csv", BOOKS_CSV).await.unwrap();

        assert_eq!(created.len(), 4);
        assert_eq!(created.iter().filter(|i| i.abm_id == people).count(), 2);
        let authors: Vec<_> = created
            .iter()
            .filter(|i| i.abm_id == people)
            .map(|i| i.attribute["author"].clone())
            .collect();
        assert_eq!(authors, vec![json!("Herbert"), json!("Austen")]);
    }

    #[tokio::test]
    async fn test_header_only_csv_creates_nothing() {
        let f = fixture().await;
        let books = f.model("book").await;

        let created = f
            .ingest(&format!(r#"{{"title": {}}}"#, books), "books.csv", "title,isbn\n")
            .await
            .unwrap();
        assert!(created.is_empty());
    }

    #[tokio::test]
    async fn test_missing_columns_reported_together() {
        let f = fixture().await;
        let books = f.model("book").await;
        let mapping = format!(r#"{{"title": {0}, "pages": {0}, "publisher": {0}}}"#, books);

        let messages = field_messages(f.ingest(&mapping, "books.csv", BOOKS_CSV).await, Field::File);

        assert_eq!(
            messages,
            vec![
                "Column name \"pages\" does not exist in \"books.csv\".",
                "Column name \"publisher\" does not exist in \"books.csv\".",
            ]
        );
        assert!(f.db.list_instances(None).await.unwrap().is_empty());
        assert_eq!(f.leftover_uploads(), 0);
    }

    #[tokio::test]
    async fn test_wrong_extension() {
        let f = fixture().await;
        let books = f.model("book").await;

        let messages = field_messages(
            f.ingest(&format!(r#"{{"title": {}}}"#, books), "books.txt", BOOKS_CSV).await,
            Field::File,
        );
        assert_eq!(messages, vec!["\"books.txt\" is not a valid csv."]);
        assert_eq!(f.leftover_uploads(), 0);
    }

    #[tokio::test]
    async fn test_mapping_and_file_errors_reported_together() {
        let f = fixture().await;

        let result = f.ingest(r#"{"title": 999}"#, "books.CSV", BOOKS_CSV).await;
        let Err(CatalogError::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.messages(&Field::Mapping),
            ["Data contains references to AbstractModel entries that do not exist."]
        );
        assert_eq!(errors.messages(&Field::File), ["\"books.CSV\" is not a valid csv."]);
    }

    #[tokio::test]
    async fn test_unknown_model_skips_column_check() {
        let f = fixture().await;
        let books = f.model("book").await;
        let mapping = format!(r#"{{"title": {}, "nope": 999}}"#, books);

        let result = f.ingest(&mapping, "books.csv", BOOKS_CSV).await;
        let Err(CatalogError::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert_eq!(errors.messages(&Field::Mapping).len(), 1);
        assert!(errors.messages(&Field::File).is_empty());
        assert!(f.db.list_instances(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_mapping() {
        let f = fixture().await;
        let messages = field_messages(f.ingest("title: 1", "books.csv", BOOKS_CSV).await, Field::Mapping);
        assert_eq!(messages.len(), 1);
        assert_eq!(f.leftover_uploads(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_name() {
        let f = fixture().await;
        let books = f.model("book").await;

        let messages = field_messages(
            f.ingest(&format!(r#"{{"title": {}}}"#, books), "", BOOKS_CSV).await,
            Field::File,
        );
        assert_eq!(messages, vec!["This field is required."]);
    }

    #[tokio::test]
    async fn test_file_name_too_long() {
        let f = fixture().await;
        let books = f.model("book").await;
        let name = format!("{}.csv", "b".repeat(60));

        let messages = field_messages(
            f.ingest(&format!(r#"{{"title": {}}}"#, books), &name, BOOKS_CSV).await,
            Field::File,
        );
        assert_eq!(messages, vec!["Ensure this filename has at most 50 characters (it has 64)."]);
        assert_eq!(f.leftover_uploads(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_header() {
        let f = fixture().await;
        let books = f.model("book").await;
        let mapping = format!(r#"{{"title": {}}}"#, books);

        let result = ingest_upload(
            &f.db,
            &f.config,
            &mapping,
            UploadedFile::new("books.csv", b"t\xfftle\nDune\n".to_vec()),
        )
        .await;
        let messages = field_messages(result, Field::File);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("\"books.csv\" could not be read as csv"));
    }

    #[tokio::test]
    async fn test_ingest_file_on_disk() {
        let f = fixture().await;
        let books = f.model("book").await;
        let editions = f.model("edition").await;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("books.csv");
        std::fs::write(&path, BOOKS_CSV).unwrap();

        let mapping = format!(r#"{{"title": {}, "isbn": {}}}"#, books, editions);
        let csv_path = path.clone();
        let created = f
            .db
            .with_connection(move |conn| ingest_file(conn, &mapping, &csv_path))
            .await
            .unwrap();

        assert_eq!(created.len(), 4);
        // Files the caller owns are left in place
        assert!(path.exists());
    }
}
