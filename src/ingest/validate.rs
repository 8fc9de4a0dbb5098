//! Upload checks that run before anything is written.

use csv::{Reader, ReaderBuilder, StringRecord};
use std::fs::File;
use std::path::Path;

use crate::error::ValidationError;
use crate::schema::ColumnMapping;

/// Open a headered CSV reader. Rows may be shorter or longer than the header.
pub(crate) fn open_reader(path: &Path) -> csv::Result<Reader<File>> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
}

/// `.csv` extension check, case-sensitive
pub fn check_extension(file_name: &str) -> Option<ValidationError> {
    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some("csv") => None,
        _ => Some(ValidationError::InvalidFileType(file_name.to_string())),
    }
}

/// Read the header row once. An empty file has no headers.
pub fn read_headers(path: &Path) -> csv::Result<StringRecord> {
    let mut reader = open_reader(path)?;
    Ok(reader.headers()?.clone())
}

/// One `UnknownColumn` per mapped column the header lacks
pub fn missing_columns(headers: &StringRecord, mapping: &ColumnMapping, file_name: &str) -> Vec<ValidationError> {
    mapping
        .columns()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .map(|column| ValidationError::UnknownColumn {
            column: column.to_string(),
            file: file_name.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::schema::MappingResolver;
    use crate::store::{create_abstract_model, get_or_create_item};
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_check_extension() {
        assert_eq!(check_extension("books.csv"), None);
        assert_eq!(check_extension("archive.tar.csv"), None);
        for name in ["books.CSV", "books.txt", "books", ".csv", "books.csv.gz"] {
            assert_eq!(
                check_extension(name),
                Some(ValidationError::InvalidFileType(name.to_string())),
                "name {}",
                name
            );
        }
    }

    #[test]
    fn test_read_headers() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "books.csv", "title,isbn,author\nDune,123,Herbert\n");
        let headers = read_headers(&path).unwrap();
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["title", "isbn", "author"]);

        let empty = write_csv(&dir, "empty.csv", "");
        assert!(read_headers(&empty).unwrap().is_empty());
    }

    #[test]
    fn test_read_headers_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("latin1.csv");
        std::fs::write(&path, b"t\xeftle,isbn\n").unwrap();
        assert!(read_headers(&path).is_err());
    }

    #[test]
    fn test_missing_columns_accumulate() {
        let (conn, _dir) = test_connection();
        let item = get_or_create_item(&conn, "book").unwrap();
        let abm = create_abstract_model(&conn, item.id, &[], &[], &[]).unwrap();
        let text = format!(r#"{{"title": {0}, "subtitle": {0}, "publisher": {0}}}"#, abm.id);
        let mut resolver = MappingResolver::new();
        let mapping = resolver.resolve(&conn, &text).unwrap();

        let headers = StringRecord::from(vec!["title", "isbn"]);
        let errors = missing_columns(&headers, mapping, "books.csv");
        let messages: Vec<_> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "Column name \"publisher\" does not exist in \"books.csv\".",
                "Column name \"subtitle\" does not exist in \"books.csv\".",
            ]
        );

        let full = StringRecord::from(vec!["publisher", "title", "subtitle", "extra"]);
        assert!(missing_columns(&full, mapping, "books.csv").is_empty());
    }
}
