use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Main error type for the catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read errors outside of validation (e.g. a malformed row during ingestion)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Payload (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Entity lookup by id failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// A natural key already exists with incompatible fields
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// User-visible validation failures, grouped per field
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),
}

/// Convenient Result type using CatalogError
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Validation failures shown to the user. `Display` is the rendered message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("This field is required.")]
    Required,

    /// The mapping text is not a JSON object
    #[error("{0}")]
    MalformedMapping(String),

    #[error("Data contains references to AbstractModel entries that do not exist.")]
    UnknownAbstractModel,

    #[error("\"{0}\" is not a valid csv.")]
    InvalidFileType(String),

    #[error("Column name \"{column}\" does not exist in \"{file}\".")]
    UnknownColumn { column: String, file: String },

    #[error("Ensure this filename has at most {max} characters (it has {len}).")]
    FilenameTooLong { max: usize, len: usize },

    #[error("\"{file}\" could not be read as csv: {reason}")]
    UnreadableCsv { file: String, reason: String },

    #[error("This field may not be blank.")]
    Blank,

    #[error("Ensure this field has no more than {max} characters.")]
    TooLong { max: usize },
}

/// Form field an error is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Field {
    /// The column → AbstractModel mapping text
    Mapping,
    /// The uploaded file
    File,
    /// A nested request field, e.g. `attribute[0].attribute_name`
    Path(String),
}

impl Field {
    pub fn as_str(&self) -> &str {
        match self {
            Field::Mapping => "mapping",
            Field::File => "file",
            Field::Path(path) => path,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Field> for String {
    fn from(field: Field) -> Self {
        field.as_str().to_string()
    }
}

/// All messages attached to one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Field,
    pub messages: Vec<String>,
}

/// Field errors in the order fields first failed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a validation error to `field`, merging with earlier messages for it
    pub fn add(&mut self, field: Field, error: ValidationError) {
        let message = error.to_string();
        match self.0.iter_mut().find(|e| e.field == field) {
            Some(existing) => existing.messages.push(message),
            None => self.0.push(FieldError {
                field,
                messages: vec![message],
            }),
        }
    }

    /// Fold another set of errors into this one, field by field
    pub fn merge(&mut self, other: FieldErrors) {
        for error in other.0 {
            match self.0.iter_mut().find(|e| e.field == error.field) {
                Some(existing) => existing.messages.extend(error.messages),
                None => self.0.push(error),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of messages across all fields
    pub fn message_count(&self) -> usize {
        self.0.iter().map(|e| e.messages.len()).sum()
    }

    pub fn messages(&self, field: &Field) -> &[String] {
        self.0
            .iter()
            .find(|e| &e.field == field)
            .map(|e| e.messages.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// `Ok(())` when nothing was collected, otherwise `CatalogError::Validation`
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.0 {
            for message in &error.messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", error.field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CatalogError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let catalog_err: CatalogError = rusqlite_err.into();
        assert!(matches!(catalog_err, CatalogError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let catalog_err: CatalogError = io_err.into();
        assert!(matches!(catalog_err, CatalogError::Io(_)));
    }

    #[test]
    fn test_validation_messages() {
        let err = ValidationError::UnknownColumn {
            column: "title".to_string(),
            file: "books.csv".to_string(),
        };
        assert_eq!(err.to_string(), "Column name \"title\" does not exist in \"books.csv\".");
        assert_eq!(
            ValidationError::InvalidFileType("books.txt".to_string()).to_string(),
            "\"books.txt\" is not a valid csv."
        );
    }

    #[test]
    fn test_field_errors_group_by_field() {
        let mut errors = FieldErrors::new();
        errors.add(Field::File, ValidationError::InvalidFileType("a.txt".into()));
        errors.add(Field::Mapping, ValidationError::UnknownAbstractModel);
        errors.add(Field::File, ValidationError::Required);

        assert_eq!(errors.iter().count(), 2);
        assert_eq!(errors.message_count(), 3);
        assert_eq!(errors.messages(&Field::File).len(), 2);
        assert!(errors.messages(&Field::Path("x".into())).is_empty());
    }

    #[test]
    fn test_field_errors_serialize() {
        let mut errors = FieldErrors::new();
        errors.add(Field::Mapping, ValidationError::UnknownAbstractModel);
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "field": "mapping",
                "messages": ["Data contains references to AbstractModel entries that do not exist."]
            }])
        );
    }

    #[test]
    fn test_empty_field_errors_is_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
        let mut errors = FieldErrors::new();
        errors.add(Field::File, ValidationError::Required);
        assert!(matches!(errors.into_result(), Err(CatalogError::Validation(_))));
    }
}
