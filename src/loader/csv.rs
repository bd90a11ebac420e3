//! CSV document loader.
//!
//! Every record becomes one document whose content lists each column as
//! `header: value` on its own line.

use super::Document;
use crate::error::{Result, VoxsqlError};
use std::path::Path;
use tracing::{debug, instrument};

/// Load documents from a CSV file with a header row.
///
/// When `source_column` is given, each document's `source` is that column's
/// value; otherwise it is the file name.
#[instrument(fields(path = %path.display()))]
pub fn load_csv(path: &Path, source_column: Option<&str>) -> Result<Vec<Document>> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();

    let source_index = match source_column {
        Some(column) => Some(
            headers
                .iter()
                .position(|h| h == column || h.trim() == column)
                .ok_or_else(|| {
                    VoxsqlError::DocumentLoad(format!(
                        "Source column '{}' not found in CSV file.",
                        column
                    ))
                })?,
        ),
        None => None,
    };

    let file_source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let mut documents = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;

        let content = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                format!("{}: {}", header.trim(), record.get(i).unwrap_or("").trim())
            })
            .collect::<Vec<_>>()
            .join("\n");

        let source = match source_index {
            Some(i) => record.get(i).unwrap_or("").to_string(),
            None => file_source.clone(),
        };

        documents.push(Document::new(content, source, row));
    }

    debug!("Loaded {} documents", documents.len());
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_rows_as_documents() {
        let file = write_csv(
            "table,column,description\n\
             orders,id,Primary key of the orders table\n\
             orders, total ,Order total in cents\n",
        );

        let docs = load_csv(file.path(), Some("description")).unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(
            docs[0].content,
            "table: orders\ncolumn: id\ndescription: Primary key of the orders table"
        );
        assert_eq!(docs[0].metadata.source, "Primary key of the orders table");
        assert_eq!(docs[0].metadata.row, 0);
        assert_eq!(docs[1].content, "table: orders\ncolumn: total\ndescription: Order total in cents");
        assert_eq!(docs[1].metadata.row, 1);
    }

    #[test]
    fn test_missing_source_column() {
        let file = write_csv("table,column\nusers,email\n");

        let err = load_csv(file.path(), Some("description")).unwrap_err();
        assert!(err.to_string().contains("Source column 'description' not found"));
    }

    #[test]
    fn test_file_name_is_source_without_column() {
        let file = write_csv("table,column\nusers,email\n");
        let expected = file.path().file_name().unwrap().to_str().unwrap().to_string();

        let docs = load_csv(file.path(), None).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata.source, expected);
    }

    #[test]
    fn test_header_only_file() {
        let file = write_csv("table,column,description\n");
        assert!(load_csv(file.path(), Some("description")).unwrap().is_empty());
    }
}
