//! End-to-end verification of one SPDX file.
//!
//! Messages come from three sources, in this order: parser warnings of the
//! format store, JSON schema violations (JSON only) and semantic rules. A
//! message already reported by an earlier source is not repeated.

use crate::errors::{ConverterError, ErrorKind};
use crate::formats::{Format, SerializableStore};
use crate::schema;
use crate::store;
use crate::validation::{self, ValidationIssue, ValidationReport};
use log::info;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

/// Verifies `path` as `format`. An empty list means the document is valid.
pub fn verify(path: &Path, format: Format) -> Result<Vec<String>, ConverterError> {
    Ok(verify_report(path, format)?.messages())
}

/// Like [`verify`], keeping severities and locations of every issue.
pub fn verify_report(path: &Path, format: Format) -> Result<ValidationReport, ConverterError> {
    let start_time = Instant::now();
    if !path.exists() {
        return Err(ConverterError::Verification(format!(
            "File {} not found.",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(ConverterError::Verification(format!(
            "{} is not a file.",
            path.display()
        )));
    }

    let mut spdx_store = format.store().map_err(|e| {
        ConverterError::Verification(format!("Error converting fileType to store: {e}"))
    })?;

    info!("Verifying {} as {format}", path.display());
    let document_uri = deserialize(spdx_store.as_mut(), path)?;
    let document = store::document_from_store(spdx_store.model())?;
    info!("Loaded document {}", document.object_uri);

    let mut report = ValidationReport::new().with_file(path);
    for warning in spdx_store.warnings() {
        report.add_issue(ValidationIssue::warning(warning.clone()));
    }

    if format.is_schema_bearing() {
        for message in schema::validate_json_schema(schema::SPDX_SCHEMA, path) {
            report.add_issue(ValidationIssue::error(message).with_location("schema"));
        }
    }

    for issue in validation::verify_document(spdx_store.model(), &document_uri) {
        report.add_issue(issue);
    }

    info!(
        "Verification found {} issue(s). (Took {:.2?})",
        report.summary.total,
        start_time.elapsed()
    );
    Ok(report)
}

fn deserialize(store: &mut dyn SerializableStore, path: &Path) -> Result<String, ConverterError> {
    let file = File::open(path).map_err(|e| {
        ConverterError::Verification(format!("File {} not found: {e}", path.display()))
    })?;
    let mut reader = BufReader::new(file);
    store.deserialize(&mut reader).map_err(|e| match e.kind() {
        ErrorKind::NoDocument | ErrorKind::MultipleDocuments => e,
        ErrorKind::Io => ConverterError::Verification(format!("IO Error reading SPDX file: {e}")),
        _ => ConverterError::Verification(format!(
            "Analysis exception processing SPDX file: {e}"
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const VALID_TAG: &str = "\
SPDXVersion: SPDX-2.3
DataLicense: CC0-1.0
SPDXID: SPDXRef-DOCUMENT
DocumentName: tagged
DocumentNamespace: https://example.com/spdx/tagged
Creator: Tool: spdx-converter
Created: 2024-01-01T00:00:00Z

PackageName: pkg
SPDXID: SPDXRef-pkg
PackageDownloadLocation: NOASSERTION
FilesAnalyzed: false

Relationship: SPDXRef-DOCUMENT DESCRIBES SPDXRef-pkg
";

    #[test]
    fn test_valid_tag_value_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.spdx");
        fs::write(&path, VALID_TAG).unwrap();

        let messages = verify(&path, Format::Tag).unwrap();
        assert!(messages.is_empty(), "{messages:?}");
    }

    #[test]
    fn test_parser_warnings_come_first() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.spdx");
        let text = VALID_TAG.replace("FilesAnalyzed: false", "FilesAnalyzed: false\nNotATag: value");
        fs::write(&path, text.replace("DocumentName: tagged\n", "")).unwrap();

        let messages = verify(&path, Format::Tag).unwrap();
        assert_eq!(messages.len(), 2, "{messages:?}");
        assert!(messages[0].starts_with("Line "));
        assert_eq!(messages[1], "SPDXRef-DOCUMENT: missing required field name");
    }

    #[test]
    fn test_repeated_verification_gives_identical_messages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let doc = serde_json::json!({
            "spdxVersion": "SPDX-2.3",
            "dataLicense": "CC0-1.0",
            "SPDXID": "SPDXRef-DOCUMENT",
            "documentNamespace": "https://example.com/spdx/twice",
            "creationInfo": {
                "created": "2024-01-01T00:00:00Z",
                "creators": ["Tool: spdx-converter"]
            },
            "packages": [{
                "SPDXID": "SPDXRef-pkg",
                "name": "pkg",
                "downloadLocation": "NOASSERTION",
                "licenseConcluded": "MIT AND"
            }],
            "relationships": [{
                "spdxElementId": "SPDXRef-DOCUMENT",
                "relationshipType": "DESCRIBES",
                "relatedSpdxElement": "SPDXRef-pkg"
            }]
        });
        fs::write(&path, doc.to_string()).unwrap();

        let first = verify(&path, Format::Json).unwrap();
        let second = verify(&path, Format::Json).unwrap();
        assert_eq!(first, second);

        let report = verify_report(&path, Format::Json).unwrap();
        let schema_messages = report
            .issues
            .iter()
            .filter(|i| i.location.as_deref() == Some("schema"))
            .count();
        assert!(schema_messages >= 1, "{first:?}");
        assert!(first.contains(&"SPDXRef-DOCUMENT: missing required field name".to_string()));
        assert!(first.len() > schema_messages);
    }

    #[test]
    fn test_missing_file_is_a_verification_error() {
        let dir = tempdir().unwrap();
        let err = verify(&dir.path().join("missing.json"), Format::Json).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Verification);

        let err = verify(dir.path(), Format::Json).unwrap_err();
        assert!(err.to_string().contains("is not a file"));
    }

    #[test]
    fn test_unsupported_store_is_a_verification_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.xlsx");
        fs::write(&path, "").unwrap();
        let err = verify(&path, Format::Xlsx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Verification);
    }

    #[test]
    fn test_malformed_input_is_a_verification_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, "{ not json").unwrap();
        let err = verify(&path, Format::Json).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Verification);
        assert!(err.to_string().contains("Analysis exception"));
    }
}
