//! Semantic verification of SPDX 2.x documents
//!
//! Checks the rules a schema cannot express: mandatory fields, identifier
//! shapes, license expressions, timestamps and relationship endpoints.
//! Every issue names the element and the field it was found on.

use crate::license::LicenseExpression;
use crate::model::{
    self, CLASS_ANNOTATION, CLASS_CHECKSUM, CLASS_EXTERNAL_DOC_REF, CLASS_EXTERNAL_REF,
    CLASS_EXTRACTED_LICENSE, CLASS_FILE, CLASS_PACKAGE, CLASS_RELATIONSHIP, DOCUMENT_REF_PREFIX,
    LICENSE_REF_PREFIX, ModelObject, NOASSERTION, NONE, Value,
};
use crate::store::{self, ModelStore};
use crate::versions;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Validation severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single validation issue with context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub message: String,
    /// Element id, or JSON instance path for schema issues.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ValidationIssue {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            location: None,
            field: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            location: None,
            field: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Validation result containing all issues found
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub summary: ValidationSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub errors: usize,
    pub warnings: usize,
    pub total: usize,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            issues: Vec::new(),
            file_path: None,
            summary: ValidationSummary::default(),
        }
    }

    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().display().to_string());
        self
    }

    /// Adds an issue unless one with the same message is already present.
    pub fn add_issue(&mut self, issue: ValidationIssue) {
        if self.issues.iter().any(|i| i.message == issue.message) {
            return;
        }
        self.issues.push(issue);
        self.update_summary();
    }

    fn update_summary(&mut self) {
        self.summary.errors = self.error_count();
        self.summary.warnings = self.warning_count();
        self.summary.total = self.issues.len();
    }

    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// The messages of every issue, in the order they were found.
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.message.clone()).collect()
    }

    /// Convert the report to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub const DATA_LICENSE: &str = "CC0-1.0";

const CREATOR_PREFIXES: &[&str] = &["Tool:", "Person:", "Organization:"];

const ANNOTATION_TYPES: &[&str] = &["REVIEW", "OTHER"];

const REFERENCE_CATEGORIES: &[&str] = &[
    "SECURITY",
    "PACKAGE-MANAGER",
    "PACKAGE_MANAGER",
    "PERSISTENT-ID",
    "PERSISTENT_ID",
    "OTHER",
];

const CHECKSUM_ALGORITHMS: &[&str] = &[
    "SHA1", "SHA224", "SHA256", "SHA384", "SHA512", "SHA3-256", "SHA3-384", "SHA3-512",
    "BLAKE2b-256", "BLAKE2b-384", "BLAKE2b-512", "BLAKE3", "MD2", "MD4", "MD5", "MD6", "ADLER32",
];

pub const RELATIONSHIP_TYPES: &[&str] = &[
    "DESCRIBES",
    "DESCRIBED_BY",
    "CONTAINS",
    "CONTAINED_BY",
    "DEPENDS_ON",
    "DEPENDENCY_OF",
    "DEPENDENCY_MANIFEST_OF",
    "BUILD_DEPENDENCY_OF",
    "DEV_DEPENDENCY_OF",
    "OPTIONAL_DEPENDENCY_OF",
    "PROVIDED_DEPENDENCY_OF",
    "TEST_DEPENDENCY_OF",
    "RUNTIME_DEPENDENCY_OF",
    "EXAMPLE_OF",
    "GENERATES",
    "GENERATED_FROM",
    "ANCESTOR_OF",
    "DESCENDANT_OF",
    "VARIANT_OF",
    "DISTRIBUTION_ARTIFACT",
    "PATCH_FOR",
    "PATCH_APPLIED",
    "COPY_OF",
    "FILE_ADDED",
    "FILE_DELETED",
    "FILE_MODIFIED",
    "EXPANDED_FROM_ARCHIVE",
    "DYNAMIC_LINK",
    "STATIC_LINK",
    "DATA_FILE_OF",
    "TEST_CASE_OF",
    "BUILD_TOOL_OF",
    "DEV_TOOL_OF",
    "TEST_OF",
    "TEST_TOOL_OF",
    "DOCUMENTATION_OF",
    "OPTIONAL_COMPONENT_OF",
    "METAFILE_OF",
    "PACKAGE_OF",
    "AMENDS",
    "PREREQUISITE_FOR",
    "HAS_PREREQUISITE",
    "REQUIREMENT_DESCRIPTION_FOR",
    "SPECIFICATION_FOR",
    "OTHER",
];

/// Runs every semantic rule over the document `document_uri` in `store`.
pub fn verify_document(store: &dyn ModelStore, document_uri: &str) -> Vec<ValidationIssue> {
    let mut verifier = Verifier {
        store,
        document_uri,
        issues: Vec::new(),
        declared_licenses: HashSet::new(),
    };
    verifier.run();
    verifier.issues
}

struct Verifier<'a> {
    store: &'a dyn ModelStore,
    document_uri: &'a str,
    issues: Vec<ValidationIssue>,
    declared_licenses: HashSet<String>,
}

impl<'a> Verifier<'a> {
    fn run(&mut self) {
        let model_store = self.store;
        for id in model_store.all_items(self.document_uri, Some(CLASS_EXTRACTED_LICENSE)) {
            self.declared_licenses.insert(model::local_id(&id.object_uri).to_string());
        }

        match store::document_from_store(model_store) {
            Ok(doc) => {
                if let Some(document) = model_store.get(&doc.object_uri) {
                    self.check_document(document);
                }
            }
            Err(e) => self.issues.push(ValidationIssue::error(e.to_string())),
        }

        for class in [
            CLASS_EXTERNAL_DOC_REF,
            CLASS_EXTRACTED_LICENSE,
            CLASS_PACKAGE,
            CLASS_FILE,
            CLASS_RELATIONSHIP,
        ] {
            for id in self.records(class) {
                match class {
                    CLASS_EXTERNAL_DOC_REF => self.check_external_document_ref(id),
                    CLASS_EXTRACTED_LICENSE => self.check_extracted_license(id),
                    CLASS_PACKAGE => self.check_package(id),
                    CLASS_FILE => self.check_file(id),
                    _ => self.check_relationship(id),
                }
            }
        }
    }

    fn records(&self, class: &str) -> Vec<&'a ModelObject> {
        let store = self.store;
        store
            .all_items(self.document_uri, Some(class))
            .filter_map(|id| store.get(&id.object_uri))
            .collect()
    }

    fn report(&mut self, element: &str, field: &str, message: String) {
        self.issues.push(
            ValidationIssue::error(message)
                .with_location(element)
                .with_field(field),
        );
    }

    fn require_text(&mut self, object: &ModelObject, element: &str, field: &str) -> bool {
        match object.get_str(field) {
            Some(text) if !text.trim().is_empty() => true,
            _ => {
                self.report(element, field, format!("{element}: missing required field {field}"));
                false
            }
        }
    }

    fn check_document(&mut self, document: &'a ModelObject) {
        let id = document.local_id().to_string();

        if self.require_text(document, &id, "spdxVersion")
            && let Some(version) = document.get_str("spdxVersion")
            && !versions::is_supported(version)
        {
            self.report(
                &id,
                "spdxVersion",
                format!(
                    "{id}: unsupported spdxVersion {version}, expected one of {}",
                    versions::supported_versions().join(", ")
                ),
            );
        }
        self.require_text(document, &id, "name");
        if self.require_text(document, &id, "dataLicense")
            && let Some(license) = document.get_str("dataLicense")
            && license != DATA_LICENSE
        {
            self.report(
                &id,
                "dataLicense",
                format!("{id}: invalid dataLicense {license}, must be {DATA_LICENSE}"),
            );
        }
        self.check_namespace(&id);

        match document.get_values("creationInfo").first().and_then(Value::as_reference) {
            Some(uri) => {
                let store = self.store;
                if let Some(info) = store.get(uri) {
                    self.check_creation_info(&id, info);
                }
            }
            None => self.report(&id, "creationInfo", format!("{id}: missing required field creationInfo")),
        }

        if !self.describes_something(document) {
            self.report(
                &id,
                "documentDescribes",
                format!("{id}: document must describe at least one element"),
            );
        }

        self.check_annotations(document, &id);
    }

    fn check_namespace(&mut self, id: &str) {
        let namespace = self.document_uri;
        let has_scheme = namespace.split_once(':').is_some_and(|(scheme, rest)| {
            !scheme.is_empty()
                && !rest.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c))
        });
        if !has_scheme {
            self.report(
                id,
                "documentNamespace",
                format!("{id}: documentNamespace {namespace} is not a valid URI"),
            );
        } else if namespace.contains('#') {
            self.report(
                id,
                "documentNamespace",
                format!("{id}: documentNamespace {namespace} must not contain '#'"),
            );
        }
    }

    fn check_creation_info(&mut self, id: &str, info: &ModelObject) {
        match info.get_str("created") {
            Some(created) => {
                if !is_timestamp(created) {
                    self.report(
                        id,
                        "created",
                        format!("{id}: invalid created timestamp {created}, expected YYYY-MM-DDThh:mm:ssZ"),
                    );
                }
            }
            None => self.report(id, "created", format!("{id}: missing required field created")),
        }

        let creators = info.get_values("creators");
        if creators.is_empty() {
            self.report(id, "creators", format!("{id}: missing required field creators"));
        }
        for creator in creators.iter().filter_map(Value::as_str) {
            if !has_actor_prefix(creator) {
                self.report(
                    id,
                    "creators",
                    format!("{id}: invalid creator {creator}, must start with Tool:, Person: or Organization:"),
                );
            }
        }
    }

    fn describes_something(&self, document: &ModelObject) -> bool {
        if !document.get_values("documentDescribes").is_empty() {
            return true;
        }
        let doc_uri = document.id.object_uri.as_str();
        self.records(CLASS_RELATIONSHIP).into_iter().any(|rel| {
            let source = rel.get_values("spdxElementId").first().and_then(Value::as_reference);
            let target = rel.get_values("relatedSpdxElement").first().and_then(Value::as_reference);
            match rel.get_str("relationshipType") {
                Some("DESCRIBES") => source == Some(doc_uri),
                Some("DESCRIBED_BY") => target == Some(doc_uri),
                _ => false,
            }
        })
    }

    fn check_external_document_ref(&mut self, object: &ModelObject) {
        let id = object.local_id().to_string();
        if !id.starts_with(DOCUMENT_REF_PREFIX) {
            self.report(
                &id,
                "externalDocumentId",
                format!("{id}: external document id must start with {DOCUMENT_REF_PREFIX}"),
            );
        }
        self.require_text(object, &id, "spdxDocument");
        match object.get_values("checksum").first().and_then(Value::as_reference) {
            Some(uri) => {
                let store = self.store;
                if let Some(checksum) = store.get(uri) {
                    self.check_checksum(&id, "checksum", checksum);
                    if checksum.get_str("algorithm") != Some("SHA1") {
                        self.report(
                            &id,
                            "checksum",
                            format!("{id}: external document reference checksum must be SHA1"),
                        );
                    }
                }
            }
            None => self.report(&id, "checksum", format!("{id}: missing required field checksum")),
        }
    }

    fn check_extracted_license(&mut self, object: &ModelObject) {
        let id = object.local_id().to_string();
        if !id.starts_with(LICENSE_REF_PREFIX) {
            self.report(
                &id,
                "licenseId",
                format!("{id}: extracted license id must start with {LICENSE_REF_PREFIX}"),
            );
        }
        self.require_text(object, &id, "extractedText");
    }

    fn check_element_id(&mut self, object: &ModelObject, id: &str) {
        if !store::is_spdx_id(id) {
            self.report(
                id,
                "SPDXID",
                format!("{id}: invalid SPDX identifier, must be SPDXRef- followed by letters, digits, '.' or '-'"),
            );
        }
        self.check_annotations(object, id);
    }

    fn check_package(&mut self, package: &'a ModelObject) {
        let id = package.local_id().to_string();
        self.check_element_id(package, &id);
        self.require_text(package, &id, "name");
        self.require_text(package, &id, "downloadLocation");

        for field in ["licenseConcluded", "licenseDeclared", "licenseInfoFromFiles"] {
            self.check_licenses(package, &id, field);
        }
        for field in ["supplier", "originator"] {
            if let Some(actor) = package.get_str(field)
                && actor != NOASSERTION
                && !has_actor_prefix(actor)
            {
                self.report(
                    &id,
                    field,
                    format!("{id}: invalid {field} {actor}, must be NOASSERTION or start with Person: or Organization:"),
                );
            }
        }
        for field in ["releaseDate", "builtDate", "validUntilDate"] {
            if let Some(date) = package.get_str(field)
                && !is_timestamp(date)
            {
                self.report(&id, field, format!("{id}: invalid {field} {date}, expected YYYY-MM-DDThh:mm:ssZ"));
            }
        }

        for checksum in self.nested(package, "checksums", CLASS_CHECKSUM) {
            self.check_checksum(&id, "checksums", checksum);
        }
        if let Some(code) = self.nested(package, "packageVerificationCode", "").first() {
            match code.get_str("packageVerificationCodeValue") {
                Some(value) if is_hex(value, 40) => {}
                Some(value) => self.report(
                    &id,
                    "packageVerificationCode",
                    format!("{id}: invalid packageVerificationCode {value}, expected 40 hex digits"),
                ),
                None => self.report(
                    &id,
                    "packageVerificationCode",
                    format!("{id}: missing required field packageVerificationCodeValue"),
                ),
            }
        }
        for reference in self.nested(package, "externalRefs", CLASS_EXTERNAL_REF) {
            self.check_external_ref(&id, reference);
        }
    }

    fn check_file(&mut self, file: &'a ModelObject) {
        let id = file.local_id().to_string();
        self.check_element_id(file, &id);
        self.require_text(file, &id, "fileName");

        let checksums = self.nested(file, "checksums", CLASS_CHECKSUM);
        if !checksums.iter().any(|c| c.get_str("algorithm") == Some("SHA1")) {
            self.report(&id, "checksums", format!("{id}: missing required SHA1 checksum"));
        }
        for checksum in checksums {
            self.check_checksum(&id, "checksums", checksum);
        }
        for field in ["licenseConcluded", "licenseInfoInFiles"] {
            self.check_licenses(file, &id, field);
        }
    }

    fn check_relationship(&mut self, relationship: &ModelObject) {
        let source = relationship
            .get_values("spdxElementId")
            .first()
            .map(element_display);
        let target = relationship
            .get_values("relatedSpdxElement")
            .first()
            .map(element_display);
        let kind = relationship.get_str("relationshipType");
        let label = format!(
            "Relationship {} {} {}",
            source.as_deref().unwrap_or("?"),
            kind.unwrap_or("?"),
            target.as_deref().unwrap_or("?")
        );

        match kind {
            None => self.report(&label, "relationshipType", format!("{label}: missing required field relationshipType")),
            Some(kind) if !RELATIONSHIP_TYPES.contains(&kind) => self.report(
                &label,
                "relationshipType",
                format!("{label}: unknown relationshipType {kind}"),
            ),
            Some(_) => {}
        }

        match relationship.get_values("spdxElementId").first() {
            None => self.report(&label, "spdxElementId", format!("{label}: missing required field spdxElementId")),
            Some(Value::String(text)) => self.report(
                &label,
                "spdxElementId",
                format!("{label}: spdxElementId {text} does not reference an element of this document"),
            ),
            Some(_) => {}
        }

        match relationship.get_values("relatedSpdxElement").first() {
            None => self.report(
                &label,
                "relatedSpdxElement",
                format!("{label}: missing required field relatedSpdxElement"),
            ),
            Some(Value::String(text)) if text != NOASSERTION && text != NONE => self.report(
                &label,
                "relatedSpdxElement",
                format!("{label}: relatedSpdxElement {text} does not reference an element of this document"),
            ),
            Some(_) => {}
        }
    }

    fn check_annotations(&mut self, element: &ModelObject, id: &str) {
        for annotation in self.nested(element, "annotations", CLASS_ANNOTATION) {
            let label = format!("{id} annotation");
            match annotation.get_str("annotator") {
                Some(annotator) if has_actor_prefix(annotator) => {}
                Some(annotator) => self.report(
                    id,
                    "annotator",
                    format!("{label}: invalid annotator {annotator}, must start with Tool:, Person: or Organization:"),
                ),
                None => self.report(id, "annotator", format!("{label}: missing required field annotator")),
            }
            match annotation.get_str("annotationDate") {
                Some(date) if is_timestamp(date) => {}
                Some(date) => self.report(
                    id,
                    "annotationDate",
                    format!("{label}: invalid annotationDate {date}, expected YYYY-MM-DDThh:mm:ssZ"),
                ),
                None => self.report(id, "annotationDate", format!("{label}: missing required field annotationDate")),
            }
            match annotation.get_str("annotationType") {
                Some(kind) if ANNOTATION_TYPES.contains(&kind) => {}
                Some(kind) => self.report(
                    id,
                    "annotationType",
                    format!("{label}: invalid annotationType {kind}, must be REVIEW or OTHER"),
                ),
                None => self.report(id, "annotationType", format!("{label}: missing required field annotationType")),
            }
            if annotation.get_str("comment").is_none() {
                self.report(id, "comment", format!("{label}: missing required field comment"));
            }
        }
    }

    fn check_checksum(&mut self, id: &str, field: &str, checksum: &ModelObject) {
        let algorithm = checksum.get_str("algorithm").unwrap_or_default();
        if !CHECKSUM_ALGORITHMS.contains(&algorithm) {
            self.report(id, field, format!("{id}: unknown checksum algorithm {algorithm:?} in {field}"));
            return;
        }
        let value = checksum.get_str("checksumValue").unwrap_or_default();
        let expected = match algorithm {
            "SHA1" => Some(40),
            "SHA224" => Some(56),
            "SHA256" | "SHA3-256" | "BLAKE2b-256" => Some(64),
            "SHA384" | "SHA3-384" | "BLAKE2b-384" => Some(96),
            "SHA512" | "SHA3-512" | "BLAKE2b-512" => Some(128),
            "MD2" | "MD4" | "MD5" => Some(32),
            _ => None,
        };
        let valid = match expected {
            Some(len) => is_hex(value, len),
            None => !value.is_empty() && value.chars().all(|c| c.is_ascii_hexdigit()),
        };
        if !valid {
            self.report(
                id,
                field,
                format!("{id}: invalid {algorithm} checksum value {value:?} in {field}"),
            );
        }
    }

    fn check_external_ref(&mut self, id: &str, reference: &ModelObject) {
        match reference.get_str("referenceCategory") {
            Some(category) if REFERENCE_CATEGORIES.contains(&category) => {}
            Some(category) => self.report(
                id,
                "externalRefs",
                format!("{id}: unknown external reference category {category}"),
            ),
            None => self.report(id, "externalRefs", format!("{id}: external reference is missing referenceCategory")),
        }
        for field in ["referenceType", "referenceLocator"] {
            if reference.get_str(field).is_none_or(|v| v.trim().is_empty()) {
                self.report(id, "externalRefs", format!("{id}: external reference is missing {field}"));
            }
        }
    }

    fn check_licenses(&mut self, object: &ModelObject, id: &str, field: &str) {
        for text in object.get_values(field).iter().filter_map(Value::as_str) {
            let expression = LicenseExpression::new(text);
            if let Err(reason) = expression.check() {
                self.report(
                    id,
                    field,
                    format!("{id}: invalid license expression in {field} {text:?}: {reason}"),
                );
                continue;
            }
            for license_ref in expression.local_license_refs() {
                if !self.declared_licenses.contains(&license_ref) {
                    self.report(
                        id,
                        field,
                        format!("{id}: {field} uses {license_ref} which is not declared in the document"),
                    );
                }
            }
        }
    }

    /// Records referenced by an object property. An empty `class` accepts
    /// any type.
    fn nested(&self, object: &ModelObject, field: &str, class: &str) -> Vec<&'a ModelObject> {
        let store = self.store;
        object
            .get_values(field)
            .iter()
            .filter_map(Value::as_reference)
            .filter_map(|uri| store.get(uri))
            .filter(|nested| class.is_empty() || nested.id.type_name == class)
            .collect()
    }
}

fn element_display(value: &Value) -> String {
    match value {
        Value::Reference(uri) => model::local_id(uri).to_string(),
        Value::ExternalElement {
            document_ref,
            element_id,
        } => format!("{document_ref}:{element_id}"),
        Value::String(s) => s.clone(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
    }
}

fn has_actor_prefix(actor: &str) -> bool {
    CREATOR_PREFIXES.iter().any(|p| actor.starts_with(p))
}

fn is_timestamp(text: &str) -> bool {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%SZ").is_ok()
}

fn is_hex(text: &str, len: usize) -> bool {
    text.len() == len && text.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::tree::read_tree;
    use serde_json::{Value as JsonValue, json};

    fn valid_document() -> JsonValue {
        json!({
            "spdxVersion": "SPDX-2.3",
            "dataLicense": "CC0-1.0",
            "SPDXID": "SPDXRef-DOCUMENT",
            "name": "valid",
            "documentNamespace": "https://example.com/spdx/valid",
            "creationInfo": {
                "created": "2024-01-01T00:00:00Z",
                "creators": ["Tool: spdx-converter", "Organization: Example"]
            },
            "hasExtractedLicensingInfos": [{
                "licenseId": "LicenseRef-custom",
                "extractedText": "Custom terms"
            }],
            "packages": [{
                "SPDXID": "SPDXRef-pkg",
                "name": "pkg",
                "downloadLocation": "https://example.com/pkg.tar.gz",
                "licenseConcluded": "MIT OR LicenseRef-custom",
                "licenseDeclared": "NOASSERTION",
                "checksums": [{ "algorithm": "SHA256", "checksumValue": "a".repeat(64) }],
                "externalRefs": [{
                    "referenceCategory": "PACKAGE-MANAGER",
                    "referenceType": "purl",
                    "referenceLocator": "pkg:cargo/pkg@1.0.0"
                }]
            }],
            "files": [{
                "SPDXID": "SPDXRef-file",
                "fileName": "./src/lib.rs",
                "checksums": [{ "algorithm": "SHA1", "checksumValue": "d6a770ba38583ed4bb4525bd96e50461655d2758" }],
                "licenseConcluded": "MIT"
            }],
            "relationships": [
                { "spdxElementId": "SPDXRef-DOCUMENT", "relationshipType": "DESCRIBES", "relatedSpdxElement": "SPDXRef-pkg" },
                { "spdxElementId": "SPDXRef-pkg", "relationshipType": "CONTAINS", "relatedSpdxElement": "SPDXRef-file" }
            ]
        })
    }

    fn messages(tree: &JsonValue) -> Vec<String> {
        let (store, uri) = read_tree(tree).unwrap();
        verify_document(&store, &uri)
            .into_iter()
            .map(|i| i.message)
            .collect()
    }

    #[test]
    fn test_valid_document_has_no_issues() {
        let found = messages(&valid_document());
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn test_missing_mandatory_fields_are_named() {
        let mut doc = valid_document();
        doc.as_object_mut().unwrap().remove("name");
        doc["packages"][0].as_object_mut().unwrap().remove("downloadLocation");

        let found = messages(&doc);
        assert!(found.contains(&"SPDXRef-DOCUMENT: missing required field name".to_string()));
        assert!(found.contains(&"SPDXRef-pkg: missing required field downloadLocation".to_string()));
    }

    #[test]
    fn test_document_level_rules() {
        let mut doc = valid_document();
        doc["dataLicense"] = json!("MIT");
        doc["spdxVersion"] = json!("SPDX-1.2");
        doc["creationInfo"]["created"] = json!("yesterday");
        doc["creationInfo"]["creators"] = json!(["spdx-converter"]);
        doc["relationships"] = json!([]);

        let found = messages(&doc);
        assert!(found.iter().any(|m| m.contains("invalid dataLicense MIT")));
        assert!(found.iter().any(|m| m.contains("unsupported spdxVersion SPDX-1.2")));
        assert!(found.iter().any(|m| m.contains("invalid created timestamp yesterday")));
        assert!(found.iter().any(|m| m.contains("invalid creator spdx-converter")));
        assert!(found.iter().any(|m| m.contains("must describe at least one element")));
    }

    #[test]
    fn test_file_requires_sha1() {
        let mut doc = valid_document();
        doc["files"][0]["checksums"] = json!([{ "algorithm": "MD5", "checksumValue": "0".repeat(32) }]);
        assert_eq!(
            messages(&doc),
            vec!["SPDXRef-file: missing required SHA1 checksum".to_string()]
        );
    }

    #[test]
    fn test_license_expressions() {
        let mut doc = valid_document();
        doc["packages"][0]["licenseConcluded"] = json!("MIT AND");
        doc["files"][0]["licenseConcluded"] = json!("LicenseRef-undeclared");

        let found = messages(&doc);
        assert!(found.iter().any(|m| m.starts_with("SPDXRef-pkg: invalid license expression in licenseConcluded")));
        assert!(found.contains(
            &"SPDXRef-file: licenseConcluded uses LicenseRef-undeclared which is not declared in the document"
                .to_string()
        ));
    }

    #[test]
    fn test_unresolved_relationship_target() {
        let mut doc = valid_document();
        doc["relationships"][1]["relatedSpdxElement"] = json!("SPDXRef-missing");
        doc["relationships"][1]["relationshipType"] = json!("LIKES");

        let found = messages(&doc);
        assert!(found.contains(
            &"Relationship SPDXRef-pkg LIKES SPDXRef-missing: unknown relationshipType LIKES".to_string()
        ));
        assert!(found.iter().any(|m| m.contains("relatedSpdxElement SPDXRef-missing does not reference")));
    }

    #[test]
    fn test_annotations_are_checked() {
        let mut doc = valid_document();
        doc["packages"][0]["annotations"] = json!([{
            "annotator": "someone",
            "annotationDate": "2024-01-01T00:00:00Z",
            "annotationType": "REVIEW",
            "comment": "looks fine"
        }]);
        let found = messages(&doc);
        assert_eq!(found.len(), 1);
        assert!(found[0].starts_with("SPDXRef-pkg annotation: invalid annotator someone"));
    }

    #[test]
    fn test_report_deduplicates_messages() {
        let mut report = ValidationReport::new().with_file("doc.json");
        report.add_issue(ValidationIssue::warning("Line 3: unknown tag"));
        report.add_issue(ValidationIssue::error("a: missing required field b").with_location("a"));
        report.add_issue(ValidationIssue::error("a: missing required field b"));

        assert_eq!(report.summary.total, 2);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 1);
        assert!(!report.is_valid());
        let json = report.to_json().unwrap();
        assert!(json.contains("\"severity\": \"warning\""));
    }
}
