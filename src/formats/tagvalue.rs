//! SPDX tag/value format handler.
//!
//! Tag/value documents are parsed into the same document tree as JSON and
//! then loaded through [`super::tree`]. Parsing is line oriented and
//! tolerant: unknown tags, lines without a tag and unterminated `<text>`
//! blocks are recorded as warnings instead of failing the read.

use super::tree::{self, is_list_field};
use super::{Format, SerializableStore};
use crate::errors::ConverterError;
use crate::model::{self, DOCUMENT_SPDX_ID};
use crate::store::{self, InMemStore};
use log::warn;
use serde_json::{Map, Value};
use std::io::{Read, Write};

type Fields = Map<String, Value>;

/// Tag -> tree field, per section.
const DOCUMENT_TAGS: &[(&str, &str)] = &[
    ("SPDXVersion", "spdxVersion"),
    ("DataLicense", "dataLicense"),
    ("DocumentName", "name"),
    ("DocumentNamespace", "documentNamespace"),
    ("DocumentComment", "comment"),
];

const CREATION_TAGS: &[(&str, &str)] = &[
    ("LicenseListVersion", "licenseListVersion"),
    ("Creator", "creators"),
    ("Created", "created"),
    ("CreatorComment", "comment"),
];

const PACKAGE_TAGS: &[(&str, &str)] = &[
    ("PackageVersion", "versionInfo"),
    ("PackageFileName", "packageFileName"),
    ("PackageSupplier", "supplier"),
    ("PackageOriginator", "originator"),
    ("PackageDownloadLocation", "downloadLocation"),
    ("FilesAnalyzed", "filesAnalyzed"),
    ("PackageHomePage", "homepage"),
    ("PackageSourceInfo", "sourceInfo"),
    ("PackageLicenseConcluded", "licenseConcluded"),
    ("PackageLicenseInfoFromFiles", "licenseInfoFromFiles"),
    ("PackageLicenseDeclared", "licenseDeclared"),
    ("PackageLicenseComments", "licenseComments"),
    ("PackageCopyrightText", "copyrightText"),
    ("PackageSummary", "summary"),
    ("PackageDescription", "description"),
    ("PackageComment", "comment"),
    ("PackageAttributionText", "attributionTexts"),
    ("PrimaryPackagePurpose", "primaryPackagePurpose"),
    ("ReleaseDate", "releaseDate"),
    ("BuiltDate", "builtDate"),
    ("ValidUntilDate", "validUntilDate"),
];

const FILE_TAGS: &[(&str, &str)] = &[
    ("FileType", "fileTypes"),
    ("LicenseConcluded", "licenseConcluded"),
    ("LicenseInfoInFile", "licenseInfoInFiles"),
    ("LicenseComments", "licenseComments"),
    ("FileCopyrightText", "copyrightText"),
    ("FileComment", "comment"),
    ("FileNotice", "noticeText"),
    ("FileContributor", "fileContributors"),
    ("FileAttributionText", "attributionTexts"),
];

const LICENSE_TAGS: &[(&str, &str)] = &[
    ("ExtractedText", "extractedText"),
    ("LicenseName", "name"),
    ("LicenseCrossReference", "seeAlsos"),
    ("LicenseComment", "comment"),
];

const ANNOTATION_TAGS: &[(&str, &str)] = &[
    ("AnnotationDate", "annotationDate"),
    ("AnnotationType", "annotationType"),
    ("AnnotationComment", "comment"),
];

/// Fields always written inside `<text>` blocks.
const FREE_TEXT_FIELDS: &[&str] = &[
    "comment",
    "copyrightText",
    "licenseComments",
    "extractedText",
    "description",
    "summary",
    "noticeText",
    "sourceInfo",
    "attributionTexts",
];

fn field_for(table: &[(&'static str, &'static str)], tag: &str) -> Option<&'static str> {
    table.iter().find(|(t, _)| *t == tag).map(|(_, f)| *f)
}

/// Store for SPDX tag/value documents.
#[derive(Debug, Default)]
pub struct TagValueStore {
    store: InMemStore,
    warnings: Vec<String>,
}

impl TagValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SerializableStore for TagValueStore {
    fn format(&self) -> Format {
        Format::Tag
    }

    fn model(&self) -> &InMemStore {
        &self.store
    }

    fn model_mut(&mut self) -> &mut InMemStore {
        &mut self.store
    }

    fn deserialize(&mut self, reader: &mut dyn Read) -> Result<String, ConverterError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| ConverterError::Decode(format!("Failed to read tag/value input: {e}")))?;
        let (tree, warnings) = parse(&text);
        let (store, document_uri) = tree::read_tree(&tree)?;
        for warning in &warnings {
            warn!("{warning}");
        }
        self.store = store;
        self.warnings = warnings;
        Ok(document_uri)
    }

    fn serialize(&self, writer: &mut dyn Write) -> Result<(), ConverterError> {
        let document = store::document_from_store(&self.store)?;
        let tree = tree::write_tree(&self.store, model::namespace_of(&document.object_uri))?;
        writer
            .write_all(render(&tree).as_bytes())
            .map_err(|e| ConverterError::Io(e, "Failed to write tag/value output".to_string()))
    }

    fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

// --- Parsing ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Document,
    Package,
    File,
    License,
    Relationship,
    Annotation,
    Snippet,
}

#[derive(Default)]
struct Annotation {
    fields: Fields,
    target: Option<String>,
}

struct Parser {
    section: Section,
    document: Fields,
    creation_info: Fields,
    packages: Vec<Fields>,
    /// Files with the index of the package they were listed under.
    files: Vec<(Fields, Option<usize>)>,
    licenses: Vec<Fields>,
    relationships: Vec<Fields>,
    annotations: Vec<Annotation>,
    warnings: Vec<String>,
    snippets_seen: bool,
}

/// Parses tag/value text into a document tree, returning the recoverable
/// problems found on the way.
pub fn parse(text: &str) -> (Value, Vec<String>) {
    let mut parser = Parser {
        section: Section::Document,
        document: Fields::new(),
        creation_info: Fields::new(),
        packages: Vec::new(),
        files: Vec::new(),
        licenses: Vec::new(),
        relationships: Vec::new(),
        annotations: Vec::new(),
        warnings: Vec::new(),
        snippets_seen: false,
    };

    let mut lines = text.lines().enumerate();
    while let Some((idx, line)) = lines.next() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((tag, value)) = trimmed
            .split_once(':')
            .filter(|(tag, _)| !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric()))
        else {
            parser.warn(line_no, format!("no tag found in \"{trimmed}\""));
            continue;
        };

        let mut value = value.trim().to_string();
        if let Some(rest) = value.strip_prefix("<text>") {
            let mut body = rest.to_string();
            let mut closed = false;
            loop {
                if let Some(end) = body.find("</text>") {
                    body.truncate(end);
                    closed = true;
                    break;
                }
                match lines.next() {
                    Some((_, next)) => {
                        body.push('\n');
                        body.push_str(next);
                    }
                    None => break,
                }
            }
            if !closed {
                parser.warn(line_no, format!("<text> block for {tag} is not closed"));
            }
            value = body;
        }
        parser.handle(line_no, tag, value);
    }
    parser.finish()
}

impl Parser {
    fn warn(&mut self, line_no: usize, message: String) {
        self.warnings.push(format!("Line {line_no}: {message}"));
    }

    fn handle(&mut self, line_no: usize, tag: &str, value: String) {
        if let Some(field) = field_for(DOCUMENT_TAGS, tag) {
            set_field(&mut self.document, field, value);
            return;
        }
        if let Some(field) = field_for(CREATION_TAGS, tag) {
            set_field(&mut self.creation_info, field, value);
            return;
        }

        match tag {
            "SPDXID" => match self.section {
                Section::Document => set_field(&mut self.document, "SPDXID", value),
                Section::Package => self.current_package(line_no, tag, |p| {
                    set_field(p, "SPDXID", value)
                }),
                Section::File => self.current_file(line_no, tag, |f| set_field(f, "SPDXID", value)),
                _ => self.warn(line_no, "SPDXID outside of a document or element".to_string()),
            },
            "ExternalDocumentRef" => match parse_external_document_ref(&value) {
                Some(reference) => push_field(&mut self.document, "externalDocumentRefs", reference),
                None => self.warn(line_no, format!("invalid ExternalDocumentRef \"{value}\"")),
            },
            "PackageName" => {
                let mut package = Fields::new();
                package.insert("name".to_string(), Value::String(value));
                self.packages.push(package);
                self.section = Section::Package;
            }
            "PackageVerificationCode" => {
                let code = parse_verification_code(&value);
                self.current_package(line_no, tag, |p| {
                    p.insert("packageVerificationCode".to_string(), code);
                });
            }
            "PackageChecksum" => match parse_checksum(&value) {
                Some(checksum) => {
                    self.current_package(line_no, tag, |p| push_field(p, "checksums", checksum))
                }
                None => self.warn(line_no, format!("invalid checksum \"{value}\"")),
            },
            "ExternalRef" => match parse_external_ref(&value) {
                Some(reference) => {
                    self.current_package(line_no, tag, |p| push_field(p, "externalRefs", reference))
                }
                None => self.warn(line_no, format!("invalid ExternalRef \"{value}\"")),
            },
            "ExternalRefComment" => self.current_package(line_no, tag, |p| {
                if let Some(Value::Object(last)) = p
                    .get_mut("externalRefs")
                    .and_then(Value::as_array_mut)
                    .and_then(|refs| refs.last_mut())
                {
                    last.insert("comment".to_string(), Value::String(value));
                }
            }),
            "FileName" => {
                let mut file = Fields::new();
                file.insert("fileName".to_string(), Value::String(value));
                let owner = self.packages.len().checked_sub(1);
                self.files.push((file, owner));
                self.section = Section::File;
            }
            "FileChecksum" if self.section != Section::Snippet => match parse_checksum(&value) {
                Some(checksum) => {
                    self.current_file(line_no, tag, |f| push_field(f, "checksums", checksum))
                }
                None => self.warn(line_no, format!("invalid checksum \"{value}\"")),
            },
            "LicenseID" => {
                let mut license = Fields::new();
                license.insert("licenseId".to_string(), Value::String(value));
                self.licenses.push(license);
                self.section = Section::License;
            }
            "Relationship" => match parse_relationship(&value) {
                Some(relationship) => {
                    self.relationships.push(relationship);
                    self.section = Section::Relationship;
                }
                None => self.warn(line_no, format!("invalid Relationship \"{value}\"")),
            },
            "RelationshipComment" => match self.relationships.last_mut() {
                Some(r) => set_field(r, "comment", value),
                None => self.warn(line_no, "RelationshipComment without a Relationship".to_string()),
            },
            "Annotator" => {
                let mut annotation = Annotation::default();
                annotation
                    .fields
                    .insert("annotator".to_string(), Value::String(value));
                self.annotations.push(annotation);
                self.section = Section::Annotation;
            }
            "SPDXREF" => match self.annotations.last_mut() {
                Some(a) => a.target = Some(value),
                None => self.warn(line_no, "SPDXREF without an Annotator".to_string()),
            },
            _ if tag.starts_with("Snippet") => {
                self.section = Section::Snippet;
                if !self.snippets_seen {
                    self.snippets_seen = true;
                    self.warn(line_no, "snippets are not supported and will be dropped".to_string());
                }
            }
            _ => self.handle_section_tag(line_no, tag, value),
        }
    }

    fn handle_section_tag(&mut self, line_no: usize, tag: &str, value: String) {
        if let Some(field) = field_for(PACKAGE_TAGS, tag) {
            self.current_package(line_no, tag, |p| set_field(p, field, value));
        } else if let Some(field) = field_for(FILE_TAGS, tag) {
            // Snippets share LicenseConcluded and friends with files
            if self.section != Section::Snippet {
                self.current_file(line_no, tag, |f| set_field(f, field, value));
            }
        } else if let Some(field) = field_for(LICENSE_TAGS, tag) {
            match self.licenses.last_mut() {
                Some(l) if self.section == Section::License => set_field(l, field, value),
                _ => self.warn(line_no, format!("{tag} outside of an extracted license")),
            }
        } else if let Some(field) = field_for(ANNOTATION_TAGS, tag) {
            match self.annotations.last_mut() {
                Some(a) => set_field(&mut a.fields, field, value),
                None => self.warn(line_no, format!("{tag} without an Annotator")),
            }
        } else if self.section == Section::Snippet {
            // Remaining snippet tags (LicenseInfoInSnippet...) are dropped
        } else {
            self.warn(line_no, format!("unknown tag {tag}"));
        }
    }

    fn current_package(&mut self, line_no: usize, tag: &str, apply: impl FnOnce(&mut Fields)) {
        match self.packages.last_mut() {
            Some(package) if self.section == Section::Package => apply(package),
            _ => self.warn(line_no, format!("{tag} outside of a package")),
        }
    }

    fn current_file(&mut self, line_no: usize, tag: &str, apply: impl FnOnce(&mut Fields)) {
        match self.files.last_mut() {
            Some((file, _)) if self.section == Section::File => apply(file),
            _ => self.warn(line_no, format!("{tag} outside of a file")),
        }
    }

    fn finish(mut self) -> (Value, Vec<String>) {
        let mut document = std::mem::take(&mut self.document);
        if !self.creation_info.is_empty() {
            document.insert(
                "creationInfo".to_string(),
                Value::Object(std::mem::take(&mut self.creation_info)),
            );
        }

        let mut packages = std::mem::take(&mut self.packages);
        for (file, owner) in &self.files {
            if let (Some(owner), Some(id)) = (owner, file.get("SPDXID")) {
                push_field(&mut packages[*owner], "hasFiles", id.clone());
            }
        }
        let mut files: Vec<Fields> = std::mem::take(&mut self.files)
            .into_iter()
            .map(|(file, _)| file)
            .collect();

        let doc_id = document
            .get("SPDXID")
            .and_then(Value::as_str)
            .unwrap_or(DOCUMENT_SPDX_ID)
            .to_string();
        for annotation in std::mem::take(&mut self.annotations) {
            let target = annotation.target.as_deref().unwrap_or(&doc_id);
            let holder = if target == doc_id {
                Some(&mut document)
            } else {
                packages
                    .iter_mut()
                    .chain(files.iter_mut())
                    .find(|e| e.get("SPDXID").and_then(Value::as_str) == Some(target))
            };
            match holder {
                Some(holder) => push_field(holder, "annotations", Value::Object(annotation.fields)),
                None => self
                    .warnings
                    .push(format!("Annotation target {target} is not in the document")),
            }
        }

        if !packages.is_empty() {
            document.insert("packages".to_string(), objects(packages));
        }
        if !files.is_empty() {
            document.insert("files".to_string(), objects(files));
        }
        if !self.licenses.is_empty() {
            document.insert(
                "hasExtractedLicensingInfos".to_string(),
                objects(std::mem::take(&mut self.licenses)),
            );
        }
        if !self.relationships.is_empty() {
            document.insert(
                "relationships".to_string(),
                objects(std::mem::take(&mut self.relationships)),
            );
        }
        (Value::Object(document), self.warnings)
    }
}

fn objects(items: Vec<Fields>) -> Value {
    Value::Array(items.into_iter().map(Value::Object).collect())
}

fn set_field(fields: &mut Fields, field: &str, value: String) {
    if is_list_field(field) {
        push_field(fields, field, Value::String(value));
    } else {
        fields.insert(field.to_string(), Value::String(value));
    }
}

fn push_field(fields: &mut Fields, field: &str, value: Value) {
    match fields
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        Value::Array(items) => items.push(value),
        other => *other = Value::Array(vec![other.take(), value]),
    }
}

/// `SHA1: d6a7...`
fn parse_checksum(value: &str) -> Option<Value> {
    let (algorithm, checksum) = value.split_once(':')?;
    let (algorithm, checksum) = (algorithm.trim(), checksum.trim());
    if algorithm.is_empty() || checksum.is_empty() {
        return None;
    }
    let mut fields = Fields::new();
    fields.insert("algorithm".to_string(), algorithm.into());
    fields.insert("checksumValue".to_string(), checksum.into());
    Some(Value::Object(fields))
}

/// `DocumentRef-x https://example.com/doc SHA1: d6a7...`
fn parse_external_document_ref(value: &str) -> Option<Value> {
    let mut parts = value.split_whitespace();
    let id = parts.next()?;
    let document = parts.next()?;
    let checksum = parse_checksum(&parts.collect::<Vec<_>>().join(" "))?;
    let mut fields = Fields::new();
    fields.insert("externalDocumentId".to_string(), id.into());
    fields.insert("spdxDocument".to_string(), document.into());
    fields.insert("checksum".to_string(), checksum);
    Some(Value::Object(fields))
}

/// `d6a7... (excludes: ./a, ./b)`
fn parse_verification_code(value: &str) -> Value {
    let mut fields = Fields::new();
    let (code, excludes) = match value.split_once('(') {
        Some((code, rest)) => (code.trim(), Some(rest.trim_end().trim_end_matches(')'))),
        None => (value.trim(), None),
    };
    fields.insert("packageVerificationCodeValue".to_string(), code.into());
    if let Some(excludes) = excludes {
        let excludes = excludes.trim();
        let excludes = excludes
            .strip_prefix("excludes:")
            .or_else(|| excludes.strip_prefix("excludes"))
            .unwrap_or(excludes);
        let files: Vec<Value> = excludes
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(Value::from)
            .collect();
        if !files.is_empty() {
            fields.insert(
                "packageVerificationCodeExcludedFiles".to_string(),
                Value::Array(files),
            );
        }
    }
    Value::Object(fields)
}

/// `SECURITY cpe23Type cpe:2.3:a:...`
fn parse_external_ref(value: &str) -> Option<Value> {
    let mut parts = value.split_whitespace();
    let (category, kind, locator) = (parts.next()?, parts.next()?, parts.next()?);
    let mut fields = Fields::new();
    fields.insert("referenceCategory".to_string(), category.into());
    fields.insert("referenceType".to_string(), kind.into());
    fields.insert("referenceLocator".to_string(), locator.into());
    Some(Value::Object(fields))
}

/// `SPDXRef-a CONTAINS SPDXRef-b`
fn parse_relationship(value: &str) -> Option<Fields> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    let [from, kind, to] = parts.as_slice() else {
        return None;
    };
    let mut fields = Fields::new();
    fields.insert("spdxElementId".to_string(), (*from).into());
    fields.insert("relationshipType".to_string(), (*kind).into());
    fields.insert("relatedSpdxElement".to_string(), (*to).into());
    Some(fields)
}

// --- Rendering ---

/// Renders a document tree as tag/value text.
pub fn render(tree: &Value) -> String {
    let mut out = TagWriter::default();
    let Some(doc) = tree.as_object() else {
        return String::new();
    };
    let doc_id = doc
        .get("SPDXID")
        .and_then(Value::as_str)
        .unwrap_or(DOCUMENT_SPDX_ID);

    out.comment("Document Information");
    out.fields(doc, &DOCUMENT_TAGS[..2]);
    out.tag("SPDXID", doc_id);
    out.fields(doc, &DOCUMENT_TAGS[2..]);
    for reference in items(doc, "externalDocumentRefs") {
        let checksum = reference.get("checksum");
        out.tag(
            "ExternalDocumentRef",
            &format!(
                "{} {} {}",
                text(reference, "externalDocumentId"),
                text(reference, "spdxDocument"),
                checksum.map(checksum_text).unwrap_or_default()
            ),
        );
    }
    if let Some(Value::Object(info)) = doc.get("creationInfo") {
        out.comment("Creation Info");
        out.fields(info, CREATION_TAGS);
    }
    write_annotations(&mut out, doc, doc_id);

    let packages = items(doc, "packages");
    let files = items(doc, "files");
    let packaged: Vec<&str> = packages
        .iter()
        .copied()
        .flat_map(|p| list(p, "hasFiles"))
        .collect();

    let unpackaged: Vec<_> = files
        .iter()
        .filter(|f| !packaged.contains(&text(f, "SPDXID")))
        .collect();
    if !unpackaged.is_empty() {
        out.comment("Unpackaged Files");
        for file in unpackaged {
            write_file(&mut out, file);
        }
    }

    let mut written: Vec<&str> = Vec::new();
    for package in packages {
        out.comment("Package Information");
        out.tag("PackageName", text(package, "name"));
        out.tag("SPDXID", text(package, "SPDXID"));
        out.fields(package, &PACKAGE_TAGS[..6]);
        if let Some(Value::Object(code)) = package.get("packageVerificationCode") {
            let value = text(code, "packageVerificationCodeValue");
            let excluded = list(code, "packageVerificationCodeExcludedFiles");
            if excluded.is_empty() {
                out.tag("PackageVerificationCode", value);
            } else {
                out.tag(
                    "PackageVerificationCode",
                    &format!("{value} (excludes: {})", excluded.join(", ")),
                );
            }
        }
        for checksum in package.get("checksums").and_then(Value::as_array).into_iter().flatten() {
            out.tag("PackageChecksum", &checksum_text(checksum));
        }
        out.fields(package, &PACKAGE_TAGS[6..]);
        for reference in items(package, "externalRefs") {
            out.tag(
                "ExternalRef",
                &format!(
                    "{} {} {}",
                    text(reference, "referenceCategory"),
                    text(reference, "referenceType"),
                    text(reference, "referenceLocator")
                ),
            );
            if let Some(comment) = reference.get("comment").and_then(Value::as_str) {
                out.tag("ExternalRefComment", comment);
            }
        }
        write_annotations(&mut out, package, text(package, "SPDXID"));

        for file_id in list(package, "hasFiles") {
            if written.contains(&file_id) {
                continue;
            }
            if let Some(file) = files.iter().find(|f| text(f, "SPDXID") == file_id) {
                write_file(&mut out, file);
                written.push(file_id);
            }
        }
    }

    let licenses = items(doc, "hasExtractedLicensingInfos");
    if !licenses.is_empty() {
        out.comment("License Information");
    }
    for license in licenses {
        out.tag("LicenseID", text(license, "licenseId"));
        out.fields(license, LICENSE_TAGS);
        if license.get("crossRefs").is_some() {
            warn!(
                "License details of {} can not be written as tag/value and are dropped",
                text(license, "licenseId")
            );
        }
    }

    let relationships = items(doc, "relationships");
    let described: Vec<&str> = list(doc, "documentDescribes")
        .into_iter()
        .filter(|id| {
            !relationships.iter().any(|r| {
                text(r, "spdxElementId") == doc_id
                    && text(r, "relationshipType") == "DESCRIBES"
                    && text(r, "relatedSpdxElement") == *id
            })
        })
        .collect();
    if !relationships.is_empty() || !described.is_empty() {
        out.comment("Relationships");
    }
    for id in described {
        out.tag("Relationship", &format!("{doc_id} DESCRIBES {id}"));
    }
    for relationship in relationships {
        out.tag(
            "Relationship",
            &format!(
                "{} {} {}",
                text(relationship, "spdxElementId"),
                text(relationship, "relationshipType"),
                text(relationship, "relatedSpdxElement")
            ),
        );
        if let Some(comment) = relationship.get("comment").and_then(Value::as_str) {
            out.tag("RelationshipComment", comment);
        }
    }
    out.finish()
}

fn write_file(out: &mut TagWriter, file: &Fields) {
    out.comment("File Information");
    out.tag("FileName", text(file, "fileName"));
    out.tag("SPDXID", text(file, "SPDXID"));
    for checksum in file.get("checksums").and_then(Value::as_array).into_iter().flatten() {
        out.tag("FileChecksum", &checksum_text(checksum));
    }
    out.fields(file, FILE_TAGS);
    write_annotations(out, file, text(file, "SPDXID"));
}

fn write_annotations(out: &mut TagWriter, element: &Fields, element_id: &str) {
    for annotation in items(element, "annotations") {
        out.tag("Annotator", text(annotation, "annotator"));
        out.fields(annotation, &ANNOTATION_TAGS[..2]);
        out.tag("SPDXREF", element_id);
        out.fields(annotation, &ANNOTATION_TAGS[2..]);
    }
}

fn items<'a>(fields: &'a Fields, name: &str) -> Vec<&'a Fields> {
    fields
        .get(name)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

fn list<'a>(fields: &'a Fields, name: &str) -> Vec<&'a str> {
    fields
        .get(name)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn text<'a>(fields: &'a Fields, name: &str) -> &'a str {
    fields.get(name).and_then(Value::as_str).unwrap_or_default()
}

fn checksum_text(checksum: &Value) -> String {
    format!(
        "{}: {}",
        checksum["algorithm"].as_str().unwrap_or_default(),
        checksum["checksumValue"].as_str().unwrap_or_default()
    )
}

#[derive(Default)]
struct TagWriter {
    out: String,
}

impl TagWriter {
    fn comment(&mut self, title: &str) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        self.out.push_str("## ");
        self.out.push_str(title);
        self.out.push('\n');
    }

    fn tag(&mut self, tag: &str, value: &str) {
        self.tag_for_field(tag, "", value);
    }

    fn tag_for_field(&mut self, tag: &str, field: &str, value: &str) {
        if value.contains('\n') || FREE_TEXT_FIELDS.contains(&field) {
            self.out.push_str(&format!("{tag}: <text>{value}</text>\n"));
        } else {
            self.out.push_str(&format!("{tag}: {value}\n"));
        }
    }

    /// Writes every field of `table` present in `fields`, one line per list
    /// item.
    fn fields(&mut self, fields: &Fields, table: &[(&str, &str)]) {
        for (tag, field) in table {
            match fields.get(*field) {
                Some(Value::Array(items)) => {
                    for item in items {
                        if let Some(value) = scalar(item) {
                            self.tag_for_field(tag, field, &value);
                        }
                    }
                }
                Some(value) => {
                    if let Some(value) = scalar(value) {
                        self.tag_for_field(tag, field, &value);
                    }
                }
                None => {}
            }
        }
    }

    fn finish(self) -> String {
        self.out
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
