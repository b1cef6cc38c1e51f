//! Mapping between the object store and the SPDX 2.3 document tree.
//!
//! JSON, YAML and XML all serialize the same tree (the shape of the SPDX
//! JSON schema), and tag/value is read into and written from it as well.

use super::{Format, SerializableStore, json, xml, yaml};
use crate::errors::ConverterError;
use crate::model::{
    self, CLASS_FILE, CLASS_PACKAGE, CLASS_RELATIONSHIP, CLASS_SPDX_DOCUMENT, DOCUMENT_SPDX_ID,
    PropertyKind, PropertyValue, TypedValue, Value,
};
use crate::store::{self, IdKind, InMemStore, ModelStore};
use crate::versions::{self, SpdxVersion};
use log::{info, warn};
use serde_json::{Map, Value as JsonValue};
use std::io::{Read, Write};

/// Tree fields that hold the document's elements and relationships.
const ELEMENT_SECTIONS: &[(&str, &str)] = &[("packages", CLASS_PACKAGE), ("files", CLASS_FILE)];

/// True if the tree field `name` holds a list, whichever class it sits in.
pub fn is_list_field(name: &str) -> bool {
    name == "relationships"
        || ELEMENT_SECTIONS.iter().any(|(section, _)| *section == name)
        || model::ALL_CLASSES.iter().any(|class| {
            model::property_descriptor(class, name).is_some_and(|p| p.kind.is_list())
        })
}

/// Which concrete syntax a [`TreeStore`] reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeEncoding {
    Json,
    Yaml,
    Xml,
}

/// Store for the formats that share the SPDX JSON document tree.
#[derive(Debug)]
pub struct TreeStore {
    encoding: TreeEncoding,
    store: InMemStore,
}

impl TreeStore {
    pub fn new(encoding: TreeEncoding) -> Self {
        Self {
            encoding,
            store: InMemStore::new(),
        }
    }
}

impl SerializableStore for TreeStore {
    fn format(&self) -> Format {
        match self.encoding {
            TreeEncoding::Json => Format::Json,
            TreeEncoding::Yaml => Format::Yaml,
            TreeEncoding::Xml => Format::Xml,
        }
    }

    fn model(&self) -> &InMemStore {
        &self.store
    }

    fn model_mut(&mut self) -> &mut InMemStore {
        &mut self.store
    }

    fn deserialize(&mut self, reader: &mut dyn Read) -> Result<String, ConverterError> {
        let tree = match self.encoding {
            TreeEncoding::Json => json::read(reader)?,
            TreeEncoding::Yaml => yaml::read(reader)?,
            TreeEncoding::Xml => xml::read(reader)?,
        };
        let (store, document_uri) = read_tree(&tree)?;
        self.store = store;
        Ok(document_uri)
    }

    fn serialize(&self, writer: &mut dyn Write) -> Result<(), ConverterError> {
        let document = store::document_from_store(&self.store)?;
        let tree = write_tree(&self.store, model::namespace_of(&document.object_uri))?;
        match self.encoding {
            TreeEncoding::Json => json::write(writer, &tree),
            TreeEncoding::Yaml => yaml::write(writer, &tree),
            TreeEncoding::Xml => xml::write(writer, &tree),
        }
    }
}

// --- Tree -> store ---

/// Builds a fresh store from a document tree, returning it with the
/// document URI.
pub fn read_tree(tree: &JsonValue) -> Result<(InMemStore, String), ConverterError> {
    let obj = tree
        .as_object()
        .ok_or_else(|| ConverterError::Decode("SPDX document must be an object".to_string()))?;

    let spec_version = match versions::detect_version(tree) {
        SpdxVersion::V2(v) => v,
        SpdxVersion::V3 => {
            return Err(ConverterError::Decode(
                "SPDX 3 JSON-LD documents are not supported".to_string(),
            ));
        }
        SpdxVersion::Unknown => {
            return Err(ConverterError::Decode(
                "Not an SPDX document: no spdxVersion or documentNamespace".to_string(),
            ));
        }
    };
    let document_uri = obj
        .get("documentNamespace")
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConverterError::Decode("Missing required documentNamespace".to_string()))?
        .to_string();

    let mut reader = TreeReader {
        store: InMemStore::new(),
        document_uri,
        spec_version,
    };

    let doc_id = obj
        .get("SPDXID")
        .and_then(JsonValue::as_str)
        .unwrap_or(DOCUMENT_SPDX_ID);
    let doc_uri = reader.create(doc_id, CLASS_SPDX_DOCUMENT)?;

    // Every element exists before any property that may point at it is set.
    let mut elements = Vec::new();
    for (section, class) in ELEMENT_SECTIONS {
        for item in section_items(obj, section) {
            let id = reader.element_id(item, class);
            let uri = reader.create(&id, class)?;
            elements.push((uri, *class, item));
        }
    }
    if obj.get("snippets").is_some_and(|s| !s.is_null()) {
        warn!("Snippets are not supported and will be dropped");
    }

    reader.read_properties(&doc_uri, CLASS_SPDX_DOCUMENT, obj)?;
    for (uri, class, item) in elements {
        let fields = item.as_object().ok_or_else(|| {
            ConverterError::Decode(format!("{class} {} must be an object", model::local_id(&uri)))
        })?;
        reader.read_properties(&uri, class, fields)?;
    }
    for relationship in section_items(obj, "relationships") {
        reader.read_object(CLASS_RELATIONSHIP, relationship)?;
    }

    info!(
        "Read SPDX document {} ({} records)",
        reader.document_uri,
        reader.store.len()
    );
    Ok((reader.store, reader.document_uri))
}

fn section_items<'a>(obj: &'a Map<String, JsonValue>, section: &str) -> &'a [JsonValue] {
    obj.get(section)
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

struct TreeReader {
    store: InMemStore,
    document_uri: String,
    spec_version: String,
}

impl TreeReader {
    fn create(&mut self, local_id: &str, class: &str) -> Result<String, ConverterError> {
        let uri = model::qualify(&self.document_uri, local_id);
        self.store
            .create(&TypedValue::new(&uri, class, &self.spec_version))?;
        Ok(uri)
    }

    fn element_id(&mut self, item: &JsonValue, class: &str) -> String {
        match item.get("SPDXID").and_then(JsonValue::as_str) {
            Some(id) => id.trim().to_string(),
            None => {
                let id = self
                    .store
                    .next_identifier(IdKind::SpdxId, &self.document_uri);
                warn!("{class} without SPDXID, assigning {id}");
                id
            }
        }
    }

    /// Creates a nested record and returns its object URI.
    fn read_object(&mut self, class: &str, item: &JsonValue) -> Result<String, ConverterError> {
        let fields = item
            .as_object()
            .ok_or_else(|| ConverterError::Decode(format!("{class} must be an object")))?;
        let local = match model::id_field(class) {
            Some(field) => fields
                .get(field)
                .and_then(JsonValue::as_str)
                .map(|s| s.trim().to_string())
                .ok_or_else(|| {
                    ConverterError::Decode(format!("{class} is missing required {field}"))
                })?,
            None => self
                .store
                .next_identifier(IdKind::Anonymous, &self.document_uri),
        };
        let uri = self.create(&local, class)?;
        self.read_properties(&uri, class, fields)?;
        Ok(uri)
    }

    fn read_properties(
        &mut self,
        uri: &str,
        class: &str,
        fields: &Map<String, JsonValue>,
    ) -> Result<(), ConverterError> {
        for descriptor in model::properties_of(class) {
            let Some(raw) = fields.get(descriptor.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let value = self.convert(descriptor.name, descriptor.kind, raw)?;
            self.store.set_property(uri, descriptor.name, value)?;
        }
        Ok(())
    }

    fn convert(
        &mut self,
        name: &str,
        kind: PropertyKind,
        raw: &JsonValue,
    ) -> Result<PropertyValue, ConverterError> {
        let value = match kind {
            PropertyKind::Text => PropertyValue::Single(Value::String(scalar_text(name, raw)?)),
            PropertyKind::Boolean => PropertyValue::Single(Value::Boolean(boolean(name, raw)?)),
            PropertyKind::Integer => PropertyValue::Single(Value::Integer(integer(name, raw)?)),
            PropertyKind::TextList => PropertyValue::List(
                as_items(raw)
                    .iter()
                    .map(|v| scalar_text(name, v).map(Value::String))
                    .collect::<Result<_, _>>()?,
            ),
            PropertyKind::Object(class) => {
                PropertyValue::Single(Value::Reference(self.read_object(class, raw)?))
            }
            PropertyKind::ObjectList(class) => {
                let mut refs = Vec::new();
                for item in as_items(raw) {
                    refs.push(Value::Reference(self.read_object(class, item)?));
                }
                PropertyValue::List(refs)
            }
            PropertyKind::Element => {
                PropertyValue::Single(self.resolve_element(&scalar_text(name, raw)?))
            }
            PropertyKind::ElementList => PropertyValue::List(
                as_items(raw)
                    .iter()
                    .map(|v| scalar_text(name, v).map(|t| self.resolve_element(&t)))
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(value)
    }

    /// Turns an SPDX id into a reference when it names a known element.
    /// Unresolvable ids are kept as text for verification to report.
    fn resolve_element(&self, text: &str) -> Value {
        resolve_element(&self.store, &self.document_uri, text)
    }
}

/// Resolves an element id written in a document against the records of
/// `document_uri`.
pub fn resolve_element(store: &dyn ModelStore, document_uri: &str, text: &str) -> Value {
    let text = text.trim();
    if let Some((document_ref, element_id)) = model::split_external_element(text) {
        if store.exists(&model::qualify(document_uri, document_ref)) {
            return Value::ExternalElement {
                document_ref: document_ref.to_string(),
                element_id: element_id.to_string(),
            };
        }
        return Value::String(text.to_string());
    }
    let uri = model::qualify(document_uri, text);
    match store.get(&uri) {
        Some(obj) if is_element_class(&obj.id.type_name) => Value::Reference(uri),
        _ => Value::String(text.to_string()),
    }
}

pub fn is_element_class(class: &str) -> bool {
    matches!(class, CLASS_SPDX_DOCUMENT | CLASS_PACKAGE | CLASS_FILE)
}

fn as_items(raw: &JsonValue) -> &[JsonValue] {
    match raw {
        JsonValue::Array(items) => items,
        other => std::slice::from_ref(other),
    }
}

fn scalar_text(name: &str, raw: &JsonValue) -> Result<String, ConverterError> {
    match raw {
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::Bool(b) => Ok(b.to_string()),
        _ => Err(ConverterError::Decode(format!(
            "Expected a text value for {name}, found {raw}"
        ))),
    }
}

fn boolean(name: &str, raw: &JsonValue) -> Result<bool, ConverterError> {
    match raw {
        JsonValue::Bool(b) => Ok(*b),
        JsonValue::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(true),
        JsonValue::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(ConverterError::Decode(format!(
            "Expected a boolean for {name}, found {raw}"
        ))),
    }
}

fn integer(name: &str, raw: &JsonValue) -> Result<i64, ConverterError> {
    match raw {
        JsonValue::Number(n) if n.is_i64() => n
            .as_i64()
            .ok_or_else(|| ConverterError::Decode(format!("{name} is out of range"))),
        JsonValue::String(s) => s.trim().parse().map_err(|_| {
            ConverterError::Decode(format!("Expected an integer for {name}, found {s}"))
        }),
        _ => Err(ConverterError::Decode(format!(
            "Expected an integer for {name}, found {raw}"
        ))),
    }
}

// --- Store -> tree ---

/// Builds the document tree for `document_uri`.
pub fn write_tree(store: &dyn ModelStore, document_uri: &str) -> Result<JsonValue, ConverterError> {
    let doc_id = store
        .all_items(document_uri, Some(CLASS_SPDX_DOCUMENT))
        .next()
        .ok_or(ConverterError::NoDocument)?;
    let doc = lookup(store, &doc_id.object_uri)?;

    let mut out = Map::new();
    out.insert("SPDXID".to_string(), doc.local_id().into());
    out.insert("documentNamespace".to_string(), document_uri.into());
    write_properties(store, doc, &mut out)?;

    for (section, class) in ELEMENT_SECTIONS {
        let items = store
            .all_items(document_uri, Some(*class))
            .map(|id| write_object(store, &id.object_uri))
            .collect::<Result<Vec<_>, _>>()?;
        if !items.is_empty() {
            out.insert(section.to_string(), JsonValue::Array(items));
        }
    }
    let relationships = store
        .all_items(document_uri, Some(CLASS_RELATIONSHIP))
        .map(|id| write_object(store, &id.object_uri))
        .collect::<Result<Vec<_>, _>>()?;
    if !relationships.is_empty() {
        out.insert("relationships".to_string(), JsonValue::Array(relationships));
    }
    Ok(JsonValue::Object(out))
}

fn lookup<'a>(
    store: &'a dyn ModelStore,
    uri: &str,
) -> Result<&'a model::ModelObject, ConverterError> {
    store
        .get(uri)
        .ok_or_else(|| ConverterError::Encode(format!("Referenced record {uri} does not exist")))
}

fn write_object(store: &dyn ModelStore, uri: &str) -> Result<JsonValue, ConverterError> {
    let obj = lookup(store, uri)?;
    let mut out = Map::new();
    if let Some(field) = model::id_field(&obj.id.type_name) {
        out.insert(field.to_string(), obj.local_id().into());
    }
    write_properties(store, obj, &mut out)?;
    Ok(JsonValue::Object(out))
}

fn write_properties(
    store: &dyn ModelStore,
    obj: &model::ModelObject,
    out: &mut Map<String, JsonValue>,
) -> Result<(), ConverterError> {
    for descriptor in model::properties_of(&obj.id.type_name) {
        let Some(property) = obj.get(descriptor.name) else {
            continue;
        };
        let values = property.values();
        let json = match descriptor.kind {
            PropertyKind::Object(_) => match values.first() {
                Some(Value::Reference(uri)) => write_object(store, uri)?,
                _ => continue,
            },
            PropertyKind::ObjectList(_) => {
                let mut items = Vec::new();
                for v in values {
                    if let Value::Reference(uri) = v {
                        items.push(write_object(store, uri)?);
                    }
                }
                JsonValue::Array(items)
            }
            kind if kind.is_list() => {
                JsonValue::Array(values.iter().map(scalar_json).collect())
            }
            _ => match values.first() {
                Some(v) => scalar_json(v),
                None => continue,
            },
        };
        if json.as_array().is_some_and(Vec::is_empty) {
            continue;
        }
        out.insert(descriptor.name.to_string(), json);
    }
    Ok(())
}

/// JSON form of a scalar value; element references are written as SPDX ids.
fn scalar_json(value: &Value) -> JsonValue {
    match value {
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Integer(i) => JsonValue::from(*i),
        Value::Reference(uri) => JsonValue::String(model::local_id(uri).to_string()),
        Value::ExternalElement {
            document_ref,
            element_id,
        } => JsonValue::String(format!("{document_ref}:{element_id}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_tree() -> JsonValue {
        json!({
            "spdxVersion": "SPDX-2.3",
            "dataLicense": "CC0-1.0",
            "SPDXID": "SPDXRef-DOCUMENT",
            "name": "sample",
            "documentNamespace": "https://example.com/spdx/sample",
            "creationInfo": {
                "created": "2024-01-01T00:00:00Z",
                "creators": ["Tool: spdx-converter"]
            },
            "externalDocumentRefs": [{
                "externalDocumentId": "DocumentRef-ext",
                "spdxDocument": "https://example.com/spdx/ext",
                "checksum": { "algorithm": "SHA1", "checksumValue": "d6a770ba38583ed4bb4525bd96e50461655d2759" }
            }],
            "documentDescribes": ["SPDXRef-pkg"],
            "packages": [{
                "SPDXID": "SPDXRef-pkg",
                "name": "pkg",
                "downloadLocation": "NOASSERTION",
                "filesAnalyzed": false,
                "licenseConcluded": "MIT",
                "hasFiles": ["SPDXRef-file"]
            }],
            "files": [{
                "SPDXID": "SPDXRef-file",
                "fileName": "./src/main.rs",
                "checksums": [{ "algorithm": "SHA1", "checksumValue": "d6a770ba38583ed4bb4525bd96e50461655d2758" }]
            }],
            "relationships": [
                { "spdxElementId": "SPDXRef-pkg", "relationshipType": "DEPENDS_ON", "relatedSpdxElement": "DocumentRef-ext:SPDXRef-lib" },
                { "spdxElementId": "SPDXRef-pkg", "relationshipType": "CONTAINS", "relatedSpdxElement": "SPDXRef-missing" }
            ]
        })
    }

    #[test]
    fn test_read_tree_resolves_references() {
        let (store, uri) = read_tree(&sample_tree()).unwrap();
        assert_eq!(uri, "https://example.com/spdx/sample");

        let pkg = store.get(&model::qualify(&uri, "SPDXRef-pkg")).unwrap();
        assert_eq!(pkg.get_bool("filesAnalyzed"), Some(false));
        assert_eq!(
            pkg.get_values("hasFiles"),
            &[Value::Reference(model::qualify(&uri, "SPDXRef-file"))]
        );

        let relationships: Vec<_> = store
            .all_items(&uri, Some(CLASS_RELATIONSHIP))
            .map(|id| store.get(&id.object_uri).unwrap().clone())
            .collect();
        assert_eq!(
            relationships[0].get_values("relatedSpdxElement"),
            &[Value::ExternalElement {
                document_ref: "DocumentRef-ext".to_string(),
                element_id: "SPDXRef-lib".to_string()
            }]
        );
        // Unknown ids are kept as text
        assert_eq!(
            relationships[1].get_values("relatedSpdxElement"),
            &[Value::String("SPDXRef-missing".to_string())]
        );
    }

    #[test]
    fn test_write_tree_restores_the_document() {
        let tree = sample_tree();
        let (store, uri) = read_tree(&tree).unwrap();
        assert_eq!(write_tree(&store, &uri).unwrap(), tree);
    }

    #[test]
    fn test_missing_namespace_is_a_decode_error() {
        let err = read_tree(&json!({ "spdxVersion": "SPDX-2.3" })).unwrap_err();
        assert!(matches!(err, ConverterError::Decode(_)));
        assert!(matches!(read_tree(&json!([])), Err(ConverterError::Decode(_))));
    }

    #[test]
    fn test_spdx_3_is_rejected() {
        let err = read_tree(&json!({ "@context": "x", "@graph": [] })).unwrap_err();
        assert!(err.to_string().contains("SPDX 3"));
    }

    #[test]
    fn test_lenient_scalars() {
        let mut tree = sample_tree();
        tree["packages"][0]["filesAnalyzed"] = json!("true");
        let (store, uri) = read_tree(&tree).unwrap();
        let pkg = store.get(&model::qualify(&uri, "SPDXRef-pkg")).unwrap();
        assert_eq!(pkg.get_bool("filesAnalyzed"), Some(true));
    }

    #[test]
    fn test_list_fields() {
        assert!(is_list_field("packages"));
        assert!(is_list_field("creators"));
        assert!(is_list_field("checksums"));
        assert!(!is_list_field("checksum"));
        assert!(!is_list_field("name"));
    }
}
