//! SPDX RDF store (RDF/XML and Turtle).
//!
//! Records map onto the SPDX RDF vocabulary: named records are IRIs (their
//! object URI), anonymous records are blank nodes, every property is a
//! `spdx:` predicate. Relationships hang off their source element through
//! `spdx:relationship`, and elements of other documents are IRIs in the
//! namespace recorded by the matching external document reference.

pub mod graph;
pub mod rdfxml;
pub mod turtle;

pub use self::rdfxml::ReaderMode;

use self::graph::{Graph, SPDX_NS, Term, rdf_type};
use super::tree;
use super::{Format, SerializableStore};
use crate::errors::ConverterError;
use crate::model::{
    self, CLASS_CROSS_REF, CLASS_EXTERNAL_DOC_REF, CLASS_RELATIONSHIP, CLASS_SPDX_DOCUMENT,
    DEFAULT_SPEC_VERSION, NOASSERTION, NONE, PropertyKind, PropertyValue, TypedValue, Value,
};
use crate::store::{self, IdKind, InMemStore, ModelStore};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::io::{Read, Write};

const RELATIONSHIP_PREDICATE: &str = "relationship";

/// Concrete RDF syntax written by an [`RdfStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Xml,
    Turtle,
}

#[derive(Debug)]
pub struct RdfStore {
    output: OutputFormat,
    store: InMemStore,
    document_uri: Option<String>,
    dont_store_license_details: bool,
    reader_mode: ReaderMode,
    warnings: Vec<String>,
}

impl RdfStore {
    pub fn new(output: OutputFormat) -> Self {
        Self {
            output,
            store: InMemStore::new(),
            document_uri: None,
            dont_store_license_details: false,
            reader_mode: ReaderMode::Strict,
            warnings: Vec::new(),
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output
    }

    /// The document written by [`SerializableStore::serialize`].
    pub fn set_document_uri(&mut self, document_uri: impl Into<String>) {
        self.document_uri = Some(document_uri.into());
    }

    pub fn document_uri(&self) -> Option<&str> {
        self.document_uri.as_deref()
    }

    /// When set, license detail records are left out of the output.
    pub fn set_dont_store_license_details(&mut self, dont_store: bool) {
        self.dont_store_license_details = dont_store;
    }

    pub fn dont_store_license_details(&self) -> bool {
        self.dont_store_license_details
    }

    /// How RDF/XML input treats unsupported constructs. Constructs skipped
    /// in lenient mode are reported through [`SerializableStore::warnings`].
    pub fn set_reader_mode(&mut self, mode: ReaderMode) {
        self.reader_mode = mode;
    }

    pub fn reader_mode(&self) -> ReaderMode {
        self.reader_mode
    }
}

impl SerializableStore for RdfStore {
    fn format(&self) -> Format {
        match self.output {
            OutputFormat::Xml => Format::RdfXml,
            OutputFormat::Turtle => Format::RdfTtl,
        }
    }

    fn model(&self) -> &InMemStore {
        &self.store
    }

    fn model_mut(&mut self) -> &mut InMemStore {
        &mut self.store
    }

    fn deserialize(&mut self, reader: &mut dyn Read) -> Result<String, ConverterError> {
        let (graph, mut warnings) = match self.output {
            OutputFormat::Xml => rdfxml::read(reader, self.reader_mode)?,
            OutputFormat::Turtle => {
                let mut text = String::new();
                reader.read_to_string(&mut text).map_err(|e| {
                    ConverterError::Decode(format!("Failed to read Turtle input: {e}"))
                })?;
                (turtle::read(&text)?, Vec::new())
            }
        };
        debug!("Read {} triples", graph.len());

        let mut loader = GraphReader::new(&graph);
        loader.load()?;
        let document_uri = loader
            .documents
            .first()
            .cloned()
            .ok_or(ConverterError::NoDocument)?;
        warnings.append(&mut loader.warnings);
        info!(
            "Read {} SPDX document(s) from RDF ({} records)",
            loader.documents.len(),
            loader.store.len()
        );

        self.store = loader.store;
        self.warnings = warnings;
        self.document_uri = Some(document_uri.clone());
        Ok(document_uri)
    }

    fn serialize(&self, writer: &mut dyn Write) -> Result<(), ConverterError> {
        let document_uri = match &self.document_uri {
            Some(uri) if self.store.all_items(uri, Some(CLASS_SPDX_DOCUMENT)).next().is_some() => {
                uri.clone()
            }
            _ => {
                let document = store::document_from_store(&self.store)?;
                model::namespace_of(&document.object_uri).to_string()
            }
        };
        let graph = write_graph(&self.store, &document_uri, self.dont_store_license_details)?;
        debug!("Writing {} triples", graph.len());
        match self.output {
            OutputFormat::Xml => rdfxml::write(writer, &graph),
            OutputFormat::Turtle => writer
                .write_all(turtle::write(&graph).as_bytes())
                .map_err(|e| ConverterError::Io(e, "Failed to write Turtle".to_string())),
        }
    }

    fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn as_rdf_mut(&mut self) -> Option<&mut RdfStore> {
        Some(self)
    }
}

fn spdx(local: &str) -> String {
    format!("{SPDX_NS}{local}")
}

// --- Store -> graph ---

/// Builds the triples for every record of `document_uri`.
pub fn write_graph(
    store: &dyn ModelStore,
    document_uri: &str,
    skip_license_details: bool,
) -> Result<Graph, ConverterError> {
    let mut graph = Graph::new();
    let external_namespaces: HashMap<String, String> = store
        .all_items(document_uri, Some(CLASS_EXTERNAL_DOC_REF))
        .filter_map(|id| {
            let obj = store.get(&id.object_uri)?;
            let namespace = obj.get_str("spdxDocument")?;
            Some((obj.local_id().to_string(), namespace.to_string()))
        })
        .collect();

    for id in store.all_items(document_uri, None) {
        if skip_license_details && model::is_license_detail(&id.type_name) {
            continue;
        }
        let obj = store
            .get(&id.object_uri)
            .ok_or_else(|| ConverterError::Encode(format!("{} vanished", id.object_uri)))?;
        let subject = resource(&id.object_uri);
        graph.add(subject.clone(), rdf_type(), Term::Iri(spdx(&id.type_name)));

        for descriptor in model::properties_of(&id.type_name) {
            if skip_license_details
                && descriptor.kind == PropertyKind::ObjectList(CLASS_CROSS_REF)
            {
                continue;
            }
            let Some(property) = obj.get(descriptor.name) else {
                continue;
            };
            for value in property.values() {
                let object = object_term(value, &external_namespaces)?;
                if id.type_name == CLASS_RELATIONSHIP
                    && descriptor.name == "spdxElementId"
                    && object.is_resource()
                {
                    graph.add(object, spdx(RELATIONSHIP_PREDICATE), subject.clone());
                } else {
                    graph.add(subject.clone(), spdx(descriptor.name), object);
                }
            }
        }
    }
    Ok(graph)
}

fn resource(object_uri: &str) -> Term {
    let local = model::local_id(object_uri);
    if model::is_anonymous_id(local) {
        Term::Blank(local.to_string())
    } else {
        Term::Iri(object_uri.to_string())
    }
}

fn object_term(
    value: &Value,
    external_namespaces: &HashMap<String, String>,
) -> Result<Term, ConverterError> {
    Ok(match value {
        Value::String(s) => Term::literal(s.clone()),
        Value::Boolean(b) => Term::typed(b.to_string(), "boolean"),
        Value::Integer(i) => Term::typed(i.to_string(), "integer"),
        Value::Reference(uri) => resource(uri),
        Value::ExternalElement {
            document_ref,
            element_id,
        } => {
            let namespace = external_namespaces.get(document_ref).ok_or_else(|| {
                ConverterError::Encode(format!(
                    "External document reference {document_ref} has no document namespace"
                ))
            })?;
            Term::Iri(model::qualify(namespace, element_id))
        }
    })
}

// --- Graph -> store ---

struct GraphReader<'g> {
    graph: &'g Graph,
    store: InMemStore,
    documents: Vec<String>,
    warnings: Vec<String>,
    /// Record URI for each typed subject.
    records: HashMap<&'g Term, String>,
    classes: HashMap<&'g Term, String>,
    /// Document namespace of each resource.
    namespaces: HashMap<&'g Term, String>,
    /// (document namespace, external document namespace) -> DocumentRef id
    external_refs: HashMap<(String, String), String>,
}

impl<'g> GraphReader<'g> {
    fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            store: InMemStore::new(),
            documents: Vec::new(),
            warnings: Vec::new(),
            records: HashMap::new(),
            classes: HashMap::new(),
            namespaces: HashMap::new(),
            external_refs: HashMap::new(),
        }
    }

    fn load(&mut self) -> Result<(), ConverterError> {
        self.classify();
        self.assign_namespaces();
        self.create_records()?;
        self.collect_external_refs();
        self.set_properties()?;
        Ok(())
    }

    /// Finds every SPDX-typed subject, plus relationship nodes that are
    /// only reachable through `spdx:relationship`.
    fn classify(&mut self) {
        let graph = self.graph;
        let rdf_type = rdf_type();
        let relationship = spdx(RELATIONSHIP_PREDICATE);
        for triple in &graph.triples {
            if triple.predicate == rdf_type {
                match &triple.object {
                    Term::Iri(class) => match class.strip_prefix(SPDX_NS) {
                        Some(class) if model::ALL_CLASSES.contains(&class) => {
                            self.classes.insert(&triple.subject, class.to_string());
                        }
                        _ => self.warn(format!("Ignoring resource of unknown type {class}")),
                    },
                    other => self.warn(format!("Ignoring rdf:type {other:?}")),
                }
            } else if triple.predicate == relationship && triple.object.is_resource() {
                self.classes
                    .entry(&triple.object)
                    .or_insert_with(|| CLASS_RELATIONSHIP.to_string());
            }
        }
    }

    fn assign_namespaces(&mut self) {
        let graph = self.graph;
        for subject in graph.by_subject().keys() {
            if let Term::Iri(iri) = subject {
                self.namespaces
                    .insert(*subject, model::namespace_of(iri).to_string());
                if self.classes.get(*subject).is_some_and(|c| c == CLASS_SPDX_DOCUMENT) {
                    self.documents.push(model::namespace_of(iri).to_string());
                }
            }
        }
        // Blank nodes take the namespace of whatever refers to them
        loop {
            let mut changed = false;
            for triple in &graph.triples {
                let (from, to) = (&triple.subject, &triple.object);
                if !matches!(to, Term::Blank(_))
                    || self.namespaces.contains_key(to)
                    || !self.classes.contains_key(from)
                {
                    continue;
                }
                if let Some(ns) = self.namespaces.get(from).cloned() {
                    self.namespaces.insert(to, ns);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        if let Some(first) = self.documents.first().cloned() {
            for subject in self.classes.keys() {
                self.namespaces.entry(*subject).or_insert_with(|| first.clone());
            }
        }
    }

    fn create_records(&mut self) -> Result<(), ConverterError> {
        let spec_versions: HashMap<String, String> = self
            .documents
            .iter()
            .map(|ns| (ns.clone(), self.document_spec_version(ns)))
            .collect();

        let graph = self.graph;
        for subject in graph.by_subject().keys() {
            let Some(class) = self.classes.get(*subject).cloned() else {
                continue;
            };
            let Some(namespace) = self.namespaces.get(*subject).cloned() else {
                self.warn(format!("Ignoring {class} outside of any SPDX document"));
                continue;
            };
            let uri = match subject {
                Term::Iri(iri) => iri.clone(),
                _ => {
                    let local = self.store.next_identifier(IdKind::Anonymous, &namespace);
                    model::qualify(&namespace, &local)
                }
            };
            let spec_version = spec_versions
                .get(&namespace)
                .cloned()
                .unwrap_or_else(|| DEFAULT_SPEC_VERSION.to_string());
            self.store.create(&TypedValue::new(&uri, &class, spec_version))?;
            self.records.insert(*subject, uri);
        }
        Ok(())
    }

    fn document_spec_version(&self, namespace: &str) -> String {
        let predicate = spdx("specVersion");
        let version = spdx("spdxVersion");
        self.graph
            .triples
            .iter()
            .find_map(|t| match (&t.subject, &t.object) {
                (Term::Iri(s), Term::Literal { value, .. })
                    if model::namespace_of(s) == namespace
                        && (t.predicate == version || t.predicate == predicate) =>
                {
                    Some(value.clone())
                }
                _ => None,
            })
            .unwrap_or_else(|| DEFAULT_SPEC_VERSION.to_string())
    }

    fn collect_external_refs(&mut self) {
        let graph = self.graph;
        let spdx_document = spdx("spdxDocument");
        for triple in &graph.triples {
            if triple.predicate != spdx_document
                || self.classes.get(&triple.subject).map(String::as_str)
                    != Some(CLASS_EXTERNAL_DOC_REF)
            {
                continue;
            }
            let (Some(uri), Term::Literal { value, .. } | Term::Iri(value)) =
                (self.records.get(&triple.subject), &triple.object)
            else {
                continue;
            };
            let ns = value.trim_end_matches('#').to_string();
            self.external_refs.insert(
                (model::namespace_of(uri).to_string(), ns),
                model::local_id(uri).to_string(),
            );
        }
    }

    fn set_properties(&mut self) -> Result<(), ConverterError> {
        let graph = self.graph;
        for (subject, triples) in graph.by_subject() {
            let Some(uri) = self.records.get(subject).cloned() else {
                continue;
            };
            let class = self.classes[subject].clone();
            for descriptor in model::properties_of(&class) {
                let predicate = spdx(descriptor.name);
                let objects: Vec<&Term> = triples
                    .iter()
                    .filter(|t| t.predicate == predicate)
                    .map(|t| &t.object)
                    .collect();
                if objects.is_empty() {
                    continue;
                }
                let mut values = Vec::new();
                for object in objects {
                    values.push(self.value(&uri, descriptor.name, descriptor.kind, object)?);
                }
                let value = if descriptor.kind.is_list() {
                    PropertyValue::List(values)
                } else {
                    if values.len() > 1 {
                        self.warn(format!(
                            "{} has {} values for {}, keeping the first",
                            uri,
                            values.len(),
                            descriptor.name
                        ));
                    }
                    PropertyValue::Single(values.remove(0))
                };
                self.store.set_property(&uri, descriptor.name, value)?;
            }
        }

        // Relationships are attached to their source element, which may
        // live in another document
        let relationship = spdx(RELATIONSHIP_PREDICATE);
        for triple in graph.triples.iter().filter(|t| t.predicate == relationship) {
            let Some(rel_uri) = self.records.get(&triple.object).cloned() else {
                continue;
            };
            let source =
                self.value(&rel_uri, "spdxElementId", PropertyKind::Element, &triple.subject)?;
            self.store
                .set_property(&rel_uri, "spdxElementId", PropertyValue::Single(source))?;
        }
        Ok(())
    }

    fn value(
        &self,
        from: &str,
        name: &str,
        kind: PropertyKind,
        object: &Term,
    ) -> Result<Value, ConverterError> {
        let value = match (kind, object) {
            (PropertyKind::Boolean, Term::Literal { value, .. }) => {
                Value::Boolean(value.trim().eq_ignore_ascii_case("true"))
            }
            (PropertyKind::Integer, Term::Literal { value, .. }) => {
                Value::Integer(value.trim().parse().map_err(|_| {
                    ConverterError::Decode(format!("{from}: {name} is not an integer: {value}"))
                })?)
            }
            (PropertyKind::Object(_) | PropertyKind::ObjectList(_), term) => {
                match self.records.get(term) {
                    Some(uri) => Value::Reference(uri.clone()),
                    None => {
                        return Err(ConverterError::Decode(format!(
                            "{from}: {name} refers to an unknown resource {term:?}"
                        )));
                    }
                }
            }
            (PropertyKind::Element | PropertyKind::ElementList, Term::Iri(iri)) => {
                self.element(from, iri)
            }
            (PropertyKind::Element | PropertyKind::ElementList, Term::Literal { value, .. }) => {
                tree::resolve_element(&self.store, model::namespace_of(from), value)
            }
            (_, Term::Literal { value, .. }) => Value::String(value.clone()),
            (_, Term::Iri(iri)) => Value::String(vocabulary_value(iri)),
            (_, Term::Blank(label)) => {
                return Err(ConverterError::Decode(format!(
                    "{from}: {name} expects a value, found blank node {label}"
                )));
            }
        };
        Ok(value)
    }

    fn element(&self, from: &str, iri: &str) -> Value {
        if self.store.exists(iri) {
            return Value::Reference(iri.to_string());
        }
        let value = vocabulary_value(iri);
        if value == NOASSERTION || value == NONE {
            return Value::String(value);
        }
        let key = (
            model::namespace_of(from).to_string(),
            model::namespace_of(iri).to_string(),
        );
        match self.external_refs.get(&key) {
            Some(document_ref) => Value::ExternalElement {
                document_ref: document_ref.clone(),
                element_id: model::local_id(iri).to_string(),
            },
            None => Value::String(iri.to_string()),
        }
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

/// `spdx:noassertion` and `spdx:none` stand for the SPDX keywords.
fn vocabulary_value(iri: &str) -> String {
    match iri.strip_prefix(SPDX_NS) {
        Some("noassertion") => NOASSERTION.to_string(),
        Some("none") => NONE.to_string(),
        _ => iri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::tree::read_tree;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Cursor;

    fn sample() -> (InMemStore, String) {
        read_tree(&json!({
            "spdxVersion": "SPDX-2.3",
            "SPDXID": "SPDXRef-DOCUMENT",
            "name": "sample",
            "documentNamespace": "https://example.com/spdx/sample",
            "creationInfo": { "created": "2024-01-01T00:00:00Z", "creators": ["Tool: x"] },
            "externalDocumentRefs": [{
                "externalDocumentId": "DocumentRef-ext",
                "spdxDocument": "https://example.com/spdx/ext",
                "checksum": { "algorithm": "SHA1", "checksumValue": "d6a770ba38583ed4bb4525bd96e50461655d2759" }
            }],
            "hasExtractedLicensingInfos": [{
                "licenseId": "LicenseRef-a",
                "extractedText": "terms",
                "crossRefs": [{ "url": "https://example.com/a", "isLive": true, "order": 1 }]
            }],
            "packages": [{ "SPDXID": "SPDXRef-pkg", "name": "pkg", "filesAnalyzed": false }],
            "relationships": [
                { "spdxElementId": "SPDXRef-DOCUMENT", "relationshipType": "DESCRIBES", "relatedSpdxElement": "SPDXRef-pkg" },
                { "spdxElementId": "SPDXRef-pkg", "relationshipType": "DEPENDS_ON", "relatedSpdxElement": "DocumentRef-ext:SPDXRef-lib" },
                { "spdxElementId": "SPDXRef-pkg", "relationshipType": "OTHER", "relatedSpdxElement": "NOASSERTION" }
            ]
        }))
        .unwrap()
    }

    fn store_with(output: OutputFormat) -> RdfStore {
        let (store, uri) = sample();
        let mut rdf = RdfStore::new(output);
        rdf.store = store;
        rdf.set_document_uri(uri);
        rdf
    }

    fn round_trip(output: OutputFormat) -> serde_json::Value {
        let rdf = store_with(output);
        let mut out = Vec::new();
        rdf.serialize(&mut out).unwrap();

        let mut back = RdfStore::new(output);
        let uri = back.deserialize(&mut Cursor::new(out)).unwrap();
        assert_eq!(uri, "https://example.com/spdx/sample");
        tree::write_tree(back.model(), &uri).unwrap()
    }

    #[test]
    fn test_turtle_round_trip() {
        let (store, uri) = sample();
        assert_eq!(round_trip(OutputFormat::Turtle), tree::write_tree(&store, &uri).unwrap());
    }

    #[test]
    fn test_rdf_xml_round_trip() {
        let (store, uri) = sample();
        assert_eq!(round_trip(OutputFormat::Xml), tree::write_tree(&store, &uri).unwrap());
    }

    #[test]
    fn test_reader_mode_decides_on_unsupported_constructs() {
        let mut out = Vec::new();
        store_with(OutputFormat::Xml).serialize(&mut out).unwrap();
        let xml = String::from_utf8(out)
            .unwrap()
            .replacen("<spdx:name>", r#"<spdx:name rdf:ID="n1">"#, 1);

        let mut strict = RdfStore::new(OutputFormat::Xml);
        assert_eq!(strict.reader_mode(), ReaderMode::Strict);
        let err = strict
            .deserialize(&mut Cursor::new(xml.clone().into_bytes()))
            .unwrap_err();
        assert!(matches!(err, ConverterError::Decode(_)));
        assert!(err.to_string().contains("rdf:ID"));

        let mut lenient = RdfStore::new(OutputFormat::Xml);
        lenient.set_reader_mode(ReaderMode::Lenient);
        lenient
            .deserialize(&mut Cursor::new(xml.into_bytes()))
            .unwrap();
        assert_eq!(lenient.warnings().len(), 1);
        assert!(lenient.warnings()[0].contains("rdf:ID"));
    }

    #[test]
    fn test_relationships_hang_off_their_source() {
        let (store, uri) = sample();
        let graph = write_graph(&store, &uri, false).unwrap();
        let pkg = Term::Iri(model::qualify(&uri, "SPDXRef-pkg"));
        let outgoing = graph
            .triples
            .iter()
            .filter(|t| t.subject == pkg && t.predicate == spdx(RELATIONSHIP_PREDICATE))
            .count();
        assert_eq!(outgoing, 2);
        // The external element is written in the other document's namespace
        assert!(graph.triples.iter().any(|t| t.object
            == Term::Iri("https://example.com/spdx/ext#SPDXRef-lib".to_string())));
    }

    #[test]
    fn test_license_details_can_be_left_out() {
        let (store, uri) = sample();
        let with = write_graph(&store, &uri, false).unwrap();
        let without = write_graph(&store, &uri, true).unwrap();
        let cross_ref = Term::Iri(spdx(CLASS_CROSS_REF));
        assert!(with.triples.iter().any(|t| t.object == cross_ref));
        assert!(!without.triples.iter().any(|t| t.object == cross_ref));
        assert!(!without.triples.iter().any(|t| t.predicate == spdx("crossRefs")));
    }

    #[test]
    fn test_two_documents_load_into_one_store() {
        let text = r#"@prefix spdx: <http://spdx.org/rdf/terms#> .
<https://example.com/a#SPDXRef-DOCUMENT> a spdx:SpdxDocument ; spdx:name "a" .
<https://example.com/b#SPDXRef-DOCUMENT> a spdx:SpdxDocument ; spdx:name "b" .
"#;
        let mut rdf = RdfStore::new(OutputFormat::Turtle);
        rdf.deserialize(&mut Cursor::new(text.as_bytes().to_vec())).unwrap();
        assert!(matches!(
            store::document_from_store(rdf.model()),
            Err(ConverterError::MultipleDocuments(2))
        ));
    }

    #[test]
    fn test_graph_without_document() {
        let text = "@prefix spdx: <http://spdx.org/rdf/terms#> .\n<https://x#p> a spdx:Package .\n";
        let mut rdf = RdfStore::new(OutputFormat::Turtle);
        let err = rdf
            .deserialize(&mut Cursor::new(text.as_bytes().to_vec()))
            .unwrap_err();
        assert!(matches!(err, ConverterError::NoDocument));
        assert!(rdf.model().is_empty());
    }
}
