//! RDF/XML reader and writer.
//!
//! The writer emits one flat typed node element per subject, with
//! `rdf:about` for IRIs and `rdf:nodeID` for blank nodes. The reader also
//! accepts nested node elements, `rdf:Description` with `rdf:type`, property
//! attributes and `rdf:datatype`. Anything else (`rdf:parseType`, `rdf:li`,
//! unknown `rdf:` attributes) is an unsupported construct: a lenient reader
//! skips it with a warning, a strict one fails.

use super::graph::{Graph, RDF_NS, RDFS_NS, SPDX_NS, Term, XSD_NS, rdf_type, split_iri};
use crate::errors::ConverterError;
use log::warn;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::io::{BufReader, Read, Write};

const PREFIXES: &[(&str, &str)] = &[
    ("rdf", RDF_NS),
    ("rdfs", RDFS_NS),
    ("spdx", SPDX_NS),
    ("xsd", XSD_NS),
];

/// How the reader treats constructs it does not understand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReaderMode {
    #[default]
    Strict,
    Lenient,
}

// --- Writer ---

fn encode_err(e: impl std::fmt::Display) -> ConverterError {
    ConverterError::Encode(format!("Failed to write RDF/XML: {}", e))
}

fn qname(iri: &str) -> Result<String, ConverterError> {
    let (ns, local) = split_iri(iri);
    PREFIXES
        .iter()
        .find(|(_, p)| *p == ns)
        .filter(|_| !local.is_empty())
        .map(|(prefix, _)| format!("{prefix}:{local}"))
        .ok_or_else(|| encode_err(format!("{iri} can not be written as an XML name")))
}

pub fn write(writer: &mut dyn Write, graph: &Graph) -> Result<(), ConverterError> {
    let mut xml = Writer::new_with_indent(writer, b' ', 2);
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(encode_err)?;

    let mut root = BytesStart::new("rdf:RDF");
    for (prefix, ns) in PREFIXES {
        root.push_attribute((format!("xmlns:{prefix}").as_str(), *ns));
    }
    xml.write_event(Event::Start(root)).map_err(encode_err)?;

    let rdf_type = rdf_type();
    for (subject, triples) in graph.by_subject() {
        let type_triple = triples.iter().position(|t| {
            t.predicate == rdf_type
                && matches!(&t.object, Term::Iri(class) if class.starts_with(SPDX_NS))
        });
        let element = match type_triple.map(|idx| &triples[idx].object) {
            Some(Term::Iri(class)) => qname(class)?,
            _ => "rdf:Description".to_string(),
        };

        let mut start = BytesStart::new(element.as_str());
        match subject {
            Term::Iri(iri) => start.push_attribute(("rdf:about", iri.as_str())),
            Term::Blank(label) => start.push_attribute(("rdf:nodeID", label.as_str())),
            Term::Literal { .. } => return Err(encode_err("literal used as a subject")),
        }
        xml.write_event(Event::Start(start)).map_err(encode_err)?;

        for (idx, triple) in triples.iter().enumerate() {
            if Some(idx) == type_triple {
                continue;
            }
            let name = qname(&triple.predicate)?;
            let mut property = BytesStart::new(name.as_str());
            match &triple.object {
                Term::Iri(iri) => {
                    property.push_attribute(("rdf:resource", iri.as_str()));
                    xml.write_event(Event::Empty(property)).map_err(encode_err)?;
                }
                Term::Blank(label) => {
                    property.push_attribute(("rdf:nodeID", label.as_str()));
                    xml.write_event(Event::Empty(property)).map_err(encode_err)?;
                }
                Term::Literal { value, datatype } => {
                    if let Some(datatype) = datatype {
                        property.push_attribute(("rdf:datatype", datatype.as_str()));
                    }
                    xml.write_event(Event::Start(property)).map_err(encode_err)?;
                    xml.write_event(Event::Text(BytesText::new(value)))
                        .map_err(encode_err)?;
                    xml.write_event(Event::End(BytesEnd::new(name.as_str())))
                        .map_err(encode_err)?;
                }
            }
        }
        xml.write_event(Event::End(BytesEnd::new(element.as_str())))
            .map_err(encode_err)?;
    }

    xml.write_event(Event::End(BytesEnd::new("rdf:RDF")))
        .map_err(encode_err)?;
    xml.get_mut().write_all(b"\n")?;
    Ok(())
}

// --- Reader ---

enum Frame {
    Root,
    Node(Term),
    Property {
        subject: Term,
        predicate: String,
        datatype: Option<String>,
        text: String,
        object: Option<Term>,
    },
}

struct RdfXmlParser {
    mode: ReaderMode,
    graph: Graph,
    warnings: Vec<String>,
    stack: Vec<Frame>,
    /// Prefix -> namespace, one scope per open element.
    scopes: Vec<HashMap<String, String>>,
    /// Depth of an unsupported element being skipped.
    skip_depth: usize,
    next_blank: usize,
}

fn decode_err(e: impl std::fmt::Display) -> ConverterError {
    ConverterError::Decode(format!("Failed to parse RDF/XML: {}", e))
}

/// Parses RDF/XML, returning the graph and the warnings for skipped
/// constructs.
pub fn read(reader: &mut dyn Read, mode: ReaderMode) -> Result<(Graph, Vec<String>), ConverterError> {
    let mut reader = Reader::from_reader(BufReader::new(reader));
    let mut parser = RdfXmlParser {
        mode,
        graph: Graph::new(),
        warnings: Vec::new(),
        stack: Vec::new(),
        scopes: Vec::new(),
        skip_depth: 0,
        next_blank: 0,
    };
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(decode_err)? {
            Event::Start(e) => parser.start(&e)?,
            Event::Empty(e) => {
                parser.start(&e)?;
                parser.end()?;
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(decode_err)?;
                parser.text(&text);
            }
            Event::CData(e) => parser.text(&String::from_utf8_lossy(&e.into_inner())),
            Event::End(_) => parser.end()?,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    if !parser.stack.is_empty() {
        return Err(decode_err("unexpected end of document"));
    }
    Ok((parser.graph, parser.warnings))
}

struct Attr {
    name: String,
    value: String,
}

impl RdfXmlParser {
    fn resolve(&self, qname: &str) -> Result<String, ConverterError> {
        let (prefix, local) = qname.split_once(':').unwrap_or(("", qname));
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(prefix))
            .map(|ns| format!("{ns}{local}"))
            .ok_or_else(|| decode_err(format!("undeclared namespace prefix in {qname}")))
    }

    fn unsupported(&mut self, what: String) -> Result<(), ConverterError> {
        match self.mode {
            ReaderMode::Lenient => {
                warn!("Skipping unsupported RDF/XML construct: {what}");
                self.warnings
                    .push(format!("Skipped unsupported RDF/XML construct: {what}"));
                self.skip_depth = 1;
                Ok(())
            }
            ReaderMode::Strict => Err(decode_err(format!("unsupported construct {what}"))),
        }
    }

    fn fresh_blank(&mut self) -> Term {
        self.next_blank += 1;
        Term::Blank(format!("xml-genid{}", self.next_blank))
    }

    fn start(&mut self, e: &BytesStart) -> Result<(), ConverterError> {
        if self.skip_depth > 0 {
            self.skip_depth += 1;
            return Ok(());
        }

        let mut scope = HashMap::new();
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(decode_err)?;
            let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(decode_err)?.into_owned();
            if name == "xmlns" {
                scope.insert(String::new(), value);
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                scope.insert(prefix.to_string(), value);
            } else if !name.starts_with("xml:") {
                attrs.push(Attr { name, value });
            }
        }
        self.scopes.push(scope);

        let element = self.resolve(&String::from_utf8_lossy(e.name().as_ref()))?;
        let result = match self.stack.last() {
            Some(Frame::Node(subject)) => {
                let subject = subject.clone();
                self.property_element(subject, element, attrs)
            }
            Some(Frame::Property { object: Some(_), .. }) => {
                self.unsupported(format!("second node element inside a property ({element})"))
            }
            None if element == format!("{RDF_NS}RDF") => {
                self.stack.push(Frame::Root);
                Ok(())
            }
            _ => self.node_element(element, attrs),
        };
        if self.skip_depth > 0 {
            // The skipped element's end event is consumed by `end`
            self.scopes.pop();
        }
        result
    }

    fn node_element(&mut self, element: String, attrs: Vec<Attr>) -> Result<(), ConverterError> {
        let mut subject = None;
        let mut properties = Vec::new();
        for attr in attrs {
            match self.resolve(&attr.name)?.as_str() {
                a if a == format!("{RDF_NS}about") => subject = Some(Term::Iri(attr.value)),
                a if a == format!("{RDF_NS}nodeID") => subject = Some(Term::Blank(attr.value)),
                a if a.starts_with(RDF_NS) => {
                    return self.unsupported(format!("attribute {} on {element}", attr.name));
                }
                predicate => properties.push((predicate.to_string(), attr.value)),
            }
        }
        let subject = match subject {
            Some(s) => s,
            None => self.fresh_blank(),
        };
        if element != format!("{RDF_NS}Description") {
            self.graph
                .add(subject.clone(), rdf_type(), Term::Iri(element.clone()));
        }
        for (predicate, value) in properties {
            self.graph
                .add(subject.clone(), predicate, Term::literal(value));
        }
        if let Some(Frame::Property { object, .. }) = self.stack.last_mut() {
            *object = Some(subject.clone());
        }
        self.stack.push(Frame::Node(subject));
        Ok(())
    }

    fn property_element(
        &mut self,
        subject: Term,
        predicate: String,
        attrs: Vec<Attr>,
    ) -> Result<(), ConverterError> {
        if predicate == format!("{RDF_NS}li") {
            return self.unsupported("rdf:li".to_string());
        }
        let mut object = None;
        let mut datatype = None;
        for attr in attrs {
            match self.resolve(&attr.name)?.as_str() {
                a if a == format!("{RDF_NS}resource") => object = Some(Term::Iri(attr.value)),
                a if a == format!("{RDF_NS}nodeID") => object = Some(Term::Blank(attr.value)),
                a if a == format!("{RDF_NS}datatype") => datatype = Some(attr.value),
                _ => {
                    return self.unsupported(format!("attribute {} on {predicate}", attr.name));
                }
            }
        }
        self.stack.push(Frame::Property {
            subject,
            predicate,
            datatype,
            text: String::new(),
            object,
        });
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if self.skip_depth > 0 {
            return;
        }
        if let Some(Frame::Property { text: buffer, .. }) = self.stack.last_mut() {
            buffer.push_str(text);
        }
    }

    fn end(&mut self) -> Result<(), ConverterError> {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return Ok(());
        }
        self.scopes.pop();
        match self.stack.pop() {
            Some(Frame::Property {
                subject,
                predicate,
                datatype,
                text,
                object,
            }) => {
                let object = object.unwrap_or(Term::Literal {
                    value: text,
                    datatype,
                });
                self.graph.add(subject, predicate, object);
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(decode_err("unbalanced closing element")),
        }
    }
}
