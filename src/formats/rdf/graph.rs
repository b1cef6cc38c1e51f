//! Minimal RDF graph: terms, triples and subject grouping.

use indexmap::IndexMap;

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";
pub const SPDX_NS: &str = "http://spdx.org/rdf/terms#";

pub fn rdf_type() -> String {
    format!("{RDF_NS}type")
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Iri(String),
    /// Blank node, by label.
    Blank(String),
    Literal {
        value: String,
        datatype: Option<String>,
    },
}

impl Term {
    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            datatype: None,
        }
    }

    pub fn typed(value: impl Into<String>, xsd_type: &str) -> Self {
        Term::Literal {
            value: value.into(),
            datatype: Some(format!("{XSD_NS}{xsd_type}")),
        }
    }

    pub fn is_resource(&self) -> bool {
        matches!(self, Term::Iri(_) | Term::Blank(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

#[derive(Debug, Default, Clone)]
pub struct Graph {
    pub triples: Vec<Triple>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, subject: Term, predicate: impl Into<String>, object: Term) {
        self.triples.push(Triple {
            subject,
            predicate: predicate.into(),
            object,
        });
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Triples grouped by subject, subjects in order of first appearance.
    pub fn by_subject(&self) -> IndexMap<&Term, Vec<&Triple>> {
        let mut groups: IndexMap<&Term, Vec<&Triple>> = IndexMap::new();
        for triple in &self.triples {
            groups.entry(&triple.subject).or_default().push(triple);
        }
        groups
    }

    /// The SPDX class of a subject, from its `rdf:type`.
    pub fn spdx_type_of(&self, subject: &Term) -> Option<&str> {
        let rdf_type = rdf_type();
        self.triples.iter().find_map(|t| match &t.object {
            Term::Iri(class) if t.subject == *subject && t.predicate == rdf_type => {
                class.strip_prefix(SPDX_NS)
            }
            _ => None,
        })
    }
}

/// Splits an IRI into namespace and local name at the last `#` or `/`.
pub fn split_iri(iri: &str) -> (&str, &str) {
    match iri.rfind(['#', '/']) {
        Some(idx) => (&iri[..=idx], &iri[idx + 1..]),
        None => ("", iri),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_subject_keeps_first_appearance_order() {
        let mut graph = Graph::new();
        let a = Term::Iri("http://x/a".to_string());
        let b = Term::Blank("b1".to_string());
        graph.add(a.clone(), rdf_type(), Term::Iri(format!("{SPDX_NS}Package")));
        graph.add(b.clone(), format!("{SPDX_NS}name"), Term::literal("n"));
        graph.add(a.clone(), format!("{SPDX_NS}name"), Term::literal("m"));

        let groups = graph.by_subject();
        let subjects: Vec<_> = groups.keys().copied().collect();
        assert_eq!(subjects, vec![&a, &b]);
        assert_eq!(groups[&a].len(), 2);
        assert_eq!(graph.spdx_type_of(&a), Some("Package"));
        assert_eq!(graph.spdx_type_of(&b), None);
    }

    #[test]
    fn test_split_iri() {
        assert_eq!(split_iri("http://spdx.org/rdf/terms#name"), ("http://spdx.org/rdf/terms#", "name"));
        assert_eq!(split_iri("http://x/y/z"), ("http://x/y/", "z"));
    }
}
