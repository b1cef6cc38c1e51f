//! Turtle reader and writer.
//!
//! The reader covers the Turtle used for SPDX documents: `@prefix` /
//! `PREFIX`, IRIs, prefixed names, blank node labels and `[ ... ]` property
//! lists, `a`, `;` and `,` lists, short and long string literals with
//! language tags or datatypes, and bare booleans and integers. Collections
//! and `@base` are rejected.

use super::graph::{Graph, RDF_NS, RDFS_NS, SPDX_NS, Term, XSD_NS, rdf_type, split_iri};
use crate::errors::ConverterError;
use std::collections::HashMap;

const PREFIXES: &[(&str, &str)] = &[
    ("spdx", SPDX_NS),
    ("rdf", RDF_NS),
    ("rdfs", RDFS_NS),
    ("xsd", XSD_NS),
];

// --- Writer ---

pub fn write(graph: &Graph) -> String {
    let mut out = String::new();
    for (prefix, ns) in PREFIXES {
        out.push_str(&format!("@prefix {prefix}: <{ns}> .\n"));
    }

    let rdf_type = rdf_type();
    for (subject, triples) in graph.by_subject() {
        out.push('\n');
        out.push_str(&term(subject));
        for (idx, triple) in triples.iter().enumerate() {
            out.push_str(if idx == 0 { " " } else { " ;\n    " });
            if triple.predicate == rdf_type {
                out.push('a');
            } else {
                out.push_str(&iri(&triple.predicate));
            }
            out.push(' ');
            out.push_str(&term(&triple.object));
        }
        out.push_str(" .\n");
    }
    out
}

fn iri(value: &str) -> String {
    let (ns, local) = split_iri(value);
    let is_local_name = !local.is_empty()
        && local.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && local.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    match PREFIXES.iter().find(|(_, p)| *p == ns) {
        Some((prefix, _)) if is_local_name => format!("{prefix}:{local}"),
        _ => format!("<{}>", escape_iri(value)),
    }
}

fn escape_iri(value: &str) -> String {
    value
        .chars()
        .flat_map(|c| match c {
            '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' | ' ' => {
                format!("\\u{:04X}", c as u32).chars().collect::<Vec<_>>()
            }
            c => vec![c],
        })
        .collect()
}

fn term(value: &Term) -> String {
    match value {
        Term::Iri(i) => iri(i),
        Term::Blank(label) => format!("_:{label}"),
        Term::Literal { value, datatype } => {
            let quoted = format!("\"{}\"", escape_literal(value));
            match datatype {
                Some(dt) => format!("{quoted}^^{}", iri(dt)),
                None => quoted,
            }
        }
    }
}

fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

// --- Reader ---

pub fn read(text: &str) -> Result<Graph, ConverterError> {
    let mut parser = TurtleParser {
        chars: text.chars().collect(),
        pos: 0,
        prefixes: HashMap::new(),
        graph: Graph::new(),
        next_blank: 0,
    };
    parser.document()?;
    Ok(parser.graph)
}

struct TurtleParser {
    chars: Vec<char>,
    pos: usize,
    prefixes: HashMap<String, String>,
    graph: Graph,
    next_blank: usize,
}

impl TurtleParser {
    fn error(&self, message: impl std::fmt::Display) -> ConverterError {
        let line = self.chars[..self.pos.min(self.chars.len())]
            .iter()
            .filter(|c| **c == '\n')
            .count()
            + 1;
        ConverterError::Decode(format!("Failed to parse Turtle at line {line}: {message}"))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '#' {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }

    fn starts_with_keyword(&self, keyword: &str) -> bool {
        keyword.chars().enumerate().all(|(i, c)| {
            self.chars
                .get(self.pos + i)
                .is_some_and(|x| x.eq_ignore_ascii_case(&c))
        }) && self
            .chars
            .get(self.pos + keyword.len())
            .is_some_and(|c| c.is_whitespace())
    }

    fn expect(&mut self, c: char) -> Result<(), ConverterError> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{c}'")))
        }
    }

    fn document(&mut self) -> Result<(), ConverterError> {
        loop {
            self.skip_ws();
            if self.peek().is_none() {
                return Ok(());
            }
            if self.starts_with("@prefix") {
                self.pos += "@prefix".len();
                self.prefix_decl()?;
                self.expect('.')?;
            } else if self.starts_with_keyword("PREFIX") {
                self.pos += "PREFIX".len();
                self.prefix_decl()?;
            } else if self.starts_with("@base") || self.starts_with_keyword("BASE") {
                return Err(self.error("base IRIs are not supported"));
            } else {
                self.triples()?;
                self.expect('.')?;
            }
        }
    }

    fn prefix_decl(&mut self) -> Result<(), ConverterError> {
        self.skip_ws();
        let start = self.pos;
        while self.peek().is_some_and(|c| c != ':' && !c.is_whitespace()) {
            self.pos += 1;
        }
        let prefix: String = self.chars[start..self.pos].iter().collect();
        self.expect(':')?;
        self.skip_ws();
        let ns = self.iri_ref()?;
        self.prefixes.insert(prefix, ns);
        Ok(())
    }

    fn triples(&mut self) -> Result<(), ConverterError> {
        self.skip_ws();
        let subject = if self.peek() == Some('[') {
            let subject = self.blank_property_list()?;
            self.skip_ws();
            if self.peek() == Some('.') {
                return Ok(());
            }
            subject
        } else {
            self.subject()?
        };
        self.predicate_object_list(&subject)
    }

    fn subject(&mut self) -> Result<Term, ConverterError> {
        match self.resource()? {
            Some(term) => Ok(term),
            None => Err(self.error("expected a subject")),
        }
    }

    fn predicate_object_list(&mut self, subject: &Term) -> Result<(), ConverterError> {
        loop {
            self.skip_ws();
            let predicate = self.predicate()?;
            loop {
                let object = self.object()?;
                self.graph.add(subject.clone(), predicate.clone(), object);
                self.skip_ws();
                if self.peek() == Some(',') {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            self.skip_ws();
            if self.peek() != Some(';') {
                return Ok(());
            }
            while self.peek() == Some(';') {
                self.pos += 1;
                self.skip_ws();
            }
            // A trailing ';' before '.' or ']' is allowed
            if matches!(self.peek(), Some('.') | Some(']') | None) {
                return Ok(());
            }
        }
    }

    fn predicate(&mut self) -> Result<String, ConverterError> {
        if self.peek() == Some('a')
            && self
                .chars
                .get(self.pos + 1)
                .is_some_and(|c| c.is_whitespace() || *c == '<' || *c == '"')
        {
            self.pos += 1;
            return Ok(rdf_type());
        }
        match self.resource()? {
            Some(Term::Iri(iri)) => Ok(iri),
            _ => Err(self.error("expected a predicate IRI")),
        }
    }

    fn object(&mut self) -> Result<Term, ConverterError> {
        self.skip_ws();
        match self.peek() {
            Some('"') | Some('\'') => self.literal(),
            Some('[') => self.blank_property_list(),
            Some('(') => Err(self.error("collections are not supported")),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => self.number(),
            _ if self.starts_bare_boolean() => {
                let value = if self.starts_with("true") { "true" } else { "false" };
                self.pos += value.len();
                Ok(Term::typed(value, "boolean"))
            }
            _ => match self.resource()? {
                Some(term) => Ok(term),
                None => Err(self.error("expected an object")),
            },
        }
    }

    fn starts_bare_boolean(&self) -> bool {
        ["true", "false"].iter().any(|word| {
            self.starts_with(word)
                && !self
                    .chars
                    .get(self.pos + word.len())
                    .is_some_and(|c| c.is_alphanumeric() || *c == ':' || *c == '_')
        })
    }

    /// IRI, prefixed name or blank node label.
    fn resource(&mut self) -> Result<Option<Term>, ConverterError> {
        self.skip_ws();
        match self.peek() {
            Some('<') => Ok(Some(Term::Iri(self.iri_ref()?))),
            Some('_') if self.chars.get(self.pos + 1) == Some(&':') => {
                self.pos += 2;
                Ok(Some(Term::Blank(self.name())))
            }
            Some(c) if c.is_alphabetic() || c == ':' => {
                let prefix = self.name();
                self.expect(':')?;
                let local = self.name();
                let ns = self
                    .prefixes
                    .get(&prefix)
                    .ok_or_else(|| self.error(format!("undeclared prefix '{prefix}'")))?;
                Ok(Some(Term::Iri(format!("{ns}{local}"))))
            }
            _ => Ok(None),
        }
    }

    fn name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            let continues_name = c.is_alphanumeric()
                || c == '_'
                || c == '-'
                || (c == '.'
                    && self
                        .chars
                        .get(self.pos + 1)
                        .is_some_and(|n| n.is_alphanumeric() || *n == '_' || *n == '-'));
            if !continues_name {
                break;
            }
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn iri_ref(&mut self) -> Result<String, ConverterError> {
        self.expect('<')?;
        let mut iri = String::new();
        loop {
            match self.peek() {
                Some('>') => {
                    self.pos += 1;
                    return Ok(iri);
                }
                Some('\\') => {
                    self.pos += 1;
                    iri.push(self.unicode_escape()?);
                }
                Some(c) => {
                    iri.push(c);
                    self.pos += 1;
                }
                None => return Err(self.error("unterminated IRI")),
            }
        }
    }

    fn unicode_escape(&mut self) -> Result<char, ConverterError> {
        let width = match self.peek() {
            Some('u') => 4,
            Some('U') => 8,
            _ => return Err(self.error("invalid escape")),
        };
        self.pos += 1;
        let end = (self.pos + width).min(self.chars.len());
        let hex: String = self.chars[self.pos..end].iter().collect();
        self.pos = end;
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(format!("invalid unicode escape '{hex}'")))
    }

    fn literal(&mut self) -> Result<Term, ConverterError> {
        let quote = self.peek().ok_or_else(|| self.error("expected a literal"))?;
        let long = self.starts_with(&quote.to_string().repeat(3));
        self.pos += if long { 3 } else { 1 };

        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string literal")),
                Some(c) if c == quote => {
                    if !long {
                        self.pos += 1;
                        break;
                    }
                    if self.starts_with(&quote.to_string().repeat(3)) {
                        self.pos += 3;
                        break;
                    }
                    value.push(c);
                    self.pos += 1;
                }
                Some('\\') => {
                    self.pos += 1;
                    let escaped = match self.peek() {
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some('\\') => '\\',
                        Some('u') | Some('U') => {
                            value.push(self.unicode_escape()?);
                            continue;
                        }
                        _ => return Err(self.error("invalid escape in string literal")),
                    };
                    value.push(escaped);
                    self.pos += 1;
                }
                Some('\n') if !long => return Err(self.error("newline in short string literal")),
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }

        if self.peek() == Some('@') {
            // Language tags carry no meaning in SPDX documents
            self.pos += 1;
            self.name();
            return Ok(Term::literal(value));
        }
        if self.starts_with("^^") {
            self.pos += 2;
            return match self.resource()? {
                Some(Term::Iri(datatype)) => Ok(Term::Literal {
                    value,
                    datatype: Some(datatype),
                }),
                _ => Err(self.error("expected a datatype IRI")),
            };
        }
        Ok(Term::literal(value))
    }

    fn number(&mut self) -> Result<Term, ConverterError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.')
            && self.chars.get(self.pos + 1).is_some_and(|c| c.is_ascii_digit())
        {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
            let value: String = self.chars[start..self.pos].iter().collect();
            return Ok(Term::typed(value, "decimal"));
        }
        let value: String = self.chars[start..self.pos].iter().collect();
        if value.parse::<i64>().is_err() {
            return Err(self.error(format!("invalid number '{value}'")));
        }
        Ok(Term::typed(value, "integer"))
    }

    fn blank_property_list(&mut self) -> Result<Term, ConverterError> {
        self.expect('[')?;
        self.next_blank += 1;
        let node = Term::Blank(format!("ttl-genid{}", self.next_blank));
        self.skip_ws();
        if self.peek() != Some(']') {
            self.predicate_object_list(&node)?;
        }
        self.expect(']')?;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spdx(local: &str) -> String {
        format!("{SPDX_NS}{local}")
    }

    #[test]
    fn test_read_statements() {
        let graph = read(
            r#"@prefix spdx: <http://spdx.org/rdf/terms#> .
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
# a comment
<https://example.com/doc#SPDXRef-pkg> a spdx:Package ;
    spdx:name "pkg \"one\"" , 'alt'@en ;
    spdx:filesAnalyzed false ;
    spdx:checksum [ a spdx:Checksum ; spdx:algorithm "SHA1" ] ;
    spdx:comment """multi
line""" ;
    spdx:order "3"^^xsd:integer ;
.
"#,
        )
        .unwrap();
        let subject = Term::Iri("https://example.com/doc#SPDXRef-pkg".to_string());
        let objects: Vec<_> = graph
            .triples
            .iter()
            .filter(|t| t.subject == subject)
            .map(|t| (t.predicate.clone(), t.object.clone()))
            .collect();
        assert_eq!(objects[0], (rdf_type(), Term::Iri(spdx("Package"))));
        assert_eq!(objects[1], (spdx("name"), Term::literal("pkg \"one\"")));
        assert_eq!(objects[2], (spdx("name"), Term::literal("alt")));
        assert_eq!(objects[3], (spdx("filesAnalyzed"), Term::typed("false", "boolean")));
        assert!(matches!(objects[4].1, Term::Blank(_)));
        assert_eq!(objects[5], (spdx("comment"), Term::literal("multi\nline")));
        assert_eq!(objects[6], (spdx("order"), Term::typed("3", "integer")));
        assert_eq!(graph.spdx_type_of(&objects[4].1), Some("Checksum"));
    }

    #[test]
    fn test_write_then_read_gives_the_same_graph() {
        let mut graph = Graph::new();
        let doc = Term::Iri("https://example.com/doc#SPDXRef-DOCUMENT".to_string());
        let info = Term::Blank("anon-gnrtd1".to_string());
        graph.add(doc.clone(), rdf_type(), Term::Iri(spdx("SpdxDocument")));
        graph.add(doc.clone(), spdx("name"), Term::literal("tab\there \"quoted\"\nnext"));
        graph.add(doc.clone(), spdx("creationInfo"), info.clone());
        graph.add(doc, "http://example.com/other#x-y", Term::typed("true", "boolean"));
        graph.add(info.clone(), rdf_type(), Term::Iri(spdx("CreationInfo")));
        graph.add(info, spdx("created"), Term::literal("2024-01-01T00:00:00Z"));

        let text = write(&graph);
        assert!(text.contains("a spdx:SpdxDocument"));
        assert!(text.contains("_:anon-gnrtd1"));
        assert_eq!(read(&text).unwrap().triples, graph.triples);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(read("<a> <b> "), Err(ConverterError::Decode(_))));
        assert!(matches!(read("x:a x:b x:c ."), Err(ConverterError::Decode(_))));
        let err = read("@prefix s: <http://s#> .\ns:a s:b ( s:c ) .").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
