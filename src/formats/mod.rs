//! Format registry.
//!
//! Maps format tokens and file names to [`Format`], and formats to the
//! serializable store that reads and writes them.

pub mod json;
pub mod rdf;
pub mod tagvalue;
pub mod tree;
pub mod xml;
pub mod yaml;

use crate::errors::ConverterError;
use crate::store::InMemStore;
use rdf::{OutputFormat, RdfStore};
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;
use tree::{TreeEncoding, TreeStore};

/// Supported SPDX serialization formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    RdfXml,
    RdfTtl,
    Xml,
    Xls,
    Xlsx,
    Yaml,
    Tag,
}

/// Extension -> format. Compound extensions are matched on the full file
/// name suffix before the last segment is looked up.
const EXTENSIONS: &[(&str, Format)] = &[
    ("json", Format::Json),
    ("rdf.xml", Format::RdfXml),
    ("rdf", Format::RdfXml),
    ("xml", Format::Xml),
    ("xls", Format::Xls),
    ("xlsx", Format::Xlsx),
    ("yaml", Format::Yaml),
    ("yml", Format::Yaml),
    ("tag", Format::Tag),
    ("spdx", Format::Tag),
    ("rdf.ttl", Format::RdfTtl),
];

impl Format {
    pub const ALL: [Format; 8] = [
        Format::Json,
        Format::RdfXml,
        Format::RdfTtl,
        Format::Xml,
        Format::Xls,
        Format::Xlsx,
        Format::Yaml,
        Format::Tag,
    ];

    /// Detect format from the file name
    pub fn from_file_name(path: &Path) -> Result<Self, ConverterError> {
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let Some(idx) = file_name.rfind('.') else {
            return Err(ConverterError::InvalidFileName(format!(
                "Can not convert file to file type - no file extension for file {}",
                path.display()
            )));
        };

        let mut ext = file_name[idx + 1..].to_lowercase();
        let lower_name = file_name.to_lowercase();
        if ext == "xml" && lower_name.ends_with("rdf.xml") {
            ext = "rdf.xml".to_string();
        }
        if ext == "ttl" && lower_name.ends_with("rdf.ttl") {
            ext = "rdf.ttl".to_string();
        }

        EXTENSIONS
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, f)| *f)
            .ok_or_else(|| {
                ConverterError::InvalidFileName(format!(
                    "Unrecognized file extension: {} for file {}",
                    ext,
                    path.display()
                ))
            })
    }

    /// The token used on the command line.
    pub fn token(&self) -> &'static str {
        match self {
            Format::Json => "JSON",
            Format::RdfXml => "RDFXML",
            Format::RdfTtl => "RDFTTL",
            Format::Xml => "XML",
            Format::Xls => "XLS",
            Format::Xlsx => "XLSX",
            Format::Yaml => "YAML",
            Format::Tag => "TAG",
        }
    }

    /// Get the typical file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::RdfXml => "rdf.xml",
            Format::RdfTtl => "rdf.ttl",
            Format::Xml => "xml",
            Format::Xls => "xls",
            Format::Xlsx => "xlsx",
            Format::Yaml => "yaml",
            Format::Tag => "spdx",
        }
    }

    pub fn is_rdf(&self) -> bool {
        matches!(self, Format::RdfXml | Format::RdfTtl)
    }

    /// Formats validated against the bundled JSON schema.
    pub fn is_schema_bearing(&self) -> bool {
        *self == Format::Json
    }

    /// A fresh, empty store able to read and write this format.
    pub fn store(&self) -> Result<Box<dyn SerializableStore>, ConverterError> {
        match self {
            Format::Json => Ok(Box::new(TreeStore::new(TreeEncoding::Json))),
            Format::Yaml => Ok(Box::new(TreeStore::new(TreeEncoding::Yaml))),
            Format::Xml => Ok(Box::new(TreeStore::new(TreeEncoding::Xml))),
            Format::Tag => Ok(Box::new(tagvalue::TagValueStore::new())),
            Format::RdfXml => Ok(Box::new(RdfStore::new(OutputFormat::Xml))),
            Format::RdfTtl => Ok(Box::new(RdfStore::new(OutputFormat::Turtle))),
            Format::Xls | Format::Xlsx => Err(ConverterError::UnsupportedFormat(format!(
                "Unsupported file type: {}.  Check back later.",
                self.token()
            ))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Format {
    type Err = ConverterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_uppercase();
        Format::ALL
            .into_iter()
            .find(|f| f.token() == token)
            .ok_or_else(|| {
                ConverterError::UnsupportedFormat(format!(
                    "{} is not a valid SPDX file type. Expected one of: {}",
                    s.trim(),
                    Format::ALL.map(|f| f.token()).join(", ")
                ))
            })
    }
}

/// A store that can be read from and written to one serialization format.
pub trait SerializableStore {
    fn format(&self) -> Format;

    fn model(&self) -> &InMemStore;

    fn model_mut(&mut self) -> &mut InMemStore;

    /// Replaces the store content with the document read from `reader` and
    /// returns its document URI. On error the store is left untouched.
    fn deserialize(&mut self, reader: &mut dyn Read) -> Result<String, ConverterError>;

    fn serialize(&self, writer: &mut dyn Write) -> Result<(), ConverterError>;

    /// Recoverable problems noticed while reading.
    fn warnings(&self) -> &[String] {
        &[]
    }

    fn as_rdf_mut(&mut self) -> Option<&mut RdfStore> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use std::path::PathBuf;

    fn infer(name: &str) -> Result<Format, ConverterError> {
        Format::from_file_name(&PathBuf::from(name))
    }

    #[test]
    fn test_from_file_name() {
        assert_eq!(infer("doc.json").unwrap(), Format::Json);
        assert_eq!(infer("doc.rdf.xml").unwrap(), Format::RdfXml);
        assert_eq!(infer("doc.rdf").unwrap(), Format::RdfXml);
        assert_eq!(infer("doc.xml").unwrap(), Format::Xml);
        assert_eq!(infer("doc.rdf.ttl").unwrap(), Format::RdfTtl);
        assert_eq!(infer("doc.spdx").unwrap(), Format::Tag);
        assert_eq!(infer("doc.tag").unwrap(), Format::Tag);
        assert_eq!(infer("doc.yml").unwrap(), Format::Yaml);
        assert_eq!(infer("doc.yaml").unwrap(), Format::Yaml);
        assert_eq!(infer("doc.xlsx").unwrap(), Format::Xlsx);
        assert_eq!(infer("/tmp/dir.d/DOC.JSON").unwrap(), Format::Json);
    }

    #[test]
    fn test_from_file_name_failures() {
        assert_eq!(infer("doc.unknownext").unwrap_err().kind(), ErrorKind::InvalidFileName);
        assert_eq!(infer("doc").unwrap_err().kind(), ErrorKind::InvalidFileName);
        // A bare .ttl file is not RDF/Turtle by extension
        assert_eq!(infer("doc.ttl").unwrap_err().kind(), ErrorKind::InvalidFileName);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(" json ".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("RdfTtl".parse::<Format>().unwrap(), Format::RdfTtl);
        assert_eq!("tag".parse::<Format>().unwrap(), Format::Tag);
        let err = "pdf".parse::<Format>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_tokens_round_trip() {
        for format in Format::ALL {
            assert_eq!(format.to_string().parse::<Format>().unwrap(), format);
        }
    }

    #[test]
    fn test_store_resolution() {
        assert_eq!(Format::Json.store().unwrap().format(), Format::Json);
        assert_eq!(Format::RdfTtl.store().unwrap().format(), Format::RdfTtl);
        assert!(Format::RdfXml.store().unwrap().as_rdf_mut().is_some());
        assert!(Format::Tag.store().unwrap().as_rdf_mut().is_none());
        let err = Format::Xls.store().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert!(err.to_string().contains("Check back later"));
    }

    #[test]
    fn test_flags() {
        assert!(Format::RdfXml.is_rdf());
        assert!(!Format::Xml.is_rdf());
        assert!(Format::Json.is_schema_bearing());
        assert!(!Format::Yaml.is_schema_bearing());
        assert_eq!(Format::RdfTtl.extension(), "rdf.ttl");
    }
}
