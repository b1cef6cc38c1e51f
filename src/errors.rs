//! Defines the custom error types for the application.
//!
//! This uses `thiserror` as specified in `Cargo.toml` for clean,
//! boilerplate-free error handling.

use std::path::PathBuf;
use thiserror::Error;

/// Classification of a [`ConverterError`], independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidFileName,
    UnsupportedFormat,
    SourceNotFound,
    DestinationExists,
    Decode,
    Encode,
    NoDocument,
    MultipleDocuments,
    DanglingReference,
    CopyFailure,
    Conversion,
    Verification,
    Io,
}

#[derive(Error, Debug)]
pub enum ConverterError {
    #[error("I/O Error: {1} - {0}")]
    Io(#[source] std::io::Error, String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Unsupported Format: {0}")]
    UnsupportedFormat(String),

    #[error("Input file {} does not exist.", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Output file {} already exists.", .0.display())]
    DestinationExists(PathBuf),

    #[error("Parse Error: {0}")]
    Decode(String),

    #[error("Serialization Error: {0}")]
    Encode(String),

    #[error("No SPDX documents in model store")]
    NoDocument,

    #[error("Multiple SPDX documents in model store ({0}). There can only be one SPDX document.")]
    MultipleDocuments(usize),

    #[error("Dangling reference from {from} to {target}")]
    DanglingReference { from: String, target: String },

    #[error("Unable to copy {type_name} {object_uri}: {reason}")]
    CopyFailure {
        object_uri: String,
        type_name: String,
        reason: String,
    },

    #[error("Error converting SPDX file: {message}")]
    Conversion {
        kind: ErrorKind,
        message: String,
        #[source]
        source: Box<ConverterError>,
    },

    #[error("Verification Error: {0}")]
    Verification(String),
}

impl ConverterError {
    /// The classification of this error. A `Conversion` wrapper reports the
    /// kind of the error it wraps.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConverterError::Io(..) => ErrorKind::Io,
            ConverterError::InvalidFileName(_) => ErrorKind::InvalidFileName,
            ConverterError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            ConverterError::SourceNotFound(_) => ErrorKind::SourceNotFound,
            ConverterError::DestinationExists(_) => ErrorKind::DestinationExists,
            ConverterError::Decode(_) => ErrorKind::Decode,
            ConverterError::Encode(_) => ErrorKind::Encode,
            ConverterError::NoDocument => ErrorKind::NoDocument,
            ConverterError::MultipleDocuments(_) => ErrorKind::MultipleDocuments,
            ConverterError::DanglingReference { .. } => ErrorKind::DanglingReference,
            ConverterError::CopyFailure { .. } => ErrorKind::CopyFailure,
            ConverterError::Conversion { kind, .. } => *kind,
            ConverterError::Verification(_) => ErrorKind::Verification,
        }
    }

    /// Wraps any error into the umbrella `Conversion` error, keeping the
    /// original classification and message. Already wrapped errors pass
    /// through untouched.
    pub fn into_conversion(self) -> Self {
        match self {
            wrapped @ ConverterError::Conversion { .. } => wrapped,
            other => ConverterError::Conversion {
                kind: other.kind(),
                message: other.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Lines describing this error followed by its causes. A cause whose
    /// text is already part of the line before it is left out.
    pub fn report_lines(&self) -> Vec<String> {
        let mut lines = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            let text = cause.to_string();
            if lines.last().is_none_or(|last| !last.contains(&text)) {
                lines.push(format!("  Caused by: {text}"));
            }
            source = cause.source();
        }
        lines
    }
}

// Implement From<io::Error> for easier error handling
impl From<std::io::Error> for ConverterError {
    fn from(err: std::io::Error) -> Self {
        ConverterError::Io(err, "IO operation failed".to_string())
    }
}
