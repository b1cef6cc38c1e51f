//! Main library for the SPDX converter.
//!
//! This crate loads an SPDX 2.x document from one serialization (JSON,
//! YAML, XML, tag/value, RDF/XML or RDF/Turtle) into an in-memory model
//! store, copies it into a store of another format and writes it back out.
//! It also verifies documents against the SPDX JSON schema and the SPDX
//! semantic rules.

pub mod converter;
pub mod copier;
pub mod copy_manager;
pub mod errors;
pub mod formats;
pub mod license;
pub mod model;
pub mod progress;
pub mod schema;
pub mod store;
pub mod validation;
pub mod verify;
pub mod versions;

pub use converter::{ConvertConfig, convert};
pub use errors::{ConverterError, ErrorKind};
pub use formats::Format;
pub use verify::{verify, verify_report};

/// Process-wide setup, run once before any conversion or verification.
pub fn initialize() {
    versions::initialize();
}
