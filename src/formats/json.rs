//! SPDX JSON format handler

use crate::errors::ConverterError;
use serde_json::Value;
use std::io::{Read, Write};

/// Parse an SPDX JSON document tree
pub fn read(reader: &mut dyn Read) -> Result<Value, ConverterError> {
    serde_json::from_reader(reader)
        .map_err(|e| ConverterError::Decode(format!("Failed to parse SPDX JSON: {}", e)))
}

/// Write an SPDX document tree as pretty-printed JSON
pub fn write(writer: &mut dyn Write, tree: &Value) -> Result<(), ConverterError> {
    serde_json::to_writer_pretty(&mut *writer, tree)
        .map_err(|e| ConverterError::Encode(format!("Failed to write SPDX JSON: {}", e)))?;
    writer
        .write_all(b"\n")
        .map_err(|e| ConverterError::Io(e, "Failed to write SPDX JSON".to_string()))
}
