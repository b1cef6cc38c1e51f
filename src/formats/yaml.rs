//! SPDX YAML format handler

use crate::errors::ConverterError;
use serde_json::Value;
use std::io::{Read, Write};

/// Parse an SPDX YAML document into the shared document tree
pub fn read(reader: &mut dyn Read) -> Result<Value, ConverterError> {
    serde_yaml::from_reader(reader)
        .map_err(|e| ConverterError::Decode(format!("Failed to parse SPDX YAML: {}", e)))
}

pub fn write(writer: &mut dyn Write, tree: &Value) -> Result<(), ConverterError> {
    serde_yaml::to_writer(writer, tree)
        .map_err(|e| ConverterError::Encode(format!("Failed to write SPDX YAML: {}", e)))
}
