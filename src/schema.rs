//! JSON schema validation of SPDX JSON documents.
//!
//! This uses the `jsonschema` crate against the bundled SPDX 2.3 schema.
//! Every violation becomes one message, annotated with the instance path
//! it was found at. Failures to load or compile either side are reported
//! as a single message instead of an error, so verification carries on
//! with the semantic checks.

use crate::errors::ConverterError;
use log::{debug, info, warn};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// The SPDX 2.3 JSON schema.
pub const SPDX_SCHEMA: &str = include_str!("../schemas/spdx_2.3.schema.json");

/// Validator messages mentioning the schema's own `$id` keyword are
/// artefacts of draft-07 handling, not document defects.
const SCHEMA_ID_ARTEFACT: &str = "$id";

/// Validates a JSON file against a schema string, returning one message per
/// violation.
pub fn validate_json_schema(schema_str: &str, json_file_path: &Path) -> Vec<String> {
    let instance = match load_instance(json_file_path) {
        Ok(instance) => instance,
        Err(e) => {
            warn!("Schema validation skipped: {e}");
            return vec!["Unable to validate JSON file against schema due to I/O Error".to_string()];
        }
    };
    match validate_instance(schema_str, &instance) {
        Ok(messages) => messages,
        Err(e) => {
            warn!("Schema validation skipped: {e}");
            vec![
                "Unable to validate JSON file against schema due to processing exception"
                    .to_string(),
            ]
        }
    }
}

/// Validates an already parsed instance.
pub fn validate_instance(schema_str: &str, instance: &Value) -> Result<Vec<String>, ConverterError> {
    info!("Loading schema...");
    let schema_json: Value = serde_json::from_str(schema_str)
        .map_err(|e| ConverterError::Verification(format!("Invalid schema: {e}")))?;
    let compiled_schema = jsonschema::validator_for(&schema_json)
        .map_err(|e| ConverterError::Verification(format!("Invalid schema: {e}")))?;

    info!("Validating instance against schema...");
    let messages: Vec<String> = compiled_schema
        .iter_errors(instance)
        .map(|error| {
            let message = error.to_string();
            let path = error.instance_path.to_string();
            if path.is_empty() {
                message
            } else {
                format!("{message} at {path}")
            }
        })
        .filter(|message| {
            let artefact = message.contains(SCHEMA_ID_ARTEFACT);
            if artefact {
                debug!("Ignoring schema artefact: {message}");
            }
            !artefact
        })
        .collect();

    if messages.is_empty() {
        info!("Validation successful!");
    } else {
        info!("Schema validation found {} problem(s)", messages.len());
    }
    Ok(messages)
}

fn load_instance(json_file_path: &Path) -> Result<Value, ConverterError> {
    info!("Loading and parsing input file for validation...");
    let file = File::open(json_file_path)
        .map_err(|e| ConverterError::Io(e, "Failed to open input for validation".to_string()))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ConverterError::Decode(format!("Failed to parse SPDX JSON: {e}")))
}
