//! Registry of supported SPDX model versions and version detection.
//!
//! The registry is process-wide and initialised once; every store created
//! afterwards relies on it to decide whether a document's declared version
//! can be handled.

use log::info;
use serde_json::Value;
use std::sync::OnceLock;

static SUPPORTED_VERSIONS: OnceLock<Vec<&'static str>> = OnceLock::new();

const V2_VERSIONS: &[&str] = &["SPDX-2.0", "SPDX-2.1", "SPDX-2.2", "SPDX-2.3"];

/// Registers the supported model versions. Safe to call more than once.
pub fn initialize() {
    let versions = SUPPORTED_VERSIONS.get_or_init(|| V2_VERSIONS.to_vec());
    info!("Registered SPDX model versions: {}", versions.join(", "));
}

pub fn supported_versions() -> &'static [&'static str] {
    SUPPORTED_VERSIONS.get_or_init(|| V2_VERSIONS.to_vec())
}

pub fn is_supported(version: &str) -> bool {
    supported_versions().contains(&version)
}

/// Model generation of a JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpdxVersion {
    /// SPDX 2.x, with the declared version string (e.g. `SPDX-2.3`).
    V2(String),
    /// SPDX 3 JSON-LD.
    V3,
    Unknown,
}

impl SpdxVersion {
    pub fn name(&self) -> &str {
        match self {
            SpdxVersion::V2(v) => v,
            SpdxVersion::V3 => "SPDX-3.0",
            SpdxVersion::Unknown => "Unknown",
        }
    }
}

/// Detect the SPDX version from JSON content
pub fn detect_version(value: &Value) -> SpdxVersion {
    if value.get("@context").is_some() || value.get("@graph").is_some() {
        return SpdxVersion::V3;
    }

    if let Some(spdx_version) = value.get("spdxVersion").and_then(|v| v.as_str()) {
        if spdx_version.starts_with("SPDX-3") {
            return SpdxVersion::V3;
        }
        return SpdxVersion::V2(spdx_version.to_string());
    }

    // SPDX 2.x without a version still carries SPDXID and a namespace
    if value.get("SPDXID").is_some() || value.get("documentNamespace").is_some() {
        return SpdxVersion::V2(crate::model::DEFAULT_SPEC_VERSION.to_string());
    }

    SpdxVersion::Unknown
}
