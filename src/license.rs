//! SPDX license expression checks.
//!
//! Uses the `spdx` crate for expression parsing; `NOASSERTION` and `NONE`
//! are valid placeholders in SPDX 2.x documents and are accepted as is.

use crate::model::{NOASSERTION, NONE};

/// A license expression as written in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseExpression<'a> {
    pub expression: &'a str,
}

impl<'a> LicenseExpression<'a> {
    pub fn new(expression: &'a str) -> Self {
        Self {
            expression: expression.trim(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.expression == NOASSERTION || self.expression == NONE
    }

    /// Parses the expression strictly, returning the parser's message on
    /// failure.
    pub fn check(&self) -> Result<(), String> {
        if self.expression.is_empty() {
            return Err("empty license expression".to_string());
        }
        if self.is_placeholder() {
            return Ok(());
        }
        spdx::Expression::parse_mode(self.expression, spdx::ParseMode::STRICT)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    /// `LicenseRef-` identifiers used by the expression that are local to
    /// this document (not prefixed with a `DocumentRef-`).
    pub fn local_license_refs(&self) -> Vec<String> {
        if self.is_placeholder() {
            return Vec::new();
        }
        let Ok(expr) = spdx::Expression::parse_mode(self.expression, spdx::ParseMode::LAX) else {
            return Vec::new();
        };
        let mut refs: Vec<String> = expr
            .requirements()
            .filter_map(|req| match &req.req.license {
                spdx::LicenseItem::Other {
                    doc_ref: None,
                    lic_ref,
                } => Some(format!("LicenseRef-{lic_ref}")),
                _ => None,
            })
            .collect();
        refs.dedup();
        refs
    }
}
