//! Cross-store copy of a whole SPDX document.
//!
//! External document references are copied first: records copied later may
//! point at elements of other documents through them, and the destination
//! store refuses references to records that do not exist yet.

use crate::copy_manager::ModelCopyManager;
use crate::errors::ConverterError;
use crate::model::{self, CLASS_CROSS_REF, CLASS_EXTERNAL_DOC_REF};
use crate::progress::ProgressTracker;
use crate::store::ModelStore;
use log::{info, warn};

/// Outcome of a successful document copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Records enumerated and copied (or already reached through a reference).
    pub copied: usize,
    /// Records deliberately left out.
    pub skipped: usize,
}

/// Copies every record of `document_uri` from `source` into `dest`.
///
/// On failure every record created in `dest` by this call is removed again
/// and the error is returned as a `CopyFailure`.
pub fn copy_document(
    dest: &mut dyn ModelStore,
    source: &dyn ModelStore,
    document_uri: &str,
    exclude_license_details: bool,
) -> Result<CopyStats, ConverterError> {
    let mut manager = ModelCopyManager::new();
    if exclude_license_details {
        manager = manager.excluding([CLASS_CROSS_REF]);
    }

    match copy_passes(&mut manager, dest, source, document_uri, exclude_license_details) {
        Ok(stats) => Ok(stats),
        Err(e) => {
            warn!(
                "Copy of {document_uri} failed, removing {} partially copied records",
                manager.created().len()
            );
            manager.rollback(dest);
            Err(as_copy_failure(e, document_uri))
        }
    }
}

fn copy_passes(
    manager: &mut ModelCopyManager,
    dest: &mut dyn ModelStore,
    source: &dyn ModelStore,
    document_uri: &str,
    exclude_license_details: bool,
) -> Result<CopyStats, ConverterError> {
    // Pass 1: external document references, under `documentUri#`.
    let external_namespace = format!("{document_uri}#");
    let pass_one = ProgressTracker::new(1000);
    for item in source.all_items(document_uri, Some(CLASS_EXTERNAL_DOC_REF)) {
        manager.copy(
            dest,
            source,
            &item.object_uri,
            &item.type_name,
            &item.spec_version,
            &external_namespace,
        )?;
        pass_one.increment_copied();
    }
    pass_one.finish("External document references");

    // Pass 2: everything else.
    let pass_two = ProgressTracker::new(1000);
    for item in source.all_items(document_uri, None) {
        if item.type_name == CLASS_EXTERNAL_DOC_REF {
            continue;
        }
        if exclude_license_details && model::is_license_detail(&item.type_name) {
            pass_two.increment_skipped();
            continue;
        }
        manager.copy(
            dest,
            source,
            &item.object_uri,
            &item.type_name,
            &item.spec_version,
            document_uri,
        )?;
        pass_two.increment_copied();
    }
    pass_two.finish("Document records");

    let stats = CopyStats {
        copied: pass_one.copied_count() + pass_two.copied_count(),
        skipped: pass_two.skipped_count(),
    };
    info!(
        "Copied {} records of {} ({} skipped)",
        stats.copied, document_uri, stats.skipped
    );
    Ok(stats)
}

fn as_copy_failure(err: ConverterError, document_uri: &str) -> ConverterError {
    match err {
        failure @ ConverterError::CopyFailure { .. } => failure,
        other => ConverterError::CopyFailure {
            object_uri: document_uri.to_string(),
            type_name: model::CLASS_SPDX_DOCUMENT.to_string(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CLASS_CHECKSUM, CLASS_EXTRACTED_LICENSE, CLASS_PACKAGE, CLASS_RELATIONSHIP,
        CLASS_SPDX_DOCUMENT, PropertyValue, TypedValue, Value,
    };
    use crate::store::InMemStore;

    const DOC: &str = "https://example.com/spdx/doc-1";

    fn uri(local: &str) -> String {
        model::qualify(DOC, local)
    }

    fn text(s: &str) -> PropertyValue {
        PropertyValue::Single(Value::String(s.to_string()))
    }

    fn create(store: &mut InMemStore, local: &str, class: &str) -> String {
        let id = TypedValue::new(uri(local), class, "SPDX-2.3");
        store.create(&id).unwrap();
        id.object_uri
    }

    /// A document with one package, one external document reference and a
    /// relationship from the package to an element of the external document.
    fn source_store() -> InMemStore {
        let mut store = InMemStore::new();
        let doc = create(&mut store, "SPDXRef-DOCUMENT", CLASS_SPDX_DOCUMENT);
        store.set_property(&doc, "name", text("doc")).unwrap();

        let pkg = create(&mut store, "SPDXRef-pkg", CLASS_PACKAGE);
        store.set_property(&pkg, "name", text("pkg")).unwrap();

        let checksum = create(&mut store, "anon-gnrtd1", CLASS_CHECKSUM);
        store.set_property(&checksum, "algorithm", text("SHA1")).unwrap();
        let ext = create(&mut store, "DocumentRef-ext", CLASS_EXTERNAL_DOC_REF);
        store
            .set_property(&ext, "spdxDocument", text("https://example.com/ext"))
            .unwrap();
        store
            .set_property(
                &ext,
                "checksum",
                PropertyValue::Single(Value::Reference(checksum)),
            )
            .unwrap();

        let rel = create(&mut store, "anon-gnrtd2", CLASS_RELATIONSHIP);
        store
            .set_property(&rel, "spdxElementId", PropertyValue::Single(Value::Reference(pkg)))
            .unwrap();
        store
            .set_property(&rel, "relationshipType", text("DEPENDS_ON"))
            .unwrap();
        store
            .set_property(
                &rel,
                "relatedSpdxElement",
                PropertyValue::Single(Value::ExternalElement {
                    document_ref: "DocumentRef-ext".to_string(),
                    element_id: "SPDXRef-lib".to_string(),
                }),
            )
            .unwrap();
        store
    }

    fn with_license_details(store: &mut InMemStore) {
        let cross_ref = create(store, "anon-gnrtd3", CLASS_CROSS_REF);
        store
            .set_property(&cross_ref, "url", text("https://example.com/license"))
            .unwrap();
        let license = create(store, "LicenseRef-custom", CLASS_EXTRACTED_LICENSE);
        store
            .set_property(&license, "extractedText", text("Custom terms"))
            .unwrap();
        store
            .set_property(
                &license,
                "crossRefs",
                PropertyValue::List(vec![Value::Reference(cross_ref)]),
            )
            .unwrap();
    }

    #[test]
    fn test_two_pass_copy_preserves_external_references() {
        let source = source_store();
        let mut dest = InMemStore::new();
        let stats = copy_document(&mut dest, &source, DOC, false).unwrap();

        assert_eq!(dest.len(), source.len());
        assert_eq!(stats.skipped, 0);
        let relationships: Vec<_> = dest.all_items(DOC, Some(CLASS_RELATIONSHIP)).collect();
        assert_eq!(relationships.len(), 1);
        let rel = dest.get(&relationships[0].object_uri).unwrap();
        assert_eq!(
            rel.get_values("relatedSpdxElement"),
            &[Value::ExternalElement {
                document_ref: "DocumentRef-ext".to_string(),
                element_id: "SPDXRef-lib".to_string(),
            }]
        );
        assert!(dest.exists(&uri("DocumentRef-ext")));
    }

    #[test]
    fn test_reverse_order_leaves_a_dangling_reference() {
        let source = source_store();
        let mut dest = InMemStore::new();
        let mut manager = ModelCopyManager::new();

        // Copy in reverse: the relationship before the external document
        // reference it resolves through.
        let mut items: Vec<_> = source.all_items(DOC, None).collect();
        items.reverse();
        let result = items.iter().try_for_each(|item| {
            manager
                .copy(
                    &mut dest,
                    &source,
                    &item.object_uri,
                    &item.type_name,
                    &item.spec_version,
                    DOC,
                )
                .map(|_| ())
        });
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Dangling reference"), "{err}");
    }

    #[test]
    fn test_exclude_license_details() {
        let mut source = source_store();
        with_license_details(&mut source);
        let mut dest = InMemStore::new();
        let stats = copy_document(&mut dest, &source, DOC, true).unwrap();

        assert_eq!(stats.skipped, 1);
        assert_eq!(dest.all_items(DOC, Some(CLASS_CROSS_REF)).count(), 0);
        assert_eq!(dest.len(), source.len() - 1);
        let license = dest.get(&uri("LicenseRef-custom")).unwrap();
        assert_eq!(license.get_str("extractedText"), Some("Custom terms"));
        assert!(license.get_values("crossRefs").is_empty());
    }

    #[test]
    fn test_license_details_are_kept_by_default() {
        let mut source = source_store();
        with_license_details(&mut source);
        let mut dest = InMemStore::new();
        copy_document(&mut dest, &source, DOC, false).unwrap();
        assert_eq!(dest.all_items(DOC, Some(CLASS_CROSS_REF)).count(), 1);
    }

    #[test]
    fn test_failed_copy_is_rolled_back() {
        let source = source_store();
        let mut dest = InMemStore::new();
        // A record of the wrong type at the package address makes the copy fail.
        dest.create(&TypedValue::new(uri("SPDXRef-pkg"), "File", "SPDX-2.3"))
            .unwrap();

        let err = copy_document(&mut dest, &source, DOC, false).unwrap_err();
        match err {
            ConverterError::CopyFailure { object_uri, type_name, .. } => {
                assert_eq!(object_uri, uri("SPDXRef-pkg"));
                assert_eq!(type_name, CLASS_PACKAGE);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(dest.len(), 1);
    }
}
