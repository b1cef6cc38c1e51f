//! Deep copy of single records between two stores.

use crate::errors::ConverterError;
use crate::model::{self, PropertyValue, TypedValue, Value};
use crate::store::{IdKind, ModelStore};
use log::debug;
use std::collections::{BTreeSet, HashMap};

/// Copies records from one store into another, following references.
///
/// A manager remembers what it already copied, so a record reachable from
/// several places ends up in the destination exactly once. Use one manager
/// per document transfer.
#[derive(Debug, Default)]
pub struct ModelCopyManager {
    copied: HashMap<String, String>,
    created: Vec<String>,
    excluded_types: BTreeSet<String>,
}

impl ModelCopyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// References to records of these types are dropped instead of copied.
    pub fn excluding<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_types.extend(types.into_iter().map(Into::into));
        self
    }

    pub fn is_excluded(&self, type_name: &str) -> bool {
        self.excluded_types.contains(type_name)
    }

    /// Destination URI of an already copied source record.
    pub fn copied_uri(&self, source_uri: &str) -> Option<&str> {
        self.copied.get(source_uri).map(String::as_str)
    }

    /// Destination records created by this manager, in creation order.
    pub fn created(&self) -> &[String] {
        &self.created
    }

    /// Copies `object_uri` (and everything it references) from `source`
    /// into `dest`, addressed under `dest_namespace`. Returns the object URI
    /// in the destination store.
    pub fn copy(
        &mut self,
        dest: &mut dyn ModelStore,
        source: &dyn ModelStore,
        object_uri: &str,
        type_name: &str,
        spec_version: &str,
        dest_namespace: &str,
    ) -> Result<String, ConverterError> {
        if let Some(done) = self.copied_uri(object_uri) {
            return Ok(done.to_string());
        }
        let failure = |reason: String| ConverterError::CopyFailure {
            object_uri: object_uri.to_string(),
            type_name: type_name.to_string(),
            reason,
        };

        let source_obj = source
            .get(object_uri)
            .ok_or_else(|| failure("not found in the source store".to_string()))?;
        if source_obj.id.type_name != type_name {
            return Err(failure(format!(
                "source record has type {}",
                source_obj.id.type_name
            )));
        }

        let dest_doc = model::namespace_of(dest_namespace.trim_end_matches('#')).to_string();
        let local = model::local_id(object_uri);
        let dest_uri = if model::is_anonymous_id(local) {
            model::qualify(&dest_doc, &dest.next_identifier(IdKind::Anonymous, &dest_doc))
        } else {
            model::qualify(dest_namespace, local)
        };

        if !dest.exists(&dest_uri) {
            self.created.push(dest_uri.clone());
        }
        dest.create(&TypedValue::new(&dest_uri, type_name, spec_version))
            .map_err(|e| failure(e.to_string()))?;
        self.copied
            .insert(object_uri.to_string(), dest_uri.clone());
        debug!("Copying {type_name} {object_uri} -> {dest_uri}");

        let source_namespace = model::namespace_of(object_uri);
        for (name, property) in &source_obj.properties {
            let translated = match property {
                PropertyValue::Single(v) => {
                    match self.copy_value(dest, source, v, source_namespace, &dest_doc)? {
                        Some(v) => PropertyValue::Single(v),
                        None => continue,
                    }
                }
                PropertyValue::List(vs) => {
                    let mut out = Vec::with_capacity(vs.len());
                    for v in vs {
                        if let Some(v) =
                            self.copy_value(dest, source, v, source_namespace, &dest_doc)?
                        {
                            out.push(v);
                        }
                    }
                    PropertyValue::List(out)
                }
            };
            dest.set_property(&dest_uri, name, translated)
                .map_err(|e| failure(e.to_string()))?;
        }
        Ok(dest_uri)
    }

    fn copy_value(
        &mut self,
        dest: &mut dyn ModelStore,
        source: &dyn ModelStore,
        value: &Value,
        source_namespace: &str,
        dest_doc: &str,
    ) -> Result<Option<Value>, ConverterError> {
        let Value::Reference(target) = value else {
            return Ok(Some(value.clone()));
        };
        let Some(target_obj) = source.get(target) else {
            return Err(ConverterError::DanglingReference {
                from: source_namespace.to_string(),
                target: target.clone(),
            });
        };
        if self.is_excluded(&target_obj.id.type_name) {
            debug!("Dropping reference to excluded {} {}", target_obj.id.type_name, target);
            return Ok(None);
        }
        // Records of the document being copied follow it into the destination
        // namespace; anything else keeps its own namespace.
        let target_namespace = model::namespace_of(target);
        let namespace = if target_namespace == source_namespace {
            dest_doc
        } else {
            target_namespace
        };
        let type_name = target_obj.id.type_name.clone();
        let spec_version = target_obj.id.spec_version.clone();
        let dest_uri = self.copy(dest, source, target, &type_name, &spec_version, namespace)?;
        Ok(Some(Value::Reference(dest_uri)))
    }

    /// Removes every destination record this manager created.
    pub fn rollback(&mut self, dest: &mut dyn ModelStore) {
        for uri in self.created.drain(..).rev() {
            dest.delete(&uri);
        }
        self.copied.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CLASS_CHECKSUM, CLASS_CROSS_REF, CLASS_EXTRACTED_LICENSE, CLASS_PACKAGE};
    use crate::store::InMemStore;

    const SRC: &str = "https://example.com/src";

    fn uri(local: &str) -> String {
        model::qualify(SRC, local)
    }

    fn source_with_package() -> InMemStore {
        let mut store = InMemStore::new();
        let checksum = TypedValue::new(uri("anon-gnrtd1"), CLASS_CHECKSUM, "SPDX-2.3");
        store.create(&checksum).unwrap();
        store
            .set_property(
                &checksum.object_uri,
                "algorithm",
                PropertyValue::Single(Value::String("SHA1".into())),
            )
            .unwrap();
        let pkg = TypedValue::new(uri("SPDXRef-pkg"), CLASS_PACKAGE, "SPDX-2.3");
        store.create(&pkg).unwrap();
        store
            .set_property(
                &pkg.object_uri,
                "name",
                PropertyValue::Single(Value::String("pkg".into())),
            )
            .unwrap();
        store
            .set_property(
                &pkg.object_uri,
                "checksums",
                PropertyValue::List(vec![Value::Reference(checksum.object_uri)]),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_deep_copy_renames_anonymous_records() {
        let source = source_with_package();
        let mut dest = InMemStore::new();
        // Occupy the id the source used so the copy has to allocate a new one.
        dest.create(&TypedValue::new(uri("anon-gnrtd1"), CLASS_CHECKSUM, "SPDX-2.3"))
            .unwrap();

        let mut manager = ModelCopyManager::new();
        let dest_uri = manager
            .copy(&mut dest, &source, &uri("SPDXRef-pkg"), CLASS_PACKAGE, "SPDX-2.3", SRC)
            .unwrap();
        assert_eq!(dest_uri, uri("SPDXRef-pkg"));

        let pkg = dest.get(&dest_uri).unwrap();
        assert_eq!(pkg.get_str("name"), Some("pkg"));
        let checksum_uri = pkg.get_values("checksums")[0].as_reference().unwrap();
        assert_ne!(checksum_uri, uri("anon-gnrtd1"));
        assert_eq!(
            dest.get(checksum_uri).unwrap().get_str("algorithm"),
            Some("SHA1")
        );
        assert_eq!(manager.created().len(), 2);
    }

    #[test]
    fn test_copy_is_memoised() {
        let source = source_with_package();
        let mut dest = InMemStore::new();
        let mut manager = ModelCopyManager::new();
        manager
            .copy(&mut dest, &source, &uri("anon-gnrtd1"), CLASS_CHECKSUM, "SPDX-2.3", SRC)
            .unwrap();
        manager
            .copy(&mut dest, &source, &uri("SPDXRef-pkg"), CLASS_PACKAGE, "SPDX-2.3", SRC)
            .unwrap();
        assert_eq!(dest.len(), 2);
    }

    #[test]
    fn test_excluded_references_are_dropped() {
        let mut source = InMemStore::new();
        let cross_ref = TypedValue::new(uri("anon-gnrtd1"), CLASS_CROSS_REF, "SPDX-2.3");
        source.create(&cross_ref).unwrap();
        let license = TypedValue::new(uri("LicenseRef-a"), CLASS_EXTRACTED_LICENSE, "SPDX-2.3");
        source.create(&license).unwrap();
        source
            .set_property(
                &license.object_uri,
                "crossRefs",
                PropertyValue::List(vec![Value::Reference(cross_ref.object_uri)]),
            )
            .unwrap();

        let mut dest = InMemStore::new();
        let mut manager = ModelCopyManager::new().excluding([CLASS_CROSS_REF]);
        manager
            .copy(
                &mut dest,
                &source,
                &license.object_uri,
                CLASS_EXTRACTED_LICENSE,
                "SPDX-2.3",
                SRC,
            )
            .unwrap();
        assert_eq!(dest.len(), 1);
        assert!(
            dest.get(&license.object_uri)
                .unwrap()
                .get_values("crossRefs")
                .is_empty()
        );
    }

    #[test]
    fn test_type_mismatch_is_a_copy_failure() {
        let source = source_with_package();
        let mut dest = InMemStore::new();
        let err = ModelCopyManager::new()
            .copy(&mut dest, &source, &uri("SPDXRef-pkg"), "File", "SPDX-2.3", SRC)
            .unwrap_err();
        assert!(matches!(err, ConverterError::CopyFailure { .. }));
    }

    #[test]
    fn test_rollback_removes_created_records() {
        let source = source_with_package();
        let mut dest = InMemStore::new();
        let mut manager = ModelCopyManager::new();
        manager
            .copy(&mut dest, &source, &uri("SPDXRef-pkg"), CLASS_PACKAGE, "SPDX-2.3", SRC)
            .unwrap();
        manager.rollback(&mut dest);
        assert!(dest.is_empty());
        assert!(manager.copied_uri(&uri("SPDXRef-pkg")).is_none());
    }
}
