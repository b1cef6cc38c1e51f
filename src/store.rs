//! Model stores: the enumeration and allocation half of the store contract.
//!
//! Every format store keeps its records in an [`InMemStore`]; the copier and
//! the verifier only ever see the [`ModelStore`] trait.

use crate::errors::ConverterError;
use crate::model::{
    self, ANONYMOUS_PREFIX, CLASS_EXTERNAL_DOC_REF, CLASS_SPDX_DOCUMENT, ModelObject,
    PropertyValue, SPDX_ID_PREFIX, TypedValue, Value,
};
use indexmap::IndexMap;
use log::debug;

/// Kind of identifier requested from [`ModelStore::next_identifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Local id for a record with no SPDX identity (checksums, relationships...).
    Anonymous,
    /// A fresh `SPDXRef-` element id.
    SpdxId,
}

/// Uniform record access shared by every store.
pub trait ModelStore {
    fn exists(&self, object_uri: &str) -> bool;

    fn get(&self, object_uri: &str) -> Option<&ModelObject>;

    /// Creates an empty record. Creating an existing record is a no-op as
    /// long as the type matches.
    fn create(&mut self, id: &TypedValue) -> Result<(), ConverterError>;

    /// Sets a property, checking that every reference resolves in this store.
    fn set_property(
        &mut self,
        object_uri: &str,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), ConverterError>;

    fn delete(&mut self, object_uri: &str) -> bool;

    /// Snapshot of the records of one document, optionally restricted to a
    /// type. The iterator does not observe later changes to the store.
    fn all_items(
        &self,
        document_uri: &str,
        type_filter: Option<&str>,
    ) -> Box<dyn Iterator<Item = TypedValue> + '_>;

    /// Namespaces of every document record in the store.
    fn document_uris(&self) -> Vec<String>;

    /// A local id unique within `document_uri` for the given kind.
    fn next_identifier(&mut self, kind: IdKind, document_uri: &str) -> String;
}

/// Insertion-ordered in-memory record store.
#[derive(Debug, Default, Clone)]
pub struct InMemStore {
    objects: IndexMap<String, ModelObject>,
    next_id: u64,
}

impl InMemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn check_value(&self, from: &str, value: &Value) -> Result<(), ConverterError> {
        match value {
            Value::Reference(target) if !self.objects.contains_key(target) => {
                Err(ConverterError::DanglingReference {
                    from: from.to_string(),
                    target: target.clone(),
                })
            }
            Value::ExternalElement {
                document_ref,
                element_id,
            } => {
                let ref_uri = model::qualify(model::namespace_of(from), document_ref);
                match self.objects.get(&ref_uri) {
                    Some(obj) if obj.id.type_name == CLASS_EXTERNAL_DOC_REF => Ok(()),
                    _ => Err(ConverterError::DanglingReference {
                        from: from.to_string(),
                        target: format!("{document_ref}:{element_id}"),
                    }),
                }
            }
            _ => Ok(()),
        }
    }
}

impl ModelStore for InMemStore {
    fn exists(&self, object_uri: &str) -> bool {
        self.objects.contains_key(object_uri)
    }

    fn get(&self, object_uri: &str) -> Option<&ModelObject> {
        self.objects.get(object_uri)
    }

    fn create(&mut self, id: &TypedValue) -> Result<(), ConverterError> {
        if let Some(existing) = self.objects.get(&id.object_uri) {
            if existing.id.type_name != id.type_name {
                return Err(ConverterError::Decode(format!(
                    "{} already exists with type {}, can not create it as {}",
                    id.object_uri, existing.id.type_name, id.type_name
                )));
            }
            return Ok(());
        }
        debug!("Creating {} {}", id.type_name, id.object_uri);
        self.objects
            .insert(id.object_uri.clone(), ModelObject::new(id.clone()));
        Ok(())
    }

    fn set_property(
        &mut self,
        object_uri: &str,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), ConverterError> {
        if !self.objects.contains_key(object_uri) {
            return Err(ConverterError::DanglingReference {
                from: object_uri.to_string(),
                target: object_uri.to_string(),
            });
        }
        for v in value.values() {
            self.check_value(object_uri, v)?;
        }
        if let Some(obj) = self.objects.get_mut(object_uri) {
            obj.properties.insert(name.to_string(), value);
        }
        Ok(())
    }

    fn delete(&mut self, object_uri: &str) -> bool {
        self.objects.shift_remove(object_uri).is_some()
    }

    fn all_items(
        &self,
        document_uri: &str,
        type_filter: Option<&str>,
    ) -> Box<dyn Iterator<Item = TypedValue> + '_> {
        let items: Vec<TypedValue> = self
            .objects
            .values()
            .filter(|obj| model::namespace_of(&obj.id.object_uri) == document_uri)
            .filter(|obj| type_filter.is_none_or(|t| obj.id.type_name == t))
            .map(|obj| obj.id.clone())
            .collect();
        Box::new(items.into_iter())
    }

    fn document_uris(&self) -> Vec<String> {
        self.objects
            .values()
            .filter(|obj| obj.id.type_name == CLASS_SPDX_DOCUMENT)
            .map(|obj| model::namespace_of(&obj.id.object_uri).to_string())
            .collect()
    }

    fn next_identifier(&mut self, kind: IdKind, document_uri: &str) -> String {
        let prefix = match kind {
            IdKind::Anonymous => ANONYMOUS_PREFIX,
            IdKind::SpdxId => "SPDXRef-gnrtd",
        };
        loop {
            self.next_id += 1;
            let candidate = format!("{prefix}{}", self.next_id);
            if !self
                .objects
                .contains_key(&model::qualify(document_uri, &candidate))
            {
                return candidate;
            }
        }
    }
}

/// The single SPDX document held by a store.
pub fn document_from_store(store: &dyn ModelStore) -> Result<TypedValue, ConverterError> {
    let mut documents = Vec::new();
    for uri in store.document_uris() {
        documents.extend(store.all_items(&uri, Some(CLASS_SPDX_DOCUMENT)));
    }
    match documents.len() {
        0 => Err(ConverterError::NoDocument),
        1 => Ok(documents.remove(0)),
        n => Err(ConverterError::MultipleDocuments(n)),
    }
}

/// True if `id` looks like an SPDX element identifier.
pub fn is_spdx_id(id: &str) -> bool {
    id.strip_prefix(SPDX_ID_PREFIX).is_some_and(|rest| {
        !rest.is_empty()
            && rest
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    })
}
