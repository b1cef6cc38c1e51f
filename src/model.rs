//! In-memory SPDX 2.x object model.
//!
//! Records are addressed by [`TypedValue`] and carry a flat property map.
//! The static property table returned by [`properties_of`] drives every
//! format codec, so adding a property here makes it flow through JSON, YAML,
//! XML, tag/value and RDF alike.

use std::collections::BTreeMap;

/// Spec version assumed when a document does not declare one.
pub const DEFAULT_SPEC_VERSION: &str = "SPDX-2.3";

/// Local id of the document record itself.
pub const DOCUMENT_SPDX_ID: &str = "SPDXRef-DOCUMENT";

pub const SPDX_ID_PREFIX: &str = "SPDXRef-";
pub const DOCUMENT_REF_PREFIX: &str = "DocumentRef-";
pub const LICENSE_REF_PREFIX: &str = "LicenseRef-";
pub const ANONYMOUS_PREFIX: &str = "anon-gnrtd";

pub const NOASSERTION: &str = "NOASSERTION";
pub const NONE: &str = "NONE";

// Class names
pub const CLASS_SPDX_DOCUMENT: &str = "SpdxDocument";
pub const CLASS_CREATION_INFO: &str = "CreationInfo";
pub const CLASS_EXTERNAL_DOC_REF: &str = "ExternalDocumentRef";
pub const CLASS_CHECKSUM: &str = "Checksum";
pub const CLASS_EXTRACTED_LICENSE: &str = "ExtractedLicensingInfo";
pub const CLASS_CROSS_REF: &str = "CrossRef";
pub const CLASS_PACKAGE: &str = "Package";
pub const CLASS_VERIFICATION_CODE: &str = "PackageVerificationCode";
pub const CLASS_EXTERNAL_REF: &str = "ExternalRef";
pub const CLASS_FILE: &str = "File";
pub const CLASS_RELATIONSHIP: &str = "Relationship";
pub const CLASS_ANNOTATION: &str = "Annotation";

/// Every class the model knows about.
pub const ALL_CLASSES: &[&str] = &[
    CLASS_SPDX_DOCUMENT,
    CLASS_CREATION_INFO,
    CLASS_EXTERNAL_DOC_REF,
    CLASS_CHECKSUM,
    CLASS_EXTRACTED_LICENSE,
    CLASS_CROSS_REF,
    CLASS_PACKAGE,
    CLASS_VERIFICATION_CODE,
    CLASS_EXTERNAL_REF,
    CLASS_FILE,
    CLASS_RELATIONSHIP,
    CLASS_ANNOTATION,
];

/// Address of one record in a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypedValue {
    pub object_uri: String,
    pub type_name: String,
    pub spec_version: String,
}

impl TypedValue {
    pub fn new(
        object_uri: impl Into<String>,
        type_name: impl Into<String>,
        spec_version: impl Into<String>,
    ) -> Self {
        Self {
            object_uri: object_uri.into(),
            type_name: type_name.into(),
            spec_version: spec_version.into(),
        }
    }
}

/// A single property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Boolean(bool),
    Integer(i64),
    /// Reference to another record in the same store, by object URI.
    Reference(String),
    /// An element of another SPDX document, reached through the external
    /// document reference `document_ref` of the referencing document.
    ExternalElement {
        document_ref: String,
        element_id: String,
    },
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&str> {
        match self {
            Value::Reference(uri) => Some(uri),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Single(Value),
    List(Vec<Value>),
}

impl PropertyValue {
    /// All values of the property, whether single or a list.
    pub fn values(&self) -> &[Value] {
        match self {
            PropertyValue::Single(v) => std::slice::from_ref(v),
            PropertyValue::List(vs) => vs,
        }
    }
}

/// A record owned by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelObject {
    pub id: TypedValue,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ModelObject {
    pub fn new(id: TypedValue) -> Self {
        Self {
            id,
            properties: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// The value of a single-valued string property.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.properties.get(name) {
            Some(PropertyValue::Single(Value::String(s))) => Some(s),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.properties.get(name) {
            Some(PropertyValue::Single(Value::Boolean(b))) => Some(*b),
            _ => None,
        }
    }

    /// All values of a property; empty if the property is not set.
    pub fn get_values(&self, name: &str) -> &[Value] {
        self.properties
            .get(name)
            .map(PropertyValue::values)
            .unwrap_or(&[])
    }

    /// The part of the object URI after `#`.
    pub fn local_id(&self) -> &str {
        local_id(&self.id.object_uri)
    }
}

/// How a property is typed in the object model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Text,
    Boolean,
    Integer,
    TextList,
    /// A nested record of the given class.
    Object(&'static str),
    ObjectList(&'static str),
    /// An SPDX element reference, written as its SPDX id.
    Element,
    ElementList,
}

impl PropertyKind {
    pub fn is_list(self) -> bool {
        matches!(
            self,
            PropertyKind::TextList | PropertyKind::ObjectList(_) | PropertyKind::ElementList
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub kind: PropertyKind,
}

const fn prop(name: &'static str, kind: PropertyKind) -> PropertyDescriptor {
    PropertyDescriptor { name, kind }
}

use PropertyKind::*;

const DOCUMENT_PROPERTIES: &[PropertyDescriptor] = &[
    prop("spdxVersion", Text),
    prop("dataLicense", Text),
    prop("name", Text),
    prop("comment", Text),
    prop("creationInfo", Object(CLASS_CREATION_INFO)),
    prop("externalDocumentRefs", ObjectList(CLASS_EXTERNAL_DOC_REF)),
    prop("hasExtractedLicensingInfos", ObjectList(CLASS_EXTRACTED_LICENSE)),
    prop("documentDescribes", ElementList),
    prop("annotations", ObjectList(CLASS_ANNOTATION)),
];

const CREATION_INFO_PROPERTIES: &[PropertyDescriptor] = &[
    prop("created", Text),
    prop("creators", TextList),
    prop("licenseListVersion", Text),
    prop("comment", Text),
];

const EXTERNAL_DOC_REF_PROPERTIES: &[PropertyDescriptor] = &[
    prop("spdxDocument", Text),
    prop("checksum", Object(CLASS_CHECKSUM)),
];

const CHECKSUM_PROPERTIES: &[PropertyDescriptor] =
    &[prop("algorithm", Text), prop("checksumValue", Text)];

const EXTRACTED_LICENSE_PROPERTIES: &[PropertyDescriptor] = &[
    prop("name", Text),
    prop("extractedText", Text),
    prop("seeAlsos", TextList),
    prop("comment", Text),
    prop("crossRefs", ObjectList(CLASS_CROSS_REF)),
];

const CROSS_REF_PROPERTIES: &[PropertyDescriptor] = &[
    prop("url", Text),
    prop("isValid", Boolean),
    prop("isLive", Boolean),
    prop("isWayBackLink", Boolean),
    prop("match", Text),
    prop("order", Integer),
    prop("timestamp", Text),
];

const PACKAGE_PROPERTIES: &[PropertyDescriptor] = &[
    prop("name", Text),
    prop("versionInfo", Text),
    prop("packageFileName", Text),
    prop("supplier", Text),
    prop("originator", Text),
    prop("downloadLocation", Text),
    prop("filesAnalyzed", Boolean),
    prop("packageVerificationCode", Object(CLASS_VERIFICATION_CODE)),
    prop("checksums", ObjectList(CLASS_CHECKSUM)),
    prop("homepage", Text),
    prop("sourceInfo", Text),
    prop("licenseConcluded", Text),
    prop("licenseInfoFromFiles", TextList),
    prop("licenseDeclared", Text),
    prop("licenseComments", Text),
    prop("copyrightText", Text),
    prop("summary", Text),
    prop("description", Text),
    prop("comment", Text),
    prop("externalRefs", ObjectList(CLASS_EXTERNAL_REF)),
    prop("attributionTexts", TextList),
    prop("primaryPackagePurpose", Text),
    prop("releaseDate", Text),
    prop("builtDate", Text),
    prop("validUntilDate", Text),
    prop("hasFiles", ElementList),
    prop("annotations", ObjectList(CLASS_ANNOTATION)),
];

const VERIFICATION_CODE_PROPERTIES: &[PropertyDescriptor] = &[
    prop("packageVerificationCodeValue", Text),
    prop("packageVerificationCodeExcludedFiles", TextList),
];

const EXTERNAL_REF_PROPERTIES: &[PropertyDescriptor] = &[
    prop("referenceCategory", Text),
    prop("referenceType", Text),
    prop("referenceLocator", Text),
    prop("comment", Text),
];

const FILE_PROPERTIES: &[PropertyDescriptor] = &[
    prop("fileName", Text),
    prop("fileTypes", TextList),
    prop("checksums", ObjectList(CLASS_CHECKSUM)),
    prop("licenseConcluded", Text),
    prop("licenseInfoInFiles", TextList),
    prop("licenseComments", Text),
    prop("copyrightText", Text),
    prop("comment", Text),
    prop("noticeText", Text),
    prop("fileContributors", TextList),
    prop("attributionTexts", TextList),
    prop("annotations", ObjectList(CLASS_ANNOTATION)),
];

const RELATIONSHIP_PROPERTIES: &[PropertyDescriptor] = &[
    prop("spdxElementId", Element),
    prop("relationshipType", Text),
    prop("relatedSpdxElement", Element),
    prop("comment", Text),
];

const ANNOTATION_PROPERTIES: &[PropertyDescriptor] = &[
    prop("annotator", Text),
    prop("annotationDate", Text),
    prop("annotationType", Text),
    prop("comment", Text),
];

/// The declared properties of a class, in canonical output order.
pub fn properties_of(class: &str) -> &'static [PropertyDescriptor] {
    match class {
        CLASS_SPDX_DOCUMENT => DOCUMENT_PROPERTIES,
        CLASS_CREATION_INFO => CREATION_INFO_PROPERTIES,
        CLASS_EXTERNAL_DOC_REF => EXTERNAL_DOC_REF_PROPERTIES,
        CLASS_CHECKSUM => CHECKSUM_PROPERTIES,
        CLASS_EXTRACTED_LICENSE => EXTRACTED_LICENSE_PROPERTIES,
        CLASS_CROSS_REF => CROSS_REF_PROPERTIES,
        CLASS_PACKAGE => PACKAGE_PROPERTIES,
        CLASS_VERIFICATION_CODE => VERIFICATION_CODE_PROPERTIES,
        CLASS_EXTERNAL_REF => EXTERNAL_REF_PROPERTIES,
        CLASS_FILE => FILE_PROPERTIES,
        CLASS_RELATIONSHIP => RELATIONSHIP_PROPERTIES,
        CLASS_ANNOTATION => ANNOTATION_PROPERTIES,
        _ => &[],
    }
}

pub fn property_descriptor(class: &str, name: &str) -> Option<PropertyDescriptor> {
    properties_of(class).iter().find(|p| p.name == name).copied()
}

/// For classes whose records are named, the JSON field that carries the
/// local id. Everything else nested inside an element is anonymous.
pub fn id_field(class: &str) -> Option<&'static str> {
    match class {
        CLASS_SPDX_DOCUMENT | CLASS_PACKAGE | CLASS_FILE => Some("SPDXID"),
        CLASS_EXTERNAL_DOC_REF => Some("externalDocumentId"),
        CLASS_EXTRACTED_LICENSE => Some("licenseId"),
        _ => None,
    }
}

/// True for classes that are license detail records and may be left out
/// of a transfer.
pub fn is_license_detail(class: &str) -> bool {
    class == CLASS_CROSS_REF
}

/// `documentUri#localId`. A namespace already ending in `#` is used as is.
pub fn qualify(namespace: &str, local_id: &str) -> String {
    if namespace.ends_with('#') {
        format!("{namespace}{local_id}")
    } else {
        format!("{namespace}#{local_id}")
    }
}

/// The document URI part of an object URI.
pub fn namespace_of(object_uri: &str) -> &str {
    match object_uri.rfind('#') {
        Some(idx) => &object_uri[..idx],
        None => object_uri,
    }
}

pub fn local_id(object_uri: &str) -> &str {
    match object_uri.rfind('#') {
        Some(idx) => &object_uri[idx + 1..],
        None => object_uri,
    }
}

pub fn is_anonymous_id(local_id: &str) -> bool {
    local_id.starts_with(ANONYMOUS_PREFIX)
}

/// Splits `DocumentRef-x:SPDXRef-y` into its two halves.
pub fn split_external_element(text: &str) -> Option<(&str, &str)> {
    let (document_ref, element_id) = text.split_once(':')?;
    if document_ref.starts_with(DOCUMENT_REF_PREFIX) && !element_id.is_empty() {
        Some((document_ref, element_id))
    } else {
        None
    }
}
