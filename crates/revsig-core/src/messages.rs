//! Report messages.
//!
//! Messages are part of the report contract: callers and tests match on them.

pub const DOCUMENT_WITHOUT_SIGNATURES: &str = "Document doesn't contain any signatures.";
pub const REVISIONS_RETRIEVAL_FAILED: &str = "Wasn't possible to retrieve document revisions.";
pub const REVISIONS_READING_EXCEPTION: &str =
    "IO failure occurred during document revisions reading.";
pub const TOO_MANY_REVISIONS: &str =
    "Document has more revisions than the configured limit. Remaining revisions were not validated.";
pub const SIGNATURE_REVISION_NOT_FOUND: &str =
    "Not possible to identify document revision corresponding to the first signature in the document.";
pub const TOO_MANY_CERTIFICATION_SIGNATURES: &str =
    "Document contains more than one certification signature.";

pub const NOT_ALLOWED_CATALOG_CHANGES: &str = "PDF document catalog contains changes other than DSS dictionary and DTS addition (docMDP level >= 1), form fill-in and digital signatures (docMDP level >= 2), adding or editing annotations (docMDP level 3).";
pub const NOT_ALLOWED_ACROFORM_CHANGES: &str = "PDF document AcroForm contains changes other than document timestamp (docMDP level >= 1), form fill-in and digital signatures (docMDP level >= 2), adding or editing annotations (docMDP level 3).";

pub const EXTENSIONS_REMOVED: &str = "Extensions dictionary was removed from the catalog.";
pub const EXTENSIONS_TYPE: &str = "Developer extensions must be a dictionary.";
pub const PERMISSIONS_REMOVED: &str = "Permissions dictionary was removed from the catalog.";
pub const PERMISSIONS_TYPE: &str = "Permissions must be a dictionary.";
pub const DSS_REMOVED: &str = "DSS dictionary was removed from catalog.";
pub const ACROFORM_REMOVED: &str = "AcroForm dictionary was removed from catalog.";

pub const PAGES_MODIFIED: &str = "Pages structure was unexpectedly modified.";
pub const PAGE_MODIFIED: &str = "Page was unexpectedly modified.";
pub const PAGE_ANNOTATIONS_MODIFIED: &str = "Page annotations were unexpectedly modified.";
pub const TABS_MODIFIED: &str = "Page tab order was unexpectedly modified.";

pub const STRUCT_TREE_ROOT_ADDED: &str = "Structure tree root was added to the catalog.";
pub const STRUCT_TREE_ROOT_REMOVED: &str = "Structure tree root was removed from the catalog.";
pub const STRUCT_TREE_ROOT_MODIFIED: &str = "Structure tree root was unexpectedly modified.";
pub const STRUCT_KIDS_NOT_COMPARABLE: &str =
    "Structure element kids changed too much to be aligned; the element was not checked.";

pub fn developer_extension_removed(prefix: &str) -> String {
    format!("Developer extension \"{prefix}\" dictionary was removed or unexpectedly modified.")
}

pub fn extension_level_decreased(prefix: &str) -> String {
    format!("Extension level number for {prefix} developer extension was decreased.")
}

pub fn base_version_decreased(prefix: &str) -> String {
    format!("Base version number for {prefix} developer extension was decreased or is not a number.")
}

pub fn permission_removed(name: &str) -> String {
    format!("Permission \"{name}\" dictionary was removed or unexpectedly modified.")
}

pub fn field_removed(name: &str) -> String {
    format!("Form field \"{name}\" was removed or unexpectedly modified.")
}

pub fn field_not_dictionary(name: &str) -> String {
    format!("Form field \"{name}\" or one of its widgets is not a dictionary. It will not be validated.")
}

pub fn unexpected_form_field(name: &str) -> String {
    format!("New PDF document revision contains unexpected form field \"{name}\".")
}

pub fn locked_field_removed(name: &str) -> String {
    format!("Locked form field \"{name}\" was removed from the document.")
}

pub fn locked_field_modified(name: &str) -> String {
    format!("Locked form field \"{name}\" or one of its widgets was modified.")
}

pub fn locked_field_kids_added(name: &str) -> String {
    format!("Kids were added to locked form field \"{name}\".")
}

pub fn locked_field_kids_removed(name: &str) -> String {
    format!("Kids were removed from locked form field \"{name}\".")
}

pub fn signature_modified(name: &str) -> String {
    format!("Signature {name} was unexpectedly modified.")
}

pub fn struct_element_modified(reference: &str) -> String {
    format!("Structure element {reference} was unexpectedly modified, added or removed.")
}

pub fn removed_annotation_still_tagged(reference: &str) -> String {
    format!("Annotation {reference} was removed but is still referenced from the structure tree.")
}

pub fn added_annotation_already_tagged(reference: &str) -> String {
    format!("Annotation {reference} was added to a page but was already referenced from the structure tree.")
}

pub fn object_removed(num: u32) -> String {
    format!("Object \"{num}\", which is not allowed to be removed, was removed from the document through XREF table.")
}

pub fn unexpected_entry_in_xref(num: u32) -> String {
    format!("New PDF document revision contains unexpected entry \"{num}\" in XREF table.")
}

pub fn unknown_access_permissions(signature: &str) -> String {
    format!("Access permissions level number specified for \"{signature}\" signature is undefined. Default level 2 will be used instead.")
}

pub fn access_permissions_added(signature: &str) -> String {
    format!("Access permissions level specified for \"{signature}\" approval signature is higher than previous one specified. These access permissions will be ignored.")
}

pub fn certification_after_approval(signature: &str) -> String {
    format!("Certification signature \"{signature}\" is applied after an approval signature, which is not allowed. Its access permissions will be ignored.")
}

pub fn unrecognized_action(action: &str) -> String {
    format!("Signature field lock dictionary contains unrecognized \"Action\" value \"{action}\". \"All\" will be used instead.")
}

pub fn signature_revision_not_found(signature: &str) -> String {
    format!("Not possible to identify document revision corresponding to signature \"{signature}\".")
}
