//! Dictionary keys and name values used by the validator.
//!
//! These must remain stable: they are the vocabulary of the document format.

pub const TYPE: &str = "Type";
pub const SUBTYPE: &str = "Subtype";
pub const VERSION: &str = "Version";
pub const METADATA: &str = "Metadata";

// Catalog
pub const CATALOG: &str = "Catalog";
pub const EXTENSIONS: &str = "Extensions";
pub const PERMS: &str = "Perms";
pub const DSS: &str = "DSS";
pub const ACRO_FORM: &str = "AcroForm";
pub const PAGES: &str = "Pages";
pub const STRUCT_TREE_ROOT: &str = "StructTreeRoot";

// Developer extensions
pub const EXTENSION_LEVEL: &str = "ExtensionLevel";
pub const BASE_VERSION: &str = "BaseVersion";

// DSS
pub const CERTS: &str = "Certs";
pub const OCSPS: &str = "OCSPs";
pub const CRLS: &str = "CRLs";
pub const VRI: &str = "VRI";

// Interactive form
pub const FIELDS: &str = "Fields";
pub const DR: &str = "DR";
pub const DA: &str = "DA";
pub const FT: &str = "FT";
pub const T: &str = "T";
pub const V: &str = "V";
pub const KIDS: &str = "Kids";
pub const PARENT: &str = "Parent";
pub const LOCK: &str = "Lock";
pub const SIG: &str = "Sig";
pub const CH: &str = "Ch";

// Widget annotations
pub const ANNOTS: &str = "Annots";
pub const ANNOT: &str = "Annot";
pub const WIDGET: &str = "Widget";
pub const P: &str = "P";
pub const POPUP: &str = "Popup";
pub const AP: &str = "AP";
pub const AS: &str = "AS";
pub const M: &str = "M";

// Signature dictionaries
pub const REFERENCE: &str = "Reference";
pub const TRANSFORM_METHOD: &str = "TransformMethod";
pub const TRANSFORM_PARAMS: &str = "TransformParams";
pub const DATA: &str = "Data";
pub const DOC_MDP: &str = "DocMDP";
pub const FIELD_MDP: &str = "FieldMDP";
pub const BYTE_RANGE: &str = "ByteRange";
pub const DOC_TIME_STAMP: &str = "DocTimeStamp";
pub const ACTION: &str = "Action";
pub const ALL: &str = "All";
pub const INCLUDE: &str = "Include";
pub const EXCLUDE: &str = "Exclude";

// Pages
pub const STRUCT_PARENTS: &str = "StructParents";
pub const TABS: &str = "Tabs";
pub const TABS_STRUCTURE: &str = "S";

// Structure tree
pub const K: &str = "K";
pub const PG: &str = "Pg";
pub const REF: &str = "Ref";
pub const OBJ: &str = "Obj";
pub const MCID: &str = "MCID";
pub const MCR: &str = "MCR";
pub const OBJR: &str = "OBJR";
pub const ID_TREE: &str = "IDTree";
pub const PARENT_TREE: &str = "ParentTree";
pub const PARENT_TREE_NEXT_KEY: &str = "ParentTreeNextKey";
pub const NAMES: &str = "Names";
pub const NUMS: &str = "Nums";

// Cross-reference containers
pub const XREF: &str = "XRef";
pub const OBJ_STM: &str = "ObjStm";

/// Keys that belong to the field half of a (possibly merged) field/widget dictionary.
pub const FIELD_KEYS: &[&str] = &[
    FT, PARENT, KIDS, T, "TU", "TM", "Ff", V, "DV", "AA", DA, "Q", "DS", "RV", "MaxLen", "Opt",
    "TI", "I", LOCK, "SV",
];
