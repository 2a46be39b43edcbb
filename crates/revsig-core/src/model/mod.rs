//! In-memory object model.
//!
//! The validator never parses container bytes itself. A `RevisionSource`
//! materializes each snapshot into an [`ObjectGraph`] made of [`PdfObject`]
//! nodes; everything else in the crate only reads these types.
//!
//! Recommended imports:
//! - `use revsig_core::model::*;`
//! - or `use revsig_core::prelude::*;`

pub mod graph;
pub mod object;

pub use graph::{Node, ObjectGraph};
pub use object::{Dictionary, ObjRef, ObjectKind, PdfObject, Stream};
