//! Structured-document access: the backend trait and its XML implementation.

mod document;
mod xml_tree;

pub use document::{
    DocumentBackend, DocumentError, DocumentResult, PathStep, format_number, split_path,
};
pub use xml_tree::{Element, XmlDocument};
