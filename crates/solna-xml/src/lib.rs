#![forbid(unsafe_code)]

//! Mutable XML tree for the Solna XML Encryption library.
//!
//! [`Document`] wraps an `uppsala` tree and adds the node accounting that
//! encryption needs: building detached subtrees, splicing them in place of an
//! existing element and reclaiming everything that never made it into the
//! tree.

pub mod document;

pub use document::Document;
pub use uppsala::{Element, NodeId, NodeKind};
