#![forbid(unsafe_code)]

//! In-place XML Encryption (XML-Enc) of a document subtree.
//!
//! [`encrypt_node`] drives one encryption: provision the long-term key, build
//! the `EncryptedData` template, bind a fresh session key, wire the
//! `EncryptedKey` and finally encrypt and splice.

pub mod binder;
pub mod context;
pub mod encrypt;
pub mod options;
pub mod template;

pub use context::EncContext;
pub use encrypt::{encrypt_node, xml_encrypt, Stage};
pub use options::{EncryptOptions, KeyInfoMetadata, LongTermKey};
pub use template::{PendingTemplate, TemplateBuilder, TemplateHandles};
