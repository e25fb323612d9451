#![forbid(unsafe_code)]

pub use solna_core as core;
pub use solna_crypto as crypto;
pub use solna_enc as enc;
pub use solna_keys as keys;
pub use solna_xml as xml;

pub use solna_core::{Error, ErrorKind, Failure};
pub use solna_enc::{encrypt_node, EncryptOptions, LongTermKey};
pub use solna_xml::{Document, NodeId};
