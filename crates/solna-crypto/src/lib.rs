#![forbid(unsafe_code)]

//! Cryptographic primitives for the Solna XML Encryption library.
//!
//! Everything here is addressed by XML Encryption algorithm URI: content
//! ciphers for `EncryptedData`, RSA key transport and AES key wrap for
//! `EncryptedKey`, plus session key generation.

pub mod cipher;
pub mod keytransport;
pub mod keywrap;
pub mod session;

pub use cipher::BlockCipher;
pub use keytransport::{KeyTransport, OaepDigest};
pub use keywrap::AesKeyWrap;
pub use session::SymmetricKind;
