#![forbid(unsafe_code)]

//! Key management for the Solna XML Encryption library.
//!
//! Loads long-term keys from PEM, DER or raw bytes, attaches X.509
//! certificates, and provides the single-key `KeysManager` that resolves the
//! key-transport key during encryption.

pub mod cert;
pub mod key;
pub mod loader;
pub mod manager;

pub use key::{Key, KeyData, KeyScope};
pub use manager::KeysManager;
