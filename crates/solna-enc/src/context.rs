#![forbid(unsafe_code)]

//! Encryption context: the key manager plus the session key of one call.

use solna_keys::{Key, KeysManager};

/// State shared by the steps of one encryption.
#[derive(Debug)]
pub struct EncContext {
    /// Resolves the key that encrypts the session key.
    pub keys_manager: KeysManager,
    /// Session key that encrypts the content; set by the key binder.
    pub encryption_key: Option<Key>,
    /// Fall back to any transport-compatible key when no key carries the
    /// requested name.
    pub lax_key_search: bool,
}

impl EncContext {
    pub fn new(keys_manager: KeysManager) -> Self {
        Self {
            keys_manager,
            encryption_key: None,
            lax_key_search: true,
        }
    }
}
