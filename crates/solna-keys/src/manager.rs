#![forbid(unsafe_code)]

//! Single-key manager used for one encryption.

use crate::key::{Key, KeyData};
use crate::loader;
use solna_core::{algorithm, Error};
use solna_crypto::AesKeyWrap;

/// Holds the caller's long-term key and resolves it during key search.
#[derive(Debug)]
pub struct KeysManager {
    key: Key,
}

impl KeysManager {
    /// Wrap an already-loaded key.
    pub fn with_key(key: Key) -> Self {
        Self { key }
    }

    /// Load `data` (any format [`loader::load_key`] accepts), tag it with
    /// `name` and register it as the only key.
    pub fn provision(data: &[u8], name: Option<&str>) -> Result<Self, Error> {
        let mut key = loader::load_key(data)?;
        if let Some(name) = name {
            key.set_name(name)?;
        }
        Ok(Self::with_key(key))
    }

    /// The managed key.
    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Key> {
        (self.key.name.as_deref() == Some(name)).then_some(&self.key)
    }

    /// Resolve the key that encrypts a session key with `transport_uri`.
    ///
    /// With a `name`, the key must carry that name unless `lax` is set, in
    /// which case any key usable with the transport is accepted.
    pub fn find_for_transport(
        &self,
        transport_uri: &str,
        name: Option<&str>,
        lax: bool,
    ) -> Result<&Key, Error> {
        if !is_usable_for(&self.key, transport_uri)? {
            return Err(Error::KeyNotFound(format!(
                "no key usable with {transport_uri} (have {:?})",
                self.key.data
            )));
        }
        match name {
            Some(n) if !lax && self.key.name.as_deref() != Some(n) => {
                Err(Error::KeyNotFound(format!("no key named {n:?}")))
            }
            _ => Ok(&self.key),
        }
    }
}

fn is_usable_for(key: &Key, transport_uri: &str) -> Result<bool, Error> {
    if algorithm::is_rsa_transport(transport_uri) {
        return Ok(matches!(key.data, KeyData::Rsa { .. }));
    }
    if algorithm::is_key_wrap(transport_uri) {
        let kw = AesKeyWrap::from_uri(transport_uri)?;
        return Ok(matches!(&key.data, KeyData::Aes(k) if k.len() == kw.kek_size()));
    }
    Err(Error::UnsupportedAlgorithm(format!(
        "key transport: {transport_uri}"
    )))
}
