#![forbid(unsafe_code)]

//! Key types and data structures.

use solna_core::Error;
use solna_crypto::session::{self, SymmetricKind};
use zeroize::Zeroizing;

/// Lifetime class of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    /// Caller-supplied key that outlives a single operation.
    LongTerm,
    /// Ephemeral key generated for one encryption.
    Session,
}

/// The underlying key data.
pub enum KeyData {
    Rsa {
        private: Option<rsa::RsaPrivateKey>,
        public: rsa::RsaPublicKey,
    },
    Aes(Zeroizing<Vec<u8>>),
    Des3(Zeroizing<Vec<u8>>),
}

impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa { private: Some(_), .. } => write!(f, "RSA private+public key"),
            Self::Rsa { .. } => write!(f, "RSA public key"),
            Self::Aes(k) => write!(f, "AES key ({} bits)", k.len() * 8),
            Self::Des3(_) => write!(f, "3DES key"),
        }
    }
}

/// A key with an optional name and attached certificates.
#[derive(Debug)]
pub struct Key {
    /// Name used for lookup and written into `KeyName`.
    pub name: Option<String>,
    pub data: KeyData,
    pub scope: KeyScope,
    /// X.509 certificates (DER) that travel with the key.
    pub x509_chain: Vec<Vec<u8>>,
}

impl Key {
    pub fn new(data: KeyData, scope: KeyScope) -> Self {
        Self {
            name: None,
            data,
            scope,
            x509_chain: Vec::new(),
        }
    }

    /// Generate a fresh session key, e.g. `Key::generate("aes", 256)`.
    pub fn generate(key_type: &str, bits: usize) -> Result<Self, Error> {
        let kind = SymmetricKind::from_name(key_type)?;
        let bytes = session::generate(kind, bits)?;
        let data = match kind {
            SymmetricKind::Aes => KeyData::Aes(bytes),
            SymmetricKind::Des3 => KeyData::Des3(bytes),
        };
        Ok(Self::new(data, KeyScope::Session))
    }

    /// Assign the key name.
    ///
    /// The name ends up as XML character data, so it must be non-empty and
    /// consist of characters XML can represent.
    pub fn set_name(&mut self, name: &str) -> Result<(), Error> {
        if name.is_empty() {
            return Err(Error::Key("key name must not be empty".into()));
        }
        if let Some(bad) = name.chars().find(|c| !is_xml_char(*c)) {
            return Err(Error::Key(format!(
                "key name contains U+{:04X}, which XML cannot represent",
                bad as u32
            )));
        }
        self.name = Some(name.to_owned());
        Ok(())
    }

    pub fn with_name(mut self, name: &str) -> Result<Self, Error> {
        self.set_name(name)?;
        Ok(self)
    }

    /// Raw bytes of a symmetric key.
    pub fn symmetric_key_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            KeyData::Aes(k) | KeyData::Des3(k) => Some(k),
            KeyData::Rsa { .. } => None,
        }
    }

    pub fn rsa_public_key(&self) -> Option<&rsa::RsaPublicKey> {
        match &self.data {
            KeyData::Rsa { public, .. } => Some(public),
            _ => None,
        }
    }

    pub fn rsa_private_key(&self) -> Option<&rsa::RsaPrivateKey> {
        match &self.data {
            KeyData::Rsa { private: Some(pk), .. } => Some(pk),
            _ => None,
        }
    }
}

/// The XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}
