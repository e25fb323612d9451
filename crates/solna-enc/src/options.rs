#![forbid(unsafe_code)]

//! Inputs to an encryption call: the options record, the long-term key and
//! the optional `KeyInfo` metadata.

use solna_core::{algorithm, Error};

/// Validated encryption configuration.
///
/// Algorithm fields always hold canonical URIs; short names are resolved
/// when the record is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptOptions {
    block_encryption: &'static str,
    key_transport: &'static str,
    key_type: String,
    key_bits: usize,
    oaep_digest: Option<&'static str>,
}

fn resolve(name: &str, what: &str, accept: fn(&str) -> bool) -> Result<&'static str, Error> {
    algorithm::uri_for_name(name)
        .filter(|uri| accept(uri))
        .ok_or_else(|| Error::Validation(format!("unsupported {what} algorithm: {name:?}")))
}

fn is_transport(uri: &str) -> bool {
    algorithm::is_rsa_transport(uri) || algorithm::is_key_wrap(uri)
}

impl EncryptOptions {
    /// Build an options record from algorithm names (short names or URIs)
    /// and an explicit session key type and size.
    ///
    /// The key size is checked when the session key is generated, not here.
    pub fn new(
        block_encryption: &str,
        key_transport: &str,
        key_type: &str,
        key_bits: usize,
    ) -> Result<Self, Error> {
        let options = Self {
            block_encryption: resolve(block_encryption, "block encryption", algorithm::is_block_cipher)?,
            key_transport: resolve(key_transport, "key transport", is_transport)?,
            key_type: key_type.to_owned(),
            key_bits,
            oaep_digest: None,
        };
        options.validate()?;
        Ok(options)
    }

    /// Build an options record, deriving the session key type and size from
    /// the block encryption algorithm.
    pub fn from_names(block_encryption: &str, key_transport: &str) -> Result<Self, Error> {
        let block = resolve(block_encryption, "block encryption", algorithm::is_block_cipher)?;
        let (key_type, key_bits) = match block {
            algorithm::AES128_CBC | algorithm::AES128_GCM => ("aes", 128),
            algorithm::AES192_CBC | algorithm::AES192_GCM => ("aes", 192),
            algorithm::AES256_CBC | algorithm::AES256_GCM => ("aes", 256),
            _ => ("des", 192),
        };
        Self::new(block, key_transport, key_type, key_bits)
    }

    /// Select the RSA-OAEP digest, written as `DigestMethod` in the template.
    pub fn with_oaep_digest(mut self, digest: &str) -> Result<Self, Error> {
        if !matches!(self.key_transport, algorithm::RSA_OAEP | algorithm::RSA_OAEP_ENC11) {
            return Err(Error::Validation(format!(
                "a digest applies only to RSA-OAEP, not {}",
                self.key_transport
            )));
        }
        let uri = resolve(digest, "OAEP digest", |u| {
            matches!(
                u,
                algorithm::SHA1 | algorithm::SHA256 | algorithm::SHA384 | algorithm::SHA512
            )
        })?;
        self.oaep_digest = Some(uri);
        Ok(self)
    }

    /// Check that every field names something the crypto layer supports.
    pub fn validate(&self) -> Result<(), Error> {
        if !algorithm::is_block_cipher(self.block_encryption) {
            return Err(Error::Validation(format!(
                "unsupported block encryption algorithm: {}",
                self.block_encryption
            )));
        }
        if !is_transport(self.key_transport) {
            return Err(Error::Validation(format!(
                "unsupported key transport algorithm: {}",
                self.key_transport
            )));
        }
        if self.key_type.trim().is_empty() {
            return Err(Error::Validation("session key type is required".into()));
        }
        Ok(())
    }

    pub fn block_encryption(&self) -> &'static str {
        self.block_encryption
    }

    pub fn key_transport(&self) -> &'static str {
        self.key_transport
    }

    pub fn key_type(&self) -> &str {
        &self.key_type
    }

    pub fn key_bits(&self) -> usize {
        self.key_bits
    }

    pub fn oaep_digest(&self) -> Option<&'static str> {
        self.oaep_digest
    }
}

/// Caller-owned long-term key material.
#[derive(Clone, Copy)]
pub struct LongTermKey<'a> {
    bytes: &'a [u8],
    name: Option<&'a str>,
}

impl<'a> LongTermKey<'a> {
    /// Key bytes must be non-empty; a name, if given, must be non-empty.
    pub fn new(bytes: &'a [u8], name: Option<&'a str>) -> Result<Self, Error> {
        if bytes.is_empty() {
            return Err(Error::Validation("key bytes must not be empty".into()));
        }
        if name.is_some_and(str::is_empty) {
            return Err(Error::Validation("key name must not be empty".into()));
        }
        Ok(Self { bytes, name })
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn name(&self) -> Option<&'a str> {
        self.name
    }
}

impl std::fmt::Debug for LongTermKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LongTermKey")
            .field("len", &self.bytes.len())
            .field("name", &self.name)
            .finish()
    }
}

/// What goes into `KeyInfo` besides the `EncryptedKey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInfoMetadata<'a> {
    None,
    KeyName(&'a str),
    Certificate(&'a [u8]),
    Both { name: &'a str, certificate: &'a [u8] },
}

impl<'a> KeyInfoMetadata<'a> {
    pub fn from_parts(name: Option<&'a str>, certificate: Option<&'a [u8]>) -> Self {
        match (name, certificate) {
            (None, None) => Self::None,
            (Some(name), None) => Self::KeyName(name),
            (None, Some(certificate)) => Self::Certificate(certificate),
            (Some(name), Some(certificate)) => Self::Both { name, certificate },
        }
    }

    pub fn key_name(&self) -> Option<&'a str> {
        match *self {
            Self::KeyName(name) | Self::Both { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn certificate(&self) -> Option<&'a [u8]> {
        match *self {
            Self::Certificate(certificate) | Self::Both { certificate, .. } => Some(certificate),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solna_core::ErrorKind;

    #[test]
    fn test_new_resolves_short_names() {
        let opts = EncryptOptions::new("aes256-cbc", "rsa-oaep-mgf1p", "aes", 256).unwrap();
        assert_eq!(opts.block_encryption(), algorithm::AES256_CBC);
        assert_eq!(opts.key_transport(), algorithm::RSA_OAEP);
        assert_eq!(opts.key_type(), "aes");
        assert_eq!(opts.key_bits(), 256);
        assert_eq!(opts.oaep_digest(), None);
    }

    #[test]
    fn test_from_names_derives_session_key() {
        let opts = EncryptOptions::from_names("aes128-gcm", "rsa-1_5").unwrap();
        assert_eq!((opts.key_type(), opts.key_bits()), ("aes", 128));
        let opts = EncryptOptions::from_names(algorithm::TRIPLEDES_CBC, "kw-aes192").unwrap();
        assert_eq!((opts.key_type(), opts.key_bits()), ("des", 192));
    }

    #[test]
    fn test_rejects_unknown_or_misplaced_algorithms() {
        for (block, transport) in [
            ("aes512-cbc", "rsa-1_5"),
            ("rsa-1_5", "rsa-1_5"),
            ("aes128-cbc", "aes128-cbc"),
            ("aes128-cbc", "sha256"),
        ] {
            let err = EncryptOptions::new(block, transport, "aes", 128).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{block} / {transport}");
        }
        let err = EncryptOptions::new("aes128-cbc", "rsa-1_5", " ", 128).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_zero_bits_pass_validation() {
        let opts = EncryptOptions::new("aes256-cbc", "rsa-oaep-mgf1p", "aes", 0).unwrap();
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_oaep_digest() {
        let opts = EncryptOptions::from_names("aes128-cbc", "rsa-oaep")
            .unwrap()
            .with_oaep_digest("sha256")
            .unwrap();
        assert_eq!(opts.oaep_digest(), Some(algorithm::SHA256));

        let pkcs1 = EncryptOptions::from_names("aes128-cbc", "rsa-1_5").unwrap();
        assert!(pkcs1.with_oaep_digest("sha256").is_err());
        let oaep = EncryptOptions::from_names("aes128-cbc", "rsa-oaep").unwrap();
        assert!(oaep.with_oaep_digest("md5").is_err());
    }

    #[test]
    fn test_long_term_key_validation() {
        assert!(LongTermKey::new(b"k", None).is_ok());
        assert!(LongTermKey::new(b"k", Some("name")).is_ok());
        let err = LongTermKey::new(b"", Some("k1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = LongTermKey::new(b"k", Some("")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_metadata_combinations() {
        let cert: &[u8] = b"pem";
        assert_eq!(KeyInfoMetadata::from_parts(None, None), KeyInfoMetadata::None);
        assert_eq!(
            KeyInfoMetadata::from_parts(Some("k"), None),
            KeyInfoMetadata::KeyName("k")
        );
        assert_eq!(
            KeyInfoMetadata::from_parts(None, Some(cert)).certificate(),
            Some(cert)
        );
        let both = KeyInfoMetadata::from_parts(Some("k"), Some(cert));
        assert_eq!(both.key_name(), Some("k"));
        assert_eq!(both.certificate(), Some(cert));
        assert_eq!(KeyInfoMetadata::None.key_name(), None);
    }
}
