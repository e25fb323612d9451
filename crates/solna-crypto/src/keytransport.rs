#![forbid(unsafe_code)]

//! RSA key transport: PKCS#1 v1.5 and RSA-OAEP.

use solna_core::{algorithm, Error};

/// Message digest used inside RSA-OAEP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OaepDigest {
    #[default]
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl OaepDigest {
    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        Ok(match uri {
            algorithm::SHA1 => Self::Sha1,
            algorithm::SHA256 => Self::Sha256,
            algorithm::SHA384 => Self::Sha384,
            algorithm::SHA512 => Self::Sha512,
            _ => return Err(Error::UnsupportedAlgorithm(format!("OAEP digest: {uri}"))),
        })
    }

    pub fn uri(&self) -> &'static str {
        match self {
            Self::Sha1 => algorithm::SHA1,
            Self::Sha256 => algorithm::SHA256,
            Self::Sha384 => algorithm::SHA384,
            Self::Sha512 => algorithm::SHA512,
        }
    }

    // MGF1 stays on SHA-1, the XML Encryption default for both OAEP URIs.
    fn padding(&self) -> rsa::Oaep {
        match self {
            Self::Sha1 => rsa::Oaep::new::<sha1::Sha1>(),
            Self::Sha256 => rsa::Oaep::new_with_mgf_hash::<sha2::Sha256, sha1::Sha1>(),
            Self::Sha384 => rsa::Oaep::new_with_mgf_hash::<sha2::Sha384, sha1::Sha1>(),
            Self::Sha512 => rsa::Oaep::new_with_mgf_hash::<sha2::Sha512, sha1::Sha1>(),
        }
    }
}

/// A key transport algorithm selected by its URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTransport {
    RsaPkcs1,
    RsaOaep {
        uri: &'static str,
        digest: OaepDigest,
    },
}

impl KeyTransport {
    /// Look up a key transport by URI with the default (SHA-1) OAEP digest.
    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        Self::with_digest(uri, None)
    }

    /// Look up a key transport by URI; `digest_uri` selects the OAEP digest.
    pub fn with_digest(uri: &str, digest_uri: Option<&str>) -> Result<Self, Error> {
        let digest = digest_uri
            .map(OaepDigest::from_uri)
            .transpose()?
            .unwrap_or_default();
        match uri {
            algorithm::RSA_PKCS1 if digest_uri.is_some() => Err(Error::UnsupportedAlgorithm(
                "RSA PKCS#1 v1.5 takes no digest parameter".into(),
            )),
            algorithm::RSA_PKCS1 => Ok(Self::RsaPkcs1),
            algorithm::RSA_OAEP => Ok(Self::RsaOaep {
                uri: algorithm::RSA_OAEP,
                digest,
            }),
            algorithm::RSA_OAEP_ENC11 => Ok(Self::RsaOaep {
                uri: algorithm::RSA_OAEP_ENC11,
                digest,
            }),
            _ => Err(Error::UnsupportedAlgorithm(format!("key transport: {uri}"))),
        }
    }

    pub fn uri(&self) -> &'static str {
        match self {
            Self::RsaPkcs1 => algorithm::RSA_PKCS1,
            Self::RsaOaep { uri, .. } => uri,
        }
    }

    /// Encrypt a session key for the holder of `public_key`.
    pub fn encrypt(&self, public_key: &rsa::RsaPublicKey, key_data: &[u8]) -> Result<Vec<u8>, Error> {
        let mut rng = rand::thread_rng();
        match self {
            Self::RsaPkcs1 => public_key
                .encrypt(&mut rng, rsa::Pkcs1v15Encrypt, key_data)
                .map_err(|e| Error::Crypto(format!("RSA PKCS#1 encrypt: {e}"))),
            Self::RsaOaep { digest, .. } => public_key
                .encrypt(&mut rng, digest.padding(), key_data)
                .map_err(|e| Error::Crypto(format!("RSA-OAEP encrypt: {e}"))),
        }
    }

    /// Recover a session key encrypted with [`KeyTransport::encrypt`].
    pub fn decrypt(&self, private_key: &rsa::RsaPrivateKey, encrypted: &[u8]) -> Result<Vec<u8>, Error> {
        match self {
            Self::RsaPkcs1 => private_key
                .decrypt(rsa::Pkcs1v15Encrypt, encrypted)
                .map_err(|e| Error::Crypto(format!("RSA PKCS#1 decrypt: {e}"))),
            Self::RsaOaep { digest, .. } => private_key
                .decrypt(digest.padding(), encrypted)
                .map_err(|e| Error::Crypto(format!("RSA-OAEP decrypt: {e}"))),
        }
    }
}
