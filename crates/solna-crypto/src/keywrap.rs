#![forbid(unsafe_code)]

//! AES key wrap (RFC 3394) for pre-shared key encryption keys.

use aes_kw::Kek;
use solna_core::{algorithm, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AesKeyWrap {
    kek_size: usize,
}

impl AesKeyWrap {
    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        let kek_size = match uri {
            algorithm::KW_AES128 => 16,
            algorithm::KW_AES192 => 24,
            algorithm::KW_AES256 => 32,
            _ => return Err(Error::UnsupportedAlgorithm(format!("key wrap: {uri}"))),
        };
        Ok(Self { kek_size })
    }

    pub fn uri(&self) -> &'static str {
        match self.kek_size {
            16 => algorithm::KW_AES128,
            24 => algorithm::KW_AES192,
            _ => algorithm::KW_AES256,
        }
    }

    /// Length of the key-encryption key in bytes.
    pub fn kek_size(&self) -> usize {
        self.kek_size
    }

    fn check_kek(&self, kek: &[u8]) -> Result<(), Error> {
        if kek.len() != self.kek_size {
            return Err(Error::Crypto(format!(
                "{} needs a {} byte KEK, got {}",
                self.uri(),
                self.kek_size,
                kek.len()
            )));
        }
        Ok(())
    }

    pub fn wrap(&self, kek: &[u8], key_data: &[u8]) -> Result<Vec<u8>, Error> {
        self.check_kek(kek)?;
        let wrapped = match self.kek_size {
            16 => Kek::<aes::Aes128>::try_from(kek).and_then(|k| k.wrap_vec(key_data)),
            24 => Kek::<aes::Aes192>::try_from(kek).and_then(|k| k.wrap_vec(key_data)),
            _ => Kek::<aes::Aes256>::try_from(kek).and_then(|k| k.wrap_vec(key_data)),
        };
        wrapped.map_err(|e| Error::Crypto(format!("AES-KW wrap: {e}")))
    }

    pub fn unwrap(&self, kek: &[u8], wrapped: &[u8]) -> Result<Vec<u8>, Error> {
        self.check_kek(kek)?;
        let plain = match self.kek_size {
            16 => Kek::<aes::Aes128>::try_from(kek).and_then(|k| k.unwrap_vec(wrapped)),
            24 => Kek::<aes::Aes192>::try_from(kek).and_then(|k| k.unwrap_vec(wrapped)),
            _ => Kek::<aes::Aes256>::try_from(kek).and_then(|k| k.unwrap_vec(wrapped)),
        };
        plain.map_err(|e| Error::Crypto(format!("AES-KW unwrap: {e}")))
    }
}
