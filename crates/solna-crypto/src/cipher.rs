#![forbid(unsafe_code)]

//! Block ciphers for `EncryptedData` content (AES-CBC, AES-GCM, 3DES-CBC).
//!
//! Ciphertext layout follows XML Encryption: the IV (or GCM nonce) is
//! prepended to the encrypted octets, and CBC modes use the XML Encryption
//! padding scheme where only the final octet carries the pad length.

use rand::RngCore;
use solna_core::{algorithm, Error};

const AES_BLOCK: usize = 16;
const DES_BLOCK: usize = 8;
const GCM_NONCE: usize = 12;
const GCM_TAG: usize = 16;

/// A content-encryption algorithm selected by its URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCipher {
    AesCbc { key_size: usize },
    AesGcm { key_size: usize },
    TripleDesCbc,
}

impl BlockCipher {
    /// Look up a block cipher by algorithm URI.
    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        Ok(match uri {
            algorithm::AES128_CBC => Self::AesCbc { key_size: 16 },
            algorithm::AES192_CBC => Self::AesCbc { key_size: 24 },
            algorithm::AES256_CBC => Self::AesCbc { key_size: 32 },
            algorithm::AES128_GCM => Self::AesGcm { key_size: 16 },
            algorithm::AES192_GCM => Self::AesGcm { key_size: 24 },
            algorithm::AES256_GCM => Self::AesGcm { key_size: 32 },
            algorithm::TRIPLEDES_CBC => Self::TripleDesCbc,
            _ => return Err(Error::UnsupportedAlgorithm(format!("block cipher: {uri}"))),
        })
    }

    pub fn uri(&self) -> &'static str {
        match *self {
            Self::AesCbc { key_size: 16 } => algorithm::AES128_CBC,
            Self::AesCbc { key_size: 24 } => algorithm::AES192_CBC,
            Self::AesCbc { .. } => algorithm::AES256_CBC,
            Self::AesGcm { key_size: 16 } => algorithm::AES128_GCM,
            Self::AesGcm { key_size: 24 } => algorithm::AES192_GCM,
            Self::AesGcm { .. } => algorithm::AES256_GCM,
            Self::TripleDesCbc => algorithm::TRIPLEDES_CBC,
        }
    }

    /// Required key length in bytes.
    pub fn key_size(&self) -> usize {
        match *self {
            Self::AesCbc { key_size } | Self::AesGcm { key_size } => key_size,
            Self::TripleDesCbc => 24,
        }
    }

    fn check_key(&self, key: &[u8]) -> Result<(), Error> {
        if key.len() != self.key_size() {
            return Err(Error::Crypto(format!(
                "{} needs a {} byte key, got {}",
                self.uri(),
                self.key_size(),
                key.len()
            )));
        }
        Ok(())
    }

    /// Encrypt `plaintext`, returning `IV || ciphertext`.
    pub fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        self.check_key(key)?;
        match *self {
            Self::AesCbc { .. } => aes_cbc_encrypt(key, plaintext),
            Self::AesGcm { .. } => aes_gcm_encrypt(key, plaintext),
            Self::TripleDesCbc => tdes_cbc_encrypt(key, plaintext),
        }
    }

    /// Decrypt `IV || ciphertext` produced by [`BlockCipher::encrypt`].
    pub fn decrypt(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
        self.check_key(key)?;
        match *self {
            Self::AesCbc { .. } => aes_cbc_decrypt(key, data),
            Self::AesGcm { .. } => aes_gcm_decrypt(key, data),
            Self::TripleDesCbc => tdes_cbc_decrypt(key, data),
        }
    }
}

// ── CBC modes ────────────────────────────────────────────────────────

fn cbc_encrypt<C>(key: &[u8], block: usize, plaintext: &[u8]) -> Result<Vec<u8>, Error>
where
    C: cbc::cipher::BlockEncryptMut + cbc::cipher::BlockCipher + cbc::cipher::KeyInit,
{
    use cbc::cipher::{block_padding::NoPadding, BlockEncryptMut, KeyIvInit};

    let mut out = vec![0u8; block];
    rand::thread_rng().fill_bytes(&mut out);

    let mut buf = xmlenc_pad(plaintext, block);
    let len = buf.len();
    cbc::Encryptor::<C>::new_from_slices(key, &out)
        .map_err(|e| Error::Crypto(format!("CBC init: {e}")))?
        .encrypt_padded_mut::<NoPadding>(&mut buf, len)
        .map_err(|e| Error::Crypto(format!("CBC encrypt: {e}")))?;

    out.extend_from_slice(&buf);
    Ok(out)
}

fn cbc_decrypt<C>(key: &[u8], block: usize, data: &[u8]) -> Result<Vec<u8>, Error>
where
    C: cbc::cipher::BlockDecryptMut + cbc::cipher::BlockCipher + cbc::cipher::KeyInit,
{
    use cbc::cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};

    if data.len() < 2 * block || data.len() % block != 0 {
        return Err(Error::Crypto(format!(
            "CBC ciphertext of {} bytes is not a whole number of blocks",
            data.len()
        )));
    }
    let (iv, ciphertext) = data.split_at(block);
    let mut buf = ciphertext.to_vec();
    cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|e| Error::Crypto(format!("CBC init: {e}")))?
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|e| Error::Crypto(format!("CBC decrypt: {e}")))?;
    xmlenc_unpad(buf, block)
}

fn aes_cbc_encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    match key.len() {
        16 => cbc_encrypt::<aes::Aes128>(key, AES_BLOCK, plaintext),
        24 => cbc_encrypt::<aes::Aes192>(key, AES_BLOCK, plaintext),
        _ => cbc_encrypt::<aes::Aes256>(key, AES_BLOCK, plaintext),
    }
}

fn aes_cbc_decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    match key.len() {
        16 => cbc_decrypt::<aes::Aes128>(key, AES_BLOCK, data),
        24 => cbc_decrypt::<aes::Aes192>(key, AES_BLOCK, data),
        _ => cbc_decrypt::<aes::Aes256>(key, AES_BLOCK, data),
    }
}

fn tdes_cbc_encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    cbc_encrypt::<des::TdesEde3>(key, DES_BLOCK, plaintext)
}

fn tdes_cbc_decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    cbc_decrypt::<des::TdesEde3>(key, DES_BLOCK, data)
}

/// XML Encryption padding: random filler, last octet holds the pad length.
fn xmlenc_pad(data: &[u8], block: usize) -> Vec<u8> {
    let pad = block - data.len() % block;
    let mut out = Vec::with_capacity(data.len() + pad);
    out.extend_from_slice(data);
    let mut filler = vec![0u8; pad - 1];
    rand::thread_rng().fill_bytes(&mut filler);
    out.extend_from_slice(&filler);
    out.push(pad as u8);
    out
}

fn xmlenc_unpad(mut data: Vec<u8>, block: usize) -> Result<Vec<u8>, Error> {
    let pad = data.last().copied().map(usize::from).unwrap_or(0);
    if pad == 0 || pad > block || pad > data.len() {
        return Err(Error::Crypto("invalid padding".into()));
    }
    data.truncate(data.len() - pad);
    Ok(data)
}

// ── AES-GCM ──────────────────────────────────────────────────────────

type Aes192Gcm = aes_gcm::AesGcm<aes::Aes192, aes_gcm::aead::consts::U12>;

fn aes_gcm_encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    use aes_gcm::{aead::Aead, KeyInit, Nonce};

    let mut out = vec![0u8; GCM_NONCE];
    rand::thread_rng().fill_bytes(&mut out);
    let nonce = Nonce::from_slice(&out);

    macro_rules! seal {
        ($cipher:ty) => {
            <$cipher>::new_from_slice(key)
                .map_err(|e| Error::Crypto(format!("AES-GCM init: {e}")))?
                .encrypt(nonce, plaintext)
        };
    }
    let sealed = match key.len() {
        16 => seal!(aes_gcm::Aes128Gcm),
        24 => seal!(Aes192Gcm),
        _ => seal!(aes_gcm::Aes256Gcm),
    }
    .map_err(|e| Error::Crypto(format!("AES-GCM encrypt: {e}")))?;

    out.extend_from_slice(&sealed);
    Ok(out)
}

fn aes_gcm_decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    use aes_gcm::{aead::Aead, KeyInit, Nonce};

    if data.len() < GCM_NONCE + GCM_TAG {
        return Err(Error::Crypto("AES-GCM ciphertext too short".into()));
    }
    let (nonce, sealed) = data.split_at(GCM_NONCE);
    let nonce = Nonce::from_slice(nonce);

    macro_rules! open {
        ($cipher:ty) => {
            <$cipher>::new_from_slice(key)
                .map_err(|e| Error::Crypto(format!("AES-GCM init: {e}")))?
                .decrypt(nonce, sealed)
        };
    }
    match key.len() {
        16 => open!(aes_gcm::Aes128Gcm),
        24 => open!(Aes192Gcm),
        _ => open!(aes_gcm::Aes256Gcm),
    }
    .map_err(|e| Error::Crypto(format!("AES-GCM decrypt: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_uri() {
        assert_eq!(
            BlockCipher::from_uri(algorithm::AES192_CBC).unwrap(),
            BlockCipher::AesCbc { key_size: 24 }
        );
        assert_eq!(
            BlockCipher::from_uri(algorithm::TRIPLEDES_CBC).unwrap().key_size(),
            24
        );
        assert!(matches!(
            BlockCipher::from_uri(algorithm::KW_AES128),
            Err(Error::UnsupportedAlgorithm(_))
        ));
        for uri in [algorithm::AES128_GCM, algorithm::AES256_CBC] {
            assert_eq!(BlockCipher::from_uri(uri).unwrap().uri(), uri);
        }
    }

    #[test]
    fn test_cbc_layout_and_roundtrip() {
        let key = [7u8; 32];
        let cipher = BlockCipher::from_uri(algorithm::AES256_CBC).unwrap();
        let pt = b"<Card>4111 1111 1111 1111</Card>";
        let ct = cipher.encrypt(&key, pt).unwrap();
        // IV + two full blocks of data + one block of padding.
        assert_eq!(ct.len(), 16 + 48);
        assert_eq!(cipher.decrypt(&key, &ct).unwrap(), pt);
    }

    #[test]
    fn test_cbc_uses_fresh_iv() {
        let key = [1u8; 16];
        let cipher = BlockCipher::from_uri(algorithm::AES128_CBC).unwrap();
        let a = cipher.encrypt(&key, b"same").unwrap();
        let b = cipher.encrypt(&key, b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_tripledes_roundtrip() {
        let key = [0x5au8; 24];
        let cipher = BlockCipher::TripleDesCbc;
        let ct = cipher.encrypt(&key, b"eight by").unwrap();
        assert_eq!(ct.len(), 8 + 16);
        assert_eq!(cipher.decrypt(&key, &ct).unwrap(), b"eight by");
    }

    #[test]
    fn test_gcm_rejects_tampering() {
        let key = [9u8; 24];
        let cipher = BlockCipher::from_uri(algorithm::AES192_GCM).unwrap();
        let mut ct = cipher.encrypt(&key, b"payload").unwrap();
        assert_eq!(ct.len(), GCM_NONCE + 7 + GCM_TAG);
        assert_eq!(cipher.decrypt(&key, &ct).unwrap(), b"payload");
        let last = ct.len() - 1;
        ct[last] ^= 1;
        assert!(cipher.decrypt(&key, &ct).is_err());
    }

    #[test]
    fn test_wrong_key_length() {
        let cipher = BlockCipher::from_uri(algorithm::AES128_CBC).unwrap();
        let err = cipher.encrypt(&[0u8; 24], b"x").unwrap_err();
        assert!(err.to_string().contains("16 byte key"));
    }

    #[test]
    fn test_unpad_accepts_random_filler() {
        let data = vec![b'h', b'i', 0xde, 0xad, 0xbe, 0xef, 0x01, 0x06];
        assert_eq!(xmlenc_unpad(data, 8).unwrap(), b"hi");
        assert!(xmlenc_unpad(vec![1, 2, 3, 0], 8).is_err());
        assert!(xmlenc_unpad(vec![1, 2, 3, 9], 8).is_err());
    }
}
