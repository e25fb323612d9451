#![forbid(unsafe_code)]

//! Random symmetric session keys.

use rand::RngCore;
use solna_core::Error;
use zeroize::Zeroizing;

/// Family of a generated symmetric key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymmetricKind {
    Aes,
    Des3,
}

impl SymmetricKind {
    /// Parse a key type name (`"aes"`, `"des"`); case-insensitive.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name.to_ascii_lowercase().as_str() {
            "aes" => Ok(Self::Aes),
            "des" | "des3" | "3des" => Ok(Self::Des3),
            _ => Err(Error::Key(format!("unknown session key type: {name:?}"))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Aes => "aes",
            Self::Des3 => "des",
        }
    }

    fn accepts_bits(&self, bits: usize) -> bool {
        match self {
            Self::Aes => matches!(bits, 128 | 192 | 256),
            Self::Des3 => bits == 192,
        }
    }
}

/// Fill `len` bytes from the thread-local CSPRNG.
pub fn random_bytes(len: usize) -> Zeroizing<Vec<u8>> {
    let mut buf = Zeroizing::new(vec![0u8; len]);
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

/// Generate fresh key material of the given type and size in bits.
pub fn generate(kind: SymmetricKind, bits: usize) -> Result<Zeroizing<Vec<u8>>, Error> {
    if !kind.accepts_bits(bits) {
        return Err(Error::Key(format!(
            "cannot generate a {bits}-bit {} key",
            kind.name()
        )));
    }
    Ok(random_bytes(bits / 8))
}
