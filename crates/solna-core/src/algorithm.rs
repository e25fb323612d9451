#![forbid(unsafe_code)]

//! Algorithm URI constants for XML Encryption.
//!
//! Each constant is the canonical URI string that appears in `Algorithm`
//! attributes. [`uri_for_name`] maps the short names accepted on the
//! command line and in option records to these URIs.

// ── Digest algorithms (RSA-OAEP parameters) ─────────────────────────

pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
pub const SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";
pub const SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";

// ── Block cipher algorithms ──────────────────────────────────────────

pub const AES128_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes128-cbc";
pub const AES192_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes192-cbc";
pub const AES256_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes256-cbc";
pub const AES128_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes128-gcm";
pub const AES192_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes192-gcm";
pub const AES256_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes256-gcm";
pub const TRIPLEDES_CBC: &str = "http://www.w3.org/2001/04/xmlenc#tripledes-cbc";

// ── Key wrap algorithms ──────────────────────────────────────────────

pub const KW_AES128: &str = "http://www.w3.org/2001/04/xmlenc#kw-aes128";
pub const KW_AES192: &str = "http://www.w3.org/2001/04/xmlenc#kw-aes192";
pub const KW_AES256: &str = "http://www.w3.org/2001/04/xmlenc#kw-aes256";

// ── Key transport algorithms ─────────────────────────────────────────

pub const RSA_PKCS1: &str = "http://www.w3.org/2001/04/xmlenc#rsa-1_5";
pub const RSA_OAEP: &str = "http://www.w3.org/2001/04/xmlenc#rsa-oaep-mgf1p";
pub const RSA_OAEP_ENC11: &str = "http://www.w3.org/2009/xmlenc11#rsa-oaep";

const SHORT_NAMES: &[(&str, &str)] = &[
    ("aes128-cbc", AES128_CBC),
    ("aes192-cbc", AES192_CBC),
    ("aes256-cbc", AES256_CBC),
    ("aes128-gcm", AES128_GCM),
    ("aes192-gcm", AES192_GCM),
    ("aes256-gcm", AES256_GCM),
    ("tripledes-cbc", TRIPLEDES_CBC),
    ("kw-aes128", KW_AES128),
    ("kw-aes192", KW_AES192),
    ("kw-aes256", KW_AES256),
    ("rsa-1_5", RSA_PKCS1),
    ("rsa-oaep-mgf1p", RSA_OAEP),
    ("rsa-oaep", RSA_OAEP_ENC11),
    ("sha1", SHA1),
    ("sha256", SHA256),
    ("sha384", SHA384),
    ("sha512", SHA512),
];

/// Resolve a short algorithm name (`"aes256-cbc"`) or a full URI to the
/// canonical URI constant.
pub fn uri_for_name(name: &str) -> Option<&'static str> {
    SHORT_NAMES
        .iter()
        .find(|(short, uri)| *short == name || *uri == name)
        .map(|(_, uri)| *uri)
}

/// Whether the URI names a block cipher usable for `EncryptedData`.
pub fn is_block_cipher(uri: &str) -> bool {
    matches!(
        uri,
        AES128_CBC | AES192_CBC | AES256_CBC | AES128_GCM | AES192_GCM | AES256_GCM | TRIPLEDES_CBC
    )
}

/// Whether the URI names an RSA key transport algorithm.
pub fn is_rsa_transport(uri: &str) -> bool {
    matches!(uri, RSA_PKCS1 | RSA_OAEP | RSA_OAEP_ENC11)
}

/// Whether the URI names a symmetric key wrap algorithm.
pub fn is_key_wrap(uri: &str) -> bool {
    matches!(uri, KW_AES128 | KW_AES192 | KW_AES256)
}
