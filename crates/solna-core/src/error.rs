#![forbid(unsafe_code)]

use std::fmt;

/// Errors produced by the Solna XML Encryption library.
///
/// Collaborator crates (XML tree, crypto, keys) raise the unclassified
/// variants. The encryption engine wraps every failure it surfaces into one
/// of the classified variants, see [`Error::kind`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("invalid XML structure: {0}")]
    XmlStructure(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ── Classified failures surfaced by the encryption engine ───────────
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("key provisioning failed: {0}")]
    KeyProvisioning(Failure),

    #[error("template construction failed: {0}")]
    Template(Failure),

    #[error("certificate load failed: {0}")]
    CertificateLoad(Failure),

    #[error("key binding failed: {0}")]
    KeyBinding(Failure),

    #[error("encryption error: {0}")]
    Encryption(Failure),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing input, rejected before any resource is allocated.
    Validation,
    /// The key manager could not be built or seeded.
    KeyProvisioning,
    /// A node of the encryption template could not be built.
    TemplateConstruction,
    /// Certificate bytes were rejected.
    CertificateLoad,
    /// Session key generation or key-name assignment failed.
    KeyBinding,
    /// The hybrid encryption step or EncryptedKey wiring failed.
    Encryption,
    /// Collaborator-level error that has not been classified.
    Other,
}

impl Error {
    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::KeyProvisioning(_) => ErrorKind::KeyProvisioning,
            Self::Template(_) => ErrorKind::TemplateConstruction,
            Self::CertificateLoad(_) => ErrorKind::CertificateLoad,
            Self::KeyBinding(_) => ErrorKind::KeyBinding,
            Self::Encryption(_) => ErrorKind::Encryption,
            _ => ErrorKind::Other,
        }
    }

    /// The step failure carried by a classified error, if any.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::KeyProvisioning(f)
            | Self::Template(f)
            | Self::CertificateLoad(f)
            | Self::KeyBinding(f)
            | Self::Encryption(f) => Some(f),
            _ => None,
        }
    }
}

/// A step-specific failure message with an optional provider diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// What the engine was doing, e.g. `"failed to add KeyInfo node"`.
    pub message: String,
    /// Diagnostic from the underlying provider, when one was reported.
    pub detail: Option<String>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    /// Failure whose detail is the rendering of the underlying error.
    pub fn caused_by(message: impl Into<String>, cause: &dyn fmt::Display) -> Self {
        Self {
            message: message.into(),
            detail: Some(cause.to_string()),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}, provider error: {detail}", self.message),
            None => f.write_str(&self.message),
        }
    }
}
