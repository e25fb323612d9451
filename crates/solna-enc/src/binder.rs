#![forbid(unsafe_code)]

//! Session key generation and binding.

use crate::context::EncContext;
use crate::options::KeyInfoMetadata;
use solna_core::{Error, Failure};
use solna_keys::{cert, Key};

/// Generate the session key, attach the certificate and name from
/// `metadata`, and install the key in `ctx`.
///
/// Steps run in that order and stop at the first failure; `ctx` is only
/// updated once all of them succeed.
pub fn bind_session_key(
    ctx: &mut EncContext,
    key_type: &str,
    key_bits: usize,
    metadata: &KeyInfoMetadata<'_>,
) -> Result<(), Error> {
    let mut key = Key::generate(key_type, key_bits)
        .map_err(|e| Error::KeyBinding(Failure::caused_by("failed to generate session key", &e)))?;

    if let Some(certificate) = metadata.certificate() {
        cert::attach_certificates(&mut key, certificate)
            .map_err(|e| Error::CertificateLoad(Failure::caused_by("failed to load certificate", &e)))?;
    }

    if let Some(name) = metadata.key_name() {
        key.set_name(name)
            .map_err(|e| Error::KeyBinding(Failure::caused_by("failed to set key name", &e)))?;
    }

    ctx.encryption_key = Some(key);
    Ok(())
}
