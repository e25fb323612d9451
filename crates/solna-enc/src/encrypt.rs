#![forbid(unsafe_code)]

//! XML-Enc encryption of a document subtree.
//!
//! [`encrypt_node`] replaces an element with an `EncryptedData` structure:
//! the element is encrypted under a fresh session key, and the session key is
//! encrypted for the caller's long-term key into an `EncryptedKey` inside
//! `KeyInfo`. Either the whole operation succeeds and the document holds the
//! encrypted structure, or it fails and the document is left as it was.

use crate::binder::bind_session_key;
use crate::context::EncContext;
use crate::options::{EncryptOptions, KeyInfoMetadata, LongTermKey};
use crate::template::{PendingTemplate, TemplateBuilder};
use base64::Engine;
use solna_core::{algorithm, ns, Error, Failure};
use solna_crypto::{AesKeyWrap, BlockCipher, KeyTransport};
use solna_keys::{Key, KeyData, KeysManager};
use solna_xml::{Document, NodeId};
use std::fmt;
use tracing::{debug, warn};

/// Progress of one [`encrypt_node`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    ManagerReady,
    TemplateReady,
    KeyBound,
    EncryptedKeyNodeReady,
    Committed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::ManagerReady => "manager-ready",
            Self::TemplateReady => "template-ready",
            Self::KeyBound => "key-bound",
            Self::EncryptedKeyNodeReady => "encrypted-key-node-ready",
            Self::Committed => "committed",
        })
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!(from = %stage, to = %next, "encryption stage");
    *stage = next;
}

/// Encrypt `target` in place.
///
/// `key` encrypts the session key (RSA key or certificate for RSA key
/// transport, raw AES bytes for key wrap). When `certificate` is given its
/// certificates are written to `X509Data`; when the key has a name it is
/// written to `KeyName`.
pub fn encrypt_node(
    doc: &mut Document,
    target: NodeId,
    key: &LongTermKey<'_>,
    certificate: Option<&[u8]>,
    options: &EncryptOptions,
) -> Result<(), Error> {
    let mut stage = Stage::Init;
    let result = run(doc, target, key, certificate, options, &mut stage);
    if let Err(e) = &result {
        warn!(stage = %stage, kind = ?e.kind(), "encryption aborted: {e}");
    }
    result
}

fn run(
    doc: &mut Document,
    target: NodeId,
    key: &LongTermKey<'_>,
    certificate: Option<&[u8]>,
    options: &EncryptOptions,
    stage: &mut Stage,
) -> Result<(), Error> {
    options.validate()?;
    if doc.element(target).is_none() || !doc.is_attached(target) {
        return Err(Error::Validation(
            "target must be an element of the document".into(),
        ));
    }
    if certificate.is_some_and(<[u8]>::is_empty) {
        return Err(Error::Validation("certificate must not be empty".into()));
    }
    let metadata = KeyInfoMetadata::from_parts(key.name(), certificate);

    let manager = KeysManager::provision(key.bytes(), key.name()).map_err(|e| {
        Error::KeyProvisioning(Failure::caused_by("failed to create key manager", &e))
    })?;
    advance(stage, Stage::ManagerReady);

    let mut template = TemplateBuilder::new(options, &metadata).build(doc)?;
    let mut ctx = EncContext::new(manager);
    advance(stage, Stage::TemplateReady);

    bind_session_key(&mut ctx, options.key_type(), options.key_bits(), &metadata)?;
    advance(stage, Stage::KeyBound);

    wire_encrypted_key(&mut template, options.key_transport())?;
    advance(stage, Stage::EncryptedKeyNodeReady);

    xml_encrypt(&ctx, template, target)?;
    advance(stage, Stage::Committed);
    Ok(())
}

/// Locate the template's `EncryptedKey`, check it uses `key_transport` and
/// make sure it has a `CipherValue` to receive the encrypted session key.
pub fn wire_encrypted_key(
    template: &mut PendingTemplate<'_>,
    key_transport: &str,
) -> Result<NodeId, Error> {
    let encrypted_key = locate_encrypted_key(template, key_transport).map_err(|e| {
        Error::Encryption(Failure::caused_by("failed to add encrypted key node", &e))
    })?;
    template.handles_mut().encrypted_key = Some(encrypted_key);

    let cipher_value = ensure_cipher_value(template, encrypted_key).map_err(|e| {
        Error::Encryption(Failure::caused_by("failed to add encrypted cipher value", &e))
    })?;
    template.handles_mut().encrypted_key_cipher_value = Some(cipher_value);
    Ok(encrypted_key)
}

fn locate_encrypted_key(
    template: &PendingTemplate<'_>,
    key_transport: &str,
) -> Result<NodeId, Error> {
    let doc = template.document();
    let root = template.handles().encrypted_data;
    let key_info = doc
        .find_child(root, ns::DSIG, ns::node::KEY_INFO)
        .ok_or_else(|| Error::MissingElement("KeyInfo".into()))?;
    let encrypted_key = doc
        .find_child(key_info, ns::ENC, ns::node::ENCRYPTED_KEY)
        .ok_or_else(|| Error::MissingElement("EncryptedKey".into()))?;
    let method = doc
        .find_child(encrypted_key, ns::ENC, ns::node::ENCRYPTION_METHOD)
        .and_then(|m| doc.attribute(m, ns::attr::ALGORITHM));
    if method != Some(key_transport) {
        return Err(Error::XmlStructure(format!(
            "EncryptedKey uses {}, expected {key_transport}",
            method.unwrap_or("no algorithm")
        )));
    }
    Ok(encrypted_key)
}

fn ensure_cipher_value(
    template: &mut PendingTemplate<'_>,
    parent: NodeId,
) -> Result<NodeId, Error> {
    let doc = template.document();
    match doc.find_child(parent, ns::ENC, ns::node::CIPHER_DATA) {
        Some(cipher_data) => match doc.find_child(cipher_data, ns::ENC, ns::node::CIPHER_VALUE) {
            Some(cipher_value) => Ok(cipher_value),
            None => template.add_child(cipher_data, ns::ENC, None, ns::node::CIPHER_VALUE),
        },
        None => template.add_cipher_value(parent),
    }
}

/// Hybrid encryption of `target` with a prepared template.
///
/// Fills the content `CipherValue`, the `KeyInfo` children and the
/// `EncryptedKey` cipher value, then splices the template in place of
/// `target`. On failure the template is released and the document is
/// unchanged.
pub fn xml_encrypt(
    ctx: &EncContext,
    mut template: PendingTemplate<'_>,
    target: NodeId,
) -> Result<(), Error> {
    fill_template(ctx, &mut template, target)
        .and_then(|()| template.commit(target))
        .map_err(|e| Error::Encryption(Failure::caused_by("encryption failed", &e)))
}

fn encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

fn algorithm_of(doc: &Document, parent: NodeId) -> Result<&str, Error> {
    let method = doc
        .find_child(parent, ns::ENC, ns::node::ENCRYPTION_METHOD)
        .ok_or_else(|| Error::MissingElement("EncryptionMethod".into()))?;
    doc.attribute(method, ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingElement("Algorithm on EncryptionMethod".into()))
}

fn session_key_bytes<'k>(cipher: &BlockCipher, key: &'k Key) -> Result<&'k [u8], Error> {
    match (cipher, &key.data) {
        (BlockCipher::TripleDesCbc, KeyData::Des3(bytes))
        | (BlockCipher::AesCbc { .. } | BlockCipher::AesGcm { .. }, KeyData::Aes(bytes)) => {
            Ok(bytes.as_slice())
        }
        (_, data) => Err(Error::Key(format!(
            "{} cannot use session key {data:?}",
            cipher.uri()
        ))),
    }
}

fn fill_template(
    ctx: &EncContext,
    template: &mut PendingTemplate<'_>,
    target: NodeId,
) -> Result<(), Error> {
    let session = ctx
        .encryption_key
        .as_ref()
        .ok_or_else(|| Error::Key("no session key bound to the context".into()))?;
    let root = template.handles().encrypted_data;

    let doc = template.document();
    if doc.element(target).is_none() || !doc.is_attached(target) {
        return Err(Error::XmlStructure("target is not an element of the document".into()));
    }
    let cipher = BlockCipher::from_uri(algorithm_of(doc, root)?)?;
    let plaintext = doc.serialize_node(target)?;
    let ciphertext = cipher.encrypt(session_key_bytes(&cipher, session)?, plaintext.as_bytes())?;

    let cipher_value = ensure_cipher_value(template, root)?;
    template
        .document_mut()
        .set_text(cipher_value, &encode(&ciphertext))?;

    let key_info = template
        .document()
        .find_child(root, ns::DSIG, ns::node::KEY_INFO)
        .ok_or_else(|| Error::MissingElement("KeyInfo".into()))?;
    let children: Vec<NodeId> = template.document().child_elements(key_info).collect();
    for child in children {
        let doc = template.document();
        if doc.is_element_named(child, ns::DSIG, ns::node::KEY_NAME) {
            if let Some(name) = &session.name {
                template.document_mut().set_text(child, name)?;
            }
        } else if doc.is_element_named(child, ns::DSIG, ns::node::X509_DATA) {
            for der in &session.x509_chain {
                let cert = template.add_child(
                    child,
                    ns::DSIG,
                    Some(ns::DSIG_PREFIX),
                    ns::node::X509_CERTIFICATE,
                )?;
                template.document_mut().set_text(cert, &encode(der))?;
            }
        } else if doc.is_element_named(child, ns::ENC, ns::node::ENCRYPTED_KEY) {
            encrypt_session_key(ctx, template, child, session)?;
        }
    }
    Ok(())
}

fn encrypt_session_key(
    ctx: &EncContext,
    template: &mut PendingTemplate<'_>,
    encrypted_key: NodeId,
    session: &Key,
) -> Result<(), Error> {
    let session_bytes = session
        .symmetric_key_bytes()
        .ok_or_else(|| Error::Key("session key is not symmetric".into()))?;

    let doc = template.document();
    let uri = algorithm_of(doc, encrypted_key)?;
    let digest = doc
        .find_child(encrypted_key, ns::ENC, ns::node::ENCRYPTION_METHOD)
        .and_then(|m| doc.find_child(m, ns::DSIG, ns::node::DIGEST_METHOD))
        .and_then(|d| doc.attribute(d, ns::attr::ALGORITHM));

    let kek = ctx.keys_manager.find_for_transport(
        uri,
        session.name.as_deref(),
        ctx.lax_key_search,
    )?;
    let wrapped = if algorithm::is_key_wrap(uri) {
        let kek_bytes = kek
            .symmetric_key_bytes()
            .ok_or_else(|| Error::Key("key wrap needs a symmetric key".into()))?;
        AesKeyWrap::from_uri(uri)?.wrap(kek_bytes, session_bytes)?
    } else {
        let public = kek
            .rsa_public_key()
            .ok_or_else(|| Error::Key("key transport needs an RSA key".into()))?;
        KeyTransport::with_digest(uri, digest)?.encrypt(public, session_bytes)?
    };

    let cipher_value = ensure_cipher_value(template, encrypted_key)?;
    template.document_mut().set_text(cipher_value, &encode(&wrapped))
}
