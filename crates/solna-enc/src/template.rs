#![forbid(unsafe_code)]

//! Construction of the `EncryptedData` template.
//!
//! The template is built as a detached subtree inside the target document's
//! arena and held by a [`PendingTemplate`]. Dropping the guard without a
//! successful [`PendingTemplate::commit`] releases every node of the
//! template, so no abort path can leave orphaned nodes behind.

use crate::options::{EncryptOptions, KeyInfoMetadata};
use solna_core::{ns, Error, Failure};
use solna_xml::{Document, NodeId};

/// Handles to the nodes of a template under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateHandles {
    pub encrypted_data: NodeId,
    pub cipher_value: Option<NodeId>,
    pub key_info: Option<NodeId>,
    pub x509_data: Option<NodeId>,
    pub key_name: Option<NodeId>,
    pub encrypted_key: Option<NodeId>,
    pub encrypted_key_cipher_value: Option<NodeId>,
}

impl TemplateHandles {
    fn new(encrypted_data: NodeId) -> Self {
        Self {
            encrypted_data,
            cipher_value: None,
            key_info: None,
            x509_data: None,
            key_name: None,
            encrypted_key: None,
            encrypted_key_cipher_value: None,
        }
    }
}

/// A detached template exclusively owned until it is spliced into the
/// document.
pub struct PendingTemplate<'d> {
    doc: &'d mut Document,
    root: Option<NodeId>,
    handles: TemplateHandles,
}

impl<'d> PendingTemplate<'d> {
    pub fn handles(&self) -> &TemplateHandles {
        &self.handles
    }

    pub fn document(&self) -> &Document {
        self.doc
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        self.doc
    }

    pub(crate) fn handles_mut(&mut self) -> &mut TemplateHandles {
        &mut self.handles
    }

    /// Create a child element under `parent`, releasing it again if it
    /// cannot be linked.
    pub(crate) fn add_child(
        &mut self,
        parent: NodeId,
        namespace: &str,
        prefix: Option<&str>,
        name: &str,
    ) -> Result<NodeId, Error> {
        let child = self.doc.create_element(Some(namespace), prefix, name)?;
        if let Err(e) = self.doc.append_child(parent, child) {
            self.doc.free_subtree(child);
            return Err(e);
        }
        Ok(child)
    }

    /// `CipherData/CipherValue` under `parent`; returns the CipherValue.
    pub(crate) fn add_cipher_value(&mut self, parent: NodeId) -> Result<NodeId, Error> {
        let cipher_data = self.add_child(parent, ns::ENC, None, ns::node::CIPHER_DATA)?;
        self.add_child(cipher_data, ns::ENC, None, ns::node::CIPHER_VALUE)
    }

    /// Splice the template into the document in place of `target`.
    ///
    /// On success the document owns the template. On failure the document
    /// is unchanged and the template is released when the guard drops.
    pub fn commit(mut self, target: NodeId) -> Result<(), Error> {
        let root = self
            .root
            .ok_or_else(|| Error::XmlStructure("template already committed".into()))?;
        self.doc.replace_node(target, root)?;
        self.root = None;
        Ok(())
    }
}

impl Drop for PendingTemplate<'_> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            self.doc.free_subtree(root);
        }
    }
}

impl std::fmt::Debug for PendingTemplate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTemplate")
            .field("root", &self.root)
            .field("handles", &self.handles)
            .finish()
    }
}

fn step<T>(result: Result<T, Error>, message: &str) -> Result<T, Error> {
    result.map_err(|e| Error::Template(Failure::caused_by(message, &e)))
}

/// Builds the `EncryptedData` skeleton in wire order.
#[derive(Debug)]
pub struct TemplateBuilder<'a> {
    options: &'a EncryptOptions,
    metadata: &'a KeyInfoMetadata<'a>,
}

impl<'a> TemplateBuilder<'a> {
    pub fn new(options: &'a EncryptOptions, metadata: &'a KeyInfoMetadata<'a>) -> Self {
        Self { options, metadata }
    }

    /// Build the template inside `doc`, detached from its tree.
    ///
    /// Produces
    ///
    /// ```text
    /// EncryptedData[Type=Element]
    ///   EncryptionMethod[Algorithm=block]
    ///   dsig:KeyInfo
    ///     [dsig:X509Data]
    ///     [dsig:KeyName]
    ///     EncryptedKey
    ///       EncryptionMethod[Algorithm=transport] [dsig:DigestMethod]
    ///       CipherData/CipherValue
    ///   CipherData/CipherValue
    /// ```
    pub fn build<'d>(&self, doc: &'d mut Document) -> Result<PendingTemplate<'d>, Error> {
        let root = step(self.create_root(doc), "failed to create encryption template")?;
        let mut template = PendingTemplate {
            doc,
            root: Some(root),
            handles: TemplateHandles::new(root),
        };
        step(
            self.add_encryption_method(&mut template, root),
            "failed to create encryption template",
        )?;

        let cipher_value = step(
            template.add_cipher_value(root),
            "failed to add CipherValue node",
        )?;
        template.handles.cipher_value = Some(cipher_value);

        let key_info = step(self.add_key_info(&mut template), "failed to add KeyInfo node")?;
        template.handles.key_info = Some(key_info);

        if self.metadata.certificate().is_some() {
            let x509 = step(
                template.add_child(key_info, ns::DSIG, Some(ns::DSIG_PREFIX), ns::node::X509_DATA),
                "failed to add X509Data node",
            )?;
            template.handles.x509_data = Some(x509);
        }

        if self.metadata.key_name().is_some() {
            let key_name = step(
                template.add_child(key_info, ns::DSIG, Some(ns::DSIG_PREFIX), ns::node::KEY_NAME),
                "failed to add KeyName node",
            )?;
            template.handles.key_name = Some(key_name);
        }

        let encrypted_key = step(
            self.add_encrypted_key(&mut template, key_info),
            "failed to add EncryptedKey node",
        )?;
        template.handles.encrypted_key = Some(encrypted_key);

        let ek_cipher_value = step(
            template.add_cipher_value(encrypted_key),
            "failed to add EncryptedKey CipherValue node",
        )?;
        template.handles.encrypted_key_cipher_value = Some(ek_cipher_value);

        Ok(template)
    }

    fn create_root(&self, doc: &mut Document) -> Result<NodeId, Error> {
        let root = doc.create_element(Some(ns::ENC), None, ns::node::ENCRYPTED_DATA)?;
        let described = doc
            .declare_namespace(root, None, ns::ENC)
            .and_then(|()| doc.set_attribute(root, ns::attr::TYPE, ns::ENC_TYPE_ELEMENT));
        if let Err(e) = described {
            doc.free_subtree(root);
            return Err(e);
        }
        Ok(root)
    }

    fn add_encryption_method(
        &self,
        template: &mut PendingTemplate<'_>,
        parent: NodeId,
    ) -> Result<NodeId, Error> {
        let method = template.add_child(parent, ns::ENC, None, ns::node::ENCRYPTION_METHOD)?;
        template
            .doc
            .set_attribute(method, ns::attr::ALGORITHM, self.options.block_encryption())?;
        Ok(method)
    }

    /// KeyInfo sits between EncryptionMethod and CipherData.
    fn add_key_info(&self, template: &mut PendingTemplate<'_>) -> Result<NodeId, Error> {
        let root = template.handles.encrypted_data;
        let doc = &mut *template.doc;
        let key_info = doc.create_element(Some(ns::DSIG), Some(ns::DSIG_PREFIX), ns::node::KEY_INFO)?;
        let cipher_data = doc.find_child(root, ns::ENC, ns::node::CIPHER_DATA);
        let position = doc
            .children(root)
            .iter()
            .position(|c| Some(*c) == cipher_data);
        let linked = doc
            .declare_namespace(key_info, Some(ns::DSIG_PREFIX), ns::DSIG)
            .and_then(|()| match position {
                Some(i) => doc.insert_child(root, i, key_info),
                None => doc.append_child(root, key_info),
            });
        if let Err(e) = linked {
            doc.free_subtree(key_info);
            return Err(e);
        }
        Ok(key_info)
    }

    fn add_encrypted_key(
        &self,
        template: &mut PendingTemplate<'_>,
        key_info: NodeId,
    ) -> Result<NodeId, Error> {
        let encrypted_key = template.add_child(key_info, ns::ENC, None, ns::node::ENCRYPTED_KEY)?;
        let method = template.add_child(encrypted_key, ns::ENC, None, ns::node::ENCRYPTION_METHOD)?;
        template
            .doc
            .set_attribute(method, ns::attr::ALGORITHM, self.options.key_transport())?;
        if let Some(digest) = self.options.oaep_digest() {
            let digest_method =
                template.add_child(method, ns::DSIG, Some(ns::DSIG_PREFIX), ns::node::DIGEST_METHOD)?;
            template
                .doc
                .set_attribute(digest_method, ns::attr::ALGORITHM, digest)?;
        }
        Ok(encrypted_key)
    }
}
