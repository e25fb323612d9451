#![forbid(unsafe_code)]

//! Mutable XML document backed by an `uppsala` tree.
//!
//! The tree, the parser and the writer are uppsala's. This wrapper adds the
//! accounting encryption needs on top: which arena slots are still live,
//! how many of them hang outside the document ("detached"), and an optional
//! cap on live nodes. uppsala's arena is append-only, so a released slot is
//! only tombstoned here and its handle never aliases a later node.

use solna_core::{ns, Error};
use std::borrow::Cow;
use std::fmt;
use uppsala::{Element, NodeId, NodeKind, QName, XmlWriteOptions};

/// An XML document whose tree can be edited in place.
pub struct Document {
    inner: uppsala::Document<'static>,
    /// Indexed by arena slot; `true` once the slot has been released.
    released: Vec<bool>,
    node_limit: Option<usize>,
}

impl Document {
    /// Create an empty document holding only the root node.
    pub fn new() -> Self {
        Self::track(uppsala::Document::new())
    }

    /// Parse XML text into a document.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let inner = uppsala::parse(text)
            .map(uppsala::Document::into_static)
            .map_err(|e| Error::XmlParse(e.to_string()))?;
        Ok(Self::track(inner))
    }

    /// Parse XML from bytes, detecting UTF-8 or UTF-16 input.
    pub fn parse_bytes(data: &[u8]) -> Result<Self, Error> {
        let inner = uppsala::parse_bytes(data).map_err(|e| Error::XmlParse(e.to_string()))?;
        Ok(Self::track(inner))
    }

    fn track(inner: uppsala::Document<'static>) -> Self {
        let root = inner.root();
        let reachable = inner.descendants(root);
        let len = reachable
            .iter()
            .map(|n| n.index())
            .fold(root.index(), usize::max)
            + 1;
        let mut released = vec![true; len];
        released[root.index()] = false;
        for n in reachable {
            released[n.index()] = false;
        }
        Self {
            inner,
            released,
            node_limit: None,
        }
    }

    // ── Accounting ───────────────────────────────────────────────────

    /// The document root (parent of the document element).
    pub fn root(&self) -> NodeId {
        self.inner.root()
    }

    /// Cap the number of live nodes; allocations beyond it fail.
    pub fn set_node_limit(&mut self, limit: Option<usize>) {
        self.node_limit = limit;
    }

    /// Number of live nodes, including the root.
    pub fn live_count(&self) -> usize {
        self.released.iter().filter(|r| !**r).count()
    }

    /// Number of live nodes that are not reachable from the root.
    pub fn detached_count(&self) -> usize {
        self.live_count() - self.subtree_ids(self.root()).len()
    }

    /// Whether the handle refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.released.get(id.index()).is_some_and(|r| !*r)
    }

    fn check_live(&self, id: NodeId) -> Result<(), Error> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(Error::XmlStructure(format!("stale node handle #{}", id.index())))
        }
    }

    fn reserve(&self) -> Result<(), Error> {
        if let Some(limit) = self.node_limit {
            if self.live_count() >= limit {
                return Err(Error::XmlStructure(format!(
                    "document node limit of {limit} reached"
                )));
            }
        }
        Ok(())
    }

    fn adopt_new(&mut self, id: NodeId) -> NodeId {
        if id.index() >= self.released.len() {
            self.released.resize(id.index() + 1, true);
        }
        self.released[id.index()] = false;
        id
    }

    // ── Navigation ───────────────────────────────────────────────────

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind<'static>> {
        if self.contains(id) {
            self.inner.node_kind(id)
        } else {
            None
        }
    }

    pub fn element(&self, id: NodeId) -> Option<&Element<'static>> {
        if self.contains(id) {
            self.inner.element(id)
        } else {
            None
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element<'static>, Error> {
        self.check_live(id)?;
        self.inner
            .element_mut(id)
            .ok_or_else(|| Error::XmlStructure("node is not an element".into()))
    }

    /// Local name of an element node.
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.local_name.as_ref())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        if self.contains(id) {
            self.inner.parent(id)
        } else {
            None
        }
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        if self.contains(id) {
            self.inner.children(id)
        } else {
            Vec::new()
        }
    }

    /// Child elements of `id`, skipping text, comments and PIs.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .into_iter()
            .filter(move |c| self.element(*c).is_some())
    }

    /// The single top-level element, if present.
    pub fn document_element(&self) -> Option<NodeId> {
        self.inner.document_element()
    }

    /// Whether the node is linked (directly or transitively) under the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let root = self.root();
        let mut current = Some(id);
        while let Some(n) = current {
            if n == root {
                return self.contains(id);
            }
            current = self.parent(n);
        }
        false
    }

    /// Whether `id` is an element with this namespace (`""` for none) and local name.
    pub fn is_element_named(&self, id: NodeId, ns_uri: &str, local_name: &str) -> bool {
        self.element(id).is_some_and(|e| {
            e.name.local_name == local_name
                && e.name.namespace_uri.as_deref().unwrap_or("") == ns_uri
        })
    }

    /// First child element with the given namespace and local name.
    pub fn find_child(&self, parent: NodeId, ns_uri: &str, local_name: &str) -> Option<NodeId> {
        self.child_elements(parent)
            .find(|c| self.is_element_named(*c, ns_uri, local_name))
    }

    /// First element in document order with the given namespace and local name.
    pub fn find_element(&self, ns_uri: &str, local_name: &str) -> Option<NodeId> {
        self.subtree_ids(self.root())
            .into_iter()
            .find(|n| self.is_element_named(*n, ns_uri, local_name))
    }

    /// First element in document order with the given local name, in any namespace.
    pub fn find_by_name(&self, local_name: &str) -> Option<NodeId> {
        self.subtree_ids(self.root())
            .into_iter()
            .find(|n| self.local_name(*n) == Some(local_name))
    }

    /// Element whose `Id`, `ID` or `id` attribute equals `id_value`.
    pub fn find_by_id(&self, id_value: &str) -> Option<NodeId> {
        let id_attrs = [ns::attr::ID, "ID", "id"];
        self.subtree_ids(self.root()).into_iter().find(|n| {
            id_attrs
                .iter()
                .any(|name| self.attribute(*n, name) == Some(id_value))
        })
    }

    /// Value of an unprefixed attribute.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attributes
            .iter()
            .find(|a| a.name.prefix.is_none() && a.name.local_name == name)
            .map(|a| a.value.as_ref())
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self, id: NodeId) -> String {
        if self.contains(id) {
            self.inner.text_content_deep(id)
        } else {
            String::new()
        }
    }

    /// All node ids of the subtree rooted at `id`, in document order.
    pub fn subtree_ids(&self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut out = vec![id];
        out.extend(self.inner.descendants(id));
        out
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Create a detached element.
    pub fn create_element(
        &mut self,
        namespace: Option<&str>,
        prefix: Option<&str>,
        name: &str,
    ) -> Result<NodeId, Error> {
        if name.is_empty() || name.contains(':') {
            return Err(Error::XmlStructure(format!("invalid element name: {name:?}")));
        }
        let qname = match (namespace, prefix) {
            (Some(uri), Some(p)) => QName::full(p.to_owned(), uri.to_owned(), name.to_owned()),
            (Some(uri), None) => QName::with_namespace(uri.to_owned(), name.to_owned()),
            (None, None) => QName::local(name.to_owned()),
            (None, Some(p)) => {
                return Err(Error::XmlStructure(format!(
                    "prefix {p:?} on {name:?} has no namespace"
                )))
            }
        };
        self.reserve()?;
        let id = self.inner.create_element(qname);
        Ok(self.adopt_new(id))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> Result<NodeId, Error> {
        self.reserve()?;
        let id = self.inner.create_text(text.to_owned());
        Ok(self.adopt_new(id))
    }

    /// Declare a namespace on an element, replacing an existing binding for the prefix.
    pub fn declare_namespace(
        &mut self,
        id: NodeId,
        prefix: Option<&str>,
        uri: &str,
    ) -> Result<(), Error> {
        self.element_mut(id)?;
        self.inner.declare_namespace(id, prefix, uri.to_owned());
        Ok(())
    }

    /// Set an unprefixed attribute, replacing any previous value.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), Error> {
        self.element_mut(id)?
            .set_attribute(QName::local(name.to_owned()), Cow::Owned(value.to_owned()));
        Ok(())
    }

    fn check_can_adopt(&self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        if !matches!(self.kind(parent), Some(NodeKind::Element(_) | NodeKind::Document)) {
            self.check_live(parent)?;
            return Err(Error::XmlStructure("parent cannot have children".into()));
        }
        match self.kind(child) {
            None => self.check_live(child)?,
            Some(NodeKind::Document) => {
                return Err(Error::XmlStructure("the root cannot be adopted".into()))
            }
            Some(_) => {}
        }
        if self.parent(child).is_some() {
            return Err(Error::XmlStructure("node already has a parent".into()));
        }
        // A detached child is the top of its own subtree, so it is an
        // ancestor of `parent` exactly when `parent` sits inside it.
        let mut current = Some(parent);
        while let Some(n) = current {
            if n == child {
                return Err(Error::XmlStructure(
                    "cannot append a node beneath itself".into(),
                ));
            }
            current = self.parent(n);
        }
        Ok(())
    }

    /// Append a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        self.check_can_adopt(parent, child)?;
        self.inner.append_child(parent, child);
        Ok(())
    }

    /// Insert a detached node as child number `index` of `parent`.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), Error> {
        self.check_can_adopt(parent, child)?;
        match self.inner.children(parent).get(index) {
            Some(&reference) => self.inner.insert_before(parent, child, reference),
            None => self.inner.append_child(parent, child),
        }
        Ok(())
    }

    /// Replace the content of an element with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), Error> {
        self.element_mut(id)?;
        let new_child = if text.is_empty() {
            None
        } else {
            Some(self.create_text(text)?)
        };
        for child in self.inner.children(id) {
            self.free_subtree(child);
        }
        if let Some(t) = new_child {
            self.inner.append_child(id, t);
        }
        Ok(())
    }

    /// Unlink a node from its parent and release it with all its descendants.
    ///
    /// Stale handles and the root are ignored.
    pub fn free_subtree(&mut self, id: NodeId) {
        if id == self.root() || !self.contains(id) {
            return;
        }
        self.inner.detach(id);
        for n in self.subtree_ids(id) {
            self.released[n.index()] = true;
        }
    }

    /// Put the detached node `new` in the place of the attached node `old`,
    /// then release `old` and its descendants.
    ///
    /// Both handles are validated before the tree is touched, so on error
    /// the document is unchanged.
    pub fn replace_node(&mut self, old: NodeId, new: NodeId) -> Result<(), Error> {
        if old == self.root() {
            return Err(Error::XmlStructure("cannot replace the document root".into()));
        }
        if !self.is_attached(old) {
            return Err(Error::XmlStructure(
                "node to replace is not part of the document".into(),
            ));
        }
        self.check_live(new)?;
        if self.parent(new).is_some() || new == self.root() {
            return Err(Error::XmlStructure(
                "replacement node must be detached".into(),
            ));
        }
        let parent = self
            .parent(old)
            .ok_or_else(|| Error::XmlStructure("node to replace has no parent".into()))?;

        self.inner.replace_child(parent, new, old);
        if self.inner.parent(new) != Some(parent) {
            return Err(Error::XmlStructure("splice was rejected by the tree".into()));
        }
        self.free_subtree(old);
        Ok(())
    }

    // ── Serialization ────────────────────────────────────────────────

    /// Serialize the subtree rooted at `id`.
    ///
    /// Namespaces bound on ancestors count as in scope and are not repeated.
    pub fn serialize_node(&self, id: NodeId) -> Result<String, Error> {
        self.check_live(id)?;
        Ok(self.inner.node_to_xml(id))
    }

    /// Serialize the whole document, keeping its XML declaration and DOCTYPE.
    pub fn to_xml_string(&self) -> String {
        self.inner
            .to_xml_with_options(&XmlWriteOptions::compact().with_doctype(true))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml_string())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("live", &self.live_count())
            .field("detached", &self.detached_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?><o:Orders xmlns:o="urn:orders" xmlns="urn:default"><o:Order Id="o1" note="a &amp; b"><Item>Tea &lt;green</Item></o:Order><Card id="c1">4111</Card></o:Orders>"#;

    #[test]
    fn test_parse_and_serialize_preserves_prefixes() {
        let doc = Document::parse(SAMPLE).unwrap();
        let out = doc.to_xml_string();
        assert!(out.starts_with("<?xml version=\"1.0\"?>"));
        assert!(out.contains(
            r#"<o:Orders xmlns:o="urn:orders" xmlns="urn:default"><o:Order Id="o1" note="a &amp; b">"#
        ));
        assert!(out.contains("<Item>Tea &lt;green</Item>"));
        assert_eq!(doc.detached_count(), 0);

        // Re-parsing the output yields the same serialization.
        let again = Document::parse(&out).unwrap();
        assert_eq!(again.to_xml_string(), out);
    }

    #[test]
    fn test_doctype_survives_serialization() {
        let xml = r#"<!DOCTYPE order [<!ELEMENT order ANY>]><order Id="o1"><card>4111</card></order>"#;
        let mut doc = Document::parse(xml).unwrap();
        let card = doc.find_by_name("card").unwrap();
        let masked = doc.create_element(None, None, "masked").unwrap();
        doc.replace_node(card, masked).unwrap();

        let out = doc.to_xml_string();
        let doctype = out.find("<!DOCTYPE order").expect("DOCTYPE dropped");
        let root = out.find("<order").unwrap();
        assert!(doctype < root);
        assert!(out.ends_with(r#"<order Id="o1"><masked/></order>"#));
        assert!(Document::parse(&out).is_ok());
    }

    #[test]
    fn test_namespaces_resolved() {
        let doc = Document::parse(SAMPLE).unwrap();
        let order = doc.find_by_id("o1").unwrap();
        let e = doc.element(order).unwrap();
        assert_eq!(e.name.prefix.as_deref(), Some("o"));
        assert_eq!(e.name.namespace_uri.as_deref(), Some("urn:orders"));
        assert!(e.namespace_declarations.is_empty(), "inherited bindings are not redeclared");
        let item = doc.find_child(order, "urn:default", "Item").unwrap();
        assert_eq!(doc.text(item), "Tea <green");
        assert_eq!(doc.serialize_node(item).unwrap(), "<Item>Tea &lt;green</Item>");
    }

    #[test]
    fn test_find_helpers() {
        let doc = Document::parse(SAMPLE).unwrap();
        let card = doc.find_by_id("c1").unwrap();
        assert_eq!(doc.find_by_name("Card"), Some(card));
        assert_eq!(doc.local_name(card), Some("Card"));
        assert_eq!(doc.find_element("urn:default", "Card"), Some(card));
        assert!(doc.find_element("urn:orders", "Card").is_none());
        assert!(doc.find_by_id("missing").is_none());
    }

    #[test]
    fn test_created_nodes_are_detached_until_appended() {
        let mut doc = Document::parse("<a/>").unwrap();
        let a = doc.document_element().unwrap();
        let b = doc.create_element(None, None, "b").unwrap();
        let c = doc.create_element(None, None, "c").unwrap();
        doc.append_child(b, c).unwrap();
        assert_eq!(doc.detached_count(), 2);
        assert!(!doc.is_attached(c));

        doc.append_child(a, b).unwrap();
        assert_eq!(doc.detached_count(), 0);
        assert!(doc.is_attached(c));
        assert_eq!(doc.to_xml_string(), "<a><b><c/></b></a>");
    }

    #[test]
    fn test_append_rejects_attached_child_and_cycles() {
        let mut doc = Document::parse("<a><b/></a>").unwrap();
        let a = doc.document_element().unwrap();
        let b = doc.find_by_name("b").unwrap();
        assert!(doc.append_child(a, b).is_err());

        let x = doc.create_element(None, None, "x").unwrap();
        let y = doc.create_element(None, None, "y").unwrap();
        doc.append_child(x, y).unwrap();
        assert!(doc.append_child(y, x).is_err());
        assert!(doc.append_child(x, x).is_err());
        assert!(doc.append_child(x, doc.root()).is_err());
    }

    #[test]
    fn test_insert_child_position() {
        let mut doc = Document::parse("<a><first/><last/></a>").unwrap();
        let a = doc.document_element().unwrap();
        let mid = doc.create_element(None, None, "mid").unwrap();
        doc.insert_child(a, 1, mid).unwrap();
        let tail = doc.create_element(None, None, "tail").unwrap();
        doc.insert_child(a, 9, tail).unwrap();
        assert_eq!(doc.to_xml_string(), "<a><first/><mid/><last/><tail/></a>");
    }

    #[test]
    fn test_free_subtree_releases_all_nodes() {
        let mut doc = Document::parse("<a/>").unwrap();
        let before = doc.live_count();
        let b = doc.create_element(None, None, "b").unwrap();
        let c = doc.create_element(None, None, "c").unwrap();
        doc.append_child(b, c).unwrap();
        doc.set_text(c, "hello").unwrap();
        assert_eq!(doc.live_count(), before + 3);

        doc.free_subtree(b);
        assert_eq!(doc.live_count(), before);
        assert_eq!(doc.detached_count(), 0);
        assert!(!doc.contains(c));

        let root = doc.root();
        doc.free_subtree(root);
        assert!(doc.contains(root));
    }

    #[test]
    fn test_released_handle_stays_dead() {
        let mut doc = Document::parse("<a/>").unwrap();
        let b = doc.create_element(None, None, "b").unwrap();
        doc.free_subtree(b);
        let c = doc.create_element(None, None, "c").unwrap();
        assert_ne!(b, c);
        assert!(!doc.contains(b));
        assert!(doc.element(b).is_none());
        assert!(doc.set_attribute(b, "x", "1").is_err());
        assert!(doc.serialize_node(b).is_err());
    }

    #[test]
    fn test_replace_node_keeps_position_and_frees_old() {
        let mut doc = Document::parse("<a><x/><target><deep/></target><y/></a>").unwrap();
        let target = doc.find_by_name("target").unwrap();
        let deep = doc.find_by_name("deep").unwrap();
        let live = doc.live_count();

        let new = doc.create_element(None, None, "new").unwrap();
        doc.replace_node(target, new).unwrap();

        assert_eq!(doc.to_xml_string(), "<a><x/><new/><y/></a>");
        assert!(!doc.contains(target));
        assert!(!doc.contains(deep));
        assert_eq!(doc.live_count(), live - 1);
        assert_eq!(doc.detached_count(), 0);
    }

    #[test]
    fn test_replace_node_validates_before_mutating() {
        let mut doc = Document::parse("<a><x/><y/></a>").unwrap();
        let x = doc.find_by_name("x").unwrap();
        let y = doc.find_by_name("y").unwrap();
        let before = doc.to_xml_string();

        // Replacement already attached.
        assert!(doc.replace_node(x, y).is_err());
        // Target detached.
        let loose = doc.create_element(None, None, "loose").unwrap();
        let other = doc.create_element(None, None, "other").unwrap();
        assert!(doc.replace_node(loose, other).is_err());
        // Root.
        let root = doc.root();
        assert!(doc.replace_node(root, other).is_err());
        // Replacement containing the target's parent.
        let a = doc.document_element().unwrap();
        assert!(doc.replace_node(x, a).is_err());

        assert_eq!(doc.to_xml_string(), before);
        assert_eq!(doc.detached_count(), 2);
    }

    #[test]
    fn test_node_limit() {
        let mut doc = Document::parse("<a/>").unwrap();
        doc.set_node_limit(Some(doc.live_count() + 1));
        let b = doc.create_element(None, None, "b").unwrap();
        let err = doc.create_element(None, None, "c").unwrap_err();
        assert!(err.to_string().contains("node limit"));
        assert!(doc.create_text("t").is_err());
        doc.free_subtree(b);
        assert!(doc.create_element(None, None, "c").is_ok());
    }

    #[test]
    fn test_set_text_replaces_children() {
        let mut doc = Document::parse("<a><b/>old</a>").unwrap();
        let a = doc.document_element().unwrap();
        doc.set_text(a, "new & improved").unwrap();
        assert_eq!(doc.to_xml_string(), "<a>new &amp; improved</a>");
        assert_eq!(doc.detached_count(), 0);
    }

    #[test]
    fn test_serialize_node_with_declarations() {
        let mut doc = Document::parse("<r/>").unwrap();
        let e = doc.create_element(Some("urn:x"), Some("x"), "E").unwrap();
        doc.declare_namespace(e, Some("x"), "urn:x").unwrap();
        doc.set_attribute(e, "Type", "a\"b").unwrap();
        assert_eq!(
            doc.serialize_node(e).unwrap(),
            r#"<x:E xmlns:x="urn:x" Type="a&quot;b"/>"#
        );
        assert!(doc.create_element(None, Some("x"), "F").is_err());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(Document::parse("<a>"), Err(Error::XmlParse(_))));
        assert!(matches!(Document::parse_bytes(b"<a><b></a>"), Err(Error::XmlParse(_))));
    }
}
