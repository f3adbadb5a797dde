//! In-memory XML document.
//!
//! Nodes keep their source text verbatim (start tags with attributes, escaped
//! text, comments) so an unmodified document serializes back to the bytes it
//! was parsed from. Only text content is ever rewritten.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use quick_xml::escape::{escape, partial_escape, unescape};

/// Namespace declarations in scope at an element, prefix to URI. The default
/// namespace is keyed by `""`; an empty URI undeclares.
pub type Bindings = Arc<BTreeMap<String, String>>;

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Namespace-qualified element name: `{uri}local`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub namespace: Option<String>,
    pub local: String,
}

impl ExpandedName {
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.to_string(),
        }
    }
}

impl fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Character data, still escaped as it appears in the source.
    Text(String),
    CData(String),
    Comment(String),
    /// `<?xml ...?>` content without the delimiters.
    Decl(String),
    ProcessingInstruction(String),
    DocType(String),
}

impl Node {
    fn is_blank_text(&self) -> bool {
        matches!(self, Node::Text(t) if t.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Tag content between `<` and `>`: qualified name followed by attributes.
    raw_start: String,
    name_len: usize,
    namespace: Option<String>,
    self_closing: bool,
    bindings: Bindings,
    pub children: Vec<Node>,
}

impl Element {
    /// New empty element. `qname` is written as-is (`prefix:local` or `local`).
    pub fn new(qname: &str, namespace: Option<&str>) -> Self {
        Self {
            raw_start: qname.to_string(),
            name_len: qname.len(),
            namespace: namespace.map(str::to_string),
            self_closing: false,
            bindings: Bindings::default(),
            children: Vec::new(),
        }
    }

    /// Element as read by the parser. `raw_start` must begin with the
    /// `name_len`-byte qualified name.
    pub fn from_source(
        raw_start: String,
        name_len: usize,
        namespace: Option<String>,
        self_closing: bool,
    ) -> Self {
        Self {
            raw_start,
            name_len,
            namespace,
            self_closing,
            bindings: Bindings::default(),
            children: Vec::new(),
        }
    }

    /// Attach the declarations in scope at this element, its own included.
    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// URI bound to `prefix` here, `None` if unbound or undeclared.
    pub fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .get(prefix)
            .map(String::as_str)
            .filter(|uri| !uri.is_empty())
    }

    pub fn qname(&self) -> &str {
        &self.raw_start[..self.name_len]
    }

    /// Prefix of the qualified name, `""` when unprefixed.
    pub fn prefix(&self) -> &str {
        self.qname().split_once(':').map(|(p, _)| p).unwrap_or("")
    }

    pub fn local_name(&self) -> &str {
        let qname = self.qname();
        qname.split_once(':').map(|(_, l)| l).unwrap_or(qname)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing && self.children.is_empty()
    }

    pub fn matches(&self, name: &ExpandedName) -> bool {
        self.local_name() == name.local && self.namespace() == name.namespace.as_deref()
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First direct child with the given name.
    pub fn find(&self, name: &ExpandedName) -> Option<&Element> {
        self.child_elements().find(|e| e.matches(name))
    }

    pub fn find_mut(&mut self, name: &ExpandedName) -> Option<&mut Element> {
        self.child_elements_mut().find(|e| e.matches(name))
    }

    /// Unescaped character data of the direct children, `None` if the
    /// element has no text at all. Undeclared entities are kept verbatim.
    pub fn text(&self) -> Option<String> {
        let mut found = false;
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(raw) => {
                    found = true;
                    out.push_str(&unescape_lenient(raw));
                }
                Node::CData(data) => {
                    found = true;
                    out.push_str(data);
                }
                _ => {}
            }
        }
        found.then_some(out)
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: &str) {
        self.children = vec![Node::Text(partial_escape(text).into_owned())];
        self.self_closing = false;
    }

    /// Prefix bound to `namespace` in scope at this element. The element's
    /// own prefix is preferred when several are bound to the same URI.
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        if self.resolve_prefix(self.prefix()) == Some(namespace) {
            return Some(self.prefix());
        }
        self.bindings
            .iter()
            .find(|(_, uri)| uri.as_str() == namespace)
            .map(|(prefix, _)| prefix.as_str())
    }

    /// Build an empty element named `name` that resolves correctly when
    /// attached as a child of `self`. Without an in-scope prefix for the
    /// namespace the element declares it as its default.
    pub fn new_child(&self, name: &ExpandedName) -> Element {
        let Some(uri) = name.namespace.as_deref() else {
            let mut el = Element::new(&name.local, None);
            if self.resolve_prefix("").is_some() {
                el.raw_start.push_str(" xmlns=\"\"");
                return el.with_bindings(self.rebind("", ""));
            }
            return el.with_bindings(self.bindings.clone());
        };
        match self.prefix_for(uri) {
            Some("") => Element::new(&name.local, Some(uri)).with_bindings(self.bindings.clone()),
            Some(prefix) => Element::new(&format!("{prefix}:{}", name.local), Some(uri))
                .with_bindings(self.bindings.clone()),
            None => {
                let mut el = Element::new(&name.local, Some(uri));
                el.raw_start.push_str(&format!(" xmlns=\"{}\"", escape(uri)));
                el.with_bindings(self.rebind("", uri))
            }
        }
    }

    fn rebind(&self, prefix: &str, uri: &str) -> Bindings {
        let mut bindings = (*self.bindings).clone();
        bindings.insert(prefix.to_string(), uri.to_string());
        Arc::new(bindings)
    }

    /// Append `child` after the last element child, repeating the
    /// whitespace that precedes that sibling.
    pub fn append_child(&mut self, child: Element) {
        self.self_closing = false;

        let last = self
            .children
            .iter()
            .rposition(|n| matches!(n, Node::Element(_)));
        let Some(last) = last else {
            self.children.push(Node::Element(child));
            return;
        };

        let indent = last
            .checked_sub(1)
            .map(|i| &self.children[i])
            .filter(|n| n.is_blank_text())
            .cloned();
        let at = last + 1;
        match indent {
            Some(indent) => {
                self.children.insert(at, Node::Element(child));
                self.children.insert(at, indent);
            }
            None => self.children.insert(at, Node::Element(child)),
        }
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.raw_start);
        if self.is_self_closing() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            child.write_to(out);
        }
        out.push_str("</");
        out.push_str(self.qname());
        out.push('>');
    }
}

/// Resolve references one at a time; undeclared entities stay as written.
fn unescape_lenient(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(end) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let reference = &tail[..=end];
        match unescape(reference) {
            Ok(text) => out.push_str(&text),
            Err(_) => out.push_str(reference),
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}

impl Node {
    fn write_to(&self, out: &mut String) {
        match self {
            Node::Element(e) => e.write_to(out),
            Node::Text(t) => out.push_str(t),
            Node::CData(c) => {
                out.push_str("<![CDATA[");
                out.push_str(c);
                out.push_str("]]>");
            }
            Node::Comment(c) => {
                out.push_str("<!--");
                out.push_str(c);
                out.push_str("-->");
            }
            Node::Decl(d) | Node::ProcessingInstruction(d) => {
                out.push_str("<?");
                out.push_str(d);
                out.push_str("?>");
            }
            Node::DocType(d) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(d.trim_start());
                out.push('>');
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Top-level nodes: prolog, the root element, trailing misc.
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn root(&self) -> Option<&Element> {
        self.nodes.iter().find_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn root_mut(&mut self) -> Option<&mut Element> {
        self.nodes.iter_mut().find_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn has_declaration(&self) -> bool {
        matches!(self.nodes.first(), Some(Node::Decl(_)))
    }

    /// Serialize. A UTF-8 declaration is prepended when the source had none.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        if !self.has_declaration() {
            out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        }
        for node in &self.nodes {
            node.write_to(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "urn:test";

    fn product(children: Vec<Node>) -> Element {
        let mut el = Element::from_source(
            "p:product".into(),
            9,
            Some(NS.into()),
            false,
        )
        .with_bindings(Arc::new(BTreeMap::from([("p".to_string(), NS.to_string())])));
        el.children = children;
        el
    }

    fn field(qname: &str, text: &str) -> Node {
        let mut el = Element::new(qname, Some(NS));
        el.set_text(text);
        Node::Element(el)
    }

    #[test]
    fn name_parts() {
        let el = Element::from_source("p:Name attr=\"1\"".into(), 6, Some(NS.into()), false);
        assert_eq!(el.qname(), "p:Name");
        assert_eq!(el.prefix(), "p");
        assert_eq!(el.local_name(), "Name");
        assert!(el.matches(&ExpandedName::new(Some(NS), "Name")));
        assert!(!el.matches(&ExpandedName::new(None, "Name")));
    }

    #[test]
    fn text_unescapes_and_set_text_escapes() {
        let mut el = Element::new("a", None);
        assert_eq!(el.text(), None);
        el.set_text("salt & <pepper>");
        assert_eq!(el.children, vec![Node::Text("salt &amp; &lt;pepper&gt;".into())]);
        assert_eq!(el.text().as_deref(), Some("salt & <pepper>"));
    }

    #[test]
    fn append_child_copies_sibling_indent() {
        let mut el = product(vec![
            Node::Text("\n    ".into()),
            field("p:ProfileNumber", "123"),
            Node::Text("\n  ".into()),
        ]);
        let child = {
            let mut c = el.new_child(&ExpandedName::new(Some(NS), "Ingredients"));
            c.set_text("water");
            c
        };
        el.append_child(child);

        let mut out = String::new();
        el.write_to(&mut out);
        assert_eq!(
            out,
            "<p:product>\n    <p:ProfileNumber>123</p:ProfileNumber>\n    \
             <p:Ingredients>water</p:Ingredients>\n  </p:product>"
        );
    }

    #[test]
    fn new_child_declares_unbound_namespace() {
        let el = Element::new("product", None);
        let child = el.new_child(&ExpandedName::new(Some("urn:other"), "Ingredients"));
        assert_eq!(child.raw_start, "Ingredients xmlns=\"urn:other\"");
        assert_eq!(child.qname(), "Ingredients");
    }

    #[test]
    fn new_child_prefers_own_prefix_in_scope() {
        let el = product(Vec::new());
        let child = el.new_child(&ExpandedName::new(Some(NS), "Ingredients"));
        assert_eq!(child.qname(), "p:Ingredients");
        assert_eq!(child.resolve_prefix("p"), Some(NS));
    }

    #[test]
    fn new_child_without_namespace_undeclares_default() {
        let el = Element::new("product", None)
            .with_bindings(Arc::new(BTreeMap::from([(String::new(), NS.to_string())])));
        let child = el.new_child(&ExpandedName::new(None, "Ingredients"));
        assert_eq!(child.raw_start, "Ingredients xmlns=\"\"");
        assert_eq!(child.resolve_prefix(""), None);
    }

    #[test]
    fn text_keeps_only_unknown_references_verbatim() {
        let mut el = Element::new("a", None);
        el.children = vec![Node::Text("fish &amp; chips &copy; &#169; &broken".into())];
        assert_eq!(el.text().as_deref(), Some("fish & chips &copy; \u{a9} &broken"));
    }

    #[test]
    fn self_closing_element_opens_when_filled() {
        let mut el = Element::from_source("p:Ingredients".into(), 13, Some(NS.into()), true);
        let mut out = String::new();
        el.write_to(&mut out);
        assert_eq!(out, "<p:Ingredients/>");

        el.set_text("water");
        out.clear();
        el.write_to(&mut out);
        assert_eq!(out, "<p:Ingredients>water</p:Ingredients>");
    }

    #[test]
    fn document_adds_declaration_only_when_missing() {
        let doc = Document {
            nodes: vec![Node::Element(Element::new("root", None))],
        };
        assert_eq!(
            doc.to_xml_string(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root></root>"
        );

        let doc = Document {
            nodes: vec![
                Node::Decl("xml version=\"1.0\"".into()),
                Node::Element(Element::new("root", None)),
            ],
        };
        assert_eq!(doc.to_xml_string(), "<?xml version=\"1.0\"?><root></root>");
    }
}
