use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ReconError;
use crate::tree::{Bindings, Document, Element, Node};

/// Parse an XML document, resolving element namespaces from in-scope
/// `xmlns` declarations.
pub fn parse_document(xml: &str) -> Result<Document, ReconError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut doc = Document::default();
    let mut open: Vec<Element> = Vec::new();
    let mut scopes = NamespaceScopes::default();

    loop {
        let event = reader.read_event().map_err(|e| {
            ReconError::Xml(format!("at byte {}: {e}", reader.buffer_position()))
        })?;
        match event {
            Event::Start(start) => {
                open.push(open_element(&start, &mut scopes, false)?);
            }
            Event::Empty(start) => {
                let el = open_element(&start, &mut scopes, true)?;
                scopes.pop();
                attach(&mut doc, &mut open, Node::Element(el));
            }
            Event::End(_) => {
                let el = open
                    .pop()
                    .ok_or_else(|| ReconError::Xml("unexpected closing tag".into()))?;
                scopes.pop();
                attach(&mut doc, &mut open, Node::Element(el));
            }
            Event::Text(text) => attach_text(&mut doc, &mut open, &utf8(&text)?),
            Event::GeneralRef(entity) => {
                attach_text(&mut doc, &mut open, &format!("&{};", utf8(&entity)?))
            }
            Event::CData(data) => attach(&mut doc, &mut open, Node::CData(utf8(&data)?)),
            Event::Comment(comment) => {
                attach(&mut doc, &mut open, Node::Comment(utf8(&comment)?))
            }
            Event::Decl(decl) => attach(&mut doc, &mut open, Node::Decl(utf8(&decl)?)),
            Event::PI(pi) => {
                attach(&mut doc, &mut open, Node::ProcessingInstruction(utf8(&pi)?))
            }
            Event::DocType(doctype) => {
                attach(&mut doc, &mut open, Node::DocType(utf8(&doctype)?))
            }
            Event::Eof => break,
        }
    }

    if let Some(el) = open.last() {
        return Err(ReconError::Xml(format!("unclosed element <{}>", el.qname())));
    }
    if doc.root().is_none() {
        return Err(ReconError::Xml("document has no root element".into()));
    }
    Ok(doc)
}

fn utf8(bytes: &[u8]) -> Result<String, ReconError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| ReconError::Xml(format!("invalid UTF-8: {e}")))
}

fn open_element(
    start: &BytesStart<'_>,
    scopes: &mut NamespaceScopes,
    self_closing: bool,
) -> Result<Element, ReconError> {
    let raw = utf8(start)?;
    let name_len = start.name().as_ref().len();

    let mut declared = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ReconError::Xml(e.to_string()))?;
        let key = utf8(attr.key.as_ref())?;
        let value = utf8(&attr.value)?;
        if key == "xmlns" {
            declared.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declared.push((prefix.to_string(), value));
        }
    }
    let bindings = scopes.push(declared);

    let qname = &raw[..name_len];
    let prefix = qname.split_once(':').map(|(p, _)| p).unwrap_or("");
    let namespace = scopes.resolve(prefix);
    if namespace.is_none() && !prefix.is_empty() && prefix != "xml" {
        return Err(ReconError::Xml(format!("unbound prefix in <{qname}>")));
    }

    Ok(Element::from_source(raw, name_len, namespace, self_closing).with_bindings(bindings))
}

fn attach(doc: &mut Document, open: &mut [Element], node: Node) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => doc.nodes.push(node),
    }
}

/// Entity references arrive as separate events; keep them in one text node.
fn attach_text(doc: &mut Document, open: &mut [Element], raw: &str) {
    let siblings = match open.last_mut() {
        Some(parent) => &mut parent.children,
        None => &mut doc.nodes,
    };
    match siblings.last_mut() {
        Some(Node::Text(prev)) => prev.push_str(raw),
        _ => siblings.push(Node::Text(raw.to_string())),
    }
}

/// In-scope `xmlns` bindings, one frame per open element. Elements that
/// declare nothing share their parent's frame.
#[derive(Default)]
struct NamespaceScopes {
    frames: Vec<Bindings>,
}

impl NamespaceScopes {
    fn push(&mut self, declared: Vec<(String, String)>) -> Bindings {
        let parent = self.frames.last().cloned().unwrap_or_default();
        let frame = if declared.is_empty() {
            parent
        } else {
            let mut bindings = (*parent).clone();
            bindings.extend(declared);
            Bindings::new(bindings)
        };
        self.frames.push(frame.clone());
        frame
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    /// An empty URI undeclares the prefix.
    fn resolve(&self, prefix: &str) -> Option<String> {
        self.frames
            .last()
            .and_then(|frame| frame.get(prefix))
            .filter(|uri| !uri.is_empty())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ExpandedName;

    const NS: &str = "urn:schemas:products";

    #[test]
    fn resolves_prefixed_and_default_namespaces() {
        let xml = format!(
            r#"<root xmlns:urn="{NS}"><urn:products><item xmlns="urn:other"/></urn:products></root>"#
        );
        let doc = parse_document(&xml).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.namespace(), None);

        let products = root.find(&ExpandedName::new(Some(NS), "products")).unwrap();
        let item = products.child_elements().next().unwrap();
        assert_eq!(item.namespace(), Some("urn:other"));
        assert!(item.is_self_closing());
    }

    #[test]
    fn unmodified_document_round_trips_verbatim() {
        let xml = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
                   <!-- catalog -->\n\
                   <root xmlns:u=\"urn:x\" a='1'>\n  \
                   <u:p  id=\"7\">fish &amp; chips &#169;</u:p>\n  \
                   <u:q/><![CDATA[<raw>]]><?pi data?>\n\
                   </root>\n";
        let doc = parse_document(xml).unwrap();
        assert_eq!(doc.to_xml_string(), xml);
    }

    #[test]
    fn entity_references_merge_into_text() {
        let doc = parse_document("<r>a &lt; b &amp; c</r>").unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.text().as_deref(), Some("a < b & c"));
    }

    #[test]
    fn rejects_unbound_prefix() {
        let err = parse_document("<x:root/>").unwrap_err();
        assert!(err.to_string().contains("unbound prefix"));
    }

    #[test]
    fn rejects_mismatched_and_unclosed_tags() {
        assert!(parse_document("<a><b></a>").is_err());
        assert!(parse_document("<a><b></b>").is_err());
        assert!(parse_document("  ").is_err());
    }
}
