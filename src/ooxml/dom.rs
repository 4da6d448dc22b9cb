//! A lightweight element tree for part parsing.
//!
//! The reader walks deeply nested WordprocessingML (tables inside cells,
//! drawings inside runs), which is awkward to do with flat event state.
//! Parts are first loaded into this small DOM via `quick-xml` events, then
//! pattern-matched structurally. Attribute order is retained so unknown
//! attributes can be re-emitted verbatim.

use crate::error::Result;
use indexmap::IndexMap;
use quick_xml::events::Event;
use quick_xml::Reader;

/// One element: qualified name, ordered attributes, children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlNode {
    /// Qualified element name as written, e.g. `w:p`
    pub name: String,
    /// Attributes in document order, qualified name to value
    pub attrs: IndexMap<String, String>,
    /// Child elements in document order
    pub children: Vec<XmlNode>,
    /// Concatenated direct text content
    pub text: String,
}

impl XmlNode {
    /// The name without its prefix (`w:p` → `p`).
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// Attribute by qualified name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(|s| s.as_str())
    }

    /// Attribute by local name, ignoring the prefix.
    pub fn attr_local(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.rsplit(':').next() == Some(local))
            .map(|(_, v)| v.as_str())
    }

    /// First child with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.local_name() == local)
    }

    /// All children with the given local name.
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.local_name() == local)
    }

    /// Walk a path of local names from this node.
    pub fn descend(&self, path: &[&str]) -> Option<&XmlNode> {
        let mut node = self;
        for segment in path {
            node = node.child(segment)?;
        }
        Some(node)
    }

    /// First descendant (depth-first) with the given local name.
    pub fn find(&self, local: &str) -> Option<&XmlNode> {
        for child in &self.children {
            if child.local_name() == local {
                return Some(child);
            }
            if let Some(found) = child.find(local) {
                return Some(found);
            }
        }
        None
    }

    /// The common `w:val` attribute.
    pub fn val(&self) -> Option<&str> {
        self.attr_local("val")
    }

    /// `w:val` parsed as an integer.
    pub fn val_int(&self) -> Option<i64> {
        self.val().and_then(|v| v.parse().ok())
    }

    /// Interpret this element as an OOXML on/off toggle.
    ///
    /// A present element with no `w:val` means "on"; `0`/`false`/`none`
    /// mean "off".
    pub fn as_toggle(&self) -> bool {
        match self.val() {
            None => true,
            Some(v) => !matches!(v, "0" | "false" | "none" | "off"),
        }
    }
}

/// Parse an XML document into its root element.
pub fn parse(xml: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(node_from_start(e)?);
            },
            Ok(Event::Empty(ref e)) => {
                let node = node_from_start(e)?;
                attach(&mut stack, &mut root, node);
            },
            Ok(Event::End(_)) => {
                if let Some(node) = stack.pop() {
                    attach(&mut stack, &mut root, node);
                }
            },
            Ok(Event::Text(ref t)) => {
                if let Some(parent) = stack.last_mut() {
                    parent.text.push_str(&t.unescape().unwrap_or_default());
                }
            },
            Ok(Event::CData(ref t)) => {
                if let Some(parent) = stack.last_mut() {
                    parent.text.push_str(&String::from_utf8_lossy(t.as_ref()));
                }
            },
            Ok(Event::Eof) => break,
            Ok(_) => {},
            Err(e) => return Err(crate::error::Error::Xml(e.to_string())),
        }
        buf.clear();
    }

    root.ok_or_else(|| crate::error::Error::Xml("document has no root element".to_string()))
}

fn node_from_start(e: &quick_xml::events::BytesStart<'_>) -> Result<XmlNode> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = IndexMap::new();
    for attr in e.attributes().with_checks(false).flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        attrs.insert(key, value);
    }
    Ok(XmlNode {
        name,
        attrs,
        children: Vec::new(),
        text: String::new(),
    })
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else if root.is_none() {
        *root = Some(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let root = parse("<w:p><w:r><w:t>hi</w:t></w:r></w:p>").unwrap();
        assert_eq!(root.name, "w:p");
        let t = root.descend(&["r", "t"]).unwrap();
        assert_eq!(t.text, "hi");
    }

    #[test]
    fn test_attr_order_preserved() {
        let root = parse(r#"<w:ind w:left="720" w:hanging="360" custom:x="1"/>"#).unwrap();
        let keys: Vec<&String> = root.attrs.keys().collect();
        assert_eq!(keys, vec!["w:left", "w:hanging", "custom:x"]);
    }

    #[test]
    fn test_attr_local_lookup() {
        let root = parse(r#"<w:color w:val="FF0000" w:themeColor="accent1"/>"#).unwrap();
        assert_eq!(root.attr_local("val"), Some("FF0000"));
        assert_eq!(root.attr_local("themeColor"), Some("accent1"));
        assert_eq!(root.attr_local("missing"), None);
    }

    #[test]
    fn test_toggle_semantics() {
        assert!(parse("<w:b/>").unwrap().as_toggle());
        assert!(!parse(r#"<w:b w:val="0"/>"#).unwrap().as_toggle());
        assert!(!parse(r#"<w:b w:val="false"/>"#).unwrap().as_toggle());
        assert!(parse(r#"<w:b w:val="1"/>"#).unwrap().as_toggle());
    }

    #[test]
    fn test_find_depth_first() {
        let root = parse("<a><b><c/></b><c id=\"top\"/></a>").unwrap();
        // find returns the first in document order, depth-first
        assert!(root.find("c").unwrap().attrs.is_empty());
    }

    #[test]
    fn test_whitespace_preserved_in_text() {
        let root = parse("<w:t xml:space=\"preserve\"> Bold </w:t>").unwrap();
        assert_eq!(root.text, " Bold ");
    }

    #[test]
    fn test_children_named() {
        let root = parse("<w:tbl><w:tr/><w:tr/><w:tblPr/></w:tbl>").unwrap();
        assert_eq!(root.children_named("tr").count(), 2);
    }
}
