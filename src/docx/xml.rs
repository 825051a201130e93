//! A minimal owned XML tree for WordprocessingML parts.
//!
//! Element and attribute names keep their prefixes (`w:p`, `r:embed`), which
//! is how Word writes them in practice.


use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;

use crate::error::{Error, Result};

/// An XML node: element or character data.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with qualified name, attributes and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr.unescape_value()?.to_string();
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            attrs,
            children: Vec::new(),
        })
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// Attribute value by qualified name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Direct child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Direct child elements with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.child_elements().filter(move |e| e.name == name)
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.name == name)
    }

    /// All descendant elements in document order, excluding `self`.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        fn walk<'a>(el: &'a Element, out: &mut Vec<&'a Element>) {
            for child in el.child_elements() {
                out.push(child);
                walk(child, out);
            }
        }
        walk(self, &mut out);
        out
    }

    /// Descendant elements with the given qualified name.
    pub fn find_all(&self, name: &str) -> Vec<&Element> {
        self.descendants()
            .into_iter()
            .filter(|e| e.name == name)
            .collect()
    }

    /// Whether any descendant has the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.child_elements()
            .any(|c| c.name == name || c.contains(name))
    }

    /// Visit every descendant together with the names of its ancestors,
    /// outermost first and starting at `self`.
    pub fn walk_with_path<'a>(&'a self, mut visit: impl FnMut(&'a Element, &[&'a str])) {
        fn walk<'a>(
            el: &'a Element,
            path: &mut Vec<&'a str>,
            visit: &mut dyn FnMut(&'a Element, &[&'a str]),
        ) {
            path.push(&el.name);
            for child in el.child_elements() {
                visit(child, path);
                walk(child, path, visit);
            }
            path.pop();
        }
        let mut path = Vec::new();
        walk(self, &mut path, &mut visit);
    }

    /// Serialize the element back to XML.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str(&format!("<{}", self.name));
        for (k, v) in &self.attrs {
            out.push_str(&format!(" {}=\"{}\"", k, escape(v.as_str())));
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_xml(out),
                Node::Text(t) => out.push_str(&escape(t.as_str())),
            }
        }
        out.push_str(&format!("</{}>", self.name));
    }
}

/// Parse an XML document into its root element.
pub fn parse(xml: &[u8]) -> Result<Element> {
    let mut reader = Reader::from_reader(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => stack.push(Element::from_start(e)?),
            Event::Empty(ref e) => {
                let el = Element::from_start(e)?;
                attach(&mut stack, &mut root, el);
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| Error::Xml("unbalanced end tag".into()))?;
                attach(&mut stack, &mut root, el);
            }
            Event::Text(ref e) => {
                if let Some(parent) = stack.last_mut() {
                    let text = e.unescape()?.to_string();
                    if !text.is_empty() {
                        parent.children.push(Node::Text(text));
                    }
                }
            }
            Event::CData(ref e) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(e).to_string();
                    parent.children.push(Node::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(Error::Xml("unexpected end of document".into()));
    }
    root.ok_or_else(|| Error::Xml("document has no root element".into()))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(el)),
        None => *root = Some(el),
    }
}

/// Visible text of a `w:p`, as Word shows it.
///
/// Runs directly under the paragraph and under hyperlinks, insertions and
/// smart tags contribute; text boxes nested inside drawings do not.
pub fn paragraph_text(paragraph: &Element) -> String {
    let mut text = String::new();
    collect_run_text(paragraph, &mut text);
    text
}

fn collect_run_text(container: &Element, text: &mut String) {
    for child in container.child_elements() {
        match child.name.as_str() {
            "w:r" => {
                for part in child.child_elements() {
                    match part.name.as_str() {
                        "w:t" => text.push_str(&element_text(part)),
                        "w:tab" => text.push('\t'),
                        "w:br" | "w:cr" => text.push('\n'),
                        _ => {}
                    }
                }
            }
            "w:hyperlink" | "w:ins" | "w:smartTag" | "w:fldSimple" => collect_run_text(child, text),
            _ => {}
        }
    }
}

fn element_text(el: &Element) -> String {
    el.children
        .iter()
        .map(|n| match n {
            Node::Text(t) => t.clone(),
            Node::Element(e) => element_text(e),
        })
        .collect()
}

/// Where a table paragraph sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellLocation {
    pub table: usize,
    pub row: usize,
    pub cell: usize,
}

/// A body paragraph in document order.
#[derive(Debug, Clone)]
pub struct Paragraph<'a> {
    pub index: usize,
    pub element: &'a Element,
    /// Set when the paragraph lives inside a table cell
    pub cell: Option<CellLocation>,
}

impl Paragraph<'_> {
    pub fn text(&self) -> String {
        paragraph_text(self.element)
    }
}

/// Enumerate the paragraphs of `w:document/w:body` in document order.
///
/// Table paragraphs are flattened into the sequence and tagged with the
/// location of their top-level table cell.
pub fn body_paragraphs(document: &Element) -> Vec<Paragraph<'_>> {
    let mut out = Vec::new();
    let body = match document.child("w:body") {
        Some(body) => body,
        None if document.name == "w:body" => document,
        None => return out,
    };
    let mut table_count = 0;
    collect_block(body, None, &mut table_count, &mut out);
    out
}

fn collect_block<'a>(
    container: &'a Element,
    cell: Option<CellLocation>,
    table_count: &mut usize,
    out: &mut Vec<Paragraph<'a>>,
) {
    for child in container.child_elements() {
        match child.name.as_str() {
            "w:p" => out.push(Paragraph {
                index: out.len(),
                element: child,
                cell,
            }),
            "w:tbl" => {
                let table = *table_count;
                *table_count += 1;
                for (row_idx, row) in child.children_named("w:tr").enumerate() {
                    for (cell_idx, tc) in row.children_named("w:tc").enumerate() {
                        let location = cell.unwrap_or(CellLocation {
                            table,
                            row: row_idx,
                            cell: cell_idx,
                        });
                        collect_block(tc, Some(location), table_count, out);
                    }
                }
            }
            "w:sdt" => {
                if let Some(content) = child.child("w:sdtContent") {
                    collect_block(content, cell, table_count, out);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="w" xmlns:r="r">
  <w:body>
    <w:p><w:r><w:t>Figure 1.</w:t><w:tab/><w:t xml:space="preserve"> A &amp; B</w:t></w:r></w:p>
    <w:tbl>
      <w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc><w:tc><w:p/></w:tc></w:tr>
    </w:tbl>
    <w:p><w:hyperlink><w:r><w:t>link</w:t><w:br/></w:r></w:hyperlink></w:p>
  </w:body>
</w:document>"#;

    #[test]
    fn test_parse_tree() {
        let root = parse(DOC.as_bytes()).unwrap();
        assert_eq!(root.name, "w:document");
        assert_eq!(root.local_name(), "document");
        assert_eq!(root.attr("xmlns:w"), Some("w"));
        assert_eq!(root.find_all("w:p").len(), 4);
        assert!(root.contains("w:tbl"));
    }

    #[test]
    fn test_paragraph_text() {
        let root = parse(DOC.as_bytes()).unwrap();
        let paragraphs = body_paragraphs(&root);
        assert_eq!(paragraphs[0].text(), "Figure 1.\t A & B");
        assert_eq!(paragraphs[3].text(), "link\n");
    }

    #[test]
    fn test_body_paragraphs_flatten_tables() {
        let root = parse(DOC.as_bytes()).unwrap();
        let paragraphs = body_paragraphs(&root);
        assert_eq!(paragraphs.len(), 4);
        assert_eq!(paragraphs[0].cell, None);
        assert_eq!(
            paragraphs[2].cell,
            Some(CellLocation {
                table: 0,
                row: 0,
                cell: 1
            })
        );
        assert_eq!(paragraphs[3].index, 3);
    }

    #[test]
    fn test_walk_with_path() {
        let root = parse(DOC.as_bytes()).unwrap();
        let mut depth_of_t = None;
        root.walk_with_path(|el, path| {
            if el.name == "w:t" && depth_of_t.is_none() {
                depth_of_t = Some(path.to_vec());
            }
        });
        assert_eq!(
            depth_of_t.unwrap(),
            vec!["w:document", "w:body", "w:p", "w:r"]
        );
    }

    #[test]
    fn test_to_xml_string_escapes() {
        let root = parse(br#"<a x="1 &amp; 2"><b>t&lt;</b><c/></a>"#).unwrap();
        assert_eq!(root.to_xml_string(), r#"<a x="1 &amp; 2"><b>t&lt;</b><c/></a>"#);
    }

    #[test]
    fn test_parse_rejects_unbalanced() {
        assert!(parse(b"<a><b></a>").is_err());
        assert!(parse(b"").is_err());
    }
}
