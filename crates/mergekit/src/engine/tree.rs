//! Owned XML document model used by the overlay engine.
//!
//! Text, CDATA and comments keep their raw (still escaped) form so writing a
//! document back out never double-escapes. Text is kept byte for byte except
//! whitespace-only runs inside elements that hold no other text; those are
//! layout and get regenerated on output. Elements that carry text are written
//! without added indentation. Processing instructions inside the root element
//! are dropped.

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::path::Path;

const INDENT: usize = 2;

/// A node inside an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
}

impl Node {
    pub(crate) fn is_text(&self) -> bool {
        matches!(self, Node::Text(_) | Node::CData(_))
    }

    fn is_significant_text(&self) -> bool {
        match self {
            Node::Text(t) => !is_layout(t),
            Node::CData(_) => true,
            _ => false,
        }
    }
}

/// XML whitespace only.
fn is_layout(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

/// An element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>, path: &Path) -> Result<Self> {
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| xml_error(path, e))?;
            attributes.push((
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                String::from_utf8_lossy(&attr.value).into_owned(),
            ));
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            children: Vec::new(),
        })
    }

    pub(crate) fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether any child is text, in which case the content is written as is.
    pub(crate) fn has_text(&self) -> bool {
        self.children.iter().any(Node::is_text)
    }

    /// Drop whitespace-only text when the element holds only markup.
    fn strip_layout(&mut self) {
        let has_markup = self.children.iter().any(|n| !n.is_text());
        if has_markup && !self.children.iter().any(Node::is_significant_text) {
            self.children.retain(|n| !n.is_text());
        }
    }

    pub(crate) fn set_attribute(&mut self, key: String, value: String) {
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    #[cfg(test)]
    pub(crate) fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Concatenated raw text of direct text children.
    #[cfg(test)]
    pub(crate) fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) | Node::CData(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// A parsed document: prolog, root element and trailing misc nodes.
#[derive(Debug, Clone)]
pub(crate) struct Document {
    pub decl: Option<BytesDecl<'static>>,
    pub doctype: Option<String>,
    pub prolog: Vec<Node>,
    pub root: Element,
    pub trailing: Vec<Node>,
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Element>,
    prolog: Vec<Node>,
    trailing: Vec<Node>,
    root: Option<Element>,
}

impl TreeBuilder {
    fn attach(&mut self, node: Node, path: &Path) -> Result<()> {
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(node);
            return Ok(());
        }

        match node {
            Node::Element(el) => {
                if self.root.is_some() {
                    return Err(malformed(path, "more than one root element"));
                }
                self.root = Some(el);
            }
            Node::Text(t) if is_layout(&t) => {}
            Node::Text(_) | Node::CData(_) => {
                return Err(malformed(path, "text outside the root element"));
            }
            Node::Comment(_) if self.root.is_none() => self.prolog.push(node),
            Node::Comment(_) => self.trailing.push(node),
        }
        Ok(())
    }
}

/// Parse a complete document read from `path`.
pub(crate) fn parse(source: &[u8], path: &Path) -> Result<Document> {
    let mut reader = Reader::from_reader(source);

    let mut builder = TreeBuilder::default();
    let mut decl = None;
    let mut doctype = None;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            malformed(
                path,
                &format!("{e} (at byte {})", reader.buffer_position()),
            )
        })?;

        match event {
            Event::Decl(d) => decl = Some(d.into_owned()),
            Event::DocType(t) => doctype = Some(String::from_utf8_lossy(&t).into_owned()),
            Event::Start(start) => builder.stack.push(Element::from_start(&start, path)?),
            Event::Empty(start) => {
                let el = Element::from_start(&start, path)?;
                builder.attach(Node::Element(el), path)?;
            }
            Event::End(_) => {
                let mut el = builder
                    .stack
                    .pop()
                    .ok_or_else(|| malformed(path, "unexpected closing tag"))?;
                el.strip_layout();
                builder.attach(Node::Element(el), path)?;
            }
            Event::Text(t) => {
                builder.attach(Node::Text(String::from_utf8_lossy(&t).into_owned()), path)?;
            }
            Event::CData(c) => {
                builder.attach(Node::CData(String::from_utf8_lossy(&c).into_owned()), path)?;
            }
            Event::Comment(c) => {
                builder.attach(Node::Comment(String::from_utf8_lossy(&c).into_owned()), path)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = builder.stack.last() {
        return Err(malformed(
            path,
            &format!("unexpected end of document inside <{}>", open.name),
        ));
    }
    let root = builder
        .root
        .ok_or_else(|| malformed(path, "no root element"))?;

    Ok(Document {
        decl,
        doctype,
        prolog: builder.prolog,
        root,
        trailing: builder.trailing,
    })
}

/// Serialize a document as indented XML.
pub(crate) fn write(doc: &Document) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());

    if let Some(decl) = &doc.decl {
        emit(&mut writer, Event::Decl(decl.clone()))?;
    }
    if let Some(doctype) = &doc.doctype {
        new_line(&mut writer, 0);
        emit(&mut writer, Event::DocType(BytesText::from_escaped(doctype.as_str())))?;
    }
    for node in &doc.prolog {
        write_node(&mut writer, node, 0, true)?;
    }
    new_line(&mut writer, 0);
    write_element(&mut writer, &doc.root, 0)?;
    for node in &doc.trailing {
        write_node(&mut writer, node, 0, true)?;
    }

    let mut out = writer.into_inner();
    out.push(b'\n');
    Ok(out)
}

/// Line break plus indentation, except at the very start of the output.
fn new_line(writer: &mut Writer<Vec<u8>>, depth: usize) {
    let out = writer.get_mut();
    if !out.is_empty() {
        out.push(b'\n');
        out.extend(std::iter::repeat_n(b' ', depth * INDENT));
    }
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node, depth: usize, pretty: bool) -> Result<()> {
    if pretty {
        new_line(writer, depth);
    }
    match node {
        Node::Element(el) => write_element(writer, el, depth),
        Node::Text(t) => emit(writer, Event::Text(BytesText::from_escaped(t.as_str()))),
        Node::CData(c) => emit(writer, Event::CData(BytesCData::new(c.as_str()))),
        Node::Comment(c) => emit(writer, Event::Comment(BytesText::from_escaped(c.as_str()))),
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &Element, depth: usize) -> Result<()> {
    let mut start = BytesStart::new(el.name.as_str());
    for (key, value) in &el.attributes {
        start.push_attribute((key.as_bytes(), value.as_bytes()));
    }

    if el.children.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    let pretty = !el.has_text();
    emit(writer, Event::Start(start))?;
    for child in &el.children {
        write_node(writer, child, depth + 1, pretty)?;
    }
    if pretty {
        new_line(writer, depth);
    }
    emit(writer, Event::End(BytesEnd::new(el.name.as_str())))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::Merge(format!("cannot serialize merged document: {e}")))
}

fn malformed(path: &Path, message: &str) -> Error {
    Error::Xml {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

fn xml_error(path: &Path, err: impl std::fmt::Display) -> Error {
    malformed(path, &err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(xml: &str) -> Result<Document> {
        parse(xml.as_bytes(), Path::new("test.xml"))
    }

    #[test]
    fn test_parse_structure() {
        let doc = parse_str(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- header -->
<project id="p">
  <name>demo &amp; co</name>
  <deps><dep id="a"/><dep id="b"/></deps>
</project>"#,
        )
        .unwrap();

        assert!(doc.decl.is_some());
        assert_eq!(doc.prolog.len(), 1);
        assert_eq!(doc.root.name, "project");
        assert_eq!(doc.root.attribute("id"), Some("p"));

        let children: Vec<_> = doc.root.child_elements().collect();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].text(), "demo &amp; co");
        assert_eq!(children[1].child_elements().count(), 2);
    }

    #[test]
    fn test_write_round_trips_structure() {
        let doc = parse_str(r#"<a x="1 &lt; 2"><b>t &amp; u</b><c/><![CDATA[raw <data>]]></a>"#)
            .unwrap();
        let out = write(&doc).unwrap();
        let again = parse(&out, Path::new("out.xml")).unwrap();
        assert_eq!(again.root, doc.root);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1 &lt; 2"));
        assert!(text.contains("t &amp; u"));
        assert!(text.contains("<![CDATA[raw <data>]]>"));
    }

    #[test]
    fn test_text_survives_round_trip() {
        let doc = parse_str("<r><p>Hello <b>big</b> world</p><v>  padded  </v></r>").unwrap();
        let out = String::from_utf8(write(&doc).unwrap()).unwrap();
        assert_eq!(
            out,
            "<r>\n  <p>Hello <b>big</b> world</p>\n  <v>  padded  </v>\n</r>\n"
        );
    }

    #[test]
    fn test_layout_whitespace_is_reindented() {
        let doc = parse_str(
            "<?xml version=\"1.0\"?>\n<!-- c -->\n<r>\n\t<a>\n\t\t<b/>\n\t</a>\n\t<blank> </blank>\n</r>\n",
        )
        .unwrap();
        let out = String::from_utf8(write(&doc).unwrap()).unwrap();
        assert_eq!(
            out,
            "<?xml version=\"1.0\"?>\n<!-- c -->\n<r>\n  <a>\n    <b/>\n  </a>\n  <blank> </blank>\n</r>\n"
        );
    }

    #[test]
    fn test_rejects_mismatched_tags() {
        let err = parse_str("<a><b></a>").unwrap_err();
        assert!(matches!(err, Error::Xml { .. }));
    }

    #[test]
    fn test_rejects_unclosed_document() {
        let err = parse_str("<a><b></b>").unwrap_err();
        assert!(matches!(err, Error::Xml { .. }));
    }

    #[test]
    fn test_rejects_empty_document() {
        let err = parse_str("<!-- only a comment -->").unwrap_err();
        assert!(err.to_string().contains("no root element"));
    }

    #[test]
    fn test_rejects_text_outside_root() {
        let err = parse_str("<a/> stray").unwrap_err();
        assert!(err.to_string().contains("text outside the root"));
    }

    #[test]
    fn test_rejects_two_roots() {
        let err = parse_str("<a/><b/>").unwrap_err();
        assert!(err.to_string().contains("more than one root"));
    }

    #[test]
    fn test_set_attribute_replaces() {
        let mut el = parse_str(r#"<a k="1"/>"#).unwrap().root;
        el.set_attribute("k".to_string(), "2".to_string());
        el.set_attribute("n".to_string(), "3".to_string());
        assert_eq!(el.attribute("k"), Some("2"));
        assert_eq!(el.attribute("n"), Some("3"));
    }
}
