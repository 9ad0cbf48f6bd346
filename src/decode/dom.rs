//! Arena parse tree over quick-xml.
//!
//! The decoder never mutates or re-queries a DOM; it walks this flat arena.
//! Node 0 is a synthetic document node whose children are the top-level
//! elements, so walks can start above the reply envelope.

use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug)]
pub(crate) enum XmlKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    /// CDATA is kept distinct only so the whitespace-artifact filter can
    /// leave it alone.
    CData(String),
}

#[derive(Debug)]
pub(crate) struct XmlNode {
    pub kind: XmlKind,
    pub children: Vec<usize>,
}

impl XmlNode {
    pub fn tag(&self) -> &str {
        match &self.kind {
            XmlKind::Element { tag, .. } => tag,
            _ => "",
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        match &self.kind {
            XmlKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Document {
    pub(crate) nodes: Vec<XmlNode>,
}

pub(crate) const ROOT: usize = 0;

impl Document {
    /// Strict structural parse. Any well-formedness problem is an error;
    /// recovery is the caller's job (the three-tier pipeline).
    pub fn parse(xml: &str) -> Result<Document, quick_xml::Error> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().check_end_names = true;

        let mut nodes = vec![XmlNode {
            kind: XmlKind::Element {
                tag: String::new(),
                attrs: Vec::new(),
            },
            children: Vec::new(),
        }];
        let mut stack = vec![ROOT];

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let id = push_element(&mut nodes, &stack, &e)?;
                    stack.push(id);
                }
                Event::Empty(e) => {
                    push_element(&mut nodes, &stack, &e)?;
                }
                Event::End(_) => {
                    // Tag-name pairing already checked by the reader.
                    if stack.len() > 1 {
                        stack.pop();
                    } else {
                        return Err(quick_xml::Error::IllFormed(
                            quick_xml::errors::IllFormedError::UnmatchedEndTag(String::new()),
                        ));
                    }
                }
                Event::Text(t) => {
                    let text = t.unescape()?.into_owned();
                    push_child(
                        &mut nodes,
                        &stack,
                        XmlNode {
                            kind: XmlKind::Text(text),
                            children: Vec::new(),
                        },
                    );
                }
                Event::CData(c) => {
                    let text = String::from_utf8_lossy(c.into_inner().as_ref()).into_owned();
                    push_child(
                        &mut nodes,
                        &stack,
                        XmlNode {
                            kind: XmlKind::CData(text),
                            children: Vec::new(),
                        },
                    );
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions and
                // doctypes carry no reply data.
                _ => {}
            }
        }

        if stack.len() > 1 {
            return Err(quick_xml::Error::IllFormed(
                quick_xml::errors::IllFormedError::MissingEndTag(String::new()),
            ));
        }
        Ok(Document { nodes })
    }

    pub(crate) fn node(&self, id: usize) -> &XmlNode {
        &self.nodes[id]
    }
}

fn push_element(
    nodes: &mut Vec<XmlNode>,
    stack: &[usize],
    e: &quick_xml::events::BytesStart<'_>,
) -> Result<usize, quick_xml::Error> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    let node = XmlNode {
        kind: XmlKind::Element { tag, attrs },
        children: Vec::new(),
    };
    Ok(push_child_idx(nodes, stack, node))
}

fn push_child(nodes: &mut Vec<XmlNode>, stack: &[usize], node: XmlNode) {
    push_child_idx(nodes, stack, node);
}

fn push_child_idx(nodes: &mut Vec<XmlNode>, stack: &[usize], node: XmlNode) -> usize {
    let id = nodes.len();
    nodes.push(node);
    let parent = *stack.last().unwrap_or(&ROOT);
    nodes[parent].children.push(id);
    id
}
