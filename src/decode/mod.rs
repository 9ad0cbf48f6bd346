//! Reply decoding.
//!
//! Raw gateway output goes through a three-tier parse pipeline that always
//! yields a structurally valid tree, then one of three tree walks turns the
//! tree into the shape the caller asked for (ordered list, keyed dict, or
//! hybrid). Decoding never raises: malformed output is downgraded to an
//! embedded marker with as much diagnostic context as can be salvaged.

pub(crate) mod dom;

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::node::push_cdata;
use crate::reply::{Reply, ReplyMap};
use dom::{Document, XmlKind, ROOT};

/// Embedded marker: the transport returned empty/blank output.
pub const NODATA: &str = "*NODATA";
/// Embedded marker: output was not well formed; a sanitized copy follows.
pub const BADPARSE: &str = "*BADPARSE";
/// Embedded marker: output could not be recovered at all.
pub const NOPARSE: &str = "*NOPARSE";

/// Which parse tier produced the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseTier {
    /// Strict parse of the reply as-is.
    Clean,
    /// Reply was sanitized and wrapped in a `*BADPARSE` envelope.
    BadParse,
    /// Even sanitizing failed; a minimal `*NOPARSE` envelope stands in.
    NoParse,
}

/// Which reply tags count as containers / values during the walk.
///
/// `cmd`, `pgm`, `sh`, `sql` are always containers; `ds` and `row` are by
/// default. `parm` and `return` surface their nesting only when opted in —
/// otherwise the walk passes through them transparently and their leaf
/// values land on the enclosing container.
#[derive(Debug, Clone, Copy)]
pub struct TagPolicy {
    pub parm: bool,
    pub ret: bool,
    pub ds: bool,
    pub row: bool,
}

impl Default for TagPolicy {
    fn default() -> Self {
        TagPolicy {
            parm: false,
            ret: false,
            ds: true,
            row: true,
        }
    }
}

const VALUE_TAGS: &[&str] = &[
    "cmd",
    "sh",
    "data",
    "success",
    "error",
    "xmlhint",
    "jobipcskey",
    "jobname",
    "jobuser",
    "jobnbr",
    "curuser",
    "ccsid",
    "dftccsid",
    "paseccsid",
    "joblog",
    "jobipc",
    "syslibl",
    "usrlibl",
    "version",
    "jobcpf",
];

impl TagPolicy {
    fn is_container(&self, tag: &str) -> bool {
        match tag {
            "cmd" | "pgm" | "sh" | "sql" => true,
            "parm" => self.parm,
            "return" => self.ret,
            "ds" => self.ds,
            "row" => self.row,
            _ => false,
        }
    }

    fn is_value(&self, tag: &str) -> bool {
        match tag {
            "parm" => self.parm,
            "row" => self.row,
            _ => VALUE_TAGS.contains(&tag),
        }
    }
}

/// A fully decoded reply: the (possibly synthesized) reply text, its parse
/// tree, and the tier that produced it.
#[derive(Debug)]
pub struct DecodedReply {
    pub(crate) xml: String,
    pub(crate) doc: Document,
    pub tier: ParseTier,
}

impl DecodedReply {
    pub fn xml(&self) -> &str {
        &self.xml
    }
}

fn nodata_envelope() -> String {
    format!("<?xml version='1.0'?>\n<xmlservice>\n<error>{NODATA}</error>\n</xmlservice>")
}

fn badparse_envelope(sanitized: &str) -> String {
    let mut diag = String::new();
    push_cdata(&mut diag, sanitized);
    format!(
        "<?xml version='1.0'?>\n<xmlservice>\n<error>{BADPARSE}</error>\n<error>{diag}</error>\n</xmlservice>"
    )
}

fn noparse_envelope() -> String {
    format!("<?xml version='1.0'?>\n<xmlservice>\n<error>{NOPARSE}</error>\n</xmlservice>")
}

/// Envelope handed back when output is requested before any call happened.
/// The accumulated input, with markup delimiters blanked, rides along as an
/// `xmlhint` so the caller can see what would have been sent.
pub(crate) fn no_output_envelope(request_xml: &str) -> String {
    let hint = request_xml.replace('<', " ").replace('>', " ");
    let mut diag = String::new();
    push_cdata(&mut diag, &hint);
    format!(
        "<?xml version='1.0'?>\n<xmlservice>\n<error>no output</error>\n<xmlhint>{diag}</xmlhint>\n</xmlservice>"
    )
}

/// Strip control characters plus the two markup delimiters, then collapse
/// space runs, leaving text that can always be CDATA-wrapped.
fn sanitize(raw: &str) -> String {
    // Both patterns are literals; compiled once.
    static STRIP: OnceLock<Option<Regex>> = OnceLock::new();
    static COLLAPSE: OnceLock<Option<Regex>> = OnceLock::new();
    let mut text = raw.to_string();
    if let Some(re) = STRIP.get_or_init(|| Regex::new(r"[\x00-\x1F<>]").ok()) {
        text = re.replace_all(&text, " ").into_owned();
    }
    if let Some(re) = COLLAPSE.get_or_init(|| Regex::new(" +").ok()) {
        text = re.replace_all(&text, " ").into_owned();
    }
    text
}

/// Three-tier parse of raw transport output. Always succeeds; the tier
/// records how much recovery was needed.
pub fn decode(raw: &str) -> DecodedReply {
    let xml = if raw.trim().is_empty() {
        debug!("transport returned no data, synthesizing {NODATA} envelope");
        nodata_envelope()
    } else {
        raw.to_string()
    };

    // Tier 1: strict parse as-is.
    match Document::parse(&xml) {
        Ok(doc) => {
            debug!(tier = "clean", bytes = xml.len(), "reply parsed");
            return DecodedReply {
                xml,
                doc,
                tier: ParseTier::Clean,
            };
        }
        Err(err) => {
            warn!(error = %err, "reply not well formed, sanitizing");
        }
    }

    // Tier 2: sanitize and wrap in a *BADPARSE envelope built to be
    // well formed.
    let cleaned = badparse_envelope(&sanitize(&xml));
    match Document::parse(&cleaned) {
        Ok(doc) => {
            debug!(tier = "badparse", "reply recovered after sanitize");
            return DecodedReply {
                xml: cleaned,
                doc,
                tier: ParseTier::BadParse,
            };
        }
        Err(err) => {
            warn!(error = %err, "sanitized reply still unparseable");
        }
    }

    // Tier 3: give up on the output entirely.
    let minimal = noparse_envelope();
    let doc = Document::parse(&minimal).unwrap_or(Document {
        nodes: vec![dom::XmlNode {
            kind: XmlKind::Element {
                tag: String::new(),
                attrs: Vec::new(),
            },
            children: Vec::new(),
        }],
    });
    DecodedReply {
        xml: minimal,
        doc,
        tier: ParseTier::NoParse,
    }
}

/// True for the inter-element whitespace runs a formatted reply carries.
/// CDATA content is never an artifact.
fn is_whitespace_artifact(text: &str) -> bool {
    text.contains('\n') && text.trim().is_empty()
}

/// Key a value leaf decodes under: `var`, then `desc`, then the tag itself.
/// SQL bind parameters surface under the generic `data` key so their row
/// columns stay positional.
fn value_key(doc: &Document, element: usize) -> String {
    let node = doc.node(element);
    if node.tag() == "parm" {
        return "data".to_string();
    }
    node.attr("var")
        .filter(|v| !v.is_empty())
        .or_else(|| node.attr("desc").filter(|v| !v.is_empty()))
        .unwrap_or_else(|| node.tag())
        .to_string()
}

/// Key a container decodes under: `var`, then `desc`, then the tag itself.
fn container_key(doc: &Document, element: usize) -> String {
    let node = doc.node(element);
    node.attr("var")
        .filter(|v| !v.is_empty())
        .or_else(|| node.attr("desc").filter(|v| !v.is_empty()))
        .unwrap_or_else(|| node.tag())
        .to_string()
}

/// Insert with collision-to-list promotion: a repeated key keeps its slot
/// and its value becomes an ordered list `[old, new]`.
fn insert_promote(out: &mut ReplyMap, key: String, value: Reply) {
    match out.get_mut(&key) {
        Some(Reply::List(items)) => items.push(value),
        Some(existing) => {
            let old = std::mem::replace(existing, Reply::List(Vec::new()));
            if let Reply::List(items) = existing {
                items.push(old);
                items.push(value);
            }
        }
        None => {
            out.insert(key, value);
        }
    }
}

/// Walk for the ordered-list shape: values in document order, one nested
/// list per container.
pub(crate) fn walk_list(doc: &Document, parent: usize, policy: &TagPolicy, out: &mut Vec<Reply>) {
    let parent_is_value = policy.is_value(doc.node(parent).tag());
    for &child in &doc.node(parent).children {
        match &doc.node(child).kind {
            XmlKind::Text(text) => {
                if parent_is_value && !is_whitespace_artifact(text) {
                    out.push(Reply::Text(text.clone()));
                }
            }
            XmlKind::CData(text) => {
                if parent_is_value {
                    out.push(Reply::Text(text.clone()));
                }
            }
            XmlKind::Element { tag, .. } => {
                if policy.is_container(tag) {
                    let mut nested = Vec::new();
                    walk_list(doc, child, policy, &mut nested);
                    out.push(Reply::List(nested));
                } else if policy.is_value(tag) && doc.node(child).children.is_empty() {
                    // Present-but-empty value, never an absent entry.
                    out.push(Reply::Text(String::new()));
                } else {
                    walk_list(doc, child, policy, out);
                }
            }
        }
    }
}

/// Walk for the keyed-dict shape. Container-key collisions promote to a
/// list; duplicate scalar keys gain numeric suffixes from `unq` so every
/// entry stays addressable (SQL row columns all land on a generic key).
pub(crate) fn walk_dict(
    doc: &Document,
    parent: usize,
    policy: &TagPolicy,
    unq: &mut u32,
    out: &mut ReplyMap,
) {
    let parent_is_value = policy.is_value(doc.node(parent).tag());
    for &child in &doc.node(parent).children {
        match &doc.node(child).kind {
            XmlKind::Text(text) => {
                if parent_is_value && !is_whitespace_artifact(text) {
                    bind_scalar(doc, parent, text.clone(), unq, out);
                }
            }
            XmlKind::CData(text) => {
                if parent_is_value {
                    bind_scalar(doc, parent, text.clone(), unq, out);
                }
            }
            XmlKind::Element { tag, .. } => {
                if policy.is_container(tag) {
                    let key = container_key(doc, child);
                    let mut nested = ReplyMap::new();
                    walk_dict(doc, child, policy, unq, &mut nested);
                    insert_promote(out, key, Reply::Map(nested));
                } else if policy.is_value(tag) && doc.node(child).children.is_empty() {
                    bind_scalar(doc, child, String::new(), unq, out);
                } else {
                    walk_dict(doc, child, policy, unq, out);
                }
            }
        }
    }
}

fn bind_scalar(doc: &Document, element: usize, text: String, unq: &mut u32, out: &mut ReplyMap) {
    let base = value_key(doc, element);
    let mut key = base.clone();
    while out.contains_key(&key) {
        *unq += 1;
        key = format!("{base}{unq}");
    }
    out.insert(key, Reply::Text(text));
}

/// Walk for the hybrid shape: containers key like the dict walk, but scalar
/// leaves always collect into a `data` list on the current node, which
/// side-steps key collision for leaf values entirely.
pub(crate) fn walk_hybrid(doc: &Document, parent: usize, policy: &TagPolicy, out: &mut ReplyMap) {
    let parent_is_value = policy.is_value(doc.node(parent).tag());
    for &child in &doc.node(parent).children {
        match &doc.node(child).kind {
            XmlKind::Text(text) => {
                if parent_is_value && !is_whitespace_artifact(text) {
                    push_data(out, text.clone());
                }
            }
            XmlKind::CData(text) => {
                if parent_is_value {
                    push_data(out, text.clone());
                }
            }
            XmlKind::Element { tag, .. } => {
                if policy.is_container(tag) {
                    let key = container_key(doc, child);
                    let mut nested = ReplyMap::new();
                    walk_hybrid(doc, child, policy, &mut nested);
                    insert_promote(out, key, Reply::Map(nested));
                } else if policy.is_value(tag) && doc.node(child).children.is_empty() {
                    push_data(out, String::new());
                } else {
                    walk_hybrid(doc, child, policy, out);
                }
            }
        }
    }
}

fn push_data(out: &mut ReplyMap, text: String) {
    match out.get_mut("data") {
        Some(Reply::List(items)) => items.push(Reply::Text(text)),
        Some(existing) => {
            // A container already claimed the reserved key; fold it in
            // rather than losing either side.
            let old = std::mem::replace(existing, Reply::List(Vec::new()));
            if let Reply::List(items) = existing {
                items.push(old);
                items.push(Reply::Text(text));
            }
        }
        None => {
            out.insert("data".to_string(), Reply::List(vec![Reply::Text(text)]));
        }
    }
}

impl DecodedReply {
    pub(crate) fn to_list(&self, policy: &TagPolicy) -> Vec<Reply> {
        let mut out = Vec::new();
        walk_list(&self.doc, ROOT, policy, &mut out);
        out
    }

    pub(crate) fn to_dict(&self, policy: &TagPolicy) -> ReplyMap {
        let mut out = ReplyMap::new();
        let mut unq = 0;
        walk_dict(&self.doc, ROOT, policy, &mut unq, &mut out);
        out
    }

    pub(crate) fn to_hybrid(&self, policy: &TagPolicy) -> ReplyMap {
        let mut out = ReplyMap::new();
        walk_hybrid(&self.doc, ROOT, policy, &mut out);
        out
    }
}
