//! Parameter-tree nodes for program calls.
//!
//! A program call carries an ordered list of parameters; each parameter is
//! either a scalar [`Data`] value or a nested [`Ds`] data structure, which in
//! turn nests more of either. Insertion order is semantically meaningful —
//! it maps to positional host parameters — so children are kept in the order
//! they were added.

use std::fmt::Write;

use crate::types::{HostType, Varying};

/// Escape a value for use inside a single-quoted XML attribute.
pub(crate) fn attr_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&apos;")
}

/// Append `value` wrapped in CDATA, or nothing when it is empty.
///
/// Host data may itself contain markup-significant characters; CDATA keeps
/// it from being read as structure. A literal `]]>` inside the value splits
/// the section so the output stays well formed.
pub(crate) fn push_cdata(out: &mut String, value: &str) {
    if value.is_empty() {
        return;
    }
    out.push_str("<![CDATA[");
    out.push_str(&value.replace("]]>", "]]]]><![CDATA[>"));
    out.push_str("]]>");
}

pub(crate) fn push_attr(out: &mut String, name: &str, value: &str) {
    let _ = write!(out, " {}='{}'", name, attr_escape(value));
}

/// One scalar value inside a parameter, return slot, or data structure.
///
/// The `key` becomes the element's `var` attribute and is the lookup key the
/// decoded reply surfaces the value under.
#[derive(Debug, Clone)]
pub struct Data {
    key: String,
    ty: HostType,
    value: String,
    opts: DataOpts,
}

/// Recognized `<data>` options and their defaults. Anything else the host
/// supports must go through [`crate::ops::RawXml`].
#[derive(Debug, Clone, Default)]
pub struct DataOpts {
    /// Dimension / occurs count.
    pub dim: Option<u32>,
    /// Varying-length character marker.
    pub varying: Option<Varying>,
    /// End do-until label.
    pub enddo: Option<String>,
    /// Set calculated-length label.
    pub setlen: Option<String>,
    /// Offset label.
    pub offset: Option<u32>,
    /// Next offset label.
    pub next: Option<String>,
    /// Hex character data.
    pub hex: bool,
    /// Trim returned character data.
    pub trim: Option<bool>,
}

impl Data {
    pub fn new(key: impl Into<String>, ty: HostType, value: impl Into<String>) -> Self {
        Data {
            key: key.into(),
            ty,
            value: value.into(),
            opts: DataOpts::default(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn host_type(&self) -> HostType {
        self.ty
    }

    pub fn dim(mut self, n: u32) -> Self {
        self.opts.dim = Some(n);
        self
    }

    pub fn varying(mut self, v: Varying) -> Self {
        self.opts.varying = Some(v);
        self
    }

    pub fn enddo(mut self, label: impl Into<String>) -> Self {
        self.opts.enddo = Some(label.into());
        self
    }

    pub fn setlen(mut self, label: impl Into<String>) -> Self {
        self.opts.setlen = Some(label.into());
        self
    }

    pub fn offset(mut self, n: u32) -> Self {
        self.opts.offset = Some(n);
        self
    }

    pub fn next(mut self, label: impl Into<String>) -> Self {
        self.opts.next = Some(label.into());
        self
    }

    pub fn hex(mut self) -> Self {
        self.opts.hex = true;
        self
    }

    pub fn trim(mut self, on: bool) -> Self {
        self.opts.trim = Some(on);
        self
    }

    pub(crate) fn write_xml(&self, out: &mut String) {
        out.push_str("<data");
        push_attr(out, "type", &self.ty.to_string());
        if let Some(dim) = self.opts.dim {
            push_attr(out, "dim", &dim.to_string());
        }
        if let Some(v) = self.opts.varying {
            push_attr(out, "varying", &v.to_string());
        }
        if let Some(label) = &self.opts.enddo {
            push_attr(out, "enddo", label);
        }
        if let Some(label) = &self.opts.setlen {
            push_attr(out, "setlen", label);
        }
        if let Some(n) = self.opts.offset {
            push_attr(out, "offset", &n.to_string());
        }
        if let Some(label) = &self.opts.next {
            push_attr(out, "next", label);
        }
        if self.opts.hex {
            push_attr(out, "hex", "on");
        }
        if let Some(on) = self.opts.trim {
            push_attr(out, "trim", if on { "on" } else { "off" });
        }
        push_attr(out, "var", &self.key);
        out.push('>');
        push_cdata(out, &self.value);
        out.push_str("</data>");
    }
}

/// A nested data structure: an ordered group of [`Data`] values and further
/// [`Ds`] structures.
#[derive(Debug, Clone)]
pub struct Ds {
    key: String,
    dim: Option<u32>,
    dou: Option<String>,
    len: Option<String>,
    children: Vec<PgmChild>,
}

impl Ds {
    pub fn new(key: impl Into<String>) -> Self {
        Ds {
            key: key.into(),
            dim: None,
            dou: None,
            len: None,
            children: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Dimension / occurs count.
    pub fn dim(mut self, n: u32) -> Self {
        self.dim = Some(n);
        self
    }

    /// Do-until label.
    pub fn dou(mut self, label: impl Into<String>) -> Self {
        self.dou = Some(label.into());
        self
    }

    /// Calculated-length label.
    pub fn len(mut self, label: impl Into<String>) -> Self {
        self.len = Some(label.into());
        self
    }

    /// Append a child value or nested structure, preserving order.
    pub fn data(mut self, child: impl Into<PgmChild>) -> Self {
        self.children.push(child.into());
        self
    }

    pub(crate) fn write_xml(&self, out: &mut String) {
        out.push_str("<ds");
        if let Some(dim) = self.dim {
            push_attr(out, "dim", &dim.to_string());
        }
        if let Some(label) = &self.dou {
            push_attr(out, "dou", label);
        }
        if let Some(label) = &self.len {
            push_attr(out, "len", label);
        }
        push_attr(out, "var", &self.key);
        out.push('>');
        for child in &self.children {
            child.write_xml(out);
        }
        out.push_str("</ds>");
    }
}

/// Either kind of node a parameter or return slot may hold.
#[derive(Debug, Clone)]
pub enum PgmChild {
    Data(Data),
    Ds(Ds),
}

impl PgmChild {
    pub(crate) fn write_xml(&self, out: &mut String) {
        match self {
            PgmChild::Data(d) => d.write_xml(out),
            PgmChild::Ds(ds) => ds.write_xml(out),
        }
    }
}

impl From<Data> for PgmChild {
    fn from(d: Data) -> Self {
        PgmChild::Data(d)
    }
}

impl From<Ds> for PgmChild {
    fn from(ds: Ds) -> Self {
        PgmChild::Ds(ds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xml_of_data(d: &Data) -> String {
        let mut s = String::new();
        d.write_xml(&mut s);
        s
    }

    #[test]
    fn data_basic() {
        let d = Data::new("INCHARA", HostType::char(1), "a");
        assert_eq!(
            xml_of_data(&d),
            "<data type='1a' var='INCHARA'><![CDATA[a]]></data>"
        );
    }

    #[test]
    fn data_empty_value_has_no_cdata() {
        let d = Data::new("OUT", HostType::char(10), "");
        assert_eq!(xml_of_data(&d), "<data type='10a' var='OUT'></data>");
    }

    #[test]
    fn data_options_in_declared_order() {
        let d = Data::new("V", HostType::char(8), "x")
            .dim(10)
            .varying(Varying::Two)
            .trim(false);
        assert_eq!(
            xml_of_data(&d),
            "<data type='8a' dim='10' varying='2' trim='off' var='V'><![CDATA[x]]></data>"
        );
    }

    #[test]
    fn cdata_survives_markup_in_value() {
        let d = Data::new("C", HostType::char(20), "<b>&raw</b>");
        assert_eq!(
            xml_of_data(&d),
            "<data type='20a' var='C'><![CDATA[<b>&raw</b>]]></data>"
        );
    }

    #[test]
    fn cdata_splits_terminator() {
        let mut s = String::new();
        push_cdata(&mut s, "a]]>b");
        assert_eq!(s, "<![CDATA[a]]]]><![CDATA[>b]]>");
    }

    #[test]
    fn ds_nests_in_insertion_order() {
        let ds = Ds::new("var5")
            .data(Data::new("d5var1", HostType::char(1), "a"))
            .data(Data::new("d5var3", HostType::packed(7, 4), "32.1234"));
        let mut s = String::new();
        ds.write_xml(&mut s);
        assert_eq!(
            s,
            "<ds var='var5'>\
             <data type='1a' var='d5var1'><![CDATA[a]]></data>\
             <data type='7p4' var='d5var3'><![CDATA[32.1234]]></data>\
             </ds>"
        );
    }

    #[test]
    fn ds_labels() {
        let ds = Ds::new("recs").dim(5).dou("eof").len("reclen");
        let mut s = String::new();
        ds.write_xml(&mut s);
        assert_eq!(s, "<ds dim='5' dou='eof' len='reclen' var='recs'></ds>");
    }

    #[test]
    fn attribute_values_are_escaped() {
        let d = Data::new("o'brien", HostType::char(4), "x");
        assert_eq!(
            xml_of_data(&d),
            "<data type='4a' var='o&apos;brien'><![CDATA[x]]></data>"
        );
    }
}
