//! # XML Element Tree
//!
//! An owned, ordered element tree with a compact writer and a small
//! well-formedness reader. Finalized manifests, event requests, processed
//! envelopes and authority responses all pass through [`Element`].
//!
//! ## Scope
//!
//! - Elements hold either text or child elements, never mixed content.
//! - Lookups compare **local names**, so `soap:Body` and `Body` match the
//!   same step. Authority responses arrive wrapped in prefixed envelopes.
//! - The reader skips declarations, comments, processing instructions and
//!   `DOCTYPE`, expands the five predefined entities plus numeric character
//!   references, and accepts CDATA sections as text.
//! - The writer emits no whitespace between elements. Its output is the
//!   byte sequence that digests are computed over.

use serde::{Deserialize, Serialize};

use crate::error::XmlError;

/// A single XML element.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Element {
    /// Qualified name as written (may carry a prefix).
    pub name: String,
    /// Attributes in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,
    /// Text content of a leaf element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Child elements in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

/// Strip a namespace prefix from a qualified name.
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

impl Element {
    /// An empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A leaf element with text content.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Builder-style attribute setter.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Builder-style child append.
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Builder-style leaf append.
    pub fn leaf(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.child(Element::with_text(name, text))
    }

    /// Append a leaf only when `text` is present and non-blank.
    pub fn leaf_opt(self, name: impl Into<String>, text: Option<&str>) -> Self {
        match text.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => self.leaf(name, t),
            None => self,
        }
    }

    /// Local part of the element name.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Attribute value by name.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set or replace an attribute, keeping its position if it exists.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Text content, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// First direct child with the given local name.
    pub fn first_child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.local_name() == name)
    }

    /// Mutable variant of [`Element::first_child`].
    pub fn first_child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.local_name() == name)
    }

    /// All direct children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.local_name() == name)
    }

    /// Follow a path of local names through first matching children.
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter()
            .try_fold(self, |node, step| node.first_child(step))
    }

    /// Mutable variant of [`Element::find`].
    pub fn find_mut(&mut self, path: &[&str]) -> Option<&mut Element> {
        let mut node = self;
        for step in path {
            node = node.first_child_mut(step)?;
        }
        Some(node)
    }

    /// Text at the end of a path.
    pub fn find_text(&self, path: &[&str]) -> Option<&str> {
        self.find(path).and_then(Element::text)
    }

    /// Replace the text at the end of a path. Returns `false` when the path
    /// does not exist.
    pub fn set_text_at(&mut self, path: &[&str], text: impl Into<String>) -> bool {
        match self.find_mut(path) {
            Some(node) => {
                node.text = Some(text.into());
                true
            }
            None => false,
        }
    }

    /// Every element (depth-first, pre-order, including `self`) whose local
    /// name matches.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        if self.local_name() == name {
            found.push(self);
        }
        for child in &self.children {
            child.collect_named(name, found);
        }
    }

    /// First element anywhere in the tree with the given local name.
    pub fn descendant(&self, name: &str) -> Option<&Element> {
        if self.local_name() == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.descendant(name))
    }

    // ─── Writing ─────────────────────────────────────────────────────

    /// Serialize without an XML declaration.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }

    /// Serialize with a leading `<?xml version="1.0" encoding="UTF-8"?>`.
    pub fn to_document(&self) -> String {
        let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            escape_into(value, true, out);
            out.push('"');
        }
        let text = self.text.as_deref().unwrap_or("");
        if self.children.is_empty() && text.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        escape_into(text, false, out);
        for child in &self.children {
            child.write_into(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    // ─── Reading ─────────────────────────────────────────────────────

    /// Parse a well-formed XML document into its root element.
    pub fn parse(input: &str) -> Result<Element, XmlError> {
        let mut reader = Reader {
            src: input.trim_start_matches('\u{feff}'),
            pos: 0,
            depth: 1,
        };
        reader.skip_misc()?;
        let root = reader.element()?;
        reader.skip_misc()?;
        if !reader.rest().is_empty() {
            return Err(reader.malformed("content after the root element"));
        }
        Ok(root)
    }
}

fn escape_into(raw: &str, attribute: bool, out: &mut String) {
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

fn unescape(raw: &str) -> Result<String, XmlError> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| XmlError::UnknownEntity(after.chars().take(8).collect()))?;
        let entity = &after[..semi];
        let decoded = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => decode_numeric(entity).ok_or_else(|| XmlError::UnknownEntity(entity.to_string()))?,
        };
        out.push(decoded);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn decode_numeric(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}

/// Deepest element nesting [`Element::parse`] accepts, root included.
pub const MAX_DEPTH: usize = 256;

struct Reader<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn malformed(&self, reason: &str) -> XmlError {
        XmlError::Malformed {
            position: self.pos,
            reason: reason.to_string(),
        }
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn expect(&mut self, token: &str) -> Result<(), XmlError> {
        if self.rest().is_empty() {
            return Err(XmlError::UnexpectedEof { position: self.pos });
        }
        if !self.starts_with(token) {
            return Err(self.malformed(&format!("expected {token:?}")));
        }
        self.pos += token.len();
        Ok(())
    }

    /// Advance past `end`, returning what came before it.
    fn take_until(&mut self, end: &str) -> Result<&'a str, XmlError> {
        let rest = self.rest();
        let idx = rest
            .find(end)
            .ok_or(XmlError::UnexpectedEof { position: self.src.len() })?;
        self.pos += idx + end.len();
        Ok(&rest[..idx])
    }

    fn skip_misc(&mut self) -> Result<(), XmlError> {
        loop {
            self.skip_ws();
            if self.starts_with("<?") {
                self.take_until("?>")?;
            } else if self.starts_with("<!--") {
                self.take_until("-->")?;
            } else if self.starts_with("<!DOCTYPE") {
                self.take_until(">")?;
            } else {
                return Ok(());
            }
        }
    }

    fn name(&mut self) -> Result<&'a str, XmlError> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '/' | '>' | '=' | '<'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.malformed("expected a name"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn element(&mut self) -> Result<Element, XmlError> {
        self.expect("<")?;
        let mut element = Element::new(self.name()?);

        loop {
            self.skip_ws();
            if self.starts_with("/>") {
                self.pos += 2;
                return Ok(element);
            }
            if self.starts_with(">") {
                self.pos += 1;
                break;
            }
            let key = self.name()?;
            self.skip_ws();
            self.expect("=")?;
            self.skip_ws();
            let quote = match self.rest().chars().next() {
                Some(q @ ('"' | '\'')) => q,
                Some(_) => return Err(self.malformed("expected a quoted attribute value")),
                None => return Err(XmlError::UnexpectedEof { position: self.pos }),
            };
            self.pos += 1;
            let raw = self.take_until(if quote == '"' { "\"" } else { "'" })?;
            element.attributes.push((key.to_string(), unescape(raw)?));
        }

        let mut text = String::new();
        loop {
            if self.rest().is_empty() {
                return Err(XmlError::UnexpectedEof { position: self.pos });
            }
            if self.starts_with("</") {
                self.pos += 2;
                let close = self.name()?;
                if close != element.name {
                    return Err(XmlError::MismatchedTag {
                        expected: element.name.clone(),
                        found: close.to_string(),
                    });
                }
                self.skip_ws();
                self.expect(">")?;
                break;
            } else if self.starts_with("<!--") {
                self.take_until("-->")?;
            } else if self.starts_with("<![CDATA[") {
                self.pos += "<![CDATA[".len();
                text.push_str(self.take_until("]]>")?);
            } else if self.starts_with("<?") {
                self.take_until("?>")?;
            } else if self.starts_with("<") {
                if self.depth >= MAX_DEPTH {
                    return Err(self.malformed("elements nested too deeply"));
                }
                self.depth += 1;
                let child = self.element()?;
                self.depth -= 1;
                element.children.push(child);
            } else {
                let rest = self.rest();
                let end = rest.find('<').unwrap_or(rest.len());
                text.push_str(&unescape(&rest[..end])?);
                self.pos += end;
            }
        }

        if element.children.is_empty() && !text.trim().is_empty() {
            element.text = Some(text);
        }
        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        Element::new("retConsReciMDFe")
            .attr("versao", "3.00")
            .leaf("cStat", "104")
            .child(
                Element::new("protMDFe").child(
                    Element::new("infProt")
                        .leaf("chMDFe", "41140581452880000139580010000000281611743166")
                        .leaf("cStat", "100"),
                ),
            )
    }

    // ── writer ──

    #[test]
    fn test_write_compact() {
        let xml = Element::new("a").attr("x", "1").leaf("b", "2").child(Element::new("c")).to_xml();
        assert_eq!(xml, r#"<a x="1"><b>2</b><c/></a>"#);
    }

    #[test]
    fn test_write_escapes_text_and_attributes() {
        let xml = Element::with_text("x", "a < b & c").attr("q", "\"hi\"").to_xml();
        assert_eq!(xml, r#"<x q="&quot;hi&quot;">a &lt; b &amp; c</x>"#);
    }

    #[test]
    fn test_leaf_opt_skips_blank() {
        let el = Element::new("a").leaf_opt("b", Some("  ")).leaf_opt("c", None).leaf_opt("d", Some("v"));
        assert_eq!(el.to_xml(), "<a><d>v</d></a>");
    }

    // ── reader ──

    #[test]
    fn test_parse_reads_back_written_tree() {
        let el = sample();
        let parsed = Element::parse(&el.to_document()).unwrap();
        assert_eq!(parsed, el);
    }

    #[test]
    fn test_parse_prefixed_envelope() {
        let xml = r#"<?xml version="1.0"?>
            <soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope">
              <soap:Body>
                <!-- comment -->
                <retEventoMDFe versao='3.00'>
                  <infEvento><cStat>135</cStat><xMotivo>Evento registrado &amp; vinculado</xMotivo></infEvento>
                </retEventoMDFe>
              </soap:Body>
            </soap:Envelope>"#;
        let root = Element::parse(xml).unwrap();
        assert_eq!(root.local_name(), "Envelope");
        let inf = root.find(&["Body", "retEventoMDFe", "infEvento"]).unwrap();
        assert_eq!(inf.find_text(&["cStat"]), Some("135"));
        assert_eq!(inf.find_text(&["xMotivo"]), Some("Evento registrado & vinculado"));
    }

    #[test]
    fn test_parse_cdata_and_numeric_entities() {
        let root = Element::parse("<a><![CDATA[x<y]]>&#65;&#x42;</a>").unwrap();
        assert_eq!(root.text(), Some("x<yAB"));
    }

    #[test]
    fn test_parse_mismatched_tag() {
        let err = Element::parse("<a><b></a>").unwrap_err();
        assert!(matches!(err, XmlError::MismatchedTag { .. }));
    }

    #[test]
    fn test_parse_truncated_input() {
        assert!(matches!(
            Element::parse("<a><b>1</b>").unwrap_err(),
            XmlError::UnexpectedEof { .. }
        ));
    }

    #[test]
    fn test_parse_unknown_entity() {
        assert!(matches!(
            Element::parse("<a>&nbsp;</a>").unwrap_err(),
            XmlError::UnknownEntity(_)
        ));
    }

    #[test]
    fn test_parse_trailing_garbage() {
        assert!(Element::parse("<a/><b/>").is_err());
    }

    fn nested(depth: usize) -> String {
        "<a>".repeat(depth) + &"</a>".repeat(depth)
    }

    #[test]
    fn test_parse_depth_limit() {
        assert!(Element::parse(&nested(MAX_DEPTH)).is_ok());
        assert!(matches!(
            Element::parse(&nested(MAX_DEPTH + 1)).unwrap_err(),
            XmlError::Malformed { .. }
        ));
    }

    #[test]
    fn test_parse_hostile_nesting_is_an_error() {
        assert!(matches!(
            Element::parse(&nested(200_000)).unwrap_err(),
            XmlError::Malformed { .. }
        ));
    }

    // ── lookups ──

    #[test]
    fn test_descendants_named() {
        let el = sample();
        let stats = el.descendants_named("cStat");
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[1].text(), Some("100"));
    }

    #[test]
    fn test_set_text_at() {
        let mut el = sample();
        assert!(el.set_text_at(&["protMDFe", "infProt", "cStat"], "101"));
        assert_eq!(el.find_text(&["protMDFe", "infProt", "cStat"]), Some("101"));
        assert!(!el.set_text_at(&["missing"], "x"));
    }

    #[test]
    fn test_set_attribute_replaces_in_place() {
        let mut el = Element::new("a").attr("x", "1").attr("y", "2");
        el.set_attribute("x", "3");
        assert_eq!(el.attributes, vec![("x".into(), "3".into()), ("y".into(), "2".into())]);
    }
}
