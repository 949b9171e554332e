// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Atom (XML) payloads.
//!
//! Sets are `<feed>` elements, resources are `<entry>` elements and
//! navigation links are `<link>` elements whose content sits in `<m:inline>`.
//! The top-level element carries the XML declaration and the namespace
//! declarations; nested elements rely on them.

use std::io;

use serde_json::Value;

use super::{indent_line, FormatEmitter};
use crate::item::{
    MediaResource, NestedLinkItem, ODataError, OperationKind, Property, ResourceItem,
    ResourceSetItem,
};
use crate::operations::OperationGroup;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;
const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const DATA_NS: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices";
const METADATA_NS: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/metadata";
const SCHEME: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/scheme";
const RELATED: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/related/";

enum Frame {
    Feed { next_link: Option<String> },
    Entry,
    Link { inline: bool },
}

/// Emits Atom XML.
pub struct AtomEmitter {
    indent: bool,
    frames: Vec<Frame>,
}

impl AtomEmitter {
    /// An Atom emitter; `indent` puts each element on its own line.
    pub fn new(indent: bool) -> Self {
        Self {
            indent,
            frames: Vec::new(),
        }
    }

    fn line(&self, out: &mut Vec<u8>, level: usize) {
        indent_line(out, self.indent, level);
    }

    /// Prepares for a feed or entry element. Returns true at the payload root.
    fn open_content(&mut self, out: &mut Vec<u8>) -> bool {
        let level = self.frames.len();
        match self.frames.last_mut() {
            None => {
                out.extend_from_slice(XML_DECLARATION.as_bytes());
                true
            }
            Some(Frame::Link { inline }) if !*inline => {
                *inline = true;
                indent_line(out, self.indent, level);
                out.extend_from_slice(b"<m:inline>");
                false
            }
            Some(_) => false,
        }
    }

    fn level(&self) -> usize {
        // Inline content sits one level deeper than its link.
        let inline = matches!(self.frames.last(), Some(Frame::Link { inline: true }));
        self.frames.len() + usize::from(inline)
    }

    fn text_element(&self, out: &mut Vec<u8>, level: usize, tag: &str, text: &str) {
        self.line(out, level);
        out.push(b'<');
        out.extend_from_slice(tag.as_bytes());
        out.push(b'>');
        escape_into(out, text);
        out.extend_from_slice(b"</");
        out.extend_from_slice(tag.as_bytes());
        out.push(b'>');
    }

    fn operation(&self, out: &mut Vec<u8>, level: usize, group: &OperationGroup<'_>) {
        for op in &group.operations {
            self.line(out, level);
            out.extend_from_slice(match op.kind {
                OperationKind::Action => b"<m:action".as_slice(),
                OperationKind::Function => b"<m:function".as_slice(),
            });
            attr(out, "metadata", &op.metadata);
            if let Some(title) = &op.title {
                attr(out, "title", title);
            }
            attr(out, "target", &op.target);
            out.extend_from_slice(b"/>");
        }
    }

    fn media(&self, out: &mut Vec<u8>, level: usize, media: &MediaResource) {
        if let Some(edit) = &media.edit_link {
            self.line(out, level);
            out.extend_from_slice(b"<link rel=\"edit-media\"");
            attr(out, "href", edit);
            if let Some(etag) = &media.etag {
                attr(out, "m:etag", etag);
            }
            out.extend_from_slice(b"/>");
        }
    }

    fn properties(&self, out: &mut Vec<u8>, level: usize, properties: &[Property]) {
        self.line(out, level);
        out.extend_from_slice(b"<m:properties>");
        for property in properties {
            self.line(out, level + 1);
            out.extend_from_slice(b"<d:");
            out.extend_from_slice(property.name.as_bytes());
            let text = match &property.value {
                Value::Null => {
                    out.extend_from_slice(b" m:null=\"true\"/>");
                    continue;
                }
                Value::String(s) => s.clone(),
                Value::Bool(b) => {
                    attr(out, "m:type", "Edm.Boolean");
                    b.to_string()
                }
                Value::Number(n) => {
                    let edm = if n.is_f64() { "Edm.Double" } else { "Edm.Int64" };
                    attr(out, "m:type", edm);
                    n.to_string()
                }
                other => other.to_string(),
            };
            out.push(b'>');
            escape_into(out, &text);
            out.extend_from_slice(b"</d:");
            out.extend_from_slice(property.name.as_bytes());
            out.push(b'>');
        }
        self.line(out, level);
        out.extend_from_slice(b"</m:properties>");
    }
}

impl FormatEmitter for AtomEmitter {
    fn start_resource_set(&mut self, out: &mut Vec<u8>, set: &ResourceSetItem) -> io::Result<()> {
        let root = self.open_content(out);
        self.line(out, self.level());
        out.extend_from_slice(b"<feed");
        if root {
            namespaces(out);
        }
        out.push(b'>');
        self.frames.push(Frame::Feed {
            next_link: set.next_link.clone(),
        });
        let level = self.level();
        if let Some(id) = &set.id {
            self.text_element(out, level, "id", id);
        }
        if let Some(count) = set.count {
            self.text_element(out, level, "m:count", &count.to_string());
        }
        Ok(())
    }

    fn end_resource_set(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        let level = self.level();
        if let Some(Frame::Feed {
            next_link: Some(next),
        }) = self.frames.pop()
        {
            self.line(out, level);
            out.extend_from_slice(b"<link rel=\"next\"");
            attr(out, "href", &next);
            out.extend_from_slice(b"/>");
        }
        self.line(out, self.level());
        out.extend_from_slice(b"</feed>");
        Ok(())
    }

    fn start_resource(
        &mut self,
        out: &mut Vec<u8>,
        resource: &ResourceItem,
        operations: &[OperationGroup<'_>],
    ) -> io::Result<()> {
        let root = self.open_content(out);
        self.line(out, self.level());
        out.extend_from_slice(b"<entry");
        if root {
            namespaces(out);
        }
        out.push(b'>');
        self.frames.push(Frame::Entry);
        let level = self.level();

        if let Some(id) = &resource.id {
            self.text_element(out, level, "id", id);
        }
        if let Some(type_name) = &resource.type_name {
            self.line(out, level);
            out.extend_from_slice(b"<category");
            attr(out, "term", type_name);
            attr(out, "scheme", SCHEME);
            out.extend_from_slice(b"/>");
        }
        if let Some(edit) = &resource.edit_link {
            self.line(out, level);
            out.extend_from_slice(b"<link rel=\"edit\"");
            attr(out, "href", edit);
            out.extend_from_slice(b"/>");
        }
        let media = resource.media_resource.as_ref().filter(|m| !m.is_empty());
        if let Some(media) = media {
            self.media(out, level, media);
        }
        for group in operations {
            self.operation(out, level, group);
        }

        self.line(out, level);
        match media {
            Some(media) => {
                out.extend_from_slice(b"<content");
                if let Some(content_type) = &media.content_type {
                    attr(out, "type", content_type);
                }
                if let Some(read) = &media.read_link {
                    attr(out, "src", read);
                }
                out.extend_from_slice(b"/>");
                if !resource.properties.is_empty() {
                    self.properties(out, level, &resource.properties);
                }
            }
            None if resource.properties.is_empty() => {
                out.extend_from_slice(b"<content type=\"application/xml\"/>");
            }
            None => {
                out.extend_from_slice(b"<content type=\"application/xml\">");
                self.properties(out, level + 1, &resource.properties);
                self.line(out, level);
                out.extend_from_slice(b"</content>");
            }
        }
        Ok(())
    }

    fn end_resource(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        self.frames.pop();
        self.line(out, self.level());
        out.extend_from_slice(b"</entry>");
        Ok(())
    }

    fn start_nested_link(&mut self, out: &mut Vec<u8>, link: &NestedLinkItem) -> io::Result<()> {
        self.line(out, self.level());
        out.extend_from_slice(b"<link");
        attr(out, "rel", &format!("{RELATED}{}", link.name));
        let media_type = if link.is_collection {
            "application/atom+xml;type=feed"
        } else {
            "application/atom+xml;type=entry"
        };
        attr(out, "type", media_type);
        attr(out, "title", &link.name);
        if !link.url.is_empty() {
            attr(out, "href", &link.url);
        }
        out.push(b'>');
        self.frames.push(Frame::Link { inline: false });
        Ok(())
    }

    fn end_nested_link(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        if let Some(Frame::Link { inline: true }) = self.frames.pop() {
            self.line(out, self.level() + 1);
            out.extend_from_slice(b"</m:inline>");
            self.line(out, self.level());
        }
        out.extend_from_slice(b"</link>");
        Ok(())
    }

    fn write_error(&mut self, out: &mut Vec<u8>, error: &ODataError) -> io::Result<()> {
        if self.frames.is_empty() {
            out.extend_from_slice(XML_DECLARATION.as_bytes());
        }
        let level = self.level();
        self.line(out, level);
        out.extend_from_slice(b"<m:error");
        attr(out, "xmlns:m", METADATA_NS);
        out.push(b'>');
        self.text_element(out, level + 1, "m:code", &error.code);
        self.line(out, level + 1);
        out.extend_from_slice(b"<m:message xml:lang=\"en-US\">");
        escape_into(out, &error.message);
        out.extend_from_slice(b"</m:message>");
        if let Some(inner) = &error.inner_error {
            self.line(out, level + 1);
            out.extend_from_slice(b"<m:innererror>");
            self.text_element(out, level + 2, "m:message", inner);
            self.line(out, level + 1);
            out.extend_from_slice(b"</m:innererror>");
        }
        self.line(out, level);
        out.extend_from_slice(b"</m:error>");
        Ok(())
    }
}

fn namespaces(out: &mut Vec<u8>) {
    attr(out, "xmlns", ATOM_NS);
    attr(out, "xmlns:d", DATA_NS);
    attr(out, "xmlns:m", METADATA_NS);
}

fn attr(out: &mut Vec<u8>, name: &str, value: &str) {
    out.push(b' ');
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b"=\"");
    escape_into(out, value);
    out.push(b'"');
}

/// Escapes the five XML special characters.
fn escape_into(out: &mut Vec<u8>, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.extend_from_slice(b"&amp;"),
            '<' => out.extend_from_slice(b"&lt;"),
            '>' => out.extend_from_slice(b"&gt;"),
            '"' => out.extend_from_slice(b"&quot;"),
            '\'' => out.extend_from_slice(b"&apos;"),
            _ => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::item::Operation;
    use crate::operations::group_operations;

    fn text(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn entry_with_media_and_action() {
        let item = ResourceItem::new("http://odata.org/e(1)")
            .with_edit_link("http://odata.org/e(1)/edit")
            .with_media_resource(MediaResource {
                read_link: Some("http://odata.org/read".into()),
                edit_link: Some("http://odata.org/edit".into()),
                content_type: Some("image/jpeg".into()),
                etag: Some("W/\"1\"".into()),
            })
            .with_action(
                Operation::action("#action", "http://odata.org/defaultActionTarget")
                    .with_title("Default Action"),
            )
            .with_property(Property::new("Name", "a<b"));
        let groups = group_operations(item.operations());
        let mut emitter = AtomEmitter::new(false);
        let mut out = Vec::new();
        emitter.start_resource(&mut out, &item, &groups).unwrap();
        emitter.end_resource(&mut out).unwrap();
        let xml = text(out);
        assert!(xml.starts_with(XML_DECLARATION));
        assert!(xml.contains(r#"<entry xmlns="http://www.w3.org/2005/Atom""#));
        assert!(xml.contains("<id>http://odata.org/e(1)</id>"));
        assert!(xml.contains(
            r#"<link rel="edit-media" href="http://odata.org/edit" m:etag="W/&quot;1&quot;"/>"#
        ));
        assert!(xml.contains(
            r##"<m:action metadata="#action" title="Default Action" target="http://odata.org/defaultActionTarget"/>"##
        ));
        assert!(xml.contains(r#"<content type="image/jpeg" src="http://odata.org/read"/>"#));
        assert!(xml.contains("<d:Name>a&lt;b</d:Name>"));
        assert!(xml.ends_with("</entry>"));
    }

    #[test]
    fn empty_media_resource_writes_plain_content() {
        let item = ResourceItem::new("e").with_media_resource(MediaResource::default());
        let mut emitter = AtomEmitter::new(false);
        let mut out = Vec::new();
        emitter.start_resource(&mut out, &item, &[]).unwrap();
        emitter.end_resource(&mut out).unwrap();
        let xml = text(out);
        assert!(!xml.contains("edit-media"));
        assert!(!xml.contains("src="));
        assert!(xml.contains(r#"<content type="application/xml"/>"#));
    }

    #[test]
    fn link_content_is_inline() {
        let mut emitter = AtomEmitter::new(false);
        let mut out = Vec::new();
        emitter
            .start_resource(&mut out, &ResourceItem::new("a"), &[])
            .unwrap();
        emitter
            .start_nested_link(&mut out, &NestedLinkItem::new("Orders", "http://o", true))
            .unwrap();
        emitter
            .start_resource_set(&mut out, &ResourceSetItem::default())
            .unwrap();
        emitter.end_resource_set(&mut out).unwrap();
        emitter.end_nested_link(&mut out).unwrap();
        emitter.end_resource(&mut out).unwrap();
        let xml = text(out);
        assert!(xml.contains(
            r#"<link rel="http://schemas.microsoft.com/ado/2007/08/dataservices/related/Orders" type="application/atom+xml;type=feed" title="Orders" href="http://o"><m:inline><feed></feed></m:inline></link>"#
        ));
        assert_eq!(xml.matches("xmlns=").count(), 1);
    }

    #[test]
    fn null_property_is_flagged() {
        let item = ResourceItem::new("e").with_property(Property::new("Gone", Value::Null));
        let mut emitter = AtomEmitter::new(false);
        let mut out = Vec::new();
        emitter.start_resource(&mut out, &item, &[]).unwrap();
        assert!(text(out).contains(r#"<d:Gone m:null="true"/>"#));
    }

    #[test]
    fn error_element() {
        let mut emitter = AtomEmitter::new(false);
        let mut out = Vec::new();
        emitter
            .write_error(&mut out, &ODataError::new("Bad", "x & y"))
            .unwrap();
        let xml = text(out);
        assert!(xml.contains("<m:code>Bad</m:code>"));
        assert!(xml.contains(r#"<m:message xml:lang="en-US">x &amp; y</m:message>"#));
    }
}
