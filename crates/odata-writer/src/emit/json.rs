// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON payloads in the `odata.*` annotation style.
//!
//! A top-level set is wrapped: `{"odata.count":"2","value":[...],"odata.nextLink":"..."}`.
//! A resource is an object whose members come in a fixed order: identity and
//! links, media resource, operation groups keyed by relation, then properties.
//! A navigation link adds `"Name@odata.navigationLinkUrl"` and, once content
//! is written, a `"Name"` member holding it.

use std::io;

use serde::Serialize;

use super::{indent_line, FormatEmitter};
use crate::item::{NestedLinkItem, ODataError, ResourceItem, ResourceSetItem};
use crate::operations::OperationGroup;

enum Frame {
    Object {
        members: usize,
    },
    Array {
        items: usize,
        next_link: Option<String>,
        /// Top-level sets sit inside a `{"value": ...}` wrapper object.
        wrapped: bool,
    },
    Link {
        name: String,
    },
}

/// Emits JSON.
pub struct JsonEmitter {
    indent: bool,
    frames: Vec<Frame>,
}

impl JsonEmitter {
    /// A JSON emitter; `indent` adds newlines and two-space indentation.
    pub fn new(indent: bool) -> Self {
        Self {
            indent,
            frames: Vec::new(),
        }
    }

    /// Indentation level of a member of the frame at `at`.
    fn level_of(&self, at: usize) -> usize {
        self.frames
            .iter()
            .take(at + 1)
            .filter(|frame| !matches!(frame, Frame::Link { .. }))
            .count()
    }

    fn level(&self) -> usize {
        self.level_of(self.frames.len().saturating_sub(1))
    }

    /// Writes `"key":` as the next member of the object frame at `at`.
    fn key(&mut self, out: &mut Vec<u8>, at: usize, key: &str) -> io::Result<()> {
        let level = self.level_of(at);
        if let Some(Frame::Object { members }) = self.frames.get_mut(at) {
            if *members > 0 {
                out.push(b',');
            }
            *members += 1;
        }
        indent_line(out, self.indent, level);
        serde_json::to_writer(&mut *out, key)?;
        out.push(b':');
        if self.indent {
            out.push(b' ');
        }
        Ok(())
    }

    fn member<T>(&mut self, out: &mut Vec<u8>, key: &str, value: &T) -> io::Result<()>
    where
        T: Serialize + ?Sized,
    {
        let at = self.frames.len().saturating_sub(1);
        self.key(out, at, key)?;
        serde_json::to_writer(&mut *out, value)?;
        Ok(())
    }

    /// Positions the output for a new object or array value: an array item,
    /// the content member of an open link, or the payload root.
    fn open_value(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        let level = self.level();
        let link_name = match self.frames.last_mut() {
            Some(Frame::Array { items, .. }) => {
                if *items > 0 {
                    out.push(b',');
                }
                *items += 1;
                indent_line(out, self.indent, level);
                None
            }
            Some(Frame::Link { name }) => Some(name.clone()),
            Some(Frame::Object { .. }) | None => None,
        };
        if let Some(name) = link_name {
            let at = self.frames.len().saturating_sub(2);
            self.key(out, at, &name)?;
        }
        Ok(())
    }

    fn close_object(&mut self, out: &mut Vec<u8>) {
        let filled = matches!(self.frames.pop(), Some(Frame::Object { members }) if members > 0);
        if filled {
            indent_line(out, self.indent, self.level());
        }
        out.push(b'}');
    }
}

impl FormatEmitter for JsonEmitter {
    fn start_resource_set(&mut self, out: &mut Vec<u8>, set: &ResourceSetItem) -> io::Result<()> {
        let wrapped = self.frames.is_empty();
        if wrapped {
            out.push(b'{');
            self.frames.push(Frame::Object { members: 0 });
            if let Some(count) = set.count {
                self.member(out, "odata.count", &count.to_string())?;
            }
            self.key(out, 0, "value")?;
        } else {
            self.open_value(out)?;
        }
        out.push(b'[');
        self.frames.push(Frame::Array {
            items: 0,
            next_link: set.next_link.clone(),
            wrapped,
        });
        Ok(())
    }

    fn end_resource_set(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        let Some(Frame::Array {
            items,
            next_link,
            wrapped,
        }) = self.frames.pop()
        else {
            return Ok(());
        };
        if items > 0 {
            indent_line(out, self.indent, self.level());
        }
        out.push(b']');
        let Some(next) = next_link else {
            if wrapped {
                self.close_object(out);
            }
            return Ok(());
        };
        if wrapped {
            self.member(out, "odata.nextLink", &next)?;
            self.close_object(out);
        } else {
            let key = match self.frames.last() {
                Some(Frame::Link { name }) => format!("{name}@odata.nextLink"),
                _ => return Ok(()),
            };
            let at = self.frames.len().saturating_sub(2);
            self.key(out, at, &key)?;
            serde_json::to_writer(&mut *out, &next)?;
        }
        Ok(())
    }

    fn start_resource(
        &mut self,
        out: &mut Vec<u8>,
        resource: &ResourceItem,
        operations: &[OperationGroup<'_>],
    ) -> io::Result<()> {
        self.open_value(out)?;
        out.push(b'{');
        self.frames.push(Frame::Object { members: 0 });

        let header = [
            ("odata.id", &resource.id),
            ("odata.type", &resource.type_name),
            ("odata.editLink", &resource.edit_link),
        ];
        for (key, value) in header {
            if let Some(value) = value {
                self.member(out, key, value)?;
            }
        }
        if let Some(media) = &resource.media_resource {
            let fields = [
                ("odata.mediaReadLink", &media.read_link),
                ("odata.mediaEditLink", &media.edit_link),
                ("odata.mediaContentType", &media.content_type),
                ("odata.mediaETag", &media.etag),
            ];
            for (key, value) in fields {
                if let Some(value) = value {
                    self.member(out, key, value)?;
                }
            }
        }
        for group in operations {
            self.member(out, group.relation, group)?;
        }
        for property in &resource.properties {
            self.member(out, &property.name, &property.value)?;
        }
        Ok(())
    }

    fn end_resource(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        self.close_object(out);
        Ok(())
    }

    fn start_nested_link(&mut self, out: &mut Vec<u8>, link: &NestedLinkItem) -> io::Result<()> {
        if !link.url.is_empty() {
            let key = format!("{}@odata.navigationLinkUrl", link.name);
            self.member(out, &key, &link.url)?;
        }
        self.frames.push(Frame::Link {
            name: link.name.clone(),
        });
        Ok(())
    }

    fn end_nested_link(&mut self, _out: &mut Vec<u8>) -> io::Result<()> {
        self.frames.pop();
        Ok(())
    }

    fn write_error(&mut self, out: &mut Vec<u8>, error: &ODataError) -> io::Result<()> {
        let envelope = ErrorEnvelope {
            error: ErrorBody {
                code: &error.code,
                message: &error.message,
                target: error.target.as_deref(),
                inner_error: error
                    .inner_error
                    .as_deref()
                    .map(|message| InnerError { message }),
            },
        };
        if !self.frames.is_empty() {
            indent_line(out, self.indent, 0);
        }
        if self.indent {
            serde_json::to_writer_pretty(&mut *out, &envelope)?;
        } else {
            serde_json::to_writer(&mut *out, &envelope)?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    #[serde(rename = "odata.error")]
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a str>,
    #[serde(rename = "innererror", skip_serializing_if = "Option::is_none")]
    inner_error: Option<InnerError<'a>>,
}

#[derive(Serialize)]
struct InnerError<'a> {
    message: &'a str,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::item::{MediaResource, Operation, Property};
    use crate::operations::group_operations;

    fn resource(emitter: &mut JsonEmitter, out: &mut Vec<u8>, item: &ResourceItem) {
        let groups = group_operations(item.operations());
        emitter.start_resource(out, item, &groups).unwrap();
    }

    fn text(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn default_action_is_keyed_by_relation() {
        let item = ResourceItem::new("http://odata.org/e(1)").with_action(
            Operation::action("#action", "http://odata.org/defaultActionTarget")
                .with_title("Default Action"),
        );
        let mut emitter = JsonEmitter::new(false);
        let mut out = Vec::new();
        resource(&mut emitter, &mut out, &item);
        emitter.end_resource(&mut out).unwrap();
        assert_eq!(
            text(out),
            r##"{"odata.id":"http://odata.org/e(1)","#action":{"title":"Default Action","target":"http://odata.org/defaultActionTarget"}}"##
        );
    }

    #[test]
    fn top_level_set_is_wrapped() {
        let set = ResourceSetItem {
            id: None,
            count: Some(2),
            next_link: Some("http://odata.org/next".into()),
        };
        let mut emitter = JsonEmitter::new(false);
        let mut out = Vec::new();
        emitter.start_resource_set(&mut out, &set).unwrap();
        resource(
            &mut emitter,
            &mut out,
            &ResourceItem::new("a").with_property(Property::new("Name", "x")),
        );
        emitter.end_resource(&mut out).unwrap();
        resource(
            &mut emitter,
            &mut out,
            &ResourceItem::new("b").with_property(Property::new("Name", serde_json::Value::Null)),
        );
        emitter.end_resource(&mut out).unwrap();
        emitter.end_resource_set(&mut out).unwrap();
        assert_eq!(
            text(out),
            r#"{"odata.count":"2","value":[{"odata.id":"a","Name":"x"},{"odata.id":"b","Name":null}],"odata.nextLink":"http://odata.org/next"}"#
        );
    }

    #[test]
    fn empty_top_level_set() {
        let mut emitter = JsonEmitter::new(false);
        let mut out = Vec::new();
        emitter
            .start_resource_set(&mut out, &ResourceSetItem::default())
            .unwrap();
        emitter.end_resource_set(&mut out).unwrap();
        assert_eq!(text(out), r#"{"value":[]}"#);
    }

    #[test]
    fn nested_link_content_follows_url() {
        let mut emitter = JsonEmitter::new(false);
        let mut out = Vec::new();
        resource(&mut emitter, &mut out, &ResourceItem::new("a"));
        emitter
            .start_nested_link(&mut out, &NestedLinkItem::new("Orders", "http://o", true))
            .unwrap();
        emitter
            .start_resource_set(&mut out, &ResourceSetItem::default())
            .unwrap();
        resource(&mut emitter, &mut out, &ResourceItem::new("o1"));
        emitter.end_resource(&mut out).unwrap();
        emitter.end_resource_set(&mut out).unwrap();
        emitter.end_nested_link(&mut out).unwrap();
        emitter
            .start_nested_link(&mut out, &NestedLinkItem::new("Customer", "http://c", false))
            .unwrap();
        emitter.end_nested_link(&mut out).unwrap();
        emitter.end_resource(&mut out).unwrap();
        assert_eq!(
            text(out),
            r#"{"odata.id":"a","Orders@odata.navigationLinkUrl":"http://o","Orders":[{"odata.id":"o1"}],"Customer@odata.navigationLinkUrl":"http://c"}"#
        );
    }

    #[test]
    fn media_fields_in_fixed_order() {
        let item = ResourceItem::new("m").with_media_resource(MediaResource {
            read_link: Some("http://r".into()),
            edit_link: Some("http://e".into()),
            content_type: Some("image/png".into()),
            etag: Some("1".into()),
        });
        let mut emitter = JsonEmitter::new(false);
        let mut out = Vec::new();
        resource(&mut emitter, &mut out, &item);
        emitter.end_resource(&mut out).unwrap();
        assert_eq!(
            text(out),
            r#"{"odata.id":"m","odata.mediaReadLink":"http://r","odata.mediaEditLink":"http://e","odata.mediaContentType":"image/png","odata.mediaETag":"1"}"#
        );
    }

    #[test]
    fn indent_only_adds_whitespace() {
        let item = ResourceItem::new("a").with_property(Property::new("Rank", 1));
        let mut emitter = JsonEmitter::new(true);
        let mut out = Vec::new();
        resource(&mut emitter, &mut out, &item);
        emitter.end_resource(&mut out).unwrap();
        assert_eq!(text(out), "{\n  \"odata.id\": \"a\",\n  \"Rank\": 1\n}");
    }

    #[test]
    fn error_envelope() {
        let mut emitter = JsonEmitter::new(false);
        let mut out = Vec::new();
        emitter
            .write_error(&mut out, &ODataError::new("NotFound", "gone"))
            .unwrap();
        assert_eq!(
            text(out),
            r#"{"odata.error":{"code":"NotFound","message":"gone"}}"#
        );
    }
}
