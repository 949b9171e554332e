// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Payload items handed to the writer.
//!
//! Items are plain data and deserializable, so callers (and test fixtures) can
//! describe payloads in JSON. That is also why operation collections hold
//! `Option<Operation>`: a `null` entry is representable and rejected by the
//! validator instead of being silently dropped.

use serde::{Deserialize, Serialize};

use crate::state::LinkCardinality;

/// Action or function.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// A side-effecting operation.
    Action,
    /// A side-effect free operation.
    Function,
}

/// An operation advertised on a resource.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Operation {
    /// Action or function.
    pub kind: OperationKind,
    /// Absolute URI or `#fragment` identifying the operation.
    pub metadata: String,
    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Invocation URI.
    pub target: String,
}

impl Operation {
    /// An action with the given metadata and target.
    pub fn action(metadata: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Action,
            metadata: metadata.into(),
            title: None,
            target: target.into(),
        }
    }

    /// A function with the given metadata and target.
    pub fn function(metadata: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Function,
            metadata: metadata.into(),
            title: None,
            target: target.into(),
        }
    }

    /// Sets the display title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// The binary-stream facet of a resource.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaResource {
    /// Where the stream can be read.
    pub read_link: Option<String>,
    /// Where the stream can be replaced.
    pub edit_link: Option<String>,
    /// Stream media type.
    pub content_type: Option<String>,
    /// Stream concurrency token. Requires `edit_link`.
    pub etag: Option<String>,
}

impl MediaResource {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.read_link.is_none()
            && self.edit_link.is_none()
            && self.content_type.is_none()
            && self.etag.is_none()
    }
}

/// A named primitive value of a resource.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Primitive value; `null` is allowed.
    pub value: serde_json::Value,
}

impl Property {
    /// A property from anything convertible into a JSON value.
    pub fn new(name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A single resource (entry).
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceItem {
    /// Identity; must be non-empty when the resource is closed.
    pub id: Option<String>,
    /// Qualified type name.
    pub type_name: Option<String>,
    /// Edit link of the resource.
    pub edit_link: Option<String>,
    /// Present when the resource is a media link entry.
    pub media_resource: Option<MediaResource>,
    /// Actions, in insertion order.
    pub actions: Vec<Option<Operation>>,
    /// Functions, in insertion order.
    pub functions: Vec<Option<Operation>>,
    /// Properties, in insertion order.
    pub properties: Vec<Property>,
}

impl ResourceItem {
    /// An empty resource with the given identity.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Sets the type name.
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Sets the edit link.
    pub fn with_edit_link(mut self, edit_link: impl Into<String>) -> Self {
        self.edit_link = Some(edit_link.into());
        self
    }

    /// Attaches a media resource.
    pub fn with_media_resource(mut self, media: MediaResource) -> Self {
        self.media_resource = Some(media);
        self
    }

    /// Appends an action.
    pub fn with_action(mut self, action: Operation) -> Self {
        self.actions.push(Some(action));
        self
    }

    /// Appends a function.
    pub fn with_function(mut self, function: Operation) -> Self {
        self.functions.push(Some(function));
        self
    }

    /// Appends a property.
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// All present operations: actions first, then functions.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.actions.iter().chain(&self.functions).flatten()
    }
}

/// A resource set (feed).
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSetItem {
    /// Identity of the set.
    pub id: Option<String>,
    /// Total count, when the caller asked for it.
    pub count: Option<u64>,
    /// Link to the next page.
    pub next_link: Option<String>,
}

/// A named relation from a resource to further content.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct NestedLinkItem {
    /// Navigation property name.
    pub name: String,
    /// Where the related content lives.
    #[serde(default)]
    pub url: String,
    /// True when the content is a resource set.
    pub is_collection: bool,
}

impl NestedLinkItem {
    /// A navigation link.
    pub fn new(name: impl Into<String>, url: impl Into<String>, is_collection: bool) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            is_collection,
        }
    }

    /// Single or collection.
    pub fn cardinality(&self) -> LinkCardinality {
        if self.is_collection {
            LinkCardinality::Collection
        } else {
            LinkCardinality::Single
        }
    }
}

/// An error payload written by `write_error`.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ODataError {
    /// Service-defined error code.
    pub code: String,
    /// Human readable message.
    pub message: String,
    /// What the error refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Debug detail.
    #[serde(rename = "innererror", skip_serializing_if = "Option::is_none")]
    pub inner_error: Option<String>,
}

impl ODataError {
    /// An error with code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn null_operation_entries_deserialize() {
        let item: ResourceItem = serde_json::from_str(
            r##"{"id":"http://odata.org/e(1)","actions":[null,{"kind":"action","metadata":"#a","target":"http://t"}]}"##,
        )
        .unwrap();
        assert_eq!(item.actions.len(), 2);
        assert!(item.actions[0].is_none());
        assert_eq!(item.operations().count(), 1);
    }

    #[test]
    fn operations_list_actions_before_functions() {
        let item = ResourceItem::new("e")
            .with_function(Operation::function("#f", "http://f"))
            .with_action(Operation::action("#a", "http://a"));
        let metadata: Vec<_> = item.operations().map(|op| op.metadata.as_str()).collect();
        assert_eq!(metadata, ["#a", "#f"]);
    }

    #[test]
    fn empty_media_resource() {
        assert!(MediaResource::default().is_empty());
        let media = MediaResource {
            content_type: Some("image/png".into()),
            ..MediaResource::default()
        };
        assert!(!media.is_empty());
    }
}
