// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Payload rules checked after a transition is structurally legal and before
//! anything is emitted.

use url::Url;

use crate::error::{OperationCollection, ValidationError};
use crate::item::{NestedLinkItem, Operation, OperationKind, ResourceItem};
use crate::state::LinkCardinality;

/// What is about to be written inside a navigation link.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ContentKind {
    /// A single resource.
    Resource,
    /// A resource set.
    ResourceSet,
}

/// Per-item checks. Holds the request/response context of the writer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ResourceValidator {
    is_request: bool,
}

impl ResourceValidator {
    /// A validator for a request (`true`) or response (`false`) payload.
    pub fn new(is_request: bool) -> Self {
        Self { is_request }
    }

    /// True when validating a request payload.
    pub fn is_request(&self) -> bool {
        self.is_request
    }

    /// Rules applied when a resource is started.
    ///
    /// Order: absent operation entries, operations in a request, metadata
    /// form, operation target and kind, media resource ETag, property names.
    pub fn validate_resource(&self, item: &ResourceItem) -> Result<(), ValidationError> {
        let collections = [
            (OperationCollection::Actions, &item.actions),
            (OperationCollection::Functions, &item.functions),
        ];
        for (collection, ops) in collections {
            if ops.iter().any(Option::is_none) {
                return Err(ValidationError::EnumerableContainsNullItem { collection });
            }
        }

        if self.is_request {
            if let Some(first) = item.operations().next() {
                return Err(ValidationError::OperationInRequest {
                    metadata: first.metadata.clone(),
                });
            }
        }

        for op in item.operations() {
            validate_metadata(&op.metadata)?;
        }

        for (collection, ops) in collections {
            let expected = match collection {
                OperationCollection::Actions => OperationKind::Action,
                OperationCollection::Functions => OperationKind::Function,
            };
            for op in ops.iter().flatten() {
                validate_operation_shape(op, collection, expected)?;
            }
        }

        if let Some(media) = &item.media_resource {
            if media.etag.is_some() && media.edit_link.is_none() {
                return Err(ValidationError::MediaETagWithoutEditLink);
            }
        }

        if let Some(bad) = item.properties.iter().find(|p| !is_property_name(&p.name)) {
            return Err(ValidationError::InvalidPropertyName {
                name: bad.name.clone(),
            });
        }
        Ok(())
    }

    /// Rule applied when a resource is closed.
    pub fn validate_finalized_resource(&self, id: Option<&str>) -> Result<(), ValidationError> {
        match id {
            Some(id) if !id.is_empty() => Ok(()),
            _ => Err(ValidationError::EntriesMustHaveNonEmptyId),
        }
    }

    /// Rules applied when a navigation link is started.
    pub fn validate_nested_link(&self, link: &NestedLinkItem) -> Result<(), ValidationError> {
        if link.name.is_empty() {
            return Err(ValidationError::NestedLinkMustSpecifyName);
        }
        if !self.is_request && link.url.is_empty() {
            return Err(ValidationError::NestedLinkMustSpecifyUrl {
                name: link.name.clone(),
            });
        }
        Ok(())
    }

    /// The link's cardinality must match the content written into it.
    pub fn validate_nested_content(
        &self,
        link: &NestedLinkItem,
        content: ContentKind,
    ) -> Result<(), ValidationError> {
        match (link.cardinality(), content) {
            (LinkCardinality::Collection, ContentKind::Resource) => {
                Err(ValidationError::ExpectedResourceSetForCollectionLink {
                    url: link.url.clone(),
                })
            }
            (LinkCardinality::Single, ContentKind::ResourceSet) => {
                Err(ValidationError::ExpectedResourceForSingleLink {
                    url: link.url.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Error payloads are a response-only concept. `request_context_override`
    /// replaces the validator's own context for this check.
    pub fn validate_error_payload(
        &self,
        request_context_override: Option<bool>,
    ) -> Result<(), ValidationError> {
        if request_context_override.unwrap_or(self.is_request) {
            return Err(ValidationError::ErrorPayloadInRequest);
        }
        Ok(())
    }
}

/// Metadata must be an absolute URI or a relative reference starting with `#`.
fn validate_metadata(metadata: &str) -> Result<(), ValidationError> {
    if metadata.starts_with('#') || Url::parse(metadata).is_ok() {
        return Ok(());
    }
    Err(ValidationError::InvalidMetadataReference {
        metadata: metadata.to_owned(),
    })
}

/// Property names become Atom element names (`<d:Name>`), so they are held to
/// the simple identifier form: a letter or `_`, then letters, digits, `_`,
/// `-` or `.`.
fn is_property_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn validate_operation_shape(
    op: &Operation,
    collection: OperationCollection,
    expected: OperationKind,
) -> Result<(), ValidationError> {
    if op.target.is_empty() {
        return Err(ValidationError::OperationMissingTarget {
            metadata: op.metadata.clone(),
        });
    }
    if op.kind != expected {
        return Err(ValidationError::OperationKindMismatch {
            collection,
            metadata: op.metadata.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{MediaResource, Property};

    const TARGET: &str = "http://odata.org/defaultActionTarget";

    fn response() -> ResourceValidator {
        ResourceValidator::new(false)
    }

    #[test]
    fn null_function_entry_names_functions() {
        let mut item = ResourceItem::new("e").with_action(Operation::action("#a", TARGET));
        item.functions.push(None);
        assert_eq!(
            response().validate_resource(&item),
            Err(ValidationError::EnumerableContainsNullItem {
                collection: OperationCollection::Functions
            })
        );
    }

    #[test]
    fn operations_rejected_in_request() {
        let item = ResourceItem::new("e")
            .with_action(Operation::action("#first", TARGET))
            .with_action(Operation::action("#second", TARGET));
        assert_eq!(
            ResourceValidator::new(true).validate_resource(&item),
            Err(ValidationError::OperationInRequest {
                metadata: "#first".into()
            })
        );
        assert_eq!(response().validate_resource(&item), Ok(()));
    }

    #[test]
    fn metadata_must_be_absolute_or_fragment() {
        for ok in ["#action", "http://odata.org/$metadata#action", "urn:odata:op"] {
            let item = ResourceItem::new("e").with_action(Operation::action(ok, TARGET));
            assert_eq!(response().validate_resource(&item), Ok(()), "{ok}");
        }
        for bad in ["action", "foo#bar", "../$metadata#x", ""] {
            let item = ResourceItem::new("e").with_function(Operation::function(bad, TARGET));
            assert_eq!(
                response().validate_resource(&item),
                Err(ValidationError::InvalidMetadataReference {
                    metadata: bad.into()
                }),
                "{bad}"
            );
        }
    }

    #[test]
    fn operation_needs_target_and_matching_kind() {
        let item = ResourceItem::new("e").with_action(Operation::action("#a", ""));
        assert!(matches!(
            response().validate_resource(&item),
            Err(ValidationError::OperationMissingTarget { .. })
        ));
        let item = ResourceItem::new("e").with_action(Operation::function("#f", TARGET));
        assert!(matches!(
            response().validate_resource(&item),
            Err(ValidationError::OperationKindMismatch {
                collection: OperationCollection::Actions,
                ..
            })
        ));
    }

    #[test]
    fn media_etag_needs_edit_link() {
        let fields = |read: bool, edit: bool, ctype: bool, etag: bool| MediaResource {
            read_link: read.then(|| "http://odata.org/read".to_owned()),
            edit_link: edit.then(|| "http://odata.org/edit".to_owned()),
            content_type: ctype.then(|| "image/jpeg".to_owned()),
            etag: etag.then(|| "W/\"1\"".to_owned()),
        };
        for mask in 0u8..16 {
            let (read, edit, ctype, etag) =
                (mask & 1 != 0, mask & 2 != 0, mask & 4 != 0, mask & 8 != 0);
            let item = ResourceItem::new("e").with_media_resource(fields(read, edit, ctype, etag));
            let result = response().validate_resource(&item);
            if etag && !edit {
                assert_eq!(result, Err(ValidationError::MediaETagWithoutEditLink));
            } else {
                assert_eq!(result, Ok(()));
            }
        }
    }

    #[test]
    fn property_names_must_be_identifiers() {
        for ok in ["Rank", "_hidden", "Name2", "Ünïcode", "a.b-c"] {
            let item = ResourceItem::new("e").with_property(Property::new(ok, 1));
            assert_eq!(response().validate_resource(&item), Ok(()), "{ok}");
        }
        for bad in ["", "two words", "a<b", "q\"", "1st", "-x", "d:Rank"] {
            let item = ResourceItem::new("e")
                .with_property(Property::new("Rank", 1))
                .with_property(Property::new(bad, 1));
            assert_eq!(
                response().validate_resource(&item),
                Err(ValidationError::InvalidPropertyName { name: bad.into() }),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn finalized_resource_needs_identity() {
        let v = response();
        assert_eq!(v.validate_finalized_resource(Some("id")), Ok(()));
        assert_eq!(
            v.validate_finalized_resource(Some("")),
            Err(ValidationError::EntriesMustHaveNonEmptyId)
        );
        assert_eq!(
            v.validate_finalized_resource(None),
            Err(ValidationError::EntriesMustHaveNonEmptyId)
        );
    }

    #[test]
    fn link_cardinality_mismatch_names_url() {
        let single = NestedLinkItem::new("Customer", "http://odata.org/Customer", false);
        let many = NestedLinkItem::new("Orders", "http://odata.org/Orders", true);
        let v = response();
        assert_eq!(
            v.validate_nested_content(&single, ContentKind::ResourceSet),
            Err(ValidationError::ExpectedResourceForSingleLink {
                url: "http://odata.org/Customer".into()
            })
        );
        assert_eq!(
            v.validate_nested_content(&many, ContentKind::Resource),
            Err(ValidationError::ExpectedResourceSetForCollectionLink {
                url: "http://odata.org/Orders".into()
            })
        );
        assert_eq!(v.validate_nested_content(&single, ContentKind::Resource), Ok(()));
        assert_eq!(v.validate_nested_content(&many, ContentKind::ResourceSet), Ok(()));
    }

    #[test]
    fn link_needs_name_and_response_url() {
        let nameless = NestedLinkItem::new("", "http://odata.org/x", false);
        assert_eq!(
            response().validate_nested_link(&nameless),
            Err(ValidationError::NestedLinkMustSpecifyName)
        );
        let urlless = NestedLinkItem::new("Orders", "", true);
        assert!(response().validate_nested_link(&urlless).is_err());
        assert_eq!(ResourceValidator::new(true).validate_nested_link(&urlless), Ok(()));
    }

    #[test]
    fn error_payload_context_override() {
        let v = response();
        assert_eq!(v.validate_error_payload(None), Ok(()));
        assert_eq!(
            v.validate_error_payload(Some(true)),
            Err(ValidationError::ErrorPayloadInRequest)
        );
        assert_eq!(
            ResourceValidator::new(true).validate_error_payload(Some(false)),
            Ok(())
        );
    }
}
