// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Sample payload items.

use odata_writer::{
    MediaResource, NestedLinkItem, ODataError, Operation, Property, ResourceItem, ResourceSetItem,
};

/// Target of [`default_action`].
pub const DEFAULT_ACTION_TARGET: &str = "http://odata.org/defaultActionTarget";

/// Target of [`default_function`].
pub const DEFAULT_FUNCTION_TARGET: &str = "http://odata.org/defaultFunctionTarget";

/// `#action`, titled "Default Action".
pub fn default_action() -> Operation {
    Operation::action("#action", DEFAULT_ACTION_TARGET).with_title("Default Action")
}

/// `#function`, titled "Default Function".
pub fn default_function() -> Operation {
    Operation::function("#function", DEFAULT_FUNCTION_TARGET).with_title("Default Function")
}

/// Identity of the `n`th sample entry.
pub fn entry_id(n: u32) -> String {
    format!("http://odata.org/entry({n})")
}

/// A sample entry with an identity and one property.
pub fn entry(n: u32) -> ResourceItem {
    ResourceItem::new(entry_id(n))
        .with_type_name("TestModel.Entry")
        .with_property(Property::new("Rank", n))
}

/// Entry 1 advertising [`default_action`].
pub fn entry_with_default_action() -> ResourceItem {
    ResourceItem::new(entry_id(1)).with_action(default_action())
}

/// An entry with no identity; rejected when it is closed.
pub fn entry_without_id() -> ResourceItem {
    ResourceItem::default()
}

/// A feed with a count and a next page.
pub fn paged_feed() -> ResourceSetItem {
    ResourceSetItem {
        id: Some("http://odata.org/entries".into()),
        count: Some(2),
        next_link: Some("http://odata.org/entries?$skiptoken=2".into()),
    }
}

/// Collection link `Orders` of entry 1.
pub fn orders_link() -> NestedLinkItem {
    NestedLinkItem::new("Orders", "http://odata.org/entry(1)/Orders", true)
}

/// Single-valued link `Customer` of entry 1.
pub fn customer_link() -> NestedLinkItem {
    NestedLinkItem::new("Customer", "http://odata.org/entry(1)/Customer", false)
}

/// The error payload the scenarios write.
pub fn sample_error() -> ODataError {
    ODataError::new("SampleError", "Something went wrong")
}

/// A media resource with the fields selected by the low four bits of
/// `mask`: read link, edit link, content type, ETag.
pub fn media_resource(mask: u8) -> MediaResource {
    let field = |bit: u8, value: &str| (mask & bit != 0).then(|| value.to_owned());
    MediaResource {
        read_link: field(1, "http://odata.org/entry(1)/$value"),
        edit_link: field(2, "http://odata.org/entry(1)/$value/edit"),
        content_type: field(4, "image/jpeg"),
        etag: field(8, "W/\"etag\""),
    }
}
