// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Format emitters: validated items in, wire bytes out.
//!
//! The writer only calls an emitter after the state machine and validator
//! accepted the call, so emitters never check structure. They do keep their
//! own nesting frames, which is what separators, indentation and closing
//! tags depend on.

use std::io;

use crate::item::{NestedLinkItem, ODataError, ResourceItem, ResourceSetItem};
use crate::operations::OperationGroup;
use crate::settings::{PayloadFormat, WriterSettings};

mod atom;
mod json;

pub use atom::AtomEmitter;
pub use json::JsonEmitter;

/// Turns write calls into bytes appended to `out`.
pub trait FormatEmitter: Send {
    /// Opens a resource set (top-level or as link content).
    fn start_resource_set(&mut self, out: &mut Vec<u8>, set: &ResourceSetItem) -> io::Result<()>;

    /// Closes the innermost resource set.
    fn end_resource_set(&mut self, out: &mut Vec<u8>) -> io::Result<()>;

    /// Opens a resource and writes its header: identity, links, media
    /// resource, grouped operations and properties.
    fn start_resource(
        &mut self,
        out: &mut Vec<u8>,
        resource: &ResourceItem,
        operations: &[OperationGroup<'_>],
    ) -> io::Result<()>;

    /// Closes the innermost resource.
    fn end_resource(&mut self, out: &mut Vec<u8>) -> io::Result<()>;

    /// Opens a navigation link inside the current resource.
    fn start_nested_link(&mut self, out: &mut Vec<u8>, link: &NestedLinkItem) -> io::Result<()>;

    /// Closes the innermost navigation link.
    fn end_nested_link(&mut self, out: &mut Vec<u8>) -> io::Result<()>;

    /// Writes an error payload, in-stream if something is open.
    fn write_error(&mut self, out: &mut Vec<u8>, error: &ODataError) -> io::Result<()>;
}

/// The emitter selected by `settings.format`.
pub fn emitter_for(settings: &WriterSettings) -> Box<dyn FormatEmitter> {
    match settings.format {
        PayloadFormat::Json => Box::new(JsonEmitter::new(settings.indent)),
        PayloadFormat::Atom => Box::new(AtomEmitter::new(settings.indent)),
    }
}

/// Newline plus two spaces per level, when indenting.
fn indent_line(out: &mut Vec<u8>, indent: bool, level: usize) {
    if indent {
        out.push(b'\n');
        out.extend(std::iter::repeat(b' ').take(level * 2));
    }
}
