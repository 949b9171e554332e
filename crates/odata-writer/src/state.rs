// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Writer states, transitions and the legal-transition table.
//!
//! The table is a pure function ([`transition_verdict`]) so it can be checked
//! exhaustively in isolation; [`WriterStateMachine`] layers the scope stack on
//! top of it (what is open, what `end()` closes, when the top level completes).

use std::fmt;

use tracing::{debug, warn};

use crate::error::{StructuralError, StructuralReason};
use crate::item::NestedLinkItem;

/// Whether a navigation link holds a single resource or a resource set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LinkCardinality {
    /// Single-valued link; its content is one resource.
    Single,
    /// Collection-valued link; its content is one resource set.
    Collection,
}

/// Current protocol state of a writer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum WriterState {
    /// Nothing written yet.
    Start,
    /// A resource is open.
    Resource,
    /// A resource set is open.
    ResourceSet,
    /// A navigation link is open and waiting for content or `end()`.
    NestedLink(LinkCardinality),
    /// The top-level item has been closed.
    Completed,
    /// A failure occurred; only flush, the one-shot error payload and disposal remain.
    Error,
}

impl WriterState {
    /// True for `Completed` and `Error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Every state, in table order. Handy for exhaustive tests.
    pub const ALL: [WriterState; 7] = [
        Self::Start,
        Self::Resource,
        Self::ResourceSet,
        Self::NestedLink(LinkCardinality::Single),
        Self::NestedLink(LinkCardinality::Collection),
        Self::Completed,
        Self::Error,
    ];
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("Start"),
            Self::Resource => f.write_str("Resource"),
            Self::ResourceSet => f.write_str("ResourceSet"),
            Self::NestedLink(LinkCardinality::Single) => f.write_str("NestedLink(single)"),
            Self::NestedLink(LinkCardinality::Collection) => {
                f.write_str("NestedLink(collection)")
            }
            Self::Completed => f.write_str("Completed"),
            Self::Error => f.write_str("Error"),
        }
    }
}

/// A requested move of the state machine.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Transition {
    /// `begin_resource`.
    BeginResource,
    /// `begin_resource_set`.
    BeginResourceSet,
    /// `begin_nested_link`.
    BeginNestedLink,
    /// `end`.
    End,
    /// `write_error`.
    WriteError,
}

impl Transition {
    /// Every transition, in table order.
    pub const ALL: [Transition; 5] = [
        Self::BeginResource,
        Self::BeginResourceSet,
        Self::BeginNestedLink,
        Self::End,
        Self::WriteError,
    ];
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BeginResource => "begin_resource",
            Self::BeginResourceSet => "begin_resource_set",
            Self::BeginNestedLink => "begin_nested_link",
            Self::End => "end",
            Self::WriteError => "write_error",
        };
        f.write_str(name)
    }
}

/// What the writer was created to produce at the top level.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum WriterKind {
    /// Entry writer: the top-level item is a single resource.
    Resource,
    /// Feed writer: the top-level item is a resource set.
    ResourceSet,
}

/// The legal-transition table.
///
/// `writer_kind` only matters in `Start`. The two cardinality cells
/// (`NestedLink(Single)` + `BeginResourceSet`, `NestedLink(Collection)` +
/// `BeginResource`) are structurally open here and rejected by
/// [`ResourceValidator::validate_nested_content`](crate::ResourceValidator::validate_nested_content),
/// which can name the link's URL. `WriteError` from `Error` is open here; the
/// one-shot rule lives in [`ErrorChannel`](crate::ErrorChannel).
pub fn transition_verdict(
    state: WriterState,
    transition: Transition,
    writer_kind: WriterKind,
) -> Result<(), StructuralReason> {
    use StructuralReason as R;
    use Transition as T;
    use WriterState as S;

    match (state, transition) {
        (S::Completed, _) => Err(R::InvalidFromCompleted),
        (_, T::WriteError) => Ok(()),
        (S::Error, _) => Err(R::InvalidFromError),

        (S::Start, T::BeginResource) => match writer_kind {
            WriterKind::Resource => Ok(()),
            WriterKind::ResourceSet => Err(R::TopLevelKindMismatch),
        },
        (S::Start, T::BeginResourceSet) => match writer_kind {
            WriterKind::ResourceSet => Ok(()),
            WriterKind::Resource => Err(R::TopLevelKindMismatch),
        },
        (S::Start, T::BeginNestedLink) => Err(R::InvalidFromStart),
        (S::Start, T::End) => Err(R::NothingToEnd),

        (S::Resource, T::BeginResource) => Err(R::ResourceCannotContainResource),
        (S::Resource, T::BeginResourceSet) => Err(R::ResourceCannotContainResourceSet),
        (S::Resource, T::BeginNestedLink | T::End) => Ok(()),

        (S::ResourceSet, T::BeginResource | T::End) => Ok(()),
        (S::ResourceSet, T::BeginResourceSet) => Err(R::ResourceSetCannotContainResourceSet),
        (S::ResourceSet, T::BeginNestedLink) => Err(R::ResourceSetCannotContainNestedLink),

        (S::NestedLink(_), T::BeginNestedLink) => Err(R::NestedLinkCannotContainNestedLink),
        (S::NestedLink(_), T::BeginResource | T::BeginResourceSet | T::End) => Ok(()),
    }
}

/// One open level of the payload.
#[derive(Clone, Debug)]
pub(crate) enum Scope {
    Resource {
        id: Option<String>,
    },
    ResourceSet,
    NestedLink {
        link: NestedLinkItem,
        has_content: bool,
    },
}

impl Scope {
    fn state(&self) -> WriterState {
        match self {
            Self::Resource { .. } => WriterState::Resource,
            Self::ResourceSet => WriterState::ResourceSet,
            Self::NestedLink { link, .. } => WriterState::NestedLink(link.cardinality()),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Terminal {
    Completed,
    Error,
}

/// Owns the current state and the stack of open scopes.
#[derive(Clone, Debug)]
pub struct WriterStateMachine {
    kind: WriterKind,
    scopes: Vec<Scope>,
    terminal: Option<Terminal>,
}

impl WriterStateMachine {
    /// A fresh machine in `Start`.
    pub fn new(kind: WriterKind) -> Self {
        Self {
            kind,
            scopes: Vec::new(),
            terminal: None,
        }
    }

    /// The writer kind fixed at creation.
    pub fn kind(&self) -> WriterKind {
        self.kind
    }

    /// The current state.
    pub fn state(&self) -> WriterState {
        match self.terminal {
            Some(Terminal::Completed) => WriterState::Completed,
            Some(Terminal::Error) => WriterState::Error,
            None => self.scopes.last().map_or(WriterState::Start, Scope::state),
        }
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// The innermost open navigation link, if the current scope is one.
    pub fn open_link(&self) -> Option<&NestedLinkItem> {
        match self.scopes.last() {
            Some(Scope::NestedLink { link, .. }) if self.terminal.is_none() => Some(link),
            _ => None,
        }
    }

    /// Checks `transition` against the table and the scope stack.
    ///
    /// Does not change state; the caller decides whether a rejection moves
    /// the machine to `Error`.
    pub fn check(&self, transition: Transition) -> Result<(), StructuralError> {
        let state = self.state();
        let reject = |reason| StructuralError {
            transition,
            state,
            reason,
        };
        transition_verdict(state, transition, self.kind).map_err(reject)?;
        if let Some(Scope::NestedLink {
            has_content: true, ..
        }) = self.scopes.last()
        {
            if matches!(
                transition,
                Transition::BeginResource | Transition::BeginResourceSet
            ) {
                return Err(reject(StructuralReason::NestedLinkAlreadyHasContent));
            }
        }
        Ok(())
    }

    /// Opens a resource scope. The identity is kept for the `end()` check.
    pub(crate) fn push_resource(&mut self, id: Option<String>) {
        self.mark_link_content();
        self.scopes.push(Scope::Resource { id });
        debug!(state = %self.state(), depth = self.depth(), "entered resource");
    }

    /// Opens a resource set scope.
    pub(crate) fn push_resource_set(&mut self) {
        self.mark_link_content();
        self.scopes.push(Scope::ResourceSet);
        debug!(state = %self.state(), depth = self.depth(), "entered resource set");
    }

    /// Opens a navigation link scope.
    pub(crate) fn push_nested_link(&mut self, link: NestedLinkItem) {
        self.scopes.push(Scope::NestedLink {
            link,
            has_content: false,
        });
        debug!(state = %self.state(), depth = self.depth(), "entered nested link");
    }

    /// The scope `end()` would close.
    pub(crate) fn current_scope(&self) -> Option<&Scope> {
        if self.terminal.is_some() {
            return None;
        }
        self.scopes.last()
    }

    /// Closes the innermost scope; closing the last one completes the writer.
    pub(crate) fn pop(&mut self) -> Option<Scope> {
        let scope = self.scopes.pop();
        if scope.is_some() && self.scopes.is_empty() {
            self.terminal = Some(Terminal::Completed);
        }
        debug!(state = %self.state(), depth = self.depth(), "closed scope");
        scope
    }

    /// Moves to `Error`. Idempotent.
    pub(crate) fn enter_error(&mut self) {
        if self.terminal != Some(Terminal::Error) {
            warn!(from = %self.state(), "writer entered error state");
            self.terminal = Some(Terminal::Error);
        }
    }

    fn mark_link_content(&mut self) {
        if let Some(Scope::NestedLink { has_content, .. }) = self.scopes.last_mut() {
            *has_content = true;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn link(is_collection: bool) -> NestedLinkItem {
        NestedLinkItem::new("Orders", "http://odata.org/Orders", is_collection)
    }

    #[test]
    fn start_row_depends_on_writer_kind() {
        let entry = WriterKind::Resource;
        let feed = WriterKind::ResourceSet;
        assert!(transition_verdict(WriterState::Start, Transition::BeginResource, entry).is_ok());
        assert_eq!(
            transition_verdict(WriterState::Start, Transition::BeginResource, feed),
            Err(StructuralReason::TopLevelKindMismatch)
        );
        assert!(
            transition_verdict(WriterState::Start, Transition::BeginResourceSet, feed).is_ok()
        );
        assert_eq!(
            transition_verdict(WriterState::Start, Transition::BeginResourceSet, entry),
            Err(StructuralReason::TopLevelKindMismatch)
        );
    }

    #[test]
    fn terminal_rows_reject_content() {
        for kind in [WriterKind::Resource, WriterKind::ResourceSet] {
            for t in [
                Transition::BeginResource,
                Transition::BeginResourceSet,
                Transition::BeginNestedLink,
                Transition::End,
            ] {
                assert_eq!(
                    transition_verdict(WriterState::Completed, t, kind),
                    Err(StructuralReason::InvalidFromCompleted)
                );
                assert_eq!(
                    transition_verdict(WriterState::Error, t, kind),
                    Err(StructuralReason::InvalidFromError)
                );
            }
            assert!(transition_verdict(WriterState::Error, Transition::WriteError, kind).is_ok());
            assert_eq!(
                transition_verdict(WriterState::Completed, Transition::WriteError, kind),
                Err(StructuralReason::InvalidFromCompleted)
            );
        }
    }

    #[test]
    fn end_on_start_is_rejected() {
        let machine = WriterStateMachine::new(WriterKind::Resource);
        let err = machine.check(Transition::End).unwrap_err();
        assert_eq!(err.reason, StructuralReason::NothingToEnd);
        assert_eq!(err.state, WriterState::Start);
    }

    #[test]
    fn closing_top_level_completes() {
        let mut machine = WriterStateMachine::new(WriterKind::Resource);
        machine.push_resource(Some("id".into()));
        machine.push_nested_link(link(false));
        assert_eq!(
            machine.state(),
            WriterState::NestedLink(LinkCardinality::Single)
        );
        machine.push_resource(Some("child".into()));
        machine.pop();
        assert_eq!(
            machine.state(),
            WriterState::NestedLink(LinkCardinality::Single)
        );
        machine.pop();
        assert_eq!(machine.state(), WriterState::Resource);
        machine.pop();
        assert_eq!(machine.state(), WriterState::Completed);
    }

    #[test]
    fn link_accepts_one_piece_of_content() {
        let mut machine = WriterStateMachine::new(WriterKind::Resource);
        machine.push_resource(Some("id".into()));
        machine.push_nested_link(link(true));
        assert!(machine.check(Transition::BeginResourceSet).is_ok());
        machine.push_resource_set();
        machine.pop();
        let err = machine.check(Transition::BeginResourceSet).unwrap_err();
        assert_eq!(err.reason, StructuralReason::NestedLinkAlreadyHasContent);
    }

    #[test]
    fn error_is_sticky() {
        let mut machine = WriterStateMachine::new(WriterKind::ResourceSet);
        machine.push_resource_set();
        machine.enter_error();
        machine.enter_error();
        assert_eq!(machine.state(), WriterState::Error);
        assert!(machine.open_link().is_none());
        assert!(machine.current_scope().is_none());
    }
}
