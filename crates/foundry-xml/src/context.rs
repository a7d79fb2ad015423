//! Per-element handler bundles.
//!
//! A [`Context`] governs the children of one open element. Grammars usually
//! implement it on an enum whose variants carry the record being filled, so
//! the state travels with the element instead of living in a global state
//! machine.

use crate::attributes::Attributes;
use crate::error::ParseError;
use crate::scratch::Scratch;

// ---------------------------------------------------------------------------
// Context trait
// ---------------------------------------------------------------------------

/// Handlers for one nesting level of a document.
///
/// Every handler has a default: start tags are swallowed by pushing
/// [`Context::skip`], character data and end tags are ignored. A grammar
/// overrides only the events its elements care about.
pub trait Context: Sized {
    /// Tagged value type stored in the per-parse [`Scratch`].
    type Value;

    /// The no-op context that consumes a subtree without effect.
    fn skip() -> Self;

    /// Called for a start tag seen while this context is on top.
    ///
    /// Must push exactly one context through `cursor` before returning `Ok`.
    fn on_start_element(
        &mut self,
        cursor: &mut Cursor<'_, Self>,
        name: &str,
        attrs: &Attributes,
    ) -> Result<(), ParseError> {
        let _ = (name, attrs);
        cursor.push(Self::skip());
        Ok(())
    }

    /// Called for character data (text or CDATA) while this context is on top.
    fn on_characters(
        &mut self,
        scratch: &Scratch<Self::Value>,
        text: &str,
    ) -> Result<(), ParseError> {
        let _ = (scratch, text);
        Ok(())
    }

    /// Called for the end tag of the element this context was pushed for,
    /// right before the context is popped.
    fn on_end_element(
        &mut self,
        scratch: &Scratch<Self::Value>,
        name: &str,
    ) -> Result<(), ParseError> {
        let _ = (scratch, name);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// Engine handle given to start handlers: pushes the next context and
/// exposes the scratch store.
pub struct Cursor<'a, C: Context> {
    scratch: &'a Scratch<C::Value>,
    next: Option<C>,
    pushes: usize,
}

impl<'a, C: Context> Cursor<'a, C> {
    pub(crate) fn new(scratch: &'a Scratch<C::Value>) -> Self {
        Self {
            scratch,
            next: None,
            pushes: 0,
        }
    }

    /// Push the context that governs the children of the current element.
    pub fn push(&mut self, context: C) {
        self.pushes += 1;
        if self.next.is_none() {
            self.next = Some(context);
        }
    }

    /// Shorthand for pushing [`Context::skip`].
    pub fn skip(&mut self) {
        self.push(C::skip());
    }

    pub fn scratch(&self) -> &'a Scratch<C::Value> {
        self.scratch
    }

    /// The pushed context, or `None` unless exactly one push happened.
    pub(crate) fn finish(self) -> (Option<C>, usize) {
        match self.pushes {
            1 => (self.next, 1),
            n => (None, n),
        }
    }
}
