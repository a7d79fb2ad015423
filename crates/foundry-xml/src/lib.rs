//! Foundry XML -- a context-stack driver for streaming XML grammars.
//!
//! The engine walks one document with a streaming tokenizer and hands every
//! event to the handler that owns the current nesting level. It knows nothing
//! about the documents it reads; each grammar supplies its own [`Context`]
//! type, usually an enum whose variants carry the state of the record being
//! built.
//!
//! # Traversal Contract
//!
//! 1. **Start tag** -- the top context's [`Context::on_start_element`] runs
//!    and must push exactly one context through the [`Cursor`]. That context
//!    governs the element's children.
//! 2. **Character data** -- delivered to the top context's
//!    [`Context::on_characters`].
//! 3. **End tag** -- the top context's [`Context::on_end_element`] runs, then
//!    the context is popped.
//!
//! Any handler error, tokenizer error, or stack mismatch aborts the document
//! and is returned from [`XmlLoader::parse`].
//!
//! ```rust,ignore
//! let mut loader = XmlLoader::new();
//! loader.scratch_mut().insert("texts", ScratchValue::Texts(texts));
//! loader.parse_bytes(data, WareContext::root(&tables))?;
//! ```
//!
//! # Key Types
//!
//! - [`loader::XmlLoader`] -- owns the context stack and drives the tokenizer.
//! - [`context::Context`] -- per-element handler bundle implemented by grammars.
//! - [`scratch::Scratch`] -- per-parse string-keyed store of typed values.
//! - [`attributes::Attributes`] -- decoded attributes of a start tag.

pub mod attributes;
pub mod context;
pub mod error;
pub mod loader;
pub mod scratch;

pub use attributes::Attributes;
pub use context::{Context, Cursor};
pub use error::ParseError;
pub use loader::XmlLoader;
pub use scratch::Scratch;
