//! The context-stack driver.
//!
//! [`XmlLoader`] tokenizes one document at a time and routes each event to the
//! context on top of its stack. One loader parses one document at a time;
//! independent documents may be parsed concurrently with independent loaders.

use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::trace;

use crate::attributes::Attributes;
use crate::context::{Context, Cursor};
use crate::error::ParseError;
use crate::scratch::Scratch;

/// Streams a document through a stack of [`Context`]s.
pub struct XmlLoader<C: Context> {
    stack: Vec<C>,
    scratch: Scratch<C::Value>,
}

impl<C: Context> Default for XmlLoader<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Context> XmlLoader<C> {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            scratch: Scratch::new(),
        }
    }

    pub fn scratch(&self) -> &Scratch<C::Value> {
        &self.scratch
    }

    /// Mutable access to the scratch store. Fill it before [`XmlLoader::parse`].
    pub fn scratch_mut(&mut self) -> &mut Scratch<C::Value> {
        &mut self.scratch
    }

    /// Number of contexts on the stack. Zero whenever no parse is running.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Parse an in-memory document.
    pub fn parse_bytes(&mut self, data: &[u8], root: C) -> Result<(), ParseError> {
        self.parse(data, root)
    }

    /// Parse a whole document, starting with `root` as the only context.
    ///
    /// Returns `Ok` only if the document was consumed to the end. The stack
    /// is empty again when this returns, whatever the outcome.
    pub fn parse<R: BufRead>(&mut self, input: R, root: C) -> Result<(), ParseError> {
        self.stack.clear();
        self.stack.push(root);
        let result = self.drive(input);
        self.stack.clear();
        result
    }

    fn drive<R: BufRead>(&mut self, input: R) -> Result<(), ParseError> {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(false);
        let mut buf = Vec::new();

        loop {
            let event = match reader.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(source) => {
                    return Err(ParseError::Xml {
                        position: reader.buffer_position() as u64,
                        source,
                    });
                }
            };

            match event {
                Event::Start(e) => {
                    let (name, attrs) = decode_start(&e, reader.buffer_position() as u64)?;
                    self.start_element(&name, &attrs)?;
                }
                Event::Empty(e) => {
                    let (name, attrs) = decode_start(&e, reader.buffer_position() as u64)?;
                    self.start_element(&name, &attrs)?;
                    self.end_element(&name)?;
                }
                Event::End(e) => {
                    let name = std::str::from_utf8(e.name().as_ref())?.to_owned();
                    self.end_element(&name)?;
                }
                Event::Text(t) => {
                    let text = t.unescape().map_err(|source| ParseError::Xml {
                        position: reader.buffer_position() as u64,
                        source,
                    })?;
                    self.characters(&text)?;
                }
                Event::CData(c) => {
                    let text = std::str::from_utf8(&c)?;
                    self.characters(text)?;
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        match self.stack.len() {
            1 => Ok(()),
            n => Err(ParseError::Unclosed {
                depth: n.saturating_sub(1),
            }),
        }
    }

    fn start_element(&mut self, name: &str, attrs: &Attributes) -> Result<(), ParseError> {
        let mut top = self.stack.pop().ok_or_else(|| ParseError::StackUnderflow {
            element: name.to_owned(),
        })?;

        let mut cursor = Cursor::new(&self.scratch);
        let outcome = top.on_start_element(&mut cursor, name, attrs);
        let (next, pushes) = cursor.finish();
        self.stack.push(top);
        outcome?;

        let next = next.ok_or_else(|| ParseError::ContextNotPushed {
            element: name.to_owned(),
            pushes,
        })?;
        self.stack.push(next);
        trace!(element = name, depth = self.stack.len(), "enter");
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<(), ParseError> {
        let scratch = &self.scratch;
        match self.stack.last_mut() {
            Some(top) => top.on_characters(scratch, text),
            None => Ok(()),
        }
    }

    fn end_element(&mut self, name: &str) -> Result<(), ParseError> {
        // The root context never closes an element.
        if self.stack.len() < 2 {
            return Err(ParseError::StackUnderflow {
                element: name.to_owned(),
            });
        }
        let scratch = &self.scratch;
        if let Some(top) = self.stack.last_mut() {
            top.on_end_element(scratch, name)?;
        }
        self.stack.pop();
        trace!(element = name, depth = self.stack.len(), "leave");
        Ok(())
    }
}

/// Name and attributes of a start tag; `position` is where the tag ended.
fn decode_start(e: &BytesStart<'_>, position: u64) -> Result<(String, Attributes), ParseError> {
    let name = std::str::from_utf8(e.name().as_ref())?.to_owned();
    let mut attrs = Attributes::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ParseError::Xml {
            position,
            source: err.into(),
        })?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_owned();
        let value = attr.unescape_value().map_err(|source| ParseError::Xml {
            position,
            source,
        })?;
        attrs.push(key, value.into_owned());
    }
    Ok((name, attrs))
}

// ===========================================================================
// Tests
// ===========================================================================
