//! Errors raised while driving a document through the context stack.

/// Reasons a document parse was aborted.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The tokenizer rejected the document (malformed markup, mismatched
    /// end tag, bad attribute, ...).
    #[error("malformed xml at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    /// Element or attribute names were not valid UTF-8.
    #[error("invalid utf-8 in document: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// A handler refused the element.
    #[error("<{element}> rejected: {reason}")]
    Rejected { element: String, reason: String },

    /// A start handler returned without pushing exactly one context.
    #[error("start handler for <{element}> pushed {pushes} contexts, expected 1")]
    ContextNotPushed { element: String, pushes: usize },

    /// An end tag arrived with no open element to close.
    #[error("end tag </{element}> closes nothing")]
    StackUnderflow { element: String },

    /// The document ended while elements were still open.
    #[error("document ended with {depth} unclosed element(s)")]
    Unclosed { depth: usize },
}

impl ParseError {
    /// Build a [`ParseError::Rejected`] for `element`.
    pub fn rejected(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            element: element.into(),
            reason: reason.into(),
        }
    }
}
