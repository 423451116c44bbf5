use crate::model::DocumentKind;

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OpxmlError>;

#[derive(Debug, Error)]
pub enum OpxmlError {
    /// Errors related to the external producer process

    #[error("Failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited unsuccessfully ({status}){}", stderr_suffix(.stderr))]
    ProcessFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("An I/O error has occurred while reading opxml output: {0}")]
    Io(#[from] io::Error),

    #[error("The operation was cancelled")]
    Cancelled,

    /// Errors related to the document

    // Since `quick-xml` checks well-formedness for us, syntax and nesting errors
    // it detects are carried verbatim.
    #[error("Offset {position}: XML error: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("{}malformed opxml document: {message}", offset_prefix(.position))]
    MalformedDocument {
        position: Option<u64>,
        message: String,
    },

    #[error("{}invalid value `{value}` for `{field}`", offset_prefix(.position))]
    InvalidValue {
        field: &'static str,
        value: String,
        position: Option<u64>,
    },

    #[error("No processor registered for root tag `{tag}`")]
    UnknownRootTag { tag: String },

    #[error("Processor stack is empty, nothing to resume on `</{tag}>`")]
    EmptyProcessorStack { tag: String },

    #[error("Expected a `{expected}` document, found `{found}`")]
    UnexpectedDocument {
        expected: DocumentKind,
        found: DocumentKind,
    },

    /// Errors related to registry setup

    #[error("A processor is already registered for root tag `{tag}`")]
    DuplicateTag { tag: String },
}

/// Coarse classification of [`OpxmlError`], for callers that only need to decide
/// how to report a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The producer could not be launched, failed, or its output could not be read.
    ExternalProcess,
    /// The document is not well formed or does not have the shape a processor expects.
    MalformedDocument,
    /// The root tag has no registered processor.
    UnknownRootTag,
    Cancelled,
    Registry,
}

impl OpxmlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OpxmlError::Launch { .. } | OpxmlError::ProcessFailed { .. } | OpxmlError::Io(_) => {
                ErrorKind::ExternalProcess
            }
            OpxmlError::Cancelled => ErrorKind::Cancelled,
            OpxmlError::Xml { .. }
            | OpxmlError::MalformedDocument { .. }
            | OpxmlError::InvalidValue { .. }
            | OpxmlError::EmptyProcessorStack { .. }
            | OpxmlError::UnexpectedDocument { .. } => ErrorKind::MalformedDocument,
            OpxmlError::UnknownRootTag { .. } => ErrorKind::UnknownRootTag,
            OpxmlError::DuplicateTag { .. } => ErrorKind::Registry,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        OpxmlError::MalformedDocument {
            position: None,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_value(field: &'static str, value: impl Into<String>) -> Self {
        OpxmlError::InvalidValue {
            field,
            value: value.into(),
            position: None,
        }
    }

    pub(crate) fn xml(source: quick_xml::Error, position: u64) -> Self {
        // An I/O failure surfaced through the reader belongs to the producer, not the document.
        if let quick_xml::Error::Io(ref e) = source {
            return OpxmlError::Io(io::Error::new(e.kind(), e.to_string()));
        }
        OpxmlError::Xml { position, source }
    }

    /// Attaches a byte offset to errors raised by processors, which do not know where
    /// in the stream they are.
    pub(crate) fn at(self, offset: u64) -> Self {
        match self {
            OpxmlError::MalformedDocument {
                position: None,
                message,
            } => OpxmlError::MalformedDocument {
                position: Some(offset),
                message,
            },
            OpxmlError::InvalidValue {
                field,
                value,
                position: None,
            } => OpxmlError::InvalidValue {
                field,
                value,
                position: Some(offset),
            },
            other => other,
        }
    }
}

fn offset_prefix(position: &Option<u64>) -> String {
    position.map_or_else(String::new, |p| format!("Offset {}: ", p))
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}
