//! A streaming parser for the XML documents written by OProfile's `opxml` helper.
//!
//! The root tag of a document selects a root [`Processor`] through a [`ProcessorRegistry`].
//! Processors receive element and text events from a [`Dispatcher`], and may hand nested
//! fragments to child processors that they push on a [`ProcessorStack`].
//!
//! ```
//! use opxml::{OpxmlParser, model::SessionList};
//!
//! let xml = "<sessions><session>current</session><session>run1</session></sessions>";
//! let sessions: SessionList = OpxmlParser::default().parse_as(xml.as_bytes())?;
//!
//! assert_eq!(sessions.names().collect::<Vec<_>>(), vec!["current", "run1"]);
//! # Ok::<(), opxml::err::OpxmlError>(())
//! ```

#[macro_use]
mod macros;

pub mod dispatcher;
pub mod err;
pub mod model;
pub mod opxml;
pub mod opxml_parser;
pub mod processor;
pub mod processors;
pub mod registry;
pub mod runner;

pub use dispatcher::{Dispatcher, ProcessorStack};
pub use err::{ErrorKind, OpxmlError, Result};
pub use model::{CallData, DocumentKind, OpxmlDocument};
pub use opxml::Opxml;
pub use opxml_parser::{OpxmlParser, ParserSettings};
pub use processor::{Attributes, Processor, Transition};
pub use registry::{ProcessorFactory, ProcessorRegistration, ProcessorRegistry};
pub use runner::{CancellationToken, OpxmlRunner, RunnerSettings};
