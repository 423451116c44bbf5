use crate::dispatcher::Dispatcher;
use crate::err::{OpxmlError, Result};
use crate::model::{CallData, DocumentKind, OpxmlDocument};
use crate::processor::Attributes;
use crate::registry::ProcessorRegistry;

use log::{debug, trace};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserSettings {
    /// Treat unknown elements under a known root as errors instead of skipping them.
    strict: bool,
    buffer_capacity: usize,
}

impl Default for ParserSettings {
    fn default() -> Self {
        ParserSettings {
            strict: false,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl ParserSettings {
    pub fn new() -> Self {
        ParserSettings::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Initial size of the event buffer used while reading the document.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(64);
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn get_buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }
}

/// Streams an opxml document through the processors registered for its root tag.
#[derive(Debug, Clone)]
pub struct OpxmlParser<'r> {
    registry: &'r ProcessorRegistry,
    settings: ParserSettings,
}

impl Default for OpxmlParser<'static> {
    fn default() -> Self {
        OpxmlParser::new(ProcessorRegistry::shared())
    }
}

impl<'r> OpxmlParser<'r> {
    pub fn new(registry: &'r ProcessorRegistry) -> Self {
        OpxmlParser {
            registry,
            settings: ParserSettings::default(),
        }
    }

    pub fn with_configuration(mut self, settings: ParserSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    /// Parses a whole document. Nothing is returned unless the document closes cleanly.
    pub fn parse<R: BufRead>(&self, reader: R) -> Result<CallData> {
        self.parse_expecting(reader, None)
    }

    /// Parses a document that must produce `T`.
    pub fn parse_as<T: OpxmlDocument, R: BufRead>(&self, reader: R) -> Result<T> {
        T::from_call_data(self.parse_expecting(reader, Some(T::KIND))?)
    }

    pub(crate) fn parse_expecting<R: BufRead>(
        &self,
        reader: R,
        expected: Option<DocumentKind>,
    ) -> Result<CallData> {
        let mut dispatcher = Dispatcher::new(self.registry, self.settings.clone());
        if let Some(kind) = expected {
            dispatcher = dispatcher.expecting(kind);
        }
        self.drive(reader, dispatcher)
    }

    pub fn parse_str(&self, xml: &str) -> Result<CallData> {
        self.parse(xml.as_bytes())
    }

    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<CallData> {
        let path = path.as_ref();
        debug!("parsing opxml document from {}", path.display());
        let file = File::open(path)?;
        self.parse(BufReader::new(file))
    }

    fn drive<R: BufRead>(&self, reader: R, mut dispatcher: Dispatcher<'_>) -> Result<CallData> {
        let mut reader = Reader::from_reader(reader);
        // Whitespace is filtered by the dispatcher, so the reader must keep text as is.
        reader.config_mut().trim_text(false);
        reader.config_mut().expand_empty_elements = true;

        let mut buf = Vec::with_capacity(self.settings.buffer_capacity);
        let mut depth = 0_usize;
        let mut root_closed = false;

        dispatcher.start_document();

        loop {
            let position = reader.buffer_position() as u64;
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| OpxmlError::xml(e, reader.error_position() as u64))?;

            match event {
                Event::Start(start) => {
                    if root_closed {
                        return Err(
                            OpxmlError::malformed("content after the root element").at(position)
                        );
                    }
                    let name = element_name(start.name().into_inner())?;
                    let attributes = read_attributes(&start, position)?;
                    depth += 1;
                    trace!("start `{}` (depth {})", name, depth);
                    dispatcher
                        .start_element(&name, &attributes)
                        .map_err(|e| e.at(position))?;
                }
                Event::End(end) => {
                    let name = element_name(end.name().into_inner())?;
                    depth = depth.saturating_sub(1);
                    trace!("end `{}` (depth {})", name, depth);
                    dispatcher.end_element(&name).map_err(|e| e.at(position))?;
                    if depth == 0 {
                        root_closed = true;
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| OpxmlError::xml(e, position))?;
                    if root_closed && !text.trim().is_empty() {
                        return Err(
                            OpxmlError::malformed("text after the root element").at(position)
                        );
                    }
                    dispatcher.characters(&text).map_err(|e| e.at(position))?;
                }
                Event::CData(cdata) => {
                    let text = String::from_utf8_lossy(&cdata);
                    if root_closed && !text.trim().is_empty() {
                        return Err(
                            OpxmlError::malformed("text after the root element").at(position)
                        );
                    }
                    dispatcher.characters(&text).map_err(|e| e.at(position))?;
                }
                Event::Eof => {
                    if depth != 0 {
                        return Err(OpxmlError::malformed(format!(
                            "unexpected end of document, {} element(s) left open",
                            depth
                        ))
                        .at(position));
                    }
                    return dispatcher.end_document().map_err(|e| e.at(position));
                }
                // Declarations, comments, processing instructions and doctypes carry no data.
                _ => {}
            }

            buf.clear();
        }
    }
}

fn element_name(raw: &[u8]) -> Result<Cow<'_, str>> {
    std::str::from_utf8(raw)
        .map(Cow::Borrowed)
        .map_err(|_| OpxmlError::malformed("element name is not valid UTF-8"))
}

fn read_attributes(start: &BytesStart<'_>, position: u64) -> Result<Attributes> {
    let mut attributes = Attributes::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| OpxmlError::xml(e.into(), position))?;
        let key = element_name(attr.key.as_ref())?.into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| OpxmlError::xml(e, position))?;
        attributes.push(key, value.into_owned());
    }
    Ok(attributes)
}
