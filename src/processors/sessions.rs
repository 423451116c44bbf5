use crate::ParserSettings;
use crate::err::{OpxmlError, Result};
use crate::model::{CallData, OpxmlDocument, SessionEntry, SessionList};
use crate::processor::{Attributes, Processor, TextBuffer, Transition};
use crate::processors::unknown_element;

const SESSIONS_TAG: &str = "sessions";
const EVENT_TAG: &str = "event";
const SESSION_TAG: &str = "session";
const NAME_ATTR: &str = "name";

/// Builds a [`SessionList`] from a `<sessions>` document.
///
/// ```xml
/// <sessions>
///   <event name="CPU_CLK_UNHALTED">
///     <session name="current"/>
///     <session>run1</session>
///   </event>
/// </sessions>
/// ```
#[derive(Debug, Default)]
pub struct SessionsProcessor {
    strict: bool,
    event: Option<String>,
    session_name: Option<String>,
    in_session: bool,
    text: TextBuffer,
}

impl SessionsProcessor {
    pub fn new(settings: &ParserSettings) -> Self {
        SessionsProcessor {
            strict: settings.is_strict(),
            ..SessionsProcessor::default()
        }
    }

    pub fn boxed(settings: &ParserSettings) -> Box<dyn Processor> {
        Box::new(SessionsProcessor::new(settings))
    }
}

impl Processor for SessionsProcessor {
    fn reset(&mut self, data: &mut CallData) -> Result<()> {
        SessionList::from_call_data_mut(data)?.sessions.clear();
        self.event = None;
        self.session_name = None;
        self.in_session = false;
        self.text.clear();
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &str,
        attributes: &Attributes,
        _data: &mut CallData,
    ) -> Result<Transition> {
        match name {
            SESSIONS_TAG => {}
            EVENT_TAG => self.event = attributes.get(NAME_ATTR).map(str::to_string),
            SESSION_TAG => {
                self.session_name = attributes.get(NAME_ATTR).map(str::to_string);
                self.in_session = true;
                self.text.clear();
            }
            other => unknown_element(self.strict, "sessions", other)?,
        }
        Ok(Transition::Continue)
    }

    fn end_element(&mut self, name: &str, data: &mut CallData) -> Result<Transition> {
        match name {
            SESSION_TAG => {
                self.in_session = false;
                let text = self.text.take();
                let name = match self.session_name.take() {
                    Some(name) if !name.is_empty() => name,
                    _ if !text.is_empty() => text,
                    _ => return Err(OpxmlError::malformed("`<session>` without a name")),
                };
                SessionList::from_call_data_mut(data)?.sessions.push(SessionEntry {
                    event: self.event.clone(),
                    name,
                });
            }
            EVENT_TAG => self.event = None,
            _ => {}
        }
        Ok(Transition::Continue)
    }

    fn characters(&mut self, text: &str, _data: &mut CallData) -> Result<()> {
        if self.in_session {
            self.text.push(text);
        }
        Ok(())
    }
}
