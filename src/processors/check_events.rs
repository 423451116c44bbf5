use crate::ParserSettings;
use crate::err::Result;
use crate::model::{CallData, CheckEventsResult, EventCheckStatus, OpxmlDocument};
use crate::processor::{Attributes, Processor, TextBuffer, Transition};
use crate::processors::unknown_element;

const CHECKEVENTS_TAG: &str = "check-events";
const RESULT_TAG: &str = "result";

/// Builds a [`CheckEventsResult`] from a `<check-events>` document.
///
/// Each `<result>` carries one status code: `ok`, `invalid-event`, `invalid-um`,
/// `invalid-counter` or `invalid-count`. The verdict is computed when the document closes.
#[derive(Debug, Default)]
pub struct CheckEventsProcessor {
    strict: bool,
    in_result: bool,
    text: TextBuffer,
}

impl CheckEventsProcessor {
    pub fn new(settings: &ParserSettings) -> Self {
        CheckEventsProcessor {
            strict: settings.is_strict(),
            ..CheckEventsProcessor::default()
        }
    }

    pub fn boxed(settings: &ParserSettings) -> Box<dyn Processor> {
        Box::new(CheckEventsProcessor::new(settings))
    }
}

impl Processor for CheckEventsProcessor {
    fn reset(&mut self, data: &mut CallData) -> Result<()> {
        *CheckEventsResult::from_call_data_mut(data)? = CheckEventsResult::default();
        self.in_result = false;
        self.text.clear();
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &str,
        _attributes: &Attributes,
        _data: &mut CallData,
    ) -> Result<Transition> {
        match name {
            CHECKEVENTS_TAG => {}
            RESULT_TAG => {
                self.in_result = true;
                self.text.clear();
            }
            other => unknown_element(self.strict, "check-events", other)?,
        }
        Ok(Transition::Continue)
    }

    fn end_element(&mut self, name: &str, data: &mut CallData) -> Result<Transition> {
        let result = CheckEventsResult::from_call_data_mut(data)?;
        match name {
            RESULT_TAG => {
                self.in_result = false;
                result
                    .statuses
                    .push(EventCheckStatus::from_code(&self.text.take()));
            }
            CHECKEVENTS_TAG => result.conclude(),
            _ => {}
        }
        Ok(Transition::Continue)
    }

    fn characters(&mut self, text: &str, _data: &mut CallData) -> Result<()> {
        if self.in_result {
            self.text.push(text);
        }
        Ok(())
    }
}
