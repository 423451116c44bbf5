use crate::ParserSettings;
use crate::err::{OpxmlError, Result};
use crate::model::{
    CallData, CounterEvents, OpEvent, OpInfo, OpxmlDocument, UnitMaskKind, UnitMaskOption,
};
use crate::processor::{Attributes, Processor, TextBuffer, Transition};
use crate::processors::{parse_bool, parse_mask, parse_number, unknown_element};

const INFO_TAG: &str = "info";
const DEFAULTS_TAG: &str = "defaults";
const NUM_COUNTERS_TAG: &str = "num-counters";
const CPU_FREQUENCY_TAG: &str = "cpu-frequency";
const TIMER_MODE_TAG: &str = "timer-mode";
const SAMPLE_DIR_TAG: &str = "sample-dir";
const LOCK_FILE_TAG: &str = "lock-file";
const LOG_FILE_TAG: &str = "log-file";
const DUMP_STATUS_TAG: &str = "dump-status";
const EVENT_LIST_TAG: &str = "event-list";
const COUNTER_ATTR: &str = "counter";

const EVENT_TAG: &str = "event";
const NAME_TAG: &str = "name";
const DESCRIPTION_TAG: &str = "description";
const VALUE_TAG: &str = "value";
const MINIMUM_TAG: &str = "minimum";
const UNIT_MASK_TAG: &str = "unit-mask";
const TYPE_TAG: &str = "type";
const DEFAULT_TAG: &str = "default";
const MASK_TAG: &str = "mask";

/// Builds an [`OpInfo`] from an `<info>` document.
///
/// Scalar fields are read from element text. Each `<event-list counter="N">` is handed to an
/// [`EventListProcessor`].
#[derive(Debug, Default)]
pub struct OpInfoProcessor {
    settings: ParserSettings,
    text: TextBuffer,
}

impl OpInfoProcessor {
    pub fn new(settings: &ParserSettings) -> Self {
        OpInfoProcessor {
            settings: settings.clone(),
            text: TextBuffer::default(),
        }
    }

    pub fn boxed(settings: &ParserSettings) -> Box<dyn Processor> {
        Box::new(OpInfoProcessor::new(settings))
    }
}

impl Processor for OpInfoProcessor {
    fn reset(&mut self, data: &mut CallData) -> Result<()> {
        *OpInfo::from_call_data_mut(data)? = OpInfo::default();
        self.text.clear();
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &str,
        attributes: &Attributes,
        data: &mut CallData,
    ) -> Result<Transition> {
        self.text.clear();

        match name {
            INFO_TAG | DEFAULTS_TAG | NUM_COUNTERS_TAG | CPU_FREQUENCY_TAG | TIMER_MODE_TAG
            | SAMPLE_DIR_TAG | LOCK_FILE_TAG | LOG_FILE_TAG | DUMP_STATUS_TAG => {
                Ok(Transition::Continue)
            }
            EVENT_LIST_TAG => {
                let info = OpInfo::from_call_data_mut(data)?;
                let counter = match attributes.get(COUNTER_ATTR) {
                    Some(value) => parse_scalar!(value, COUNTER_ATTR)?,
                    None => info.counters.len() as u32,
                };
                info.counters.push(CounterEvents {
                    counter,
                    events: Vec::new(),
                });
                let index = info.counters.len() - 1;
                Ok(Transition::Push(Box::new(EventListProcessor::new(
                    &self.settings,
                    index,
                ))))
            }
            other => {
                // Unknown scalars are kept in `OpInfo::other`.
                if self.settings.is_strict() {
                    unknown_element(true, "info", other)?;
                }
                Ok(Transition::Continue)
            }
        }
    }

    fn end_element(&mut self, name: &str, data: &mut CallData) -> Result<Transition> {
        let info = OpInfo::from_call_data_mut(data)?;
        let text = self.text.take();

        match name {
            NUM_COUNTERS_TAG => info.num_counters = parse_scalar!(text, NUM_COUNTERS_TAG)?,
            CPU_FREQUENCY_TAG => info.cpu_frequency = parse_scalar!(text, CPU_FREQUENCY_TAG)?,
            TIMER_MODE_TAG => info.timer_mode = parse_bool(TIMER_MODE_TAG, &text)?,
            SAMPLE_DIR_TAG => info.defaults.sample_dir = Some(text),
            LOCK_FILE_TAG => info.defaults.lock_file = Some(text),
            LOG_FILE_TAG => info.defaults.log_file = Some(text),
            DUMP_STATUS_TAG => info.defaults.dump_status = Some(text),
            INFO_TAG | DEFAULTS_TAG | EVENT_LIST_TAG => {}
            other => {
                if !text.is_empty() {
                    info.other.insert(other.to_string(), text);
                }
            }
        }
        Ok(Transition::Continue)
    }

    fn characters(&mut self, text: &str, _data: &mut CallData) -> Result<()> {
        self.text.push(text);
        Ok(())
    }
}

/// Builds the events of one counter, from `<event-list>` to its end tag.
#[derive(Debug)]
pub struct EventListProcessor {
    strict: bool,
    /// Position of the counter in `OpInfo::counters`.
    index: usize,
    event: Option<OpEvent>,
    in_unit_mask: bool,
    mask: Option<UnitMaskOption>,
    text: TextBuffer,
}

impl EventListProcessor {
    pub fn new(settings: &ParserSettings, index: usize) -> Self {
        EventListProcessor {
            strict: settings.is_strict(),
            index,
            event: None,
            in_unit_mask: false,
            mask: None,
            text: TextBuffer::default(),
        }
    }

    fn counter<'d>(&self, data: &'d mut CallData) -> Result<&'d mut CounterEvents> {
        OpInfo::from_call_data_mut(data)?
            .counters
            .get_mut(self.index)
            .ok_or_else(|| OpxmlError::malformed("event list has no counter to fill"))
    }

    fn event_mut(&mut self, tag: &str) -> Result<&mut OpEvent> {
        self.event
            .as_mut()
            .ok_or_else(|| OpxmlError::malformed(format!("`<{}>` outside of `<event>`", tag)))
    }
}

impl Processor for EventListProcessor {
    fn reset(&mut self, data: &mut CallData) -> Result<()> {
        self.counter(data)?.events.clear();
        self.event = None;
        self.in_unit_mask = false;
        self.mask = None;
        self.text.clear();
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &str,
        _attributes: &Attributes,
        _data: &mut CallData,
    ) -> Result<Transition> {
        self.text.clear();

        match name {
            EVENT_TAG => self.event = Some(OpEvent::default()),
            UNIT_MASK_TAG => self.in_unit_mask = true,
            MASK_TAG => self.mask = Some(UnitMaskOption::default()),
            NAME_TAG | DESCRIPTION_TAG | VALUE_TAG | MINIMUM_TAG | TYPE_TAG | DEFAULT_TAG => {}
            other => unknown_element(self.strict, "event-list", other)?,
        }
        Ok(Transition::Continue)
    }

    fn end_element(&mut self, name: &str, data: &mut CallData) -> Result<Transition> {
        let text = self.text.take();

        match name {
            EVENT_LIST_TAG => return Ok(Transition::Pop),
            EVENT_TAG => {
                if let Some(event) = self.event.take() {
                    self.counter(data)?.events.push(event);
                }
            }
            MASK_TAG => {
                if let Some(mask) = self.mask.take() {
                    self.event_mut(MASK_TAG)?.unit_mask.options.push(mask);
                }
            }
            UNIT_MASK_TAG => self.in_unit_mask = false,
            NAME_TAG => self.event_mut(NAME_TAG)?.name = text,
            DESCRIPTION_TAG => match self.mask.as_mut() {
                Some(mask) => mask.description = text,
                None => self.event_mut(DESCRIPTION_TAG)?.description = text,
            },
            VALUE_TAG => match self.mask.as_mut() {
                Some(mask) => mask.value = parse_mask(VALUE_TAG, &text)?,
                None => self.event_mut(VALUE_TAG)?.number = parse_mask(VALUE_TAG, &text)?,
            },
            MINIMUM_TAG => {
                self.event_mut(MINIMUM_TAG)?.minimum_count = parse_number(MINIMUM_TAG, &text)?
            }
            TYPE_TAG if self.in_unit_mask => {
                self.event_mut(TYPE_TAG)?.unit_mask.kind = parse_unit_mask_kind(&text)?
            }
            DEFAULT_TAG if self.in_unit_mask => {
                self.event_mut(DEFAULT_TAG)?.unit_mask.default = parse_mask(DEFAULT_TAG, &text)?
            }
            _ => {}
        }
        Ok(Transition::Continue)
    }

    fn characters(&mut self, text: &str, _data: &mut CallData) -> Result<()> {
        self.text.push(text);
        Ok(())
    }
}

fn parse_unit_mask_kind(text: &str) -> Result<UnitMaskKind> {
    match text {
        "mandatory" => Ok(UnitMaskKind::Mandatory),
        "exclusive" => Ok(UnitMaskKind::Exclusive),
        "bitmask" => Ok(UnitMaskKind::Bitmask),
        other => Err(OpxmlError::invalid_value(TYPE_TAG, other)),
    }
}
