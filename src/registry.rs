use crate::ParserSettings;
use crate::err::{OpxmlError, Result};
use crate::model::DocumentKind;
use crate::processor::Processor;
use crate::processors::{CheckEventsProcessor, ModelDataProcessor, OpInfoProcessor, SessionsProcessor};

use log::trace;
use std::collections::HashMap;
use std::sync::OnceLock;

pub const INFO_TAG: &str = "info";
pub const CHECKEVENTS_TAG: &str = "check-events";
pub const MODELDATA_TAG: &str = "model-data";
pub const SESSIONS_TAG: &str = "sessions";

/// Creates a fresh root processor for one parse.
pub type ProcessorFactory = fn(&ParserSettings) -> Box<dyn Processor>;

/// Binds a root tag to the processor that handles it and the kind of result it builds.
#[derive(Debug, Clone, Copy)]
pub struct ProcessorRegistration {
    pub tag: &'static str,
    pub kind: DocumentKind,
    pub factory: ProcessorFactory,
}

impl ProcessorRegistration {
    pub fn instantiate(&self, settings: &ParserSettings) -> Box<dyn Processor> {
        (self.factory)(settings)
    }
}

/// Maps root tags to processors. Read-only once built.
#[derive(Debug, Default, Clone)]
pub struct ProcessorRegistry {
    processors: HashMap<&'static str, ProcessorRegistration>,
}

static SHARED: OnceLock<ProcessorRegistry> = OnceLock::new();

impl ProcessorRegistry {
    /// An empty registry; every root tag is unknown until registered.
    pub fn new() -> Self {
        ProcessorRegistry::default()
    }

    /// The registry for the four documents opxml produces.
    pub fn opxml() -> Self {
        let mut registry = ProcessorRegistry::new();
        for (tag, kind, factory) in [
            (INFO_TAG, DocumentKind::Info, OpInfoProcessor::boxed as ProcessorFactory),
            (CHECKEVENTS_TAG, DocumentKind::CheckEvents, CheckEventsProcessor::boxed),
            (MODELDATA_TAG, DocumentKind::ModelData, ModelDataProcessor::boxed),
            (SESSIONS_TAG, DocumentKind::Sessions, SessionsProcessor::boxed),
        ] {
            registry.processors.insert(tag, ProcessorRegistration { tag, kind, factory });
        }
        registry
    }

    /// A process-wide opxml registry, built on first use. Safe to call from several threads.
    pub fn shared() -> &'static ProcessorRegistry {
        SHARED.get_or_init(|| {
            trace!("initializing shared processor registry");
            ProcessorRegistry::opxml()
        })
    }

    pub fn register(
        &mut self,
        tag: &'static str,
        kind: DocumentKind,
        factory: ProcessorFactory,
    ) -> Result<()> {
        if self.processors.contains_key(tag) {
            return Err(OpxmlError::DuplicateTag {
                tag: tag.to_string(),
            });
        }
        self.processors
            .insert(tag, ProcessorRegistration { tag, kind, factory });
        Ok(())
    }

    /// Finds the registration for a root tag. An unknown tag is fatal for the parse.
    pub fn lookup(&self, tag: &str) -> Result<&ProcessorRegistration> {
        self.processors
            .get(tag)
            .ok_or_else(|| OpxmlError::UnknownRootTag {
                tag: tag.to_string(),
            })
    }

    /// Root tags with a registered processor, sorted.
    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<&'static str> = self.processors.keys().copied().collect();
        tags.sort_unstable();
        tags
    }
}
