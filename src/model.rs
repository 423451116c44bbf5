//! Typed results built from opxml documents.
//!
//! Every document kind has its own result type; [`CallData`] is the closed set of them that
//! is threaded through the processors during a parse.

pub mod events;
pub mod info;
pub mod samples;
pub mod sessions;

pub use events::{CheckEventsResult, DaemonEvent, EventCheckStatus};
pub use info::{CounterEvents, OpDefaults, OpEvent, OpInfo, UnitMask, UnitMaskKind, UnitMaskOption};
pub use samples::{
    EventSamples, ModelData, ModelImage, ModelSample, ModelSymbol, SampleTree, SessionSamples,
};
pub use sessions::{SessionEntry, SessionList};

use crate::err::Result;
use serde::Serialize;
use std::fmt;

/// The kinds of document opxml produces, one per registered root tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    Info,
    CheckEvents,
    ModelData,
    Sessions,
}

impl DocumentKind {
    /// An empty accumulator of this kind, ready to be filled by a processor.
    pub fn empty_call_data(self) -> CallData {
        match self {
            DocumentKind::Info => CallData::Info(OpInfo::default()),
            DocumentKind::CheckEvents => CallData::CheckEvents(CheckEventsResult::default()),
            DocumentKind::ModelData => CallData::ModelData(ModelData::default()),
            DocumentKind::Sessions => CallData::Sessions(SessionList::default()),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentKind::Info => "info",
            DocumentKind::CheckEvents => "check-events",
            DocumentKind::ModelData => "model-data",
            DocumentKind::Sessions => "sessions",
        })
    }
}

/// The accumulator threaded through every processor callback of a single parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CallData {
    Info(OpInfo),
    CheckEvents(CheckEventsResult),
    ModelData(ModelData),
    Sessions(SessionList),
}

impl CallData {
    pub fn kind(&self) -> DocumentKind {
        match self {
            CallData::Info(_) => DocumentKind::Info,
            CallData::CheckEvents(_) => DocumentKind::CheckEvents,
            CallData::ModelData(_) => DocumentKind::ModelData,
            CallData::Sessions(_) => DocumentKind::Sessions,
        }
    }
}

/// A result type that can be produced by parsing an opxml document.
pub trait OpxmlDocument: Sized {
    const KIND: DocumentKind;

    fn from_call_data(data: CallData) -> Result<Self>;
    fn from_call_data_mut(data: &mut CallData) -> Result<&mut Self>;
    fn into_call_data(self) -> CallData;
}

impl_opxml_document!(OpInfo, Info);
impl_opxml_document!(CheckEventsResult, CheckEvents);
impl_opxml_document!(ModelData, ModelData);
impl_opxml_document!(SessionList, Sessions);
