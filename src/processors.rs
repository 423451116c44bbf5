//! Processors for the documents opxml produces, one root processor per document kind.

mod check_events;
mod info;
mod model_data;
mod sessions;

pub use check_events::CheckEventsProcessor;
pub use info::{EventListProcessor, OpInfoProcessor};
pub use model_data::{ImageProcessor, ModelDataProcessor, SymbolProcessor};
pub use sessions::SessionsProcessor;

use crate::err::{OpxmlError, Result};
use log::trace;

/// Handles an element the processor does not know about: skipped, or an error when the
/// parser runs in strict mode.
pub(crate) fn unknown_element(strict: bool, processor: &'static str, name: &str) -> Result<()> {
    if strict {
        return Err(OpxmlError::malformed(format!(
            "unexpected element `<{}>` in {} document",
            name, processor
        )));
    }
    trace!("{}: ignoring `<{}>`", processor, name);
    Ok(())
}

/// Parses a decimal or `0x`-prefixed hexadecimal number.
pub(crate) fn parse_number(field: &'static str, text: &str) -> Result<u64> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| OpxmlError::invalid_value(field, text))
}

pub(crate) fn parse_mask(field: &'static str, text: &str) -> Result<u32> {
    u32::try_from(parse_number(field, text)?)
        .map_err(|_| OpxmlError::invalid_value(field, text.trim()))
}

pub(crate) fn parse_bool(field: &'static str, text: &str) -> Result<bool> {
    match text.trim() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(OpxmlError::invalid_value(field, other)),
    }
}
