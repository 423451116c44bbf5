use crate::err::Result;
use crate::model::CallData;

use std::fmt;

/// Attributes of a start tag, unescaped, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Attributes::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Attributes {
            entries: iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect(),
        }
    }
}

/// What the dispatcher should do after a processor handled an element event.
pub enum Transition {
    /// Keep delivering events to the current processor.
    Continue,
    /// Suspend the current processor and deliver the following events to `child`.
    Push(Box<dyn Processor>),
    /// Resume the suspended parent. The parent then receives the end tag that caused the pop.
    Pop,
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Continue => f.write_str("Continue"),
            Transition::Push(child) => f.debug_tuple("Push").field(child).finish(),
            Transition::Pop => f.write_str("Pop"),
        }
    }
}

/// A stateful handler for one logical fragment of an opxml document.
///
/// A processor is driven by the [`Dispatcher`](crate::Dispatcher) and belongs to a single
/// parse; it is reset every time it becomes active.
pub trait Processor: fmt::Debug {
    /// Clears per-run state. Called when the processor becomes active, before any event.
    fn reset(&mut self, data: &mut CallData) -> Result<()>;

    /// Called for every start tag while this processor is active, including the tag that
    /// activated a root processor.
    fn start_element(
        &mut self,
        name: &str,
        attributes: &Attributes,
        data: &mut CallData,
    ) -> Result<Transition>;

    fn end_element(&mut self, name: &str, data: &mut CallData) -> Result<Transition>;

    /// Receives text content. Whitespace-only text is never delivered; text may arrive in
    /// several chunks for a single element.
    fn characters(&mut self, text: &str, data: &mut CallData) -> Result<()>;
}

/// Accumulates the text of the innermost element until its end tag.
#[derive(Debug, Default)]
pub(crate) struct TextBuffer {
    text: String,
}

impl TextBuffer {
    pub(crate) fn push(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Returns the trimmed text collected so far and clears the buffer.
    pub(crate) fn take(&mut self) -> String {
        let text = self.text.trim().to_string();
        self.text.clear();
        text
    }

    pub(crate) fn clear(&mut self) {
        self.text.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_lookup_by_name() {
        let attrs: Attributes = [("name", "/usr/bin/app"), ("count", "12")].into_iter().collect();

        assert_eq!(attrs.get("count"), Some("12"));
        assert_eq!(attrs.get("missing"), None);
        assert_eq!(attrs.iter().count(), 2);
    }

    #[test]
    fn test_text_buffer_joins_chunks_and_trims() {
        let mut buffer = TextBuffer::default();
        buffer.push("  4");
        buffer.push("2 \n");

        assert_eq!(buffer.take(), "42");
        assert_eq!(buffer.take(), "");
    }
}
