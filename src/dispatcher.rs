use crate::ParserSettings;
use crate::err::{OpxmlError, Result};
use crate::model::{CallData, DocumentKind};
use crate::processor::{Attributes, Processor, Transition};
use crate::registry::ProcessorRegistry;

use log::{debug, trace};

/// The active processor and the processors it suspended, innermost last.
///
/// Transitions consume the stack and return the new one.
#[derive(Debug)]
pub struct ProcessorStack {
    active: Box<dyn Processor>,
    suspended: Vec<Box<dyn Processor>>,
}

impl ProcessorStack {
    pub fn new(root: Box<dyn Processor>) -> Self {
        ProcessorStack {
            active: root,
            suspended: Vec::new(),
        }
    }

    /// Suspends the active processor and activates `child`.
    pub fn push(mut self, child: Box<dyn Processor>) -> Self {
        let parent = std::mem::replace(&mut self.active, child);
        self.suspended.push(parent);
        self
    }

    /// Drops the active processor and resumes its parent. Fails if only the root is left.
    pub fn pop(mut self, tag: &str) -> Result<Self> {
        match self.suspended.pop() {
            Some(parent) => {
                self.active = parent;
                Ok(self)
            }
            None => Err(OpxmlError::EmptyProcessorStack {
                tag: tag.to_string(),
            }),
        }
    }

    /// Number of suspended processors.
    pub fn depth(&self) -> usize {
        self.suspended.len()
    }

    pub fn active_mut(&mut self) -> &mut dyn Processor {
        self.active.as_mut()
    }
}

/// Routes parser events to the processor registered for the document's root tag.
#[derive(Debug)]
pub struct Dispatcher<'r> {
    registry: &'r ProcessorRegistry,
    settings: ParserSettings,
    expected: Option<DocumentKind>,
    stack: Option<ProcessorStack>,
    data: Option<CallData>,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r ProcessorRegistry, settings: ParserSettings) -> Self {
        Dispatcher {
            registry,
            settings,
            expected: None,
            stack: None,
            data: None,
        }
    }

    /// Only accept documents of the given kind; any other registered root is an error.
    pub fn expecting(mut self, kind: DocumentKind) -> Self {
        self.expected = Some(kind);
        self
    }

    pub fn start_document(&mut self) {
        self.stack = None;
        self.data = None;
    }

    pub fn start_element(&mut self, name: &str, attributes: &Attributes) -> Result<()> {
        if self.stack.is_none() {
            self.activate_root(name)?;
        }

        let (stack, data) = self.parts()?;
        let transition = stack.active_mut().start_element(name, attributes, data)?;
        self.apply(transition, name)
    }

    pub fn end_element(&mut self, name: &str) -> Result<()> {
        let (stack, data) = self.parts()?;
        let transition = stack.active_mut().end_element(name, data)?;
        self.apply(transition, name)
    }

    /// Forwards text to the active processor, unless it is whitespace only.
    pub fn characters(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        if self.stack.is_none() {
            return Err(OpxmlError::malformed("text before the root element"));
        }

        let (stack, data) = self.parts()?;
        stack.active_mut().characters(text, data)
    }

    /// Finishes the document and hands out the populated call data.
    pub fn end_document(&mut self) -> Result<CallData> {
        let stack = self
            .stack
            .take()
            .ok_or_else(|| OpxmlError::malformed("document has no root element"))?;

        if stack.depth() != 0 {
            return Err(OpxmlError::malformed(format!(
                "{} nested processor(s) still active at end of document",
                stack.depth()
            )));
        }

        self.data
            .take()
            .ok_or_else(|| OpxmlError::malformed("document has no root element"))
    }

    /// Number of processors currently suspended by a push.
    pub fn depth(&self) -> usize {
        self.stack.as_ref().map_or(0, ProcessorStack::depth)
    }

    fn activate_root(&mut self, tag: &str) -> Result<()> {
        let registration = self.registry.lookup(tag)?;

        if let Some(expected) = self.expected {
            if expected != registration.kind {
                return Err(OpxmlError::UnexpectedDocument {
                    expected,
                    found: registration.kind,
                });
            }
        }

        debug!("`<{}>` is handled by the {} processor", tag, registration.kind);

        let mut data = registration.kind.empty_call_data();
        let mut root = registration.instantiate(&self.settings);
        root.reset(&mut data)?;

        self.data = Some(data);
        self.stack = Some(ProcessorStack::new(root));
        Ok(())
    }

    fn apply(&mut self, transition: Transition, tag: &str) -> Result<()> {
        match transition {
            Transition::Continue => Ok(()),
            Transition::Push(mut child) => {
                trace!("push on `<{}>` (depth {})", tag, self.depth() + 1);
                let (stack, data) = self.take_parts()?;
                child.reset(data)?;
                self.stack = Some(stack.push(child));
                Ok(())
            }
            Transition::Pop => {
                trace!("pop on `</{}>` (depth {})", tag, self.depth());
                let (stack, data) = self.take_parts()?;
                let mut stack = stack.pop(tag)?;
                // The parent never saw this end tag while it was suspended.
                let transition = stack.active_mut().end_element(tag, data)?;
                self.stack = Some(stack);
                self.apply(transition, tag)
            }
        }
    }

    fn parts(&mut self) -> Result<(&mut ProcessorStack, &mut CallData)> {
        match (self.stack.as_mut(), self.data.as_mut()) {
            (Some(stack), Some(data)) => Ok((stack, data)),
            _ => Err(OpxmlError::malformed("element event before the root element")),
        }
    }

    fn take_parts(&mut self) -> Result<(ProcessorStack, &mut CallData)> {
        match (self.stack.take(), self.data.as_mut()) {
            (Some(stack), Some(data)) => Ok((stack, data)),
            _ => Err(OpxmlError::malformed("element event before the root element")),
        }
    }
}
